use debversion::Version;
use pocketd_common::errors::*;
use std::cmp::Ordering;

pub fn parse(version: &str) -> Result<Version> {
    if version.is_empty() || version.contains(char::is_whitespace) {
        return Err(ArchiveError::invalid_input(format!(
            "invalid version {version:?}"
        )));
    }
    version
        .parse::<Version>()
        .map_err(|err| ArchiveError::invalid_input(format!("invalid version {version:?}: {err}")))
}

pub fn cmp(old: &str, new: &str) -> Result<Ordering> {
    if old == new {
        return Ok(Ordering::Equal);
    }
    Ok(parse(old)?.cmp(&parse(new)?))
}

/// Orders by name, then by Debian version. Versions that don't parse sort
/// before every valid one, and among each other as plain strings.
pub fn cmp_name_version(a: (&str, &str), b: (&str, &str)) -> Ordering {
    a.0.cmp(b.0).then_with(|| {
        match (a.1.parse::<Version>(), b.1.parse::<Version>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            (Err(_), Ok(_)) => Ordering::Less,
            (Ok(_), Err(_)) => Ordering::Greater,
            (Err(_), Err(_)) => a.1.cmp(b.1),
        }
    })
}
