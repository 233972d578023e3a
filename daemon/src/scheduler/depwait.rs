//! Builds waiting for dependencies and the Debian relation checks that
//! release them.

use crate::db;
use crate::models::*;
use crate::scheduler::dispatch;
use crate::versions;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use pocketd_common::api::v1::BuildState;
use pocketd_common::config::SchedulerConfig;
use pocketd_common::errors::*;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl VersionOp {
    fn parse(s: &str) -> Result<VersionOp> {
        let op = match s {
            "<<" => VersionOp::Lt,
            "<=" | "<" => VersionOp::Le,
            "=" => VersionOp::Eq,
            ">=" | ">" => VersionOp::Ge,
            ">>" => VersionOp::Gt,
            _ => bail!("Unknown version operator: {:?}", s),
        };
        Ok(op)
    }

    fn matches(&self, ord: Ordering) -> bool {
        match self {
            VersionOp::Lt => ord == Ordering::Less,
            VersionOp::Le => ord != Ordering::Greater,
            VersionOp::Eq => ord == Ordering::Equal,
            VersionOp::Ge => ord != Ordering::Less,
            VersionOp::Gt => ord == Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub name: String,
    pub version: Option<(VersionOp, String)>,
    /// Architecture restriction, entries may be negated with `!`
    pub arches: Vec<String>,
}

impl Relation {
    fn parse(s: &str) -> Result<Relation> {
        let s = s.trim();

        let (s, arches) = match s.find('[') {
            Some(idx) => {
                let end = s[idx..]
                    .find(']')
                    .with_context(|| anyhow!("Unterminated architecture list: {:?}", s))?;
                let arches = s[idx + 1..idx + end]
                    .split_whitespace()
                    .map(String::from)
                    .collect();
                (s[..idx].trim(), arches)
            }
            None => (s, Vec::new()),
        };

        let (name, version) = match s.find('(') {
            Some(idx) => {
                let inner = s[idx + 1..]
                    .strip_suffix(')')
                    .with_context(|| anyhow!("Unterminated version constraint: {:?}", s))?
                    .trim();
                let split = inner
                    .find(|c: char| !matches!(c, '<' | '>' | '='))
                    .with_context(|| anyhow!("Missing version in constraint: {:?}", s))?;
                let op = VersionOp::parse(&inner[..split])?;
                let version = inner[split..].trim().to_string();
                versions::parse(&version)?;
                (s[..idx].trim(), Some((op, version)))
            }
            None => (s, None),
        };

        // multiarch qualifiers don't matter for a single-arch resolver
        let name = name.split(':').next().unwrap_or(name);
        if name.is_empty() || name.contains(char::is_whitespace) {
            bail!("Invalid package name in relation: {:?}", s);
        }

        Ok(Relation {
            name: name.to_string(),
            version,
            arches,
        })
    }

    fn applies_to(&self, arch: &str) -> bool {
        if self.arches.is_empty() {
            return true;
        }
        let negated = self.arches.iter().all(|a| a.starts_with('!'));
        if negated {
            !self.arches.iter().any(|a| &a[1..] == arch)
        } else {
            self.arches.iter().any(|a| a == arch)
        }
    }

    fn version_matches(&self, candidate: &str) -> bool {
        match &self.version {
            None => true,
            Some((op, wanted)) => versions::cmp(candidate, wanted)
                .map(|ord| op.matches(ord))
                .unwrap_or(false),
        }
    }

    fn satisfied_by(&self, binary: &BinaryPackageRelease) -> bool {
        if binary.name == self.name && self.version_matches(&binary.version) {
            return true;
        }

        binary
            .provides
            .split(',')
            .filter(|p| !p.trim().is_empty())
            .filter_map(|p| Relation::parse(p).ok())
            .any(|provided| {
                provided.name == self.name
                    && match (&self.version, &provided.version) {
                        (None, _) => true,
                        (Some(_), Some((VersionOp::Eq, v))) => self.version_matches(v),
                        (Some(_), _) => false,
                    }
            })
    }
}

/// A relation list: comma separated groups of `|` separated alternatives
pub fn parse_relations(s: &str) -> Result<Vec<Vec<Relation>>> {
    s.split(',')
        .map(str::trim)
        .filter(|group| !group.is_empty())
        .map(|group| group.split('|').map(Relation::parse).collect::<Result<Vec<_>>>())
        .collect()
}

/// Whether every group has an alternative that is available on `arch`
pub fn satisfied(
    relations: &[Vec<Relation>],
    available: &[BinaryPackageRelease],
    arch: &str,
) -> bool {
    relations.iter().all(|group| {
        let applicable = group
            .iter()
            .filter(|rel| rel.applies_to(arch))
            .collect::<Vec<_>>();
        applicable.is_empty()
            || applicable
                .iter()
                .any(|rel| available.iter().any(|bin| rel.satisfied_by(bin)))
    })
}

fn check(build: &Build, connection: &mut SqliteConnection) -> Result<bool> {
    let dependencies = match build.dependencies.as_deref() {
        Some(deps) if !deps.trim().is_empty() => deps,
        _ => return Ok(true),
    };
    let relations = parse_relations(dependencies)?;

    let archive = Archive::get_id(build.archive_id, connection)?;
    let archives = archive.dependency_archives(connection)?;
    let arch_series = DistroArchSeries::get_id(build.distro_arch_series_id, connection)?;
    let available = BinaryPublication::visible_binaries(
        &archives,
        arch_series.id,
        build.pocket.visible_pockets(),
        connection,
    )?;

    Ok(satisfied(&relations, &available, &arch_series.architecture_tag))
}

/// Moves every DEPENDENCYWAIT build whose dependencies are now published
/// back to NEEDSBUILD with a fresh ticket. Returns the released builds.
pub fn reevaluate(
    now: NaiveDateTime,
    config: &SchedulerConfig,
    connection: &mut SqliteConnection,
) -> Result<Vec<i32>> {
    let mut released = Vec::new();
    for build in Build::list_by_state(BuildState::DependencyWait, connection)? {
        match check(&build, connection) {
            Ok(true) => (),
            Ok(false) => continue,
            Err(err) => {
                warn!("Can not evaluate dependencies of build {}: {:#}", build.id, err);
                continue;
            }
        }

        let result = connection.immediate_transaction::<_, Error, _>(|connection| {
            build.transition(
                BuildState::NeedsBuild,
                BuildUpdate {
                    dependencies: Some(None),
                    started_at: Some(None),
                    finished_at: Some(None),
                    builder_id: Some(None),
                    ..Default::default()
                },
                connection,
            )?;
            dispatch::enqueue(&build, now, config, connection)?;
            Ok(())
        });

        match result.map_err(db::contention) {
            Ok(()) => {
                info!("Dependencies of build {} are satisfied", build.id);
                released.push(build.id);
            }
            Err(err) if ArchiveError::is_conflict(&err) => {
                debug!("Build {} changed while re-evaluating: {:#}", build.id, err);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(released)
}
