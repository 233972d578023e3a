//! Archives, series and the immutable record of uploaded releases.
//!
//! Releases are never edited. A corrected upload is a new version, and
//! creating a source release is what spawns its builds and its source
//! publishing record.

use crate::db;
use crate::models::*;
use crate::scheduler::score;
use crate::versions;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use pocketd_common::api::builder::BinaryReport;
use pocketd_common::api::v1::{
    ArchivePurpose, BuildState, CreateSourceReleaseRequest, FileRef, PublishingStatus,
    SourceReleaseCreated,
};
use pocketd_common::config::SchedulerConfig;
use pocketd_common::errors::*;
use std::cmp::Ordering;

pub const MAIN_ARCHIVE_NAME: &str = "primary";
pub const DEFAULT_PRIORITY: &str = "optional";

fn validate_name(what: &str, name: &str) -> Result<()> {
    if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == '/') {
        return Err(ArchiveError::invalid_input(format!(
            "invalid {what}: {name:?}"
        )));
    }
    Ok(())
}

pub fn create_distribution(
    name: &str,
    now: NaiveDateTime,
    connection: &mut SqliteConnection,
) -> Result<Distribution> {
    validate_name("distribution name", name)?;

    let id = connection
        .immediate_transaction::<_, Error, _>(|connection| {
            let id = NewDistribution {
                name: name.to_string(),
            }
            .insert(connection)?;

            NewArchive {
                distribution_id: id,
                owner: None,
                name: MAIN_ARCHIVE_NAME.to_string(),
                purpose: ArchivePurpose::Main,
                created_at: now,
            }
            .insert(connection)?;

            Ok(id)
        })
        .map_err(db::contention)?;

    info!("Created distribution {name:?} ({id})");
    Distribution::get_id(id, connection)
}

/// Personal archives only, the main archive comes with its distribution
pub fn create_archive(
    distribution_id: i32,
    owner: &str,
    name: &str,
    now: NaiveDateTime,
    connection: &mut SqliteConnection,
) -> Result<Archive> {
    validate_name("archive name", name)?;
    validate_name("archive owner", owner)?;
    Distribution::get_id(distribution_id, connection)?;

    let id = NewArchive {
        distribution_id,
        owner: Some(owner.to_string()),
        name: name.to_string(),
        purpose: ArchivePurpose::Personal,
        created_at: now,
    }
    .insert(connection)
    .map_err(db::contention)?;

    info!("Created personal archive {owner}/{name} ({id})");
    Archive::get_id(id, connection)
}

pub fn create_series(
    distribution_id: i32,
    name: &str,
    version: &str,
    connection: &mut SqliteConnection,
) -> Result<DistroSeries> {
    validate_name("series name", name)?;
    validate_name("series version", version)?;
    Distribution::get_id(distribution_id, connection)?;

    let id = NewDistroSeries {
        distribution_id,
        name: name.to_string(),
        version: version.to_string(),
    }
    .insert(connection)
    .map_err(db::contention)?;

    DistroSeries::get_id(id, connection)
}

pub fn create_arch_series(
    distro_series_id: i32,
    architecture_tag: &str,
    processor_family: &str,
    chroot: Option<&FileRef>,
    now: NaiveDateTime,
    connection: &mut SqliteConnection,
) -> Result<DistroArchSeries> {
    validate_name("architecture tag", architecture_tag)?;
    validate_name("processor family", processor_family)?;
    DistroSeries::get_id(distro_series_id, connection)?;

    let id = connection
        .immediate_transaction::<_, Error, _>(|connection| {
            let chroot_file_id = chroot
                .map(|chroot| LibraryFile::intern(chroot, now, connection))
                .transpose()?;

            NewDistroArchSeries {
                distro_series_id,
                architecture_tag: architecture_tag.to_string(),
                processor_family: processor_family.to_string(),
                chroot_file_id,
            }
            .insert(connection)
        })
        .map_err(db::contention)?;

    DistroArchSeries::get_id(id, connection)
}

pub fn set_chroot(
    arch_series_id: i32,
    chroot: &FileRef,
    now: NaiveDateTime,
    connection: &mut SqliteConnection,
) -> Result<DistroArchSeries> {
    let arch_series = DistroArchSeries::get_id(arch_series_id, connection)?;
    let file_id = LibraryFile::intern(chroot, now, connection)?;
    arch_series.set_chroot(file_id, connection)?;
    info!(
        "Chroot of {} set to {} ({})",
        arch_series.architecture_tag, chroot.filename, chroot.sha256
    );
    DistroArchSeries::get_id(arch_series_id, connection)
}

/// Picks the arch series an architecture hint list builds on.
///
/// `any` and `linux-any` mean all of them, `all` means the first one, which
/// is nominated for architecture independent builds.
pub fn resolve_architectures<'a>(
    hint: &str,
    arch_series: &'a [DistroArchSeries],
) -> Vec<&'a DistroArchSeries> {
    let mut out = Vec::<&DistroArchSeries>::new();
    let mut push = |das: &'a DistroArchSeries| {
        if !out.iter().any(|x| x.id == das.id) {
            out.push(das);
        }
    };

    for token in hint.split_whitespace() {
        match token {
            "any" | "linux-any" => arch_series.iter().for_each(&mut push),
            "all" => {
                if let Some(first) = arch_series.first() {
                    push(first);
                }
            }
            tag => match arch_series.iter().find(|das| das.architecture_tag == tag) {
                Some(das) => push(das),
                None => warn!("Ignoring unknown architecture in hint list: {tag:?}"),
            },
        }
    }

    out.sort_by_key(|das| das.id);
    out
}

fn sorted_files(files: &[FileRef]) -> Vec<(&str, &str, i64)> {
    let mut files = files
        .iter()
        .map(|f| (f.filename.as_str(), f.sha256.as_str(), f.size))
        .collect::<Vec<_>>();
    files.sort();
    files
}

fn same_content(
    existing: &SourcePackageRelease,
    existing_files: &[FileRef],
    upload: &CreateSourceReleaseRequest,
) -> bool {
    existing.build_depends == upload.build_depends
        && existing.component == upload.component
        && existing.section == upload.section
        && existing.urgency == upload.urgency
        && existing.architecture_hint == upload.architecture_hint
        && sorted_files(existing_files) == sorted_files(&upload.files)
}

fn already_built(
    builds: &[(Build, String)],
    version: &str,
) -> bool {
    builds.iter().any(|(build, v)| {
        v == version
            && matches!(
                build.state,
                BuildState::FullyBuilt | BuildState::Building | BuildState::NeedsBuild
            )
    })
}

/// Records a source upload, idempotent on (archive, series, name, version).
///
/// A new release gets one pending build per architecture it resolves to,
/// a PENDING source publishing record, and makes waiting builds of older
/// versions moot.
pub fn create_source_release(
    upload: &CreateSourceReleaseRequest,
    now: NaiveDateTime,
    config: &SchedulerConfig,
    connection: &mut SqliteConnection,
) -> Result<SourceReleaseCreated> {
    validate_name("package name", &upload.name)?;
    validate_name("component", &upload.component)?;
    validate_name("section", &upload.section)?;
    versions::parse(&upload.version)?;

    connection
        .immediate_transaction::<_, Error, _>(|connection| {
            let archive = Archive::get_id(upload.archive_id, connection)?;
            let series = DistroSeries::get_id(upload.distro_series_id, connection)?;
            if series.distribution_id != archive.distribution_id {
                return Err(ArchiveError::invalid_input(format!(
                    "series {} does not belong to the distribution of archive {}",
                    series.id, archive.id
                )));
            }

            if let Some(existing) = SourcePackageRelease::find(
                archive.id,
                series.id,
                &upload.name,
                &upload.version,
                connection,
            )? {
                let files = existing.files(connection)?;
                if !same_content(&existing, &files, upload) {
                    return Err(ArchiveError::duplicate_version(format!(
                        "{} {} already exists in archive {} with different content",
                        upload.name, upload.version, archive.id
                    )));
                }

                debug!(
                    "Identical upload of {} {}, nothing to do",
                    upload.name, upload.version
                );
                let build_ids = Build::list_for_source(existing.id, connection)?
                    .into_iter()
                    .map(|b| b.id)
                    .collect();
                let publication_id =
                    SourcePublication::find_for_release(existing.id, archive.id, existing.pocket, connection)?
                        .map(|p| p.id);
                return Ok(SourceReleaseCreated {
                    source_release_id: existing.id,
                    created: false,
                    build_ids,
                    publication_id,
                });
            }

            let release_id = NewSourcePackageRelease {
                archive_id: archive.id,
                distro_series_id: series.id,
                name: upload.name.clone(),
                version: upload.version.clone(),
                build_depends: upload.build_depends.clone(),
                component: upload.component.clone(),
                section: upload.section.clone(),
                urgency: upload.urgency,
                architecture_hint: upload.architecture_hint.clone(),
                pocket: upload.pocket,
                created_at: now,
            }
            .insert(connection)?;

            let mut links = Vec::new();
            for file in &upload.files {
                let library_file_id = LibraryFile::intern(file, now, connection)?;
                links.push(NewSourcePackageReleaseFile {
                    source_package_release_id: release_id,
                    library_file_id,
                });
            }
            NewSourcePackageReleaseFile::insert_batch(&links, connection)?;

            let arch_series = DistroArchSeries::list_for_series(series.id, connection)?;
            let mut build_ids = Vec::new();
            for das in resolve_architectures(&upload.architecture_hint, &arch_series) {
                let builds =
                    Build::list_for_package(archive.id, das.id, &upload.name, connection)?;

                for (build, version) in &builds {
                    if build.state == BuildState::NeedsBuild
                        && versions::cmp(version, &upload.version)? == Ordering::Less
                    {
                        build.transition(BuildState::Superseded, BuildUpdate::default(), connection)?;
                        Ticket::delete_for_build(build.id, connection)?;
                    }
                }

                if already_built(&builds, &upload.version) {
                    debug!(
                        "{} {} already built for {}, skipping",
                        upload.name, upload.version, das.architecture_tag
                    );
                    continue;
                }

                let build_id = NewBuild {
                    source_package_release_id: release_id,
                    archive_id: archive.id,
                    distro_arch_series_id: das.id,
                    pocket: upload.pocket,
                    state: BuildState::NeedsBuild,
                    created_at: now,
                }
                .insert(connection)?;

                NewTicket {
                    build_id,
                    score: score::compute(upload.urgency, upload.pocket, now, now, config),
                    manual: false,
                    created_at: now,
                    not_before: None,
                }
                .insert(connection)?;

                build_ids.push(build_id);
            }

            let publication_id = NewSourcePublication {
                source_package_release_id: release_id,
                name: upload.name.clone(),
                archive_id: archive.id,
                distro_series_id: series.id,
                pocket: upload.pocket,
                component: upload.component.clone(),
                section: upload.section.clone(),
                status: PublishingStatus::Pending,
                created_at: now,
                embargo: upload.embargo,
            }
            .insert(connection)?;

            info!(
                "Created source release {} {} ({release_id}) with {} builds",
                upload.name,
                upload.version,
                build_ids.len()
            );

            Ok(SourceReleaseCreated {
                source_release_id: release_id,
                created: true,
                build_ids,
                publication_id: Some(publication_id),
            })
        })
        .map_err(db::contention)
}

/// Checks a binary reported by a builder before anything is recorded for it
pub fn validate_binary_report(report: &BinaryReport) -> Result<()> {
    validate_name("binary name", &report.name)?;
    versions::parse(&report.version)?;
    for file in &report.files {
        validate_file_ref(file)?;
    }
    Ok(())
}

/// Records one binary produced by a build, idempotent on (build, name)
pub fn create_binary_release(
    build: &Build,
    source: &SourcePackageRelease,
    report: &BinaryReport,
    now: NaiveDateTime,
    connection: &mut SqliteConnection,
) -> Result<i32> {
    validate_binary_report(report)?;

    if let Some(existing) = BinaryPackageRelease::find(build.id, &report.name, connection)? {
        return Ok(existing.id);
    }

    let id = NewBinaryPackageRelease {
        build_id: build.id,
        name: report.name.clone(),
        version: report.version.clone(),
        architecture_specific: report.architecture_specific,
        depends: report.depends.clone(),
        conflicts: report.conflicts.clone(),
        provides: report.provides.clone(),
        component: report
            .component
            .clone()
            .unwrap_or_else(|| source.component.clone()),
        section: report
            .section
            .clone()
            .unwrap_or_else(|| source.section.clone()),
        priority: report
            .priority
            .clone()
            .unwrap_or_else(|| DEFAULT_PRIORITY.to_string()),
        created_at: now,
    }
    .insert(connection)?;

    let mut links = Vec::new();
    for file in &report.files {
        let library_file_id = LibraryFile::intern(file, now, connection)?;
        links.push(NewBinaryPackageReleaseFile {
            binary_package_release_id: id,
            library_file_id,
        });
    }
    NewBinaryPackageReleaseFile::insert_batch(&links, connection)?;

    Ok(id)
}
