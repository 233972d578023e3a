use crate::catalog;
use crate::db;
use crate::models::*;
use crate::scheduler::depwait;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use pocketd_common::api::builder::{BuildOutcome, BuildResult};
use pocketd_common::api::v1::{BuildState, PublishingStatus};
use pocketd_common::config::SchedulerConfig;
use pocketd_common::errors::*;
use pocketd_common::utils;

/// Creates the PENDING binary publishing records of a finished build.
///
/// Architecture independent binaries are published into every arch series
/// of the build's series. An embargoed source keeps its binaries embargoed.
fn publish_binaries(
    build: &Build,
    source: &SourcePackageRelease,
    binaries: &[BinaryPackageRelease],
    now: NaiveDateTime,
    connection: &mut SqliteConnection,
) -> Result<usize> {
    let embargo = SourcePublication::find_for_release(source.id, build.archive_id, build.pocket, connection)?
        .map(|p| p.embargo)
        .unwrap_or(false);
    let all_arch_series = DistroArchSeries::list_for_series(source.distro_series_id, connection)?;

    let mut n = 0;
    for binary in binaries {
        let targets = if binary.architecture_specific {
            vec![build.distro_arch_series_id]
        } else {
            all_arch_series.iter().map(|das| das.id).collect()
        };

        for distro_arch_series_id in targets {
            NewBinaryPublication {
                binary_package_release_id: binary.id,
                name: binary.name.clone(),
                archive_id: build.archive_id,
                distro_arch_series_id,
                pocket: build.pocket,
                component: binary.component.clone(),
                section: binary.section.clone(),
                priority: binary.priority.clone(),
                status: PublishingStatus::Pending,
                created_at: now,
                embargo,
            }
            .insert(connection)?;
            n += 1;
        }
    }
    Ok(n)
}

/// Records what a builder reported for the build it was running.
///
/// The build leaves BUILDING, its ticket is deleted and, for a successful
/// build, its binaries become releases with PENDING publishing records.
pub fn ingest(
    builder: &Builder,
    result: &BuildResult,
    now: NaiveDateTime,
    config: &SchedulerConfig,
    connection: &mut SqliteConnection,
) -> Result<BuildState> {
    let state = connection
        .immediate_transaction::<_, Error, _>(|connection| {
            let build = Build::get_id(result.build_id, connection)?;
            if build.state != BuildState::Building || build.builder_id != Some(builder.id) {
                return Err(ArchiveError::conflict(format!(
                    "build {} is {} and not running on builder {}",
                    build.id, build.state, builder.name
                )));
            }
            let source = SourcePackageRelease::get_id(build.source_package_release_id, connection)?;

            let log = match &result.log {
                Some(log) => match validate_file_ref(log) {
                    Ok(()) => Some(log),
                    Err(err) => {
                        warn!("Dropping build log of build {}: {:#}", build.id, err);
                        None
                    }
                },
                None => None,
            };
            let log_file_id = log
                .map(|log| LibraryFile::intern(log, now, connection))
                .transpose()?;
            let log_tail = utils::log_tail(result.log_tail.as_bytes(), config.log_tail_size());

            let mut state = result.outcome.build_state();
            let mut failure_note = None;
            if result.outcome == BuildOutcome::Success {
                if result.binaries.is_empty() {
                    state = BuildState::FailedToUpload;
                    failure_note = Some("build succeeded without producing binaries".to_string());
                } else if let Err(err) = result
                    .binaries
                    .iter()
                    .try_for_each(catalog::validate_binary_report)
                {
                    warn!("Build {} reported unusable binaries: {:#}", build.id, err);
                    state = BuildState::FailedToUpload;
                    failure_note = Some(format!("rejected build output: {:#}", err));
                }
            }

            let mut binaries = Vec::new();
            if state == BuildState::FullyBuilt {
                for report in &result.binaries {
                    let id = catalog::create_binary_release(&build, &source, report, now, connection)?;
                    binaries.push(BinaryPackageRelease::get_id(id, connection)?);
                }
            }

            let dependencies = match state {
                BuildState::DependencyWait | BuildState::ManualDepWait => {
                    Some(result.dependencies.clone().unwrap_or_default())
                }
                _ => None,
            };

            build.transition(
                state,
                BuildUpdate {
                    finished_at: Some(Some(now)),
                    dependencies: Some(dependencies),
                    log_file_id: Some(log_file_id),
                    log_tail: Some(Some(log_tail)),
                    failure_note: Some(failure_note),
                    ..Default::default()
                },
                connection,
            )?;
            Ticket::delete_for_build(build.id, connection)?;

            if !binaries.is_empty() {
                let n = publish_binaries(&build, &source, &binaries, now, connection)?;
                info!(
                    "Build {} produced {} binaries, {} publishing records pending",
                    build.id,
                    binaries.len(),
                    n
                );
            }

            Ok(state)
        })
        .map_err(db::contention)?;

    Builder::seen(builder.id, now, connection)?;

    if state == BuildState::FullyBuilt {
        depwait::reevaluate(now, config, connection)?;
    }

    Ok(state)
}
