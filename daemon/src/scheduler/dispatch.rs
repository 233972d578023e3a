//! Database side of dispatching: matching tickets to builders and every
//! state change of a ticket. Nothing in here does network I/O.

use crate::db;
use crate::models::*;
use crate::scheduler::score;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use pocketd_common::api::builder::DispatchRequest;
use pocketd_common::api::v1::BuildState;
use pocketd_common::config::SchedulerConfig;
use pocketd_common::errors::*;

/// A waiting ticket with everything needed to match and dispatch it
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub ticket: Ticket,
    pub build: Build,
    pub source: SourcePackageRelease,
    pub arch_series: DistroArchSeries,
}

impl QueueEntry {
    fn load(ticket: Ticket, connection: &mut SqliteConnection) -> Result<QueueEntry> {
        let build = Build::get_id(ticket.build_id, connection)?;
        let source = SourcePackageRelease::get_id(build.source_package_release_id, connection)?;
        let arch_series = DistroArchSeries::get_id(build.distro_arch_series_id, connection)?;
        Ok(QueueEntry {
            ticket,
            build,
            source,
            arch_series,
        })
    }

    /// Architecture and trust check, health and idleness are the caller's business
    pub fn compatible_with(&self, builder: &Builder) -> bool {
        builder.processor_family == self.arch_series.processor_family
            && (builder.trusted || !self.build.pocket.requires_trust())
    }
}

/// An assignment that was committed and still has to be sent to the builder
#[derive(Debug, Clone)]
pub struct Assignment {
    pub builder: Builder,
    pub ticket_id: i32,
    pub build_id: i32,
    pub request: DispatchRequest,
}

/// Recomputes the score of every waiting ticket that is neither manual nor
/// pinned by a rescore
pub fn rescore_waiting(
    now: NaiveDateTime,
    config: &SchedulerConfig,
    connection: &mut SqliteConnection,
) -> Result<()> {
    for ticket in Ticket::list_waiting(connection)? {
        if ticket.manual {
            if ticket.score != 0 {
                Ticket::set_score(ticket.id, 0, connection)?;
            }
            continue;
        }
        if ticket.pinned {
            continue;
        }

        let entry = QueueEntry::load(ticket, connection)?;
        let score = score::compute(
            entry.source.urgency,
            entry.build.pocket,
            entry.ticket.created_at,
            now,
            config,
        );
        if score != entry.ticket.score {
            Ticket::set_score(entry.ticket.id, score, connection)?;
        }
    }
    Ok(())
}

/// Tickets automatic dispatch may pick, best first
pub fn candidates(now: NaiveDateTime, connection: &mut SqliteConnection) -> Result<Vec<QueueEntry>> {
    let mut entries = Vec::new();
    for ticket in Ticket::list_waiting(connection)? {
        if ticket.manual || !ticket.is_due(now) {
            continue;
        }
        entries.push(QueueEntry::load(ticket, connection)?);
    }
    Ok(entries)
}

/// The best entry a builder can take, `entries` must be in dispatch order
pub fn pick<'a>(
    builder: &Builder,
    entries: &'a [QueueEntry],
    taken: &[i32],
) -> Option<&'a QueueEntry> {
    entries
        .iter()
        .filter(|entry| !taken.contains(&entry.ticket.id))
        .find(|entry| entry.compatible_with(builder))
}

fn dispatch_request(entry: &QueueEntry, connection: &mut SqliteConnection) -> Result<Option<DispatchRequest>> {
    let chroot = match LibraryFile::load_ref(entry.arch_series.chroot_file_id, connection)? {
        Some(chroot) => chroot,
        None => return Ok(None),
    };

    Ok(Some(DispatchRequest {
        build_id: entry.build.id,
        name: entry.source.name.clone(),
        version: entry.source.version.clone(),
        architecture_tag: entry.arch_series.architecture_tag.clone(),
        pocket: entry.build.pocket,
        build_depends: entry.source.build_depends.clone(),
        chroot,
        files: entry.source.files(connection)?,
    }))
}

/// Hands a ticket to a builder and moves its build to BUILDING.
///
/// Returns `None` if the ticket or the builder was taken concurrently, or if
/// the arch series has no chroot, in which case the build goes to CHROOTWAIT.
pub fn assign(
    entry: &QueueEntry,
    builder: &Builder,
    now: NaiveDateTime,
    connection: &mut SqliteConnection,
) -> Result<Option<Assignment>> {
    connection
        .immediate_transaction::<_, Error, _>(|connection| {
            let request = match dispatch_request(entry, connection)? {
                Some(request) => request,
                None => {
                    warn!(
                        "No chroot for {}, build {} has to wait",
                        entry.arch_series.architecture_tag, entry.build.id
                    );
                    entry.build.transition(
                        BuildState::ChrootWait,
                        BuildUpdate {
                            finished_at: Some(Some(now)),
                            failure_note: Some(Some("no chroot available".to_string())),
                            ..Default::default()
                        },
                        connection,
                    )?;
                    Ticket::delete_for_build(entry.build.id, connection)?;
                    return Ok(None);
                }
            };

            if !Ticket::assign(entry.ticket.id, builder.id, now, connection)? {
                debug!(
                    "Ticket {} or builder {} was taken concurrently",
                    entry.ticket.id, builder.name
                );
                return Ok(None);
            }

            entry.build.transition(
                BuildState::Building,
                BuildUpdate {
                    started_at: Some(Some(now)),
                    builder_id: Some(Some(builder.id)),
                    ..Default::default()
                },
                connection,
            )?;

            Ok(Some(Assignment {
                builder: builder.clone(),
                ticket_id: entry.ticket.id,
                build_id: entry.build.id,
                request,
            }))
        })
        .map_err(db::contention)
}

fn take_back(
    build_id: i32,
    reason: &str,
    now: NaiveDateTime,
    config: &SchedulerConfig,
    connection: &mut SqliteConnection,
) -> Result<BuildState> {
    let build = Build::get_id(build_id, connection)?;
    let ticket = match Ticket::get_for_build(build_id, connection)? {
        Some(ticket) if build.state == BuildState::Building => ticket,
        _ => {
            debug!(
                "Build {build_id} is {} and not held by a builder anymore, nothing to take back",
                build.state
            );
            return Ok(build.state);
        }
    };

    let retries = build.retries + 1;
    if retries > config.max_retries() {
        warn!("Build {build_id} ran out of retries: {reason}");
        build.transition(
            BuildState::FailedToBuild,
            BuildUpdate {
                finished_at: Some(Some(now)),
                retries: Some(retries),
                manual_attention: Some(true),
                failure_note: Some(Some(format!("retry budget exhausted: {reason}"))),
                ..Default::default()
            },
            connection,
        )?;
        Ticket::delete_for_build(build_id, connection)?;
        return Ok(BuildState::FailedToBuild);
    }

    info!("Requeueing build {build_id} (retry {retries}): {reason}");
    build.transition(
        BuildState::NeedsBuild,
        BuildUpdate {
            started_at: Some(None),
            builder_id: Some(None),
            retries: Some(retries),
            failure_note: Some(Some(reason.to_string())),
            ..Default::default()
        },
        connection,
    )?;
    Ticket::unassign(ticket.id, Some(now + config.retry_cooldown()), connection)?;
    Ok(BuildState::NeedsBuild)
}

/// Takes a build back from a builder that lost it or went away.
///
/// Counts as a retry, once the budget is used up the build fails and is
/// flagged for an operator. A build that was finished or cancelled in the
/// meantime is left alone.
pub fn requeue_lost(
    build_id: i32,
    reason: &str,
    now: NaiveDateTime,
    config: &SchedulerConfig,
    connection: &mut SqliteConnection,
) -> Result<BuildState> {
    connection
        .immediate_transaction::<_, Error, _>(|connection| {
            take_back(build_id, reason, now, config, connection)
        })
        .map_err(db::contention)
}

/// The builder declined the dispatch, the build simply goes back
pub fn return_busy(build_id: i32, connection: &mut SqliteConnection) -> Result<()> {
    connection
        .immediate_transaction::<_, Error, _>(|connection| {
            let build = Build::get_id(build_id, connection)?;
            let ticket = Ticket::get_for_build(build_id, connection)?
                .ok_or_else(|| ArchiveError::not_found(format!("ticket for build {build_id}")))?;
            build.transition(
                BuildState::NeedsBuild,
                BuildUpdate {
                    started_at: Some(None),
                    builder_id: Some(None),
                    ..Default::default()
                },
                connection,
            )?;
            Ticket::unassign(ticket.id, None, connection)?;
            Ok(())
        })
        .map_err(db::contention)
}

/// Cancels a waiting or running build.
///
/// Returns the builder that was running it, if any, so the caller can send
/// a best-effort abort.
pub fn cancel(
    build_id: i32,
    now: NaiveDateTime,
    connection: &mut SqliteConnection,
) -> Result<Option<Builder>> {
    connection
        .immediate_transaction::<_, Error, _>(|connection| {
            let build = Build::get_id(build_id, connection)?;
            let builder = match (build.state, build.builder_id) {
                (BuildState::Building, Some(id)) => Some(Builder::get_id(id, connection)?),
                _ => None,
            };

            build.transition(
                BuildState::Cancelled,
                BuildUpdate {
                    finished_at: Some(Some(now)),
                    ..Default::default()
                },
                connection,
            )?;
            Ticket::delete_for_build(build_id, connection)?;
            Ok(builder)
        })
        .map_err(db::contention)
}

/// Operator retry of a failed, waiting or cancelled build
pub fn retry(
    build_id: i32,
    now: NaiveDateTime,
    config: &SchedulerConfig,
    connection: &mut SqliteConnection,
) -> Result<()> {
    connection
        .immediate_transaction::<_, Error, _>(|connection| {
            let build = Build::get_id(build_id, connection)?;
            if !build.state.is_retryable() {
                return Err(ArchiveError::invalid_transition(format!(
                    "build {build_id} is {} and can not be retried",
                    build.state
                )));
            }

            build.transition(
                BuildState::NeedsBuild,
                BuildUpdate {
                    started_at: Some(None),
                    finished_at: Some(None),
                    builder_id: Some(None),
                    retries: Some(0),
                    manual_attention: Some(false),
                    failure_note: Some(None),
                    ..Default::default()
                },
                connection,
            )?;
            enqueue(&build, now, config, connection)?;
            Ok(())
        })
        .map_err(db::contention)
}

/// Creates the ticket of a build that just (re)entered NEEDSBUILD
pub fn enqueue(
    build: &Build,
    now: NaiveDateTime,
    config: &SchedulerConfig,
    connection: &mut SqliteConnection,
) -> Result<i32> {
    let source = SourcePackageRelease::get_id(build.source_package_release_id, connection)?;
    NewTicket {
        build_id: build.id,
        score: score::compute(source.urgency, build.pocket, now, now, config),
        manual: false,
        created_at: now,
        not_before: None,
    }
    .insert(connection)
}

/// Operator dispatch of a waiting build to a named builder
pub fn dispatch_manual(
    build_id: i32,
    builder_id: i32,
    now: NaiveDateTime,
    connection: &mut SqliteConnection,
) -> Result<Assignment> {
    let builder = Builder::get_id(builder_id, connection)?;
    if !builder.builder_ok {
        return Err(ArchiveError::builder_unhealthy(format!(
            "builder {} is unhealthy: {}",
            builder.name,
            builder.fail_notes.as_deref().unwrap_or("no notes")
        )));
    }
    if let Some(ticket) = Ticket::get_for_builder(builder.id, connection)? {
        return Err(ArchiveError::conflict(format!(
            "builder {} is busy with build {}",
            builder.name, ticket.build_id
        )));
    }

    let ticket = Ticket::get_for_build(build_id, connection)?
        .ok_or_else(|| ArchiveError::invalid_transition(format!("build {build_id} is not queued")))?;
    if ticket.builder_id.is_some() {
        return Err(ArchiveError::invalid_transition(format!(
            "build {build_id} is already dispatched"
        )));
    }

    let entry = QueueEntry::load(ticket, connection)?;
    if !entry.compatible_with(&builder) {
        return Err(ArchiveError::invalid_input(format!(
            "builder {} ({}, trusted={}) can not build {} for {} in {}",
            builder.name,
            builder.processor_family,
            builder.trusted,
            entry.source.name,
            entry.arch_series.architecture_tag,
            entry.build.pocket,
        )));
    }

    match assign(&entry, &builder, now, connection)? {
        Some(assignment) => Ok(assignment),
        None => {
            let build = Build::get_id(build_id, connection)?;
            if build.state == BuildState::ChrootWait {
                Err(ArchiveError::invalid_transition(format!(
                    "build {build_id} has no chroot and moved to {}",
                    build.state
                )))
            } else {
                Err(ArchiveError::conflict(format!(
                    "build {build_id} was dispatched concurrently"
                )))
            }
        }
    }
}

fn waiting_ticket(build_id: i32, connection: &mut SqliteConnection) -> Result<Ticket> {
    let ticket = Ticket::get_for_build(build_id, connection)?
        .ok_or_else(|| ArchiveError::not_found(format!("no queue entry for build {build_id}")))?;
    if ticket.builder_id.is_some() {
        return Err(ArchiveError::invalid_transition(format!(
            "build {build_id} is already dispatched"
        )));
    }
    Ok(ticket)
}

pub fn rescore(build_id: i32, score: i32, connection: &mut SqliteConnection) -> Result<()> {
    let ticket = waiting_ticket(build_id, connection)?;
    Ticket::pin_score(ticket.id, score, connection)?;
    info!("Build {build_id} rescored to {score}");
    Ok(())
}

pub fn set_manual(build_id: i32, manual: bool, connection: &mut SqliteConnection) -> Result<()> {
    let ticket = waiting_ticket(build_id, connection)?;
    Ticket::set_manual(ticket.id, manual, connection)?;
    if manual {
        Ticket::set_score(ticket.id, 0, connection)?;
    }
    info!("Build {build_id} manual={manual}");
    Ok(())
}

/// A builder failed a protocol call: it is marked unhealthy and its build
/// goes back to the queue.
pub fn builder_failed(
    builder: &Builder,
    build_id: Option<i32>,
    reason: &str,
    now: NaiveDateTime,
    config: &SchedulerConfig,
    connection: &mut SqliteConnection,
) -> Result<()> {
    connection
        .immediate_transaction::<_, Error, _>(|connection| {
            Builder::mark_unhealthy(builder.id, reason, connection)?;
            if let Some(build_id) = build_id {
                take_back(build_id, reason, now, config, connection)?;
            }
            Ok(())
        })
        .map_err(db::contention)
}
