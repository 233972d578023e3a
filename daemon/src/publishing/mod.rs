//! The publishing state machine and domination.
//!
//! ```text
//! PENDING -> PUBLISHED -> SUPERSEDED -> PENDINGREMOVAL -> REMOVED
//! ```
//!
//! Every step re-reads the record inside an immediate transaction and writes
//! it back with a conditional update, so two publishers racing on the same
//! domination group end with one winner and one Conflict. The partial unique
//! indexes on the publication tables back this up in storage.

pub mod librarian;

use self::librarian::FileStore;
use crate::db;
use crate::models::*;
use crate::scheduler::depwait;
use crate::versions;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use pocketd_common::api::v1 as api;
use pocketd_common::api::v1::{
    ListPublishedQuery, OverrideRequest, PublicationKind, PublicationRef, PublishingStatus,
};
use pocketd_common::config::{PublisherConfig, SchedulerConfig};
use pocketd_common::errors::*;
use std::sync::Arc;

/// Runs `$f::<Model>(id, args..)` for the family a reference points into
macro_rules! by_kind {
    ($record:expr, $f:ident ( $($arg:expr),* )) => {
        match $record.kind {
            PublicationKind::Source => $f::<SourcePublication>($record.id, $($arg),*),
            PublicationKind::Binary => $f::<BinaryPublication>($record.id, $($arg),*),
        }
    };
}

fn expect_transition<R: PublicationRecord>(record: &R, to: PublishingStatus) -> Result<()> {
    if record.status().can_transition_to(to) {
        Ok(())
    } else {
        Err(ArchiveError::invalid_transition(format!(
            "{}: {} -> {}",
            record.reference(),
            record.status(),
            to
        )))
    }
}

/// Supersedes every visible PUBLISHED record in `record`'s group, with
/// `component` standing in for the record's own.
fn dominate<R: PublicationRecord>(
    record: &R,
    component: &str,
    now: NaiveDateTime,
    connection: &mut SqliteConnection,
) -> Result<usize> {
    let rivals = record.visible_rivals(component, connection)?;
    for rival in &rivals {
        rival.apply(
            &PublicationChange {
                status: Some(PublishingStatus::Superseded),
                superseded_at: Some(now),
                superseded_by: Some(record.release_id()),
                ..Default::default()
            },
            connection,
        )?;
        info!("{} superseded by {}", rival.reference(), record.reference());
    }
    Ok(rivals.len())
}

/// PENDING to PUBLISHED. A visible record supersedes the published records
/// of its group in the same transaction, an embargoed one dominates nothing.
pub fn publish<R: PublicationRecord>(
    id: i32,
    now: NaiveDateTime,
    connection: &mut SqliteConnection,
) -> Result<()> {
    connection
        .immediate_transaction::<_, Error, _>(|connection| {
            let record = R::get_id(id, connection)?;
            expect_transition(&record, PublishingStatus::Published)?;

            if !record.embargo() {
                dominate(&record, record.component(), now, connection)?;
            }
            record.apply(
                &PublicationChange {
                    status: Some(PublishingStatus::Published),
                    published_at: Some(now),
                    ..Default::default()
                },
                connection,
            )?;

            info!(
                "Published {}{}",
                record.reference(),
                if record.embargo() { " (embargoed)" } else { "" }
            );
            Ok(())
        })
        .map_err(db::contention)
}

fn make_pending_removal<R: PublicationRecord>(
    record: &R,
    deletion_date: NaiveDateTime,
    now: NaiveDateTime,
    connection: &mut SqliteConnection,
) -> Result<()> {
    expect_transition(record, PublishingStatus::PendingRemoval)?;
    record.apply(
        &PublicationChange {
            status: Some(PublishingStatus::PendingRemoval),
            made_pending_at: Some(now),
            scheduled_deletion_at: Some(deletion_date),
            ..Default::default()
        },
        connection,
    )?;
    info!(
        "{} scheduled for removal at {}",
        record.reference(),
        deletion_date
    );
    Ok(())
}

/// SUPERSEDED or PENDING to PENDINGREMOVAL
pub fn schedule_removal<R: PublicationRecord>(
    id: i32,
    deletion_date: NaiveDateTime,
    now: NaiveDateTime,
    connection: &mut SqliteConnection,
) -> Result<()> {
    connection
        .immediate_transaction::<_, Error, _>(|connection| {
            let record = R::get_id(id, connection)?;
            match record.status() {
                PublishingStatus::Pending | PublishingStatus::Superseded => (),
                PublishingStatus::Published => {
                    return Err(ArchiveError::invalid_transition(format!(
                        "{} is PUBLISHED, withdraw it instead",
                        record.reference()
                    )))
                }
                other => {
                    return Err(ArchiveError::invalid_transition(format!(
                        "{}: {} -> {}",
                        record.reference(),
                        other,
                        PublishingStatus::PendingRemoval
                    )))
                }
            }
            make_pending_removal(&record, deletion_date, now, connection)
        })
        .map_err(db::contention)
}

/// PUBLISHED to PENDINGREMOVAL, removal without a successor
pub fn withdraw<R: PublicationRecord>(
    id: i32,
    deletion_date: NaiveDateTime,
    now: NaiveDateTime,
    connection: &mut SqliteConnection,
) -> Result<()> {
    connection
        .immediate_transaction::<_, Error, _>(|connection| {
            let record = R::get_id(id, connection)?;
            if record.status() != PublishingStatus::Published {
                return Err(ArchiveError::invalid_transition(format!(
                    "{} is {}, only PUBLISHED records can be withdrawn",
                    record.reference(),
                    record.status()
                )));
            }
            make_pending_removal(&record, deletion_date, now, connection)
        })
        .map_err(db::contention)
}

/// PENDINGREMOVAL to REMOVED once the deletion date has passed.
///
/// Returns the content hashes nothing else references anymore, the caller
/// deletes them from the file store after this has committed.
pub fn remove<R: PublicationRecord>(
    id: i32,
    now: NaiveDateTime,
    connection: &mut SqliteConnection,
) -> Result<Vec<String>> {
    connection
        .immediate_transaction::<_, Error, _>(|connection| {
            let record = R::get_id(id, connection)?;
            expect_transition(&record, PublishingStatus::Removed)?;
            match record.scheduled_deletion_at() {
                Some(at) if at <= now => (),
                at => {
                    return Err(ArchiveError::invalid_transition(format!(
                        "{} is not due for removal (scheduled for {:?})",
                        record.reference(),
                        at
                    )))
                }
            }

            record.apply(
                &PublicationChange {
                    status: Some(PublishingStatus::Removed),
                    removed_at: Some(now),
                    ..Default::default()
                },
                connection,
            )?;

            let mut orphans = Vec::new();
            for sha256 in record.file_hashes(connection)? {
                if !sha256_in_use(&sha256, record.reference(), connection)? {
                    orphans.push(sha256);
                }
            }
            info!(
                "Removed {}, {} files no longer referenced",
                record.reference(),
                orphans.len()
            );
            Ok(orphans)
        })
        .map_err(db::contention)
}

/// Makes an embargoed record public. A PUBLISHED record dominates its group
/// at this moment, together with the flag flip.
pub fn lift_embargo<R: PublicationRecord>(
    id: i32,
    now: NaiveDateTime,
    connection: &mut SqliteConnection,
) -> Result<()> {
    connection
        .immediate_transaction::<_, Error, _>(|connection| {
            let record = R::get_id(id, connection)?;
            if !record.embargo() {
                return Err(ArchiveError::invalid_transition(format!(
                    "{} is not embargoed",
                    record.reference()
                )));
            }
            // records on their way out are never disclosed
            if !record.status().allows_override() {
                return Err(ArchiveError::invalid_transition(format!(
                    "{} is {}, the embargo can not be lifted",
                    record.reference(),
                    record.status()
                )));
            }

            if record.status() == PublishingStatus::Published {
                dominate(&record, record.component(), now, connection)?;
            }
            record.apply(
                &PublicationChange {
                    embargo: Some(false),
                    embargo_lifted_at: Some(now),
                    ..Default::default()
                },
                connection,
            )?;
            info!("Lifted embargo of {}", record.reference());
            Ok(())
        })
        .map_err(db::contention)
}

/// Reclassifies a live record in place, the status is left alone
pub fn override_record<R: PublicationRecord>(
    id: i32,
    request: &OverrideRequest,
    _now: NaiveDateTime,
    connection: &mut SqliteConnection,
) -> Result<()> {
    for (what, value) in [("component", &request.component), ("section", &request.section)] {
        if value.is_empty() || value.contains(char::is_whitespace) {
            return Err(ArchiveError::invalid_input(format!(
                "invalid {what}: {value:?}"
            )));
        }
    }
    if R::KIND == PublicationKind::Source && request.priority.is_some() {
        return Err(ArchiveError::invalid_input(
            "source publications have no priority",
        ));
    }

    connection
        .immediate_transaction::<_, Error, _>(|connection| {
            let record = R::get_id(id, connection)?;
            if !record.status().allows_override() {
                return Err(ArchiveError::invalid_transition(format!(
                    "{} is {}, overrides need a PENDING or PUBLISHED record",
                    record.reference(),
                    record.status()
                )));
            }

            let moves = record.component() != request.component;
            if moves && record.status() == PublishingStatus::Published && !record.embargo() {
                let rivals = record.visible_rivals(&request.component, connection)?;
                if let Some(rival) = rivals.first() {
                    return Err(ArchiveError::invalid_transition(format!(
                        "{} is already published in component {}",
                        rival.reference(),
                        request.component
                    )));
                }
            }

            record.apply(
                &PublicationChange {
                    component: Some(request.component.clone()),
                    section: Some(request.section.clone()),
                    priority: request.priority.clone(),
                    ..Default::default()
                },
                connection,
            )?;
            info!(
                "Overrode {}: component={} section={}",
                record.reference(),
                request.component,
                request.section
            );
            Ok(())
        })
        .map_err(db::contention)
}

fn load_api<R: PublicationRecord>(
    id: i32,
    connection: &mut SqliteConnection,
) -> Result<api::Publication> {
    R::get_id(id, connection)?.into_api(connection)
}

pub fn get(record: PublicationRef, connection: &mut SqliteConnection) -> Result<api::Publication> {
    by_kind!(record, load_api(connection))
}

/// The visible published set of a series and pocket, both families, by name
/// and version
pub fn list_published(
    query: &ListPublishedQuery,
    connection: &mut SqliteConnection,
) -> Result<Vec<api::Publication>> {
    let mut published = Vec::new();
    for record in SourcePublication::list_published(
        query.archive_id,
        query.distro_series_id,
        query.pocket,
        connection,
    )? {
        published.push(record.into_api(connection)?);
    }
    for record in BinaryPublication::list_published(
        query.archive_id,
        query.distro_series_id,
        query.pocket,
        connection,
    )? {
        published.push(record.into_api(connection)?);
    }

    published.sort_by(|a, b| {
        versions::cmp_name_version((&a.name, &a.version), (&b.name, &b.version))
            .then_with(|| a.architecture_tag.cmp(&b.architecture_tag))
            .then_with(|| a.kind.as_str().cmp(b.kind.as_str()))
    });
    Ok(published)
}

/// Runs `f` until it stops losing races, at most `retries` times more.
/// Persistent losses surface as "publication contention".
pub fn retry_conflicts<T, F>(record: PublicationRef, retries: u32, mut f: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut attempt = 0;
    loop {
        match f() {
            Err(err) if ArchiveError::is_conflict(&err) => {
                if attempt >= retries {
                    return Err(ArchiveError::conflict(format!(
                        "publication contention on {record}: {err:#}"
                    )));
                }
                attempt += 1;
                debug!("Retrying {} after conflict ({}/{}): {:#}", record, attempt, retries, err);
            }
            result => return result,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublisherSummary {
    pub published: usize,
    pub removed: usize,
    pub files_deleted: usize,
}

/// Pool-backed front of the engine, used by the api and the periodic pass
pub struct Publisher {
    pool: db::Pool,
    store: Arc<dyn FileStore>,
    config: PublisherConfig,
    scheduler: SchedulerConfig,
}

impl Publisher {
    pub fn new(
        pool: db::Pool,
        store: Arc<dyn FileStore>,
        config: PublisherConfig,
        scheduler: SchedulerConfig,
    ) -> Publisher {
        Publisher {
            pool,
            store,
            config,
            scheduler,
        }
    }

    fn change<F>(&self, record: PublicationRef, f: F) -> Result<api::Publication>
    where
        F: Fn(NaiveDateTime, &mut SqliteConnection) -> Result<()>,
    {
        let mut connection = self.pool.get()?;
        retry_conflicts(record, self.config.conflict_retries(), || {
            f(Utc::now().naive_utc(), &mut connection)
        })?;
        get(record, &mut connection)
    }

    /// Newly visible binaries may release builds waiting for them
    fn binaries_changed(&self, record: PublicationRef) -> Result<()> {
        if record.kind == PublicationKind::Binary {
            let mut connection = self.pool.get()?;
            depwait::reevaluate(Utc::now().naive_utc(), &self.scheduler, &mut connection)?;
        }
        Ok(())
    }

    pub fn publish(&self, record: PublicationRef) -> Result<api::Publication> {
        let publication = self.change(record, |now, connection| {
            by_kind!(record, publish(now, connection))
        })?;
        self.binaries_changed(record)?;
        Ok(publication)
    }

    pub fn schedule_removal(
        &self,
        record: PublicationRef,
        deletion_date: NaiveDateTime,
    ) -> Result<api::Publication> {
        self.change(record, |now, connection| {
            by_kind!(record, schedule_removal(deletion_date, now, connection))
        })
    }

    pub fn withdraw(
        &self,
        record: PublicationRef,
        deletion_date: NaiveDateTime,
    ) -> Result<api::Publication> {
        self.change(record, |now, connection| {
            by_kind!(record, withdraw(deletion_date, now, connection))
        })
    }

    pub fn lift_embargo(&self, record: PublicationRef) -> Result<api::Publication> {
        let publication = self.change(record, |now, connection| {
            by_kind!(record, lift_embargo(now, connection))
        })?;
        self.binaries_changed(record)?;
        Ok(publication)
    }

    pub fn override_record(
        &self,
        record: PublicationRef,
        request: &OverrideRequest,
    ) -> Result<api::Publication> {
        self.change(record, |now, connection| {
            by_kind!(record, override_record(request, now, connection))
        })
    }

    fn due<R: PublicationRecord>(&self, now: NaiveDateTime) -> Result<Vec<PublicationRef>> {
        let mut connection = self.pool.get()?;
        let due = R::due_for_removal(now, &mut connection)?
            .iter()
            .map(|r| r.reference())
            .collect();
        Ok(due)
    }

    /// Removes every record past its deletion date, then deletes the files
    /// nothing references anymore.
    pub async fn sweep(&self) -> Result<(usize, usize)> {
        let now = Utc::now().naive_utc();
        let mut due = self.due::<SourcePublication>(now)?;
        due.extend(self.due::<BinaryPublication>(now)?);

        let mut removed = 0;
        let mut orphans = Vec::new();
        for record in due {
            let result = {
                let mut connection = self.pool.get()?;
                retry_conflicts(record, self.config.conflict_retries(), || {
                    by_kind!(record, remove(now, &mut connection))
                })
            };
            match result {
                Ok(hashes) => {
                    removed += 1;
                    orphans.extend(hashes);
                }
                Err(err) => warn!("Failed to remove {}: {:#}", record, err),
            }
        }
        orphans.sort();
        orphans.dedup();

        let mut deleted = 0;
        for sha256 in orphans {
            if let Err(err) = self.store.delete(&sha256).await {
                error!("Failed to delete file {}: {:#}", sha256, err);
                continue;
            }
            let mut connection = self.pool.get()?;
            LibraryFile::mark_deleted(&sha256, Utc::now().naive_utc(), &mut connection)?;
            deleted += 1;
        }

        Ok((removed, deleted))
    }

    fn pending<R: PublicationRecord>(&self) -> Result<Vec<PublicationRef>> {
        let mut connection = self.pool.get()?;
        let pending = R::pending_visible(&mut connection)?
            .iter()
            .map(|r| r.reference())
            .collect();
        Ok(pending)
    }

    /// One publisher pass: publishes pending records if enabled, then sweeps
    pub async fn pass(&self) -> Result<PublisherSummary> {
        let mut summary = PublisherSummary::default();

        if self.config.auto_publish {
            let mut pending = self.pending::<SourcePublication>()?;
            pending.extend(self.pending::<BinaryPublication>()?);
            for record in pending {
                match self.publish(record) {
                    Ok(_) => summary.published += 1,
                    Err(err) => warn!("Failed to publish {}: {:#}", record, err),
                }
            }
        }

        let (removed, deleted) = self.sweep().await?;
        summary.removed = removed;
        summary.files_deleted = deleted;

        debug!("Publisher pass finished: {:?}", summary);
        Ok(summary)
    }

    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.interval());
        loop {
            interval.tick().await;
            if let Err(err) = self.pass().await {
                error!("Publisher pass failed: {:#}", err);
            }
        }
    }
}
