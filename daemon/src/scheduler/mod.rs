pub mod depwait;
pub mod dispatch;
pub mod ingest;
pub mod protocol;
pub mod score;

use crate::db;
use crate::models::{Build, Builder, Ticket};
use chrono::Utc;
use futures::future::join_all;
use pocketd_common::api::builder::{BuilderStatus, DispatchResponse};
use pocketd_common::config::SchedulerConfig;
use pocketd_common::errors::*;
use pocketd_common::utils;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

pub use self::dispatch::Assignment;
pub use self::protocol::{BuilderProtocol, HttpProtocol};

/// Counters of one scheduler pass, mostly for logs and tests
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub polled: usize,
    pub finished: usize,
    pub requeued: usize,
    pub dispatched: usize,
}

/// What a single builder poll turned out to be
enum PollOutcome {
    Running,
    Finished,
    Requeued,
}

pub struct Scheduler {
    pool: db::Pool,
    protocol: Arc<dyn BuilderProtocol>,
    config: SchedulerConfig,
    pass_lock: Mutex<()>,
}

impl Scheduler {
    pub fn new(pool: db::Pool, protocol: Arc<dyn BuilderProtocol>, config: SchedulerConfig) -> Scheduler {
        Scheduler {
            pool,
            protocol,
            config,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    async fn bounded<T, F>(&self, what: &str, builder: &Builder, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.config.builder_timeout(), fut).await {
            Ok(result) => result.with_context(|| anyhow!("{} on builder {:?} failed", what, builder.name)),
            Err(_) => Err(ArchiveError::timeout(format!(
                "builder {:?} did not answer {} within {:?}",
                builder.name,
                what,
                self.config.builder_timeout()
            ))),
        }
    }

    /// Runs one scheduler pass: polls every busy builder, then hands waiting
    /// tickets to idle ones. Passes never overlap.
    pub async fn pass(&self) -> Result<PassSummary> {
        let _guard = self.pass_lock.lock().await;
        let mut summary = PassSummary::default();

        let busy = {
            let mut connection = self.pool.get()?;
            let mut busy = Vec::new();
            for ticket in Ticket::list_assigned(&mut connection)? {
                if let Some(builder_id) = ticket.builder_id {
                    busy.push((Builder::get_id(builder_id, &mut connection)?, ticket));
                }
            }
            busy
        };

        summary.polled = busy.len();
        let polls = busy
            .iter()
            .map(|(builder, ticket)| self.poll(builder, ticket));
        for outcome in join_all(polls).await {
            match outcome {
                Ok(PollOutcome::Running) => (),
                Ok(PollOutcome::Finished) => summary.finished += 1,
                Ok(PollOutcome::Requeued) => summary.requeued += 1,
                Err(err) => error!("Failed to process builder poll: {:#}", err),
            }
        }

        let assignments = {
            let mut connection = self.pool.get()?;
            let now = Utc::now().naive_utc();
            dispatch::rescore_waiting(now, &self.config, &mut connection)?;
            let entries = dispatch::candidates(now, &mut connection)?;

            let mut taken = Vec::new();
            let mut assignments = Vec::new();
            for builder in Builder::list_available(&mut connection)? {
                while let Some(entry) = dispatch::pick(&builder, &entries, &taken) {
                    taken.push(entry.ticket.id);
                    match dispatch::assign(entry, &builder, now, &mut connection) {
                        Ok(Some(assignment)) => {
                            assignments.push(assignment);
                            break;
                        }
                        Ok(None) => (),
                        Err(err) if ArchiveError::is_conflict(&err) => {
                            debug!("Skipping build {}: {:#}", entry.build.id, err);
                        }
                        Err(err) => return Err(err),
                    }
                    // a concurrent pass got this builder first
                    if Ticket::get_for_builder(builder.id, &mut connection)?.is_some() {
                        break;
                    }
                }
            }
            assignments
        };

        let sends = assignments.iter().map(|a| self.send(a));
        for result in join_all(sends).await {
            match result {
                Ok(true) => summary.dispatched += 1,
                Ok(false) => summary.requeued += 1,
                Err(err) => error!("Failed to dispatch: {:#}", err),
            }
        }

        debug!("Scheduler pass finished: {:?}", summary);
        Ok(summary)
    }

    async fn poll(&self, builder: &Builder, ticket: &Ticket) -> Result<PollOutcome> {
        let status = self
            .bounded("status", builder, self.protocol.status(builder))
            .await;
        let now = Utc::now().naive_utc();

        let status = match status {
            Ok(status) => status,
            Err(err) => {
                let reason = format!("{:#}", err);
                warn!("Builder {:?} stopped responding: {}", builder.name, reason);
                let mut connection = self.pool.get()?;
                dispatch::builder_failed(builder, Some(ticket.build_id), &reason, now, &self.config, &mut connection)?;
                return Ok(PollOutcome::Requeued);
            }
        };

        match status {
            BuilderStatus::Building { build_id, log_tail } if build_id == ticket.build_id => {
                let tail = utils::log_tail(log_tail.as_bytes(), self.config.log_tail_size());
                let mut connection = self.pool.get()?;
                Ticket::ping(ticket.id, Some(&tail), now, &mut connection)?;
                Build::set_log_tail(build_id, &tail, &mut connection)?;
                Builder::seen(builder.id, now, &mut connection)?;
                Ok(PollOutcome::Running)
            }
            BuilderStatus::Finished { build_id } if build_id == ticket.build_id => {
                let result = self
                    .bounded("fetch result", builder, self.protocol.fetch_result(builder, build_id))
                    .await;
                let now = Utc::now().naive_utc();
                let mut connection = self.pool.get()?;
                match result {
                    Ok(result) if result.build_id == build_id => {
                        let state = ingest::ingest(builder, &result, now, &self.config, &mut connection)?;
                        info!("Build {} on {:?} finished: {}", build_id, builder.name, state);
                        Ok(PollOutcome::Finished)
                    }
                    Ok(result) => {
                        let reason = format!(
                            "returned result for build {} while running {}",
                            result.build_id, build_id
                        );
                        dispatch::builder_failed(builder, Some(build_id), &reason, now, &self.config, &mut connection)?;
                        Ok(PollOutcome::Requeued)
                    }
                    Err(err) => {
                        let reason = format!("{:#}", err);
                        dispatch::builder_failed(builder, Some(build_id), &reason, now, &self.config, &mut connection)?;
                        Ok(PollOutcome::Requeued)
                    }
                }
            }
            other => {
                // idle, aborted or busy with something else: the build is lost,
                // the builder itself is fine
                let reason = format!("builder {:?} reported {:?}", builder.name, other);
                let mut connection = self.pool.get()?;
                Builder::seen(builder.id, now, &mut connection)?;
                dispatch::requeue_lost(ticket.build_id, &reason, now, &self.config, &mut connection)?;
                Ok(PollOutcome::Requeued)
            }
        }
    }

    /// Sends a committed assignment, returns false if the build went back to the queue
    pub async fn send(&self, assignment: &Assignment) -> Result<bool> {
        let builder = &assignment.builder;
        let response = self
            .bounded("dispatch", builder, self.protocol.dispatch(builder, &assignment.request))
            .await;
        let now = Utc::now().naive_utc();
        let mut connection = self.pool.get()?;

        match response {
            Ok(DispatchResponse::Accepted) => {
                info!("Dispatched build {} to {:?}", assignment.build_id, builder.name);
                Builder::seen(builder.id, now, &mut connection)?;
                Ok(true)
            }
            Ok(DispatchResponse::Busy) => {
                debug!("Builder {:?} is busy, returning build {}", builder.name, assignment.build_id);
                Builder::seen(builder.id, now, &mut connection)?;
                dispatch::return_busy(assignment.build_id, &mut connection)?;
                Ok(false)
            }
            Err(err) => {
                let reason = format!("{:#}", err);
                warn!("Dispatch to {:?} failed: {}", builder.name, reason);
                dispatch::builder_failed(builder, Some(assignment.build_id), &reason, now, &self.config, &mut connection)?;
                Ok(false)
            }
        }
    }

    /// Operator dispatch, the assignment is committed before it is sent
    pub async fn dispatch_manual(&self, build_id: i32, builder_id: i32) -> Result<bool> {
        let assignment = {
            let mut connection = self.pool.get()?;
            dispatch::dispatch_manual(build_id, builder_id, Utc::now().naive_utc(), &mut connection)?
        };
        self.send(&assignment).await
    }

    /// Cancels a build. A running build gets an abort sent in the background,
    /// the answer is never waited for.
    pub fn cancel(&self, build_id: i32) -> Result<()> {
        let builder = {
            let mut connection = self.pool.get()?;
            dispatch::cancel(build_id, Utc::now().naive_utc(), &mut connection)?
        };

        if let Some(builder) = builder {
            let protocol = self.protocol.clone();
            let timeout = self.config.builder_timeout();
            tokio::spawn(async move {
                match tokio::time::timeout(timeout, protocol.abort(&builder, build_id)).await {
                    Ok(Ok(())) => debug!("Builder {:?} aborted build {}", builder.name, build_id),
                    Ok(Err(err)) => warn!("Failed to abort build {} on {:?}: {:#}", build_id, builder.name, err),
                    Err(_) => warn!("Abort of build {} on {:?} timed out", build_id, builder.name),
                }
            });
        }
        Ok(())
    }

    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.interval());
        loop {
            interval.tick().await;
            if let Err(err) = self.pass().await {
                error!("Scheduler pass failed: {:#}", err);
            }
        }
    }
}
