use crate::config::Config;
use crate::job::{self, Completion};
use crate::proc::SharedLog;
use pocketd_common::api::builder::*;
use pocketd_common::errors::*;
use pocketd_common::utils;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

enum Slot {
    Idle,
    Building {
        build_id: i32,
        log: SharedLog,
        abort: Arc<Notify>,
    },
    Finished(BuildResult),
    Aborted {
        build_id: i32,
    },
}

/// The one build slot of this agent.
///
/// A finished result is held until the daemon fetches it, the agent is busy
/// until then.
pub struct Agent {
    config: Config,
    slot: Mutex<Slot>,
}

impl Agent {
    pub fn new(config: Config) -> Arc<Agent> {
        Arc::new(Agent {
            config,
            slot: Mutex::new(Slot::Idle),
        })
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn dispatch(self: &Arc<Self>, request: DispatchRequest) -> DispatchResponse {
        let mut slot = self.slot();
        match &*slot {
            Slot::Idle | Slot::Aborted { .. } => (),
            Slot::Building { build_id, .. } => {
                info!("Refusing build {}, still building {}", request.build_id, build_id);
                return DispatchResponse::Busy;
            }
            Slot::Finished(result) => {
                info!(
                    "Refusing build {}, result of {} was not fetched yet",
                    request.build_id, result.build_id
                );
                return DispatchResponse::Busy;
            }
        }

        let log = SharedLog::default();
        let abort = Arc::new(Notify::new());
        *slot = Slot::Building {
            build_id: request.build_id,
            log: log.clone(),
            abort: abort.clone(),
        };
        info!("Accepted build {} ({} {})", request.build_id, request.name, request.version);
        tokio::spawn(self.clone().execute(request, log, abort));
        DispatchResponse::Accepted
    }

    async fn execute(self: Arc<Self>, request: DispatchRequest, log: SharedLog, abort: Arc<Notify>) {
        let completion = job::run(&self.config, &request, log.clone(), &abort).await;

        let mut slot = self.slot();
        if !matches!(&*slot, Slot::Building { build_id, .. } if *build_id == request.build_id) {
            warn!("Build {} is no longer in the slot, dropping its result", request.build_id);
            return;
        }

        *slot = match completion {
            Ok(Completion::Finished(result)) => Slot::Finished(result),
            Ok(Completion::Aborted) => {
                info!("Build {} was aborted", request.build_id);
                Slot::Aborted {
                    build_id: request.build_id,
                }
            }
            Err(err) => {
                error!("Build {} could not be run: {:#}", request.build_id, err);
                let log = log.lock().unwrap_or_else(PoisonError::into_inner);
                let mut log_tail = utils::log_tail(&log, self.config.build.log_tail_size());
                log_tail.push_str(&format!("\npocketd-builder: {:#}\n", err));
                Slot::Finished(BuildResult {
                    build_id: request.build_id,
                    outcome: BuildOutcome::Failed,
                    binaries: vec![],
                    log: None,
                    log_tail,
                    dependencies: None,
                })
            }
        };
    }

    pub fn status(&self) -> BuilderStatus {
        match &*self.slot() {
            Slot::Idle => BuilderStatus::Idle,
            Slot::Building { build_id, log, .. } => {
                let log = log.lock().unwrap_or_else(PoisonError::into_inner);
                BuilderStatus::Building {
                    build_id: *build_id,
                    log_tail: utils::log_tail(&log, self.config.build.log_tail_size()),
                }
            }
            Slot::Finished(result) => BuilderStatus::Finished {
                build_id: result.build_id,
            },
            Slot::Aborted { build_id } => BuilderStatus::Aborted {
                build_id: *build_id,
            },
        }
    }

    /// Hands out the result of a finished build, the agent is idle afterwards
    pub fn take_result(&self, build_id: i32) -> Result<BuildResult> {
        let mut slot = self.slot();
        match mem::replace(&mut *slot, Slot::Idle) {
            Slot::Finished(result) if result.build_id == build_id => Ok(result),
            other => {
                *slot = other;
                Err(ArchiveError::not_found(format!("no result for build {build_id}")))
            }
        }
    }

    /// Returns false if the build is not running here
    pub fn abort(&self, build_id: i32) -> bool {
        match &*self.slot() {
            Slot::Building {
                build_id: running,
                abort,
                ..
            } if *running == build_id => {
                info!("Aborting build {}", build_id);
                abort.notify_one();
                true
            }
            _ => false,
        }
    }
}
