use crate::api::v1::{BuildState, Pocket};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A build waiting for, or occupying, a builder slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedBuild {
    pub id: i32,
    pub build_id: i32,
    pub name: String,
    pub version: String,
    pub architecture_tag: String,
    pub pocket: Pocket,
    pub state: BuildState,
    pub builder_id: Option<i32>,
    pub score: i32,
    pub manual: bool,
    /// The score was set by an operator and is not recomputed
    #[serde(default)]
    pub pinned: bool,
    pub log_tail: Option<String>,
    pub created_at: NaiveDateTime,
    pub started_at: Option<NaiveDateTime>,
    pub last_ping: Option<NaiveDateTime>,
    pub not_before: Option<NaiveDateTime>,
}

impl QueuedBuild {
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.not_before.map_or(true, |t| t <= now)
    }
}
