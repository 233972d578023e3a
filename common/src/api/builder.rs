//! Messages exchanged between the daemon and a builder agent.
//!
//! Every builder serves these under `/builder/v1/` and answers one request at
//! a time. The daemon only talks to a builder after checking trust and
//! processor family.

use crate::api::v1::{BuildState, FileRef, Pocket};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub build_id: i32,
    pub name: String,
    pub version: String,
    pub architecture_tag: String,
    pub pocket: Pocket,
    pub build_depends: String,
    pub chroot: FileRef,
    pub files: Vec<FileRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchResponse {
    Accepted,
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BuilderStatus {
    Idle,
    Building { build_id: i32, log_tail: String },
    /// The result is ready to be fetched
    Finished { build_id: i32 },
    Aborted { build_id: i32 },
}

impl BuilderStatus {
    pub fn build_id(&self) -> Option<i32> {
        match self {
            BuilderStatus::Idle => None,
            BuilderStatus::Building { build_id, .. }
            | BuilderStatus::Finished { build_id }
            | BuilderStatus::Aborted { build_id } => Some(*build_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildOutcome {
    Success,
    Failed,
    DependencyWait,
    ManualDependencyWait,
    ChrootProblem,
    UploadFailed,
}

impl BuildOutcome {
    pub fn build_state(&self) -> BuildState {
        match self {
            BuildOutcome::Success => BuildState::FullyBuilt,
            BuildOutcome::Failed => BuildState::FailedToBuild,
            BuildOutcome::DependencyWait => BuildState::DependencyWait,
            BuildOutcome::ManualDependencyWait => BuildState::ManualDepWait,
            BuildOutcome::ChrootProblem => BuildState::ChrootWait,
            BuildOutcome::UploadFailed => BuildState::FailedToUpload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryReport {
    pub name: String,
    pub version: String,
    pub architecture_specific: bool,
    #[serde(default)]
    pub depends: String,
    #[serde(default)]
    pub conflicts: String,
    #[serde(default)]
    pub provides: String,
    pub component: Option<String>,
    pub section: Option<String>,
    pub priority: Option<String>,
    pub files: Vec<FileRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    pub build_id: i32,
    pub outcome: BuildOutcome,
    #[serde(default)]
    pub binaries: Vec<BinaryReport>,
    pub log: Option<FileRef>,
    #[serde(default)]
    pub log_tail: String,
    /// Unmet relations, set for dependency-wait outcomes
    pub dependencies: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortRequest {
    pub build_id: i32,
}
