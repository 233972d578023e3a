use crate::api::v1::{FileRef, Pocket};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

text_enum!(
    /// State of a single build attempt.
    BuildState, "a build state", {
        NeedsBuild => "NEEDSBUILD",
        Building => "BUILDING",
        FullyBuilt => "FULLYBUILT",
        FailedToBuild => "FAILEDTOBUILD",
        ChrootWait => "CHROOTWAIT",
        ManualDepWait => "MANUALDEPWAIT",
        FailedToUpload => "FAILEDTOUPLOAD",
        Superseded => "SUPERSEDED",
        DependencyWait => "DEPENDENCYWAIT",
        Cancelled => "CANCELLED",
    }
);

impl BuildState {
    pub fn can_transition_to(&self, to: BuildState) -> bool {
        use BuildState::*;
        match self {
            NeedsBuild => matches!(
                to,
                Building | Superseded | Cancelled | FailedToBuild | ChrootWait
            ),
            Building => matches!(
                to,
                FullyBuilt
                    | FailedToBuild
                    | ChrootWait
                    | ManualDepWait
                    | FailedToUpload
                    | DependencyWait
                    | NeedsBuild
                    | Cancelled
            ),
            DependencyWait => to == NeedsBuild,
            FailedToBuild | ChrootWait | ManualDepWait | FailedToUpload | Cancelled => {
                to == NeedsBuild
            }
            FullyBuilt | Superseded => false,
        }
    }

    /// Builds in these states own a queue ticket
    pub fn is_queued(&self) -> bool {
        matches!(self, BuildState::NeedsBuild | BuildState::Building)
    }

    /// States an operator may send back to NEEDSBUILD
    pub fn is_retryable(&self) -> bool {
        use BuildState::*;
        matches!(
            self,
            FailedToBuild | ChrootWait | ManualDepWait | FailedToUpload | Cancelled
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub id: i32,
    pub source_release_id: i32,
    pub archive_id: i32,
    pub distro_arch_series_id: i32,
    pub architecture_tag: String,
    pub pocket: Pocket,
    pub name: String,
    pub version: String,
    pub state: BuildState,
    pub created_at: NaiveDateTime,
    pub started_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
    pub builder_id: Option<i32>,
    pub dependencies: Option<String>,
    pub log: Option<FileRef>,
    pub log_tail: Option<String>,
    pub retries: i32,
    pub manual_attention: bool,
    pub failure_note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildFilter {
    pub state: Option<BuildState>,
    pub archive_id: Option<i32>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DispatchManualRequest {
    pub builder_id: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RescoreRequest {
    pub score: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetManualRequest {
    pub manual: bool,
}
