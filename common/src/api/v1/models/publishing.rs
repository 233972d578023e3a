use crate::api::v1::ParseEnumError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

text_enum!(
    /// Lifecycle of a publishing record.
    ///
    /// ```text
    /// PENDING -> PUBLISHED -> SUPERSEDED -> PENDINGREMOVAL -> REMOVED
    ///    |           |                           ^
    ///    +-----------+---------------------------+
    /// ```
    PublishingStatus, "a publishing status", {
        Pending => "PENDING",
        Published => "PUBLISHED",
        Superseded => "SUPERSEDED",
        PendingRemoval => "PENDINGREMOVAL",
        Removed => "REMOVED",
    }
);

impl PublishingStatus {
    pub fn can_transition_to(&self, to: PublishingStatus) -> bool {
        use PublishingStatus::*;
        matches!(
            (self, to),
            (Pending, Published)
                | (Pending, PendingRemoval)
                | (Published, Superseded)
                | (Published, PendingRemoval)
                | (Superseded, PendingRemoval)
                | (PendingRemoval, Removed)
        )
    }

    /// Component and section may only be changed while the record is live
    pub fn allows_override(&self) -> bool {
        matches!(self, PublishingStatus::Pending | PublishingStatus::Published)
    }
}

text_enum!(
    Pocket, "a pocket", {
        Release => "release",
        Security => "security",
        Updates => "updates",
        Proposed => "proposed",
    }
);

impl Pocket {
    /// Builds for this pocket must run on a trusted builder
    pub fn requires_trust(&self) -> bool {
        matches!(self, Pocket::Security)
    }

    /// Pockets whose published binaries are visible to builds in this pocket
    pub fn visible_pockets(&self) -> &'static [Pocket] {
        match self {
            Pocket::Release => &[Pocket::Release],
            Pocket::Security => &[Pocket::Release, Pocket::Security],
            Pocket::Updates => &[Pocket::Release, Pocket::Security, Pocket::Updates],
            Pocket::Proposed => &[
                Pocket::Release,
                Pocket::Security,
                Pocket::Updates,
                Pocket::Proposed,
            ],
        }
    }
}

impl Default for Pocket {
    fn default() -> Self {
        Pocket::Release
    }
}

text_enum!(
    PublicationKind, "a publication kind", {
        Source => "source",
        Binary => "binary",
    }
);

/// Identifies a publishing record across both families, written as `source:12` or `binary:7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicationRef {
    pub kind: PublicationKind,
    pub id: i32,
}

impl PublicationRef {
    pub fn source(id: i32) -> Self {
        PublicationRef {
            kind: PublicationKind::Source,
            id,
        }
    }

    pub fn binary(id: i32) -> Self {
        PublicationRef {
            kind: PublicationKind::Binary,
            id,
        }
    }
}

impl fmt::Display for PublicationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for PublicationRef {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseEnumError {
            what: "a publication reference",
            value: s.to_string(),
        };
        let (kind, id) = s.split_once(':').ok_or_else(err)?;
        let kind = kind.parse::<PublicationKind>().map_err(|_| err())?;
        let id = id.parse::<i32>().map_err(|_| err())?;
        Ok(PublicationRef { kind, id })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub id: i32,
    pub kind: PublicationKind,
    pub name: String,
    pub version: String,
    /// The source or binary release this record publishes
    pub release_id: i32,
    pub archive_id: i32,
    pub distro_series_id: i32,
    pub distro_arch_series_id: Option<i32>,
    pub architecture_tag: Option<String>,
    pub pocket: Pocket,
    pub component: String,
    pub section: String,
    pub priority: Option<String>,
    pub status: PublishingStatus,
    pub created_at: NaiveDateTime,
    pub published_at: Option<NaiveDateTime>,
    pub superseded_at: Option<NaiveDateTime>,
    pub superseded_by: Option<i32>,
    pub made_pending_at: Option<NaiveDateTime>,
    pub scheduled_deletion_at: Option<NaiveDateTime>,
    pub removed_at: Option<NaiveDateTime>,
    pub embargo: bool,
    pub embargo_lifted_at: Option<NaiveDateTime>,
}

impl Publication {
    pub fn reference(&self) -> PublicationRef {
        PublicationRef {
            kind: self.kind,
            id: self.id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPublishedQuery {
    pub archive_id: i32,
    pub distro_series_id: i32,
    pub pocket: Pocket,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRemovalRequest {
    pub deletion_date: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideRequest {
    pub component: String,
    pub section: String,
    pub priority: Option<String>,
}
