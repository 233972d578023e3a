use crate::api::v1::{FileRef, Pocket};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

text_enum!(
    /// Declared upload urgency, the base of the dispatch score.
    Urgency, "an urgency", {
        Low => "low",
        Medium => "medium",
        High => "high",
        Emergency => "emergency",
        Critical => "critical",
    }
);

impl Urgency {
    pub fn base_score(&self) -> i32 {
        match self {
            Urgency::Low => 5,
            Urgency::Medium => 10,
            Urgency::High => 15,
            Urgency::Emergency | Urgency::Critical => 20,
        }
    }
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Low
    }
}

fn default_component() -> String {
    "main".to_string()
}

fn default_section() -> String {
    "misc".to_string()
}

fn default_architecture_hint() -> String {
    "any".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSourceReleaseRequest {
    pub archive_id: i32,
    pub distro_series_id: i32,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub build_depends: String,
    #[serde(default = "default_component")]
    pub component: String,
    #[serde(default = "default_section")]
    pub section: String,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default = "default_architecture_hint")]
    pub architecture_hint: String,
    #[serde(default)]
    pub pocket: Pocket,
    #[serde(default)]
    pub embargo: bool,
    #[serde(default)]
    pub files: Vec<FileRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReleaseCreated {
    pub source_release_id: i32,
    /// False if an identical upload already existed
    pub created: bool,
    pub build_ids: Vec<i32>,
    pub publication_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRelease {
    pub id: i32,
    pub archive_id: i32,
    pub distro_series_id: i32,
    pub name: String,
    pub version: String,
    pub build_depends: String,
    pub component: String,
    pub section: String,
    pub urgency: Urgency,
    pub architecture_hint: String,
    pub pocket: Pocket,
    pub created_at: NaiveDateTime,
    pub files: Vec<FileRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryRelease {
    pub id: i32,
    pub build_id: i32,
    pub name: String,
    pub version: String,
    pub architecture_specific: bool,
    pub depends: String,
    pub conflicts: String,
    pub provides: String,
    pub component: String,
    pub section: String,
    pub priority: String,
    pub created_at: NaiveDateTime,
    pub files: Vec<FileRef>,
}
