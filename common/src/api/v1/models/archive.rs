use crate::api::v1::FileRef;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

text_enum!(
    /// Every distribution has exactly one main archive, everything else is personal.
    ArchivePurpose, "an archive purpose", {
        Main => "main",
        Personal => "personal",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Distribution {
    pub id: i32,
    pub name: String,
    pub main_archive_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateDistributionRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archive {
    pub id: i32,
    pub distribution_id: i32,
    pub owner: Option<String>,
    pub name: String,
    pub purpose: ArchivePurpose,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateArchiveRequest {
    pub distribution_id: i32,
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistroSeries {
    pub id: i32,
    pub distribution_id: i32,
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateDistroSeriesRequest {
    pub distribution_id: i32,
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistroArchSeries {
    pub id: i32,
    pub distro_series_id: i32,
    pub architecture_tag: String,
    pub processor_family: String,
    pub chroot: Option<FileRef>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateDistroArchSeriesRequest {
    pub distro_series_id: i32,
    pub architecture_tag: String,
    pub processor_family: String,
    pub chroot: Option<FileRef>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetChrootRequest {
    pub chroot: FileRef,
}
