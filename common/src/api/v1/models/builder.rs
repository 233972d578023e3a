use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Builder {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub processor_family: String,
    pub trusted: bool,
    pub builder_ok: bool,
    pub fail_notes: Option<String>,
    pub manual: bool,
    pub last_seen: Option<NaiveDateTime>,
    pub current_build: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterBuilderRequest {
    pub name: String,
    pub url: String,
    pub processor_family: String,
    #[serde(default)]
    pub trusted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetFlagRequest {
    pub value: bool,
}
