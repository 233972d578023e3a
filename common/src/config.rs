use crate::errors::*;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8484";
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8484";
pub const DEFAULT_DATABASE: &str = "pocketd.db";
pub const DEFAULT_POST_BODY_SIZE_LIMIT: usize = 2 * 1024 * 1024;

pub const DEFAULT_SCHEDULER_INTERVAL: u64 = 15;
pub const DEFAULT_BUILDER_TIMEOUT: u64 = 30;
pub const DEFAULT_MAX_RETRIES: i32 = 3;
pub const DEFAULT_RETRY_COOLDOWN: i64 = 300;
pub const DEFAULT_AGE_BONUS_INTERVAL: i64 = 5;
pub const DEFAULT_MAX_AGE_BONUS: i32 = 100;
pub const DEFAULT_SECURITY_BONUS: i32 = 50;
pub const DEFAULT_LOG_TAIL_SIZE: usize = 2048;

pub const DEFAULT_PUBLISHER_INTERVAL: u64 = 60;
pub const DEFAULT_CONFLICT_RETRIES: u32 = 3;

pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<ConfigFile> {
    let mut config = ConfigFile::default();

    if let Some(c) = load_from("/etc/pocketd.conf")? {
        config.update(c);
    }

    if let Ok(path) = config_path() {
        if let Some(c) = load_from(path)? {
            config.update(c);
        }
    }

    if let Some(path) = path {
        let c = load_from(path)?.ok_or_else(|| format_err!("Failed to read config file"))?;
        config.update(c);
    }

    Ok(config)
}

fn config_path() -> Result<PathBuf> {
    let config_dir = dirs_next::config_dir().ok_or_else(|| format_err!("Failed to find config dir"))?;
    Ok(config_dir.join("pocketd.conf"))
}

fn load_from<P: AsRef<Path>>(path: P) -> Result<Option<ConfigFile>> {
    if let Ok(buf) = fs::read_to_string(path.as_ref()) {
        debug!("loading config file {:?}", path.as_ref());
        let config = toml::from_str(&buf).context("Failed to load config")?;
        Ok(Some(config))
    } else {
        Ok(None)
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
}

impl ConfigFile {
    pub fn update(&mut self, c: ConfigFile) {
        self.http.update(c.http);
        self.database.update(c.database);
        self.scheduler.update(c.scheduler);
        self.publisher.update(c.publisher);
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind_addr: Option<String>,
    pub post_body_size_limit: Option<usize>,
    pub endpoint: Option<String>,
}

impl HttpConfig {
    pub fn update(&mut self, c: HttpConfig) {
        if c.bind_addr.is_some() {
            self.bind_addr = c.bind_addr;
        }
        if c.post_body_size_limit.is_some() {
            self.post_body_size_limit = c.post_body_size_limit;
        }
        if c.endpoint.is_some() {
            self.endpoint = c.endpoint;
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: Option<String>,
}

impl DatabaseConfig {
    pub fn update(&mut self, c: DatabaseConfig) {
        if c.path.is_some() {
            self.path = c.path;
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between two scheduler passes
    pub interval: Option<u64>,
    /// Seconds a builder gets to answer a single protocol call
    pub builder_timeout: Option<u64>,
    /// Number of times a build is handed back to the queue after its builder went away
    pub max_retries: Option<i32>,
    /// Seconds a requeued build waits before it can be dispatched again
    pub retry_cooldown: Option<i64>,
    /// Minutes of queue age that earn one point of score
    pub age_bonus_interval: Option<i64>,
    pub max_age_bonus: Option<i32>,
    pub security_bonus: Option<i32>,
    pub log_tail_size: Option<usize>,
}

impl SchedulerConfig {
    pub fn update(&mut self, c: SchedulerConfig) {
        if c.interval.is_some() {
            self.interval = c.interval;
        }
        if c.builder_timeout.is_some() {
            self.builder_timeout = c.builder_timeout;
        }
        if c.max_retries.is_some() {
            self.max_retries = c.max_retries;
        }
        if c.retry_cooldown.is_some() {
            self.retry_cooldown = c.retry_cooldown;
        }
        if c.age_bonus_interval.is_some() {
            self.age_bonus_interval = c.age_bonus_interval;
        }
        if c.max_age_bonus.is_some() {
            self.max_age_bonus = c.max_age_bonus;
        }
        if c.security_bonus.is_some() {
            self.security_bonus = c.security_bonus;
        }
        if c.log_tail_size.is_some() {
            self.log_tail_size = c.log_tail_size;
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.unwrap_or(DEFAULT_SCHEDULER_INTERVAL))
    }

    pub fn builder_timeout(&self) -> Duration {
        Duration::from_secs(self.builder_timeout.unwrap_or(DEFAULT_BUILDER_TIMEOUT))
    }

    pub fn max_retries(&self) -> i32 {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    pub fn retry_cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.retry_cooldown.unwrap_or(DEFAULT_RETRY_COOLDOWN))
    }

    pub fn age_bonus_interval(&self) -> i64 {
        self.age_bonus_interval
            .unwrap_or(DEFAULT_AGE_BONUS_INTERVAL)
            .max(1)
    }

    pub fn max_age_bonus(&self) -> i32 {
        self.max_age_bonus.unwrap_or(DEFAULT_MAX_AGE_BONUS)
    }

    pub fn security_bonus(&self) -> i32 {
        self.security_bonus.unwrap_or(DEFAULT_SECURITY_BONUS)
    }

    pub fn log_tail_size(&self) -> usize {
        self.log_tail_size.unwrap_or(DEFAULT_LOG_TAIL_SIZE)
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct PublisherConfig {
    pub interval: Option<u64>,
    /// Publish pending, non-embargoed records on every publisher pass
    #[serde(default)]
    pub auto_publish: bool,
    pub conflict_retries: Option<u32>,
    /// Base url of the file store, deletions are only logged if unset
    pub librarian: Option<String>,
}

impl PublisherConfig {
    pub fn update(&mut self, c: PublisherConfig) {
        if c.interval.is_some() {
            self.interval = c.interval;
        }
        if c.auto_publish {
            self.auto_publish = true;
        }
        if c.conflict_retries.is_some() {
            self.conflict_retries = c.conflict_retries;
        }
        if c.librarian.is_some() {
            self.librarian = c.librarian;
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.unwrap_or(DEFAULT_PUBLISHER_INTERVAL))
    }

    pub fn conflict_retries(&self) -> u32 {
        self.conflict_retries.unwrap_or(DEFAULT_CONFLICT_RETRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_layer_overrides() {
        let mut config = toml::from_str::<ConfigFile>(
            r#"
            [http]
            bind_addr = "0.0.0.0:8484"

            [scheduler]
            max_retries = 5
            builder_timeout = 10
            "#,
        )
        .unwrap();

        let local = toml::from_str::<ConfigFile>(
            r#"
            [scheduler]
            max_retries = 1

            [publisher]
            auto_publish = true
            "#,
        )
        .unwrap();
        config.update(local);

        assert_eq!(config.http.bind_addr.as_deref(), Some("0.0.0.0:8484"));
        assert_eq!(config.scheduler.max_retries(), 1);
        assert_eq!(config.scheduler.builder_timeout(), Duration::from_secs(10));
        assert!(config.publisher.auto_publish);
    }

    #[test]
    fn test_defaults() {
        let config = ConfigFile::default();
        assert_eq!(config.scheduler.max_retries(), DEFAULT_MAX_RETRIES);
        assert_eq!(config.scheduler.age_bonus_interval(), DEFAULT_AGE_BONUS_INTERVAL);
        assert_eq!(config.publisher.conflict_retries(), DEFAULT_CONFLICT_RETRIES);
        assert!(!config.publisher.auto_publish);
    }
}
