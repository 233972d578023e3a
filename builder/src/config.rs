use crate::args::Args;
use pocketd_common::errors::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8485";
pub const DEFAULT_BUILD_TIMEOUT: u64 = 3600 * 24;
pub const DEFAULT_LOG_TAIL_SIZE: usize = 2048;
const IMPLICIT_CONFIG: &str = "/etc/pocketd-builder.conf";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub bind_addr: Option<String>,
    pub processor_family: Option<String>,
    pub backend: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub librarian: Option<String>,
    #[serde(default)]
    pub build: Build,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Build {
    pub timeout: Option<u64>,
    pub max_bytes: Option<usize>,
    pub log_tail_size: Option<usize>,
    #[serde(default)]
    pub silent: bool,
}

impl Build {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(DEFAULT_BUILD_TIMEOUT))
    }

    pub fn log_tail_size(&self) -> usize {
        self.log_tail_size.unwrap_or(DEFAULT_LOG_TAIL_SIZE)
    }
}

/// Settled configuration of a running agent
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub processor_family: Option<String>,
    pub backend: PathBuf,
    /// Scratch directories of builds are created in here, system tmp if unset
    pub output_dir: Option<PathBuf>,
    pub librarian: Option<String>,
    pub build: Build,
}

fn read(path: &Path) -> Result<ConfigFile> {
    info!("Loading configuration from {:?}", path);
    let buf = fs::read_to_string(path).with_context(|| anyhow!("Failed to open {:?}", path))?;
    let conf = toml::from_str::<ConfigFile>(&buf)
        .with_context(|| anyhow!("Failed to parse config file {:?}", path))?;
    Ok(conf)
}

pub fn load(args: &Args) -> Result<Config> {
    let file = if let Some(path) = &args.config {
        read(path)?
    } else if Path::new(IMPLICIT_CONFIG).exists() {
        read(Path::new(IMPLICIT_CONFIG))?
    } else {
        info!("Using default configuration");
        ConfigFile::default()
    };
    resolve(file, args)
}

fn resolve(file: ConfigFile, args: &Args) -> Result<Config> {
    let backend = args
        .backend
        .clone()
        .or(file.backend)
        .ok_or_else(|| format_err!("No backend script configured, use --backend or `backend =`"))?;

    Ok(Config {
        bind_addr: args
            .bind_addr
            .clone()
            .or(file.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        processor_family: args.processor_family.clone().or(file.processor_family),
        backend,
        output_dir: file.output_dir,
        librarian: args.librarian.clone().or(file.librarian),
        build: file.build,
    })
}
