use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    /// Verbose logging
    #[arg(short, long, action(ArgAction::Count))]
    pub verbose: u8,
    /// Load and print a config
    #[arg(long, group = "action")]
    pub check_config: bool,
    /// Create or upgrade the database, then exit
    #[arg(long, group = "action")]
    pub migrate: bool,
    /// Configuration file path
    #[arg(short, long, env = "POCKETD_CONFIG")]
    pub config: Option<PathBuf>,
}
