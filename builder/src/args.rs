use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    /// Verbose logging
    #[arg(short, long, global = true, action(ArgAction::Count))]
    pub verbose: u8,
    #[command(subcommand)]
    pub subcommand: SubCommand,
    #[arg(short, long, global = true, env = "POCKETD_BUILDER_CONFIG")]
    pub config: Option<PathBuf>,
    /// The script that performs the actual build
    #[arg(long, global = true, env = "POCKETD_BUILDER_BACKEND")]
    pub backend: Option<PathBuf>,
    #[arg(long, global = true, env = "POCKETD_BUILDER_BIND_ADDR")]
    pub bind_addr: Option<String>,
    #[arg(long, global = true)]
    pub processor_family: Option<String>,
    /// Upload build outputs to this file store
    #[arg(long, global = true, env = "POCKETD_LIBRARIAN")]
    pub librarian: Option<String>,
}

#[derive(Debug, Parser)]
pub enum SubCommand {
    /// Serve the builder protocol and wait for dispatches
    Serve,
    /// Run a single build from a dispatch request file, without a daemon
    Build(Build),
    /// Register this agent with a pocketd daemon
    Register(Register),
    /// Load and print a config
    CheckConfig,
}

#[derive(Debug, Parser)]
pub struct Build {
    /// JSON encoded dispatch request
    pub request: PathBuf,
}

#[derive(Debug, Parser)]
pub struct Register {
    /// Name the daemon knows this builder by
    pub name: String,
    /// Url the daemon reaches this agent on
    pub url: String,
    /// Address of the pocketd daemon
    #[arg(long)]
    pub endpoint: Option<String>,
    /// Allow the daemon to dispatch builds of restricted pockets
    #[arg(long)]
    pub trusted: bool,
}
