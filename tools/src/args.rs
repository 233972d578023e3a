use chrono::NaiveDateTime;
use clap::{ArgAction, CommandFactory, Parser};
use clap_complete::Shell;
use pocketd_common::api::v1::{BuildState, Pocket, PublicationRef};
use pocketd_common::errors::*;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    /// Verbose logging
    #[arg(short, long, global = true, action(ArgAction::Count))]
    pub verbose: u8,
    /// pocketd endpoint to talk to
    #[arg(short = 'H', long, global = true)]
    pub endpoint: Option<String>,
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Bypass tty detection and always use colors
    #[arg(short = 'C', long, global = true)]
    pub color: bool,
    #[command(subcommand)]
    pub subcommand: SubCommand,
}

#[derive(Debug, Parser)]
pub enum SubCommand {
    /// Show builder status
    Status,
    /// Queue related subcommands
    #[command(subcommand)]
    Queue(Queue),
    /// Build related subcommands
    #[command(subcommand)]
    Builds(Builds),
    /// Builder related subcommands
    #[command(subcommand)]
    Builders(Builders),
    /// Source upload related subcommands
    #[command(subcommand)]
    Sources(Sources),
    /// Query the published set of a series
    #[command(subcommand)]
    Published(Published),
    /// Publish a pending record, superseding what it replaces
    Publish(RecordArg),
    /// Schedule a record for removal, withdrawing it if it is published
    Remove(Removal),
    /// Take a published record out of the archive
    Withdraw(Removal),
    /// Make an embargoed record visible
    LiftEmbargo(RecordArg),
    /// Change component, section or priority of a record
    Override(Override),
    /// Archive related subcommands
    #[command(subcommand)]
    Archives(Archives),
    /// Distribution related subcommands
    #[command(subcommand)]
    Distributions(Distributions),
    /// Series related subcommands
    #[command(subcommand)]
    Series(Series),
    /// Architecture series related subcommands
    #[command(subcommand)]
    ArchSeries(ArchSeries),
    /// Send a failed build back to the queue (same as `builds requeue`)
    RequeueBuild(BuildArg),
    /// Bring a builder back into rotation (same as `builders reset`)
    RetryBuilder(BuilderArg),
    /// Generate shell completions
    Completions(Completions),
}

#[derive(Debug, Parser)]
pub enum Queue {
    /// List the current build queue
    Ls(JsonFlag),
    /// Run a scheduler pass right away
    Run,
}

#[derive(Debug, Parser)]
pub struct JsonFlag {
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub enum Builds {
    /// List builds
    Ls(BuildsList),
    /// Show a single build
    Show(BuildShow),
    /// Print the retained tail of the build log
    Log(BuildArg),
    /// List the binaries a build produced
    Binaries(BuildShow),
    /// Cancel a waiting or running build
    Cancel(BuildArg),
    /// Send a failed build back to the queue
    Requeue(BuildArg),
    /// Hand a waiting build to a specific builder
    Dispatch(BuildDispatch),
    /// Override the dispatch score of a waiting build
    Rescore(BuildRescore),
    /// Pin or unpin the score of a waiting build
    Manual(BuildManual),
}

#[derive(Debug, Parser)]
pub struct BuildsList {
    /// Filter builds in this state
    #[arg(long)]
    pub state: Option<BuildState>,
    /// Filter builds of this archive
    #[arg(long)]
    pub archive: Option<i32>,
    /// Filter builds of this source package
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct BuildArg {
    pub id: i32,
}

#[derive(Debug, Parser)]
pub struct BuildShow {
    pub id: i32,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct BuildDispatch {
    pub id: i32,
    /// Id of the builder to dispatch to
    #[arg(long)]
    pub builder: i32,
}

#[derive(Debug, Parser)]
pub struct BuildRescore {
    pub id: i32,
    pub score: i32,
}

#[derive(Debug, Parser)]
pub struct BuildManual {
    pub id: i32,
    /// Give the score back to the scheduler
    #[arg(long)]
    pub off: bool,
}

#[derive(Debug, Parser)]
pub enum Builders {
    /// List registered builders
    Ls(JsonFlag),
    /// Register a builder, or update the one with the same name
    Register(BuilderRegister),
    /// Clear the failure state of a builder
    Reset(BuilderArg),
    /// Exclude a builder from automatic dispatch
    Manual(BuilderFlag),
    /// Allow a builder to build restricted pockets
    Trusted(BuilderFlag),
}

#[derive(Debug, Parser)]
pub struct BuilderArg {
    pub id: i32,
}

#[derive(Debug, Parser)]
pub struct BuilderFlag {
    pub id: i32,
    /// Clear the flag instead of setting it
    #[arg(long)]
    pub off: bool,
}

#[derive(Debug, Parser)]
pub struct BuilderRegister {
    pub name: String,
    pub url: String,
    #[arg(long)]
    pub processor_family: String,
    #[arg(long)]
    pub trusted: bool,
}

#[derive(Debug, Parser)]
pub enum Sources {
    /// Create a source release from a json request (read from stdin if no file is given)
    Upload(SourceUpload),
    /// Show a source release
    Show(SourceShow),
}

#[derive(Debug, Parser)]
pub struct SourceUpload {
    pub file: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct SourceShow {
    pub id: i32,
}

#[derive(Debug, Parser)]
pub enum Published {
    /// List what is currently published
    Ls(PublishedList),
}

#[derive(Debug, Parser)]
pub struct PublishedList {
    #[arg(long)]
    pub archive: i32,
    #[arg(long)]
    pub series: i32,
    #[arg(long, default_value = "release")]
    pub pocket: Pocket,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct RecordArg {
    /// Publishing record, written as `source:<id>` or `binary:<id>`
    pub record: PublicationRef,
}

#[derive(Debug, Parser)]
pub struct Removal {
    /// Publishing record, written as `source:<id>` or `binary:<id>`
    pub record: PublicationRef,
    /// When the record may be removed, `YYYY-MM-DD HH:MM:SS` in UTC
    #[arg(long, value_parser = parse_date)]
    pub at: NaiveDateTime,
}

#[derive(Debug, Parser)]
pub struct Override {
    /// Publishing record, written as `source:<id>` or `binary:<id>`
    pub record: PublicationRef,
    #[arg(long)]
    pub component: String,
    #[arg(long)]
    pub section: String,
    /// Only valid for binaries
    #[arg(long)]
    pub priority: Option<String>,
}

#[derive(Debug, Parser)]
pub enum Archives {
    /// List archives
    Ls(JsonFlag),
    /// Create a personal archive
    Create(ArchiveCreate),
}

#[derive(Debug, Parser)]
pub struct ArchiveCreate {
    #[arg(long)]
    pub distribution: i32,
    #[arg(long)]
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Parser)]
pub enum Distributions {
    /// List distributions
    Ls(JsonFlag),
    /// Create a distribution together with its main archive
    Create(DistributionCreate),
}

#[derive(Debug, Parser)]
pub struct DistributionCreate {
    pub name: String,
}

#[derive(Debug, Parser)]
pub enum Series {
    /// List series
    Ls(JsonFlag),
    /// Create a series
    Create(SeriesCreate),
}

#[derive(Debug, Parser)]
pub struct SeriesCreate {
    #[arg(long)]
    pub distribution: i32,
    pub name: String,
    pub version: String,
}

#[derive(Debug, Parser)]
pub enum ArchSeries {
    /// List architecture series
    Ls(JsonFlag),
    /// Add an architecture to a series
    Create(ArchSeriesCreate),
    /// Set the chroot builds of this architecture run in
    Chroot(ArchSeriesChroot),
}

#[derive(Debug, Parser)]
pub struct ArchSeriesCreate {
    #[arg(long)]
    pub series: i32,
    pub architecture_tag: String,
    #[arg(long)]
    pub processor_family: String,
}

#[derive(Debug, Parser)]
pub struct ArchSeriesChroot {
    pub id: i32,
    pub filename: String,
    #[arg(long)]
    pub sha256: String,
    #[arg(long)]
    pub size: i64,
}

#[derive(Debug, Parser)]
pub struct Completions {
    pub shell: Shell,
}

fn parse_date(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|date| date.and_hms_opt(0, 0, 0).unwrap_or_default())
        })
        .with_context(|| anyhow!("Invalid date: {:?}", s))
}

pub fn gen_completions(args: &Completions) -> Result<()> {
    clap_complete::generate(
        args.shell,
        &mut Args::command(),
        "pocketctl",
        &mut io::stdout(),
    );
    Ok(())
}
