use crate::args::*;
use crate::fancy::Fancy;
use chrono::Utc;
use clap::Parser;
use colored::*;
use env_logger::Env;
use pocketd_common::api::v1::*;
use pocketd_common::api::Client;
use pocketd_common::errors::*;
use pocketd_common::utils;
use serde::Serialize;
use std::borrow::Cow;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;

pub mod args;
pub mod fancy;
pub mod pager;

fn print_json<S: Serialize>(x: &S) -> Result<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer_pretty(&mut stdout, &x)?;
    stdout.write_all(b"\n")?;
    Ok(())
}

/// Scripts can tell rejected operations apart by exit code
fn exit_code(err: &Error) -> u8 {
    match ArchiveError::of(err) {
        Some(ArchiveError::InvalidInput(_)) => 2,
        Some(ArchiveError::InvalidTransition(_)) => 3,
        Some(ArchiveError::Conflict(_)) => 4,
        Some(ArchiveError::DuplicateVersion(_)) => 5,
        Some(ArchiveError::NotFound(_)) => 6,
        _ => 1,
    }
}

fn print_builds(builds: &[Build]) -> Result<()> {
    let mut stdout = io::stdout();
    for build in builds {
        let state = format!("[{}]", build.state.fancy()).bold();
        let pkg = format!("{} {}", build.name.bold(), build.version.bold());
        let mut info = format!("{}, {}", build.architecture_tag, build.pocket);
        if let Some(builder_id) = build.builder_id {
            info.push_str(&format!(", builder #{}", builder_id));
        }
        if build.retries > 0 {
            info.push_str(&format!(", {} retries", build.retries));
        }

        if writeln!(stdout, "{:>7} {} {:-50} ({})", format!("#{}", build.id), state, pkg, info).is_err() {
            break;
        }
    }
    Ok(())
}

fn print_build(build: &Build) -> Result<()> {
    let mut stdout = io::stdout();
    writeln!(stdout, "{} {} ({})", build.name.bold(), build.version.bold(), build.state.fancy())?;
    writeln!(stdout, "  build:      #{}", build.id)?;
    writeln!(stdout, "  source:     #{}", build.source_release_id)?;
    writeln!(stdout, "  archive:    #{} ({})", build.archive_id, build.pocket)?;
    writeln!(stdout, "  arch:       {}", build.architecture_tag)?;
    if let Some(builder_id) = build.builder_id {
        writeln!(stdout, "  builder:    #{}", builder_id)?;
    }
    if let (Some(started_at), Some(finished_at)) = (build.started_at, build.finished_at) {
        let duration = (finished_at - started_at).num_seconds();
        writeln!(stdout, "  duration:  {}", utils::secs_to_human(duration))?;
    }
    if let Some(dependencies) = &build.dependencies {
        writeln!(stdout, "  waiting on: {}", dependencies.yellow())?;
    }
    if let Some(note) = &build.failure_note {
        writeln!(stdout, "  failure:    {}", note.red())?;
    }
    if build.manual_attention {
        writeln!(stdout, "  {}", "needs manual attention".red().bold())?;
    }
    Ok(())
}

fn print_queue(queue: &[QueuedBuild]) -> Result<()> {
    let now = Utc::now().naive_utc();
    let mut stdout = io::stdout();
    for q in queue {
        let pkg = format!("{} {}", q.name.bold(), q.version);
        let running = format!(
            "{:>11}",
            if let Some(started_at) = q.started_at {
                let duration = (now - started_at).num_seconds();
                Cow::Owned(utils::secs_to_human(duration))
            } else {
                Cow::Borrowed("")
            }
        );
        let score = if q.manual {
            format!("{:>5}*", q.score).yellow()
        } else if q.pinned {
            format!("{:>5}!", q.score).cyan()
        } else {
            format!("{:>5} ", q.score).normal()
        };
        let waiting = if q.is_due(now) {
            String::new()
        } else {
            q.not_before
                .map(|t| format!("not before {}", t.format("%Y-%m-%d %H:%M:%S")))
                .unwrap_or_default()
        };

        if writeln!(
            stdout,
            "{} {} {:-50} {} {:?} {:?} {}",
            q.created_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .bright_black(),
            score,
            pkg,
            running.green(),
            q.architecture_tag,
            q.pocket.as_str(),
            waiting.bright_black(),
        )
        .is_err()
        {
            break;
        }
    }
    Ok(())
}

fn print_builders(builders: &[pocketd_common::api::v1::Builder]) -> Result<()> {
    let mut stdout = io::stdout();
    for builder in builders {
        let label = format!(
            "#{} {} ({})",
            builder.id,
            builder.name.green(),
            builder.url.yellow()
        );
        let trust = if builder.trusted { "trusted" } else { "" };
        if writeln!(
            stdout,
            "{:-60} {:10} {:8} => {}",
            label,
            builder.processor_family,
            trust,
            builder.fancy()
        )
        .is_err()
        {
            break;
        }
        if let Some(notes) = &builder.fail_notes {
            writeln!(stdout, "    {}", notes.red())?;
        }
    }
    Ok(())
}

fn print_publication(p: &Publication) -> Result<()> {
    let mut stdout = io::stdout();
    let record = format!("{}:{}", p.kind, p.id);
    let arch = p.architecture_tag.as_deref().unwrap_or("source");
    let priority = p.priority.as_deref().unwrap_or("-");
    let embargo = if p.embargo { "embargoed".red().to_string() } else { String::new() };
    writeln!(
        stdout,
        "{} {:12} {:-50} {:8} {}/{} {} {}",
        format!("[{}]", p.status.fancy()).bold(),
        record,
        format!("{} {}", p.name.bold(), p.version),
        arch,
        p.component,
        p.section,
        priority,
        embargo,
    )?;
    Ok(())
}

async fn read_upload(upload: SourceUpload) -> Result<CreateSourceReleaseRequest> {
    let buf = if let Some(path) = &upload.file {
        fs::read(path).with_context(|| anyhow!("Failed to read {:?}", path))?
    } else {
        let mut stdin = tokio::io::stdin();
        let mut buf = Vec::new();
        stdin.read_to_end(&mut buf).await?;
        buf
    };
    let request = serde_json::from_slice(&buf).context("Failed to deserialize source upload")?;
    Ok(request)
}

async fn run(args: Args) -> Result<()> {
    if args.color {
        debug!("Bypass tty detection and always use colors");
        colored::control::set_override(true);
    }

    let config =
        pocketd_common::config::load(args.config).context("Failed to load config file")?;
    let client = Client::new(config, args.endpoint)?;

    match args.subcommand {
        SubCommand::Status => print_builders(&client.get_builders().await?)?,
        SubCommand::Queue(Queue::Ls(ls)) => {
            let queue = client.get_queue().await?;
            if ls.json {
                print_json(&queue)?;
            } else {
                print_queue(&queue)?;
            }
        }
        SubCommand::Queue(Queue::Run) => client.run_scheduler().await?,
        SubCommand::Builds(Builds::Ls(ls)) => {
            let builds = client
                .get_builds(&BuildFilter {
                    state: ls.state,
                    archive_id: ls.archive,
                    name: ls.name,
                })
                .await?;
            if ls.json {
                print_json(&builds)?;
            } else {
                print_builds(&builds)?;
            }
        }
        SubCommand::Builds(Builds::Show(show)) => {
            let build = client.get_build(show.id).await?;
            if show.json {
                print_json(&build)?;
            } else {
                print_build(&build)?;
            }
        }
        SubCommand::Builds(Builds::Log(args)) => {
            let log = client
                .get_build_log(args.id)
                .await
                .context("Failed to fetch build log")?;
            pager::show_log(args.id, &log)?;
        }
        SubCommand::Builds(Builds::Binaries(show)) => {
            let binaries = client.get_build_binaries(show.id).await?;
            if show.json {
                print_json(&binaries)?;
            } else {
                let mut stdout = io::stdout();
                for binary in binaries {
                    writeln!(
                        stdout,
                        "#{} {} {} ({}/{}, {} files)",
                        binary.id,
                        binary.name.bold(),
                        binary.version,
                        binary.component,
                        binary.section,
                        binary.files.len()
                    )?;
                }
            }
        }
        SubCommand::Builds(Builds::Cancel(args)) => {
            print_build(&client.cancel_build(args.id).await?)?;
        }
        SubCommand::Builds(Builds::Requeue(args)) | SubCommand::RequeueBuild(args) => {
            print_build(&client.requeue_build(args.id).await?)?;
        }
        SubCommand::Builds(Builds::Dispatch(args)) => {
            let build = client
                .dispatch_build(
                    args.id,
                    &DispatchManualRequest {
                        builder_id: args.builder,
                    },
                )
                .await?;
            print_build(&build)?;
        }
        SubCommand::Builds(Builds::Rescore(args)) => {
            let queued = client
                .rescore_build(args.id, &RescoreRequest { score: args.score })
                .await?;
            print_queue(&[queued])?;
        }
        SubCommand::Builds(Builds::Manual(args)) => {
            let queued = client
                .set_build_manual(args.id, &SetManualRequest { manual: !args.off })
                .await?;
            print_queue(&[queued])?;
        }
        SubCommand::Builders(Builders::Ls(ls)) => {
            let builders = client.get_builders().await?;
            if ls.json {
                print_json(&builders)?;
            } else {
                print_builders(&builders)?;
            }
        }
        SubCommand::Builders(Builders::Register(args)) => {
            let builder = client
                .register_builder(&RegisterBuilderRequest {
                    name: args.name,
                    url: args.url,
                    processor_family: args.processor_family,
                    trusted: args.trusted,
                })
                .await?;
            print_builders(&[builder])?;
        }
        SubCommand::Builders(Builders::Reset(args)) | SubCommand::RetryBuilder(args) => {
            print_builders(&[client.reset_builder(args.id).await?])?;
        }
        SubCommand::Builders(Builders::Manual(args)) => {
            let builder = client
                .set_builder_manual(args.id, &SetFlagRequest { value: !args.off })
                .await?;
            print_builders(&[builder])?;
        }
        SubCommand::Builders(Builders::Trusted(args)) => {
            let builder = client
                .set_builder_trusted(args.id, &SetFlagRequest { value: !args.off })
                .await?;
            print_builders(&[builder])?;
        }
        SubCommand::Sources(Sources::Upload(upload)) => {
            let request = read_upload(upload).await?;
            let created = client.create_source_release(&request).await?;
            if !created.created {
                info!("Identical upload already exists");
            }
            print_json(&created)?;
        }
        SubCommand::Sources(Sources::Show(show)) => {
            print_json(&client.get_source_release(show.id).await?)?;
        }
        SubCommand::Published(Published::Ls(ls)) => {
            let records = client
                .get_published(&ListPublishedQuery {
                    archive_id: ls.archive,
                    distro_series_id: ls.series,
                    pocket: ls.pocket,
                })
                .await?;
            if ls.json {
                print_json(&records)?;
            } else {
                for record in &records {
                    print_publication(record)?;
                }
            }
        }
        SubCommand::Publish(args) => print_publication(&client.publish(args.record).await?)?,
        SubCommand::Remove(args) => {
            let request = ScheduleRemovalRequest {
                deletion_date: args.at,
            };
            let current = client.get_publication(args.record).await?;
            let record = if current.status == PublishingStatus::Published {
                client.withdraw(args.record, &request).await?
            } else {
                client.schedule_removal(args.record, &request).await?
            };
            print_publication(&record)?;
        }
        SubCommand::Withdraw(args) => {
            let record = client
                .withdraw(
                    args.record,
                    &ScheduleRemovalRequest {
                        deletion_date: args.at,
                    },
                )
                .await?;
            print_publication(&record)?;
        }
        SubCommand::LiftEmbargo(args) => {
            print_publication(&client.lift_embargo(args.record).await?)?;
        }
        SubCommand::Override(args) => {
            let record = client
                .override_publication(
                    args.record,
                    &OverrideRequest {
                        component: args.component,
                        section: args.section,
                        priority: args.priority,
                    },
                )
                .await?;
            print_publication(&record)?;
        }
        SubCommand::Archives(Archives::Ls(_)) => print_json(&client.get_archives().await?)?,
        SubCommand::Archives(Archives::Create(args)) => {
            let archive = client
                .create_archive(&CreateArchiveRequest {
                    distribution_id: args.distribution,
                    owner: args.owner,
                    name: args.name,
                })
                .await?;
            print_json(&archive)?;
        }
        SubCommand::Distributions(Distributions::Ls(_)) => {
            print_json(&client.get_distributions().await?)?
        }
        SubCommand::Distributions(Distributions::Create(args)) => {
            let distribution = client
                .create_distribution(&CreateDistributionRequest { name: args.name })
                .await?;
            print_json(&distribution)?;
        }
        SubCommand::Series(Series::Ls(_)) => print_json(&client.get_series().await?)?,
        SubCommand::Series(Series::Create(args)) => {
            let series = client
                .create_series(&CreateDistroSeriesRequest {
                    distribution_id: args.distribution,
                    name: args.name,
                    version: args.version,
                })
                .await?;
            print_json(&series)?;
        }
        SubCommand::ArchSeries(ArchSeries::Ls(_)) => {
            print_json(&client.get_arch_series().await?)?
        }
        SubCommand::ArchSeries(ArchSeries::Create(args)) => {
            let arch_series = client
                .create_arch_series(&CreateDistroArchSeriesRequest {
                    distro_series_id: args.series,
                    architecture_tag: args.architecture_tag,
                    processor_family: args.processor_family,
                    chroot: None,
                })
                .await?;
            print_json(&arch_series)?;
        }
        SubCommand::ArchSeries(ArchSeries::Chroot(args)) => {
            let arch_series = client
                .set_chroot(
                    args.id,
                    &SetChrootRequest {
                        chroot: FileRef {
                            filename: args.filename,
                            sha256: args.sha256,
                            size: args.size,
                        },
                    },
                )
                .await?;
            print_json(&arch_series)?;
        }
        SubCommand::Completions(completions) => args::gen_completions(&completions)?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let logging = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    env_logger::init_from_env(Env::default().default_filter_or(logging));

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}
