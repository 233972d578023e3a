//! A single build: runs the backend script in a scratch directory and turns
//! whatever it left in `out/` into a [`BuildResult`].
//!
//! The backend is called with the path of the dispatch request as its only
//! argument. It writes `out/binaries.json` on success. On failure it may write
//! `out/outcome` (`dependency-wait`, `manual-dependency-wait` or
//! `chroot-problem`) and `out/dependencies` with the unmet relations.

use crate::config::Config;
use crate::files::{self, Librarian};
use crate::proc::{self, Exit, SharedLog};
use pocketd_common::api::builder::{BinaryReport, BuildOutcome, BuildResult, DispatchRequest};
use pocketd_common::api::v1::FileRef;
use pocketd_common::errors::*;
use pocketd_common::utils;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::Notify;

/// A binary as described by the backend, files are names inside `out/`
#[derive(Debug, Deserialize)]
struct BinaryManifest {
    name: String,
    version: String,
    architecture_specific: bool,
    #[serde(default)]
    depends: String,
    #[serde(default)]
    conflicts: String,
    #[serde(default)]
    provides: String,
    component: Option<String>,
    section: Option<String>,
    priority: Option<String>,
    files: Vec<String>,
}

#[derive(Debug)]
pub enum Completion {
    Finished(BuildResult),
    Aborted,
}

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn create(config: &Config, request: &DispatchRequest) -> Result<Workspace> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pocketd-build-");
        let dir = if let Some(output_dir) = &config.output_dir {
            fs::create_dir_all(output_dir)
                .with_context(|| anyhow!("Failed to create {:?}", output_dir))?;
            builder.tempdir_in(output_dir)?
        } else {
            builder.tempdir()?
        };

        fs::create_dir(dir.path().join("out"))?;
        fs::write(
            dir.path().join("request.json"),
            serde_json::to_vec_pretty(request)?,
        )?;
        Ok(Workspace { dir })
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn request(&self) -> PathBuf {
        self.path().join("request.json")
    }

    fn out(&self) -> PathBuf {
        self.path().join("out")
    }

    fn read_out(&self, name: &str) -> Result<Option<String>> {
        let path = self.out().join(name);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path).with_context(|| anyhow!("Failed to read {:?}", path))?;
        Ok(Some(text.trim().to_string()))
    }
}

fn envs(request: &DispatchRequest, workspace: &Workspace) -> HashMap<String, String> {
    let mut envs = HashMap::new();
    envs.insert("POCKETD_BUILD_ID".into(), request.build_id.to_string());
    envs.insert("POCKETD_NAME".into(), request.name.clone());
    envs.insert("POCKETD_VERSION".into(), request.version.clone());
    envs.insert("POCKETD_ARCH".into(), request.architecture_tag.clone());
    envs.insert("POCKETD_POCKET".into(), request.pocket.to_string());
    envs.insert("POCKETD_BUILD_DEPENDS".into(), request.build_depends.clone());
    envs.insert("POCKETD_OUTPUT".into(), workspace.out().display().to_string());
    envs
}

fn failure_outcome(marker: Option<&str>) -> BuildOutcome {
    match marker {
        Some("dependency-wait") => BuildOutcome::DependencyWait,
        Some("manual-dependency-wait") => BuildOutcome::ManualDependencyWait,
        Some("chroot-problem") => BuildOutcome::ChrootProblem,
        Some(other) => {
            warn!("Backend reported unknown outcome {:?}, treating as failure", other);
            BuildOutcome::Failed
        }
        None => BuildOutcome::Failed,
    }
}

async fn store(
    librarian: Option<&Librarian>,
    path: &Path,
) -> Result<FileRef> {
    let file = {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || files::file_ref(&path)).await??
    };
    if let Some(librarian) = librarian {
        librarian.upload(&file, path).await?;
    }
    Ok(file)
}

async fn collect_binaries(
    workspace: &Workspace,
    librarian: Option<&Librarian>,
) -> Result<Vec<BinaryReport>> {
    let manifest = workspace
        .read_out("binaries.json")?
        .ok_or_else(|| format_err!("Backend exited successfully but wrote no binaries.json"))?;
    let manifest = serde_json::from_str::<Vec<BinaryManifest>>(&manifest)
        .context("Failed to parse binaries.json")?;

    let mut binaries = Vec::new();
    for binary in manifest {
        let mut files = Vec::new();
        for name in &binary.files {
            if name.contains('/') {
                bail!("Binary file name must not contain a path: {:?}", name);
            }
            files.push(store(librarian, &workspace.out().join(name)).await?);
        }
        binaries.push(BinaryReport {
            name: binary.name,
            version: binary.version,
            architecture_specific: binary.architecture_specific,
            depends: binary.depends,
            conflicts: binary.conflicts,
            provides: binary.provides,
            component: binary.component,
            section: binary.section,
            priority: binary.priority,
            files,
        });
    }
    Ok(binaries)
}

pub async fn run(
    config: &Config,
    request: &DispatchRequest,
    log: SharedLog,
    abort: &Notify,
) -> Result<Completion> {
    let librarian = config.librarian.as_deref().map(Librarian::new).transpose()?;
    let workspace = Workspace::create(config, request)?;
    info!(
        "Building {} {} for {} in {:?}",
        request.name,
        request.version,
        request.architecture_tag,
        workspace.path()
    );

    let opts = proc::Options {
        timeout: config.build.timeout(),
        size_limit: config.build.max_bytes,
        kill_at_size_limit: false,
        passthrough: !config.build.silent,
        envs: envs(request, &workspace),
        cwd: Some(workspace.path().to_path_buf()),
    };
    let exit = proc::run(&config.backend, [workspace.request()], opts, log.clone(), abort).await?;

    let (mut outcome, mut dependencies) = match exit {
        Exit::Aborted => return Ok(Completion::Aborted),
        Exit::Success => (BuildOutcome::Success, None),
        Exit::TimedOut => (BuildOutcome::Failed, None),
        Exit::Failed => (
            failure_outcome(workspace.read_out("outcome")?.as_deref()),
            workspace.read_out("dependencies")?,
        ),
    };
    if !matches!(
        outcome,
        BuildOutcome::DependencyWait | BuildOutcome::ManualDependencyWait
    ) {
        dependencies = None;
    }

    let mut binaries = Vec::new();
    if outcome == BuildOutcome::Success {
        match collect_binaries(&workspace, librarian.as_ref()).await {
            Ok(collected) => binaries = collected,
            Err(err) => {
                error!("Failed to collect build outputs: {:#}", err);
                let note = format!("\n\npocketd-builder: {:#}\n", err);
                log.lock()
                    .unwrap_or_else(|err| err.into_inner())
                    .extend(note.as_bytes());
                outcome = BuildOutcome::UploadFailed;
            }
        }
    }

    let log_bytes = log.lock().unwrap_or_else(|err| err.into_inner()).clone();
    let log_tail = utils::log_tail(&log_bytes, config.build.log_tail_size());
    let log_path = workspace.path().join(format!("build-{}.log", request.build_id));
    fs::write(&log_path, &log_bytes)?;
    let log = match store(librarian.as_ref(), &log_path).await {
        Ok(file) => Some(file),
        Err(err) => {
            warn!("Failed to store build log: {:#}", err);
            None
        }
    };

    info!("Build {} finished: {:?}", request.build_id, outcome);
    Ok(Completion::Finished(BuildResult {
        build_id: request.build_id,
        outcome,
        binaries,
        log,
        log_tail,
        dependencies,
    }))
}
