use futures_util::FutureExt;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use pocketd_common::errors::*;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::select;
use tokio::sync::Notify;
use tokio::time;

const SIGKILL_DELAY: u64 = 10;

/// Build output, readable while the backend is still writing to it
pub type SharedLog = Arc<Mutex<Vec<u8>>>;

pub struct Options {
    pub timeout: Duration,
    pub size_limit: Option<usize>,
    pub kill_at_size_limit: bool,
    pub passthrough: bool,
    pub envs: HashMap<String, String>,
    pub cwd: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success,
    Failed,
    TimedOut,
    Aborted,
}

struct Capture {
    log: SharedLog,
    timeout: Duration,
    size_limit: Option<usize>,
    kill_at_size_limit: bool,
    start: Instant,
    sigterm_sent: Option<Instant>,
    truncated: bool,
    timed_out: bool,
    aborted: bool,
}

impl Capture {
    fn new(log: SharedLog, opts: &Options) -> Capture {
        Capture {
            log,
            timeout: opts.timeout,
            size_limit: opts.size_limit,
            kill_at_size_limit: opts.kill_at_size_limit,
            start: Instant::now(),
            sigterm_sent: None,
            truncated: false,
            timed_out: false,
            aborted: false,
        }
    }

    fn append(&self, bytes: &[u8]) {
        // a poisoned lock still holds a usable buffer
        let mut log = self.log.lock().unwrap_or_else(|err| err.into_inner());
        log.extend(bytes);
    }

    fn len(&self) -> usize {
        self.log.lock().map(|log| log.len()).unwrap_or_default()
    }

    fn push_bytes(&mut self, child: &mut Child, mut slice: &[u8]) -> Result<()> {
        if self.truncated {
            return Ok(());
        }

        if let Some(size_limit) = self.size_limit {
            let len = self.len();
            let n = size_limit.saturating_sub(len).min(slice.len());
            if n < 1 {
                warn!(
                    "Exceeding output limit: output={}, slice={}, limit={}",
                    len,
                    slice.len(),
                    size_limit
                );
                let msg = format!("TRUNCATED DUE TO SIZE LIMIT: {} bytes", size_limit);
                return self.truncate(child, &msg, self.kill_at_size_limit);
            }
            slice = &slice[..n];
        }

        self.append(slice);
        Ok(())
    }

    fn kill(pid: u32, signal: Signal) -> Result<()> {
        // convert 1234 to -1234 to kill grand-children too
        let pid = -(pid as i32);
        info!("Sending {} to child(pid={})", signal, pid);
        signal::kill(Pid::from_raw(pid), signal)?;
        Ok(())
    }

    fn terminate(&mut self, child: &mut Child) -> Result<()> {
        if self.sigterm_sent.is_none() {
            if let Some(pid) = child.id() {
                Self::kill(pid, Signal::SIGTERM)?;
            }
            self.sigterm_sent = Some(Instant::now());
        }
        Ok(())
    }

    fn truncate(&mut self, child: &mut Child, reason: &str, kill: bool) -> Result<()> {
        if kill {
            self.terminate(child)?;
        }
        self.append(format!("\n\n{}\n\n", reason).as_bytes());
        self.truncated = true;
        Ok(())
    }

    fn abort(&mut self, child: &mut Child) -> Result<()> {
        warn!("Build was aborted, killing child...");
        self.aborted = true;
        self.append(b"\n\nABORTED\n\n");
        self.terminate(child)
    }

    fn next_wakeup(
        &mut self,
        child: &mut Child,
        stdout_open: &mut bool,
        stderr_open: &mut bool,
    ) -> Result<Duration> {
        if let Some(sigterm_sent) = self.sigterm_sent {
            if sigterm_sent.elapsed() > Duration::from_secs(SIGKILL_DELAY) {
                if let Some(pid) = child.id() {
                    warn!(
                        "child(pid={}) didn't terminate {}s after SIGTERM, sending SIGKILL",
                        pid, SIGKILL_DELAY
                    );
                    // child.id is going to return None after this
                    Self::kill(pid, Signal::SIGKILL)?;
                    *stdout_open = false;
                    *stderr_open = false;
                }
            }
        }

        if let Some(remaining) = self.timeout.checked_sub(self.start.elapsed()) {
            return Ok(remaining);
        } else if !self.timed_out {
            warn!("child timed out, killing...");
            self.timed_out = true;
            let msg = format!("TRUNCATED DUE TO TIMEOUT: {} seconds", self.timeout.as_secs());
            self.truncate(child, &msg, true)?;
        }

        Ok(Duration::from_secs(SIGKILL_DELAY))
    }

    fn exit(&self, success: bool) -> Exit {
        if self.aborted {
            Exit::Aborted
        } else if self.timed_out {
            Exit::TimedOut
        } else if success {
            Exit::Success
        } else {
            Exit::Failed
        }
    }
}

/// Runs `bin` in its own process group, capturing stdout and stderr into
/// `log`. A notification on `abort` terminates the whole group.
pub async fn run<I, S>(
    bin: &Path,
    args: I,
    opts: Options,
    log: SharedLog,
    abort: &Notify,
) -> Result<Exit>
where
    I: IntoIterator<Item = S> + fmt::Debug,
    S: AsRef<OsStr>,
{
    info!("Running {:?} {:?}", bin, args);
    let mut cmd = Command::new(bin);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .envs(&opts.envs);
    if let Some(cwd) = &opts.cwd {
        cmd.current_dir(cwd);
    }

    unsafe {
        cmd.pre_exec(|| {
            // create a new process group
            let pid = nix::unistd::getpid();
            if let Err(err) = nix::unistd::setpgid(pid, Pid::from_raw(0)) {
                warn!("Failed to create new process group: {:#?}", err);
            }
            Ok(())
        });
    }

    let mut child = cmd
        .spawn()
        .with_context(|| anyhow!("Failed to start {:?}", bin))?;

    let mut child_stdout = child
        .stdout
        .take()
        .ok_or_else(|| format_err!("Child has no stdout pipe"))?;
    let mut child_stderr = child
        .stderr
        .take()
        .ok_or_else(|| format_err!("Child has no stderr pipe"))?;

    let mut buf_stdout = [0u8; 4096];
    let mut buf_stderr = [0u8; 4096];

    let mut stdout = tokio::io::stdout();
    let mut stderr = tokio::io::stderr();
    let passthrough = opts.passthrough;

    let mut stdout_open = true;
    let mut stderr_open = true;
    let mut cap = Capture::new(log, &opts);
    let success = loop {
        let remaining = cap.next_wakeup(&mut child, &mut stdout_open, &mut stderr_open)?;
        let aborted = cap.aborted;

        if stdout_open || stderr_open {
            select! {
                n = child_stdout.read(&mut buf_stdout).fuse() => {
                    let n = n?;
                    trace!("read stdout: {}", n);
                    if n == 0 {
                        stdout_open = false;
                    } else {
                        cap.push_bytes(&mut child, &buf_stdout[..n])?;
                        if passthrough {
                            stdout.write_all(&buf_stdout[..n]).await?;
                        }
                    }
                },
                n = child_stderr.read(&mut buf_stderr).fuse() => {
                    let n = n?;
                    trace!("read stderr: {}", n);
                    if n == 0 {
                        stderr_open = false;
                    } else {
                        cap.push_bytes(&mut child, &buf_stderr[..n])?;
                        if passthrough {
                            stderr.write_all(&buf_stderr[..n]).await?;
                        }
                    }
                },
                _ = abort.notified(), if !aborted => cap.abort(&mut child)?,
                _ = time::sleep(remaining).fuse() => continue,
            }
        } else {
            select! {
                status = child.wait().fuse() => {
                    let status = status?;
                    info!("{:?} exited with exit={}, captured {} bytes", bin, status, cap.len());
                    break status.success();
                }
                _ = abort.notified(), if !aborted => cap.abort(&mut child)?,
                _ = time::sleep(remaining).fuse() => continue,
            }
        }
    };

    Ok(cap.exit(success))
}
