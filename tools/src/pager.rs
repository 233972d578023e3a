use pocketd_common::errors::*;
use std::env;
use std::io::{self, IsTerminal, Write};
use std::process::{Command, Stdio};

/// Logs shorter than this are printed directly
const PAGE_LINES: usize = 40;

fn pager_command() -> Option<Vec<String>> {
    if env::var_os("NOPAGER").is_some() {
        return None;
    }
    let pager = env::var("PAGER").unwrap_or_else(|_| "less -R".to_string());
    let argv = pager.split_whitespace().map(String::from).collect::<Vec<_>>();
    if argv.is_empty() {
        None
    } else {
        Some(argv)
    }
}

fn needs_paging(log: &str) -> bool {
    log.lines().count() > PAGE_LINES
}

/// Shows the retained tail of a build log, through `$PAGER` if it's long
pub fn show_log(build_id: i32, log: &str) -> Result<()> {
    let mut text = String::new();
    if log.is_empty() {
        text.push_str(&format!("build #{build_id} has no log output yet\n"));
    } else {
        text.push_str(log);
        if !log.ends_with('\n') {
            text.push('\n');
        }
    }

    let pager = if io::stdout().is_terminal() && needs_paging(&text) {
        pager_command()
    } else {
        None
    };

    let Some(argv) = pager else {
        io::stdout().write_all(text.as_bytes()).ok();
        return Ok(());
    };

    let mut child = Command::new(&argv[0])
        .args(&argv[1..])
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| anyhow!("Failed to spawn pager {:?}", argv[0]))?;
    if let Some(mut stdin) = child.stdin.take() {
        // the pager may quit before reading everything
        stdin.write_all(text.as_bytes()).ok();
    }
    child.wait()?;
    Ok(())
}
