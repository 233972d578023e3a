/// Render a duration in seconds the way `pocketctl` prints build times.
pub fn secs_to_human(duration: i64) -> String {
    let secs = duration % 60;
    let mins = duration / 60;
    let hours = mins / 60;
    let mins = mins % 60;

    let mut out = Vec::new();
    if hours > 0 {
        out.push(format!("{:2}h", hours));
    }
    if mins > 0 || hours > 0 {
        out.push(format!("{:2}m", mins));
    }
    out.push(format!("{:2}s", secs));

    out.join(" ")
}

/// Returns the last `max_bytes` of a build log, cut at a line boundary if possible.
pub fn log_tail(log: &[u8], max_bytes: usize) -> String {
    if log.len() <= max_bytes {
        return String::from_utf8_lossy(log).into_owned();
    }

    let mut tail = &log[log.len() - max_bytes..];
    if let Some(idx) = tail.iter().position(|b| *b == b'\n') {
        if idx + 1 < tail.len() {
            tail = &tail[idx + 1..];
        }
    }
    String::from_utf8_lossy(tail).into_owned()
}
