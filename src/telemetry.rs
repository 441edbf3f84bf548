//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! Behavior:
//! - LOG_LEVEL controls the filter (e.g. "debug" or detailed directives like
//!   "info,quizsmith=debug,tower_http=info,axum=info").
//! - LOG_FORMAT selects "pretty" (default) or "json" structured logs.
//! - LOG_FILE, when set, sends log lines to that file (appended, parent
//!   directories created, no ANSI colours) instead of stdout.
//!
//! Notes:
//! - We include targets in the output to disambiguate sources.
//! - Tower HTTP TraceLayer still adds per-request spans; this complements it.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new("info,quizsmith=debug,tower_http=info,axum=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    let file = std::env::var("LOG_FILE")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .and_then(|p| match open_log_file(Path::new(&p)) {
            Ok(f) => Some(f),
            Err(e) => {
                // The subscriber is not installed yet, so this goes to stderr.
                eprintln!("LOG_FILE {p} could not be opened ({e}); logging to stdout");
                None
            }
        });

    // Each arm has its own concrete subscriber type, so init inside the match.
    match (json, file) {
        (true, Some(f)) => builder.json().with_ansi(false).with_writer(Mutex::new(f)).init(),
        (true, None) => builder.json().init(),
        (false, Some(f)) => builder.with_ansi(false).with_writer(Mutex::new(f)).init(),
        (false, None) => builder.init(),
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn log_file_creates_directories_and_appends() {
        let root = std::env::temp_dir().join(format!("quizsmith-logs-{}", uuid::Uuid::new_v4()));
        let path = root.join("nested").join("run.log");

        open_log_file(&path).unwrap().write_all(b"first\n").unwrap();
        open_log_file(&path).unwrap().write_all(b"second\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");

        std::fs::remove_dir_all(root).unwrap();
    }
}
