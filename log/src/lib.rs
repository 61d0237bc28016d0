//! Logging setup for the `line-top` tools with file output and optional stdout.
//!
//! Logs always go to a file at `warn` level (or more when a filter is set).
//! Stdout logging is enabled when `LINE_TOP_LOG` or `RUST_LOG` is set, or in
//! debug builds.
//!
//! ## Environment Variables
//!
//! 1. **`LINE_TOP_LOG`** (highest priority): bare levels such as `debug` apply
//!    to every workspace crate, anything else is used as a full filter
//! 2. **`RUST_LOG`**: standard tracing filter
//! 3. **Default**: `warn` globally, `info` for the workspace crates
//!
//! ## Log File Location
//!
//! Default: `<data_local_dir>/line-top/logs/line-top-<pid>.log`
//! - macOS: `~/Library/Application Support/line-top/logs/line-top-12345.log`
//! - Linux: `~/.local/share/line-top/logs/line-top-12345.log`
//!
//! Override with `--log-file <path>` or `LINE_TOP_LOG_FILE`.

use std::{
    env,
    path::{Path, PathBuf},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const CRATES: [&str; 2] = ["line_top_index", "line_top_bin"];

/// Returned from [`init`]; must be held alive to ensure log file flushing.
pub struct LogGuard {
    _file_guard: WorkerGuard,
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// A path with an extension names the file, anything else a directory.
    pub log_file_path: Option<PathBuf>,
}

/// Initialize logging.
///
/// Filters follow the priority in the module docs. The returned [`LogGuard`]
/// must be held for the lifetime of the program; dropping it flushes and stops
/// the background file writer.
pub fn init(config: LogConfig) -> Result<LogGuard, BoxError> {
    let override_path = config
        .log_file_path
        .or_else(|| env::var_os("LINE_TOP_LOG_FILE").map(PathBuf::from));
    let (log_dir, filename) = resolve_log_path(override_path);

    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, &filename);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_filter(create_file_filter());

    let stdout_enabled = env::var("LINE_TOP_LOG").is_ok()
        || env::var("RUST_LOG").is_ok()
        || cfg!(debug_assertions);
    let stdout_layer = stdout_enabled.then(|| fmt::layer().with_filter(create_filter()));

    Registry::default()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()?;

    Ok(LogGuard {
        _file_guard: file_guard,
        log_file: log_dir.join(filename),
    })
}

/// Initialize stdout-only logging for tests.
///
/// Safe to call from every test; later calls are no-ops.
pub fn test() {
    let _ = fmt()
        .with_env_filter(create_filter())
        .with_test_writer()
        .try_init();
}

fn resolve_log_path(override_path: Option<PathBuf>) -> (PathBuf, String) {
    let filename = format!("line-top-{}.log", std::process::id());

    if let Some(path) = override_path {
        if path.extension().is_some() {
            let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or(filename);
            return (dir, name);
        }
        return (path, filename);
    }

    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("line-top")
        .join("logs");
    (dir, filename)
}

/// File filter: the configured filter if any, otherwise `warn`.
fn create_file_filter() -> EnvFilter {
    if env::var("LINE_TOP_LOG").is_ok() || env::var("RUST_LOG").is_ok() {
        return create_filter();
    }
    EnvFilter::new("warn")
}

fn create_filter() -> EnvFilter {
    if let Ok(level) = env::var("LINE_TOP_LOG") {
        return EnvFilter::new(expand_level(&level));
    }
    if let Ok(rust_log) = env::var("RUST_LOG") {
        return EnvFilter::new(rust_log);
    }
    EnvFilter::new(expand_level("info"))
}

/// `debug` becomes `warn,line_top_index=debug,line_top_bin=debug`. Values
/// with directive syntax pass through untouched.
fn expand_level(value: &str) -> String {
    if value.contains('=') || value.contains(':') || value.contains(',') {
        return value.to_string();
    }

    let mut filter = String::from("warn");
    for name in CRATES {
        filter.push_str(&format!(",{name}={value}"));
    }
    filter
}
