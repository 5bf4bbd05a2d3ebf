// ABOUTME: Shared logging setup for the flux CLI and the mock relay
// ABOUTME: init() for stderr, init_file() for the interactive prompt, init_for() for single-crate daemons

use std::path::{Path, PathBuf};

use tracing_subscriber::EnvFilter;

/// Standard logging to stderr. Default: INFO level, RUST_LOG override.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_target(false)
        .init();
}

/// File-based logging for interactive sessions where stderr would garble the prompt.
/// Default: WARN level, RUST_LOG override. Logs to `{log_dir}/{app_name}.log`.
/// If setup fails, prints a warning to stderr and continues without logging.
pub fn init_file(log_dir: &Path, app_name: &str) {
    if let Err(e) = init_file_inner(log_dir, app_name) {
        eprintln!("Warning: failed to set up file logging: {e}");
    }
}

/// Path of the log file written by [`init_file`].
pub fn log_file_path(log_dir: &Path, app_name: &str) -> PathBuf {
    log_dir.join(format!("{app_name}.log"))
}

fn init_file_inner(
    log_dir: &Path,
    app_name: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all(log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path(log_dir, app_name))?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .with_ansi(false)
        .try_init()?;

    Ok(())
}

/// Crate-filtered logging to stderr. Default: INFO for the named crate, WARN for everything else.
pub fn init_for(crate_name: &str) {
    tracing_subscriber::fmt().with_env_filter(crate_filter(crate_name)).init();
}

fn crate_filter(crate_name: &str) -> EnvFilter {
    let directive = format!("{}=info", crate_name.replace('-', "_"));
    EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into())
        .add_directive(
            directive
                .parse()
                .unwrap_or_else(|_| tracing::Level::INFO.into()),
        )
}
