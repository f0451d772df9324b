// logging.rs — tracing subscriber setup for the core library.
//
// The host process owns stdout/stderr, and on Windows they usually go
// nowhere, so a `log_dir` from the add-on sends everything to a single
// `screencast_keys_core.log` file instead. Writes are synchronous: there is
// no background thread inside the host.

use crate::config::Config;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "screencast_keys_core.log";

/// `debug` when the add-on asks for it (and `RUST_LOG` may then override),
/// `info` otherwise regardless of the environment.
pub fn filter(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    }
}

fn file_appender(dir: &Path) -> Option<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_NAME)
        .build(dir)
        .ok()
}

/// Install the global subscriber. Only the first call in a process wins; the
/// add-on may be re-enabled without the library being unloaded.
pub fn init(config: &Config) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(config.debug))
        .with_ansi(false)
        .with_target(false);

    let installed = match config.log_dir.as_deref().and_then(file_appender) {
        Some(appender) => builder.with_writer(appender).try_init().is_ok(),
        None => builder.with_writer(std::io::stderr).try_init().is_ok(),
    };
    if installed {
        tracing::info!(version = env!("CARGO_PKG_VERSION"), "screencast keys core logging started");
    }
}
