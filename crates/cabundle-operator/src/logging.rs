//! Tracing subscriber setup.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

const VERBOSE_DIRECTIVES: &str =
    "info,cabundle_core=debug,cabundle_fetch=debug,cabundle_sync=debug,cabundle_operator=debug";

/// Build the log filter.
///
/// `--verbose` turns on debug output for this operator's crates and takes
/// precedence over `RUST_LOG`. Otherwise `RUST_LOG` applies, defaulting to
/// `info`.
pub fn filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_DIRECTIVES)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable.
pub fn init(verbose: bool, json: bool, color: bool) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_writer(std::io::stderr)
        .with_ansi(color && !json);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!(e))
}
