//! Command implementations.

pub mod list;
pub mod once;
pub mod run;

use anyhow::Result;
use cabundle_fetch::BundleFetcher;
use cabundle_sync::SyncSettings;

use crate::cli::args::SyncArgs;
use crate::config::Config;
use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Configuration loaded from file
    pub config: Config,

    /// Output format
    pub output_format: OutputFormat,

    /// Disable colors
    pub no_color: bool,
}

impl Context {
    /// Build the HTTP bundle fetcher from the configured limits.
    pub fn fetcher(&self) -> Result<BundleFetcher> {
        Ok(BundleFetcher::builder()
            .timeout(self.config.request_timeout())
            .concurrency(self.config.concurrency)
            .build()?)
    }

    /// Merge command options over the file configuration and validate.
    pub fn settings(&self, args: &SyncArgs) -> Result<SyncSettings> {
        self.config.clone().merge(args).settings()
    }

    /// Whether output may use ANSI colors
    pub const fn color(&self) -> bool {
        !self.no_color
    }
}
