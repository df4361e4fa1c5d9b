//! Output formatting for different formats.

use cabundle_sync::{CycleOutcome, CycleReport};
use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::str::FromStr;

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summary with colors
    #[default]
    Pretty,
    /// JSON output
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!(
                "Unknown output format: {}\n\
                 Valid formats: pretty, json",
                s
            ),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// One row of `list` output.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ListingRow {
    /// File name as published
    pub logical_name: String,
    /// Resource the bundle is stored in
    pub resource: String,
    /// Download location
    pub url: String,
}

/// Render a cycle outcome.
pub fn render_outcome(outcome: &CycleOutcome, format: OutputFormat, color: bool) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outcome)?),
        OutputFormat::Pretty => Ok(match outcome {
            CycleOutcome::Synced(report) => pretty_report(report, color),
            CycleOutcome::Skipped { reason } => {
                let label = paint("Skipped:", color, |s| s.yellow().bold().to_string());
                format!("{label} {reason}")
            }
        }),
    }
}

/// Render the rows of a listing.
pub fn render_listing(rows: &[ListingRow], format: OutputFormat, color: bool) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(rows)?),
        OutputFormat::Pretty => {
            if rows.is_empty() {
                return Ok("No bundles found".to_string());
            }
            let width = rows.iter().map(|r| r.logical_name.len()).max().unwrap_or(0);
            let mut out = String::new();
            for row in rows {
                let resource = paint(&row.resource, color, |s| s.cyan().to_string());
                let _ = writeln!(out, "{:<width$}  ->  {resource}", row.logical_name);
            }
            Ok(out.trim_end().to_string())
        }
    }
}

fn pretty_report(report: &CycleReport, color: bool) -> String {
    let mut out = String::new();
    let title = paint("Synced", color, |s| s.green().bold().to_string());
    let _ = writeln!(
        out,
        "{title} {} bundles from {} at {}",
        report.bundles,
        report.bundle_url,
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    for id in &report.created {
        let _ = writeln!(out, "  {} {id}", paint("+", color, |s| s.green().to_string()));
    }
    for id in &report.updated {
        let _ = writeln!(out, "  {} {id}", paint("~", color, |s| s.yellow().to_string()));
    }
    for name in &report.deleted {
        let _ = writeln!(out, "  {} {name}", paint("-", color, |s| s.red().to_string()));
    }

    let _ = write!(
        out,
        "{} created, {} updated, {} unchanged, {} deleted",
        report.created.len(),
        report.updated.len(),
        report.unchanged,
        report.deleted.len() + report.already_gone
    );
    out
}

fn paint(text: &str, color: bool, style: impl Fn(&str) -> String) -> String {
    if color {
        style(text)
    } else {
        text.to_string()
    }
}
