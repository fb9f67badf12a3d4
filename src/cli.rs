use clap::{Parser, ValueEnum};
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

#[derive(Parser, Debug)]
#[command(
    name = "ci-reporter",
    version,
    about = "Summarizes CI signal from the GitHub project board and TestGrid"
)]
pub struct Cli {
    /// Shorten the report (no job details, no observing/resolved columns)
    #[arg(long)]
    pub short: bool,

    /// Remove emojis from the report
    #[arg(long = "emoji-off")]
    pub emoji_off: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Add release dashboards, e.g. -v 1.22 or -v "1.22, 1.21"
    #[arg(short = 'v', long = "release-version", default_value = "")]
    pub release_version: String,

    /// Only run this report
    #[arg(long, value_enum)]
    pub report: Option<SourceKind>,

    /// Config file (defaults to ~/.ci-reporter/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (repeat for more)
    #[arg(long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    Github,
    Testgrid,
}

impl SourceKind {
    pub const ALL: [SourceKind; 2] = [SourceKind::Github, SourceKind::Testgrid];
}

fn version_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\d+$").expect("valid version pattern"))
}

/// Splits `"1.22, 1.21"` into versions. Entries that don't look like a
/// release version are logged and dropped.
pub fn split_release_versions(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .filter(|v| {
            let valid = version_pattern().is_match(v);
            if !valid {
                tracing::warn!(version = %v, "Ignoring release version that does not match <major>.<minor>");
            }
            valid
        })
        .map(String::from)
        .collect()
}
