use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::cli::{self, Cli, SourceKind};
use crate::config::{self, AppConfig};
use crate::theme::Theme;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputFlags {
    pub short: bool,
    pub emoji_off: bool,
    pub json: bool,
}

/// Everything a source needs to know about this run.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub flags: OutputFlags,
    pub release_versions: Vec<String>,
    pub only: Option<SourceKind>,
    pub github_token: Option<String>,
    pub now: DateTime<Utc>,
    pub theme: Arc<Theme>,
}

impl ReportContext {
    pub fn new(flags: OutputFlags, color: bool) -> Self {
        Self {
            flags,
            release_versions: Vec::new(),
            only: None,
            github_token: None,
            now: Utc::now(),
            theme: Arc::new(Theme::new(!flags.emoji_off, color && !flags.json)),
        }
    }

    pub fn from_cli(cli: &Cli, config: &AppConfig, env_token: Option<String>) -> Self {
        let flags = OutputFlags {
            short: cli.short,
            emoji_off: cli.emoji_off,
            json: cli.json,
        };
        Self {
            release_versions: cli::split_release_versions(&cli.release_version),
            only: cli.report,
            github_token: config::resolve_token(env_token, &config.github),
            ..Self::new(flags, !cli.no_color)
        }
    }

    /// Sources to run, in report order.
    pub fn selected_sources(&self) -> Vec<SourceKind> {
        match self.only {
            Some(kind) => vec![kind],
            None => SourceKind::ALL.to_vec(),
        }
    }
}
