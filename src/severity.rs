//! Severity scoring for non-passing dashboard jobs.
//!
//! The dashboard service describes recent history in free text, e.g.
//! `"8 of 9 (88.9%) recent columns passed (19455 of 19458 or 100.0% cells)"`.
//! The first `<passes> of <runs>` pair is what gets scored.

use regex::Regex;
use std::sync::OnceLock;

use crate::model::dashboard::OverallStatus;
use crate::model::report::Severity;
use crate::theme::{Theme, Thresholds};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentRuns {
    pub passes: u32,
    pub runs: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub severity: Severity,
    pub highlight: String,
    /// `None` when the diagnostic text could not be parsed.
    pub recent: Option<RecentRuns>,
}

fn recent_runs_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s+of\s+(\d+)").expect("valid recent runs pattern"))
}

pub fn parse_recent_runs(diagnostic: &str) -> Option<RecentRuns> {
    let caps = recent_runs_pattern().captures(diagnostic)?;
    let passes = caps.get(1)?.as_str().parse().ok()?;
    let runs = caps.get(2)?.as_str().parse().ok()?;
    Some(RecentRuns { passes, runs })
}

pub fn severity_for_ratio(ratio: f64, thresholds: &Thresholds) -> Severity {
    if ratio <= thresholds.high {
        Severity::High
    } else if ratio <= thresholds.medium {
        Severity::Medium
    } else {
        Severity::Light
    }
}

pub fn classify(status: OverallStatus, diagnostic: &str, theme: &Theme) -> Classification {
    let Some(recent) = parse_recent_runs(diagnostic) else {
        tracing::debug!(diagnostic, "Unparseable recent run diagnostic");
        return Classification {
            severity: Severity::Light,
            highlight: String::new(),
            recent: None,
        };
    };

    let thresholds = &theme.thresholds;
    let (severity, marker) = if recent.runs <= thresholds.new_job_runs {
        (Severity::Light, &theme.emojis.status_new)
    } else {
        let ratio = f64::from(recent.passes) / f64::from(recent.runs);
        let marker = match status {
            OverallStatus::Failing => &theme.emojis.status_failing,
            _ => &theme.emojis.status_flaky,
        };
        (severity_for_ratio(ratio, thresholds), marker)
    };

    Classification {
        severity,
        highlight: marker.repeat(severity.level()),
        recent: Some(recent),
    }
}
