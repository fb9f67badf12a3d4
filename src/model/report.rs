use serde::{Deserialize, Serialize};
use std::fmt;

/// All source reports of one run, in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report(pub Vec<ReportData>);

impl Report {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(test)]
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    pub data: Vec<ReportDataField>,
    /// Source name like `github` or `testgrid`.
    pub name: String,
    /// Sub-queries that failed and were left out of `data`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
}

impl ReportData {
    /// Wraps the gathered fields of one source.
    pub fn assemble(name: impl Into<String>, data: Vec<ReportDataField>, failures: Vec<String>) -> Self {
        Self {
            data,
            name: name.into(),
            failures,
        }
    }
}

/// One grouping of records: a board column, a dashboard, or a single issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportDataField {
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub records: Vec<ReportDataRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Summary,
    #[default]
    Detail,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportDataRecord {
    #[serde(default)]
    pub kind: RecordKind,
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sig: String,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub highlight: String,
}

impl ReportDataRecord {
    pub fn summary(notes: Vec<String>) -> Self {
        Self {
            kind: RecordKind::Summary,
            notes,
            ..Default::default()
        }
    }
}

/// How urgently a non-passing job should be looked at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Severity {
    #[default]
    Unclassified = 0,
    Light = 1,
    Medium = 2,
    High = 3,
}

impl Severity {
    pub fn level(self) -> usize {
        self as usize
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity as u8
    }
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Severity::Unclassified),
            1 => Ok(Severity::Light),
            2 => Ok(Severity::Medium),
            3 => Ok(Severity::High),
            other => Err(format!("severity out of range: {other}")),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}
