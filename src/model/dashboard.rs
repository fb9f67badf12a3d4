use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;

/// `GET <dashboard>/summary`: job name to the raw job entry. Entries are
/// decoded one at a time so a malformed job cannot sink its siblings.
pub type DashboardSummary = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobSummary {
    pub overall_status: OverallStatus,
    /// Free-text diagnostic like "8 of 9 (88.9%) recent columns passed".
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tests: Vec<TestSummary>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TestSummary {
    pub test_name: String,
    #[serde(default)]
    pub fail_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Passing,
    Failing,
    Flaky,
    /// Also covers any status the dashboard service reports beyond the known four.
    #[serde(other)]
    Stale,
}

impl OverallStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OverallStatus::Passing => "PASSING",
            OverallStatus::Failing => "FAILING",
            OverallStatus::Flaky => "FLAKY",
            OverallStatus::Stale => "STALE",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One job of a dashboard, flattened out of the summary document.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardJobRecord {
    pub name: String,
    pub overall_status: OverallStatus,
    pub diagnostic: String,
    pub test_names: Vec<String>,
}

impl DashboardJobRecord {
    /// Decodes one raw job entry.
    pub fn from_entry(name: String, entry: serde_json::Value) -> Result<Self, serde_json::Error> {
        let job: JobSummary = serde_json::from_value(entry)?;
        Ok(Self::from_summary(name, job))
    }

    pub fn from_summary(name: String, job: JobSummary) -> Self {
        Self {
            name,
            overall_status: job.overall_status,
            diagnostic: job.status,
            test_names: job.tests.into_iter().map(|t| t.test_name).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobCounts {
    pub passing: usize,
    pub failing: usize,
    pub flaky: usize,
    pub stale: usize,
    /// Entries that could not be decoded into a job.
    pub unparseable: usize,
}

impl JobCounts {
    pub fn tally<'a>(statuses: impl IntoIterator<Item = &'a OverallStatus>) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            match status {
                OverallStatus::Passing => counts.passing += 1,
                OverallStatus::Failing => counts.failing += 1,
                OverallStatus::Flaky => counts.flaky += 1,
                OverallStatus::Stale => counts.stale += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.passing + self.failing + self.flaky + self.stale + self.unparseable
    }

    /// Summary notes; the stale and unparseable lines only appear when nonzero.
    pub fn notes(&self) -> Vec<String> {
        let mut notes = vec![
            format!("{} jobs total", self.total()),
            format!("{} jobs passing", self.passing),
            format!("{} jobs flaky", self.flaky),
            format!("{} jobs failing", self.failing),
        ];
        if self.stale != 0 {
            notes.push(format!("{} jobs stale", self.stale));
        }
        if self.unparseable != 0 {
            notes.push(format!("{} jobs unparseable", self.unparseable));
        }
        notes
    }
}
