use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::sig;

/// An issue as returned by the tracker, either from a card's content URL or
/// from a label search.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IssueRecord {
    #[serde(rename = "number")]
    pub id: u64,
    #[serde(rename = "html_url")]
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub milestone: Option<Milestone>,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Milestone {
    pub title: String,
}

impl IssueRecord {
    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|l| l.name.as_str())
    }

    pub fn sig(&self) -> Option<String> {
        sig::sig_from_labels(self.label_names())
    }

    pub fn is_pull_request(&self) -> bool {
        self.url.contains("pull")
    }

    /// Title without the "[Failing Test]" prefix the issue template adds.
    pub fn clean_title(&self) -> String {
        self.title.replace("[Failing Test]", "").trim().to_string()
    }
}
