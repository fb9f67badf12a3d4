use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::error::ReportError;
use crate::model::issue::IssueRecord;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectColumn {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectCard {
    pub id: u64,
    /// API URL of the linked issue or pull request. Absent for note cards.
    #[serde(default)]
    pub content_url: Option<String>,
}

/// One label search, paged by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueQuery {
    pub repo: String,
    pub label: String,
    pub per_page: u32,
    pub since: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait GithubApi: Send + Sync {
    async fn project_columns(&self, project_id: u64) -> Result<Vec<ProjectColumn>, ReportError>;
    async fn column_cards(&self, column_id: u64) -> Result<Vec<ProjectCard>, ReportError>;
    async fn issue_detail(&self, content_url: &str) -> Result<IssueRecord, ReportError>;
    /// One page (1-based) of open issues carrying `query.label`, most recently updated first.
    async fn search_issues(&self, query: &IssueQuery, page: u32) -> Result<Vec<IssueRecord>, ReportError>;
}

pub struct HttpGithub {
    api_base: String,
    token: String,
    client: reqwest::Client,
}

impl HttpGithub {
    pub fn new(api_base: &str, token: String, timeout: Option<Duration>) -> Result<Self, ReportError> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            client: builder.build()?,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ReportError> {
        tracing::debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl GithubApi for HttpGithub {
    async fn project_columns(&self, project_id: u64) -> Result<Vec<ProjectColumn>, ReportError> {
        let url = format!("{}/projects/{project_id}/columns", self.api_base);
        self.get_json(&url, &[("per_page", "100".to_string())]).await
    }

    async fn column_cards(&self, column_id: u64) -> Result<Vec<ProjectCard>, ReportError> {
        let url = format!("{}/projects/columns/{column_id}/cards", self.api_base);
        self.get_json(&url, &[("per_page", "100".to_string())]).await
    }

    async fn issue_detail(&self, content_url: &str) -> Result<IssueRecord, ReportError> {
        self.get_json(content_url, &[]).await
    }

    async fn search_issues(&self, query: &IssueQuery, page: u32) -> Result<Vec<IssueRecord>, ReportError> {
        let url = format!("{}/repos/{}/issues", self.api_base, query.repo);
        let mut params = vec![
            ("labels", query.label.clone()),
            ("state", "open".to_string()),
            ("sort", "updated".to_string()),
            ("per_page", query.per_page.to_string()),
            ("page", page.to_string()),
        ];
        if let Some(since) = query.since {
            params.push(("since", since.to_rfc3339()));
        }
        self.get_json(&url, &params).await
    }
}
