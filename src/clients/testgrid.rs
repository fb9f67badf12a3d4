use async_trait::async_trait;
use std::time::Duration;

use crate::error::ReportError;
use crate::model::dashboard::DashboardSummary;

#[async_trait]
pub trait TestgridApi: Send + Sync {
    /// Browser URL of a dashboard, used as the base for job links.
    fn dashboard_url(&self, dashboard: &str) -> String;
    async fn dashboard_summary(&self, dashboard: &str) -> Result<DashboardSummary, ReportError>;
}

pub struct HttpTestgrid {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTestgrid {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ReportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl TestgridApi for HttpTestgrid {
    fn dashboard_url(&self, dashboard: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(dashboard))
    }

    async fn dashboard_summary(&self, dashboard: &str) -> Result<DashboardSummary, ReportError> {
        let url = format!("{}/summary", self.dashboard_url(dashboard));
        tracing::debug!(url = %url, "GET");
        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
