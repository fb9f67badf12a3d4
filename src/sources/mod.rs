pub mod github;
pub mod testgrid;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::SourceKind;
use crate::clients::github::HttpGithub;
use crate::clients::testgrid::HttpTestgrid;
use crate::config::{AppConfig, TOKEN_ENV};
use crate::context::ReportContext;
use crate::error::ReportError;
use crate::model::report::ReportData;

#[async_trait]
pub trait ReportSource: Send + Sync {
    fn name(&self) -> &str;
    /// Fetches, classifies and assembles everything this source reports.
    async fn request_data(&self, ctx: &ReportContext) -> Result<ReportData, ReportError>;
    fn render_text(&self, data: &ReportData, ctx: &ReportContext) -> String;
}

#[cfg(test)]
pub mod tests;

pub fn create_sources(
    config: &AppConfig,
    ctx: &ReportContext,
) -> Result<Vec<Box<dyn ReportSource>>, ReportError> {
    let mut sources: Vec<Box<dyn ReportSource>> = Vec::new();

    for kind in ctx.selected_sources() {
        match kind {
            SourceKind::Github => {
                let token = ctx.github_token.clone().ok_or_else(|| {
                    ReportError::Config(format!("{TOKEN_ENV} is required for the github report"))
                })?;
                let cfg = &config.github;
                let api = HttpGithub::new(&cfg.api_base, token, cfg.timeout_secs.map(Duration::from_secs))?;
                sources.push(Box::new(github::GithubSource::new(Arc::new(api), cfg.clone())));
            }
            SourceKind::Testgrid => {
                let cfg = &config.testgrid;
                let api = HttpTestgrid::new(&cfg.base_url, cfg.timeout_secs.map(Duration::from_secs))?;
                sources.push(Box::new(testgrid::TestgridSource::new(Arc::new(api))));
            }
        }
    }

    Ok(sources)
}

/// Section header: blank lines, then the emoji (if any) and the title.
pub(crate) fn write_header(out: &mut String, emoji: &str, title: &str) {
    if emoji.is_empty() {
        out.push_str(&format!("\n\n{title}\n"));
    } else {
        out.push_str(&format!("\n\n{emoji} {title}\n"));
    }
}
