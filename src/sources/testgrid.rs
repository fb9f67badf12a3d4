use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::{write_header, ReportSource};
use crate::clients::testgrid::TestgridApi;
use crate::context::ReportContext;
use crate::error::ReportError;
use crate::model::dashboard::{DashboardJobRecord, DashboardSummary, JobCounts, OverallStatus};
use crate::model::report::{RecordKind, ReportData, ReportDataField, ReportDataRecord, Severity};
use crate::scatter::scatter_gather;
use crate::severity;
use crate::sig;
use crate::theme::Theme;

pub const NAME: &str = "testgrid";

const UNPARSEABLE: &str = "UNPARSEABLE";

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    /// Name shown in the report, e.g. `Master-Blocking`.
    pub title: String,
    /// Name in dashboard URLs, e.g. `sig-release-master-blocking`.
    pub url_name: String,
    pub emoji: String,
}

/// Master dashboards, then a blocking/informing pair per release version.
pub fn dashboards(release_versions: &[String], theme: &Theme) -> Vec<Dashboard> {
    let blocking = &theme.emojis.master_blocking;
    let informing = &theme.emojis.master_informing;
    let mut dashboards = vec![
        Dashboard {
            title: "Master-Blocking".into(),
            url_name: "sig-release-master-blocking".into(),
            emoji: blocking.clone(),
        },
        Dashboard {
            title: "Master-Informing".into(),
            url_name: "sig-release-master-informing".into(),
            emoji: informing.clone(),
        },
    ];
    for version in release_versions {
        dashboards.push(Dashboard {
            title: format!("{version}-blocking"),
            url_name: format!("sig-release-{version}-blocking"),
            emoji: blocking.clone(),
        });
        dashboards.push(Dashboard {
            title: format!("{version}-informing"),
            url_name: format!("sig-release-{version}-informing"),
            emoji: informing.clone(),
        });
    }
    dashboards
}

pub fn summary_record(jobs: &[DashboardJobRecord], unparseable: usize) -> ReportDataRecord {
    let counts = JobCounts {
        unparseable,
        ..JobCounts::tally(jobs.iter().map(|j| &j.overall_status))
    };
    ReportDataRecord::summary(counts.notes())
}

/// Detail record for a job entry that could not be decoded.
pub fn unparseable_record(name: &str, dashboard_url: &str, err: &serde_json::Error) -> ReportDataRecord {
    ReportDataRecord {
        kind: RecordKind::Detail,
        url: format!("{dashboard_url}#{name}"),
        title: name.to_string(),
        notes: vec![format!("Job entry unparseable: {err}")],
        status: UNPARSEABLE.to_string(),
        severity: Severity::Light,
        ..Default::default()
    }
}

pub fn detail_record(job: &DashboardJobRecord, dashboard_url: &str, theme: &Theme) -> ReportDataRecord {
    let sigs: Vec<String> = sig::sigs_from_test_names(job.test_names.iter().map(String::as_str))
        .into_iter()
        .collect();
    let sig = sigs.join(", ");

    let mut notes = Vec::new();
    if !sigs.is_empty() {
        notes.push(format!("Sig's involved: {sig}"));
    }
    notes.push(format!("Currently {} tests are failing", job.test_names.len()));

    let classification = severity::classify(job.overall_status, &job.diagnostic, theme);
    match classification.recent {
        Some(recent) => notes.push(format!("{} of {} passed recently", recent.passes, recent.runs)),
        None => notes.push(format!("Recent runs unparseable: {:?}", job.diagnostic)),
    }

    ReportDataRecord {
        kind: RecordKind::Detail,
        url: format!("{dashboard_url}#{}", job.name),
        title: job.name.clone(),
        sig,
        notes,
        status: job.overall_status.to_string(),
        severity: classification.severity,
        highlight: classification.highlight,
        ..Default::default()
    }
}

/// Summary record first, then (unless short) one detail record per
/// non-passing or undecodable job ordered by job name.
pub fn dashboard_field(
    dashboard: Dashboard,
    dashboard_url: &str,
    summary: DashboardSummary,
    theme: &Theme,
    short: bool,
) -> ReportDataField {
    let mut jobs = Vec::new();
    let mut details = Vec::new();
    let mut unparseable = 0;
    for (name, entry) in summary {
        match DashboardJobRecord::from_entry(name.clone(), entry) {
            Ok(job) => {
                if job.overall_status != OverallStatus::Passing {
                    details.push(detail_record(&job, dashboard_url, theme));
                }
                jobs.push(job);
            }
            Err(err) => {
                warn!(dashboard = %dashboard.title, job = %name, error = %err, "Job entry unparseable");
                unparseable += 1;
                details.push(unparseable_record(&name, dashboard_url, &err));
            }
        }
    }

    let mut records = vec![summary_record(&jobs, unparseable)];
    if !short {
        records.extend(details);
    }

    ReportDataField {
        emoji: dashboard.emoji,
        title: dashboard.title,
        records,
    }
}

pub struct TestgridSource {
    api: Arc<dyn TestgridApi>,
}

impl TestgridSource {
    pub fn new(api: Arc<dyn TestgridApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ReportSource for TestgridSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn request_data(&self, ctx: &ReportContext) -> Result<ReportData, ReportError> {
        let dashboards = dashboards(&ctx.release_versions, &ctx.theme);
        let titles: Vec<String> = dashboards.iter().map(|d| d.title.clone()).collect();
        let short = ctx.flags.short;

        let gathered = scatter_gather(dashboards, |dashboard| {
            let api = Arc::clone(&self.api);
            let theme = Arc::clone(&ctx.theme);
            async move {
                let url = api.dashboard_url(&dashboard.url_name);
                let summary = api.dashboard_summary(&dashboard.url_name).await?;
                Ok::<_, ReportError>(dashboard_field(dashboard, &url, summary, &theme, short))
            }
        })
        .await;

        let mut fields = Vec::new();
        let mut failures = Vec::new();
        for (title, result) in titles.into_iter().zip(gathered.into_ordered()) {
            match result {
                Ok(field) => fields.push(field),
                Err(err) => {
                    warn!(dashboard = %title, error = %err, retryable = err.is_retryable(), "Dashboard request failed");
                    failures.push(format!("dashboard {title}: {err}"));
                }
            }
        }

        info!(dashboards = fields.len(), failures = failures.len(), "TestGrid report assembled");
        Ok(ReportData::assemble(NAME, fields, failures))
    }

    fn render_text(&self, data: &ReportData, ctx: &ReportContext) -> String {
        let mut out = String::new();
        for field in &data.data {
            for record in &field.records {
                match record.kind {
                    RecordKind::Summary => {
                        write_header(&mut out, &field.emoji, &format!("Tests in {}", field.title));
                        for note in &record.notes {
                            out.push_str(&format!("- {note}\n"));
                        }
                        out.push('\n');
                        if !ctx.flags.short {
                            out.push_str("\nFAILING & FLAKY JOBS:\n");
                        }
                    }
                    RecordKind::Detail => {
                        if ctx.flags.emoji_off {
                            out.push_str(&format!(
                                "{} severity:{}, {}\n",
                                record.status, record.severity, record.title
                            ));
                        } else {
                            out.push_str(&format!(
                                "{} {} {}\n",
                                record.status, record.highlight, record.title
                            ));
                        }
                        out.push_str(&format!("- {}\n", record.url));
                        for note in &record.notes {
                            out.push_str(&format!("- {note}\n"));
                        }
                    }
                }
            }
        }
        out
    }
}
