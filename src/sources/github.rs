use async_trait::async_trait;
use chrono::{DateTime, Duration, Months, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{write_header, ReportSource};
use crate::clients::github::{GithubApi, IssueQuery};
use crate::config::GitHubConfig;
use crate::context::ReportContext;
use crate::error::ReportError;
use crate::model::issue::IssueRecord;
use crate::model::report::{ReportData, ReportDataField, ReportDataRecord};
use crate::scatter::scatter_gather;
use crate::theme::Theme;

pub const NAME: &str = "github";

const RESOLVED_COLUMN: &str = "Resolved";

/// A column of the CI signal project board.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardColumn {
    pub title: &'static str,
    pub id: u64,
    pub emoji: String,
    pub omit_when_short: bool,
}

pub fn board_columns(config: &GitHubConfig, resolved_id: u64, theme: &Theme) -> Vec<BoardColumn> {
    let emojis = &theme.emojis;
    vec![
        BoardColumn {
            title: "New/Not Yet Started",
            id: config.new_column_id,
            emoji: emojis.not_yet_started.clone(),
            omit_when_short: false,
        },
        BoardColumn {
            title: "In flight",
            id: config.in_flight_column_id,
            emoji: emojis.in_flight.clone(),
            omit_when_short: false,
        },
        BoardColumn {
            title: "Observing",
            id: config.observing_column_id,
            emoji: emojis.observing.clone(),
            omit_when_short: true,
        },
        BoardColumn {
            title: RESOLVED_COLUMN,
            id: resolved_id,
            emoji: emojis.resolved.clone(),
            omit_when_short: true,
        },
    ]
}

/// Drops issues carrying a denied label, and pull requests.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    deny: BTreeSet<String>,
}

impl IssueFilter {
    pub fn new(deny: impl IntoIterator<Item = String>) -> Self {
        Self {
            deny: deny.into_iter().collect(),
        }
    }

    pub fn retains(&self, issue: &IssueRecord) -> bool {
        !issue.is_pull_request() && !issue.label_names().any(|name| self.deny.contains(name))
    }
}

/// Turns a retained issue into a report record.
#[derive(Debug, Clone)]
pub struct IssueNotes {
    pub short: bool,
    pub now: DateTime<Utc>,
    pub theme: Arc<Theme>,
}

impl IssueNotes {
    pub fn from_context(ctx: &ReportContext) -> Self {
        Self {
            short: ctx.flags.short,
            now: ctx.now,
            theme: Arc::clone(&ctx.theme),
        }
    }

    pub fn record(&self, issue: &IssueRecord) -> ReportDataRecord {
        let mut notes = Vec::new();
        if !self.short {
            notes.extend(self.freshness(issue));
        }
        notes.extend(self.labels(issue));
        if !self.short {
            if let Some(milestone) = &issue.milestone {
                notes.push(format!("Milestone: {}", milestone.title));
            }
        }

        ReportDataRecord {
            id: issue.id,
            url: issue.url.clone(),
            title: issue.clean_title(),
            sig: issue.sig().unwrap_or_default(),
            notes,
            ..Default::default()
        }
    }

    fn freshness(&self, issue: &IssueRecord) -> Option<String> {
        let created = issue.created_at?;
        let updated = issue.updated_at?;
        Some(format!(
            "{}Created {}, {}Updated {}, Comments: {}",
            self.age_marker(created, Duration::days(3)),
            created.format("%Y-%m-%d"),
            self.age_marker(updated, Duration::days(2)),
            updated.format("%Y-%m-%d"),
            issue.comments
        ))
    }

    /// Old marker past one month, new marker within `fresh_within`, nothing in between.
    fn age_marker(&self, at: DateTime<Utc>, fresh_within: Duration) -> &str {
        let emojis = &self.theme.emojis;
        let stale_before = self.now.checked_sub_months(Months::new(1)).unwrap_or(self.now);
        if at < stale_before {
            &emojis.status_old
        } else if at > self.now - fresh_within {
            &emojis.status_new
        } else {
            ""
        }
    }

    fn labels(&self, issue: &IssueRecord) -> Option<String> {
        let palette = &self.theme.palette;
        let highlighted: Vec<String> = issue
            .label_names()
            .filter_map(|name| {
                if name.contains("priority") {
                    Some(palette.paint(palette.red, name))
                } else if name.contains("kind/") {
                    Some(palette.paint(palette.blue, name))
                } else {
                    None
                }
            })
            .collect();
        if highlighted.is_empty() {
            None
        } else {
            Some(format!("Labels: {}", highlighted.join(" ")))
        }
    }
}

/// Merges fetched pages by issue number; a later copy replaces an earlier one.
pub fn merge_issues(pages: impl IntoIterator<Item = Vec<IssueRecord>>) -> BTreeMap<u64, IssueRecord> {
    let mut merged = BTreeMap::new();
    for issue in pages.into_iter().flatten() {
        merged.insert(issue.id, issue);
    }
    merged
}

/// Requests pages 1, 2, ... until one comes back empty or `max_pages` is reached.
pub async fn fetch_all_pages(
    api: &dyn GithubApi,
    query: &IssueQuery,
    max_pages: Option<u32>,
) -> Result<Vec<IssueRecord>, ReportError> {
    let mut issues = Vec::new();
    let mut page = 1;
    loop {
        let batch = api.search_issues(query, page).await?;
        debug!(label = %query.label, page, count = batch.len(), "Fetched issue page");
        if batch.is_empty() {
            break;
        }
        issues.extend(batch);
        if max_pages.is_some_and(|max| page >= max) {
            break;
        }
        page += 1;
    }
    Ok(issues)
}

#[derive(Debug, Default)]
struct Collected {
    fields: Vec<ReportDataField>,
    failures: Vec<String>,
}

impl Collected {
    fn absorb(&mut self, what: String, err: ReportError) {
        warn!(sub_query = %what, error = %err, retryable = err.is_retryable(), "Sub-query failed");
        self.failures.push(format!("{what}: {err}"));
    }
}

pub struct GithubSource {
    api: Arc<dyn GithubApi>,
    config: GitHubConfig,
}

impl GithubSource {
    pub fn new(api: Arc<dyn GithubApi>, config: GitHubConfig) -> Self {
        Self { api, config }
    }

    async fn resolved_column_id(&self, project_id: u64) -> Result<u64, ReportError> {
        let columns = self.api.project_columns(project_id).await?;
        columns
            .into_iter()
            .filter(|c| c.name == RESOLVED_COLUMN)
            .map(|c| c.id)
            .min()
            .ok_or_else(|| {
                ReportError::ColumnNotFound(format!("{RESOLVED_COLUMN} (project {project_id})"))
            })
    }

    async fn board(
        &self,
        ctx: &ReportContext,
        filter: &Arc<IssueFilter>,
        notes: &IssueNotes,
    ) -> Result<Collected, ReportError> {
        let mut collected = Collected::default();
        let Some(project_id) = self.config.project_id else {
            return Ok(collected);
        };
        let resolved = self.resolved_column_id(project_id).await?;

        let columns: Vec<BoardColumn> = board_columns(&self.config, resolved, &ctx.theme)
            .into_iter()
            .filter(|c| !(c.omit_when_short && ctx.flags.short))
            .collect();
        let titles: Vec<&'static str> = columns.iter().map(|c| c.title).collect();

        let gathered = scatter_gather(columns, |column| {
            let api = Arc::clone(&self.api);
            let filter = Arc::clone(filter);
            let notes = notes.clone();
            async move { column_field(api, column, filter, notes).await }
        })
        .await;

        for (title, result) in titles.into_iter().zip(gathered.into_ordered()) {
            match result {
                Ok((field, failures)) => {
                    collected.fields.push(field);
                    collected.failures.extend(failures);
                }
                Err(err) => collected.absorb(format!("column {title}"), err),
            }
        }
        Ok(collected)
    }

    async fn labelled(
        &self,
        ctx: &ReportContext,
        filter: &Arc<IssueFilter>,
        notes: &IssueNotes,
    ) -> Collected {
        let mut collected = Collected::default();
        let since = self.config.since_days.map(|days| ctx.now - Duration::days(days));
        let queries: Vec<IssueQuery> = self
            .config
            .label_queries
            .iter()
            .map(|label| IssueQuery {
                repo: self.config.repo.clone(),
                label: label.clone(),
                per_page: self.config.per_page.max(1),
                since,
            })
            .collect();
        let labels: Vec<String> = queries.iter().map(|q| q.label.clone()).collect();
        let max_pages = self.config.max_pages;

        let gathered = scatter_gather(queries, |query| {
            let api = Arc::clone(&self.api);
            async move { fetch_all_pages(api.as_ref(), &query, max_pages).await }
        })
        .await;

        let mut pages = Vec::new();
        for (label, result) in labels.into_iter().zip(gathered.into_ordered()) {
            match result {
                Ok(issues) => pages.push(issues),
                Err(err) => collected.absorb(format!("label {label}"), err),
            }
        }

        let merged = merge_issues(pages);
        let found = merged.len();
        let retained: Vec<IssueRecord> = merged.into_values().filter(|i| filter.retains(i)).collect();
        debug!(found, retained = retained.len(), "Filtered labelled issues");

        let gathered = scatter_gather(retained, |issue| {
            let notes = notes.clone();
            async move {
                Ok::<_, ReportError>(ReportDataField {
                    records: vec![notes.record(&issue)],
                    ..Default::default()
                })
            }
        })
        .await;
        let (fields, failed) = gathered.split();
        collected.fields = fields;
        for err in failed {
            collected.absorb("issue record".to_string(), err);
        }
        collected
    }
}

async fn column_field(
    api: Arc<dyn GithubApi>,
    column: BoardColumn,
    filter: Arc<IssueFilter>,
    notes: IssueNotes,
) -> Result<(ReportDataField, Vec<String>), ReportError> {
    let cards = api.column_cards(column.id).await?;
    let urls: Vec<String> = cards
        .into_iter()
        .filter_map(|card| card.content_url)
        .filter(|url| !url.contains("pull"))
        .collect();

    let gathered = scatter_gather(urls.clone(), |url| {
        let api = Arc::clone(&api);
        async move { api.issue_detail(&url).await }
    })
    .await;

    let mut records = Vec::new();
    let mut failures = Vec::new();
    for (url, result) in urls.iter().zip(gathered.into_ordered()) {
        match result {
            Ok(issue) if filter.retains(&issue) => records.push(notes.record(&issue)),
            Ok(issue) => debug!(id = issue.id, column = column.title, "Issue filtered out"),
            Err(err) => {
                warn!(card = %url, error = %err, "Card issue request failed");
                failures.push(format!("card {url}: {err}"));
            }
        }
    }
    records.sort_by_key(|r| r.id);

    Ok((
        ReportDataField {
            emoji: column.emoji,
            title: column.title.to_string(),
            records,
        },
        failures,
    ))
}

#[async_trait]
impl ReportSource for GithubSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn request_data(&self, ctx: &ReportContext) -> Result<ReportData, ReportError> {
        let filter = Arc::new(IssueFilter::new(self.config.deny_labels.iter().cloned()));
        let notes = IssueNotes::from_context(ctx);

        let (board, labelled) = tokio::join!(
            self.board(ctx, &filter, &notes),
            self.labelled(ctx, &filter, &notes)
        );
        let board = board?;

        let mut fields = board.fields;
        fields.extend(labelled.fields);
        let mut failures = board.failures;
        failures.extend(labelled.failures);

        info!(fields = fields.len(), failures = failures.len(), "GitHub report assembled");
        Ok(ReportData::assemble(NAME, fields, failures))
    }

    fn render_text(&self, data: &ReportData, _ctx: &ReportContext) -> String {
        let mut out = String::new();
        let (columns, labelled): (Vec<&ReportDataField>, Vec<&ReportDataField>) =
            data.data.iter().partition(|f| !f.title.is_empty());

        for field in columns {
            write_header(&mut out, &field.emoji, &field.title.to_uppercase());
            write_by_sig(&mut out, field.records.iter());
        }
        if !labelled.is_empty() {
            write_header(&mut out, "", "OPEN ISSUES BY LABEL");
            write_by_sig(&mut out, labelled.iter().flat_map(|f| f.records.iter()));
        }
        out
    }
}

fn write_by_sig<'a>(out: &mut String, records: impl Iterator<Item = &'a ReportDataRecord>) {
    let mut by_sig: BTreeMap<&str, Vec<&ReportDataRecord>> = BTreeMap::new();
    for record in records {
        by_sig.entry(record.sig.as_str()).or_default().push(record);
    }
    for (sig, records) in by_sig {
        let sig = if sig.is_empty() { "none" } else { sig };
        out.push_str(&format!("SIG {sig}\n"));
        for record in records {
            out.push_str(&format!("- #{} {} {}\n", record.id, record.url, record.title));
            for note in &record.notes {
                out.push_str(&format!("  {note}\n"));
            }
        }
        out.push('\n');
    }
}
