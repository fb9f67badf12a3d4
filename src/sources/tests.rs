use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::github::GithubSource;
use super::testgrid::TestgridSource;
use super::{create_sources, ReportSource};
use crate::cli::SourceKind;
use crate::clients::github::{GithubApi, IssueQuery, ProjectCard, ProjectColumn};
use crate::clients::testgrid::TestgridApi;
use crate::config::{AppConfig, GitHubConfig};
use crate::context::{OutputFlags, ReportContext};
use crate::error::ReportError;
use crate::model::dashboard::DashboardSummary;
use crate::model::issue::{IssueRecord, Label};
use crate::model::report::{RecordKind, Severity};

const NEW: u64 = 4212817;
const IN_FLIGHT: u64 = 4212819;
const OBSERVING: u64 = 4212821;

/// A tracker that serves canned columns, cards, issues and search pages.
#[derive(Default)]
struct MockGithub {
    columns: Vec<ProjectColumn>,
    cards: HashMap<u64, Vec<ProjectCard>>,
    issues: HashMap<String, IssueRecord>,
    pages: HashMap<String, Vec<Vec<IssueRecord>>>,
    failing_columns: HashSet<u64>,
    failing_labels: HashSet<String>,
    detail_calls: Arc<Mutex<Vec<String>>>,
    page_calls: Arc<Mutex<Vec<(String, u32)>>>,
}

impl MockGithub {
    fn with_board() -> Self {
        Self {
            columns: vec![
                column(NEW, "New"),
                column(900, "Resolved"),
                column(800, "Resolved"),
                column(IN_FLIGHT, "In flight"),
                column(OBSERVING, "Observing"),
            ],
            ..Default::default()
        }
    }

    fn card_issue(mut self, column_id: u64, issue: IssueRecord) -> Self {
        let url = content_url(issue.id);
        self.cards.entry(column_id).or_default().push(ProjectCard {
            id: issue.id,
            content_url: Some(url.clone()),
        });
        self.issues.insert(url, issue);
        self
    }

    fn card(mut self, column_id: u64, content_url: Option<&str>) -> Self {
        self.cards.entry(column_id).or_default().push(ProjectCard {
            id: 0,
            content_url: content_url.map(String::from),
        });
        self
    }

    fn label_pages(mut self, label: &str, pages: Vec<Vec<IssueRecord>>) -> Self {
        self.pages.insert(label.to_string(), pages);
        self
    }
}

#[async_trait]
impl GithubApi for MockGithub {
    async fn project_columns(&self, _project_id: u64) -> Result<Vec<ProjectColumn>, ReportError> {
        Ok(self.columns.clone())
    }

    async fn column_cards(&self, column_id: u64) -> Result<Vec<ProjectCard>, ReportError> {
        if self.failing_columns.contains(&column_id) {
            return Err(ReportError::Transport(format!("column {column_id} unreachable")));
        }
        Ok(self.cards.get(&column_id).cloned().unwrap_or_default())
    }

    async fn issue_detail(&self, content_url: &str) -> Result<IssueRecord, ReportError> {
        self.detail_calls.lock().unwrap().push(content_url.to_string());
        self.issues.get(content_url).cloned().ok_or_else(|| ReportError::Status {
            url: content_url.to_string(),
            status: 404,
        })
    }

    async fn search_issues(&self, query: &IssueQuery, page: u32) -> Result<Vec<IssueRecord>, ReportError> {
        self.page_calls.lock().unwrap().push((query.label.clone(), page));
        if self.failing_labels.contains(&query.label) {
            return Err(ReportError::Parse("unexpected end of input".into()));
        }
        Ok(self
            .pages
            .get(&query.label)
            .and_then(|pages| pages.get(page as usize - 1))
            .cloned()
            .unwrap_or_default())
    }
}

/// A dashboard service serving canned summaries; unknown dashboards 404.
#[derive(Default)]
struct MockTestgrid {
    summaries: HashMap<String, String>,
}

impl MockTestgrid {
    fn summary(mut self, dashboard: &str, json: &str) -> Self {
        self.summaries.insert(dashboard.to_string(), json.to_string());
        self
    }
}

#[async_trait]
impl TestgridApi for MockTestgrid {
    fn dashboard_url(&self, dashboard: &str) -> String {
        format!("https://testgrid.example/{dashboard}")
    }

    async fn dashboard_summary(&self, dashboard: &str) -> Result<DashboardSummary, ReportError> {
        let json = self.summaries.get(dashboard).ok_or_else(|| ReportError::Status {
            url: format!("{}/summary", self.dashboard_url(dashboard)),
            status: 404,
        })?;
        Ok(serde_json::from_str(json)?)
    }
}

fn column(id: u64, name: &str) -> ProjectColumn {
    ProjectColumn {
        id,
        name: name.to_string(),
    }
}

fn content_url(id: u64) -> String {
    format!("https://api.github.com/repos/kubernetes/kubernetes/issues/{id}")
}

fn issue(id: u64, labels: &[&str]) -> IssueRecord {
    IssueRecord {
        id,
        url: format!("https://github.com/kubernetes/kubernetes/issues/{id}"),
        title: format!("[Failing Test] job {id}"),
        labels: labels
            .iter()
            .map(|name| Label {
                name: name.to_string(),
                color: "ededed".into(),
            })
            .collect(),
        milestone: None,
        comments: 0,
        created_at: None,
        updated_at: None,
    }
}

fn board_only() -> GitHubConfig {
    GitHubConfig {
        project_id: Some(2093513),
        label_queries: vec![],
        ..Default::default()
    }
}

fn labels_only(labels: &[&str]) -> GitHubConfig {
    GitHubConfig {
        project_id: None,
        label_queries: labels.iter().map(|l| l.to_string()).collect(),
        ..Default::default()
    }
}

fn ctx(short: bool) -> ReportContext {
    ReportContext::new(
        OutputFlags {
            short,
            ..Default::default()
        },
        false,
    )
}

fn ids(records: &[crate::model::report::ReportDataRecord]) -> Vec<u64> {
    records.iter().map(|r| r.id).collect()
}

#[tokio::test]
async fn board_columns_in_order_with_lowest_resolved_id() {
    let mock = MockGithub::with_board()
        .card_issue(NEW, issue(3, &["sig/node", "kind/flake"]))
        .card_issue(NEW, issue(1, &["sig/cli"]))
        .card_issue(IN_FLIGHT, issue(2, &["sig/storage"]))
        .card_issue(800, issue(4, &[]))
        .card_issue(900, issue(5, &[]));
    let source = GithubSource::new(Arc::new(mock), board_only());

    let data = source.request_data(&ctx(false)).await.unwrap();

    let titles: Vec<&str> = data.data.iter().map(|f| f.title.as_str()).collect();
    assert_eq!(titles, vec!["New/Not Yet Started", "In flight", "Observing", "Resolved"]);
    assert_eq!(ids(&data.data[0].records), vec![1, 3]);
    assert_eq!(data.data[0].records[0].sig, "CLI");
    assert_eq!(data.data[0].records[0].title, "job 1");
    assert!(data.data[2].records.is_empty());
    assert_eq!(ids(&data.data[3].records), vec![4]);
    assert!(data.failures.is_empty());
    assert!(data.data.iter().flat_map(|f| &f.records).all(|r| r.kind == RecordKind::Detail));
}

#[tokio::test]
async fn pull_request_cards_are_never_fetched() {
    let pull = "https://api.github.com/repos/kubernetes/kubernetes/pulls/77";
    let mock = MockGithub::with_board()
        .card_issue(NEW, issue(1, &["kind/failing-test"]))
        .card(NEW, Some(pull))
        .card(NEW, None);
    let detail_calls = mock.detail_calls.clone();
    let source = GithubSource::new(Arc::new(mock), board_only());

    let data = source.request_data(&ctx(false)).await.unwrap();

    assert_eq!(ids(&data.data[0].records), vec![1]);
    assert_eq!(detail_calls.lock().unwrap().as_slice(), &[content_url(1)]);
}

#[tokio::test]
async fn denied_labels_are_filtered_from_cards() {
    let mock = MockGithub::with_board()
        .card_issue(NEW, issue(1, &["kind/flake", "lifecycle/stale"]))
        .card_issue(NEW, issue(2, &["kind/flake"]));
    let source = GithubSource::new(Arc::new(mock), board_only());

    let data = source.request_data(&ctx(false)).await.unwrap();

    assert_eq!(ids(&data.data[0].records), vec![2]);
}

#[tokio::test]
async fn missing_resolved_column_fails_the_source() {
    let mock = MockGithub {
        columns: vec![column(NEW, "New"), column(IN_FLIGHT, "In flight")],
        ..Default::default()
    };
    let source = GithubSource::new(Arc::new(mock), board_only());

    let result = source.request_data(&ctx(false)).await;

    assert!(matches!(result, Err(ReportError::ColumnNotFound(_))));
}

#[tokio::test]
async fn failing_column_is_absorbed() {
    let mut mock = MockGithub::with_board().card_issue(NEW, issue(1, &[]));
    mock.failing_columns.insert(IN_FLIGHT);
    let source = GithubSource::new(Arc::new(mock), board_only());

    let data = source.request_data(&ctx(false)).await.unwrap();

    let titles: Vec<&str> = data.data.iter().map(|f| f.title.as_str()).collect();
    assert_eq!(titles, vec!["New/Not Yet Started", "Observing", "Resolved"]);
    assert_eq!(data.failures.len(), 1);
    assert!(data.failures[0].starts_with("column In flight"));
}

#[tokio::test]
async fn missing_card_issue_is_absorbed() {
    let mock = MockGithub::with_board()
        .card_issue(NEW, issue(1, &[]))
        .card(NEW, Some("https://api.github.com/repos/kubernetes/kubernetes/issues/404"));
    let source = GithubSource::new(Arc::new(mock), board_only());

    let data = source.request_data(&ctx(false)).await.unwrap();

    assert_eq!(ids(&data.data[0].records), vec![1]);
    assert_eq!(data.failures.len(), 1);
    assert!(data.failures[0].contains("issues/404"));
}

#[tokio::test]
async fn short_mode_skips_observing_and_resolved() {
    let source = GithubSource::new(Arc::new(MockGithub::with_board()), board_only());

    let data = source.request_data(&ctx(true)).await.unwrap();

    let titles: Vec<&str> = data.data.iter().map(|f| f.title.as_str()).collect();
    assert_eq!(titles, vec!["New/Not Yet Started", "In flight"]);
}

#[tokio::test]
async fn label_queries_dedupe_across_pages_and_queries() {
    let mut pr = issue(12, &["kind/failing-test"]);
    pr.url = "https://github.com/kubernetes/kubernetes/pull/12".into();
    let mut newer = issue(1234, &["kind/flake", "sig/node"]);
    newer.comments = 7;

    let mock = MockGithub::default()
        .label_pages(
            "kind/flake",
            vec![
                vec![issue(1234, &["kind/flake"]), issue(10, &["kind/flake"])],
                vec![newer, issue(11, &["kind/flake", "triage/accepted"])],
            ],
        )
        .label_pages("kind/failing-test", vec![vec![issue(10, &["kind/failing-test"]), pr]]);
    let source = GithubSource::new(
        Arc::new(mock),
        labels_only(&["kind/flake", "kind/failing-test"]),
    );

    let data = source.request_data(&ctx(false)).await.unwrap();

    let records: Vec<_> = data.data.iter().flat_map(|f| f.records.iter()).collect();
    assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![10, 1234]);
    assert!(data.data.iter().all(|f| f.title.is_empty() && f.records.len() == 1));
    assert_eq!(records[1].sig, "Node");
    assert!(data.failures.is_empty());
}

#[tokio::test]
async fn paging_stops_at_first_empty_page() {
    let mock = MockGithub::default().label_pages(
        "kind/flake",
        vec![vec![issue(1, &[])], vec![issue(2, &[])]],
    );
    let page_calls = mock.page_calls.clone();
    let source = GithubSource::new(Arc::new(mock), labels_only(&["kind/flake"]));

    let data = source.request_data(&ctx(false)).await.unwrap();

    assert_eq!(data.data.len(), 2);
    let pages: Vec<u32> = page_calls.lock().unwrap().iter().map(|(_, p)| *p).collect();
    assert_eq!(pages, vec![1, 2, 3]);
}

#[tokio::test]
async fn max_pages_caps_paging() {
    let mock = MockGithub::default().label_pages(
        "kind/flake",
        vec![vec![issue(1, &[])], vec![issue(2, &[])]],
    );
    let page_calls = mock.page_calls.clone();
    let config = GitHubConfig {
        max_pages: Some(1),
        ..labels_only(&["kind/flake"])
    };
    let source = GithubSource::new(Arc::new(mock), config);

    let data = source.request_data(&ctx(false)).await.unwrap();

    assert_eq!(ids(&data.data[0].records), vec![1]);
    assert_eq!(page_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn failing_label_query_is_absorbed() {
    let mut mock = MockGithub::default().label_pages("kind/flake", vec![vec![issue(1, &[])]]);
    mock.failing_labels.insert("kind/failing-test".into());
    let source = GithubSource::new(
        Arc::new(mock),
        labels_only(&["kind/failing-test", "kind/flake"]),
    );

    let data = source.request_data(&ctx(false)).await.unwrap();

    assert_eq!(data.data.len(), 1);
    assert_eq!(data.failures.len(), 1);
    assert!(data.failures[0].starts_with("label kind/failing-test"));
}

#[tokio::test]
async fn github_text_groups_by_sig() {
    let mock = MockGithub::with_board()
        .card_issue(NEW, issue(2, &["sig/node"]))
        .card_issue(NEW, issue(1, &["sig/node"]))
        .card_issue(NEW, issue(3, &[]));
    let source = GithubSource::new(Arc::new(mock), board_only());
    let ctx = ctx(true);

    let data = source.request_data(&ctx).await.unwrap();
    let text = source.render_text(&data, &ctx);

    assert!(text.contains("NEW/NOT YET STARTED\n"));
    assert!(text.contains(
        "SIG Node\n- #1 https://github.com/kubernetes/kubernetes/issues/1 job 1\n- #2 https://github.com/kubernetes/kubernetes/issues/2 job 2\n"
    ));
    assert!(text.contains("SIG none\n- #3"));
}

const BLOCKING: &str = r#"{
    "jobA": {"overall_status": "FAILING", "status": "2 of 10 recent columns passed",
             "tests": [{"test_name": "[sig-node] Pods", "fail_count": 3}]},
    "jobB": {"overall_status": "PASSING", "status": "10 of 10"}
}"#;

#[tokio::test]
async fn dashboards_in_order_and_failures_absorbed() {
    let mock = MockTestgrid::default()
        .summary("sig-release-master-blocking", BLOCKING)
        .summary("sig-release-master-informing", r#"{"jobC": {"overall_status": "FLAKY", "status": "7 of 10"}}"#)
        .summary("sig-release-1.22-blocking", "{}");
    let source = TestgridSource::new(Arc::new(mock));
    let mut ctx = ctx(false);
    ctx.release_versions = vec!["1.22".into()];

    let data = source.request_data(&ctx).await.unwrap();

    let titles: Vec<&str> = data.data.iter().map(|f| f.title.as_str()).collect();
    assert_eq!(titles, vec!["Master-Blocking", "Master-Informing", "1.22-blocking"]);
    assert_eq!(data.failures.len(), 1);
    assert!(data.failures[0].starts_with("dashboard 1.22-informing"));

    let blocking = &data.data[0];
    assert_eq!(blocking.records[1].severity, Severity::High);
    assert_eq!(blocking.records[1].sig, "sig-node");
    assert_eq!(blocking.records[1].url, "https://testgrid.example/sig-release-master-blocking#jobA");
    assert_eq!(data.data[1].records[1].severity, Severity::Medium);
    assert_eq!(data.data[2].records[0].notes[0], "0 jobs total");
}

#[tokio::test]
async fn malformed_dashboard_json_is_absorbed() {
    let mock = MockTestgrid::default()
        .summary("sig-release-master-blocking", BLOCKING)
        .summary("sig-release-master-informing", "<html>oops</html>");
    let source = TestgridSource::new(Arc::new(mock));

    let data = source.request_data(&ctx(false)).await.unwrap();

    assert_eq!(data.data.len(), 1);
    assert!(data.failures[0].contains("Parse error"));
}

#[tokio::test]
async fn malformed_job_keeps_its_dashboard() {
    let mock = MockTestgrid::default()
        .summary(
            "sig-release-master-blocking",
            r#"{
                "jobA": {"overall_status": "FAILING", "status": "2 of 10 recent columns passed"},
                "jobB": {"overall_status": "FLAKY", "status": "7 of 10", "tests": null},
                "jobC": {"status": "7 of 10", "tests": [{"fail_count": 1}]}
            }"#,
        )
        .summary("sig-release-master-informing", "{}");
    let source = TestgridSource::new(Arc::new(mock));

    let data = source.request_data(&ctx(false)).await.unwrap();

    assert!(data.failures.is_empty());
    let blocking = &data.data[0];
    assert_eq!(
        blocking.records[0].notes,
        vec![
            "3 jobs total",
            "0 jobs passing",
            "1 jobs flaky",
            "1 jobs failing",
            "1 jobs unparseable"
        ]
    );
    let titles: Vec<&str> = blocking.records[1..].iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["jobA", "jobB", "jobC"]);
    assert_eq!(blocking.records[1].severity, Severity::High);
    assert_eq!(blocking.records[2].severity, Severity::Medium);
    assert_eq!(blocking.records[3].status, "UNPARSEABLE");
    assert!(blocking.records[3].notes[0].starts_with("Job entry unparseable"));
}

#[tokio::test]
async fn testgrid_text_without_emoji_shows_severity() {
    let mock = MockTestgrid::default()
        .summary("sig-release-master-blocking", BLOCKING)
        .summary("sig-release-master-informing", "{}");
    let source = TestgridSource::new(Arc::new(mock));
    let ctx = ReportContext::new(
        OutputFlags {
            emoji_off: true,
            ..Default::default()
        },
        false,
    );

    let data = source.request_data(&ctx).await.unwrap();
    let text = source.render_text(&data, &ctx);

    assert!(text.contains("\n\nTests in Master-Blocking\n- 2 jobs total\n"));
    assert!(text.contains("FAILING & FLAKY JOBS:"));
    assert!(text.contains("FAILING severity:3, jobA\n- https://testgrid.example/sig-release-master-blocking#jobA\n"));
}

#[test]
fn github_source_requires_a_token() {
    let mut ctx = ctx(false);
    ctx.only = Some(SourceKind::Github);
    let result = create_sources(&AppConfig::default(), &ctx);
    assert!(matches!(result, Err(ReportError::Config(_))));

    ctx.github_token = Some("t0ken".into());
    let sources = create_sources(&AppConfig::default(), &ctx).unwrap();
    assert_eq!(sources.iter().map(|s| s.name()).collect::<Vec<_>>(), vec!["github"]);
}

#[test]
fn testgrid_alone_needs_no_token() {
    let mut ctx = ctx(false);
    ctx.only = Some(SourceKind::Testgrid);
    let sources = create_sources(&AppConfig::default(), &ctx).unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].name(), "testgrid");
}
