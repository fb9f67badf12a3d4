use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const TOKEN_ENV: &str = "GITHUB_AUTH_TOKEN";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub github: GitHubConfig,
    pub testgrid: TestgridConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Overridden by `GITHUB_AUTH_TOKEN`.
    pub token: Option<String>,
    pub api_base: String,
    /// CI signal project board. No board section is reported when unset.
    pub project_id: Option<u64>,
    pub new_column_id: u64,
    pub in_flight_column_id: u64,
    pub observing_column_id: u64,
    /// `owner/name` searched by `label_queries`.
    pub repo: String,
    pub label_queries: Vec<String>,
    pub deny_labels: Vec<String>,
    pub per_page: u32,
    /// Stop paging after this many pages. Unbounded when unset.
    pub max_pages: Option<u32>,
    /// Only search issues updated within this many days.
    pub since_days: Option<i64>,
    pub timeout_secs: Option<u64>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: "https://api.github.com".into(),
            project_id: Some(2093513),
            new_column_id: 4212817,
            in_flight_column_id: 4212819,
            observing_column_id: 4212821,
            repo: "kubernetes/kubernetes".into(),
            label_queries: vec!["kind/failing-test".into(), "kind/flake".into()],
            deny_labels: vec![
                "priority/backlog".into(),
                "triage/accepted".into(),
                "lifecycle/rotten".into(),
                "lifecycle/stale".into(),
            ],
            per_page: 100,
            max_pages: None,
            since_days: None,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TestgridConfig {
    pub base_url: String,
    pub timeout_secs: Option<u64>,
}

impl Default for TestgridConfig {
    fn default() -> Self {
        Self {
            base_url: "https://testgrid.k8s.io".into(),
            timeout_secs: None,
        }
    }
}

fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ci-reporter")
        .join("config.toml")
}

/// Loads `explicit` if given (it must exist), otherwise the default config
/// file if present, otherwise built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = config_path();
            if !path.exists() {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(AppConfig::default());
            }
            path
        }
    };
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::debug!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Environment token first, then the config file's.
pub fn resolve_token(env_token: Option<String>, config: &GitHubConfig) -> Option<String> {
    env_token
        .or_else(|| config.token.clone())
        .filter(|t| !t.trim().is_empty())
}
