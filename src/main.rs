mod cli;
mod clients;
mod config;
mod context;
mod error;
mod model;
mod render;
mod scatter;
mod severity;
mod sig;
mod sources;
mod theme;

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use context::ReportContext;
use sources::ReportSource;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    let config = config::load_config(cli.config.as_deref())?;
    let ctx = ReportContext::from_cli(&cli, &config, std::env::var(config::TOKEN_ENV).ok());
    let sources = sources::create_sources(&config, &ctx)?;

    // Every selected source runs concurrently; the report is rendered once all are done.
    let results =
        futures::future::join_all(sources.iter().map(|source| source.request_data(&ctx))).await;

    let mut rendered: Vec<(&dyn ReportSource, _)> = Vec::new();
    let mut failed = Vec::new();
    for (source, result) in sources.iter().zip(results) {
        match result {
            Ok(data) => rendered.push((source.as_ref(), data)),
            Err(err) => {
                tracing::error!(source = source.name(), error = %err, "Report failed");
                failed.push(format!("{}: {err}", source.name()));
            }
        }
    }

    print!("{}", render::render(&rendered, &ctx)?);

    if !failed.is_empty() {
        bail!("{} report(s) failed: {}", failed.len(), failed.join("; "));
    }
    Ok(())
}
