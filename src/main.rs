use anyhow::Context;
use clap::{Parser, Subcommand};
use museum_etl::app::ports::Fetcher;
use museum_etl::config::{Config, DEFAULT_CONFIG_PATH};
use museum_etl::constants;
use museum_etl::document::Document;
use museum_etl::infra::http_client::ReqwestFetcher;
use museum_etl::infra::retry::RetryingFetcher;
use museum_etl::infra::sink::build_sink;
use museum_etl::locator::{locate, score};
use museum_etl::logging;
use museum_etl::pipeline::Pipeline;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "museum_etl")]
#[command(about = "Reconciles most-visited museums with city populations and infobox facts")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full extraction and reconciliation pipeline
    Run {
        /// Reconcile but do not write to the sink
        #[arg(long)]
        dry_run: bool,
        /// Also write the run report (records and failures) as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Show how the scored table locator ranks the tables of one page
    Locate {
        #[arg(long)]
        url: String,
        /// Class tokens to score against (comma-separated)
        #[arg(long, default_value = "infobox,geography,vcard")]
        tokens: String,
    },
}

fn build_fetcher(config: &Config) -> anyhow::Result<Arc<dyn Fetcher>> {
    let http = ReqwestFetcher::new(config.fetch.timeout(), &config.fetch.user_agent)
        .context("failed to build HTTP client")?;
    Ok(Arc::new(RetryingFetcher::new(http, config.fetch.retry_policy())))
}

async fn run(config: Config, dry_run: bool, report_path: Option<PathBuf>) -> anyhow::Result<()> {
    let fetcher = build_fetcher(&config)?;
    let pipeline = Pipeline::new(fetcher, config.sources.clone(), config.fetch.concurrency);
    let report = pipeline.run().await.context("pipeline run failed")?;

    println!("\n📊 Run {}:", report.run_id);
    println!("   Museums: {}", report.museums);
    println!("   Cities: {}", report.cities);
    println!("   Characteristics fetched: {}", report.characteristics_fetched);
    println!("   Populations backfilled: {}", report.backfilled_cities);
    println!("   Records kept: {}", report.records.len());
    println!("   Failures: {}", report.failures.len());
    for failure in &report.failures {
        println!("     - [{:?}] {}: {}", failure.stage, failure.key, failure.error);
    }

    if let Some(path) = report_path {
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    if dry_run {
        info!("Dry run, skipping sink");
        return Ok(());
    }

    let sink = build_sink(&config.sink);
    let written = sink
        .write(&report.records)
        .with_context(|| format!("{} sink write failed", sink.name()))?;
    println!("💾 Wrote {} records to the {} sink", written, sink.name());
    Ok(())
}

async fn locate_tables(config: Config, url: &str, tokens: &str) -> anyhow::Result<()> {
    let tokens: Vec<String> = tokens
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    let tokens = if tokens.is_empty() { constants::infobox_tokens() } else { tokens };

    let fetcher = build_fetcher(&config)?;
    let html = fetcher.fetch(url).await?;
    let document = Document::parse(&html);

    for (i, table) in document.tables.iter().enumerate() {
        println!(
            "#{:<3} score={} rows={:<4} class={:?}",
            i,
            score(table, &tokens),
            table.rows.len(),
            table.class.as_deref().unwrap_or("")
        );
    }

    let selected = locate(&document, &tokens)?;
    let position = document
        .tables
        .iter()
        .position(|t| std::ptr::eq(t, selected))
        .unwrap_or_default();
    println!("Selected table #{position}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _guard = logging::init_logging("logs");

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Run { dry_run, report } => run(config, dry_run, report).await,
        Commands::Locate { url, tokens } => locate_tables(config, &url, &tokens).await,
    }
}
