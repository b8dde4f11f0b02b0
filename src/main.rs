use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use litmine::client::PaperRecord;
use litmine::mining::output::{read_collection, write_collection, write_enriched};
use litmine::mining::{Collector, Enricher};
use litmine::Config;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "litmine",
    version,
    about = "Collect and classify biomedical literature",
    long_about = "Collects records from PubMed, Europe PMC and Scopus into one CSV, then \
                  filters and enriches them with country, topic and laboratory signals"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// First publication year, inclusive
    #[arg(long, global = true)]
    year_start: Option<u16>,

    /// Last publication year, inclusive
    #[arg(long, global = true)]
    year_end: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every enabled source and write the merged table
    Collect {
        /// Output CSV (default from configuration)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Filter and enrich a collected table
    Classify {
        /// Collected CSV (default from configuration)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Output CSV (default from configuration)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Collect, then classify the collected file
    Run,
    /// Print the effective configuration as TOML
    Config,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }
        if self.json_logs {
            config.logging.format = "json".to_string();
        }
        if let Some(year) = self.year_start {
            config.search.year_start = year;
        }
        if let Some(year) = self.year_end {
            config.search.year_end = year;
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_target(false)
            .with_env_filter(filter)
            .init();
    }
}

async fn collect(config: &Config, path: &Path) -> Result<Vec<PaperRecord>> {
    let collector = Collector::from_config(config).context("failed to set up sources")?;
    if collector.is_empty() {
        info!("No sources enabled");
    }

    let collection = collector.collect().await;
    for outcome in &collection.outcomes {
        let status = match (&outcome.termination, &outcome.error) {
            (_, Some(e)) => format!("failed: {e}"),
            (Some(termination), None) => format!("{termination:?}"),
            (None, None) => "skipped".to_string(),
        };
        println!(
            "{:<8} {:>6} records  {:>4} pages  {:>8.1?}  {}",
            outcome.source, outcome.records, outcome.pages_fetched, outcome.elapsed, status
        );
    }

    write_collection(path, &collection.records)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("{} records written to {}", collection.records.len(), path.display());
    Ok(collection.records)
}

async fn classify(config: &Config, records: Vec<PaperRecord>, path: &Path) -> Result<()> {
    let enricher = Enricher::from_config(config).context("failed to set up classifier")?;
    let (enriched, summary) = enricher
        .enrich(records)
        .await
        .context("classification failed")?;

    write_enriched(path, &enriched)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!(
        "{} of {} records written to {} ({} excluded, {} duplicates)",
        summary.output,
        summary.input,
        path.display(),
        summary.excluded,
        summary.duplicates
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply_overrides(&mut config);
    config.validate().context("invalid configuration")?;

    init_tracing(&config);
    info!(
        "litmine {} (years {}-{})",
        env!("CARGO_PKG_VERSION"),
        config.search.year_start,
        config.search.year_end
    );

    match &cli.command {
        Commands::Collect { output } => {
            let path = output
                .clone()
                .unwrap_or_else(|| config.output.collection_path.clone());
            collect(&config, &path).await?;
        }
        Commands::Classify { input, output } => {
            let input = input
                .clone()
                .unwrap_or_else(|| config.output.collection_path.clone());
            let output = output
                .clone()
                .unwrap_or_else(|| config.output.classification_path.clone());
            let records = read_collection(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            classify(&config, records, &output).await?;
        }
        Commands::Run => {
            let collection_path = config.output.collection_path.clone();
            collect(&config, &collection_path).await?;
            let records = read_collection(&collection_path)
                .with_context(|| format!("failed to read {}", collection_path.display()))?;
            classify(&config, records, &config.output.classification_path).await?;
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
