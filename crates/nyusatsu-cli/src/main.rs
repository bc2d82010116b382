use anyhow::Result;
use clap::{Parser, Subcommand};
use nyusatsu_enrich::{EnrichConfig, EnrichmentPipeline, ExtractionClient, LlmConfig};
use nyusatsu_storage::{HttpClientConfig, HttpFetcher, TenderStore};
use nyusatsu_sync::SyncConfig;

#[derive(Debug, Parser)]
#[command(name = "nyusatsu")]
#[command(about = "Municipal design-tender aggregation pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one full aggregation pass over all enabled sources.
    Sync,
    /// Process one bounded batch of the enrichment backlog.
    Enrich,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Sync) {
        Commands::Sync => {
            let summary = nyusatsu_sync::run_sync_once_from_env().await?;
            for target in &summary.targets {
                match &target.error {
                    Some(error) => println!("{}: 0 records ({error})", target.source_id),
                    None => println!("{}: {} records", target.source_id, target.records),
                }
            }
            for (municipality, count) in &summary.municipality_tally {
                println!("{municipality}: {count}");
            }
            println!(
                "sync complete: run_id={} sources={} rows={} inserted={} merged={} total={}",
                summary.run_id,
                summary.enabled_sources,
                summary.scraped_rows,
                summary.inserted,
                summary.merged,
                summary.total_records
            );
        }
        Commands::Enrich => {
            let sync_config = SyncConfig::from_env();
            let store = TenderStore::new(sync_config.store_path);
            let http = HttpFetcher::new(HttpClientConfig {
                user_agent: Some(sync_config.user_agent),
                ..Default::default()
            })?;
            let extractor = ExtractionClient::new(LlmConfig::from_env())?;
            let pipeline = EnrichmentPipeline::new(
                store,
                http,
                Box::new(extractor),
                EnrichConfig::from_env(),
            );
            let summary = pipeline.run_batch().await?;
            println!(
                "enrich complete: attempted={} populated={} confirmed_empty={} deferred={}",
                summary.attempted, summary.populated, summary.confirmed_empty, summary.deferred
            );
        }
    }

    Ok(())
}
