use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use resume_insights::{app, config, insights::ResumeInsights, logging};

#[derive(Parser)]
#[command(
    name = "ingest-blob",
    about = "Run the resume extraction pipeline for blobs already in the resumes container"
)]
struct Cli {
    /// Blob names inside the resumes container.
    #[arg(required = true)]
    blobs: Vec<String>,
    /// Print the grouped insights for each stored record.
    #[arg(long)]
    print: bool,
    /// Also append logs to this file; stdout only when omitted.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(logging::LogTarget::tool(cli.log_file.clone()));
    let config = config::init_config().context("Failed to load configuration")?;
    let ingest = app::build_ingest(config).context("Failed to build clients")?;
    ingest
        .records
        .ensure_schema()
        .await
        .context("Failed to prepare the record store")?;

    for blob in &cli.blobs {
        let record = ingest
            .service
            .ingest_blob(blob)
            .await
            .with_context(|| format!("Ingest failed for {blob}"))?;
        if cli.print {
            let body = ResumeInsights::from_record(record)
                .to_json_pretty()
                .context("Failed to encode insights")?;
            println!("{body}");
        } else {
            println!("{blob}: stored record {}", record.id);
        }
    }

    let snapshot = ingest.metrics.snapshot();
    tracing::info!(
        stored = snapshot.records_stored,
        degraded_summaries = snapshot.summaries_degraded,
        "Ingest run finished"
    );
    Ok(())
}
