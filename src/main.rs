use std::num::NonZeroUsize;

use anyhow::{Context, Result};
use clap::Parser;
use tgp_ingest::{
    config::{self, Config},
    drive::GoogleDriveFolder,
    embedding::VoyageClient,
    logging,
    processing::{FileOutcome, IngestSettings, Ingestor},
    supabase::SupabaseStore,
};

#[derive(Parser)]
#[command(
    name = "tgp-ingest",
    about = "Ingest transcripts from a Drive folder into the Supabase chunk table"
)]
struct Cli {
    /// Drive folder to ingest instead of GOOGLE_DRIVE_FOLDER_ID.
    #[arg(long)]
    folder_id: Option<String>,
    /// Words per chunk instead of INGEST_WORDS_PER_CHUNK.
    #[arg(long)]
    words_per_chunk: Option<NonZeroUsize>,
    /// Chunks per embedding batch instead of INGEST_BATCH_SIZE.
    #[arg(long)]
    batch_size: Option<NonZeroUsize>,
    /// Print the final counters as JSON on stdout.
    #[arg(long)]
    summary_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::load_dotenv();
    logging::init_tracing();
    let mut config = Config::load().context("Failed to load configuration")?;
    apply_overrides(&mut config, &cli);

    let folder = GoogleDriveFolder::from_config(&config).context("Failed to set up Drive client")?;
    let embedder =
        VoyageClient::from_config(&config).context("Failed to set up embedding client")?;
    let store = SupabaseStore::from_config(&config).context("Failed to set up Supabase client")?;

    let ingestor = Ingestor::new(
        Box::new(folder),
        Box::new(embedder),
        Box::new(store),
        IngestSettings::from_config(&config),
    );
    let report = ingestor.run().await.context("Ingestion aborted")?;

    for file in &report.files {
        if let FileOutcome::Failed(reason) = &file.outcome {
            tracing::warn!(file = %file.file_name, %reason, "File not ingested");
        }
    }

    if cli.summary_json {
        let summary =
            serde_json::to_string_pretty(&report.metrics).context("Failed to encode summary")?;
        println!("{summary}");
    }
    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(folder_id) = &cli.folder_id {
        config.google_drive_folder_id = folder_id.clone();
    }
    if let Some(words_per_chunk) = cli.words_per_chunk {
        config.words_per_chunk = words_per_chunk.get();
    }
    if let Some(batch_size) = cli.batch_size {
        config.batch_size = batch_size.get();
    }
}
