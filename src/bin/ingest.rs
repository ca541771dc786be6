//! Runs one ingestion request: `ingest <term> [max_results]`.

use std::env;
use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;

use pubmed_rag::ingestion::IngestRequest;
use pubmed_rag::{AppConfig, AppContext};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = env::args().skip(1);
    let Some(term) = args.next() else {
        eprintln!("usage: ingest <term> [max_results]");
        return ExitCode::FAILURE;
    };
    let max_results = match args.next() {
        Some(raw) => match raw.parse::<usize>() {
            Ok(value) => value,
            Err(_) => {
                eprintln!("max_results must be a positive integer");
                return ExitCode::FAILURE;
            }
        },
        None => 10,
    };

    let run = async {
        let config = AppConfig::from_env()?;
        let context = AppContext::from_config(&config).await?;
        context
            .pipeline()
            .run(&IngestRequest { term, max_results })
            .await
    };

    match run.await {
        Ok(report) => {
            println!(
                "ingested {} new, {} already present, {} skipped, {} chunks written",
                report.inserted, report.already_present, report.skipped, report.chunks_written
            );
            if let Some(err) = report.chunk_write_error {
                eprintln!("warning: chunk write failed, stores are inconsistent: {err}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "ingestion failed");
            ExitCode::FAILURE
        }
    }
}
