//! Asks one question against the ingested corpus: `ask <question...>`.

use std::env;
use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;

use pubmed_rag::{AppConfig, AppContext};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let query = env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        eprintln!("usage: ask <question>");
        return ExitCode::FAILURE;
    }

    let run = async {
        let config = AppConfig::from_env()?;
        let context = AppContext::from_config(&config).await?;
        let api_key = config.gemini_api_key.clone();
        context
            .orchestrator()
            .answer(&query, api_key.as_deref())
            .await
    };

    match run.await {
        Ok(result) => {
            println!("{}", result.answer);
            if !result.context.is_empty() {
                println!("\nSources:");
                for chunk in &result.context {
                    println!(
                        "  {} (PMID {}, distance {:.4})",
                        chunk.metadata.title, chunk.metadata.article_id, chunk.distance
                    );
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "query failed");
            ExitCode::FAILURE
        }
    }
}
