//! geoquery - ask questions about a city's map data in plain language.

use std::sync::Arc;

use anyhow::Context;
use geoquery::cli::{Cli, Command};
use geoquery::config::Config;
use geoquery::db::{DatabaseClient, MockDatabaseClient, PostgresStore};
use geoquery::llm::{build_system_instruction, create_client, QuerySession};
use geoquery::logging;
use geoquery::pipeline::Pipeline;
use geoquery::safety::SqlGate;
use geoquery::server;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let pipeline = Arc::new(build_pipeline(&cli, &config)?);

    match &cli.command {
        Command::Serve { .. } => {
            server::serve(pipeline, cli.bind_address(&config)).await?;
        }
        Command::Ask { question } => {
            let response = pipeline.run(question).await?;
            let payload =
                serde_json::to_string_pretty(&response).context("Failed to encode response")?;
            println!("{payload}");
        }
    }

    Ok(())
}

/// Wires the session, gate and store from CLI flags and config.
///
/// A missing API key is fatal here. Incomplete database credentials are only
/// warned about, since each request reports them on its own.
fn build_pipeline(cli: &Cli, config: &Config) -> anyhow::Result<Pipeline> {
    let provider = cli.provider(config)?;
    info!(provider = %provider, "Using LLM provider");

    let client =
        create_client(provider, &config.llm).context("Failed to initialize the LLM client")?;
    let instruction = build_system_instruction(&config.prompt);
    let session = QuerySession::create(client, instruction, config.llm.max_exchanges)?;

    let store: Arc<dyn DatabaseClient> = if cli.mock_db {
        info!("Using in-memory sample store");
        Arc::new(MockDatabaseClient::with_sample_data())
    } else {
        let connection = cli.resolve_connection(config)?;
        let missing = connection.missing_fields();
        if missing.is_empty() {
            info!("Database: {}", connection.display_string());
        } else {
            warn!(missing = ?missing, "Database connection details are incomplete");
        }
        Arc::new(PostgresStore::new(connection))
    };

    let gate = SqlGate::new(config.safety.multi_statement);

    Ok(Pipeline::new(session, store, gate, config.map))
}
