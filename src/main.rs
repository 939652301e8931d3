use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cruce::api::{serve, AppState};
use cruce::jobs::{JobQueue, Worker};
use cruce::sources::SourceSet;
use cruce::storage::{InMemoryStore, PostgresStore, Storage};
use cruce::Config;

#[derive(Parser)]
#[command(name = "cruce")]
#[command(about = "Transaction reconciliation service", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API with an in-process worker, backed by Postgres
    Serve,
    /// Run a standalone worker that sweeps Postgres for pending rows
    Worker {
        /// Seconds between sweeps
        #[arg(long, default_value_t = 30)]
        interval: u64,
    },
    /// Run API and worker on an in-memory store, no database needed
    Dev,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "cruce=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Serve => {
            let storage = postgres_store(&config).await?;
            run_service(storage, &config).await
        }
        Commands::Worker { interval } => {
            let storage = postgres_store(&config).await?;
            let sources = SourceSet::from_config(&config)?;
            Worker::new(storage, sources)
                .run_polling(Duration::from_secs(interval))
                .await;
            Ok(())
        }
        Commands::Dev => {
            let storage: Arc<dyn Storage> = Arc::new(InMemoryStore::new());
            run_service(storage, &config).await
        }
    }
}

async fn postgres_store(config: &Config) -> Result<Arc<dyn Storage>> {
    let url = Config::require(&config.database_url, "DATABASE_URL")?;
    let store = PostgresStore::new(&url).await?;
    store.run_migrations().await?;
    Ok(Arc::new(store))
}

async fn run_service(storage: Arc<dyn Storage>, config: &Config) -> Result<()> {
    let sources = SourceSet::from_config(config)?;
    let (queue, jobs) = JobQueue::new();

    let worker = Worker::new(storage.clone(), sources);
    tokio::spawn(async move { worker.run(jobs).await });

    serve(AppState { storage, queue }, config.port).await
}
