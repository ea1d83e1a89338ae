use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use dashmap::DashMap;
use sea_orm::Database;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use ispbill::jobs::{EnforcementRunner, JobQueue};
use ispbill::routeros::ApiConnector;
use ispbill::scheduler::Scheduler;
use ispbill::server::ServerConfig;
use ispbill::sync::store::{ActivitySink, BillingStore, OrmStore};
use ispbill::sync::SyncEngine;
use ispbill::web::{self, AppState};

#[derive(Parser)]
#[command(name = "ispbill-server", about = "Billing backend with router reconciliation")]
struct Cli {
    /// Override LISTEN_ADDR from the environment.
    #[arg(long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = ServerConfig::from_env()?;
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }

    let db = Database::connect(&config.database_url).await?;
    let orm = Arc::new(OrmStore::new(db.clone()));
    let store: Arc<dyn BillingStore> = orm.clone();
    let audit: Arc<dyn ActivitySink> = orm;
    let connector = Arc::new(ApiConnector);

    let engine = Arc::new(SyncEngine::new(
        Arc::clone(&store),
        connector.clone(),
        config.encryption_key.clone(),
    ));
    let runner = Arc::new(EnforcementRunner::new(
        Arc::clone(&store),
        Arc::clone(&audit),
        connector,
        config.encryption_key.clone(),
    ));
    let queue = Arc::new(JobQueue::new());

    Arc::new(Scheduler::new(
        Arc::clone(&store),
        Arc::clone(&engine),
        Arc::clone(&queue),
        runner,
    ))
    .spawn();

    let state = Arc::new(AppState {
        db,
        encryption_key: config.encryption_key,
        store,
        audit,
        engine,
        queue,
        live_cache: DashMap::new(),
    });

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "server listening");
    axum::serve(listener, web::app(state))
        .with_graceful_shutdown(async {
            // Best effort; shutdown proceeds even if the handler fails to install.
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
