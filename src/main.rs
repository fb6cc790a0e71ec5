//! Skydeck - records API and feed proxy for the dashboard

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skydeck::{
    config::Args,
    db::MongoClient,
    records::{MemoryRecordStore, MongoRecordStore, RecordStore},
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("skydeck={},info", args.log_level).into());
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Skydeck - dashboard records API");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Frontend: {}", args.frontend_url);
    info!("MongoDB database: {}", args.mongodb_db);
    info!("======================================");

    // MongoDB is optional in dev mode
    let store: Arc<dyn RecordStore> = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(mongo) => Arc::new(MongoRecordStore::new(&mongo).await?),
        Err(e) if args.dev_mode => {
            warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
            Arc::new(MemoryRecordStore::new())
        }
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState::new(args, store)?);
    server::run(state).await?;

    Ok(())
}
