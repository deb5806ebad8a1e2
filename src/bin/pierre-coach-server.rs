// ABOUTME: Server binary for the Pierre coaching stream service
// ABOUTME: Loads configuration, wires the records store and provider gateway, and serves HTTP
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Pierre Coach Server Binary
//!
//! Starts the coaching stream API. Configuration comes from the environment;
//! the flags below override individual values.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use pierre_coach_server::{
    config::environment::ServerConfig,
    llm::{CoachProvider, OpenAiCompatibleProvider},
    logging,
    resources::CoachResources,
    server,
    store::{InMemoryRecordsStore, RecordsStore},
};
use tracing::info;

#[derive(Parser)]
#[command(name = "pierre-coach-server")]
#[command(about = "Pierre Coach - streaming AI coaching over your recent fitness metrics")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// JSON file seeding the in-memory records store
    #[arg(long)]
    records: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if let Some(records) = args.records {
        config.records.seed_path = Some(records);
    }
    config.validate()?;

    info!("Starting Pierre Coach Server");
    info!("{}", config.summary());

    let store: Arc<dyn RecordsStore> = match config.records.seed_path.as_deref() {
        Some(path) => Arc::new(InMemoryRecordsStore::from_seed_file(path).await?),
        None => {
            info!("No records seed configured, starting with an empty store");
            Arc::new(InMemoryRecordsStore::new())
        }
    };

    let provider: Arc<dyn CoachProvider> =
        Arc::new(OpenAiCompatibleProvider::new(config.provider.clone())?);

    let port = config.http_port;
    let resources = Arc::new(CoachResources::new(Arc::new(config), store, provider));

    server::run(resources, port).await
}
