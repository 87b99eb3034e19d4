// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley serve` and `parley reprocess` command implementations.
//!
//! Opens the SQLite store, builds the sync pipeline over it, and either
//! starts the webhook gateway or replays one stored delivery.

use std::sync::Arc;

use tracing::info;

use parley_config::model::ParleyConfig;
use parley_core::{ParleyError, SyncStore};
use parley_gateway::GatewayState;
use parley_storage::SqliteSyncStore;
use parley_sync::SyncPipeline;

/// Runs the `parley serve` command: gateway in front, pipeline behind.
pub async fn run_serve(config: ParleyConfig) -> Result<(), ParleyError> {
    init_tracing(&config.service.log_level);
    info!(name = %config.service.name, "starting parley serve");

    let pipeline = open_pipeline(&config).await?;
    let state = GatewayState {
        pipeline: Arc::new(pipeline),
        channel: config.channel.clone(),
    };
    parley_gateway::start_server(&config.gateway, state).await
}

/// Runs the `parley reprocess <delivery-id>` command and prints the report.
pub async fn run_reprocess(config: ParleyConfig, delivery_id: &str) -> Result<(), ParleyError> {
    init_tracing(&config.service.log_level);

    let pipeline = open_pipeline(&config).await?;
    let report = pipeline.reprocess(delivery_id).await?;
    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|e| ParleyError::Internal(format!("report serialization failed: {e}")))?;
    println!("{rendered}");
    Ok(())
}

async fn open_pipeline(config: &ParleyConfig) -> Result<SyncPipeline, ParleyError> {
    let store: Arc<dyn SyncStore> = Arc::new(SqliteSyncStore::open(&config.storage).await?);
    Ok(SyncPipeline::new(store))
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
