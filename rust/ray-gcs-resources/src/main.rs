// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! GCS resource manager binary entry point.
//!
//! Runs the resource manager over in-memory storage and periodically dumps
//! its debug state until interrupted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ray_common::config::RayConfig;
use ray_gcs_resources::init_data::GcsInitData;
use ray_gcs_resources::store_client::InMemoryStoreClient;
use ray_gcs_resources::syncer::BroadcastSyncer;
use ray_gcs_resources::table_storage::GcsTableStorage;
use ray_gcs_resources::GcsResourceManager;

/// Capacity of the resource report broadcast channel.
const SYNCER_CHANNEL_CAPACITY: usize = 1024;

#[derive(Parser, Debug)]
#[command(name = "gcs_resource_manager", about = "Ray GCS resource manager (Rust)")]
struct Args {
    /// Log directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Base64-encoded Ray config
    #[arg(long)]
    config_list: Option<String>,

    /// Log verbosity (0 = info, 1 = debug, 2+ = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    ray_util::logging::init_ray_logging(
        "gcs_resource_manager",
        args.log_dir.as_deref(),
        i32::from(args.verbose),
    )
    .context("failed to initialize logging")?;

    let ray_config = match &args.config_list {
        Some(b64) => RayConfig::from_base64_json(b64).context("invalid --config-list")?,
        None => {
            let mut config = RayConfig::default();
            config.apply_env_overrides();
            config
        }
    };
    tracing::info!(?ray_config, "Starting GCS resource manager");

    let table_storage = Arc::new(GcsTableStorage::new(Arc::new(InMemoryStoreClient::new())));
    let init_data = GcsInitData::load(&table_storage, Vec::new())
        .await
        .context("failed to load GCS init data")?;

    let manager = Arc::new(GcsResourceManager::new(table_storage, &ray_config));
    manager.initialize(&init_data);

    let syncer = Arc::new(BroadcastSyncer::new(SYNCER_CHANNEL_CAPACITY));
    manager.set_syncer(syncer.clone());
    let mut reports = syncer.subscribe();
    tokio::spawn(async move {
        while let Ok(report) = reports.recv().await {
            tracing::trace!(node_id = ?report.node_id, "Resource report synced");
        }
    });

    if ray_config.debug_dump_period_milliseconds > 0 {
        let manager = Arc::clone(&manager);
        let period = Duration::from_millis(ray_config.debug_dump_period_milliseconds);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                tracing::info!("{}", manager.debug_string());
                tracing::debug!("Cluster resources: {}", manager.cluster_resources_string());
            }
        });
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutting down GCS resource manager");
    Ok(())
}
