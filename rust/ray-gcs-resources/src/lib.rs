// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! GCS resource manager for Ray.
//!
//! Replaces the resource-tracking part of `src/ray/gcs/gcs_server/`: the
//! authoritative registry of per-node resources, the cache of node usage
//! reports, cluster-wide demand aggregation, and persistence of node
//! capacities to the NodeResource table.

pub mod init_data;
pub mod load_aggregator;
pub mod node_usage;
pub mod resource_manager;
pub mod rpc;
pub mod store_client;
pub mod syncer;
pub mod table_storage;

pub use resource_manager::{CountType, GcsResourceManager};
