// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Bootstrap snapshot handed to the resource manager on startup.
//!
//! Replaces the resource-related part of `src/ray/gcs/gcs_server/gcs_init_data.h`.

use std::collections::HashMap;

use ray_common::id::NodeID;
use ray_common::status::RayResult;

use crate::rpc::{GcsNodeInfo, ResourceMap};
use crate::table_storage::GcsTableStorage;

#[derive(Debug, Clone, Default)]
pub struct GcsInitData {
    /// Every node known to membership, alive or dead.
    pub nodes: Vec<GcsNodeInfo>,
    /// Persisted capacity maps from the NodeResource table.
    pub cluster_resources: HashMap<NodeID, ResourceMap>,
}

impl GcsInitData {
    /// Read the NodeResource table and pair it with the given node list.
    pub async fn load(storage: &GcsTableStorage, nodes: Vec<GcsNodeInfo>) -> RayResult<Self> {
        let cluster_resources = storage.node_resource_table().get_all().await?;
        tracing::debug!(
            num_nodes = nodes.len(),
            num_resource_maps = cluster_resources.len(),
            "Loaded GCS init data"
        );
        Ok(Self {
            nodes,
            cluster_resources,
        })
    }
}
