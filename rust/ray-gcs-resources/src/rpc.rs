// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Messages exchanged with the resource manager.
//!
//! Mirrors the `ResourcesData`, `ResourceLoad`, `PlacementGroupLoad`,
//! `ResourceUsageBatchData` and `ResourceMap` messages of `gcs.proto`.
//! Fields that carry a `*_changed` flag on the wire are `Option`s here:
//! `Some` means the reporting node marked the field as changed.

use std::collections::HashMap;

use ray_common::id::{NodeID, PlacementGroupID};
use ray_common::scheduling::ResourceSet;
use serde::{Deserialize, Serialize};

/// Queued demand for one resource shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceDemand {
    /// The exact resource combination requested, e.g. `{CPU: 2}`.
    pub shape: HashMap<String, f64>,
    pub num_ready_requests_queued: i64,
    pub num_infeasible_requests_queued: i64,
    pub backlog_size: i64,
}

/// Demand broken down by resource shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLoad {
    pub resource_demands: Vec<ResourceDemand>,
}

/// Normal-task resources reported by a node, stamped by the node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalTaskResources {
    pub resources: HashMap<String, f64>,
    /// Monotonically increasing per node.
    pub timestamp: i64,
}

/// A heartbeat-style resource report from one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcesData {
    pub node_id: NodeID,
    /// Replaces the cached total only when non-empty.
    pub resources_total: HashMap<String, f64>,
    pub resources_available: Option<HashMap<String, f64>>,
    pub resource_load: Option<HashMap<String, f64>>,
    /// Always overwrites the cached value.
    pub resource_load_by_shape: ResourceLoad,
    pub resources_normal_task: Option<NormalTaskResources>,
    /// Always overwrites the cached value.
    pub cluster_full_of_actors_detected: bool,
}

/// The latest merged resource usage of one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeResourceUsage {
    pub node_id: NodeID,
    pub resources_total: HashMap<String, f64>,
    pub resources_available: HashMap<String, f64>,
    pub resource_load: HashMap<String, f64>,
    pub resource_load_by_shape: ResourceLoad,
    pub resources_normal_task: HashMap<String, f64>,
    pub resources_normal_task_timestamp: i64,
    pub cluster_full_of_actors_detected: bool,
}

impl From<&ResourcesData> for NodeResourceUsage {
    fn from(data: &ResourcesData) -> Self {
        let normal_task = data.resources_normal_task.clone().unwrap_or_default();
        Self {
            node_id: data.node_id,
            resources_total: data.resources_total.clone(),
            resources_available: data.resources_available.clone().unwrap_or_default(),
            resource_load: data.resource_load.clone().unwrap_or_default(),
            resource_load_by_shape: data.resource_load_by_shape.clone(),
            resources_normal_task: normal_task.resources,
            resources_normal_task_timestamp: normal_task.timestamp,
            cluster_full_of_actors_detected: data.cluster_full_of_actors_detected,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementStrategy {
    #[default]
    Pack,
    Spread,
    StrictPack,
    StrictSpread,
}

/// Pending resource demand of one placement group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementGroupDemand {
    pub placement_group_id: PlacementGroupID,
    pub strategy: PlacementStrategy,
    pub bundles: Vec<HashMap<String, f64>>,
}

/// Aggregate placement-group demand, replaced wholesale on each update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementGroupLoad {
    pub placement_group_data: Vec<PlacementGroupDemand>,
}

/// Reply payload of GetAllResourceUsage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsageBatchData {
    /// One entry per node that has reported usage.
    pub batch: Vec<NodeResourceUsage>,
    /// Demand summed across nodes, grouped by identical shape.
    pub resource_load_by_shape: ResourceLoad,
    pub placement_group_load: Option<PlacementGroupLoad>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    #[default]
    Alive,
    Dead,
}

/// The slice of node membership info the resource manager consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GcsNodeInfo {
    pub node_id: NodeID,
    pub state: NodeState,
    pub resources_total: HashMap<String, f64>,
}

impl GcsNodeInfo {
    pub fn is_alive(&self) -> bool {
        self.state == NodeState::Alive
    }
}

/// Capacity of one resource, as persisted in the NodeResource table.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ResourceTableData {
    #[prost(double, tag = "1")]
    pub resource_capacity: f64,
}

/// A node's full resource-name to capacity map, as persisted.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ResourceMap {
    #[prost(map = "string, message", tag = "1")]
    pub items: HashMap<String, ResourceTableData>,
}

impl ResourceMap {
    pub fn from_resource_set(resources: &ResourceSet) -> Self {
        Self {
            items: resources
                .iter()
                .map(|(name, amount)| {
                    (
                        name.to_string(),
                        ResourceTableData {
                            resource_capacity: amount.to_f64(),
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn capacities(&self) -> impl Iterator<Item = (&str, f64)> {
        self.items
            .iter()
            .map(|(name, data)| (name.as_str(), data.resource_capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_usage_from_partial_report() {
        let data = ResourcesData {
            node_id: NodeID::from_random(),
            resources_total: HashMap::from([("CPU".to_string(), 4.0)]),
            resources_normal_task: Some(NormalTaskResources {
                resources: HashMap::from([("CPU".to_string(), 1.0)]),
                timestamp: 7,
            }),
            ..Default::default()
        };
        let usage = NodeResourceUsage::from(&data);
        assert_eq!(usage.node_id, data.node_id);
        assert!(usage.resources_available.is_empty());
        assert_eq!(usage.resources_normal_task.get("CPU"), Some(&1.0));
        assert_eq!(usage.resources_normal_task_timestamp, 7);
    }

    #[test]
    fn test_resource_map_encoding() {
        let set = ResourceSet::from_map([("CPU", 6.0), ("memory", 100.0)]);
        let map = ResourceMap::from_resource_set(&set);
        let decoded = ResourceMap::decode(map.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.items["CPU"].resource_capacity, 6.0);
        assert_eq!(decoded.capacities().count(), 2);
    }

    #[test]
    fn test_report_serde_json() {
        let data = ResourcesData {
            node_id: NodeID::from_random(),
            resources_available: Some(HashMap::from([("GPU".to_string(), 0.5)])),
            ..Default::default()
        };
        let json = serde_json::to_string(&data).unwrap();
        let back: ResourcesData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
    }
}
