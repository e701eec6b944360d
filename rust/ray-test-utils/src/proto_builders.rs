// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Message builders for resource manager tests.

use std::collections::HashMap;

use ray_common::id::NodeID;
use ray_gcs_resources::rpc::{
    GcsNodeInfo, NodeState, NormalTaskResources, ResourceDemand, ResourceLoad, ResourcesData,
};

/// Build a resource map from `(name, quantity)` pairs.
pub fn resource_map(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Generate an alive GcsNodeInfo with the given total resources.
pub fn gen_node_info(node_id: NodeID, total: &[(&str, f64)]) -> GcsNodeInfo {
    GcsNodeInfo {
        node_id,
        state: NodeState::Alive,
        resources_total: resource_map(total),
    }
}

/// Generate a dead GcsNodeInfo.
pub fn gen_dead_node_info(node_id: NodeID, total: &[(&str, f64)]) -> GcsNodeInfo {
    GcsNodeInfo {
        state: NodeState::Dead,
        ..gen_node_info(node_id, total)
    }
}

pub fn gen_resource_demand(
    shape: &[(&str, f64)],
    num_ready_requests_queued: i64,
    num_infeasible_requests_queued: i64,
    backlog_size: i64,
) -> ResourceDemand {
    ResourceDemand {
        shape: resource_map(shape),
        num_ready_requests_queued,
        num_infeasible_requests_queued,
        backlog_size,
    }
}

/// Builder for heartbeat resource reports. Nothing is marked as changed
/// unless set.
#[derive(Debug, Clone)]
pub struct ResourcesDataBuilder {
    data: ResourcesData,
}

impl ResourcesDataBuilder {
    pub fn new(node_id: NodeID) -> Self {
        Self {
            data: ResourcesData {
                node_id,
                ..Default::default()
            },
        }
    }

    pub fn total(mut self, total: &[(&str, f64)]) -> Self {
        self.data.resources_total = resource_map(total);
        self
    }

    pub fn available(mut self, available: &[(&str, f64)]) -> Self {
        self.data.resources_available = Some(resource_map(available));
        self
    }

    pub fn load(mut self, load: &[(&str, f64)]) -> Self {
        self.data.resource_load = Some(resource_map(load));
        self
    }

    pub fn demand(mut self, demand: ResourceDemand) -> Self {
        self.data.resource_load_by_shape.resource_demands.push(demand);
        self
    }

    pub fn load_by_shape(mut self, load: ResourceLoad) -> Self {
        self.data.resource_load_by_shape = load;
        self
    }

    pub fn normal_task(mut self, resources: &[(&str, f64)], timestamp: i64) -> Self {
        self.data.resources_normal_task = Some(NormalTaskResources {
            resources: resource_map(resources),
            timestamp,
        });
        self
    }

    pub fn cluster_full_of_actors(mut self, detected: bool) -> Self {
        self.data.cluster_full_of_actors_detected = detected;
        self
    }

    pub fn build(self) -> ResourcesData {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resources_data_builder() {
        let node_id = NodeID::from_random();
        let data = ResourcesDataBuilder::new(node_id)
            .total(&[("CPU", 4.0)])
            .available(&[("CPU", 2.0)])
            .demand(gen_resource_demand(&[("CPU", 1.0)], 1, 0, 2))
            .normal_task(&[("CPU", 1.0)], 3)
            .build();
        assert_eq!(data.node_id, node_id);
        assert_eq!(data.resources_available, Some(resource_map(&[("CPU", 2.0)])));
        assert!(data.resource_load.is_none());
        assert_eq!(data.resource_load_by_shape.resource_demands.len(), 1);
        assert_eq!(data.resources_normal_task.unwrap().timestamp, 3);
    }

    #[test]
    fn test_gen_node_info() {
        let node_id = NodeID::from_random();
        assert!(gen_node_info(node_id, &[("CPU", 1.0)]).is_alive());
        assert!(!gen_dead_node_info(node_id, &[]).is_alive());
    }
}
