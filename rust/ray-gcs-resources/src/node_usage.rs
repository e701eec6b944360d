// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Cache of the latest resource usage reported by every node.

use std::collections::HashMap;

use ray_common::id::NodeID;

use crate::rpc::{NodeResourceUsage, ResourcesData};

/// Latest merged usage report per node.
///
/// The first report for a node is stored as-is. Later reports are merged
/// field by field: change-tracked fields are only replaced when the report
/// carries them, while the load-by-shape and the actor-saturation flag are
/// always overwritten.
#[derive(Debug, Default)]
pub struct NodeUsageCache {
    usages: HashMap<NodeID, NodeResourceUsage>,
}

impl NodeUsageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, node_id: &NodeID) -> bool {
        self.usages.contains_key(node_id)
    }

    pub fn get(&self, node_id: &NodeID) -> Option<&NodeResourceUsage> {
        self.usages.get(node_id)
    }

    pub fn remove(&mut self, node_id: &NodeID) -> Option<NodeResourceUsage> {
        self.usages.remove(node_id)
    }

    pub fn is_empty(&self) -> bool {
        self.usages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.usages.len()
    }

    pub fn values(&self) -> impl Iterator<Item = &NodeResourceUsage> {
        self.usages.values()
    }

    /// Merge a report into the cache.
    pub fn update(&mut self, data: &ResourcesData) {
        let Some(usage) = self.usages.get_mut(&data.node_id) else {
            self.usages
                .insert(data.node_id, NodeResourceUsage::from(data));
            return;
        };

        if !data.resources_total.is_empty() {
            usage.resources_total = data.resources_total.clone();
        }
        if let Some(available) = &data.resources_available {
            usage.resources_available = available.clone();
        }
        if let Some(load) = &data.resource_load {
            usage.resource_load = load.clone();
        }
        if let Some(normal_task) = &data.resources_normal_task {
            usage.resources_normal_task = normal_task.resources.clone();
            usage.resources_normal_task_timestamp = normal_task.timestamp;
        }
        usage.resource_load_by_shape = data.resource_load_by_shape.clone();
        usage.cluster_full_of_actors_detected = data.cluster_full_of_actors_detected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{NormalTaskResources, ResourceDemand, ResourceLoad};

    fn map(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn full_report(node_id: NodeID) -> ResourcesData {
        ResourcesData {
            node_id,
            resources_total: map(&[("CPU", 8.0)]),
            resources_available: Some(map(&[("CPU", 6.0)])),
            resource_load: Some(map(&[("CPU", 2.0)])),
            resource_load_by_shape: ResourceLoad {
                resource_demands: vec![ResourceDemand {
                    shape: map(&[("CPU", 1.0)]),
                    num_ready_requests_queued: 2,
                    ..Default::default()
                }],
            },
            resources_normal_task: Some(NormalTaskResources {
                resources: map(&[("CPU", 1.0)]),
                timestamp: 1,
            }),
            cluster_full_of_actors_detected: true,
        }
    }

    #[test]
    fn test_first_report_stored_verbatim() {
        let mut cache = NodeUsageCache::new();
        let node_id = NodeID::from_random();
        let report = full_report(node_id);
        cache.update(&report);
        assert_eq!(cache.get(&node_id), Some(&NodeResourceUsage::from(&report)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_unchanged_fields_are_retained() {
        let mut cache = NodeUsageCache::new();
        let node_id = NodeID::from_random();
        cache.update(&full_report(node_id));

        cache.update(&ResourcesData {
            node_id,
            ..Default::default()
        });

        let usage = cache.get(&node_id).unwrap();
        assert_eq!(usage.resources_total, map(&[("CPU", 8.0)]));
        assert_eq!(usage.resources_available, map(&[("CPU", 6.0)]));
        assert_eq!(usage.resource_load, map(&[("CPU", 2.0)]));
        assert_eq!(usage.resources_normal_task, map(&[("CPU", 1.0)]));
        assert_eq!(usage.resources_normal_task_timestamp, 1);
        // Not change-tracked: always overwritten.
        assert!(usage.resource_load_by_shape.resource_demands.is_empty());
        assert!(!usage.cluster_full_of_actors_detected);
    }

    #[test]
    fn test_changed_fields_are_replaced() {
        let mut cache = NodeUsageCache::new();
        let node_id = NodeID::from_random();
        cache.update(&full_report(node_id));

        cache.update(&ResourcesData {
            node_id,
            resources_total: map(&[("CPU", 16.0)]),
            resources_available: Some(map(&[("CPU", 3.0)])),
            resources_normal_task: Some(NormalTaskResources {
                resources: HashMap::new(),
                timestamp: 5,
            }),
            ..Default::default()
        });

        let usage = cache.get(&node_id).unwrap();
        assert_eq!(usage.resources_total, map(&[("CPU", 16.0)]));
        assert_eq!(usage.resources_available, map(&[("CPU", 3.0)]));
        assert_eq!(usage.resource_load, map(&[("CPU", 2.0)]));
        assert!(usage.resources_normal_task.is_empty());
        assert_eq!(usage.resources_normal_task_timestamp, 5);
    }

    #[test]
    fn test_remove() {
        let mut cache = NodeUsageCache::new();
        let node_id = NodeID::from_random();
        cache.update(&full_report(node_id));
        assert!(cache.remove(&node_id).is_some());
        assert!(cache.is_empty());
        assert!(cache.remove(&node_id).is_none());
    }
}
