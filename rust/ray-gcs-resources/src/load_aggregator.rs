// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Cluster-wide demand aggregation for GetAllResourceUsage.

use std::collections::HashMap;

use ray_common::scheduling::ResourceSet;

use crate::node_usage::NodeUsageCache;
use crate::rpc::{
    NodeResourceUsage, PlacementGroupLoad, ResourceDemand, ResourceLoad, ResourceUsageBatchData,
};

/// Sum the per-node demand of every identical resource shape.
///
/// The fold is commutative and associative: the result does not depend on
/// the order nodes are visited in. Zero entries do not distinguish shapes and
/// are left out of the reported shape. Output demands are sorted by shape.
pub fn aggregate_resource_load<'a, I>(usages: I) -> ResourceLoad
where
    I: IntoIterator<Item = &'a NodeResourceUsage>,
{
    let mut aggregate: HashMap<ResourceSet, ResourceDemand> = HashMap::new();
    for usage in usages {
        for demand in &usage.resource_load_by_shape.resource_demands {
            let key = ResourceSet::from_map(demand.shape.iter().map(|(k, v)| (k.clone(), *v)));
            let entry = aggregate.entry(key).or_default();
            entry.num_ready_requests_queued += demand.num_ready_requests_queued;
            entry.num_infeasible_requests_queued += demand.num_infeasible_requests_queued;
            entry.backlog_size += demand.backlog_size;
        }
    }

    let mut resource_demands: Vec<(String, ResourceDemand)> = aggregate
        .into_iter()
        .map(|(key, mut demand)| {
            let shape = ResourceSet::from_map(
                key.iter()
                    .filter(|(_, v)| !v.is_zero())
                    .map(|(name, v)| (name, v.to_f64())),
            );
            demand.shape = shape.to_map();
            (shape.to_string(), demand)
        })
        .collect();
    resource_demands.sort_by(|a, b| a.0.cmp(&b.0));
    ResourceLoad {
        resource_demands: resource_demands.into_iter().map(|(_, d)| d).collect(),
    }
}

/// Build the GetAllResourceUsage reply, or `None` if no node has reported.
pub fn build_usage_batch(
    cache: &NodeUsageCache,
    placement_group_load: Option<&PlacementGroupLoad>,
) -> Option<ResourceUsageBatchData> {
    if cache.is_empty() {
        return None;
    }
    Some(ResourceUsageBatchData {
        batch: cache.values().cloned().collect(),
        resource_load_by_shape: aggregate_resource_load(cache.values()),
        placement_group_load: placement_group_load.cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::ResourcesData;
    use ray_common::id::NodeID;

    fn demand(shape: &[(&str, f64)], ready: i64, infeasible: i64, backlog: i64) -> ResourceDemand {
        ResourceDemand {
            shape: shape.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            num_ready_requests_queued: ready,
            num_infeasible_requests_queued: infeasible,
            backlog_size: backlog,
        }
    }

    fn usage(demands: Vec<ResourceDemand>) -> NodeResourceUsage {
        NodeResourceUsage {
            node_id: NodeID::from_random(),
            resource_load_by_shape: ResourceLoad {
                resource_demands: demands,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_identical_shapes_are_summed() {
        let a = usage(vec![demand(&[("CPU", 2.0)], 3, 1, 10)]);
        let b = usage(vec![demand(&[("CPU", 2.0)], 5, 0, 4)]);
        let load = aggregate_resource_load([&a, &b]);
        assert_eq!(load.resource_demands, vec![demand(&[("CPU", 2.0)], 8, 1, 14)]);
    }

    #[test]
    fn test_distinct_shapes_stay_separate() {
        let a = usage(vec![
            demand(&[("CPU", 1.0)], 1, 0, 0),
            demand(&[("CPU", 1.0), ("GPU", 1.0)], 2, 0, 0),
        ]);
        let b = usage(vec![demand(&[("CPU", 2.0)], 4, 0, 0)]);
        let load = aggregate_resource_load([&a, &b]);
        assert_eq!(load.resource_demands.len(), 3);
        let total_ready: i64 = load
            .resource_demands
            .iter()
            .map(|d| d.num_ready_requests_queued)
            .sum();
        assert_eq!(total_ready, 7);
    }

    #[test]
    fn test_order_independent() {
        let a = usage(vec![demand(&[("CPU", 1.0)], 1, 2, 3), demand(&[("GPU", 1.0)], 1, 0, 0)]);
        let b = usage(vec![demand(&[("GPU", 1.0)], 4, 0, 1)]);
        let c = usage(vec![demand(&[("CPU", 1.0)], 6, 0, 0)]);
        assert_eq!(
            aggregate_resource_load([&a, &b, &c]),
            aggregate_resource_load([&c, &a, &b])
        );
    }

    #[test]
    fn test_zero_entries_do_not_change_reported_shape() {
        let a = usage(vec![demand(&[("CPU", 1.0), ("GPU", 0.0)], 1, 0, 0)]);
        let b = usage(vec![demand(&[("CPU", 1.0)], 2, 0, 0)]);
        let c = usage(vec![demand(&[("CPU", 1.0), ("custom", 0.0)], 3, 0, 1)]);

        let expected = ResourceLoad {
            resource_demands: vec![demand(&[("CPU", 1.0)], 6, 0, 1)],
        };
        assert_eq!(aggregate_resource_load([&a, &b, &c]), expected);
        assert_eq!(aggregate_resource_load([&c, &a, &b]), expected);
        assert_eq!(aggregate_resource_load([&b, &c, &a]), expected);
    }

    #[test]
    fn test_build_usage_batch() {
        let mut cache = NodeUsageCache::new();
        assert!(build_usage_batch(&cache, None).is_none());

        for ready in [3, 5] {
            cache.update(&ResourcesData {
                node_id: NodeID::from_random(),
                resource_load_by_shape: ResourceLoad {
                    resource_demands: vec![demand(&[("CPU", 2.0)], ready, 0, 0)],
                },
                ..Default::default()
            });
        }
        let pg_load = PlacementGroupLoad::default();
        let batch = build_usage_batch(&cache, Some(&pg_load)).unwrap();
        assert_eq!(batch.batch.len(), 2);
        assert_eq!(batch.resource_load_by_shape.resource_demands.len(), 1);
        assert_eq!(
            batch.resource_load_by_shape.resource_demands[0].num_ready_requests_queued,
            8
        );
        assert_eq!(batch.placement_group_load, Some(pg_load));
    }
}
