// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! GCS Resource Manager — tracks per-node resource capacity and usage.
//!
//! Replaces `src/ray/gcs/gcs_server/gcs_resource_manager.h/cc`.
//!
//! Three paths write into the per-node view: capacity edits
//! (UpdateResources / DeleteResources, persisted to the NodeResource table),
//! heartbeat usage reports, and scheduler acquire/release. All of them go
//! through one lock so readers always see a consistent snapshot.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use ray_common::config::RayConfig;
use ray_common::id::NodeID;
use ray_common::scheduling::{FixedPoint, ResourceSet};
use ray_common::scheduling_resources::SchedulingResources;
use ray_common::status::{RayError, RayResult};
use ray_stats::metric_defs::{
    GCS_NEW_RESOURCE_CREATION_LATENCY_MS, GCS_RESOURCE_MANAGER_REQUESTS, LATENCY_MS_BOUNDARIES,
    METHOD_TAG,
};
use ray_stats::{tags, Counter, Histogram, Tags};
use ray_util::time::Stopwatch;

use crate::init_data::GcsInitData;
use crate::load_aggregator::build_usage_batch;
use crate::node_usage::NodeUsageCache;
use crate::rpc::{GcsNodeInfo, PlacementGroupLoad, ResourceMap, ResourceUsageBatchData, ResourcesData};
use crate::syncer::ResourceReportSyncer;
use crate::table_storage::GcsTableStorage;

/// Callback invoked when a node's normal-task resources change.
///
/// Runs synchronously on the task that applied the change, after internal
/// locks are released. It must not block and must not call back into the
/// manager.
pub type ResourcesChangedListener = Box<dyn Fn() + Send + Sync>;

/// RPC-shaped operations counted for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountType {
    GetResources,
    GetAllAvailableResources,
    UpdateResources,
    DeleteResources,
    ReportResourceUsage,
    GetAllResourceUsage,
}

impl CountType {
    pub const ALL: [CountType; 6] = [
        CountType::GetResources,
        CountType::GetAllAvailableResources,
        CountType::UpdateResources,
        CountType::DeleteResources,
        CountType::ReportResourceUsage,
        CountType::GetAllResourceUsage,
    ];

    /// Value of the `Method` tag.
    pub fn method_name(self) -> &'static str {
        match self {
            CountType::GetResources => "GetResources",
            CountType::GetAllAvailableResources => "GetAllAvailableResources",
            CountType::UpdateResources => "UpdateResources",
            CountType::DeleteResources => "DeleteResources",
            CountType::ReportResourceUsage => "ReportResourceUsage",
            CountType::GetAllResourceUsage => "GetAllResourceUsage",
        }
    }

    fn tags(self) -> Tags {
        tags([(METHOD_TAG, self.method_name())])
    }
}

/// Everything guarded by the manager's state lock.
#[derive(Default)]
struct ResourceState {
    cluster_scheduling_resources: HashMap<NodeID, SchedulingResources>,
    node_resource_usages: NodeUsageCache,
    /// Last applied normal-task timestamp per node; absent means 0.
    latest_resources_normal_task_timestamp: HashMap<NodeID, i64>,
    placement_group_load: Option<PlacementGroupLoad>,
}

impl ResourceState {
    fn set_available(&mut self, node_id: &NodeID, available: ResourceSet) {
        match self.cluster_scheduling_resources.get_mut(node_id) {
            Some(resources) => resources.set_available(available),
            None => {
                tracing::warn!(?node_id, "Skip the setting of available resources as the node is dead");
            }
        }
    }

    /// Returns true if the node's normal-task resources were replaced.
    fn apply_normal_task_resources(&mut self, data: &ResourcesData) -> bool {
        let Some(normal_task) = &data.resources_normal_task else {
            return false;
        };
        let Some(resources) = self.cluster_scheduling_resources.get_mut(&data.node_id) else {
            return false;
        };
        let latest = self
            .latest_resources_normal_task_timestamp
            .get(&data.node_id)
            .copied()
            .unwrap_or(0);
        if normal_task.timestamp <= latest {
            return false;
        }
        let reported = to_resource_set(&normal_task.resources);
        if reported.is_equal(resources.normal_task()) {
            return false;
        }
        resources.set_normal_task(reported);
        self.latest_resources_normal_task_timestamp
            .insert(data.node_id, normal_task.timestamp);
        true
    }
}

fn to_resource_set(map: &HashMap<String, f64>) -> ResourceSet {
    ResourceSet::from_map(map.iter().map(|(name, amount)| (name.as_str(), *amount)))
}

fn node_not_exist() -> RayError {
    RayError::not_found("Node does not exist.")
}

/// The GCS resource manager: authoritative per-node resource registry.
pub struct GcsResourceManager {
    state: RwLock<ResourceState>,
    /// Serializes persisted writes per node, held across mutate and put.
    node_write_locks: DashMap<NodeID, Arc<tokio::sync::Mutex<()>>>,
    resources_changed_listeners: RwLock<Vec<ResourcesChangedListener>>,
    syncer: RwLock<Option<Arc<dyn ResourceReportSyncer>>>,
    table_storage: Arc<GcsTableStorage>,
    gcs_actor_scheduling_enabled: bool,
    request_counter: Counter,
    new_resource_creation_latency: Histogram,
}

impl GcsResourceManager {
    pub fn new(table_storage: Arc<GcsTableStorage>, config: &RayConfig) -> Self {
        Self {
            state: RwLock::new(ResourceState::default()),
            node_write_locks: DashMap::new(),
            resources_changed_listeners: RwLock::new(Vec::new()),
            syncer: RwLock::new(None),
            table_storage,
            gcs_actor_scheduling_enabled: config.gcs_actor_scheduling_enabled,
            request_counter: Counter::new(
                GCS_RESOURCE_MANAGER_REQUESTS,
                "Number of requests handled by the GCS resource manager",
            ),
            new_resource_creation_latency: Histogram::new(
                GCS_NEW_RESOURCE_CREATION_LATENCY_MS,
                "Time to persist a node's updated resources",
                LATENCY_MS_BOUNDARIES.to_vec(),
            ),
        }
    }

    /// Set the syncer that receives every resource report.
    pub fn set_syncer(&self, syncer: Arc<dyn ResourceReportSyncer>) {
        *self.syncer.write() = Some(syncer);
    }

    /// Rebuild state from the bootstrap snapshot.
    ///
    /// Alive nodes are registered first; persisted capacities then override
    /// the capacities of nodes that exist. Stored maps for unknown nodes are
    /// ignored.
    pub fn initialize(&self, init_data: &GcsInitData) {
        for node in init_data.nodes.iter().filter(|n| n.is_alive()) {
            self.on_node_add(node);
        }

        let mut state = self.state.write();
        for (node_id, resource_map) in &init_data.cluster_resources {
            let Some(resources) = state.cluster_scheduling_resources.get_mut(node_id) else {
                continue;
            };
            for (name, capacity) in resource_map.capacities() {
                resources.update_capacity(name, FixedPoint::from_f64(capacity));
            }
        }
        tracing::info!(
            num_nodes = state.cluster_scheduling_resources.len(),
            "Finished initializing GcsResourceManager"
        );
    }

    /// Register a node. The first registration wins.
    pub fn on_node_add(&self, node: &GcsNodeInfo) {
        let mut state = self.state.write();
        if state.cluster_scheduling_resources.contains_key(&node.node_id) {
            return;
        }
        state.cluster_scheduling_resources.insert(
            node.node_id,
            SchedulingResources::new(to_resource_set(&node.resources_total)),
        );
        tracing::debug!(node_id = ?node.node_id, "Node added to resource manager");
    }

    /// Forget everything about a node. Idempotent.
    pub fn on_node_dead(&self, node_id: &NodeID) {
        {
            let mut state = self.state.write();
            state.cluster_scheduling_resources.remove(node_id);
            state.node_resource_usages.remove(node_id);
            state.latest_resources_normal_task_timestamp.remove(node_id);
        }
        // A lock still held or awaited stays until its last writer releases it.
        self.node_write_locks
            .remove_if(node_id, |_, lock| Arc::strong_count(lock) == 1);
        tracing::debug!(?node_id, "Node removed from resource manager");
    }

    // ─── Read handlers ────────────────────────────────────────────────

    /// Handle GetResources RPC. Unknown nodes yield an empty map.
    pub fn handle_get_resources(&self, node_id: &NodeID) -> HashMap<String, f64> {
        self.increment_count(CountType::GetResources);
        self.state
            .read()
            .cluster_scheduling_resources
            .get(node_id)
            .map(|resources| resources.total().to_map())
            .unwrap_or_default()
    }

    /// Handle GetAllAvailableResources RPC.
    pub fn handle_get_all_available_resources(&self) -> Vec<(NodeID, HashMap<String, f64>)> {
        self.increment_count(CountType::GetAllAvailableResources);
        self.state
            .read()
            .cluster_scheduling_resources
            .iter()
            .map(|(node_id, resources)| (*node_id, resources.available().to_map()))
            .collect()
    }

    /// Handle GetAllResourceUsage RPC. `None` until some node has reported.
    pub fn handle_get_all_resource_usage(&self) -> Option<ResourceUsageBatchData> {
        self.increment_count(CountType::GetAllResourceUsage);
        let state = self.state.read();
        build_usage_batch(
            &state.node_resource_usages,
            state.placement_group_load.as_ref(),
        )
    }

    // ─── Write handlers ───────────────────────────────────────────────

    /// Handle UpdateResources RPC.
    pub async fn handle_update_resources(
        &self,
        node_id: &NodeID,
        changed_resources: &HashMap<String, f64>,
    ) -> RayResult<()> {
        self.increment_count(CountType::UpdateResources);
        self.update_resources(node_id, changed_resources).await
    }

    /// Handle DeleteResources RPC.
    pub async fn handle_delete_resources(
        &self,
        node_id: &NodeID,
        resource_names: &[String],
    ) -> RayResult<()> {
        self.increment_count(CountType::DeleteResources);
        self.delete_resources(node_id, resource_names).await
    }

    /// Handle ReportResourceUsage RPC.
    pub fn handle_report_resource_usage(&self, data: &ResourcesData) {
        self.increment_count(CountType::ReportResourceUsage);
        self.update_from_resource_report(data);
    }

    // ─── Capacity edits ───────────────────────────────────────────────

    /// Set the capacity of each given resource and persist the node's full
    /// resource map.
    ///
    /// Unknown nodes fail with NotFound after yielding to the runtime, with
    /// no mutation and no storage call.
    pub async fn update_resources(
        &self,
        node_id: &NodeID,
        changed_resources: &HashMap<String, f64>,
    ) -> RayResult<()> {
        tracing::debug!(?node_id, "Updating node resources");
        let stopwatch = Stopwatch::start();
        self.persist_node_resources(node_id, |resources| {
            for (name, capacity) in changed_resources {
                resources.update_capacity(name, FixedPoint::from_f64(*capacity));
            }
        })
        .await?;
        self.new_resource_creation_latency
            .record(&[], stopwatch.elapsed_ms_f64());
        tracing::debug!(?node_id, "Finished updating resources");
        Ok(())
    }

    /// Remove each named resource from the node and persist the reduced map.
    pub async fn delete_resources(&self, node_id: &NodeID, resource_names: &[String]) -> RayResult<()> {
        tracing::debug!(?node_id, "Deleting node resources");
        self.persist_node_resources(node_id, |resources| {
            for name in resource_names {
                resources.delete_resource(name);
            }
        })
        .await?;
        tracing::debug!(?node_id, "Finished deleting resources");
        Ok(())
    }

    /// Apply `mutate` to a node and write the resulting total to storage.
    ///
    /// The per-node write lock is held from mutation until the put
    /// completes, so storage sees writes in the order they were applied.
    async fn persist_node_resources<F>(&self, node_id: &NodeID, mutate: F) -> RayResult<()>
    where
        F: FnOnce(&mut SchedulingResources),
    {
        let known = self.state.read().cluster_scheduling_resources.contains_key(node_id);
        if !known {
            return self.fail_node_not_exist(node_id).await;
        }

        let write_lock = self.node_write_locks.entry(*node_id).or_default().clone();
        let result = {
            let _guard = write_lock.lock().await;
            self.mutate_and_put(node_id, mutate).await
        };
        self.remove_write_lock_if_dead(node_id, &write_lock);
        result
    }

    async fn mutate_and_put<F>(&self, node_id: &NodeID, mutate: F) -> RayResult<()>
    where
        F: FnOnce(&mut SchedulingResources),
    {
        let resource_map = {
            let mut state = self.state.write();
            match state.cluster_scheduling_resources.get_mut(node_id) {
                Some(resources) => {
                    mutate(resources);
                    ResourceMap::from_resource_set(resources.total())
                }
                // The node died while we waited for the write lock.
                None => return Err(node_not_exist()),
            }
        };

        if let Err(e) = self
            .table_storage
            .node_resource_table()
            .put(node_id, &resource_map)
            .await
        {
            tracing::error!(?node_id, error = %e, "Failed to persist node resources");
            return Err(e.into());
        }
        Ok(())
    }

    /// Drop the write lock of a node that died during a write, unless
    /// another writer still holds or awaits it.
    fn remove_write_lock_if_dead(&self, node_id: &NodeID, write_lock: &Arc<tokio::sync::Mutex<()>>) {
        let alive = self.state.read().cluster_scheduling_resources.contains_key(node_id);
        if alive {
            return;
        }
        // The map entry and `write_lock` are the only remaining references.
        self.node_write_locks.remove_if(node_id, |_, lock| {
            Arc::ptr_eq(lock, write_lock) && Arc::strong_count(lock) == 2
        });
    }

    async fn fail_node_not_exist(&self, node_id: &NodeID) -> RayResult<()> {
        tracing::error!(?node_id, "Failed to change resources as the node is not registered");
        tokio::task::yield_now().await;
        Err(node_not_exist())
    }

    // ─── In-memory edits ──────────────────────────────────────────────

    /// Replace a node's available resources. Unknown nodes are ignored.
    pub fn set_available_resources(&self, node_id: &NodeID, available: ResourceSet) {
        self.state.write().set_available(node_id, available);
    }

    /// Remove resources from a node without persisting. Unknown nodes are
    /// ignored.
    pub fn delete_resources_local(&self, node_id: &NodeID, resource_names: &[String]) {
        let mut state = self.state.write();
        match state.cluster_scheduling_resources.get_mut(node_id) {
            Some(resources) => {
                for name in resource_names {
                    resources.delete_resource(name);
                }
            }
            None => {
                tracing::warn!(?node_id, "Skip the deletion of resources as the node is dead");
            }
        }
    }

    /// Reserve resources on a node for scheduling.
    ///
    /// Returns true for unknown nodes; a dead node has nothing left to
    /// protect.
    pub fn acquire_resources(&self, node_id: &NodeID, required: &ResourceSet) -> bool {
        match self.state.write().cluster_scheduling_resources.get_mut(node_id) {
            Some(resources) => resources.acquire(required),
            None => true,
        }
    }

    /// Return previously acquired resources. Always succeeds.
    pub fn release_resources(&self, node_id: &NodeID, acquired: &ResourceSet) -> bool {
        if let Some(resources) = self.state.write().cluster_scheduling_resources.get_mut(node_id) {
            resources.release(acquired);
        }
        true
    }

    // ─── Heartbeats ───────────────────────────────────────────────────

    /// Apply a node's resource report.
    pub fn update_from_resource_report(&self, data: &ResourcesData) {
        let normal_task_changed = {
            let mut state = self.state.write();
            let changed = if self.gcs_actor_scheduling_enabled {
                state.apply_normal_task_resources(data)
            } else {
                let first_report = !state.node_resource_usages.contains(&data.node_id);
                if first_report || data.resources_available.is_some() {
                    let available = data
                        .resources_available
                        .as_ref()
                        .map(to_resource_set)
                        .unwrap_or_default();
                    state.set_available(&data.node_id, available);
                }
                false
            };
            state.node_resource_usages.update(data);
            changed
        };

        if normal_task_changed {
            self.notify_resources_changed();
        }

        let syncer = self.syncer.read().clone();
        if let Some(syncer) = syncer {
            syncer.update(data);
        }
    }

    /// Apply the normal-task resources carried by a report, if it is newer
    /// than the last one applied and actually changes them.
    pub fn update_node_normal_task_resources(&self, data: &ResourcesData) {
        let changed = self.state.write().apply_normal_task_resources(data);
        if changed {
            self.notify_resources_changed();
        }
    }

    pub fn add_resources_changed_listener(&self, listener: ResourcesChangedListener) {
        self.resources_changed_listeners.write().push(listener);
    }

    fn notify_resources_changed(&self) {
        for listener in self.resources_changed_listeners.read().iter() {
            listener();
        }
    }

    /// Replace the cluster's placement group load.
    pub fn update_placement_group_load(&self, placement_group_load: PlacementGroupLoad) {
        self.state.write().placement_group_load = Some(placement_group_load);
    }

    // ─── Accessors ────────────────────────────────────────────────────

    /// Snapshot of every node's scheduling resources.
    pub fn get_cluster_resources(&self) -> HashMap<NodeID, SchedulingResources> {
        self.state.read().cluster_scheduling_resources.clone()
    }

    pub fn get_node_resources(&self, node_id: &NodeID) -> Option<SchedulingResources> {
        self.state
            .read()
            .cluster_scheduling_resources
            .get(node_id)
            .cloned()
    }

    pub fn num_nodes(&self) -> usize {
        self.state.read().cluster_scheduling_resources.len()
    }

    fn increment_count(&self, count_type: CountType) {
        self.request_counter.increment(&count_type.tags());
    }

    pub fn request_count(&self, count_type: CountType) -> u64 {
        self.request_counter.get(&count_type.tags())
    }

    pub fn new_resource_creation_latency(&self) -> &Histogram {
        &self.new_resource_creation_latency
    }

    pub fn debug_string(&self) -> String {
        let mut out = String::from("GcsResourceManager: ");
        for count_type in CountType::ALL {
            let _ = write!(
                out,
                "\n- {} request count: {}",
                count_type.method_name(),
                self.request_count(count_type)
            );
        }
        out
    }

    /// Every tracked node with its scheduling resources, ordered by node id.
    pub fn cluster_resources_string(&self) -> String {
        let state = self.state.read();
        let mut nodes: Vec<_> = state.cluster_scheduling_resources.iter().collect();
        nodes.sort_by_key(|(node_id, _)| **node_id);

        let mut out = String::from("{\n");
        for (node_id, resources) in nodes {
            let _ = writeln!(out, "  {node_id} : {resources},");
        }
        out.push_str("}\n");
        out
    }
}
