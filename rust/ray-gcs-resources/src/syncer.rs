// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Forwarding of node resource reports to the rest of the cluster.

use tokio::sync::broadcast;

use crate::rpc::ResourcesData;

/// Receives every resource report after the manager has applied it.
///
/// Implementations must not block; they run on the reporting task.
pub trait ResourceReportSyncer: Send + Sync {
    fn update(&self, data: &ResourcesData);
}

impl<F> ResourceReportSyncer for F
where
    F: Fn(&ResourcesData) + Send + Sync,
{
    fn update(&self, data: &ResourcesData) {
        self(data)
    }
}

/// Fans reports out to any number of subscribers over a broadcast channel.
///
/// Slow subscribers lag and lose the oldest reports rather than stalling
/// the reporting node.
pub struct BroadcastSyncer {
    sender: broadcast::Sender<ResourcesData>,
}

impl BroadcastSyncer {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ResourcesData> {
        self.sender.subscribe()
    }

    pub fn num_subscribers(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl ResourceReportSyncer for BroadcastSyncer {
    fn update(&self, data: &ResourcesData) {
        // No subscribers is not an error.
        let _ = self.sender.send(data.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ray_common::id::NodeID;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_broadcast_syncer_delivers_to_subscribers() {
        let syncer = BroadcastSyncer::new(16);
        let mut rx = syncer.subscribe();
        assert_eq!(syncer.num_subscribers(), 1);

        let data = ResourcesData {
            node_id: NodeID::from_random(),
            ..Default::default()
        };
        syncer.update(&data);
        assert_eq!(rx.recv().await.unwrap(), data);
    }

    #[test]
    fn test_broadcast_syncer_without_subscribers() {
        let syncer = BroadcastSyncer::new(4);
        syncer.update(&ResourcesData::default());
        assert_eq!(syncer.num_subscribers(), 0);
    }

    #[test]
    fn test_closure_syncer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let syncer = move |_: &ResourcesData| {
            c.fetch_add(1, Ordering::SeqCst);
        };
        syncer.update(&ResourcesData::default());
        syncer.update(&ResourcesData::default());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
