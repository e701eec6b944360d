// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! GCS table storage — typed wrappers over the raw store client.
//!
//! Replaces `src/ray/gcs/gcs_table_storage.h/cc`.
//!
//! Values are protobuf-encoded messages; keys are the hex encoding of the
//! binary ID they are indexed by.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use prost::Message;
use ray_common::constants::NODE_RESOURCE_TABLE;
use ray_common::id::NodeID;

use crate::rpc::ResourceMap;
use crate::store_client::{StoreClient, StoreError, StoreResult};

/// An ID type usable as a table key.
pub trait TableKey: Sized {
    fn to_key(&self) -> String;
    fn from_key(key: &str) -> Option<Self>;
}

impl TableKey for NodeID {
    fn to_key(&self) -> String {
        self.hex()
    }

    fn from_key(key: &str) -> Option<Self> {
        NodeID::from_hex(key)
    }
}

/// Generic typed table backed by a StoreClient.
pub struct GcsTable<K, V> {
    table_name: &'static str,
    store_client: Arc<dyn StoreClient>,
    _phantom: PhantomData<fn(K) -> V>,
}

impl<K: TableKey, V: Message + Default> GcsTable<K, V> {
    pub fn new(table_name: &'static str, store_client: Arc<dyn StoreClient>) -> Self {
        Self {
            table_name,
            store_client,
            _phantom: PhantomData,
        }
    }

    pub fn table_name(&self) -> &'static str {
        self.table_name
    }

    pub async fn put(&self, key: &K, value: &V) -> StoreResult<()> {
        self.store_client
            .put(self.table_name, &key.to_key(), value.encode_to_vec())
            .await
            .map(|_| ())
    }

    pub async fn get(&self, key: &K) -> StoreResult<Option<V>> {
        self.store_client
            .get(self.table_name, &key.to_key())
            .await?
            .map(|data| decode(&data))
            .transpose()
    }

    /// Get all entries in the table. Entries whose key does not parse as
    /// `K` are skipped with a warning.
    pub async fn get_all(&self) -> StoreResult<HashMap<K, V>>
    where
        K: Eq + std::hash::Hash,
    {
        let raw = self.store_client.get_all(self.table_name).await?;
        let mut result = HashMap::with_capacity(raw.len());
        for (key, data) in raw {
            match K::from_key(&key) {
                Some(id) => {
                    result.insert(id, decode(&data)?);
                }
                None => {
                    tracing::warn!(table = self.table_name, key = %key, "Skipping malformed table key");
                }
            }
        }
        Ok(result)
    }

    pub async fn delete(&self, key: &K) -> StoreResult<bool> {
        self.store_client.delete(self.table_name, &key.to_key()).await
    }
}

fn decode<V: Message + Default>(data: &[u8]) -> StoreResult<V> {
    V::decode(data).map_err(|e| StoreError::Internal(format!("protobuf decode error: {e}")))
}

/// The GCS tables used by the resource manager.
pub struct GcsTableStorage {
    store_client: Arc<dyn StoreClient>,
}

impl GcsTableStorage {
    pub fn new(store_client: Arc<dyn StoreClient>) -> Self {
        Self { store_client }
    }

    pub fn store_client(&self) -> &Arc<dyn StoreClient> {
        &self.store_client
    }

    /// Per-node resource capacity maps.
    pub fn node_resource_table(&self) -> GcsTable<NodeID, ResourceMap> {
        GcsTable::new(NODE_RESOURCE_TABLE, self.store_client.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::ResourceTableData;
    use crate::store_client::InMemoryStoreClient;

    fn resource_map(pairs: &[(&str, f64)]) -> ResourceMap {
        ResourceMap {
            items: pairs
                .iter()
                .map(|(k, v)| {
                    (
                        k.to_string(),
                        ResourceTableData {
                            resource_capacity: *v,
                        },
                    )
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_node_resource_table_put_get() {
        let storage = GcsTableStorage::new(Arc::new(InMemoryStoreClient::new()));
        let table = storage.node_resource_table();
        let node_id = NodeID::from_random();

        table.put(&node_id, &resource_map(&[("CPU", 4.0)])).await.unwrap();
        let retrieved = table.get(&node_id).await.unwrap().unwrap();
        assert_eq!(retrieved.items["CPU"].resource_capacity, 4.0);
        assert!(table.get(&NodeID::from_random()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_all_skips_malformed_keys() {
        let store = Arc::new(InMemoryStoreClient::new());
        let storage = GcsTableStorage::new(store.clone());
        let table = storage.node_resource_table();
        let n1 = NodeID::from_random();
        let n2 = NodeID::from_random();
        table.put(&n1, &resource_map(&[("CPU", 1.0)])).await.unwrap();
        table.put(&n2, &resource_map(&[("GPU", 2.0)])).await.unwrap();
        store
            .put(NODE_RESOURCE_TABLE, "not-a-node-id", Vec::new())
            .await
            .unwrap();

        let all = table.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[&n2].items["GPU"].resource_capacity, 2.0);
    }

    #[tokio::test]
    async fn test_decode_error_surfaces() {
        let store = Arc::new(InMemoryStoreClient::new());
        let storage = GcsTableStorage::new(store.clone());
        let node_id = NodeID::from_random();
        store
            .put(NODE_RESOURCE_TABLE, &node_id.hex(), vec![0xFF, 0xFF, 0xFF])
            .await
            .unwrap();
        let result = storage.node_resource_table().get(&node_id).await;
        assert!(matches!(result, Err(StoreError::Internal(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let storage = GcsTableStorage::new(Arc::new(InMemoryStoreClient::new()));
        let table = storage.node_resource_table();
        let node_id = NodeID::from_random();
        table.put(&node_id, &ResourceMap::default()).await.unwrap();
        assert!(table.delete(&node_id).await.unwrap());
        assert!(table.get(&node_id).await.unwrap().is_none());
    }
}
