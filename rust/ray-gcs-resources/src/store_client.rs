// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Store client abstraction — persistence layer for GCS tables.
//!
//! Replaces `src/ray/gcs/store_client/`. The resource manager only needs
//! table-scoped get/put/delete; the storage engine behind it is pluggable.

use std::collections::HashMap;

use dashmap::DashMap;
use ray_common::status::RayError;
use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found")]
    NotFound,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for RayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => RayError::not_found(err.to_string()),
            StoreError::Unavailable(_) | StoreError::Internal(_) => {
                RayError::io_error(err.to_string())
            }
        }
    }
}

/// Async key-value operations organized by table.
///
/// Tables are logical namespaces (e.g. "NodeResource"); each is an
/// independent key-value map.
#[async_trait::async_trait]
pub trait StoreClient: Send + Sync {
    /// Put a key-value pair. Returns true if the key already existed.
    async fn put(&self, table: &str, key: &str, data: Vec<u8>) -> StoreResult<bool>;

    async fn get(&self, table: &str, key: &str) -> StoreResult<Option<Vec<u8>>>;

    async fn get_all(&self, table: &str) -> StoreResult<HashMap<String, Vec<u8>>>;

    /// Delete a key. Returns true if the key existed.
    async fn delete(&self, table: &str, key: &str) -> StoreResult<bool>;
}

/// Thread-safe in-memory store client for non-HA deployments and tests.
#[derive(Default)]
pub struct InMemoryStoreClient {
    /// Table name → (key → value).
    tables: DashMap<String, DashMap<String, Vec<u8>>>,
}

impl InMemoryStoreClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StoreClient for InMemoryStoreClient {
    async fn put(&self, table: &str, key: &str, data: Vec<u8>) -> StoreResult<bool> {
        let tbl = self.tables.entry(table.to_string()).or_default();
        Ok(tbl.insert(key.to_string(), data).is_some())
    }

    async fn get(&self, table: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self
            .tables
            .get(table)
            .and_then(|tbl| tbl.get(key).map(|v| v.value().clone())))
    }

    async fn get_all(&self, table: &str) -> StoreResult<HashMap<String, Vec<u8>>> {
        Ok(self
            .tables
            .get(table)
            .map(|tbl| {
                tbl.iter()
                    .map(|e| (e.key().clone(), e.value().clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, table: &str, key: &str) -> StoreResult<bool> {
        Ok(self
            .tables
            .get(table)
            .map(|tbl| tbl.remove(key).is_some())
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_overwrite() {
        let store = InMemoryStoreClient::new();
        assert!(!store.put("NodeResource", "n1", vec![1]).await.unwrap());
        assert!(store.put("NodeResource", "n1", vec![2]).await.unwrap());
        assert_eq!(store.get("NodeResource", "n1").await.unwrap(), Some(vec![2]));
        assert_eq!(store.get("NodeResource", "n2").await.unwrap(), None);
        assert_eq!(store.get("Other", "n1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_all_and_delete() {
        let store = InMemoryStoreClient::new();
        store.put("T", "a", vec![1]).await.unwrap();
        store.put("T", "b", vec![2]).await.unwrap();
        assert_eq!(store.get_all("T").await.unwrap().len(), 2);
        assert!(store.get_all("Missing").await.unwrap().is_empty());

        assert!(store.delete("T", "a").await.unwrap());
        assert!(!store.delete("T", "a").await.unwrap());
        assert!(!store.delete("Missing", "a").await.unwrap());
        assert_eq!(store.get_all("T").await.unwrap().len(), 1);
    }

    #[test]
    fn test_store_error_into_ray_error() {
        assert!(RayError::from(StoreError::NotFound).is_not_found());
        let err = RayError::from(StoreError::Unavailable("redis down".into()));
        assert!(err.is_io_error());
        assert!(err.message.contains("redis down"));
    }
}
