// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Store client doubles for unit testing.
//!
//! `RecordingStoreClient` wraps the in-memory store and records every write
//! for inspection; `FailingStoreClient` fails every call.

use std::collections::HashMap;

use parking_lot::Mutex;
use ray_gcs_resources::store_client::{InMemoryStoreClient, StoreClient, StoreError, StoreResult};

/// A captured store write.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreRequest {
    Put {
        table: String,
        key: String,
        data: Vec<u8>,
    },
    Delete {
        table: String,
        key: String,
    },
}

/// An in-memory store client that records writes in the order they land.
#[derive(Default)]
pub struct RecordingStoreClient {
    inner: InMemoryStoreClient,
    requests: Mutex<Vec<StoreRequest>>,
}

impl RecordingStoreClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded writes, oldest first.
    pub fn requests(&self) -> Vec<StoreRequest> {
        self.requests.lock().clone()
    }

    /// Recorded puts into `table` as `(key, data)`, oldest first.
    pub fn puts(&self, table: &str) -> Vec<(String, Vec<u8>)> {
        self.requests
            .lock()
            .iter()
            .filter_map(|request| match request {
                StoreRequest::Put { table: t, key, data } if t == table => {
                    Some((key.clone(), data.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn num_requests(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait::async_trait]
impl StoreClient for RecordingStoreClient {
    async fn put(&self, table: &str, key: &str, data: Vec<u8>) -> StoreResult<bool> {
        self.requests.lock().push(StoreRequest::Put {
            table: table.to_string(),
            key: key.to_string(),
            data: data.clone(),
        });
        self.inner.put(table, key, data).await
    }

    async fn get(&self, table: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.inner.get(table, key).await
    }

    async fn get_all(&self, table: &str) -> StoreResult<HashMap<String, Vec<u8>>> {
        self.inner.get_all(table).await
    }

    async fn delete(&self, table: &str, key: &str) -> StoreResult<bool> {
        self.requests.lock().push(StoreRequest::Delete {
            table: table.to_string(),
            key: key.to_string(),
        });
        self.inner.delete(table, key).await
    }
}

/// A store client whose every call fails with `Unavailable`.
#[derive(Debug, Clone)]
pub struct FailingStoreClient {
    reason: String,
}

impl FailingStoreClient {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> StoreError {
        StoreError::Unavailable(self.reason.clone())
    }
}

#[async_trait::async_trait]
impl StoreClient for FailingStoreClient {
    async fn put(&self, _table: &str, _key: &str, _data: Vec<u8>) -> StoreResult<bool> {
        Err(self.error())
    }

    async fn get(&self, _table: &str, _key: &str) -> StoreResult<Option<Vec<u8>>> {
        Err(self.error())
    }

    async fn get_all(&self, _table: &str) -> StoreResult<HashMap<String, Vec<u8>>> {
        Err(self.error())
    }

    async fn delete(&self, _table: &str, _key: &str) -> StoreResult<bool> {
        Err(self.error())
    }
}
