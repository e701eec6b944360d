// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Metrics signal for Ray.
//!
//! Replaces the parts of `src/ray/stats/` used by the GCS resource manager.
//! Values are recorded in process; exporting them is left to the embedder.
//! Metric names and tag keys match the C++ implementation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Tag set attached to a recorded value, e.g. `[("Method", "GetResources")]`.
pub type Tags = Vec<(String, String)>;

/// Build a tag set from string pairs.
pub fn tags<const N: usize>(pairs: [(&str, &str); N]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Common surface of every metric type.
pub trait Metric: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
}

/// A monotonically increasing counter, one series per tag set.
#[derive(Clone)]
pub struct Counter {
    name: String,
    description: String,
    series: Arc<Mutex<HashMap<Tags, u64>>>,
}

impl Counter {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            series: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn increment(&self, tags: &[(String, String)]) {
        self.add(tags, 1);
    }

    pub fn add(&self, tags: &[(String, String)], delta: u64) {
        *self.series.lock().entry(tags.to_vec()).or_insert(0) += delta;
    }

    pub fn get(&self, tags: &[(String, String)]) -> u64 {
        self.series.lock().get(tags).copied().unwrap_or(0)
    }

    /// Snapshot of every recorded series.
    pub fn snapshot(&self) -> Vec<(Tags, u64)> {
        self.series
            .lock()
            .iter()
            .map(|(tags, value)| (tags.clone(), *value))
            .collect()
    }
}

impl Metric for Counter {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
}

/// Aggregated observations of one histogram series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramData {
    /// `bucket_counts[i]` counts values `<= boundaries[i]`; the final slot
    /// counts values above the last boundary.
    pub bucket_counts: Vec<u64>,
    pub count: u64,
    pub sum: f64,
}

/// A histogram with fixed bucket boundaries.
#[derive(Clone)]
pub struct Histogram {
    name: String,
    description: String,
    boundaries: Vec<f64>,
    series: Arc<Mutex<HashMap<Tags, HistogramData>>>,
}

impl Histogram {
    /// `boundaries` must be sorted ascending.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        boundaries: Vec<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            boundaries,
            series: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn record(&self, tags: &[(String, String)], value: f64) {
        let bucket = self
            .boundaries
            .iter()
            .position(|b| value <= *b)
            .unwrap_or(self.boundaries.len());
        let mut series = self.series.lock();
        let data = series.entry(tags.to_vec()).or_insert_with(|| HistogramData {
            bucket_counts: vec![0; self.boundaries.len() + 1],
            ..Default::default()
        });
        data.bucket_counts[bucket] += 1;
        data.count += 1;
        data.sum += value;
    }

    pub fn get(&self, tags: &[(String, String)]) -> Option<HistogramData> {
        self.series.lock().get(tags).cloned()
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }
}

impl Metric for Histogram {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
}

/// Well-known metric names and tag keys matching the C++ stats implementation.
pub mod metric_defs {
    pub const GCS_RESOURCE_MANAGER_REQUESTS: &str = "gcs_resource_manager_requests";
    pub const GCS_NEW_RESOURCE_CREATION_LATENCY_MS: &str = "gcs_new_resource_creation_latency_ms";

    pub const METHOD_TAG: &str = "Method";

    /// Millisecond bucket boundaries used by GCS latency histograms.
    pub const LATENCY_MS_BOUNDARIES: [f64; 8] = [0.1, 1.0, 10.0, 100.0, 1_000.0, 10_000.0, 100_000.0, 1_000_000.0];
}
