// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Per-node scheduling resources as seen by the GCS.
//!
//! Replaces `SchedulingResources` from `src/ray/common/task/scheduling_resources.h`.
//!
//! Every mutation keeps `available` a subset of `total`: capacity edits move
//! `available` by the same delta, and heartbeat availability and releases are
//! clamped to `total`.

use std::fmt;

use crate::scheduling::{FixedPoint, ResourceSet};

/// Total, available and normal-task resources of one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulingResources {
    total: ResourceSet,
    available: ResourceSet,
    /// Resources consumed by tasks the node runs outside GCS bookkeeping.
    normal_task: ResourceSet,
}

impl SchedulingResources {
    pub fn new(total: ResourceSet) -> Self {
        Self {
            available: total.clone(),
            total,
            normal_task: ResourceSet::new(),
        }
    }

    pub fn total(&self) -> &ResourceSet {
        &self.total
    }

    pub fn available(&self) -> &ResourceSet {
        &self.available
    }

    pub fn normal_task(&self) -> &ResourceSet {
        &self.normal_task
    }

    /// Set the capacity of one resource. The change in capacity is applied
    /// to `available` as well, clamped to `[0, quantity]`.
    pub fn update_capacity(&mut self, name: &str, quantity: FixedPoint) {
        let quantity = if quantity.is_negative() {
            FixedPoint::ZERO
        } else {
            quantity
        };
        let old_total = self.total.get(name);
        let old_available = self.available.get(name);
        let new_available = (old_available + quantity - old_total)
            .max(FixedPoint::ZERO)
            .min(quantity);
        self.total.set(name, quantity);
        self.available.set(name, new_available);
    }

    pub fn delete_resource(&mut self, name: &str) {
        self.total.remove(name);
        self.available.remove(name);
        self.normal_task.remove(name);
    }

    /// Replace `available` wholesale. Entries are clamped to `total`.
    pub fn set_available(&mut self, available: ResourceSet) {
        self.available = available.clamp_to(&self.total);
    }

    pub fn set_normal_task(&mut self, normal_task: ResourceSet) {
        self.normal_task = normal_task;
    }

    /// Reserve `required` from `available`. Returns false without mutating
    /// unless `required` is a subset of `available`.
    pub fn acquire(&mut self, required: &ResourceSet) -> bool {
        match self.available.checked_sub(required) {
            Some(rest) => {
                self.available = rest;
                true
            }
            None => false,
        }
    }

    /// Return `acquired` to `available`. Never fails; the result is clamped
    /// to `total`.
    pub fn release(&mut self, acquired: &ResourceSet) {
        self.available = (&self.available + acquired).clamp_to(&self.total);
    }
}

impl fmt::Display for SchedulingResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{total: {}, available: {}, normal_task: {}}}",
            self.total, self.available, self.normal_task
        )
    }
}
