// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! ID generators for tests.

use ray_common::constants::{PLACEMENT_GROUP_ID_SIZE, UNIQUE_ID_SIZE};
use ray_common::id::{NodeID, PlacementGroupID};

/// A deterministic NodeID whose first byte is `v`. Ordering follows `v`.
pub fn node_id(v: u8) -> NodeID {
    let mut data = [0u8; UNIQUE_ID_SIZE];
    data[0] = v;
    NodeID::from_binary(&data)
}

/// Create a random NodeID for testing.
pub fn random_node_id() -> NodeID {
    NodeID::from_random()
}

/// Create a random PlacementGroupID for testing.
pub fn random_placement_group_id() -> PlacementGroupID {
    let data: [u8; PLACEMENT_GROUP_ID_SIZE] = rand::random();
    PlacementGroupID::from_binary(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_is_deterministic() {
        assert_eq!(node_id(3), node_id(3));
        assert_ne!(node_id(3), node_id(4));
        assert!(node_id(1) < node_id(2));
        assert!(!node_id(1).is_nil());
    }

    #[test]
    fn test_random_ids() {
        assert_ne!(random_node_id(), random_node_id());
        assert_eq!(
            random_placement_group_id().as_bytes().len(),
            PLACEMENT_GROUP_ID_SIZE
        );
    }
}
