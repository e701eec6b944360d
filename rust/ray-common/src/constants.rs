// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Constants matching `src/ray/common/constants.h`.

/// Length of Ray full-length UniqueIDs (and NodeIDs) in bytes.
pub const UNIQUE_ID_SIZE: usize = 28;

/// Length of a PlacementGroupID in bytes (14 unique + 4 JobID).
pub const PLACEMENT_GROUP_ID_SIZE: usize = 18;

/// Precision of fractional resource quantity.
pub const RESOURCE_UNIT_SCALING: i32 = 10000;

/// Name of the GCS table holding per-node resource capacity maps.
pub const NODE_RESOURCE_TABLE: &str = "NodeResource";
