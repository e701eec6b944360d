// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Fixed-size binary identifiers used by the resource manager.
//!
//! Replaces the `NodeID` / `PlacementGroupID` parts of `src/ray/common/id.h`.
//! Every per-node structure in the GCS is keyed by `NodeID`.

use std::fmt;

use rand::Rng;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{PLACEMENT_GROUP_ID_SIZE, UNIQUE_ID_SIZE};

/// Generates a fixed-size Ray ID type.
///
/// Each ID is a `[u8; N]` newtype that is `Copy`, hashable, displayed as
/// lowercase hex and serialized as a hex string. The nil ID is all `0xFF`
/// bytes, matching C++ `BaseID`.
macro_rules! define_ray_id {
    ($name:ident, $size:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            data: [u8; $size],
        }

        impl $name {
            /// The fixed byte size of this ID type.
            pub const SIZE: usize = $size;

            pub const fn nil() -> Self {
                Self {
                    data: [0xFF; $size],
                }
            }

            /// Create an ID from raw bytes. Panics if `bytes.len() != SIZE`;
            /// use [`Self::try_from_binary`] for untrusted input.
            pub fn from_binary(bytes: &[u8]) -> Self {
                Self::try_from_binary(bytes).unwrap_or_else(|| {
                    panic!(
                        "expected {} bytes for {}, got {}",
                        $size,
                        stringify!($name),
                        bytes.len()
                    )
                })
            }

            pub fn try_from_binary(bytes: &[u8]) -> Option<Self> {
                let data: [u8; $size] = bytes.try_into().ok()?;
                Some(Self { data })
            }

            /// Parse a lowercase or uppercase hex string. Returns `None` on a
            /// length mismatch or non-hex input.
            pub fn from_hex(hex_str: &str) -> Option<Self> {
                if hex_str.len() != $size * 2 {
                    tracing::debug!(
                        id_type = stringify!($name),
                        len = hex_str.len(),
                        "hex string has the wrong length"
                    );
                    return None;
                }
                let bytes = hex::decode(hex_str).ok()?;
                Self::try_from_binary(&bytes)
            }

            pub fn from_random() -> Self {
                let mut data = [0u8; $size];
                rand::thread_rng().fill(&mut data[..]);
                Self { data }
            }

            pub fn is_nil(&self) -> bool {
                self.data == [0xFF; $size]
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.data
            }

            pub fn binary(&self) -> Vec<u8> {
                self.data.to_vec()
            }

            /// Hex-encoded string (lowercase), matching C++ `Hex()`.
            pub fn hex(&self) -> String {
                hex::encode(self.data)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::nil()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.hex())
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.data
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).ok_or_else(|| {
                    D::Error::custom(format!("invalid {} hex string", stringify!($name)))
                })
            }
        }
    };
}

define_ray_id!(NodeID, UNIQUE_ID_SIZE);
define_ray_id!(PlacementGroupID, PLACEMENT_GROUP_ID_SIZE);
