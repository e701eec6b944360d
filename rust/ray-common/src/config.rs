// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Ray configuration.
//!
//! Replaces the subset of `src/ray/common/ray_config_def.h` read by the GCS
//! resource manager. Values come from a base64-encoded JSON string passed by
//! the launcher, then `RAY_<name>` environment variables override them.

use std::fmt;

/// Errors from parsing a config string.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("UTF-8 decode error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration parameters consumed by the resource manager.
#[derive(Clone, PartialEq)]
pub struct RayConfig {
    /// When set, heartbeats drive normal-task resource reconciliation
    /// instead of replacing the node's available resources.
    pub gcs_actor_scheduling_enabled: bool,
    /// Period of the debug-state dump in the GCS. 0 disables it.
    pub debug_dump_period_milliseconds: u64,
}

impl Default for RayConfig {
    fn default() -> Self {
        Self {
            gcs_actor_scheduling_enabled: false,
            debug_dump_period_milliseconds: 10_000,
        }
    }
}

impl fmt::Debug for RayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RayConfig")
            .field(
                "gcs_actor_scheduling_enabled",
                &self.gcs_actor_scheduling_enabled,
            )
            .field(
                "debug_dump_period_milliseconds",
                &self.debug_dump_period_milliseconds,
            )
            .finish_non_exhaustive()
    }
}

impl RayConfig {
    /// Parse from base64-encoded JSON (as sent by the Python launcher).
    pub fn from_base64_json(b64: &str) -> Result<Self, ConfigError> {
        let decoded = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, b64)?;
        let json_str = String::from_utf8(decoded)?;
        Self::from_json(&json_str)
    }

    /// Parse from a JSON object. Unknown keys are ignored; missing keys keep
    /// their defaults. Environment overrides are applied last.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut config = Self::default();

        macro_rules! set_field {
            ($field:ident, bool) => {
                if let Some(v) = map.get(stringify!($field)).and_then(|v| v.as_bool()) {
                    config.$field = v;
                }
            };
            ($field:ident, u64) => {
                if let Some(v) = map.get(stringify!($field)).and_then(|v| v.as_u64()) {
                    config.$field = v;
                }
            };
        }

        set_field!(gcs_actor_scheduling_enabled, bool);
        set_field!(debug_dump_period_milliseconds, u64);

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides of the form `RAY_<name>`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        macro_rules! env_override {
            ($field:ident, $ty:ty) => {
                let env_key = concat!("RAY_", stringify!($field));
                if let Some(val) = lookup(env_key) {
                    match val.parse::<$ty>() {
                        Ok(v) => self.$field = v,
                        Err(_) => tracing::warn!(key = env_key, value = %val, "ignoring malformed config override"),
                    }
                }
            };
        }

        env_override!(gcs_actor_scheduling_enabled, bool);
        env_override!(debug_dump_period_milliseconds, u64);
    }
}
