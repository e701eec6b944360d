// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Logging setup for Ray using the `tracing` ecosystem.
//!
//! Replaces C++ `logging.cc/h` (spdlog-based) with tracing + tracing-subscriber.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing_subscriber::EnvFilter;

/// Build the level filter: `RAY_BACKEND_LOG_LEVEL`, then `RUST_LOG`, then
/// the verbosity (0 = info, 1 = debug, otherwise trace).
pub fn log_filter(verbosity: i32) -> EnvFilter {
    EnvFilter::try_from_env("RAY_BACKEND_LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)))
}

fn default_level(verbosity: i32) -> &'static str {
    match verbosity {
        i32::MIN..=0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Path of the log file for `component` inside `log_dir`.
pub fn log_file_path(log_dir: &Path, component: &str) -> PathBuf {
    log_dir.join(format!("{component}.log"))
}

fn open_log_file(log_dir: &Path, component: &str) -> io::Result<File> {
    std::fs::create_dir_all(log_dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path(log_dir, component))
}

/// Initialize logging for a Ray component.
///
/// Logs go to `<log_dir>/<component>.log` when a directory is given and to
/// stderr otherwise. Installing a second global subscriber is a no-op.
pub fn init_ray_logging(component: &str, log_dir: Option<&Path>, verbosity: i32) -> io::Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbosity))
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let installed = match log_dir {
        Some(dir) => {
            let file = open_log_file(dir, component)?;
            subscriber
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init()
                .is_ok()
        }
        None => subscriber.with_writer(io::stderr).try_init().is_ok(),
    };

    if installed {
        tracing::info!(component, "Ray logging initialized");
    }
    Ok(())
}
