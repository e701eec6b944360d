// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Ray status/error types.
//!
//! Replaces `src/ray/common/status.h/cc`. In Rust, `Status` becomes `Result<T, RayError>`.

use std::fmt;

/// Status codes used by the resource manager. Discriminants match the C++
/// `StatusCode` enum so they can be forwarded to other components verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum StatusCode {
    OK = 0,
    IOError = 5,
    NotFound = 17,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OK => "OK",
            Self::IOError => "IOError",
            Self::NotFound => "NotFound",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The primary error type for Ray operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct RayError {
    pub code: StatusCode,
    pub message: String,
}

impl RayError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::IOError, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NotFound, msg)
    }

    pub fn is_not_found(&self) -> bool {
        self.code == StatusCode::NotFound
    }
    pub fn is_io_error(&self) -> bool {
        self.code == StatusCode::IOError
    }
}

/// Convenience type alias: `Result<T, RayError>`.
/// This is the Rust equivalent of C++'s `StatusOr<T>`.
pub type RayResult<T> = Result<T, RayError>;
