#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the inventory engine."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free.
//!
//! Only configuration loading and client construction produce errors that are
//! allowed to stop the binary. Every API-side variant is recovered inside the
//! refresh cycle, either by waiting and retrying or by treating the affected
//! organization or repository as unavailable until the next cycle.

use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

/// Unified error type returned by the API client, the engine, and the CLI.
#[derive(Debug, masterror::Error,)]
pub enum Error
{
    /// Primary rate limit exhausted; the server reported when it resets.
    #[error("primary rate limit exhausted until {reset:?}")]
    RateLimited {
        /// Instant at which the quota is replenished.
        reset: SystemTime,
    },
    /// Secondary (abuse) rate limit signalled through `Retry-After`.
    #[error("secondary rate limit, retry after {retry_after} seconds")]
    SecondaryRateLimited {
        /// Seconds requested by the server before the next attempt.
        retry_after: u64,
    },
    /// Any other API failure. Not retried within the cycle.
    #[error("{operation} failed: {message}")]
    Fetch {
        /// Logical name of the API operation.
        operation: String,
        /// Human readable failure description.
        message:   String,
    },
    /// Response body did not match the expected shape.
    #[error("{operation} returned a malformed response: {message}")]
    Malformed {
        /// Logical name of the API operation.
        operation: String,
        /// Decoder message describing the mismatch.
        message:   String,
    },
    /// Wraps I/O errors that occur while reading configuration files.
    #[error("failed to read configuration from {path:?}: {source}")]
    Io {
        /// Location of the configuration file.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Wraps YAML decoding errors.
    #[error("failed to parse configuration: {source}")]
    Parse {
        /// Source decoding error from serde_yaml.
        source: serde_yaml::Error,
    },
    /// Wraps serialization errors when printing a snapshot.
    #[error("failed to serialize snapshot: {source}")]
    Serialize {
        /// Underlying serialization error.
        source: serde_json::Error,
    },
    /// Returned when the configuration violates invariants.
    #[error("invalid configuration: {message}")]
    Validation {
        /// Human readable message describing the validation problem.
        message: String,
    },
    /// The GitHub client could not be constructed.
    #[error("failed to initialize GitHub client: {message}")]
    Client {
        /// Message reported by the client builder.
        message: String,
    },
}

impl Error
{
    /// Constructs a transient fetch error for the named operation.
    pub fn fetch<O, M,>(operation: O, message: M,) -> Self
    where
        O: Into<String,>,
        M: Into<String,>,
    {
        Self::Fetch {
            operation: operation.into(), message: message.into(),
        }
    }

    /// Constructs a malformed-response error for the named operation.
    pub fn malformed<O, M,>(operation: O, message: M,) -> Self
    where
        O: Into<String,>,
        M: Into<String,>,
    {
        Self::Malformed {
            operation: operation.into(), message: message.into(),
        }
    }

    /// Constructs a validation error from the provided displayable value.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the validation failure.
    pub fn validation<M,>(message: M,) -> Self
    where
        M: Into<String,>,
    {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Returns `true` for either flavour of rate limiting.
    ///
    /// Rate-limited calls are retried by the client wrapper; every other API
    /// error surfaces to the caller immediately.
    pub fn is_rate_limited(&self,) -> bool
    {
        matches!(self, Self::RateLimited { .. } | Self::SecondaryRateLimited { .. })
    }

    /// Returns `true` when the error only invalidates the current cycle.
    ///
    /// Malformed responses are folded into the transient class.
    pub fn is_transient(&self,) -> bool
    {
        matches!(self, Self::Fetch { .. } | Self::Malformed { .. })
    }

    /// Formats the error for diagnostics without the variant name.
    pub fn to_display_string(&self,) -> String
    {
        format!("{self}")
    }
}

impl From<serde_yaml::Error,> for Error
{
    fn from(source: serde_yaml::Error,) -> Self
    {
        Self::Parse {
            source,
        }
    }
}

impl From<serde_json::Error,> for Error
{
    fn from(source: serde_json::Error,) -> Self
    {
        Self::Serialize {
            source,
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the configuration file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error,) -> Error
{
    Error::Io {
        path: path.to_path_buf(),
        source,
    }
}
