//! Crate-level error types.
//!
//! Processing never surfaces errors to protocol callers; the types here cover
//! configuration, which is validated up front, and re-export the per-event
//! rejection reasons for hosts that want to inspect them.

use thiserror::Error;

pub use crate::{fragment::FragmentError, status::PolicyError};

/// Errors returned while validating a [`Config`](crate::Config).
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The fragment flush timeout was zero.
    #[error("fragment timeout must be greater than zero")]
    ZeroTimeout,
    /// The pending message limit was zero.
    #[error("max_pending must be at least 1")]
    ZeroPending,
    /// The fragment count limit was zero or above the supported maximum.
    #[error(
        "invalid max_fragments {0}; must be between 1 and {max}",
        max = crate::config::MAX_FRAGMENTS_LIMIT
    )]
    InvalidMaxFragments(u32),
}
