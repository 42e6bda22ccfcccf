//! Errors raised for malformed fragments.
//!
//! None of these reach protocol callers: [`FragmentAssembler`] logs them and
//! drops the offending fragment. The synchronous [`Reassembler`] returns them
//! so hosts and tests can inspect the reason.
//!
//! [`FragmentAssembler`]: crate::fragment::FragmentAssembler
//! [`Reassembler`]: crate::fragment::Reassembler

use thiserror::Error;

use super::FragmentId;

/// Reasons a fragment is discarded.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FragmentError {
    /// The declared fragment count is zero, negative or too large.
    #[error("invalid fragment count {count} for group {group}")]
    InvalidCount {
        /// Group named by the fragment.
        group: FragmentId,
        /// Count as received.
        count: i64,
    },
    /// The fragment index lies outside `0..count`.
    #[error("fragment index {index} out of range 0..{count} for group {group}")]
    IndexOutOfRange {
        /// Group named by the fragment.
        group: FragmentId,
        /// Index as received.
        index: i64,
        /// Validated count the index was checked against.
        count: u32,
    },
    /// The fragment declares a different count than the buffered group.
    #[error("fragment count mismatch for group {group}: buffered {expected}, found {found}")]
    CountMismatch {
        /// Group named by the fragment.
        group: FragmentId,
        /// Count declared by the buffered group.
        expected: u32,
        /// Count carried by the rejected fragment.
        found: i64,
    },
}

impl FragmentError {
    /// Group the rejected fragment claimed to belong to.
    #[must_use]
    pub fn group(&self) -> &FragmentId {
        match self {
            Self::InvalidCount { group, .. }
            | Self::IndexOutOfRange { group, .. }
            | Self::CountMismatch { group, .. } => group,
        }
    }
}
