//! Reassembly of messages split across several stanzas.
//!
//! Peers limited by a per-stanza size split long messages into numbered
//! fragments sharing a [`FragmentId`]. This module collects the domain types
//! for those fragments, the synchronous [`Reassembler`] that buffers them,
//! the [`FlushScheduler`] that enforces flush deadlines, and the thread-safe
//! [`FragmentAssembler`] tying them to listeners.

pub mod assembler;
pub mod buffer;
pub mod error;
pub mod id;
pub mod index;
pub mod message;
pub mod reassembler;
pub mod scheduler;

pub use assembler::FragmentAssembler;
pub use buffer::FragmentBuffer;
pub use error::FragmentError;
pub use id::FragmentId;
pub use index::{FragmentCount, FragmentIndex};
pub use message::{Envelope, FlushReason, MessageAssembled, MessageFragment};
pub use reassembler::{FlushTimer, Progress, Pushed, Reassembler};
pub use scheduler::{FireFn, FlushScheduler};
