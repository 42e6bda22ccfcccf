//! Test fixtures for `jabber_events`.
//!
//! Provides a serialised handle to the global log capture, a listener
//! recorder that collects emitted events, and builders for fragmented
//! messages.
//!
//! ```rust
//! use jabber_events::{Config, FragmentAssembler};
//! use jabber_events_testing::{Recorder, split_message};
//!
//! let assembler = FragmentAssembler::without_timer(&Config::default());
//! let recorder = Recorder::attach(assembler.listeners());
//! for fragment in split_message("g", "bob@example.org", "hello world", 3) {
//!     assembler.on_fragment(fragment);
//! }
//! assert_eq!(recorder.events()[0].body, "hello world");
//! ```

pub mod fragments;
pub mod logging;
pub mod recorder;

pub use fragments::{fragment, split_message};
pub use logging::{LoggerHandle, logger};
pub use recorder::Recorder;
