#![doc(html_root_url = "https://docs.rs/jabber_events/latest")]
//! Event-merging core of a Jabber/XMPP protocol provider.
//!
//! Two components sit between a decoded XMPP session and the rest of an
//! instant messaging client:
//!
//! - [`PresenceAggregator`] merges the presence of every resource a contact
//!   is signed in from into the single status a user expects to see; and
//! - [`FragmentAssembler`] rebuilds messages a peer split across several
//!   stanzas, flushing incomplete ones after a timeout.
//!
//! [`EventRouter`] drives both from one stream of [`InboundEvent`]s.

pub mod config;
pub mod error;
pub mod fragment;
pub mod listener;
pub mod metrics;
pub mod presence;
pub mod session;
pub mod status;
mod sync;

pub use config::{Config, ConfigBuilder};
pub use error::ConfigError;
pub use fragment::{
    Envelope,
    FlushReason,
    FragmentAssembler,
    FragmentError,
    FragmentId,
    MessageAssembled,
    MessageFragment,
    Reassembler,
};
pub use listener::{ListenerId, Listeners};
pub use presence::{
    AggregateStatus,
    ContactId,
    ContactStatusChanged,
    PresenceAggregator,
    PresenceUpdate,
    ResourceChanged,
    ResourceName,
};
pub use session::{EventRouter, InboundEvent};
pub use status::{Importance, StatusKind, StatusPolicy};
