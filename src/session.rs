//! Routes decoded protocol events to the presence and messaging components.
//!
//! The XMPP session owns the network and decodes stanzas; [`EventRouter`] is
//! the single entry point it calls for each decoded event. Roster loading
//! holds presence, connection loss resets it, and closing flushes every
//! partially received message before the deadline task stops.

use serde::Deserialize;
use tracing::info;

use crate::{
    config::Config,
    fragment::{Envelope, FragmentAssembler, FragmentId, MessageFragment},
    presence::{PresenceAggregator, PresenceUpdate},
};

/// Event decoded by the protocol session.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Presence of one resource.
    Presence(PresenceUpdate),
    /// One piece of a multipart message.
    Fragment(MessageFragment),
    /// A message delivered in one stanza.
    PlainMessage {
        id: FragmentId,
        body: String,
        envelope: Envelope,
    },
    /// The roster started loading; presence is queued until it finishes.
    RosterLoading,
    /// The roster finished loading; queued presence is replayed.
    RosterLoaded,
    /// The connection dropped; every contact goes offline.
    ConnectionLost,
    /// The session is terminating.
    Closing,
}

/// Drives both components from one stream of inbound events.
#[derive(Debug)]
pub struct EventRouter {
    presence: PresenceAggregator,
    messages: FragmentAssembler,
}

impl EventRouter {
    /// Create a router whose fragment deadlines fire on a background task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            presence: PresenceAggregator::new(config.status_policy().clone()),
            messages: FragmentAssembler::spawn(config),
        }
    }

    /// Create a router from existing components.
    #[must_use]
    pub fn from_parts(presence: PresenceAggregator, messages: FragmentAssembler) -> Self {
        Self { presence, messages }
    }

    /// Presence aggregator, for queries and listener registration.
    #[must_use]
    pub fn presence(&self) -> &PresenceAggregator { &self.presence }

    /// Fragment assembler, for listener registration.
    #[must_use]
    pub fn messages(&self) -> &FragmentAssembler { &self.messages }

    /// Handle one inbound event. This never fails.
    pub fn dispatch(&self, event: InboundEvent) {
        match event {
            InboundEvent::Presence(update) => self.presence.update(update),
            InboundEvent::Fragment(fragment) => self.messages.on_fragment(fragment),
            InboundEvent::PlainMessage { id, body, envelope } => {
                self.messages.on_message(id, body, envelope);
            }
            InboundEvent::RosterLoading => {
                info!("roster loading; holding presence");
                self.presence.hold();
            }
            InboundEvent::RosterLoaded => {
                let replayed = self.presence.release();
                info!(replayed, "roster loaded; presence released");
            }
            InboundEvent::ConnectionLost => {
                info!(
                    contacts = self.presence.contact_count(),
                    "connection lost; resetting presence"
                );
                self.presence.reset_all();
            }
            InboundEvent::Closing => {
                self.close();
            }
        }
    }

    /// Flush every pending message and stop the deadline task.
    ///
    /// Returns the number of messages flushed.
    pub fn close(&self) -> usize {
        let flushed = self.messages.flush_all_pending();
        self.messages.stop_timer();
        info!(flushed, "session closing; pending messages flushed");
        flushed
    }
}
