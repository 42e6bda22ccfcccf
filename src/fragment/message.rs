//! Inbound fragments and the assembled messages they produce.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::FragmentId;
use crate::presence::ContactId;

/// Delivery metadata taken from the first fragment seen for a group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Bare address of the sending contact.
    pub sender: ContactId,
    /// Send time carried by the stanza, or receipt time when absent.
    #[serde(default = "SystemTime::now")]
    pub timestamp: SystemTime,
    /// Copy of a message sent or received by another resource of the account.
    #[serde(default)]
    pub carbon: bool,
    /// Replayed from offline storage or the archive rather than live.
    #[serde(default)]
    pub offline_relayed: bool,
}

impl Envelope {
    /// Live, non-carbon envelope from `sender` stamped now.
    #[must_use]
    pub fn from_sender(sender: impl Into<ContactId>) -> Self {
        Self {
            sender: sender.into(),
            timestamp: SystemTime::now(),
            carbon: false,
            offline_relayed: false,
        }
    }
}

/// One piece of a message split across several stanzas.
///
/// `total_count` and `index` are kept exactly as received; validation
/// happens when the fragment is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFragment {
    /// Multipart id shared by every fragment of the message.
    pub group: FragmentId,
    /// Declared number of fragments.
    pub total_count: i64,
    /// Zero-based position of this fragment.
    pub index: i64,
    /// Text carried by this fragment.
    pub body: String,
    /// Delivery metadata of the stanza.
    pub envelope: Envelope,
}

impl MessageFragment {
    /// Build a fragment of group `group`.
    #[must_use]
    pub fn new(
        group: impl Into<FragmentId>,
        total_count: i64,
        index: i64,
        body: impl Into<String>,
        envelope: Envelope,
    ) -> Self {
        Self {
            group: group.into(),
            total_count,
            index,
            body: body.into(),
            envelope,
        }
    }
}

/// Why an assembled message was flushed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushReason {
    /// Every fragment arrived, or the message came in one piece.
    Complete,
    /// The flush deadline passed first.
    TimedOut,
    /// The owning session forced the flush.
    Forced,
}

impl FlushReason {
    /// Label value used for this reason.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FlushReason::Complete => "complete",
            FlushReason::TimedOut => "timed_out",
            FlushReason::Forced => "forced",
        }
    }
}

/// A logical message rebuilt from its fragments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageAssembled {
    /// Multipart id the message was assembled from.
    pub group: FragmentId,
    /// Sender taken from the first fragment seen.
    pub sender: ContactId,
    /// Fragments concatenated in index order.
    pub body: String,
    /// Timestamp of the first fragment seen.
    pub timestamp: SystemTime,
    /// Carbon flag of the first fragment seen.
    pub carbon: bool,
    /// Offline-relay flag of the first fragment seen.
    pub offline_relayed: bool,
    /// At least one fragment was missing and replaced by the placeholder.
    pub was_truncated: bool,
    /// Distinct fragments that arrived.
    pub fragments_received: u32,
    /// Fragment count the message declared.
    pub fragments_expected: u32,
    /// What triggered the flush.
    pub reason: FlushReason,
}
