//! Identifiers, inputs and notifications of the presence aggregator.

use std::{fmt, sync::Arc, time::SystemTime};

use serde::{Deserialize, Serialize};

use crate::status::{Importance, StatusKind};

macro_rules! shared_str_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub struct $name(Arc<str>);

        impl $name {
            /// Create an identifier from its textual form.
            #[must_use]
            pub fn new(value: impl AsRef<str>) -> Self { Self(Arc::from(value.as_ref())) }

            /// Borrow the textual form.
            #[must_use]
            pub fn as_str(&self) -> &str { &self.0 }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:?}", &*self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self { Self::new(value) }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self { Self(Arc::from(value)) }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self { value.0.to_string() }
        }
    };
}

shared_str_id!(
    /// Bare address of a contact, for example `alice@example.org`.
    ///
    /// ```
    /// use jabber_events::presence::ContactId;
    /// let contact = ContactId::new("alice@example.org");
    /// assert_eq!(contact.to_string(), "alice@example.org");
    /// ```
    ContactId
);

shared_str_id!(
    /// Name of one connected client session of a contact, for example
    /// `phone`.
    ResourceName
);

/// Raw presence signal for one resource, as decoded by the XMPP session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    /// Bare address of the contact.
    pub contact: ContactId,
    /// Resource the signal came from.
    pub resource: ResourceName,
    /// Status kind as announced; unknown kinds are accepted.
    pub kind: StatusKind,
    /// Free-text status message, if any.
    #[serde(default)]
    pub message: Option<String>,
    /// Time the signal was received.
    #[serde(default = "SystemTime::now")]
    pub timestamp: SystemTime,
}

impl PresenceUpdate {
    /// Build an update stamped with the current time.
    #[must_use]
    pub fn new(
        contact: impl Into<ContactId>,
        resource: impl Into<ResourceName>,
        kind: impl Into<StatusKind>,
        message: Option<&str>,
    ) -> Self {
        Self {
            contact: contact.into(),
            resource: resource.into(),
            kind: kind.into(),
            message: message.map(str::to_owned),
            timestamp: SystemTime::now(),
        }
    }

    /// Replace the timestamp.
    #[must_use]
    pub fn at(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A live resource as held by the aggregator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourcePresence {
    /// Bare address of the contact.
    pub contact: ContactId,
    /// Resource concerned.
    pub resource: ResourceName,
    /// Resolved kind; unknown kinds are already replaced by the fallback.
    pub kind: StatusKind,
    /// Rank of `kind` under the aggregator's policy.
    pub importance: Importance,
    /// Status message of the resource.
    pub message: Option<String>,
    /// Timestamp of the update that produced this entry.
    pub timestamp: SystemTime,
    /// Processing order assigned by the aggregator; later updates are larger.
    pub sequence: u64,
}

/// Status shown for a contact: the most important live resource's kind and
/// message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AggregateStatus {
    /// Kind shown for the contact.
    pub kind: StatusKind,
    /// Message shown alongside the kind.
    pub message: Option<String>,
}

impl AggregateStatus {
    /// Aggregate for a contact without live resources.
    #[must_use]
    pub fn offline(kind: StatusKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }
}

/// Emitted when a contact's aggregate status changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContactStatusChanged {
    /// Contact whose aggregate moved.
    pub contact: ContactId,
    /// Aggregate previously reported for the contact.
    pub old: AggregateStatus,
    /// Aggregate now in effect.
    pub new: AggregateStatus,
}

/// What happened to a single resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceChange {
    /// The resource came online.
    Added,
    /// The resource changed its kind or message.
    Modified,
    /// The resource went offline.
    Removed,
}

/// Emitted when a contact's resource list changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceChanged {
    /// Bare address of the contact.
    pub contact: ContactId,
    /// Resource concerned.
    pub resource: ResourceName,
    /// What happened to the resource.
    pub change: ResourceChange,
    /// Kind after the change; the offline kind for removals.
    pub kind: StatusKind,
    /// Message after the change; `None` for removals.
    pub message: Option<String>,
}
