//! Ordered collection of one contact's live resources.
//!
//! Resources are ordered ascending by importance, then by status message
//! length (an absent message sorts below any present one), then by
//! processing sequence, then by resource name. The last element is the
//! aggregate.

use std::collections::{BTreeMap, HashMap};

use super::{ResourceName, ResourcePresence};
use crate::status::Importance;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct RankKey {
    importance: Importance,
    message_len: Option<usize>,
    sequence: u64,
    resource: ResourceName,
}

impl RankKey {
    fn of(presence: &ResourcePresence) -> Self {
        Self {
            importance: presence.importance,
            message_len: presence.message.as_deref().map(|m| m.chars().count()),
            sequence: presence.sequence,
            resource: presence.resource.clone(),
        }
    }
}

/// Live resources of a single contact, at most one entry per resource.
#[derive(Clone, Debug, Default)]
pub struct ContactPresenceSet {
    ordered: BTreeMap<RankKey, ResourcePresence>,
    by_resource: HashMap<ResourceName, RankKey>,
}

impl ContactPresenceSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Insert `presence`, replacing any entry for the same resource.
    ///
    /// Returns the replaced entry.
    pub fn upsert(&mut self, presence: ResourcePresence) -> Option<ResourcePresence> {
        let previous = self.remove(&presence.resource);
        let key = RankKey::of(&presence);
        self.by_resource
            .insert(presence.resource.clone(), key.clone());
        self.ordered.insert(key, presence);
        previous
    }

    /// Remove the entry for `resource`, returning it if present.
    pub fn remove(&mut self, resource: &ResourceName) -> Option<ResourcePresence> {
        let key = self.by_resource.remove(resource)?;
        self.ordered.remove(&key)
    }

    /// Entry for `resource`, if live.
    #[must_use]
    pub fn get(&self, resource: &ResourceName) -> Option<&ResourcePresence> {
        self.by_resource
            .get(resource)
            .and_then(|key| self.ordered.get(key))
    }

    /// The most important entry.
    #[must_use]
    pub fn top(&self) -> Option<&ResourcePresence> {
        self.ordered.last_key_value().map(|(_, presence)| presence)
    }

    /// Entries from most to least important.
    pub fn iter(&self) -> impl Iterator<Item = &ResourcePresence> { self.ordered.values().rev() }

    /// Remove every entry, returning them from most to least important.
    pub fn drain(&mut self) -> Vec<ResourcePresence> {
        self.by_resource.clear();
        std::mem::take(&mut self.ordered).into_values().rev().collect()
    }

    /// Number of live resources.
    #[must_use]
    pub fn len(&self) -> usize { self.ordered.len() }

    /// Return whether no resource is live.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.ordered.is_empty() }
}
