//! Merges per-resource presence into one aggregate status per contact.
//!
//! [`PresenceAggregator`] keeps a [`ContactPresenceSet`] per contact in a
//! sharded [`DashMap`]. Each contact's state sits behind its own mutex so
//! updates for one contact are serialised while other contacts proceed in
//! parallel. Notifications for a contact are emitted while its mutex is held,
//! which keeps their order identical to processing order; listeners therefore
//! must not call back into the aggregator for the same contact.

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use dashmap::DashMap;
use log::{debug, warn};

use super::{
    AggregateStatus,
    ContactId,
    ContactPresenceSet,
    ContactStatusChanged,
    PresenceUpdate,
    ResourceChange,
    ResourceChanged,
    ResourcePresence,
};
use crate::{listener::Listeners, metrics, status::StatusPolicy, sync::lock};

#[derive(Debug)]
struct ContactEntry {
    set: ContactPresenceSet,
    emitted: AggregateStatus,
    retired: bool,
}

#[derive(Debug)]
enum HoldState {
    Live,
    Holding(VecDeque<PresenceUpdate>),
    Replaying(VecDeque<PresenceUpdate>),
}

/// Presence aggregator for every contact of one account.
#[derive(Debug)]
pub struct PresenceAggregator {
    policy: StatusPolicy,
    contacts: DashMap<ContactId, Arc<Mutex<ContactEntry>>>,
    sequence: AtomicU64,
    hold: Mutex<HoldState>,
    status_listeners: Listeners<ContactStatusChanged>,
    resource_listeners: Listeners<ResourceChanged>,
}

impl PresenceAggregator {
    /// Create an aggregator ranking statuses with `policy`.
    #[must_use]
    pub fn new(policy: StatusPolicy) -> Self {
        Self {
            policy,
            contacts: DashMap::new(),
            sequence: AtomicU64::new(0),
            hold: Mutex::new(HoldState::Live),
            status_listeners: Listeners::new(),
            resource_listeners: Listeners::new(),
        }
    }

    /// Importance table in use.
    #[must_use]
    pub fn policy(&self) -> &StatusPolicy { &self.policy }

    /// Listeners notified when a contact's aggregate status changes.
    #[must_use]
    pub fn status_listeners(&self) -> &Listeners<ContactStatusChanged> { &self.status_listeners }

    /// Listeners notified when a resource is added, modified or removed.
    #[must_use]
    pub fn resource_listeners(&self) -> &Listeners<ResourceChanged> { &self.resource_listeners }

    /// Feed one presence signal.
    ///
    /// While the aggregator is held the update is queued; otherwise it is
    /// applied immediately. Unknown status kinds are logged and ranked as the
    /// policy's fallback kind. This never fails.
    pub fn update(&self, update: PresenceUpdate) {
        metrics::inc_presence_updates();
        {
            let mut hold = lock(&self.hold);
            if let HoldState::Holding(queue) | HoldState::Replaying(queue) = &mut *hold {
                debug!(
                    "queueing presence while held: contact={}, resource={}",
                    update.contact, update.resource
                );
                queue.push_back(update);
                return;
            }
        }
        self.apply(update);
    }

    /// Start queueing updates, typically while the roster is loading.
    pub fn hold(&self) {
        let mut hold = lock(&self.hold);
        *hold = match std::mem::replace(&mut *hold, HoldState::Live) {
            HoldState::Live => HoldState::Holding(VecDeque::new()),
            HoldState::Holding(queue) | HoldState::Replaying(queue) => HoldState::Holding(queue),
        };
    }

    /// Return whether updates are currently being queued.
    #[must_use]
    pub fn is_held(&self) -> bool { !matches!(*lock(&self.hold), HoldState::Live) }

    /// Stop queueing and replay queued updates in arrival order.
    ///
    /// Updates arriving during the replay are queued behind it, so arrival
    /// order is preserved. If [`hold`](Self::hold) is called again during the
    /// replay, the replay stops after the batch in progress and later
    /// updates stay queued.
    /// Returns the number of updates replayed by this call.
    pub fn release(&self) -> usize {
        let mut replayed = 0;
        let mut first = true;
        loop {
            let batch = {
                let mut hold = lock(&self.hold);
                let queue = match &mut *hold {
                    HoldState::Holding(queue) if first => std::mem::take(queue),
                    HoldState::Replaying(queue) if !first => std::mem::take(queue),
                    HoldState::Live | HoldState::Holding(_) | HoldState::Replaying(_) => {
                        return replayed;
                    }
                };
                if queue.is_empty() {
                    *hold = HoldState::Live;
                    debug!("presence hold released: replayed={replayed}");
                    return replayed;
                }
                *hold = HoldState::Replaying(VecDeque::new());
                queue
            };
            first = false;
            for update in batch {
                self.apply(update);
                replayed += 1;
            }
        }
    }

    /// Aggregate status of `contact`, offline when no resource is live.
    #[must_use]
    pub fn current_status(&self, contact: &ContactId) -> AggregateStatus {
        let Some(entry) = self.entry(contact) else {
            return self.offline();
        };
        let state = lock(&entry);
        Self::aggregate_of(&self.policy, &state.set)
    }

    /// Live resources of `contact`, most important first.
    #[must_use]
    pub fn resources(&self, contact: &ContactId) -> Vec<ResourcePresence> {
        let Some(entry) = self.entry(contact) else {
            return Vec::new();
        };
        let state = lock(&entry);
        state.set.iter().cloned().collect()
    }

    /// Number of contacts with at least one live resource.
    #[must_use]
    pub fn contact_count(&self) -> usize { self.contacts.len() }

    /// Force every contact offline, typically after the connection drops.
    ///
    /// Every live resource is reported removed and every contact whose last
    /// notification was not offline receives an offline notification. Queued
    /// updates describe the lost connection and are discarded; the hold mode
    /// itself is left unchanged.
    pub fn reset_all(&self) {
        {
            let mut hold = lock(&self.hold);
            if let HoldState::Holding(queue) | HoldState::Replaying(queue) = &mut *hold {
                if !queue.is_empty() {
                    debug!("discarding queued presence: count={}", queue.len());
                }
                queue.clear();
            }
        }
        let entries: Vec<(ContactId, Arc<Mutex<ContactEntry>>)> = self
            .contacts
            .iter()
            .map(|item| (item.key().clone(), Arc::clone(item.value())))
            .collect();
        for (contact, entry) in entries {
            let mut state = lock(&entry);
            if state.retired {
                continue;
            }
            for removed in state.set.drain() {
                self.resource_listeners.emit(&ResourceChanged {
                    contact: contact.clone(),
                    resource: removed.resource,
                    change: ResourceChange::Removed,
                    kind: self.policy.offline().clone(),
                    message: None,
                });
            }
            self.settle(&contact, &entry, &mut state);
        }
    }

    fn offline(&self) -> AggregateStatus { AggregateStatus::offline(self.policy.offline().clone()) }

    fn entry(&self, contact: &ContactId) -> Option<Arc<Mutex<ContactEntry>>> {
        self.contacts.get(contact).map(|item| Arc::clone(item.value()))
    }

    fn aggregate_of(policy: &StatusPolicy, set: &ContactPresenceSet) -> AggregateStatus {
        set.top().map_or_else(
            || AggregateStatus::offline(policy.offline().clone()),
            |top| AggregateStatus {
                kind: top.kind.clone(),
                message: top.message.clone(),
            },
        )
    }

    fn apply(&self, update: PresenceUpdate) {
        let PresenceUpdate {
            contact,
            resource,
            kind,
            message,
            timestamp,
        } = update;
        let (kind, importance, substituted) = self.policy.resolve(kind);
        if substituted {
            warn!(
                "unknown presence status; ranking as fallback: contact={contact}, \
                 resource={resource}, fallback={kind}"
            );
        }
        let offline = self.policy.is_offline(&kind);

        loop {
            let entry = Arc::clone(
                self.contacts
                    .entry(contact.clone())
                    .or_insert_with(|| {
                        Arc::new(Mutex::new(ContactEntry {
                            set: ContactPresenceSet::new(),
                            emitted: self.offline(),
                            retired: false,
                        }))
                    })
                    .value(),
            );
            let mut state = lock(&entry);
            if state.retired {
                // Emptied and removed by another writer; pick up the fresh entry.
                continue;
            }

            if offline {
                if state.set.remove(&resource).is_some() {
                    self.resource_listeners.emit(&ResourceChanged {
                        contact: contact.clone(),
                        resource: resource.clone(),
                        change: ResourceChange::Removed,
                        kind: kind.clone(),
                        message: None,
                    });
                }
            } else {
                let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
                let previous = state.set.upsert(ResourcePresence {
                    contact: contact.clone(),
                    resource: resource.clone(),
                    kind: kind.clone(),
                    importance,
                    message: message.clone(),
                    timestamp,
                    sequence,
                });
                let change = match previous {
                    None => Some(ResourceChange::Added),
                    Some(previous) if previous.kind != kind || previous.message != message => {
                        Some(ResourceChange::Modified)
                    }
                    Some(_) => None,
                };
                if let Some(change) = change {
                    self.resource_listeners.emit(&ResourceChanged {
                        contact: contact.clone(),
                        resource: resource.clone(),
                        change,
                        kind: kind.clone(),
                        message: message.clone(),
                    });
                }
            }

            self.settle(&contact, &entry, &mut state);
            return;
        }
    }

    /// Emit a status notification if the aggregate moved, and retire the
    /// entry once the contact has no live resource.
    fn settle(
        &self,
        contact: &ContactId,
        entry: &Arc<Mutex<ContactEntry>>,
        state: &mut ContactEntry,
    ) {
        let aggregate = Self::aggregate_of(&self.policy, &state.set);
        if aggregate == state.emitted {
            debug!("aggregate presence unchanged: contact={contact}");
        } else {
            let old = std::mem::replace(&mut state.emitted, aggregate.clone());
            metrics::inc_status_changes();
            self.status_listeners.emit(&ContactStatusChanged {
                contact: contact.clone(),
                old,
                new: aggregate,
            });
        }

        if state.set.is_empty() {
            state.retired = true;
            self.contacts
                .remove_if(contact, |_, current| Arc::ptr_eq(current, entry));
        }
    }
}

impl Default for PresenceAggregator {
    fn default() -> Self { Self::new(StatusPolicy::default()) }
}
