//! Property tests for presence aggregation.
//!
//! A simple model recomputes the expected aggregate from the update history
//! and is compared against the aggregator after every generated sequence.

use std::collections::HashMap;

use jabber_events::{
    AggregateStatus,
    ContactId,
    ContactStatusChanged,
    Importance,
    PresenceAggregator,
    PresenceUpdate,
    StatusKind,
    StatusPolicy,
};
use jabber_events_testing::Recorder;
use proptest::prelude::*;

const KINDS: [&str; 6] = ["offline", "dnd", "xa", "away", "available", "chat"];
const RESOURCES: [&str; 4] = ["desktop", "phone", "laptop", "tablet"];
const MESSAGES: [Option<&str>; 4] = [None, Some(""), Some("brb"), Some("in a meeting")];

fn contact() -> ContactId { ContactId::new("alice@example.org") }

fn updates() -> impl Strategy<Value = Vec<PresenceUpdate>> {
    prop::collection::vec(
        (0..RESOURCES.len(), 0..KINDS.len(), 0..MESSAGES.len()),
        1..40,
    )
    .prop_map(|picks| {
        picks
            .into_iter()
            .map(|(resource, kind, message)| {
                PresenceUpdate::new(contact(), RESOURCES[resource], KINDS[kind], MESSAGES[message])
            })
            .collect()
    })
}

type ModelKey = (Importance, Option<usize>, usize, &'static str);

/// Recompute the aggregate from scratch: latest update per resource, offline
/// resources dropped, highest ranked survivor shown.
fn model(policy: &StatusPolicy, history: &[PresenceUpdate]) -> AggregateStatus {
    let mut live: HashMap<&'static str, (ModelKey, AggregateStatus)> = HashMap::new();
    for (position, update) in history.iter().enumerate() {
        let resource = RESOURCES
            .into_iter()
            .find(|name| *name == update.resource.as_str())
            .expect("generated resource");
        if policy.is_offline(&update.kind) {
            live.remove(resource);
            continue;
        }
        let importance = policy.importance(&update.kind).expect("generated kind");
        let key = (
            importance,
            update.message.as_deref().map(|m| m.chars().count()),
            position,
            resource,
        );
        let status = AggregateStatus {
            kind: update.kind.clone(),
            message: update.message.clone(),
        };
        live.insert(resource, (key, status));
    }
    live.into_values()
        .max_by(|a, b| a.0.cmp(&b.0))
        .map_or_else(|| AggregateStatus::offline(policy.offline().clone()), |(_, s)| s)
}

proptest! {
    #[test]
    fn aggregate_matches_highest_ranked_live_resource(history in updates()) {
        let aggregator = PresenceAggregator::new(StatusPolicy::jabber());
        for update in history.iter().cloned() {
            aggregator.update(update);
        }

        let expected = model(aggregator.policy(), &history);
        prop_assert_eq!(aggregator.current_status(&contact()), expected);
    }

    #[test]
    fn notifications_form_a_chain_of_real_changes(history in updates()) {
        let aggregator = PresenceAggregator::new(StatusPolicy::jabber());
        let recorder = Recorder::<ContactStatusChanged>::attach(aggregator.status_listeners());
        for update in history {
            aggregator.update(update);
        }

        let events = recorder.events();
        let mut shown = AggregateStatus::offline(StatusKind::new("offline"));
        for event in &events {
            prop_assert_eq!(&event.old, &shown);
            prop_assert_ne!(&event.old, &event.new);
            shown = event.new.clone();
        }
        prop_assert_eq!(aggregator.current_status(&contact()), shown);
    }
}
