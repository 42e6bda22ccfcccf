//! Multi-threaded delivery of presence and fragments.

use std::{collections::HashMap, thread};

use jabber_events::{
    Config,
    ContactId,
    ContactStatusChanged,
    FragmentAssembler,
    FragmentId,
    MessageAssembled,
    PresenceAggregator,
    PresenceUpdate,
    StatusPolicy,
};
use jabber_events_testing::{Recorder, split_message};
use rstest::rstest;

const KINDS: [&str; 5] = ["available", "away", "chat", "dnd", "xa"];

#[test]
fn contacts_updated_in_parallel_keep_ordered_chains() {
    let aggregator = PresenceAggregator::new(StatusPolicy::jabber());
    let recorder = Recorder::<ContactStatusChanged>::attach(aggregator.status_listeners());

    thread::scope(|scope| {
        for worker in 0..8 {
            let aggregator = &aggregator;
            scope.spawn(move || {
                let contact = format!("user{worker}@example.org");
                for round in 0..200 {
                    let kind = KINDS[(round + worker) % KINDS.len()];
                    aggregator.update(PresenceUpdate::new(contact.as_str(), "main", kind, None));
                }
                aggregator.update(PresenceUpdate::new(contact.as_str(), "main", "chat", None));
            });
        }
    });

    let mut shown: HashMap<ContactId, ContactStatusChanged> = HashMap::new();
    for event in recorder.events() {
        if let Some(previous) = shown.get(&event.contact) {
            assert_eq!(previous.new, event.old, "chain broken for {}", event.contact);
        } else {
            assert_eq!(event.old.kind.as_str(), "offline");
        }
        shown.insert(event.contact.clone(), event);
    }
    assert_eq!(shown.len(), 8);
    for worker in 0..8 {
        let contact = ContactId::new(format!("user{worker}@example.org"));
        assert_eq!(aggregator.current_status(&contact).kind.as_str(), "chat");
        assert_eq!(shown[&contact].new.kind.as_str(), "chat");
    }
}

#[test]
fn one_contact_flapping_across_threads_settles_consistently() {
    let aggregator = PresenceAggregator::new(StatusPolicy::jabber());
    let recorder = Recorder::<ContactStatusChanged>::attach(aggregator.status_listeners());
    let contact = ContactId::new("alice@example.org");

    thread::scope(|scope| {
        for worker in 0..4 {
            let aggregator = &aggregator;
            let contact = contact.clone();
            scope.spawn(move || {
                let resource = format!("r{worker}");
                for round in 0..100 {
                    let kind = if round % 2 == 0 { "away" } else { "offline" };
                    aggregator.update(PresenceUpdate::new(
                        contact.clone(),
                        resource.as_str(),
                        kind,
                        None,
                    ));
                }
            });
        }
    });

    let events = recorder.events();
    for pair in events.windows(2) {
        assert_eq!(pair[0].new, pair[1].old);
    }
    assert_eq!(aggregator.current_status(&contact).kind.as_str(), "offline");
    assert_eq!(aggregator.contact_count(), 0);
    if let Some(last) = events.last() {
        assert_eq!(last.new.kind.as_str(), "offline");
    }
}

#[rstest]
#[case::flush_all(true)]
#[case::flush_expired(false)]
fn every_fragment_is_emitted_exactly_once(#[case] flush_all: bool) {
    let config = Config::builder()
        .fragment_timeout(std::time::Duration::from_millis(1))
        .build()
        .expect("valid configuration");
    let assembler = FragmentAssembler::without_timer(&config);
    let recorder = Recorder::<MessageAssembled>::attach(assembler.listeners());

    thread::scope(|scope| {
        for worker in 0..4 {
            let assembler = assembler.clone();
            scope.spawn(move || {
                for message in 0..50 {
                    let group = format!("w{worker}-m{message}");
                    for fragment in split_message(&group, "bob@example.org", "abcdef", 3) {
                        assembler.on_fragment(fragment);
                    }
                }
            });
        }
        let flusher = assembler.clone();
        scope.spawn(move || {
            for _ in 0..200 {
                if flush_all {
                    flusher.flush_all_pending();
                } else {
                    flusher.flush_expired();
                }
                thread::yield_now();
            }
        });
    });
    assembler.flush_all_pending();

    // A flush can split a group; its remaining fragments then form a new
    // message. Across all messages each fragment still appears once.
    let mut received: HashMap<FragmentId, u32> = HashMap::new();
    for message in recorder.events() {
        *received.entry(message.group).or_default() += message.fragments_received;
    }
    assert_eq!(received.len(), 200);
    assert!(received.values().all(|count| *count == 3), "a fragment was lost or repeated");
    assert_eq!(assembler.pending_len(), 0);
}
