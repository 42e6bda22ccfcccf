#![cfg(feature = "metrics")]
//! Tests for `jabber_events` metrics.
//!
//! These tests drive the public components under a local
//! `metrics_util::debugging::DebuggingRecorder` and inspect the snapshot.

use jabber_events::{
    Config,
    FlushReason,
    FragmentAssembler,
    PresenceAggregator,
    PresenceUpdate,
    StatusPolicy,
    metrics as names,
};
use jabber_events_testing::fragment;
use metrics_util::{
    CompositeKey,
    debugging::{DebugValue, DebuggingRecorder, Snapshotter},
};
use rstest::rstest;

/// Creates a debugging recorder and snapshotter for metrics testing.
fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

type Entry = (CompositeKey, Option<metrics::Unit>, Option<metrics::SharedString>, DebugValue);

/// Take the single snapshot a test inspects; the recorder resets counters on
/// every snapshot.
fn snapshot(snapshotter: &Snapshotter) -> Vec<Entry> { snapshotter.snapshot().into_vec() }

fn counter(entries: &[Entry], name: &str, label: Option<(&str, &str)>) -> u64 {
    entries
        .iter()
        .filter(|(key, _, _, _)| {
            key.key().name() == name
                && label.is_none_or(|(k, v)| {
                    key.key().labels().any(|l| l.key() == k && l.value() == v)
                })
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(count) => *count,
            other => panic!("{name} is not a counter: {other:?}"),
        })
        .sum()
}

#[test]
fn presence_updates_and_status_changes_are_counted() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let aggregator = PresenceAggregator::new(StatusPolicy::jabber());
        aggregator.update(PresenceUpdate::new("alice@example.org", "a", "away", None));
        aggregator.update(PresenceUpdate::new("alice@example.org", "b", "dnd", None));
        aggregator.update(PresenceUpdate::new("alice@example.org", "a", "offline", None));
    });

    let entries = snapshot(&snapshotter);
    assert_eq!(counter(&entries, names::PRESENCE_UPDATES, None), 3);
    assert_eq!(counter(&entries, names::STATUS_CHANGES, None), 2);
}

#[rstest]
#[case::complete(FlushReason::Complete, 2)]
#[case::forced(FlushReason::Forced, 1)]
fn assembled_messages_are_labelled_by_reason(#[case] reason: FlushReason, #[case] expected: u64) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let assembler = FragmentAssembler::without_timer(&Config::default());
        assembler.on_fragment(fragment("solo", "bob@example.org", 1, 0, "hi"));
        assembler.on_fragment(fragment("pair", "bob@example.org", 2, 1, "b"));
        assembler.on_fragment(fragment("pair", "bob@example.org", 2, 0, "a"));
        assembler.on_fragment(fragment("open", "bob@example.org", 3, 0, "x"));
        assembler.flush_all_pending();
    });

    let entries = snapshot(&snapshotter);
    assert_eq!(
        counter(&entries, names::MESSAGES_ASSEMBLED, Some(("reason", reason.as_str()))),
        expected
    );
    assert_eq!(counter(&entries, names::FRAGMENTS_RECEIVED, None), 4);
}

#[test]
fn rejected_fragments_are_counted() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let assembler = FragmentAssembler::without_timer(&Config::default());
        assembler.on_fragment(fragment("bad", "bob@example.org", 0, 0, "x"));
        assembler.on_fragment(fragment("bad", "bob@example.org", 2, 7, "x"));
    });

    let entries = snapshot(&snapshotter);
    assert_eq!(counter(&entries, names::FRAGMENTS_REJECTED, None), 2);
}

#[test]
fn pending_gauge_tracks_open_buffers() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let assembler = FragmentAssembler::without_timer(&Config::default());
        assembler.on_fragment(fragment("a", "bob@example.org", 2, 0, "x"));
        assembler.on_fragment(fragment("b", "bob@example.org", 2, 0, "y"));
    });

    let gauge = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .find(|(key, _, _, _)| key.key().name() == names::PENDING_BUFFERS)
        .map(|(_, _, _, value)| value);
    assert!(
        matches!(gauge, Some(DebugValue::Gauge(v)) if (v.into_inner() - 2.0).abs() < f64::EPSILON),
        "unexpected gauge value: {gauge:?}"
    );
}
