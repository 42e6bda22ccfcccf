//! Diagnostics logged when inbound events are malformed or unexpected.
//!
//! Log capture is process-global, so every test here is serialised.

use jabber_events::{Config, FragmentAssembler, PresenceAggregator, PresenceUpdate, StatusPolicy};
use jabber_events_testing::{LoggerHandle, fragment, logger};
use rstest::rstest;
use serial_test::serial;

#[rstest]
#[case::zero_count(0, 0, "invalid fragment count")]
#[case::negative_index(3, -1, "out of range")]
#[case::index_past_end(3, 3, "out of range")]
#[serial(logging)]
fn malformed_fragment_is_logged_and_dropped(
    mut logger: LoggerHandle,
    #[case] count: i64,
    #[case] index: i64,
    #[case] needle: &str,
) {
    let assembler = FragmentAssembler::without_timer(&Config::default());
    logger.clear();

    assembler.on_fragment(fragment("bad", "bob@example.org", count, index, "x"));

    let warnings = logger.take_matching(log::Level::Warn, needle);
    assert_eq!(warnings.len(), 1, "expected one warning containing {needle:?}");
    assert!(warnings[0].contains("bad"), "warning names the group");
    assert_eq!(assembler.pending_len(), 0);
}

#[rstest]
#[serial(logging)]
fn count_mismatch_is_logged(mut logger: LoggerHandle) {
    let assembler = FragmentAssembler::without_timer(&Config::default());
    assembler.on_fragment(fragment("g", "bob@example.org", 3, 0, "a"));
    logger.clear();

    assembler.on_fragment(fragment("g", "bob@example.org", 5, 1, "b"));

    assert_eq!(logger.take_matching(log::Level::Warn, "buffered 3").len(), 1);
    assert_eq!(assembler.pending_len(), 1);
}

#[rstest]
#[serial(logging)]
fn evicting_oldest_buffer_is_logged(mut logger: LoggerHandle) {
    let config = Config::builder()
        .max_pending(1)
        .build()
        .expect("valid configuration");
    let assembler = FragmentAssembler::without_timer(&config);
    assembler.on_fragment(fragment("first", "bob@example.org", 2, 0, "a"));
    logger.clear();

    assembler.on_fragment(fragment("second", "bob@example.org", 2, 0, "b"));

    let warnings = logger.take_matching(log::Level::Warn, "pending message limit");
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("group=first"));
}

#[rstest]
#[serial(logging)]
fn unknown_status_is_logged_and_ranked_as_fallback(mut logger: LoggerHandle) {
    let aggregator = PresenceAggregator::new(StatusPolicy::jabber());
    logger.clear();

    aggregator.update(PresenceUpdate::new("alice@example.org", "phone", "sleepy", None));

    let warnings = logger.take_matching(log::Level::Warn, "unknown presence status");
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("resource=phone"));
    assert_eq!(
        aggregator
            .current_status(&"alice@example.org".into())
            .kind
            .as_str(),
        "unknown"
    );
}
