//! Metric helpers for `jabber_events`.
//!
//! This module defines metric names and simple helper functions
//! wrapping the [`metrics`](https://docs.rs/metrics) crate. When the
//! `metrics` feature is disabled the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

use crate::fragment::FlushReason;

/// Name of the counter tracking presence updates received.
pub const PRESENCE_UPDATES: &str = "jabber_events_presence_updates_total";
/// Name of the counter tracking aggregate status notifications.
pub const STATUS_CHANGES: &str = "jabber_events_status_changes_total";
/// Name of the counter tracking message fragments received.
pub const FRAGMENTS_RECEIVED: &str = "jabber_events_fragments_received_total";
/// Name of the counter tracking fragments discarded as malformed.
pub const FRAGMENTS_REJECTED: &str = "jabber_events_fragments_rejected_total";
/// Name of the counter tracking assembled messages.
pub const MESSAGES_ASSEMBLED: &str = "jabber_events_messages_assembled_total";
/// Name of the gauge tracking partially assembled messages.
pub const PENDING_BUFFERS: &str = "jabber_events_pending_buffers";

/// Record a received presence update.
pub fn inc_presence_updates() {
    #[cfg(feature = "metrics")]
    counter!(PRESENCE_UPDATES).increment(1);
}

/// Record an emitted aggregate status notification.
pub fn inc_status_changes() {
    #[cfg(feature = "metrics")]
    counter!(STATUS_CHANGES).increment(1);
}

/// Record a received fragment.
pub fn inc_fragments() {
    #[cfg(feature = "metrics")]
    counter!(FRAGMENTS_RECEIVED).increment(1);
}

/// Record a discarded fragment.
pub fn inc_rejected_fragments() {
    #[cfg(feature = "metrics")]
    counter!(FRAGMENTS_REJECTED).increment(1);
}

/// Record an assembled message and why it was flushed.
pub fn inc_assembled(reason: FlushReason) {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_ASSEMBLED, "reason" => reason.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = reason;
}

/// Publish the number of outstanding fragment buffers.
#[cfg_attr(
    feature = "metrics",
    expect(
        clippy::cast_precision_loss,
        reason = "buffer counts stay far below f64 precision limits"
    )
)]
pub fn set_pending(pending: usize) {
    #[cfg(feature = "metrics")]
    gauge!(PENDING_BUFFERS).set(pending as f64);
    #[cfg(not(feature = "metrics"))]
    let _ = pending;
}
