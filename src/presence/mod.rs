//! Multi-resource presence aggregation.
//!
//! A contact may be signed in from several resources at once. The
//! [`PresenceAggregator`] keeps every live resource in a
//! [`ContactPresenceSet`] and reports the single status a user expects to
//! see, notifying listeners only when that status actually changes.

pub mod aggregator;
pub mod set;
pub mod types;

pub use aggregator::PresenceAggregator;
pub use set::ContactPresenceSet;
pub use types::{
    AggregateStatus,
    ContactId,
    ContactStatusChanged,
    PresenceUpdate,
    ResourceChange,
    ResourceChanged,
    ResourceName,
    ResourcePresence,
};
