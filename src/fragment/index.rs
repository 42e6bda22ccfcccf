//! Fragment positions and counts.
//!
//! Both arrive as untrusted signed integers in stanza attributes.
//! [`FragmentCount`] and [`FragmentIndex`] are the validated forms: a count
//! is at least one and an index is below its count.

use std::num::NonZeroU32;

use derive_more::{Display, From};

/// Zero-based position of a fragment within its message.
///
/// # Examples
///
/// ```
/// use jabber_events::fragment::{FragmentCount, FragmentIndex};
/// let count = FragmentCount::try_from(3_i64).expect("positive count");
/// assert_eq!(FragmentIndex::within(2, count), Some(FragmentIndex::new(2)));
/// assert_eq!(FragmentIndex::within(3, count), None);
/// assert_eq!(FragmentIndex::within(-1, count), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From)]
#[display("{_0}")]
pub struct FragmentIndex(u32);

impl FragmentIndex {
    /// Construct an index from a `u32` value.
    #[must_use]
    pub const fn new(value: u32) -> Self { Self(value) }

    /// Return the underlying numeric value.
    #[must_use]
    pub const fn get(self) -> u32 { self.0 }

    /// Validate a raw index against `count`.
    #[must_use]
    pub fn within(raw: i64, count: FragmentCount) -> Option<Self> {
        u32::try_from(raw)
            .ok()
            .filter(|&index| index < count.get())
            .map(Self)
    }

    /// Position usable for slice indexing.
    #[must_use]
    pub fn as_usize(self) -> usize { self.0 as usize }
}

/// Declared number of fragments in a message; never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{_0}")]
pub struct FragmentCount(NonZeroU32);

impl FragmentCount {
    /// Count of a message sent in one piece.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Return the numeric count.
    #[must_use]
    pub const fn get(self) -> u32 { self.0.get() }

    /// Number of slots needed to hold every fragment.
    #[must_use]
    pub fn as_usize(self) -> usize { self.0.get() as usize }
}

impl TryFrom<i64> for FragmentCount {
    type Error = i64;

    /// Accept counts in `1..=u32::MAX`, returning the raw value otherwise.
    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        u32::try_from(raw)
            .ok()
            .and_then(NonZeroU32::new)
            .map(Self)
            .ok_or(raw)
    }
}

impl From<FragmentCount> for u32 {
    fn from(value: FragmentCount) -> Self { value.get() }
}
