//! Status kinds and the importance table used to rank them.
//!
//! A [`StatusKind`] is an opaque identifier such as `away` or `dnd`. Its
//! meaning comes entirely from the [`StatusPolicy`] handed to the
//! aggregator: the policy maps each kind to an [`Importance`], names the
//! kind that means "offline", and names the fallback used for kinds it has
//! never heard of.

use std::{collections::HashMap, fmt, sync::Arc};

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque presence status identifier.
///
/// # Examples
///
/// ```
/// use jabber_events::status::StatusKind;
/// let kind = StatusKind::new("away");
/// assert_eq!(kind.as_str(), "away");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct StatusKind(Arc<str>);

impl StatusKind {
    /// Create a status kind from its identifier.
    #[must_use]
    pub fn new(kind: impl AsRef<str>) -> Self { Self(Arc::from(kind.as_ref())) }

    /// Borrow the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Debug for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:?}", &*self.0) }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for StatusKind {
    fn from(value: &str) -> Self { Self::new(value) }
}

impl From<String> for StatusKind {
    fn from(value: String) -> Self { Self(Arc::from(value)) }
}

impl From<StatusKind> for String {
    fn from(value: StatusKind) -> Self { value.0.to_string() }
}

/// Rank of a status kind; higher means more available.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    From,
    Into,
    Serialize,
    Deserialize,
)]
#[display("{_0}")]
#[serde(transparent)]
pub struct Importance(u8);

impl Importance {
    /// Importance reserved for the offline kind.
    pub const OFFLINE: Self = Self(0);

    /// Construct an importance from its numeric rank.
    #[must_use]
    pub const fn new(value: u8) -> Self { Self(value) }

    /// Return the numeric rank.
    #[must_use]
    pub const fn get(self) -> u8 { self.0 }
}

/// Identifier of the offline kind in the default Jabber policy.
pub const OFFLINE: &str = "offline";
/// Identifier of the fallback kind in the default Jabber policy.
pub const UNKNOWN: &str = "unknown";

const JABBER_TABLE: [(&str, u8); 7] = [
    (OFFLINE, 0),
    (UNKNOWN, 1),
    ("dnd", 30),
    ("xa", 35),
    ("away", 40),
    ("available", 65),
    ("chat", 85),
];

/// Problems detected while assembling a [`StatusPolicy`].
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The offline kind is absent from the table.
    #[error("offline kind {0} is not in the status table")]
    MissingOffline(StatusKind),
    /// The offline kind does not carry importance zero.
    #[error("offline kind {kind} must have importance 0, found {found}")]
    OfflineNotLowest {
        /// Configured offline kind.
        kind: StatusKind,
        /// Importance found in the table.
        found: Importance,
    },
    /// The fallback kind is absent from the table.
    #[error("fallback kind {0} is not in the status table")]
    MissingFallback(StatusKind),
    /// The fallback kind is the offline kind.
    #[error("fallback kind {0} must not be the offline kind")]
    FallbackIsOffline(StatusKind),
    /// Another online kind shares importance zero with offline.
    #[error("kind {0} shares importance 0 with the offline kind")]
    ZeroImportance(StatusKind),
    /// An online kind ranks below the fallback kind, so unknown kinds would
    /// outrank it.
    #[error("kind {kind} ranks below fallback kind {fallback}")]
    FallbackNotLowest {
        /// Configured fallback kind.
        fallback: StatusKind,
        /// Online kind ranked below it.
        kind: StatusKind,
    },
}

/// Raw form of a policy, as found in configuration files.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PolicyTable {
    /// Importance of every known kind.
    pub ranks: HashMap<StatusKind, Importance>,
    /// Kind meaning "no live resource".
    pub offline: StatusKind,
    /// Kind substituted for unknown kinds.
    pub fallback: StatusKind,
}

/// Importance table used to order status kinds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PolicyTable", into = "PolicyTable")]
pub struct StatusPolicy {
    ranks: HashMap<StatusKind, Importance>,
    offline: StatusKind,
    fallback: StatusKind,
}

impl StatusPolicy {
    /// Build a policy from an explicit table.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] if the offline or fallback kinds are missing,
    /// if offline is not ranked zero, if any other kind is ranked zero, or if
    /// an online kind ranks below the fallback.
    pub fn new(
        ranks: impl IntoIterator<Item = (StatusKind, Importance)>,
        offline: StatusKind,
        fallback: StatusKind,
    ) -> Result<Self, PolicyError> {
        let ranks: HashMap<_, _> = ranks.into_iter().collect();
        match ranks.get(&offline) {
            None => return Err(PolicyError::MissingOffline(offline)),
            Some(&found) if found != Importance::OFFLINE => {
                return Err(PolicyError::OfflineNotLowest {
                    kind: offline,
                    found,
                });
            }
            Some(_) => {}
        }
        if fallback == offline {
            return Err(PolicyError::FallbackIsOffline(fallback));
        }
        if !ranks.contains_key(&fallback) {
            return Err(PolicyError::MissingFallback(fallback));
        }
        if let Some((kind, _)) = ranks
            .iter()
            .find(|(kind, rank)| **kind != offline && **rank == Importance::OFFLINE)
        {
            return Err(PolicyError::ZeroImportance(kind.clone()));
        }
        let floor = ranks[&fallback];
        if let Some((kind, _)) = ranks
            .iter()
            .find(|(kind, rank)| **kind != offline && **rank < floor)
        {
            return Err(PolicyError::FallbackNotLowest {
                fallback,
                kind: kind.clone(),
            });
        }
        Ok(Self {
            ranks,
            offline,
            fallback,
        })
    }

    /// The default Jabber table (`offline`, `unknown`, `dnd`, `xa`, `away`,
    /// `available`, `chat`).
    #[must_use]
    pub fn jabber() -> Self {
        Self {
            ranks: JABBER_TABLE
                .iter()
                .map(|&(kind, rank)| (StatusKind::new(kind), Importance::new(rank)))
                .collect(),
            offline: StatusKind::new(OFFLINE),
            fallback: StatusKind::new(UNKNOWN),
        }
    }

    /// Kind meaning "no live resource".
    #[must_use]
    pub fn offline(&self) -> &StatusKind { &self.offline }

    /// Kind substituted for unknown kinds.
    #[must_use]
    pub fn fallback(&self) -> &StatusKind { &self.fallback }

    /// Return whether `kind` is the offline kind.
    #[must_use]
    pub fn is_offline(&self, kind: &StatusKind) -> bool { *kind == self.offline }

    /// Look up the importance of `kind`, if the table knows it.
    #[must_use]
    pub fn importance(&self, kind: &StatusKind) -> Option<Importance> {
        self.ranks.get(kind).copied()
    }

    /// Resolve `kind` against the table.
    ///
    /// Unknown kinds are replaced by the fallback kind. The returned flag is
    /// `true` when the substitution happened.
    #[must_use]
    pub fn resolve(&self, kind: StatusKind) -> (StatusKind, Importance, bool) {
        match self.ranks.get(&kind) {
            Some(&rank) => (kind, rank, false),
            None => {
                let rank = self.ranks.get(&self.fallback).copied().unwrap_or_default();
                (self.fallback.clone(), rank, true)
            }
        }
    }
}

impl Default for StatusPolicy {
    fn default() -> Self { Self::jabber() }
}

impl Default for Importance {
    fn default() -> Self { Self::OFFLINE }
}

impl TryFrom<PolicyTable> for StatusPolicy {
    type Error = PolicyError;

    fn try_from(table: PolicyTable) -> Result<Self, Self::Error> {
        Self::new(table.ranks, table.offline, table.fallback)
    }
}

impl From<StatusPolicy> for PolicyTable {
    fn from(policy: StatusPolicy) -> Self {
        Self {
            ranks: policy.ranks,
            offline: policy.offline,
            fallback: policy.fallback,
        }
    }
}
