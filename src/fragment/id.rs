use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// Identifier shared by every fragment of one logical message.
///
/// This is the multipart id carried by the stanza; peers choose it, so it is
/// an arbitrary string.
///
/// # Examples
///
/// ```
/// use jabber_events::fragment::FragmentId;
/// let id = FragmentId::new("g1");
/// assert_eq!(id.as_str(), "g1");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FragmentId(Arc<str>);

impl FragmentId {
    /// Create a new identifier.
    #[must_use]
    pub fn new(value: impl AsRef<str>) -> Self { Self(Arc::from(value.as_ref())) }

    /// Borrow the textual identifier.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Debug for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:?}", &*self.0) }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for FragmentId {
    fn from(value: &str) -> Self { Self::new(value) }
}

impl From<String> for FragmentId {
    fn from(value: String) -> Self { Self(Arc::from(value)) }
}

impl From<FragmentId> for String {
    fn from(value: FragmentId) -> Self { value.0.to_string() }
}
