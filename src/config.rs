//! Engine configuration.
//!
//! [`Config`] bundles the fragment flush timeout, the placeholder used for
//! missing fragments, the buffering limits and the [`StatusPolicy`]. Build it
//! with [`Config::builder`], take the Jabber defaults from
//! [`Config::default`], or deserialise it from a host configuration file
//! (timeouts in milliseconds).

use std::{num::NonZeroUsize, time::Duration};

use serde::Deserialize;
use static_assertions::const_assert;

use crate::{error::ConfigError, fragment::FragmentCount, status::StatusPolicy};

/// Default delay before an incomplete message is flushed.
pub const DEFAULT_FRAGMENT_TIMEOUT: Duration = Duration::from_millis(300_000);
/// Default text standing in for a missing fragment.
pub const DEFAULT_PLACEHOLDER: &str = "...";
/// Default cap on simultaneously buffered messages.
pub const DEFAULT_MAX_PENDING: usize = 1024;
/// Default cap on the fragments one message may declare.
pub const DEFAULT_MAX_FRAGMENTS: u32 = 256;
/// Highest supported value for [`ConfigBuilder::max_fragments`].
pub const MAX_FRAGMENTS_LIMIT: u32 = 65_535;

const_assert!(DEFAULT_MAX_FRAGMENTS <= MAX_FRAGMENTS_LIMIT);
const_assert!(DEFAULT_MAX_PENDING > 0);

/// Validated engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ConfigFile")]
pub struct Config {
    fragment_timeout: Duration,
    placeholder: String,
    max_pending: NonZeroUsize,
    max_fragments: FragmentCount,
    status_policy: StatusPolicy,
}

impl Config {
    /// Start building a configuration from the defaults.
    #[must_use]
    pub fn builder() -> ConfigBuilder { ConfigBuilder::default() }

    /// Delay between a message's first fragment and its forced flush.
    #[must_use]
    pub fn fragment_timeout(&self) -> Duration { self.fragment_timeout }

    /// Text substituted for missing fragments.
    #[must_use]
    pub fn placeholder(&self) -> &str { &self.placeholder }

    /// Maximum number of messages buffered at once.
    #[must_use]
    pub fn max_pending(&self) -> NonZeroUsize { self.max_pending }

    /// Maximum fragment count one message may declare.
    #[must_use]
    pub fn max_fragments(&self) -> FragmentCount { self.max_fragments }

    /// Importance table for presence aggregation.
    #[must_use]
    pub fn status_policy(&self) -> &StatusPolicy { &self.status_policy }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fragment_timeout: DEFAULT_FRAGMENT_TIMEOUT,
            placeholder: DEFAULT_PLACEHOLDER.to_owned(),
            max_pending: NonZeroUsize::new(DEFAULT_MAX_PENDING).unwrap_or(NonZeroUsize::MIN),
            max_fragments: FragmentCount::try_from(i64::from(DEFAULT_MAX_FRAGMENTS))
                .unwrap_or(FragmentCount::ONE),
            status_policy: StatusPolicy::default(),
        }
    }
}

/// Builder for [`Config`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use jabber_events::Config;
///
/// let config = Config::builder()
///     .fragment_timeout(Duration::from_secs(30))
///     .placeholder("[missing]")
///     .build()
///     .expect("valid configuration");
/// assert_eq!(config.placeholder(), "[missing]");
/// ```
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    fragment_timeout: Duration,
    placeholder: String,
    max_pending: usize,
    max_fragments: u32,
    status_policy: StatusPolicy,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            fragment_timeout: DEFAULT_FRAGMENT_TIMEOUT,
            placeholder: DEFAULT_PLACEHOLDER.to_owned(),
            max_pending: DEFAULT_MAX_PENDING,
            max_fragments: DEFAULT_MAX_FRAGMENTS,
            status_policy: StatusPolicy::default(),
        }
    }
}

impl ConfigBuilder {
    /// Set the flush timeout for incomplete messages.
    #[must_use]
    pub fn fragment_timeout(mut self, timeout: Duration) -> Self {
        self.fragment_timeout = timeout;
        self
    }

    /// Set the text substituted for missing fragments.
    #[must_use]
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Set the maximum number of messages buffered at once.
    #[must_use]
    pub fn max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }

    /// Set the maximum fragment count one message may declare.
    #[must_use]
    pub fn max_fragments(mut self, max_fragments: u32) -> Self {
        self.max_fragments = max_fragments;
        self
    }

    /// Set the importance table.
    #[must_use]
    pub fn status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    /// Validate and produce the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a zero timeout, a zero pending limit, or a
    /// fragment limit outside `1..=MAX_FRAGMENTS_LIMIT`.
    pub fn build(self) -> Result<Config, ConfigError> {
        if self.fragment_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        let max_pending = NonZeroUsize::new(self.max_pending).ok_or(ConfigError::ZeroPending)?;
        let max_fragments = FragmentCount::try_from(i64::from(self.max_fragments))
            .ok()
            .filter(|count| count.get() <= MAX_FRAGMENTS_LIMIT)
            .ok_or(ConfigError::InvalidMaxFragments(self.max_fragments))?;
        Ok(Config {
            fragment_timeout: self.fragment_timeout,
            placeholder: self.placeholder,
            max_pending,
            max_fragments,
            status_policy: self.status_policy,
        })
    }
}

/// On-disk form of [`Config`]; omitted fields take their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    fragment_timeout_ms: Option<u64>,
    placeholder: Option<String>,
    max_pending: Option<usize>,
    max_fragments: Option<u32>,
    status_policy: Option<StatusPolicy>,
}

impl TryFrom<ConfigFile> for Config {
    type Error = ConfigError;

    fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
        let mut builder = Config::builder();
        if let Some(ms) = file.fragment_timeout_ms {
            builder = builder.fragment_timeout(Duration::from_millis(ms));
        }
        if let Some(placeholder) = file.placeholder {
            builder = builder.placeholder(placeholder);
        }
        if let Some(max_pending) = file.max_pending {
            builder = builder.max_pending(max_pending);
        }
        if let Some(max_fragments) = file.max_fragments {
            builder = builder.max_fragments(max_fragments);
        }
        if let Some(policy) = file.status_policy {
            builder = builder.status_policy(policy);
        }
        builder.build()
    }
}
