//! Thread-safe fragment reassembly service.
//!
//! [`FragmentAssembler`] wraps a [`Reassembler`] behind a mutex, arms flush
//! deadlines on a shared [`FlushScheduler`], and fans assembled messages out
//! to its [`Listeners`]. Malformed fragments are logged and dropped; nothing
//! is reported back to the protocol callback that delivered them.
//!
//! Time is read from [`tokio::time::Instant`] so paused-clock tests and the
//! scheduler agree on deadlines.

use std::sync::{Arc, Mutex, Weak};

use log::{debug, warn};

use super::{
    Envelope,
    FlushReason,
    FlushScheduler,
    FragmentId,
    MessageAssembled,
    MessageFragment,
    Progress,
    Pushed,
    Reassembler,
};
use crate::{config::Config, listener::Listeners, metrics, sync::lock};

#[derive(Debug)]
struct Inner {
    reassembler: Mutex<Reassembler>,
    listeners: Listeners<MessageAssembled>,
    scheduler: Option<FlushScheduler>,
}

/// Reassembles fragmented messages for one session.
#[derive(Clone, Debug)]
pub struct FragmentAssembler {
    inner: Arc<Inner>,
}

impl FragmentAssembler {
    /// Create an assembler whose deadlines fire on a background task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn spawn(config: &Config) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let weak = weak.clone();
            let scheduler = FlushScheduler::spawn(Arc::new(move |group: FragmentId, generation| {
                if let Some(inner) = weak.upgrade() {
                    inner.flush_timed_out(&group, generation);
                }
            }));
            Inner {
                reassembler: Mutex::new(Self::reassembler(config)),
                listeners: Listeners::new(),
                scheduler: Some(scheduler),
            }
        });
        Self { inner }
    }

    /// Create an assembler without a deadline task.
    ///
    /// Incomplete messages are only flushed by [`flush_expired`](Self::flush_expired)
    /// or [`flush_all_pending`](Self::flush_all_pending), which the host must
    /// call itself.
    #[must_use]
    pub fn without_timer(config: &Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                reassembler: Mutex::new(Self::reassembler(config)),
                listeners: Listeners::new(),
                scheduler: None,
            }),
        }
    }

    fn reassembler(config: &Config) -> Reassembler {
        Reassembler::new(
            config.fragment_timeout(),
            config.placeholder(),
            config.max_pending(),
            config.max_fragments(),
        )
    }

    /// Listeners notified for every assembled message.
    #[must_use]
    pub fn listeners(&self) -> &Listeners<MessageAssembled> { &self.inner.listeners }

    /// Feed one received fragment.
    ///
    /// Malformed fragments are logged at `warn` and discarded. This never
    /// fails.
    pub fn on_fragment(&self, fragment: MessageFragment) {
        metrics::inc_fragments();
        let now = tokio::time::Instant::now().into_std();
        let (result, pending) = {
            let mut reassembler = lock(&self.inner.reassembler);
            let result = reassembler.push_at(fragment, now);
            (result, reassembler.pending_len())
        };
        metrics::set_pending(pending);

        let Pushed { progress, evicted } = match result {
            Ok(pushed) => pushed,
            Err(err) => {
                metrics::inc_rejected_fragments();
                warn!("discarding fragment: {err}");
                return;
            }
        };
        if let Some(message) = evicted {
            warn!(
                "pending message limit reached; flushing oldest: group={}",
                message.group
            );
            self.inner.emit(&message);
        }
        match progress {
            Progress::Buffered(Some(timer)) => match &self.inner.scheduler {
                Some(scheduler) => {
                    scheduler.schedule(timer);
                }
                None => debug!(
                    "no flush scheduler; deadline left to host: group={}",
                    timer.group
                ),
            },
            Progress::Buffered(None) => {}
            Progress::Assembled(message) => self.inner.emit(&message),
        }
    }

    /// Deliver a message that arrived in a single stanza.
    ///
    /// The message is emitted as a complete one-fragment message without
    /// consulting the registry, so a pending multipart message that happens
    /// to share `group` is left untouched.
    pub fn on_message(&self, group: FragmentId, body: String, envelope: Envelope) {
        let Envelope {
            sender,
            timestamp,
            carbon,
            offline_relayed,
        } = envelope;
        self.inner.emit(&MessageAssembled {
            group,
            sender,
            body,
            timestamp,
            carbon,
            offline_relayed,
            was_truncated: false,
            fragments_received: 1,
            fragments_expected: 1,
            reason: FlushReason::Complete,
        });
    }

    /// Flush every buffer whose deadline has passed.
    ///
    /// Returns the number of messages flushed.
    pub fn flush_expired(&self) -> usize {
        let now = tokio::time::Instant::now().into_std();
        let flushed = {
            let mut reassembler = lock(&self.inner.reassembler);
            let flushed = reassembler.flush_expired_at(now);
            metrics::set_pending(reassembler.pending_len());
            flushed
        };
        for message in &flushed {
            self.inner.emit(message);
        }
        flushed.len()
    }

    /// Flush every outstanding buffer now, typically before the session
    /// terminates, so no fragment is silently lost.
    ///
    /// Returns the number of messages flushed.
    pub fn flush_all_pending(&self) -> usize {
        let flushed = lock(&self.inner.reassembler).flush_all();
        metrics::set_pending(0);
        if !flushed.is_empty() {
            debug!("flushing pending messages: count={}", flushed.len());
        }
        for message in &flushed {
            self.inner.emit(message);
        }
        flushed.len()
    }

    /// Number of messages currently buffered.
    #[must_use]
    pub fn pending_len(&self) -> usize { lock(&self.inner.reassembler).pending_len() }

    /// Stop the deadline task, if any. Pending buffers stay until flushed.
    pub fn stop_timer(&self) {
        if let Some(scheduler) = &self.inner.scheduler {
            scheduler.shutdown();
        }
    }
}

impl Inner {
    fn flush_timed_out(&self, group: &FragmentId, generation: u64) {
        let (flushed, pending) = {
            let mut reassembler = lock(&self.reassembler);
            let flushed = reassembler.flush_timed_out(group, generation);
            (flushed, reassembler.pending_len())
        };
        metrics::set_pending(pending);
        if let Some(message) = flushed {
            debug!(
                "fragment deadline passed: group={group}, received={}/{}",
                message.fragments_received, message.fragments_expected
            );
            self.emit(&message);
        }
    }

    fn emit(&self, message: &MessageAssembled) {
        metrics::inc_assembled(message.reason);
        self.listeners.emit(message);
    }
}
