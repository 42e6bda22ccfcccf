//! Synchronous core that stitches fragments back into complete messages.
//!
//! [`Reassembler`] keeps one [`FragmentBuffer`] per [`FragmentId`], fills
//! slots as fragments arrive in any order, and assembles a message once every
//! slot is filled. Incomplete buffers are flushed with a placeholder for each
//! missing fragment, either by a timer (see
//! [`FlushScheduler`](crate::fragment::FlushScheduler)), by an explicit sweep
//! with [`Reassembler::flush_expired_at`], or when the session closes.
//!
//! Every flush path removes the buffer from the registry before assembling
//! it, so each buffer is flushed at most once. Timer-driven flushes also
//! carry the buffer's generation and are ignored if the group id has since
//! been reused by a newer buffer.

use std::{
    collections::HashMap,
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use log::debug;
use tokio_util::sync::CancellationToken;

use super::{
    FlushReason,
    FragmentBuffer,
    FragmentCount,
    FragmentError,
    FragmentId,
    FragmentIndex,
    MessageAssembled,
    MessageFragment,
};

/// Deadline registration for a newly created buffer.
#[derive(Clone, Debug)]
pub struct FlushTimer {
    pub group: FragmentId,
    pub generation: u64,
    pub deadline: Instant,
    /// Cancelled as soon as the buffer is flushed by any other path.
    pub token: CancellationToken,
}

/// What happened to an accepted fragment.
#[derive(Debug)]
pub enum Progress {
    /// Stored in its buffer. Carries a timer when the fragment created the
    /// buffer.
    Buffered(Option<FlushTimer>),
    /// The fragment completed its message.
    Assembled(MessageAssembled),
}

/// Result of accepting a fragment.
#[derive(Debug)]
pub struct Pushed {
    pub progress: Progress,
    /// Oldest buffer force-flushed to stay within the pending limit.
    pub evicted: Option<MessageAssembled>,
}

/// Stateful fragment re-assembler with deadline-based flushing.
#[derive(Debug)]
pub struct Reassembler {
    timeout: Duration,
    placeholder: String,
    max_pending: NonZeroUsize,
    max_fragments: FragmentCount,
    buffers: HashMap<FragmentId, FragmentBuffer>,
    next_generation: u64,
}

impl Reassembler {
    /// Create a re-assembler flushing incomplete messages `timeout` after
    /// their first fragment, with `placeholder` standing in for missing
    /// fragments.
    ///
    /// At most `max_pending` messages are buffered at once and a message may
    /// declare at most `max_fragments` fragments.
    #[must_use]
    pub fn new(
        timeout: Duration,
        placeholder: impl Into<String>,
        max_pending: NonZeroUsize,
        max_fragments: FragmentCount,
    ) -> Self {
        Self {
            timeout,
            placeholder: placeholder.into(),
            max_pending,
            max_fragments,
            buffers: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Delay between a buffer's creation and its forced flush.
    #[must_use]
    pub fn timeout(&self) -> Duration { self.timeout }

    /// Text substituted for missing fragments.
    #[must_use]
    pub fn placeholder(&self) -> &str { &self.placeholder }

    /// Process a fragment using the current time.
    ///
    /// # Errors
    ///
    /// See [`Reassembler::push_at`].
    pub fn push(&mut self, fragment: MessageFragment) -> Result<Pushed, FragmentError> {
        self.push_at(fragment, Instant::now())
    }

    /// Process a fragment using an explicit clock reading.
    ///
    /// A fragment for an unseen group with a count of one is assembled
    /// immediately without buffering. Otherwise the fragment is stored at its
    /// index, creating the buffer (and its flush deadline `now + timeout`) if
    /// needed, and the message is assembled as soon as every slot is filled.
    /// A repeated index replaces the earlier body.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentError::InvalidCount`] for a count outside
    /// `1..=max_fragments`, [`FragmentError::IndexOutOfRange`] for an index
    /// outside `0..count`, and [`FragmentError::CountMismatch`] when the count
    /// disagrees with the buffered group. Nothing is stored on error.
    pub fn push_at(
        &mut self,
        fragment: MessageFragment,
        now: Instant,
    ) -> Result<Pushed, FragmentError> {
        let MessageFragment {
            group,
            total_count,
            index,
            body,
            envelope,
        } = fragment;

        if let Some(buffer) = self.buffers.get_mut(&group) {
            let count = buffer.count();
            if i64::from(count.get()) != total_count {
                return Err(FragmentError::CountMismatch {
                    group,
                    expected: count.get(),
                    found: total_count,
                });
            }
            let Some(slot) = FragmentIndex::within(index, count) else {
                return Err(FragmentError::IndexOutOfRange {
                    group,
                    index,
                    count: count.get(),
                });
            };
            if buffer.insert(slot, body).is_some() {
                debug!("duplicate fragment replaced earlier body: group={group}, index={slot}");
            }
            if !buffer.is_complete() {
                return Ok(Pushed {
                    progress: Progress::Buffered(None),
                    evicted: None,
                });
            }
            let progress = match self.take(&group) {
                Some(buffer) => {
                    Progress::Assembled(buffer.assemble(&self.placeholder, FlushReason::Complete))
                }
                None => Progress::Buffered(None),
            };
            return Ok(Pushed {
                progress,
                evicted: None,
            });
        }

        let count = FragmentCount::try_from(total_count)
            .ok()
            .filter(|count| *count <= self.max_fragments)
            .ok_or_else(|| FragmentError::InvalidCount {
                group: group.clone(),
                count: total_count,
            })?;
        let Some(slot) = FragmentIndex::within(index, count) else {
            return Err(FragmentError::IndexOutOfRange {
                group,
                index,
                count: count.get(),
            });
        };

        let generation = self.next_generation;
        self.next_generation += 1;
        let mut buffer = FragmentBuffer::new(
            group.clone(),
            count,
            envelope,
            now + self.timeout,
            generation,
        );
        buffer.insert(slot, body);
        if buffer.is_complete() {
            return Ok(Pushed {
                progress: Progress::Assembled(
                    buffer.assemble(&self.placeholder, FlushReason::Complete),
                ),
                evicted: None,
            });
        }

        let evicted = if self.buffers.len() >= self.max_pending.get() {
            self.evict_oldest()
        } else {
            None
        };
        let timer = FlushTimer {
            group: group.clone(),
            generation,
            deadline: buffer.deadline(),
            token: buffer.timer().clone(),
        };
        self.buffers.insert(group, buffer);
        Ok(Pushed {
            progress: Progress::Buffered(Some(timer)),
            evicted,
        })
    }

    /// Flush `group` because its timer fired.
    ///
    /// Does nothing if the buffer is gone or if `group` now names a newer
    /// buffer than the one the timer was armed for.
    pub fn flush_timed_out(
        &mut self,
        group: &FragmentId,
        generation: u64,
    ) -> Option<MessageAssembled> {
        if self.buffers.get(group)?.generation() != generation {
            debug!("stale flush timer ignored: group={group}, generation={generation}");
            return None;
        }
        self.take(group)
            .map(|buffer| buffer.assemble(&self.placeholder, FlushReason::TimedOut))
    }

    /// Force the flush of one group, whatever its state.
    pub fn flush(&mut self, group: &FragmentId) -> Option<MessageAssembled> {
        self.take(group)
            .map(|buffer| buffer.assemble(&self.placeholder, FlushReason::Forced))
    }

    /// Flush every buffer whose deadline is at or before `now`, earliest
    /// deadline first.
    pub fn flush_expired_at(&mut self, now: Instant) -> Vec<MessageAssembled> {
        let mut expired: Vec<(Instant, FragmentId)> = self
            .buffers
            .iter()
            .filter(|(_, buffer)| buffer.deadline() <= now)
            .map(|(group, buffer)| (buffer.deadline(), group.clone()))
            .collect();
        expired.sort();
        let buffers: Vec<FragmentBuffer> = expired
            .into_iter()
            .filter_map(|(_, group)| self.take(&group))
            .collect();
        buffers
            .into_iter()
            .map(|buffer| buffer.assemble(&self.placeholder, FlushReason::TimedOut))
            .collect()
    }

    /// Flush every outstanding buffer, earliest deadline first.
    pub fn flush_all(&mut self) -> Vec<MessageAssembled> {
        let mut buffers: Vec<FragmentBuffer> = self.buffers.drain().map(|(_, b)| b).collect();
        buffers.sort_by_key(FragmentBuffer::deadline);
        buffers
            .into_iter()
            .map(|buffer| buffer.assemble(&self.placeholder, FlushReason::Forced))
            .collect()
    }

    /// Number of messages currently buffered.
    #[must_use]
    pub fn pending_len(&self) -> usize { self.buffers.len() }

    /// Return whether `group` currently has a buffer.
    #[must_use]
    pub fn is_pending(&self, group: &FragmentId) -> bool { self.buffers.contains_key(group) }

    /// Earliest pending deadline, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.buffers.values().map(FragmentBuffer::deadline).min()
    }

    fn take(&mut self, group: &FragmentId) -> Option<FragmentBuffer> { self.buffers.remove(group) }

    fn evict_oldest(&mut self) -> Option<MessageAssembled> {
        let oldest = self
            .buffers
            .iter()
            .min_by_key(|(_, buffer)| (buffer.deadline(), buffer.generation()))
            .map(|(group, _)| group.clone())?;
        self.take(&oldest)
            .map(|buffer| buffer.assemble(&self.placeholder, FlushReason::Forced))
    }
}
