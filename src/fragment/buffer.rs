//! Slots of one partially received message.

use std::time::Instant;

use tokio_util::sync::CancellationToken;

use super::{
    Envelope,
    FlushReason,
    FragmentCount,
    FragmentId,
    FragmentIndex,
    MessageAssembled,
};

/// Fragments received so far for one group.
///
/// A buffer starts with every slot empty, fills slots as fragments arrive,
/// and is consumed by [`FragmentBuffer::assemble`] exactly once.
#[derive(Debug)]
pub struct FragmentBuffer {
    group: FragmentId,
    count: FragmentCount,
    slots: Vec<Option<String>>,
    filled: u32,
    envelope: Envelope,
    deadline: Instant,
    generation: u64,
    timer: CancellationToken,
}

impl FragmentBuffer {
    /// Create an empty buffer for `count` fragments.
    #[must_use]
    pub fn new(
        group: FragmentId,
        count: FragmentCount,
        envelope: Envelope,
        deadline: Instant,
        generation: u64,
    ) -> Self {
        Self {
            group,
            count,
            slots: vec![None; count.as_usize()],
            filled: 0,
            envelope,
            deadline,
            generation,
            timer: CancellationToken::new(),
        }
    }

    /// Store `body` at `index`, returning the body it replaced, if any.
    ///
    /// `index` must already be validated against the buffer's count.
    pub(super) fn insert(&mut self, index: FragmentIndex, body: String) -> Option<String> {
        let previous = self.slots[index.as_usize()].replace(body);
        if previous.is_none() {
            self.filled += 1;
        }
        previous
    }

    /// Return whether every slot holds a fragment.
    #[must_use]
    pub fn is_complete(&self) -> bool { self.filled == self.count.get() }

    /// Declared fragment count.
    #[must_use]
    pub fn count(&self) -> FragmentCount { self.count }

    /// Number of slots filled so far.
    #[must_use]
    pub fn filled(&self) -> u32 { self.filled }

    /// Instant after which the buffer is flushed incomplete.
    #[must_use]
    pub fn deadline(&self) -> Instant { self.deadline }

    /// Incarnation number distinguishing buffers that reuse one group id.
    #[must_use]
    pub fn generation(&self) -> u64 { self.generation }

    /// Token cancelled once the buffer is consumed.
    #[must_use]
    pub fn timer(&self) -> &CancellationToken { &self.timer }

    /// Concatenate the slots in order, substituting `placeholder` for any
    /// missing fragment.
    ///
    /// Consuming the buffer cancels its timer token.
    #[must_use]
    pub fn assemble(self, placeholder: &str, reason: FlushReason) -> MessageAssembled {
        self.timer.cancel();
        let was_truncated = !self.is_complete();
        let body = self
            .slots
            .iter()
            .map(|slot| slot.as_deref().unwrap_or(placeholder))
            .collect::<String>();
        MessageAssembled {
            group: self.group,
            sender: self.envelope.sender,
            body,
            timestamp: self.envelope.timestamp,
            carbon: self.envelope.carbon,
            offline_relayed: self.envelope.offline_relayed,
            was_truncated,
            fragments_received: self.filled,
            fragments_expected: self.count.get(),
            reason,
        }
    }
}
