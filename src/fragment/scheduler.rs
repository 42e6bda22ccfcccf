//! Single background task firing fragment flush deadlines.
//!
//! Rather than one timer per buffer, [`FlushScheduler`] keeps every pending
//! [`FlushTimer`] in a min-heap ordered by deadline and sleeps until the
//! earliest one. Timers whose token was cancelled (because the buffer
//! completed or was flushed some other way) are skipped when they surface.
//! Cancellation and firing may still race; the callback is expected to
//! tolerate a buffer that is already gone.

use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
    sync::Arc,
};

use log::debug;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

use super::{FlushTimer, FragmentId};

// Completed buffers leave cancelled timers behind; sweep them out regularly
// so the heap tracks live buffers rather than recent traffic.
const PRUNE_EVERY: u64 = 256;

/// Callback invoked with the group and generation of an expired buffer.
pub type FireFn = Arc<dyn Fn(FragmentId, u64) + Send + Sync>;

struct Scheduled {
    deadline: Instant,
    order: u64,
    timer: FlushTimer,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool { self.cmp(other) == Ordering::Equal }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.deadline, self.order).cmp(&(other.deadline, other.order))
    }
}

/// Handle to the flush deadline task.
///
/// Dropping the handle stops the task; pending timers are abandoned.
#[derive(Debug)]
pub struct FlushScheduler {
    tx: mpsc::UnboundedSender<FlushTimer>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl FlushScheduler {
    /// Spawn the deadline task on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, like [`tokio::spawn`].
    #[must_use]
    pub fn spawn(on_fire: FireFn) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run(rx, shutdown.clone(), on_fire));
        Self {
            tx,
            shutdown,
            task: Some(task),
        }
    }

    /// Register a deadline.
    ///
    /// Returns `false` if the task has already stopped.
    pub fn schedule(&self, timer: FlushTimer) -> bool {
        if self.tx.send(timer).is_err() {
            debug!("flush scheduler stopped; deadline not registered");
            return false;
        }
        true
    }

    /// Stop the task without firing pending timers.
    pub fn shutdown(&self) { self.shutdown.cancel(); }

    /// Stop the task and wait for it to exit.
    pub async fn join(mut self) {
        self.shutdown.cancel();
        let Some(task) = self.task.take() else {
            return;
        };
        if let Err(err) = task.await {
            debug!("flush scheduler task ended abnormally: {err}");
        }
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) { self.shutdown.cancel(); }
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<FlushTimer>,
    shutdown: CancellationToken,
    on_fire: FireFn,
) {
    let mut heap: BinaryHeap<Reverse<Scheduled>> = BinaryHeap::new();
    let mut order = 0_u64;
    loop {
        let next = heap.peek().map(|Reverse(entry)| entry.deadline);
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            received = rx.recv() => {
                let Some(timer) = received else { break };
                heap.push(Reverse(Scheduled {
                    deadline: Instant::from_std(timer.deadline),
                    order,
                    timer,
                }));
                order += 1;
                if order % PRUNE_EVERY == 0 {
                    heap.retain(|Reverse(entry)| !entry.timer.token.is_cancelled());
                }
            }
            () = time::sleep_until(next.unwrap_or_else(Instant::now)), if next.is_some() => {
                fire_due(&mut heap, &on_fire);
            }
        }
    }
    debug!("flush scheduler stopped: abandoned={}", heap.len());
}

fn fire_due(heap: &mut BinaryHeap<Reverse<Scheduled>>, on_fire: &FireFn) {
    let now = Instant::now();
    while let Some(Reverse(entry)) = heap.peek() {
        if entry.deadline > now {
            break;
        }
        let Some(Reverse(entry)) = heap.pop() else {
            break;
        };
        if entry.timer.token.is_cancelled() {
            continue;
        }
        on_fire(entry.timer.group, entry.timer.generation);
    }
}
