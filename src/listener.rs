//! Fan-out of emitted events to registered listeners.
//!
//! [`Listeners`] supports two styles of subscription: synchronous callbacks
//! registered with [`Listeners::add`], and channel subscriptions obtained from
//! [`Listeners::subscribe`]. Callbacks run on the emitting thread and must not
//! block; channel subscribers receive a clone of every event through an
//! unbounded Tokio channel and may consume it on any task.

use std::sync::{Arc, RwLock};

use log::debug;
use tokio::sync::mpsc;

use crate::sync::{read, write};

/// Boxed listener callback.
pub type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Handle identifying a registered callback, used to remove it again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Registered<E> {
    id: ListenerId,
    callback: Callback<E>,
}

struct Inner<E> {
    next_id: u64,
    callbacks: Vec<Registered<E>>,
    channels: Vec<mpsc::UnboundedSender<E>>,
}

/// Set of listeners interested in events of type `E`.
pub struct Listeners<E> {
    inner: RwLock<Inner<E>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_id: 0,
                callbacks: Vec::new(),
                channels: Vec::new(),
            }),
        }
    }
}

impl<E> std::fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = read(&self.inner);
        f.debug_struct("Listeners")
            .field("callbacks", &inner.callbacks.len())
            .field("channels", &inner.channels.len())
            .finish()
    }
}

impl<E: Clone + Send + 'static> Listeners<E> {
    /// Create an empty listener set.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register a callback invoked for every emitted event.
    pub fn add<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let mut inner = write(&self.inner);
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.callbacks.push(Registered {
            id,
            callback: Arc::new(callback),
        });
        id
    }

    /// Remove a previously registered callback.
    ///
    /// Returns `true` if the callback was registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut inner = write(&self.inner);
        let before = inner.callbacks.len();
        inner.callbacks.retain(|registered| registered.id != id);
        inner.callbacks.len() != before
    }

    /// Subscribe through a channel receiving a clone of every event.
    ///
    /// The subscription ends when the receiver is dropped.
    #[must_use]
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        write(&self.inner).channels.push(tx);
        rx
    }

    /// Number of live callbacks and channel subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        let inner = read(&self.inner);
        inner.callbacks.len() + inner.channels.len()
    }

    /// Return whether nobody is listening.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Deliver `event` to every listener.
    ///
    /// Callbacks are snapshotted before they run, so a callback may register
    /// or remove listeners without deadlocking.
    pub fn emit(&self, event: &E) {
        let (callbacks, closed) = {
            let inner = read(&self.inner);
            let callbacks: Vec<Callback<E>> = inner
                .callbacks
                .iter()
                .map(|registered| Arc::clone(&registered.callback))
                .collect();
            let closed = inner
                .channels
                .iter()
                .filter(|tx| tx.send(event.clone()).is_err())
                .count();
            (callbacks, closed)
        };
        if closed > 0 {
            debug!("pruning closed listener channels: count={closed}");
            write(&self.inner).channels.retain(|tx| !tx.is_closed());
        }
        for callback in callbacks {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::Listeners;

    #[test]
    fn callbacks_receive_events_until_removed() {
        let listeners = Listeners::<u32>::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let id = listeners.add(move |value| {
            counter.fetch_add(*value as usize, Ordering::SeqCst);
        });

        listeners.emit(&2);
        assert!(listeners.remove(id));
        listeners.emit(&5);

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert!(!listeners.remove(id));
    }

    #[test]
    fn channel_subscribers_get_clones_and_are_pruned_when_dropped() {
        let listeners = Listeners::<String>::new();
        let mut kept = listeners.subscribe();
        let dropped = listeners.subscribe();
        drop(dropped);

        listeners.emit(&"hello".to_owned());

        assert_eq!(kept.try_recv().expect("event delivered"), "hello");
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn callback_may_register_another_listener() {
        let listeners = Arc::new(Listeners::<u8>::new());
        let inner = Arc::clone(&listeners);
        listeners.add(move |_| {
            inner.add(|_| {});
        });

        listeners.emit(&1);

        assert_eq!(listeners.len(), 2);
    }
}
