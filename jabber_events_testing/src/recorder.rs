//! Collects events delivered to a [`Listeners`] set.

use std::sync::{Arc, Mutex, PoisonError};

use jabber_events::Listeners;

/// Records every event emitted to the listener set it is attached to.
#[derive(Clone, Debug)]
pub struct Recorder<E> {
    events: Arc<Mutex<Vec<E>>>,
}

impl<E: Clone + Send + 'static> Recorder<E> {
    /// Register a recording callback on `listeners`.
    pub fn attach(listeners: &Listeners<E>) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        listeners.add(move |event: &E| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
        });
        Self { events }
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<E> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of events recorded so far.
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Return whether nothing has been recorded.
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
