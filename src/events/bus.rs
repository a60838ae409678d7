//! Runtime event channel.
//!
//! ```text
//!   Dispatcher ──┐
//!   Runtime    ──┼──► Bus ──┬──► fan-out listener ──► SubscriberSet
//!   Machine    ──┘          └──► Runtime::subscribe()
//! ```
//!
//! Publishing never waits. Events sent while nobody listens are gone, and a
//! receiver that falls more than `capacity` events behind is told how many it
//! missed (`RecvError::Lagged`) and resumes from the oldest one still buffered.

use tokio::sync::broadcast;

use super::event::Event;

/// Cloneable handle to the runtime's broadcast channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// `capacity` is one buffer shared by every receiver; zero becomes one.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// A receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
