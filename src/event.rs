/*! The lease event queue.

Events reach the lease monitor from several producers: the timer table, the
receive path and user requests made from other threads. They are all funnelled
through one bounded [EventQueue], so that the monitor handles exactly one event at
a time in the order they were posted.
*/

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use heapless::Deque;

use crate::config::EVENT_QUEUE_DEPTH;
use crate::lease::Event;
use crate::{Error, Result};

#[derive(Debug)]
struct Shared {
    events: Mutex<Deque<Event, EVENT_QUEUE_DEPTH>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Deque<Event, EVENT_QUEUE_DEPTH>> {
        // A panicking producer cannot leave the deque half-updated.
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The consuming end of the event queue.
#[derive(Debug)]
pub struct EventQueue {
    shared: Arc<Shared>,
}

/// A producing end of the event queue. Cheap to clone and to send across threads.
#[derive(Debug, Clone)]
pub struct EventSender {
    shared: Arc<Shared>,
}

impl EventQueue {
    pub fn new() -> EventQueue {
        EventQueue {
            shared: Arc::new(Shared {
                events: Mutex::new(Deque::new()),
            }),
        }
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            shared: self.shared.clone(),
        }
    }

    /// Take the oldest event, if there is one.
    pub fn try_next(&self) -> Option<Event> {
        self.shared.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> EventQueue {
        EventQueue::new()
    }
}

impl EventSender {
    /// Append `event` to the queue.
    ///
    /// Returns `Err(Error::Exhausted)` if the queue is full; the event is dropped.
    pub fn post(&self, event: Event) -> Result<()> {
        let mut events = self.shared.lock();
        if events.push_back(event).is_err() {
            net_debug!("event queue full, event dropped");
            return Err(Error::Exhausted);
        }
        Ok(())
    }
}
