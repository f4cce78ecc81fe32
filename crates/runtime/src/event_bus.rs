use foundation::time::Millis;

/// A queued notification stamped with the engine time it was raised at.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<E> {
    pub at: Millis,
    pub payload: E,
}

/// Ordered, single-consumer event queue.
///
/// Producers only emit; the owner of the state the event concerns drains the
/// queue and decides what to do. Events are drained in emission order.
#[derive(Debug)]
pub struct EventBus<E> {
    events: Vec<Event<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, at: Millis, payload: E) {
        self.events.push(Event { at, payload });
    }

    pub fn events(&self) -> &[Event<E>] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn drain(&mut self) -> Vec<Event<E>> {
        std::mem::take(&mut self.events)
    }
}
