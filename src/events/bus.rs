use crate::events::{CrawlEvent, EventKind};
use std::collections::HashMap;
use std::fmt;

/// A subscribed event handler
pub type Handler = Box<dyn FnMut(&CrawlEvent<'_>) + Send>;

/// Synchronous publish/subscribe channel keyed by [`EventKind`]
///
/// Handlers for one kind run in the order they were registered, and
/// [`EventBus::trigger`] returns only after all of them ran.
#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<EventKind, Vec<Handler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `handler` to events of `kind`
    pub fn on<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&CrawlEvent<'_>) + Send + 'static,
    {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
    }

    /// Delivers `event` to every handler subscribed to its kind
    ///
    /// Returns the number of handlers invoked.
    pub fn trigger(&mut self, event: &CrawlEvent<'_>) -> usize {
        let Some(handlers) = self.handlers.get_mut(&event.kind()) else {
            return 0;
        };

        for handler in handlers.iter_mut() {
            handler(event);
        }
        handlers.len()
    }

    pub fn handler_count(&self, kind: &EventKind) -> usize {
        self.handlers.get(kind).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&EventKind, usize> =
            self.handlers.iter().map(|(k, v)| (k, v.len())).collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}
