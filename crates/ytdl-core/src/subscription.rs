use crate::socket_io::PushEvent;
use std::collections::HashMap;

type Handler<C> = Box<dyn FnMut(&PushEvent, &mut C)>;

struct Registration<C> {
    key: &'static str,
    handler: Handler<C>,
}

/// Keyed registry of push-event handlers.
///
/// Handlers for one event name run in registration order, once per event.
/// A `(event, key)` pair can only be registered once, so re-running setup
/// code never doubles a handler.
pub struct Subscriptions<C> {
    by_event: HashMap<String, Vec<Registration<C>>>,
    catch_all: Vec<Registration<C>>,
}

impl<C> Subscriptions<C> {
    pub fn new() -> Self {
        Self {
            by_event: HashMap::new(),
            catch_all: Vec::new(),
        }
    }

    /// Returns `false` when `key` is already subscribed to `event`.
    pub fn subscribe<F>(&mut self, event: &str, key: &'static str, handler: F) -> bool
    where
        F: FnMut(&PushEvent, &mut C) + 'static,
    {
        let registrations = self.by_event.entry(event.to_string()).or_default();
        if registrations.iter().any(|existing| existing.key == key) {
            return false;
        }
        registrations.push(Registration {
            key,
            handler: Box::new(handler),
        });
        true
    }

    /// Registers a handler for every event name.
    pub fn subscribe_all<F>(&mut self, key: &'static str, handler: F) -> bool
    where
        F: FnMut(&PushEvent, &mut C) + 'static,
    {
        if self.catch_all.iter().any(|existing| existing.key == key) {
            return false;
        }
        self.catch_all.push(Registration {
            key,
            handler: Box::new(handler),
        });
        true
    }

    pub fn is_subscribed(&self, event: &str) -> bool {
        self.by_event
            .get(event)
            .map(|registrations| !registrations.is_empty())
            .unwrap_or(false)
    }

    /// Runs named handlers, then catch-all handlers. Returns how many ran.
    pub fn deliver(&mut self, event: &PushEvent, ctx: &mut C) -> usize {
        let mut invoked = 0;
        if let Some(registrations) = self.by_event.get_mut(&event.name) {
            for registration in registrations.iter_mut() {
                (registration.handler)(event, ctx);
                invoked += 1;
            }
        }
        for registration in self.catch_all.iter_mut() {
            (registration.handler)(event, ctx);
            invoked += 1;
        }
        invoked
    }
}

impl<C> Default for Subscriptions<C> {
    fn default() -> Self {
        Self::new()
    }
}
