//! Event name registry and dispatch.

use crate::protocol::GatewayEvent;
use crate::session::observers::{Observers, invoke_isolated, lock_unpoisoned};

use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::sync::{Arc, Mutex};

/// Key an event handler is registered under.
///
/// `Wildcard` is its own case: an event literally named `"*"` is an ordinary
/// `Named` event and does not reach wildcard handlers by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventName {
    Named(String),
    Wildcard,
}

impl From<&str> for EventName {
    fn from(name: &str) -> Self {
        EventName::Named(name.to_string())
    }
}

impl From<String> for EventName {
    fn from(name: String) -> Self {
        EventName::Named(name)
    }
}

impl Display for EventName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        match self {
            EventName::Named(name) => formatter.write_str(name),
            EventName::Wildcard => formatter.write_str("<any event>"),
        }
    }
}

pub type EventHandler = dyn Fn(&GatewayEvent) + Send + Sync;

/// Token returned by `on`, used to unregister the handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventSubscription {
    name: EventName,
    id: u64,
}

impl EventSubscription {
    pub fn event_name(&self) -> &EventName {
        &self.name
    }
}

pub(crate) struct EventDispatcher {
    next_id: u64,
    named: HashMap<String, Observers<EventHandler>>,
    wildcard: Observers<EventHandler>,
}

impl EventDispatcher {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            named: HashMap::new(),
            wildcard: Observers::new(),
        }
    }

    pub(crate) fn subscribe(&mut self, name: EventName, handler: Arc<EventHandler>) -> EventSubscription {
        self.next_id += 1;
        let id = self.next_id;
        match &name {
            EventName::Named(event) => self.named.entry(event.clone()).or_default().push(id, handler),
            EventName::Wildcard => self.wildcard.push(id, handler),
        }
        EventSubscription { name, id }
    }

    pub(crate) fn unsubscribe(&mut self, subscription: &EventSubscription) -> bool {
        match &subscription.name {
            EventName::Named(event) => {
                let Some(handlers) = self.named.get_mut(event) else {
                    return false;
                };
                let removed = handlers.remove(subscription.id);
                if handlers.is_empty() {
                    self.named.remove(event);
                }
                removed
            }
            EventName::Wildcard => self.wildcard.remove(subscription.id),
        }
    }

    /// Handlers for `event`: exact-name handlers first, then wildcard handlers.
    pub(crate) fn handlers_for(&self, event: &str) -> Vec<Arc<EventHandler>> {
        let mut handlers = self
            .named
            .get(event)
            .map(Observers::snapshot)
            .unwrap_or_default();
        handlers.extend(self.wildcard.snapshot());
        handlers
    }

    #[cfg(test)]
    pub(crate) fn handler_count(&self, name: &EventName) -> usize {
        match name {
            EventName::Named(event) => self.named.get(event).map_or(0, Observers::len),
            EventName::Wildcard => self.wildcard.len(),
        }
    }
}

/// Deliver `event` to its handlers. Returns how many were invoked.
///
/// The lock is released before any handler runs, so handlers may register or
/// unregister handlers themselves.
pub(crate) fn dispatch(dispatcher: &Mutex<EventDispatcher>, event: &GatewayEvent) -> usize {
    let handlers = lock_unpoisoned(dispatcher).handlers_for(&event.event);
    for handler in &handlers {
        invoke_isolated("Event handler", || handler(event));
    }
    handlers.len()
}
