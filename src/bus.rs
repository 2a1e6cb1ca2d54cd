//! Event bus - decoupled fan-out between viewer components
//!
//! Subscribers register per topic and are invoked synchronously, in
//! registration order, when an event on that topic is published. A handler
//! that returns an error is logged and skipped; it never blocks delivery to
//! the remaining subscribers.

use std::collections::HashMap;

use crate::pdf::{DisplayScale, InteractiveRegion};

/// Event topics. Every [`BusEvent`] maps to exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    Initialized,
    PageRendered,
    PageJumpRequested,
    WindowResized,
    Error,
}

#[derive(Clone, Debug)]
pub enum BusEvent {
    /// Startup finished and the first render was requested.
    Initialized,
    /// A page finished rendering and is on the surface.
    PageRendered {
        page: usize,
        regions: Vec<InteractiveRegion>,
        display_scale: DisplayScale,
    },
    /// Someone (an interactive region, a collaborator) asked to jump.
    PageJumpRequested { page: usize },
    WindowResized,
    Error {
        page: Option<usize>,
        message: String,
    },
}

impl BusEvent {
    #[must_use]
    pub fn topic(&self) -> Topic {
        match self {
            BusEvent::Initialized => Topic::Initialized,
            BusEvent::PageRendered { .. } => Topic::PageRendered,
            BusEvent::PageJumpRequested { .. } => Topic::PageJumpRequested,
            BusEvent::WindowResized => Topic::WindowResized,
            BusEvent::Error { .. } => Topic::Error,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&BusEvent) -> anyhow::Result<()>>;

struct Subscription {
    id: SubscriptionId,
    once: bool,
    handler: Handler,
}

pub struct EventBus {
    handlers: HashMap<Topic, Vec<Subscription>>,
    next_id: u64,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn subscribe<F>(&mut self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: FnMut(&BusEvent) -> anyhow::Result<()> + 'static,
    {
        self.add(topic, false, Box::new(handler))
    }

    /// Like [`Self::subscribe`], but the handler is dropped after its first
    /// delivery.
    pub fn once<F>(&mut self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: FnMut(&BusEvent) -> anyhow::Result<()> + 'static,
    {
        self.add(topic, true, Box::new(handler))
    }

    fn add(&mut self, topic: Topic, once: bool, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers
            .entry(topic)
            .or_default()
            .push(Subscription { id, once, handler });
        id
    }

    /// Remove one subscription. Returns whether it was still registered.
    pub fn unsubscribe(&mut self, topic: Topic, id: SubscriptionId) -> bool {
        let Some(subs) = self.handlers.get_mut(&topic) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|sub| sub.id != id);
        subs.len() != before
    }

    /// Deliver an event to every subscriber of its topic, in registration
    /// order.
    pub fn publish(&mut self, event: &BusEvent) {
        let topic = event.topic();
        let Some(mut subs) = self.handlers.remove(&topic) else {
            return;
        };

        for sub in &mut subs {
            if let Err(e) = (sub.handler)(event) {
                log::error!("bus handler failed on {topic:?}: {e:#}");
            }
        }
        subs.retain(|sub| !sub.once);

        if !subs.is_empty() {
            self.handlers.insert(topic, subs);
        }
    }

    /// Drop every subscription on every topic.
    pub fn reset(&mut self) {
        self.handlers.clear();
    }

    #[must_use]
    pub fn handler_count(&self, topic: Topic) -> usize {
        self.handlers.get(&topic).map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn delivers_in_registration_order() {
        let mut bus = EventBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let sink = Rc::clone(&order);
            bus.subscribe(Topic::WindowResized, move |_| {
                sink.borrow_mut().push(tag);
                Ok(())
            });
        }

        bus.publish(&BusEvent::WindowResized);
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn topics_are_isolated() {
        let mut bus = EventBus::new();
        let hits = Rc::new(RefCell::new(0));

        let sink = Rc::clone(&hits);
        bus.subscribe(Topic::PageJumpRequested, move |_| {
            *sink.borrow_mut() += 1;
            Ok(())
        });

        bus.publish(&BusEvent::WindowResized);
        bus.publish(&BusEvent::Initialized);
        assert_eq!(*hits.borrow(), 0);

        bus.publish(&BusEvent::PageJumpRequested { page: 2 });
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn once_handler_fires_a_single_time() {
        let mut bus = EventBus::new();
        let hits = Rc::new(RefCell::new(0));

        let sink = Rc::clone(&hits);
        bus.once(Topic::Initialized, move |_| {
            *sink.borrow_mut() += 1;
            Ok(())
        });

        bus.publish(&BusEvent::Initialized);
        bus.publish(&BusEvent::Initialized);
        assert_eq!(*hits.borrow(), 1);
        assert_eq!(bus.handler_count(Topic::Initialized), 0);
    }

    #[test]
    fn unsubscribe_removes_only_that_handler() {
        let mut bus = EventBus::new();
        let hits = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&hits);
        let keep = bus.subscribe(Topic::Error, move |_| {
            sink.borrow_mut().push("keep");
            Ok(())
        });
        let sink = Rc::clone(&hits);
        let drop_me = bus.subscribe(Topic::Error, move |_| {
            sink.borrow_mut().push("drop");
            Ok(())
        });

        assert!(bus.unsubscribe(Topic::Error, drop_me));
        assert!(!bus.unsubscribe(Topic::Error, drop_me));

        bus.publish(&BusEvent::Error {
            page: None,
            message: "boom".into(),
        });
        assert_eq!(*hits.borrow(), vec!["keep"]);
        assert!(bus.unsubscribe(Topic::Error, keep));
    }

    #[test]
    fn failing_handler_does_not_stop_delivery() {
        let mut bus = EventBus::new();
        let hits = Rc::new(RefCell::new(0));

        bus.subscribe(Topic::WindowResized, |_| anyhow::bail!("handler fault"));
        let sink = Rc::clone(&hits);
        bus.subscribe(Topic::WindowResized, move |_| {
            *sink.borrow_mut() += 1;
            Ok(())
        });

        bus.publish(&BusEvent::WindowResized);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn reset_drops_everything() {
        let mut bus = EventBus::new();
        bus.subscribe(Topic::PageRendered, |_| Ok(()));
        bus.subscribe(Topic::Error, |_| Ok(()));

        bus.reset();
        assert_eq!(bus.handler_count(Topic::PageRendered), 0);
        assert_eq!(bus.handler_count(Topic::Error), 0);
    }
}
