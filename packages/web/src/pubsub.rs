//! The pub/sub aggregator (§3 component M): an in-process event bus letting components that
//! share no parent/child relationship exchange messages without routing through the server,
//! keyed by topic the way `EventDelegation` keys handlers by id rather than by tree position.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Opaque handle returned by [`PubSub::subscribe`]; drop or pass to [`PubSub::unsubscribe`] to
/// stop receiving a topic's messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    callback: Box<dyn Fn(&serde_json::Value)>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    topics: FxHashMap<String, Vec<Subscriber>>,
}

/// A shared, cheaply-cloned event bus. Clones all refer to the same underlying subscriber
/// table, mirroring how [`crate::event_delegation::EventRegistry`] is shared via `Rc<RefCell<_>>`.
#[derive(Clone, Default)]
pub struct PubSub(Rc<RefCell<Inner>>);

impl PubSub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` to run on every message published to `topic`.
    pub fn subscribe(
        &self,
        topic: impl Into<String>,
        callback: impl Fn(&serde_json::Value) + 'static,
    ) -> SubscriptionId {
        let mut inner = self.0.borrow_mut();
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);
        inner
            .topics
            .entry(topic.into())
            .or_default()
            .push(Subscriber {
                id,
                callback: Box::new(callback),
            });
        id
    }

    /// Stop `subscription` from receiving further messages on any topic.
    pub fn unsubscribe(&self, subscription: SubscriptionId) {
        let mut inner = self.0.borrow_mut();
        for subscribers in inner.topics.values_mut() {
            subscribers.retain(|s| s.id != subscription);
        }
    }

    /// Publish `payload` to every live subscriber of `topic`, in subscription order.
    pub fn publish(&self, topic: &str, payload: &serde_json::Value) {
        let inner = self.0.borrow();
        if let Some(subscribers) = inner.topics.get(topic) {
            for subscriber in subscribers {
                (subscriber.callback)(payload);
            }
        }
    }

    /// Number of live subscribers across all topics, for tests/introspection.
    pub fn subscriber_count(&self) -> usize {
        self.0.borrow().topics.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn publish_reaches_all_subscribers_of_a_topic_only() {
        let bus = PubSub::new();
        let on_topic_a = Rc::new(RefCell::new(Vec::new()));
        let on_topic_b = Rc::new(RefCell::new(Vec::new()));

        let a = on_topic_a.clone();
        bus.subscribe("a", move |payload| a.borrow_mut().push(payload.clone()));
        let b = on_topic_b.clone();
        bus.subscribe("b", move |payload| b.borrow_mut().push(payload.clone()));

        bus.publish("a", &json!({"v": 1}));

        assert_eq!(on_topic_a.borrow().len(), 1);
        assert!(on_topic_b.borrow().is_empty());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = PubSub::new();
        let seen = Rc::new(RefCell::new(0));
        let seen_inner = seen.clone();
        let sub = bus.subscribe("x", move |_| *seen_inner.borrow_mut() += 1);

        bus.publish("x", &json!(null));
        bus.unsubscribe(sub);
        bus.publish("x", &json!(null));

        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn subscriber_count_reflects_subscribe_and_unsubscribe() {
        let bus = PubSub::new();
        assert_eq!(bus.subscriber_count(), 0);
        let sub = bus.subscribe("t", |_| {});
        assert_eq!(bus.subscriber_count(), 1);
        bus.unsubscribe(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
