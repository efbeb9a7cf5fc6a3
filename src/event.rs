/// In-process event bus
///
/// Components get a cloned `EventBus` handle instead of talking to each other
/// directly. Delivery is synchronous and in registration order. There is no
/// replay: a subscriber only sees events published after it subscribed.
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::state::data::{GenerationParameters, ImageRecord};

#[derive(Debug, Clone, PartialEq)]
pub enum GalleryEvent {
    /// A generation succeeded and the record was stored
    RecordCreated(ImageRecord),
    /// Open the generation dialog pre-filled from an existing record
    RemixRequested {
        prompt: String,
        parameters: GenerationParameters,
    },
    /// Settings were saved; consumers reload them from the settings store
    SettingsUpdated,
}

impl GalleryEvent {
    fn kind(&self) -> &'static str {
        match self {
            GalleryEvent::RecordCreated(_) => "record-created",
            GalleryEvent::RemixRequested { .. } => "remix-requested",
            GalleryEvent::SettingsUpdated => "settings-updated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&GalleryEvent) + Send>;

#[derive(Default)]
struct Inner {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Handler)>,
    /// Handlers are moved out while an event is being delivered
    dispatching: bool,
    /// Events published from inside a handler, delivered after the current one
    pending: VecDeque<GalleryEvent>,
    /// Subscriptions added while dispatching
    added: Vec<(SubscriptionId, Handler)>,
    /// Unsubscribes requested while dispatching
    removed: Vec<SubscriptionId>,
}

#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Inner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self, handler: impl FnMut(&GalleryEvent) + Send + 'static) -> SubscriptionId {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);
        if inner.dispatching {
            inner.added.push((id, Box::new(handler)));
        } else {
            inner.handlers.push((id, Box::new(handler)));
        }
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut inner = self.lock();
        if inner.dispatching {
            inner.removed.push(id);
            inner.added.retain(|(sub, _)| *sub != id);
        } else {
            inner.handlers.retain(|(sub, _)| *sub != id);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        let inner = self.lock();
        inner.handlers.len() + inner.added.len()
    }

    /// Deliver `event` to every current subscriber, in registration order.
    ///
    /// Publishing from inside a handler queues the event; it is delivered once
    /// the current event has reached every subscriber.
    pub fn publish(&self, event: GalleryEvent) {
        let handlers = {
            let mut inner = self.lock();
            if inner.dispatching {
                inner.pending.push_back(event);
                return;
            }
            if inner.handlers.is_empty() {
                return;
            }
            inner.dispatching = true;
            std::mem::take(&mut inner.handlers)
        };
        let mut dispatch = Dispatch {
            bus: self,
            handlers,
        };

        let mut current = event;
        loop {
            debug!(
                event = current.kind(),
                subscribers = dispatch.handlers.len(),
                "publish"
            );
            for (_, handler) in dispatch.handlers.iter_mut() {
                handler(&current);
            }

            let mut inner = self.lock();
            // Apply changes made by handlers before the next queued event
            let removed = std::mem::take(&mut inner.removed);
            dispatch.handlers.retain(|(id, _)| !removed.contains(id));
            dispatch.handlers.append(&mut inner.added);

            match inner.pending.pop_front() {
                Some(next) => current = next,
                None => return,
            }
        }
    }
}

/// Hands the handlers back to the bus when delivery ends, including when a
/// handler panics, so the bus never stays stuck in dispatch mode.
struct Dispatch<'a> {
    bus: &'a EventBus,
    handlers: Vec<(SubscriptionId, Handler)>,
}

impl Drop for Dispatch<'_> {
    fn drop(&mut self) {
        let mut inner = self.bus.lock();
        let removed = std::mem::take(&mut inner.removed);
        let mut handlers = std::mem::take(&mut self.handlers);
        handlers.retain(|(id, _)| !removed.contains(id));
        handlers.append(&mut inner.added);

        inner.handlers = handlers;
        inner.dispatching = false;
        if std::thread::panicking() {
            inner.pending.clear();
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// A subscription that queues matching events for a UI component.
///
/// iced components can't be borrowed from inside a bus handler, so the
/// handler only records the event; the component applies it on `drain`.
/// Dropping the mailbox unsubscribes it.
pub struct Mailbox {
    bus: EventBus,
    id: SubscriptionId,
    queue: Arc<Mutex<VecDeque<GalleryEvent>>>,
}

impl Mailbox {
    pub fn subscribe(bus: &EventBus, accepts: fn(&GalleryEvent) -> bool) -> Self {
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        let sink = Arc::clone(&queue);
        let id = bus.subscribe(move |event| {
            if accepts(event) {
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push_back(event.clone());
            }
        });

        Self {
            bus: bus.clone(),
            id,
            queue,
        }
    }

    /// Take every queued event, oldest first
    pub fn drain(&self) -> Vec<GalleryEvent> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }
}

impl Drop for Mailbox {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(
        bus: &EventBus,
        name: &'static str,
        log: &Arc<Mutex<Vec<String>>>,
    ) -> SubscriptionId {
        let log = Arc::clone(log);
        bus.subscribe(move |event| {
            log.lock().unwrap().push(format!("{name}:{}", event.kind()));
        })
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        bus.publish(GalleryEvent::SettingsUpdated);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        recorder(&bus, "first", &log);
        recorder(&bus, "second", &log);

        bus.publish(GalleryEvent::SettingsUpdated);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:settings-updated", "second:settings-updated"]
        );
    }

    #[test]
    fn test_late_subscriber_sees_no_replay() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        recorder(&bus, "early", &log);
        bus.publish(GalleryEvent::SettingsUpdated);

        recorder(&bus, "late", &log);
        assert_eq!(*log.lock().unwrap(), vec!["early:settings-updated"]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let id = recorder(&bus, "gone", &log);
        recorder(&bus, "kept", &log);

        bus.unsubscribe(id);
        bus.publish(GalleryEvent::SettingsUpdated);

        assert_eq!(*log.lock().unwrap(), vec!["kept:settings-updated"]);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_publish_from_handler_is_queued() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let inner_bus = bus.clone();
        bus.subscribe(move |event| {
            if let GalleryEvent::RemixRequested { .. } = event {
                inner_bus.publish(GalleryEvent::SettingsUpdated);
            }
        });
        recorder(&bus, "watcher", &log);

        bus.publish(GalleryEvent::RemixRequested {
            prompt: "a cat".to_string(),
            parameters: GenerationParameters::default(),
        });

        // The nested event arrives after the outer one finished
        assert_eq!(
            *log.lock().unwrap(),
            vec!["watcher:remix-requested", "watcher:settings-updated"]
        );
    }

    #[test]
    fn test_mailbox_filters_and_drains_in_order() {
        let bus = EventBus::new();
        let mailbox =
            Mailbox::subscribe(&bus, |event| !matches!(event, GalleryEvent::RecordCreated(_)));

        bus.publish(GalleryEvent::SettingsUpdated);
        bus.publish(GalleryEvent::RemixRequested {
            prompt: "a cat".to_string(),
            parameters: GenerationParameters::default(),
        });

        let events = mailbox.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], GalleryEvent::SettingsUpdated);
        assert!(mailbox.drain().is_empty());
    }

    #[test]
    fn test_dropping_mailbox_unsubscribes() {
        let bus = EventBus::new();
        {
            let _mailbox = Mailbox::subscribe(&bus, |_| true);
            assert_eq!(bus.subscriber_count(), 1);
        }
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_subscribe_during_dispatch_skips_current_event() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let inner_bus = bus.clone();
        let inner_log = Arc::clone(&log);
        let mut subscribed = false;
        bus.subscribe(move |_| {
            if !subscribed {
                subscribed = true;
                recorder(&inner_bus, "new", &inner_log);
            }
        });

        bus.publish(GalleryEvent::SettingsUpdated);
        assert!(log.lock().unwrap().is_empty());

        bus.publish(GalleryEvent::SettingsUpdated);
        assert_eq!(*log.lock().unwrap(), vec!["new:settings-updated"]);
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_panicking_handler_does_not_wedge_the_bus() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let faulty = bus.subscribe(|_| panic!("handler failed"));
        recorder(&bus, "kept", &log);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            bus.publish(GalleryEvent::SettingsUpdated);
        }));
        assert!(outcome.is_err());
        assert_eq!(bus.subscriber_count(), 2);

        bus.unsubscribe(faulty);
        bus.publish(GalleryEvent::SettingsUpdated);
        assert_eq!(*log.lock().unwrap(), vec!["kept:settings-updated"]);
    }
}
