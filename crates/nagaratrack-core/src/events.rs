//! Cross-component event bus
//!
//! Explicit publish/subscribe channel between data mutations (imports,
//! CRUD, simulator ticks) and whoever renders the results. Delivery is
//! at-least-once to live subscribers; there is no ordering guarantee
//! between publishers, and publishing with no subscribers is fine.

use tokio::sync::broadcast;

/// Default buffered events per subscriber
const DEFAULT_CAPACITY: usize = 64;

/// Something a view would want to re-render for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// Stop collection changed (CRUD or import)
    StopsChanged,
    /// Route collection changed (CRUD or import)
    RoutesChanged,
    /// Vehicle collection changed (CRUD or import)
    VehiclesChanged,
    /// The simulator finished a tick and positions moved
    VehiclesTicked,
}

/// Broadcast bus handed to publishers and subscribers alike
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    /// A slow subscriber that overflows its buffer loses the oldest
    /// events, not the newest.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        EventBus { tx }
    }

    /// Create a bus with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Publish to all current subscribers; fire-and-forget
    pub fn publish(&self, event: AppEvent) {
        // send only errors when there are no receivers, which is fine
        let _ = self.tx.send(event);
    }

    /// Subscribe; the receiver sees events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        bus.publish(AppEvent::StopsChanged);
        assert_eq!(rx1.recv().await.unwrap(), AppEvent::StopsChanged);
        assert_eq!(rx2.recv().await.unwrap(), AppEvent::StopsChanged);
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(AppEvent::VehiclesTicked);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let bus = EventBus::new();
        bus.publish(AppEvent::RoutesChanged);
        let mut rx = bus.subscribe();
        bus.publish(AppEvent::VehiclesChanged);
        assert_eq!(rx.recv().await.unwrap(), AppEvent::VehiclesChanged);
        assert!(rx.try_recv().is_err());
    }
}
