//! Fan-out of alert events to an arbitrary number of subscribers.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::warn;

use crate::alert::AlertEvent;

/// Delivers each published alert event to every live subscriber.
///
/// A subscriber that dropped its receiver is pruned on the next
/// publish; its failure never blocks delivery to the others or touches
/// the alert state itself.
#[derive(Default)]
pub struct AlertBroadcaster {
    senders: Mutex<Vec<Sender<AlertEvent>>>,
}

impl AlertBroadcaster {
    pub fn new() -> Self {
        AlertBroadcaster::default()
    }

    /// Register a new subscriber and return its event receiver.
    pub fn subscribe(&self) -> Receiver<AlertEvent> {
        let (tx, rx) = unbounded();
        self.senders.lock().push(tx);
        rx
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.senders.lock().len()
    }

    /// Send `event` to every subscriber, dropping the dead ones.
    pub fn publish(&self, event: &AlertEvent) {
        let mut senders = self.senders.lock();
        senders.retain(|tx| {
            if tx.send(event.clone()).is_err() {
                warn!("dropping disconnected alert subscriber");
                false
            } else {
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escalation() -> AlertEvent {
        AlertEvent::Escalation { level: 1, current: 12.0, threshold: 10.0 }
    }

    #[test]
    fn test_every_subscriber_receives_each_event() {
        let broadcaster = AlertBroadcaster::new();
        let a = broadcaster.subscribe();
        let b = broadcaster.subscribe();

        broadcaster.publish(&escalation());

        assert_eq!(a.try_recv().unwrap(), escalation());
        assert_eq!(b.try_recv().unwrap(), escalation());
    }

    #[test]
    fn test_dropped_subscriber_does_not_block_the_rest() {
        let broadcaster = AlertBroadcaster::new();
        let kept = broadcaster.subscribe();
        drop(broadcaster.subscribe());

        broadcaster.publish(&escalation());

        assert_eq!(kept.try_recv().unwrap(), escalation());
        assert_eq!(broadcaster.subscriber_count(), 1);
    }

    #[test]
    fn test_publish_without_subscribers_is_a_no_op() {
        let broadcaster = AlertBroadcaster::new();
        broadcaster.publish(&escalation());
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
