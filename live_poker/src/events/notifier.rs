//! "Table changed" push signal, independent of the event log.

use log::debug;
use tokio::sync::broadcast;

use super::models::ChangeSignal;

pub trait ChangeNotifier: Send + Sync {
    fn notify(&self, signal: ChangeSignal);
}

/// Discards every signal.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn notify(&self, _signal: ChangeSignal) {}
}

/// Fans signals out to any number of subscribers (WebSocket sessions).
///
/// Slow subscribers lag and lose old signals; since each signal only says
/// "pull again", losing one never loses state.
#[derive(Clone, Debug)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<ChangeSignal>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeSignal> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn notify(&self, signal: ChangeSignal) {
        // No subscribers is not an error.
        if self.sender.send(signal.clone()).is_err() {
            debug!("No subscribers for change signal on table {}", signal.table_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_broadcast_reaches_all_subscribers() {
        let notifier = BroadcastNotifier::new(8);
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 2);

        let signal = ChangeSignal {
            table_id: 3,
            timestamp: Utc::now(),
        };
        notifier.notify(signal.clone());

        assert_eq!(a.recv().await.unwrap(), signal);
        assert_eq!(b.recv().await.unwrap(), signal);
    }

    #[test]
    fn test_notify_without_subscribers_is_fine() {
        let notifier = BroadcastNotifier::default();
        notifier.notify(ChangeSignal {
            table_id: 1,
            timestamp: Utc::now(),
        });
        NoopNotifier.notify(ChangeSignal {
            table_id: 1,
            timestamp: Utc::now(),
        });
    }
}
