//! Pipeline telemetry collector.
//!
//! The collector keeps a bounded history of metric events and fans each one
//! out over a broadcast channel. It is owned by the training session; callers
//! subscribe before handing the session to a worker thread.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast;

pub mod events;

pub use events::MetricEvent;

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

/// Broadcast-based collector retaining a bounded history of metrics.
#[derive(Debug)]
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    fn history(&self) -> MutexGuard<'_, VecDeque<MetricEvent>> {
        match self.history.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if self.history_capacity > 0 {
            let mut history = self.history();
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        // No subscribers is the normal case outside diagnostics
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = self.history();
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(accepted: usize) -> MetricEvent {
        MetricEvent::CalibrationProgress {
            accepted,
            required: 10,
        }
    }

    #[test]
    fn test_collector_preserves_order_within_history() {
        let collector = TelemetryCollector::new(8, 3);
        collector.publish(progress(1));
        collector.publish(MetricEvent::SampleDropped { code: 1001 });
        collector.publish(progress(2));

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 3);
        assert!(matches!(
            snapshot.recent[0],
            MetricEvent::CalibrationProgress { accepted: 1, .. }
        ));
        assert!(matches!(
            snapshot.recent[1],
            MetricEvent::SampleDropped { code: 1001 }
        ));
    }

    #[test]
    fn test_collector_drops_history_when_full() {
        let collector = TelemetryCollector::new(8, 2);
        collector.publish(progress(1));
        collector.publish(progress(2));
        collector.publish(progress(3));

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 2);
        assert_eq!(snapshot.total_events, 3);
        assert_eq!(snapshot.dropped_events, 1);
        assert!(matches!(
            snapshot.recent[0],
            MetricEvent::CalibrationProgress { accepted: 2, .. }
        ));
    }

    #[test]
    fn test_subscribers_receive_published_events() {
        let collector = TelemetryCollector::new(8, 8);
        let mut rx = collector.subscribe();
        collector.publish(MetricEvent::FormScored {
            score: 87.5,
            fault: None,
        });
        let event = rx.try_recv().unwrap();
        assert!(matches!(event, MetricEvent::FormScored { fault: None, .. }));
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_string(&MetricEvent::SampleDropped { code: 1002 }).unwrap();
        assert_eq!(json, r#"{"type":"sample_dropped","payload":{"code":1002}}"#);
    }
}
