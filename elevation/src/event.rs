use crate::fetch::FetchFailureKind;
use crossbeam_channel::{unbounded, Receiver, Sender};
use srtm::TileId;
use std::sync::Mutex;

/// Engine lifecycle notifications, for cache bookkeeping and UI
/// feedback.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    LoadScheduled(TileId),
    LoadStarted(TileId),
    LoadSucceeded(TileId),
    /// Tile data failed to decode; terminal for this tile.
    LoadFailed { id: TileId, reason: String },
    DownloadScheduled(TileId),
    DownloadStarted(TileId),
    DownloadSucceeded(TileId),
    DownloadFailed {
        id: TileId,
        kind: FetchFailureKind,
        message: String,
    },
    /// A long-running tool computation started.
    JobStarted { name: String },
    JobSucceeded { name: String },
    JobCancelled { name: String },
    JobFailed { name: String, message: String },
}

/// Fan-out of [`EngineEvent`]s to any number of subscribers, each on its
/// own channel.
///
/// Producers never block on consumers; a subscriber that dropped its
/// receiver is pruned on the next emit.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<EngineEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    pub fn emit(&self, event: &EngineEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineEvent, EventBus};
    use srtm::TileId;

    #[test]
    fn test_every_subscriber_sees_every_event() {
        let bus = EventBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();
        bus.emit(&EngineEvent::LoadScheduled(TileId::new(44, -72)));
        assert!(matches!(
            first.try_recv().unwrap(),
            EngineEvent::LoadScheduled(_)
        ));
        assert!(matches!(
            second.try_recv().unwrap(),
            EngineEvent::LoadScheduled(_)
        ));
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        let keep = bus.subscribe();
        drop(bus.subscribe());
        bus.emit(&EngineEvent::JobStarted {
            name: "hillshade".to_owned(),
        });
        bus.emit(&EngineEvent::JobSucceeded {
            name: "hillshade".to_owned(),
        });
        assert_eq!(keep.len(), 2);
    }
}
