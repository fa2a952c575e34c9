use dashmap::DashMap;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::model::AllocationEvent;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for per-room change notifications.
pub struct NotifyHub {
    channels: DashMap<Ulid, broadcast::Sender<AllocationEvent>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to notifications for a room. Creates the channel if needed.
    pub fn subscribe(&self, room_id: Ulid) -> broadcast::Receiver<AllocationEvent> {
        let sender = self
            .channels
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send a notification to one room's subscribers. No-op if nobody is listening.
    pub fn send(&self, room_id: Ulid, event: &AllocationEvent) {
        if let Some(sender) = self.channels.get(&room_id) {
            let _ = sender.send(event.clone());
        }
    }

    /// Fan a room-unscoped event (global blackout, holiday) out to every channel.
    pub fn send_all(&self, event: &AllocationEvent) {
        for entry in self.channels.iter() {
            let _ = entry.value().send(event.clone());
        }
    }

    /// Remove a channel (e.g. when a room is deleted).
    pub fn remove(&self, room_id: &Ulid) {
        self.channels.remove(room_id);
    }
}
