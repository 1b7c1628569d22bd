//! Snapshot building

use crate::ws::protocol::{GameEvent, ServerMsg};

use super::world::World;

/// Builds snapshots for network transmission
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
    /// Events gathered from ticks that did not send a snapshot
    pending_events: Vec<GameEvent>,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
            pending_events: Vec::new(),
        }
    }

    /// Queue events for the next snapshot
    pub fn record(&mut self, events: Vec<GameEvent>) {
        self.pending_events.extend(events);
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for important events)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Build a snapshot message, taking all queued events
    pub fn build(&mut self, world: &World) -> ServerMsg {
        ServerMsg::Snapshot {
            tick: world.current_tick(),
            characters: world.replicated_characters(),
            pickups: world.pickup_snapshots(),
            events: std::mem::take(&mut self.pending_events),
        }
    }
}
