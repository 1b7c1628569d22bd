//! Collectible weapon pickups with a respawn timer

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::util::time::ticks_for;

use super::components::{Bounds, Collidable, Renderable};
use super::timer::{FrameTimers, TimerHandle};
use super::weapon::{PickupStats, WeaponType};

/// Delay between collection and reappearance
pub const RESPAWN_DELAY: Duration = Duration::from_secs(30);
/// Pickup trigger radius
pub const PICKUP_RADIUS: f32 = 50.0;

/// Visibility state of a pickup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupState {
    /// Shown and collidable
    Visible,
    /// Collected, waiting for the respawn timer
    Hidden,
}

/// Pickup fields sent to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupSnapshot {
    pub id: Uuid,
    pub position: Vec3,
    pub weapon_type: WeaponType,
    pub state: PickupState,
}

/// A weapon lying in the world
#[derive(Debug)]
pub struct PickupItem {
    pub id: Uuid,
    pub position: Vec3,
    pub stats: PickupStats,
    state: PickupState,
    respawn_delay: Duration,
    respawn: Option<TimerHandle>,
}

impl PickupItem {
    pub fn new(position: Vec3, stats: PickupStats) -> Self {
        Self::with_respawn_delay(position, stats, RESPAWN_DELAY)
    }

    pub fn with_respawn_delay(position: Vec3, stats: PickupStats, respawn_delay: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            stats,
            state: PickupState::Visible,
            respawn_delay,
            respawn: None,
        }
    }

    /// Observer-side copy of a pickup owned by the authority
    pub fn mirror(snapshot: &PickupSnapshot) -> Self {
        let mut pickup = Self::new(snapshot.position, PickupStats::default_for(snapshot.weapon_type));
        pickup.id = snapshot.id;
        pickup.state = snapshot.state;
        pickup
    }

    pub fn state(&self) -> PickupState {
        self.state
    }

    pub fn snapshot(&self) -> PickupSnapshot {
        PickupSnapshot {
            id: self.id,
            position: self.position,
            weapon_type: self.stats.weapon_type,
            state: self.state,
        }
    }

    /// Collect the pickup if it is showing: hide it and arm the respawn
    /// timer. Returns the stats to hand to the collector.
    pub fn try_collect(&mut self, timers: &mut FrameTimers<Uuid>) -> Option<PickupStats> {
        if self.state != PickupState::Visible {
            return None;
        }

        self.set_visible(false);
        self.respawn = Some(timers.schedule(ticks_for(self.respawn_delay), self.id));

        debug!(pickup_id = %self.id, weapon = ?self.stats.weapon_type, "Pickup collected");
        Some(self.stats)
    }

    /// Respawn timer expired
    pub fn respawn(&mut self) {
        self.respawn = None;
        self.set_visible(true);
        debug!(pickup_id = %self.id, "Pickup respawned");
    }

    /// Release the pending respawn timer ahead of destruction
    pub fn teardown(&mut self) {
        if let Some(handle) = self.respawn.take() {
            handle.cancel();
        }
    }
}

impl Renderable for PickupItem {
    fn is_visible(&self) -> bool {
        self.state == PickupState::Visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.state = if visible {
            PickupState::Visible
        } else {
            PickupState::Hidden
        };
    }
}

impl Collidable for PickupItem {
    fn bounds(&self) -> Option<Bounds> {
        self.is_visible().then_some(Bounds::Sphere {
            radius: PICKUP_RADIUS,
        })
    }

    fn location(&self) -> Vec3 {
        self.position
    }
}

impl Drop for PickupItem {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shotgun_pickup() -> PickupItem {
        PickupItem::new(Vec3::ZERO, PickupStats::default_for(WeaponType::Shotgun))
    }

    fn advance_secs(timers: &mut FrameTimers<Uuid>, secs: u64) -> Vec<Uuid> {
        let mut fired = Vec::new();
        for _ in 0..ticks_for(Duration::from_secs(secs)) {
            fired.extend(timers.advance());
        }
        fired
    }

    #[test]
    fn collect_hides_and_disables_collision() {
        let mut timers = FrameTimers::new();
        let mut pickup = shotgun_pickup();

        let stats = pickup.try_collect(&mut timers);
        assert_eq!(stats.map(|s| s.weapon_type), Some(WeaponType::Shotgun));
        assert_eq!(pickup.state(), PickupState::Hidden);
        assert!(pickup.bounds().is_none());
        assert!(pickup.try_collect(&mut timers).is_none());
    }

    #[test]
    fn reappears_thirty_seconds_after_collection() {
        let mut timers = FrameTimers::new();
        let mut pickup = shotgun_pickup();
        pickup.try_collect(&mut timers);

        assert!(advance_secs(&mut timers, 29).is_empty());
        let fired = advance_secs(&mut timers, 1);
        assert_eq!(fired, vec![pickup.id]);

        pickup.respawn();
        assert_eq!(pickup.state(), PickupState::Visible);
        assert!(pickup.bounds().is_some());
    }

    #[test]
    fn destroyed_pickup_never_fires() {
        let mut timers = FrameTimers::new();
        let mut pickup = shotgun_pickup();
        pickup.try_collect(&mut timers);

        advance_secs(&mut timers, 10);
        drop(pickup);

        assert!(advance_secs(&mut timers, 30).is_empty());
    }
}
