//! Authority/observer replication messages.
//!
//! Every player-initiated mutation takes one of two paths:
//! - on a remote instance it becomes a [`ServerRequest`] sent to the authority;
//! - on the authority it is applied directly, and results every observer must
//!   see are broadcast as a [`Multicast`].
//!
//! Requests pass through [`admit`] before being applied. Delivery is the
//! transport's job: each connection feeds one ordered channel, so requests
//! from one source arrive in order; nothing is assumed across actions.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::physics::Rotator;
use super::weapon::WeaponType;

/// Whether this instance owns canonical gameplay state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetRole {
    Authority,
    Remote,
}

impl NetRole {
    pub fn is_authority(self) -> bool {
        self == NetRole::Authority
    }
}

/// Observer → authority requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServerRequest {
    /// Fire the equipped weapon from the given muzzle transform
    Fire { location: Vec3, rotation: Rotator },
    /// Sprint/walk speed change
    SetMaxWalkSpeed { speed: f32 },
    /// Replicated view rotation
    SetLookRotation { rotation: Rotator },
    /// Replicated crouch flag
    SetCrouch { crouched: bool },
    /// Movement axes for this tick
    Move { forward: f32, right: f32 },
    Jump { pressed: bool },
    Equip { weapon: WeaponType },
    SwitchToPrevious,
    Reload,
}

impl ServerRequest {
    pub fn name(&self) -> &'static str {
        match self {
            ServerRequest::Fire { .. } => "fire",
            ServerRequest::SetMaxWalkSpeed { .. } => "set_max_walk_speed",
            ServerRequest::SetLookRotation { .. } => "set_look_rotation",
            ServerRequest::SetCrouch { .. } => "set_crouch",
            ServerRequest::Move { .. } => "move",
            ServerRequest::Jump { .. } => "jump",
            ServerRequest::Equip { .. } => "equip",
            ServerRequest::SwitchToPrevious => "switch_to_previous",
            ServerRequest::Reload => "reload",
        }
    }
}

/// Authority → every observer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Multicast {
    /// A round was fired: spawn the projectile and play the fire sound
    Fire {
        shooter_id: Uuid,
        projectile_id: Uuid,
        location: Vec3,
        rotation: Rotator,
        damage: u32,
    },
}

/// Character fields kept consistent on every observer.
/// Ammo and the equipped weapon are deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicatedCharacter {
    pub id: Uuid,
    pub display_name: String,
    pub position: Vec3,
    pub look_rotation: Rotator,
    pub crouched: bool,
}

/// Why a request was not applied
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestRejected {
    #[error("No character {0} in this world")]
    UnknownCharacter(Uuid),

    #[error("Request {0} must be applied on the authority")]
    NotAuthority(&'static str),
}

/// Admission check run on the authority before a request is applied.
/// Every request is currently admitted; speeds and rotations are not
/// range-checked.
pub fn admit(_request: &ServerRequest) -> Result<(), RequestRejected> {
    Ok(())
}

/// Message queued for the transport
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    ToAuthority {
        character_id: Uuid,
        request: ServerRequest,
    },
    Multicast(Multicast),
}

/// Outbound messages produced by one instance during a tick
#[derive(Debug, Default)]
pub struct Outbox {
    items: Vec<Outbound>,
}

impl Outbox {
    pub fn send_to_authority(&mut self, character_id: Uuid, request: ServerRequest) {
        self.items.push(Outbound::ToAuthority {
            character_id,
            request,
        });
    }

    pub fn multicast(&mut self, message: Multicast) {
        self.items.push(Outbound::Multicast(message));
    }

    pub fn drain(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.items)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_accepts_everything() {
        assert!(admit(&ServerRequest::SetMaxWalkSpeed { speed: 1.0e9 }).is_ok());
        assert!(admit(&ServerRequest::Reload).is_ok());
    }

    #[test]
    fn request_wire_format_is_tagged() {
        let json = serde_json::to_value(ServerRequest::SetCrouch { crouched: true }).unwrap();
        assert_eq!(json["kind"], "set_crouch");
        assert_eq!(json["crouched"], true);

        let back: ServerRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, ServerRequest::SetCrouch { crouched: true });
    }

    #[test]
    fn outbox_drains_in_order() {
        let id = Uuid::new_v4();
        let mut outbox = Outbox::default();
        outbox.send_to_authority(id, ServerRequest::Reload);
        outbox.send_to_authority(id, ServerRequest::SwitchToPrevious);

        let drained = outbox.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(
            &drained[0],
            Outbound::ToAuthority { request: ServerRequest::Reload, .. }
        ));
        assert!(outbox.is_empty());
    }
}
