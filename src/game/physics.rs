//! Character kinematics, view rotation and overlap-begin tracking

use std::collections::HashSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default walking speed (units/s)
pub const WALK_SPEED: f32 = 600.0;
/// Speed while the sprint button is held
pub const SPRINT_SPEED: f32 = 1500.0;
/// Speed cap while crouched
pub const CROUCH_SPEED: f32 = 300.0;
/// Initial vertical speed of a jump
pub const JUMP_Z_VELOCITY: f32 = 420.0;
/// Downward acceleration
pub const GRAVITY: f32 = 980.0;
/// Capsule centre height when standing on the floor
pub const FLOOR_HEIGHT: f32 = 96.0;
/// Pitch limit in degrees
pub const MAX_PITCH: f32 = 89.0;

/// View rotation in degrees. X is forward, Y is right, Z is up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotator {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Rotator {
    pub fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Facing direction including pitch
    pub fn forward(&self) -> Vec3 {
        let (sp, cp) = self.pitch.to_radians().sin_cos();
        let (sy, cy) = self.yaw.to_radians().sin_cos();
        Vec3::new(cp * cy, cp * sy, sp)
    }

    /// Horizontal right direction (yaw only)
    pub fn right(&self) -> Vec3 {
        let (sy, cy) = self.yaw.to_radians().sin_cos();
        Vec3::new(-sy, cy, 0.0)
    }

    /// Up direction after pitch (roll is not applied)
    pub fn up(&self) -> Vec3 {
        let (sp, cp) = self.pitch.to_radians().sin_cos();
        let (sy, cy) = self.yaw.to_radians().sin_cos();
        Vec3::new(-sp * cy, -sp * sy, cp)
    }

    /// Horizontal facing direction (yaw only)
    pub fn flat_forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.to_radians().sin_cos();
        Vec3::new(cy, sy, 0.0)
    }

    /// Transform a vector from this rotation's local space to world space
    pub fn rotate_vector(&self, v: Vec3) -> Vec3 {
        self.forward() * v.x + self.right() * v.y + self.up() * v.z
    }

    /// Yaw wrapped to [0, 360), pitch clamped to the view limit
    pub fn normalized(self) -> Self {
        Self {
            pitch: self.pitch.clamp(-MAX_PITCH, MAX_PITCH),
            yaw: self.yaw.rem_euclid(360.0),
            roll: self.roll,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.pitch.is_finite() && self.yaw.is_finite() && self.roll.is_finite()
    }
}

/// Per-tick movement inputs for one character
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementInput {
    /// Accumulated world-space direction requested this tick
    pub direction: Vec3,
    pub jump_held: bool,
}

/// Kinematic movement integrator
pub struct MovementSystem;

impl MovementSystem {
    /// Advance a character one step.
    /// Returns (new_position, new_velocity)
    pub fn integrate(
        position: Vec3,
        velocity: Vec3,
        input: &MovementInput,
        max_speed: f32,
        dt: f32,
    ) -> (Vec3, Vec3) {
        let direction = input.direction.clamp_length_max(1.0);
        let horizontal = direction * max_speed;

        let grounded = position.z <= FLOOR_HEIGHT + f32::EPSILON;
        let mut vz = velocity.z;
        if grounded && input.jump_held && vz <= 0.0 {
            vz = JUMP_Z_VELOCITY;
        } else if !grounded {
            vz -= GRAVITY * dt;
        }

        let mut new_velocity = Vec3::new(horizontal.x, horizontal.y, vz);
        let mut new_position = position + new_velocity * dt;

        if new_position.z <= FLOOR_HEIGHT {
            new_position.z = FLOOR_HEIGHT;
            new_velocity.z = new_velocity.z.max(0.0);
        }

        (new_position, new_velocity)
    }
}

/// Remembers which (character, pickup) pairs overlapped last tick so only
/// the start of an overlap is reported.
#[derive(Debug, Default)]
pub struct OverlapTracker {
    active: HashSet<(Uuid, Uuid)>,
}

impl OverlapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed this tick's overlapping pairs; returns the ones that just began
    pub fn update(&mut self, current: HashSet<(Uuid, Uuid)>) -> Vec<(Uuid, Uuid)> {
        let began = current.difference(&self.active).copied().collect();
        self.active = current;
        began
    }

    /// Drop all pairs involving `id` (entity removed)
    pub fn forget(&mut self, id: Uuid) {
        self.active.retain(|(a, b)| *a != id && *b != id);
    }
}
