//! First-person player character: movement, view, crouch, sprint and weapons

use glam::Vec3;
use uuid::Uuid;

use super::components::{Bounds, CharacterRig, Collidable};
use super::inventory::{FireOutcome, InventoryView, PickupOutcome, WeaponInventory};
use super::physics::{MovementInput, MovementSystem, Rotator, CROUCH_SPEED, FLOOR_HEIGHT, WALK_SPEED};
use super::replication::ReplicatedCharacter;
use super::weapon::{PickupStats, WeaponType};

/// Yaw rate at full stick deflection (deg/s)
pub const BASE_TURN_RATE: f32 = 45.0;
/// Pitch rate at full stick deflection (deg/s)
pub const BASE_LOOK_UP_RATE: f32 = 45.0;
/// Projectile spawn offset from the muzzle, in view space
pub const GUN_OFFSET: Vec3 = Vec3::new(100.0, 0.0, 10.0);

#[derive(Debug)]
pub struct Character {
    pub id: Uuid,
    pub display_name: String,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Local controller rotation
    pub control_rotation: Rotator,
    /// Replicated view rotation seen by observers
    pub look_rotation: Rotator,
    /// Replicated crouch flag
    pub crouched: bool,
    pub max_walk_speed: f32,
    pub rig: CharacterRig,
    pub inventory: WeaponInventory,
    movement: MovementInput,
}

impl Character {
    pub fn new(id: Uuid, display_name: String, spawn: Vec3, yaw: f32) -> Self {
        let mut rig = CharacterRig::new();
        let inventory = WeaponInventory::new(&mut rig.weapons);
        let rotation = Rotator::new(0.0, yaw, 0.0).normalized();

        Self {
            id,
            display_name,
            position: Vec3::new(spawn.x, spawn.y, spawn.z.max(FLOOR_HEIGHT)),
            velocity: Vec3::ZERO,
            control_rotation: rotation,
            look_rotation: rotation,
            crouched: false,
            max_walk_speed: WALK_SPEED,
            rig,
            inventory,
            movement: MovementInput::default(),
        }
    }

    // Movement

    pub fn move_forward(&mut self, value: f32) {
        if value != 0.0 {
            self.movement.direction += self.control_rotation.flat_forward() * value;
        }
    }

    pub fn move_right(&mut self, value: f32) {
        if value != 0.0 {
            self.movement.direction += self.control_rotation.right() * value;
        }
    }

    pub fn start_jump(&mut self) {
        self.movement.jump_held = true;
    }

    pub fn stop_jump(&mut self) {
        self.movement.jump_held = false;
    }

    pub fn set_crouched(&mut self, crouched: bool) {
        self.crouched = crouched;
    }

    pub fn set_max_walk_speed(&mut self, speed: f32) {
        self.max_walk_speed = speed;
    }

    /// Effective speed cap this tick
    pub fn current_max_speed(&self) -> f32 {
        if self.crouched {
            CROUCH_SPEED.min(self.max_walk_speed)
        } else {
            self.max_walk_speed
        }
    }

    /// Consume this tick's movement input
    pub fn integrate(&mut self, dt: f32) {
        let (position, velocity) = MovementSystem::integrate(
            self.position,
            self.velocity,
            &self.movement,
            self.current_max_speed(),
            dt,
        );
        self.position = position;
        self.velocity = velocity;
        self.movement.direction = Vec3::ZERO;
    }

    // View

    pub fn add_yaw_input(&mut self, degrees: f32) {
        self.control_rotation.yaw += degrees;
        self.control_rotation = self.control_rotation.normalized();
    }

    pub fn add_pitch_input(&mut self, degrees: f32) {
        self.control_rotation.pitch += degrees;
        self.control_rotation = self.control_rotation.normalized();
    }

    pub fn turn_at_rate(&mut self, rate: f32, dt: f32) {
        self.add_yaw_input(rate * BASE_TURN_RATE * dt);
    }

    pub fn look_up_at_rate(&mut self, rate: f32, dt: f32) {
        self.add_pitch_input(rate * BASE_LOOK_UP_RATE * dt);
    }

    pub fn set_look_rotation(&mut self, rotation: Rotator) {
        self.look_rotation = rotation;
    }

    /// World-space projectile spawn location and orientation
    pub fn muzzle_transform(&self) -> (Vec3, Rotator) {
        let spawn_rotation = self.control_rotation;
        let body = Rotator::new(0.0, spawn_rotation.yaw, 0.0);
        let muzzle = self.position + body.rotate_vector(self.rig.muzzle_offset);
        (muzzle + spawn_rotation.rotate_vector(GUN_OFFSET), spawn_rotation)
    }

    // Weapons

    pub fn equip(&mut self, weapon: WeaponType) -> bool {
        self.inventory.try_equip(weapon, &mut self.rig.weapons)
    }

    pub fn switch_to_previous(&mut self) {
        self.inventory.switch_to_previous(&mut self.rig.weapons);
    }

    pub fn reload(&mut self) -> u32 {
        self.inventory.reload()
    }

    pub fn fire(&mut self) -> FireOutcome {
        self.inventory.fire()
    }

    pub fn on_pickup(&mut self, stats: &PickupStats) -> PickupOutcome {
        self.inventory.on_pickup(stats, &mut self.rig.weapons)
    }

    pub fn adopt_inventory(&mut self, view: &InventoryView) {
        self.inventory.adopt_view(view, &mut self.rig.weapons);
    }

    /// Play the arms fire montage
    pub fn play_fire_animation(&mut self) {
        self.rig.cues.fire_montage += 1;
    }

    /// Play the fire sound at the muzzle
    pub fn play_fire_sound(&mut self) {
        self.rig.cues.fire_sound += 1;
    }

    // Replication

    pub fn replicated(&self) -> ReplicatedCharacter {
        ReplicatedCharacter {
            id: self.id,
            display_name: self.display_name.clone(),
            position: self.position,
            look_rotation: self.look_rotation,
            crouched: self.crouched,
        }
    }

    /// Adopt replicated fields from the authority
    pub fn apply_replicated(&mut self, state: &ReplicatedCharacter) {
        self.position = state.position;
        self.look_rotation = state.look_rotation;
        self.crouched = state.crouched;
    }
}

impl Collidable for Character {
    fn bounds(&self) -> Option<Bounds> {
        Some(self.rig.capsule)
    }

    fn location(&self) -> Vec3 {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::SPRINT_SPEED;

    fn character() -> Character {
        Character::new(Uuid::new_v4(), "tester".to_string(), Vec3::ZERO, 0.0)
    }

    #[test]
    fn spawns_on_floor_with_melee() {
        let c = character();
        assert_eq!(c.position.z, FLOOR_HEIGHT);
        assert_eq!(c.inventory.equipped(), WeaponType::Melee);
        assert_eq!(c.max_walk_speed, WALK_SPEED);
    }

    #[test]
    fn forward_input_moves_along_yaw() {
        let mut c = character();
        c.add_yaw_input(90.0);
        c.move_forward(1.0);
        c.integrate(0.5);

        assert!(c.position.x.abs() < 1e-2);
        assert!((c.position.y - WALK_SPEED * 0.5).abs() < 1e-2);
    }

    #[test]
    fn sprint_and_crouch_change_speed_cap() {
        let mut c = character();
        c.set_max_walk_speed(SPRINT_SPEED);
        assert_eq!(c.current_max_speed(), SPRINT_SPEED);

        c.set_crouched(true);
        assert_eq!(c.current_max_speed(), CROUCH_SPEED);
    }

    #[test]
    fn turn_rate_scales_by_base_rate_and_delta() {
        let mut c = character();
        c.turn_at_rate(1.0, 0.5);
        assert!((c.control_rotation.yaw - 22.5).abs() < 1e-4);

        c.look_up_at_rate(-1.0, 1.0);
        assert!((c.control_rotation.pitch + 45.0).abs() < 1e-4);
    }

    #[test]
    fn muzzle_sits_ahead_of_the_character() {
        let c = character();
        let (location, rotation) = c.muzzle_transform();

        assert_eq!(rotation, c.control_rotation);
        assert!((location.x - 100.2).abs() < 1e-3);
        assert!((location.y - 48.4).abs() < 1e-3);
    }

    #[test]
    fn replicated_fields_round_trip() {
        let mut authority = character();
        authority.set_crouched(true);
        authority.set_look_rotation(Rotator::new(10.0, 20.0, 0.0));

        let mut observer = Character::new(authority.id, "tester".to_string(), Vec3::ZERO, 0.0);
        observer.apply_replicated(&authority.replicated());

        assert!(observer.crouched);
        assert_eq!(observer.look_rotation, Rotator::new(10.0, 20.0, 0.0));
    }
}
