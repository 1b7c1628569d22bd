//! A single simulation instance.
//!
//! The same `World` runs on the authority and on every remote instance; its
//! [`NetRole`] decides whether a player action is applied here or forwarded
//! to the authority through the outbox.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use glam::Vec3;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ws::protocol::GameEvent;

use super::character::Character;
use super::components::{is_overlapping, Collidable, Renderable};
use super::input::{ActionEvent, AxisFrame, ButtonState, InputAction};
use super::inventory::{FireOutcome, InventoryView};
use super::physics::{OverlapTracker, Rotator, SPRINT_SPEED, WALK_SPEED};
use super::pickup::{PickupItem, PickupSnapshot, PickupState, RESPAWN_DELAY};
use super::projectile::{CollisionCheckedSpawner, Projectile, ProjectileSpawner, SpawnRequest};
use super::replication::{
    admit, Multicast, NetRole, Outbound, Outbox, ReplicatedCharacter, RequestRejected,
    ServerRequest,
};
use super::timer::FrameTimers;
use super::weapon::PickupStats;

pub struct World {
    role: NetRole,
    tick: u64,
    characters: HashMap<Uuid, Character>,
    pickups: HashMap<Uuid, PickupItem>,
    projectiles: Vec<Projectile>,
    timers: FrameTimers<Uuid>,
    overlaps: OverlapTracker,
    outbox: Outbox,
    /// Characters whose owner-only inventory view changed since last drain
    dirty_inventories: HashSet<Uuid>,
    respawn_delay: Duration,
}

impl World {
    pub fn new(role: NetRole) -> Self {
        Self {
            role,
            tick: 0,
            characters: HashMap::new(),
            pickups: HashMap::new(),
            projectiles: Vec::new(),
            timers: FrameTimers::new(),
            overlaps: OverlapTracker::new(),
            outbox: Outbox::default(),
            dirty_inventories: HashSet::new(),
            respawn_delay: RESPAWN_DELAY,
        }
    }

    pub fn with_respawn_delay(mut self, delay: Duration) -> Self {
        self.respawn_delay = delay;
        self
    }

    pub fn role(&self) -> NetRole {
        self.role
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    // Entities

    pub fn spawn_character(&mut self, id: Uuid, display_name: String, position: Vec3, yaw: f32) {
        let character = Character::new(id, display_name, position, yaw);
        self.characters.insert(id, character);
        self.dirty_inventories.insert(id);
    }

    pub fn remove_character(&mut self, id: Uuid) -> Option<Character> {
        self.overlaps.forget(id);
        self.dirty_inventories.remove(&id);
        self.characters.remove(&id)
    }

    pub fn character(&self, id: Uuid) -> Option<&Character> {
        self.characters.get(&id)
    }

    pub fn character_mut(&mut self, id: Uuid) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    pub fn spawn_pickup(&mut self, position: Vec3, stats: PickupStats) -> Uuid {
        let pickup = PickupItem::with_respawn_delay(position, stats, self.respawn_delay);
        let id = pickup.id;
        self.pickups.insert(id, pickup);
        id
    }

    /// Remove a pickup; its pending respawn timer is cancelled
    pub fn destroy_pickup(&mut self, id: Uuid) -> bool {
        self.overlaps.forget(id);
        match self.pickups.remove(&id) {
            Some(mut pickup) => {
                pickup.teardown();
                true
            }
            None => false,
        }
    }

    pub fn pickup(&self, id: Uuid) -> Option<&PickupItem> {
        self.pickups.get(&id)
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    // Local input

    /// Handle a button event from the player controlling `id` on this instance
    pub fn handle_action(&mut self, id: Uuid, event: ActionEvent) {
        if !self.characters.contains_key(&id) {
            return;
        }
        let pressed = event.state == ButtonState::Pressed;

        match event.action {
            InputAction::Jump => {
                self.predict(id, |c| {
                    if pressed {
                        c.start_jump()
                    } else {
                        c.stop_jump()
                    }
                });
                self.route(id, ServerRequest::Jump { pressed });
            }
            InputAction::Crouch => {
                self.predict(id, |c| c.set_crouched(pressed));
                self.route(id, ServerRequest::SetCrouch { crouched: pressed });
            }
            InputAction::Sprint => {
                let speed = if pressed { SPRINT_SPEED } else { WALK_SPEED };
                self.route(id, ServerRequest::SetMaxWalkSpeed { speed });
            }
            InputAction::Fire if pressed => self.fire_local(id),
            InputAction::Melee
            | InputAction::Revolver
            | InputAction::Shotgun
            | InputAction::Rifle
                if pressed =>
            {
                let Some(weapon) = event.action.weapon_slot() else {
                    return;
                };
                let owned = self
                    .characters
                    .get(&id)
                    .is_some_and(|c| c.inventory.weapon(weapon).active && c.inventory.equipped() != weapon);
                if owned {
                    self.predict(id, |c| {
                        c.equip(weapon);
                    });
                    self.route(id, ServerRequest::Equip { weapon });
                }
            }
            InputAction::SwitchWeapon if pressed => {
                self.predict(id, |c| c.switch_to_previous());
                self.route(id, ServerRequest::SwitchToPrevious);
            }
            InputAction::Reload if pressed => {
                self.predict(id, |c| {
                    c.reload();
                });
                self.route(id, ServerRequest::Reload);
            }
            InputAction::DropWeapon if pressed => {
                debug!(character_id = %id, "Drop weapon requested, dropping is not supported");
            }
            _ => {}
        }
    }

    /// Handle this tick's axes from the player controlling `id`
    pub fn handle_axes(&mut self, id: Uuid, frame: AxisFrame, dt: f32) {
        let frame = frame.sanitized();
        let Some(character) = self.characters.get_mut(&id) else {
            return;
        };

        if frame.rotates_view() {
            character.add_yaw_input(frame.turn);
            character.turn_at_rate(frame.turn_rate, dt);
            character.add_pitch_input(frame.look_up);
            character.look_up_at_rate(frame.look_up_rate, dt);
            let rotation = character.control_rotation;
            self.route(id, ServerRequest::SetLookRotation { rotation });
        }

        if frame.move_forward != 0.0 || frame.move_right != 0.0 {
            self.predict(id, |c| {
                c.move_forward(frame.move_forward);
                c.move_right(frame.move_right);
            });
            self.route(
                id,
                ServerRequest::Move {
                    forward: frame.move_forward,
                    right: frame.move_right,
                },
            );
        }
    }

    /// Apply a state change on a remote instance ahead of the authority.
    /// The authority applies through `route` instead.
    fn predict(&mut self, id: Uuid, f: impl FnOnce(&mut Character)) {
        if self.role.is_authority() {
            return;
        }
        if let Some(character) = self.characters.get_mut(&id) {
            f(character);
        }
    }

    /// Forward to the authority, or apply here when this is the authority
    fn route(&mut self, id: Uuid, request: ServerRequest) {
        match self.role {
            NetRole::Remote => self.outbox.send_to_authority(id, request),
            NetRole::Authority => {
                if let Err(e) = self.apply_request(id, request) {
                    warn!(character_id = %id, error = %e, "Local request not applied");
                }
            }
        }
    }

    fn fire_local(&mut self, id: Uuid) {
        let Some(character) = self.characters.get_mut(&id) else {
            return;
        };
        // Remote instances judge by their predicted inventory
        if !character.inventory.can_fire() {
            debug!(character_id = %id, weapon = ?character.inventory.equipped(), "Nothing to fire");
            return;
        }
        let (location, rotation) = character.muzzle_transform();
        character.play_fire_animation();
        self.route(id, ServerRequest::Fire { location, rotation });
    }

    // Authority side

    /// Apply a request from the player controlling `id`
    pub fn apply_request(&mut self, id: Uuid, request: ServerRequest) -> Result<(), RequestRejected> {
        if !self.role.is_authority() {
            return Err(RequestRejected::NotAuthority(request.name()));
        }
        admit(&request)?;

        let character = self
            .characters
            .get_mut(&id)
            .ok_or(RequestRejected::UnknownCharacter(id))?;

        match request {
            ServerRequest::Fire { location, rotation } => {
                self.authority_fire(id, location, rotation);
            }
            ServerRequest::SetMaxWalkSpeed { speed } => character.set_max_walk_speed(speed),
            ServerRequest::SetLookRotation { rotation } if !rotation.is_finite() => {
                debug!(character_id = %id, "Non-finite look rotation ignored");
            }
            ServerRequest::SetLookRotation { rotation } => {
                character.set_look_rotation(rotation);
                character.control_rotation = rotation.normalized();
            }
            ServerRequest::SetCrouch { crouched } => character.set_crouched(crouched),
            ServerRequest::Move { forward, right } => {
                character.move_forward(forward.clamp(-1.0, 1.0));
                character.move_right(right.clamp(-1.0, 1.0));
            }
            ServerRequest::Jump { pressed } => {
                if pressed {
                    character.start_jump();
                } else {
                    character.stop_jump();
                }
            }
            ServerRequest::Equip { weapon } => {
                if character.equip(weapon) {
                    self.dirty_inventories.insert(id);
                }
            }
            ServerRequest::SwitchToPrevious => {
                character.switch_to_previous();
                self.dirty_inventories.insert(id);
            }
            ServerRequest::Reload => {
                let moved = character.reload();
                debug!(character_id = %id, moved, "Reload");
                self.dirty_inventories.insert(id);
            }
        }
        Ok(())
    }

    fn authority_fire(&mut self, id: Uuid, location: Vec3, rotation: Rotator) {
        let Some(character) = self.characters.get_mut(&id) else {
            return;
        };

        match character.fire() {
            FireOutcome::Fired { weapon, damage } => {
                debug!(character_id = %id, weapon = ?weapon, "Weapon fired");
                self.dirty_inventories.insert(id);

                let message = Multicast::Fire {
                    shooter_id: id,
                    projectile_id: Uuid::new_v4(),
                    location,
                    rotation,
                    damage,
                };
                self.apply_multicast(&message);
                self.outbox.multicast(message);
            }
            FireOutcome::EmptyClip | FireOutcome::Melee => {}
        }
    }

    // Observer side

    /// Apply an authority broadcast on this instance.
    /// Returns whether a projectile was spawned here.
    pub fn apply_multicast(&mut self, message: &Multicast) -> bool {
        match *message {
            Multicast::Fire {
                shooter_id,
                projectile_id,
                location,
                rotation,
                damage,
            } => {
                let spawned = {
                    let spawner = CollisionCheckedSpawner {
                        blockers: self
                            .characters
                            .values()
                            .map(|c| (c.id, c as &dyn Collidable))
                            .collect(),
                    };
                    spawner.spawn(SpawnRequest {
                        id: projectile_id,
                        owner_id: shooter_id,
                        location,
                        rotation,
                        damage,
                    })
                };

                if let Some(shooter) = self.characters.get_mut(&shooter_id) {
                    shooter.play_fire_sound();
                }

                match spawned {
                    Some(projectile) => {
                        self.projectiles.push(projectile);
                        true
                    }
                    None => {
                        debug!(projectile_id = %projectile_id, "Projectile spawn blocked");
                        false
                    }
                }
            }
        }
    }

    /// Adopt the authority's replicated character and pickup state
    pub fn apply_snapshot(&mut self, characters: &[ReplicatedCharacter], pickups: &[PickupSnapshot]) {
        let present: HashSet<Uuid> = characters.iter().map(|c| c.id).collect();
        self.characters.retain(|id, _| present.contains(id));

        for state in characters {
            self.characters
                .entry(state.id)
                .or_insert_with(|| Character::new(state.id, state.display_name.clone(), state.position, 0.0))
                .apply_replicated(state);
        }

        let present: HashSet<Uuid> = pickups.iter().map(|p| p.id).collect();
        self.pickups.retain(|id, _| present.contains(id));

        for snapshot in pickups {
            let pickup = self
                .pickups
                .entry(snapshot.id)
                .or_insert_with(|| PickupItem::mirror(snapshot));
            pickup.set_visible(snapshot.state == PickupState::Visible);
        }
    }

    /// Adopt the authority's view of the local player's inventory
    pub fn apply_inventory(&mut self, id: Uuid, view: &InventoryView) {
        if let Some(character) = self.characters.get_mut(&id) {
            character.adopt_inventory(view);
        }
    }

    // Simulation

    /// Advance one tick
    pub fn tick(&mut self, dt: f32) -> Vec<GameEvent> {
        let mut events = Vec::new();
        self.tick += 1;

        for character in self.characters.values_mut() {
            character.integrate(dt);
        }

        self.projectiles.retain_mut(|p| p.update(dt));

        for pickup_id in self.timers.advance() {
            if let Some(pickup) = self.pickups.get_mut(&pickup_id) {
                pickup.respawn();
                events.push(GameEvent::PickupRespawned { pickup_id });
            }
        }

        if self.role.is_authority() {
            events.extend(self.collect_pickups());
        }

        events
    }

    /// Deliver pickup overlap-begin callbacks to characters
    fn collect_pickups(&mut self) -> Vec<GameEvent> {
        let mut current = HashSet::new();
        for character in self.characters.values() {
            for pickup in self.pickups.values() {
                if is_overlapping(character, pickup) {
                    current.insert((character.id, pickup.id));
                }
            }
        }

        let mut events = Vec::new();
        for (character_id, pickup_id) in self.overlaps.update(current) {
            let (Some(character), Some(pickup)) = (
                self.characters.get_mut(&character_id),
                self.pickups.get_mut(&pickup_id),
            ) else {
                continue;
            };

            let Some(stats) = pickup.try_collect(&mut self.timers) else {
                continue;
            };
            let outcome = character.on_pickup(&stats);
            self.dirty_inventories.insert(character_id);

            info!(
                character_id = %character_id,
                pickup_id = %pickup_id,
                weapon = ?stats.weapon_type,
                outcome = ?outcome,
                "Weapon picked up"
            );
            events.push(GameEvent::PickupCollected {
                pickup_id,
                character_id,
                weapon_type: stats.weapon_type,
            });
        }
        events
    }

    // Replication output

    pub fn drain_outbox(&mut self) -> Vec<Outbound> {
        self.outbox.drain()
    }

    /// Owner-only inventory views that changed since the last call
    pub fn take_inventory_updates(&mut self) -> Vec<(Uuid, InventoryView)> {
        let dirty = std::mem::take(&mut self.dirty_inventories);
        dirty
            .into_iter()
            .filter_map(|id| self.characters.get(&id).map(|c| (id, c.inventory.view())))
            .collect()
    }

    pub fn replicated_characters(&self) -> Vec<ReplicatedCharacter> {
        self.characters.values().map(Character::replicated).collect()
    }

    pub fn pickup_snapshots(&self) -> Vec<PickupSnapshot> {
        self.pickups.values().map(PickupItem::snapshot).collect()
    }
}
