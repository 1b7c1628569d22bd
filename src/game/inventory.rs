//! Per-character weapon inventory and its equip/fire/reload/pickup transitions

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::components::WeaponVisuals;
use super::weapon::{PickupStats, WeaponSlots, WeaponState, WeaponType};

/// Result of a fire attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// One round consumed; the caller spawns the projectile
    Fired { weapon: WeaponType, damage: u32 },
    /// Clip is empty, nothing happens
    EmptyClip,
    /// Melee attacks are not resolved yet
    Melee,
}

/// Which branch a pickup took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupOutcome {
    /// First pickup of this type: stats adopted and weapon equipped
    Unlocked,
    /// Reserve was empty and is now exactly the pickup's clip ammo
    ReserveSet { reserve: u32 },
    /// Pickup clip ammo added to reserve, clamped to the cap
    ReserveAdded { reserve: u32 },
}

/// Owner-only view of the inventory, sent to the controlling player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryView {
    pub equipped: WeaponType,
    pub cached: WeaponType,
    pub weapons: WeaponSlots<WeaponState>,
    pub reserve: WeaponSlots<u32>,
}

/// Weapon inventory owned by a character
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponInventory {
    weapons: WeaponSlots<WeaponState>,
    total_ammo: WeaponSlots<u32>,
    max_total_ammo: WeaponSlots<u32>,
    equipped: WeaponType,
    cached: WeaponType,
}

impl WeaponInventory {
    /// Spawn loadout: melee owned and equipped, everything else locked
    pub fn new(visuals: &mut WeaponVisuals) -> Self {
        let mut weapons: WeaponSlots<WeaponState> = WeaponSlots::default();
        weapons[WeaponType::Melee].adopt(&PickupStats::default_for(WeaponType::Melee));

        visuals.show(WeaponType::Melee);

        Self {
            weapons,
            total_ammo: WeaponSlots::default(),
            max_total_ammo: WeaponSlots::from_fn(WeaponType::default_max_reserve),
            equipped: WeaponType::Melee,
            cached: WeaponType::Melee,
        }
    }

    pub fn equipped(&self) -> WeaponType {
        self.equipped
    }

    pub fn cached(&self) -> WeaponType {
        self.cached
    }

    pub fn weapon(&self, weapon: WeaponType) -> &WeaponState {
        &self.weapons[weapon]
    }

    pub fn reserve(&self, weapon: WeaponType) -> u32 {
        self.total_ammo[weapon]
    }

    pub fn max_reserve(&self, weapon: WeaponType) -> u32 {
        self.max_total_ammo[weapon]
    }

    /// Make `weapon` the equipped one and remember the previous one.
    ///
    /// Performs no ownership checks; callers go through [`try_equip`].
    ///
    /// [`try_equip`]: WeaponInventory::try_equip
    pub fn equip(&mut self, weapon: WeaponType, visuals: &mut WeaponVisuals) {
        visuals.hide(self.equipped);
        self.cached = self.equipped;
        self.equipped = weapon;
        visuals.show(weapon);
    }

    /// Equip `weapon` if it is owned and not already in hand.
    /// Returns whether the equip happened.
    pub fn try_equip(&mut self, weapon: WeaponType, visuals: &mut WeaponVisuals) -> bool {
        if !self.weapons[weapon].active || weapon == self.equipped {
            debug!(weapon = ?weapon, "Equip ignored");
            return false;
        }
        self.equip(weapon, visuals);
        true
    }

    /// Toggle between the two most recently used weapons
    pub fn switch_to_previous(&mut self, visuals: &mut WeaponVisuals) {
        visuals.hide(self.equipped);
        std::mem::swap(&mut self.equipped, &mut self.cached);
        visuals.show(self.equipped);
    }

    /// Whether `fire` would release a round
    pub fn can_fire(&self) -> bool {
        !self.equipped.is_melee() && self.weapons[self.equipped].clip_ammo > 0
    }

    /// Consume one round from the equipped weapon
    pub fn fire(&mut self) -> FireOutcome {
        if self.equipped.is_melee() {
            return FireOutcome::Melee;
        }

        let weapon = &mut self.weapons[self.equipped];
        if weapon.clip_ammo == 0 {
            return FireOutcome::EmptyClip;
        }

        weapon.clip_ammo -= 1;
        FireOutcome::Fired {
            weapon: self.equipped,
            damage: weapon.damage,
        }
    }

    /// Move reserve ammo into the equipped weapon's clip.
    /// Returns the number of rounds moved.
    pub fn reload(&mut self) -> u32 {
        let equipped = self.equipped;
        if equipped.is_melee() {
            return 0;
        }

        let missing = self.weapons[equipped].missing_ammo();
        let mut moved = 0;
        for _ in 0..missing {
            if self.total_ammo[equipped] == 0 {
                break;
            }
            self.total_ammo[equipped] -= 1;
            self.weapons[equipped].clip_ammo += 1;
            moved += 1;
        }
        moved
    }

    /// Apply a collected weapon pickup
    pub fn on_pickup(&mut self, stats: &PickupStats, visuals: &mut WeaponVisuals) -> PickupOutcome {
        let weapon = stats.weapon_type;

        if !self.weapons[weapon].active {
            self.weapons[weapon].adopt(stats);
            if weapon != self.equipped {
                self.equip(weapon, visuals);
            }
            return PickupOutcome::Unlocked;
        }

        if self.total_ammo[weapon] == 0 {
            // Overwrites rather than adds; see DESIGN.md open questions
            self.total_ammo[weapon] = stats.clip_ammo;
            return PickupOutcome::ReserveSet {
                reserve: self.total_ammo[weapon],
            };
        }

        let reserve = self.total_ammo[weapon]
            .saturating_add(stats.clip_ammo)
            .min(self.max_total_ammo[weapon]);
        self.total_ammo[weapon] = reserve;
        PickupOutcome::ReserveAdded { reserve }
    }

    pub fn view(&self) -> InventoryView {
        InventoryView {
            equipped: self.equipped,
            cached: self.cached,
            weapons: self.weapons,
            reserve: self.total_ammo,
        }
    }

    /// Replace local state with the authority's view (owner side)
    pub fn adopt_view(&mut self, view: &InventoryView, visuals: &mut WeaponVisuals) {
        visuals.hide(self.equipped);
        self.weapons = view.weapons;
        self.total_ammo = view.reserve;
        self.equipped = view.equipped;
        self.cached = view.cached;
        visuals.show(self.equipped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revolver(clip: u32) -> PickupStats {
        PickupStats {
            weapon_type: WeaponType::Revolver,
            clip_ammo: clip,
            max_clip_ammo: 6,
            reload_time: 2,
            damage: 35,
        }
    }

    fn armed() -> (WeaponInventory, WeaponVisuals) {
        let mut visuals = WeaponVisuals::new();
        let mut inventory = WeaponInventory::new(&mut visuals);
        inventory.on_pickup(&revolver(6), &mut visuals);
        (inventory, visuals)
    }

    #[test]
    fn spawns_with_melee_equipped() {
        let mut visuals = WeaponVisuals::new();
        let inventory = WeaponInventory::new(&mut visuals);

        assert_eq!(inventory.equipped(), WeaponType::Melee);
        assert!(inventory.weapon(WeaponType::Melee).active);
        assert!(!inventory.weapon(WeaponType::Rifle).active);
        assert!(visuals.is_shown(WeaponType::Melee));
        assert_eq!(visuals.visible_count(), 1);
    }

    #[test]
    fn fire_consumes_exactly_one_round() {
        let (mut inventory, _) = armed();

        assert_eq!(
            inventory.fire(),
            FireOutcome::Fired {
                weapon: WeaponType::Revolver,
                damage: 35
            }
        );
        assert_eq!(inventory.weapon(WeaponType::Revolver).clip_ammo, 5);
    }

    #[test]
    fn fire_with_empty_clip_changes_nothing() {
        let (mut inventory, _) = armed();
        for _ in 0..6 {
            inventory.fire();
        }

        let before = inventory.clone();
        assert_eq!(inventory.fire(), FireOutcome::EmptyClip);
        assert_eq!(inventory, before);
    }

    #[test]
    fn fire_with_melee_is_a_no_op() {
        let mut visuals = WeaponVisuals::new();
        let mut inventory = WeaponInventory::new(&mut visuals);
        let before = inventory.clone();

        assert_eq!(inventory.fire(), FireOutcome::Melee);
        assert_eq!(inventory, before);
    }

    #[test]
    fn reload_conserves_ammo_and_respects_clip_size() {
        let (mut inventory, mut visuals) = armed();
        inventory.on_pickup(&revolver(20), &mut visuals);
        for _ in 0..4 {
            inventory.fire();
        }

        let w = WeaponType::Revolver;
        let total_before = inventory.weapon(w).clip_ammo + inventory.reserve(w);
        let moved = inventory.reload();

        assert_eq!(moved, 4);
        assert_eq!(inventory.weapon(w).clip_ammo, 6);
        assert_eq!(inventory.reserve(w), 16);
        assert_eq!(
            inventory.weapon(w).clip_ammo + inventory.reserve(w),
            total_before
        );
    }

    #[test]
    fn reload_conserves_ammo_for_every_firearm() {
        for weapon in WeaponType::ALL.into_iter().filter(|w| !w.is_melee()) {
            let mut visuals = WeaponVisuals::new();
            let mut inventory = WeaponInventory::new(&mut visuals);
            let stats = PickupStats::default_for(weapon);
            inventory.on_pickup(&stats, &mut visuals);
            inventory.on_pickup(&stats, &mut visuals);
            for _ in 0..3 {
                inventory.fire();
            }

            let total_before = inventory.weapon(weapon).clip_ammo + inventory.reserve(weapon);
            let moved = inventory.reload();

            assert_eq!(moved, 3, "{weapon:?}");
            assert_eq!(inventory.weapon(weapon).clip_ammo, stats.max_clip_ammo, "{weapon:?}");
            assert_eq!(
                inventory.weapon(weapon).clip_ammo + inventory.reserve(weapon),
                total_before,
                "{weapon:?}"
            );
        }
    }

    #[test]
    fn reload_with_full_clip_moves_nothing() {
        let (mut inventory, mut visuals) = armed();
        inventory.on_pickup(&revolver(6), &mut visuals);
        let before = inventory.clone();

        assert_eq!(inventory.reload(), 0);
        assert_eq!(inventory, before);
    }

    #[test]
    fn can_fire_matches_fire_outcome() {
        let mut visuals = WeaponVisuals::new();
        let mut inventory = WeaponInventory::new(&mut visuals);
        assert!(!inventory.can_fire());

        inventory.on_pickup(&revolver(1), &mut visuals);
        assert!(inventory.can_fire());
        inventory.fire();
        assert!(!inventory.can_fire());
        assert_eq!(inventory.fire(), FireOutcome::EmptyClip);
    }

    #[test]
    fn reload_stops_when_reserve_runs_out() {
        let (mut inventory, mut visuals) = armed();
        inventory.on_pickup(&revolver(2), &mut visuals);
        for _ in 0..5 {
            inventory.fire();
        }

        let moved = inventory.reload();

        assert_eq!(moved, 2);
        assert_eq!(inventory.weapon(WeaponType::Revolver).clip_ammo, 3);
        assert_eq!(inventory.reserve(WeaponType::Revolver), 0);
    }

    #[test]
    fn reload_on_melee_does_nothing() {
        let (mut inventory, mut visuals) = armed();
        inventory.try_equip(WeaponType::Melee, &mut visuals);
        let before = inventory.clone();

        assert_eq!(inventory.reload(), 0);
        assert_eq!(inventory, before);
    }

    #[test]
    fn equip_same_weapon_through_guard_keeps_cache() {
        let (mut inventory, mut visuals) = armed();
        assert_eq!(inventory.equipped(), WeaponType::Revolver);
        assert_eq!(inventory.cached(), WeaponType::Melee);

        assert!(!inventory.try_equip(WeaponType::Revolver, &mut visuals));
        assert!(!inventory.try_equip(WeaponType::Revolver, &mut visuals));

        assert_eq!(inventory.equipped(), WeaponType::Revolver);
        assert_eq!(inventory.cached(), WeaponType::Melee);
        assert_eq!(visuals.visible_count(), 1);
        assert!(visuals.is_shown(WeaponType::Revolver));
    }

    #[test]
    fn equip_locked_weapon_is_rejected() {
        let (mut inventory, mut visuals) = armed();
        assert!(!inventory.try_equip(WeaponType::Rifle, &mut visuals));
        assert_eq!(inventory.equipped(), WeaponType::Revolver);
    }

    #[test]
    fn equip_shows_only_the_new_weapon() {
        let (mut inventory, mut visuals) = armed();
        assert!(inventory.try_equip(WeaponType::Melee, &mut visuals));

        assert_eq!(inventory.equipped(), WeaponType::Melee);
        assert_eq!(inventory.cached(), WeaponType::Revolver);
        assert!(visuals.is_shown(WeaponType::Melee));
        assert!(!visuals.is_shown(WeaponType::Revolver));
        assert_eq!(visuals.visible_count(), 1);
    }

    #[test]
    fn switching_twice_restores_the_pair() {
        let (mut inventory, mut visuals) = armed();
        let pair = (inventory.equipped(), inventory.cached());

        inventory.switch_to_previous(&mut visuals);
        assert_eq!((inventory.cached(), inventory.equipped()), pair);
        assert!(visuals.is_shown(WeaponType::Melee));

        inventory.switch_to_previous(&mut visuals);
        assert_eq!((inventory.equipped(), inventory.cached()), pair);
        assert_eq!(visuals.visible_count(), 1);
    }

    #[test]
    fn pickup_sequence_unlocks_then_overwrites_then_clamps() {
        let mut visuals = WeaponVisuals::new();
        let mut inventory = WeaponInventory::new(&mut visuals);
        let rifle = |clip| PickupStats {
            weapon_type: WeaponType::Rifle,
            clip_ammo: clip,
            max_clip_ammo: 30,
            reload_time: 2,
            damage: 20,
        };
        assert_eq!(inventory.max_reserve(WeaponType::Rifle), 100);

        assert_eq!(inventory.on_pickup(&rifle(6), &mut visuals), PickupOutcome::Unlocked);
        assert!(inventory.weapon(WeaponType::Rifle).active);
        assert_eq!(inventory.equipped(), WeaponType::Rifle);
        assert_eq!(inventory.weapon(WeaponType::Rifle).clip_ammo, 6);
        assert_eq!(inventory.reserve(WeaponType::Rifle), 0);

        assert_eq!(
            inventory.on_pickup(&rifle(10), &mut visuals),
            PickupOutcome::ReserveSet { reserve: 10 }
        );
        assert_eq!(inventory.reserve(WeaponType::Rifle), 10);

        assert_eq!(
            inventory.on_pickup(&rifle(200), &mut visuals),
            PickupOutcome::ReserveAdded { reserve: 100 }
        );
        assert_eq!(inventory.reserve(WeaponType::Rifle), 100);
    }

    #[test]
    fn view_round_trips_into_a_fresh_inventory() {
        let (inventory, _) = armed();
        let mut visuals = WeaponVisuals::new();
        let mut mirror = WeaponInventory::new(&mut visuals);

        mirror.adopt_view(&inventory.view(), &mut visuals);

        assert_eq!(mirror.equipped(), WeaponType::Revolver);
        assert_eq!(mirror.weapon(WeaponType::Revolver).clip_ammo, 6);
        assert!(visuals.is_shown(WeaponType::Revolver));
        assert_eq!(visuals.visible_count(), 1);
    }
}
