//! Weapon types, per-weapon ammo state and pickup stat blocks

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// Weapon categories a character can own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponType {
    /// Always owned, never consumes ammo
    Melee,
    Revolver,
    Shotgun,
    Rifle,
}

impl WeaponType {
    pub const COUNT: usize = 4;

    /// Every weapon type in slot order
    pub const ALL: [WeaponType; Self::COUNT] = [
        WeaponType::Melee,
        WeaponType::Revolver,
        WeaponType::Shotgun,
        WeaponType::Rifle,
    ];

    /// Slot index into a [`WeaponSlots`] table
    pub const fn index(self) -> usize {
        match self {
            WeaponType::Melee => 0,
            WeaponType::Revolver => 1,
            WeaponType::Shotgun => 2,
            WeaponType::Rifle => 3,
        }
    }

    /// Reserve ammo cap carried for this weapon type
    pub const fn default_max_reserve(self) -> u32 {
        match self {
            WeaponType::Melee => 0,
            WeaponType::Revolver => 36,
            WeaponType::Shotgun => 24,
            WeaponType::Rifle => 100,
        }
    }

    pub fn is_melee(self) -> bool {
        self == WeaponType::Melee
    }
}

impl Default for WeaponType {
    fn default() -> Self {
        Self::Melee
    }
}

/// Fixed-size table with one entry per [`WeaponType`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponSlots<T>([T; WeaponType::COUNT]);

impl<T> WeaponSlots<T> {
    /// Build a table by evaluating `f` for each weapon type
    pub fn from_fn(mut f: impl FnMut(WeaponType) -> T) -> Self {
        Self(WeaponType::ALL.map(&mut f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (WeaponType, &T)> {
        WeaponType::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T: Default> Default for WeaponSlots<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<T> Index<WeaponType> for WeaponSlots<T> {
    type Output = T;

    fn index(&self, weapon: WeaponType) -> &T {
        &self.0[weapon.index()]
    }
}

impl<T> IndexMut<WeaponType> for WeaponSlots<T> {
    fn index_mut(&mut self, weapon: WeaponType) -> &mut T {
        &mut self.0[weapon.index()]
    }
}

/// Ammo and capability record for one weapon slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponState {
    /// Capacity of a loaded clip
    pub max_clip_ammo: u32,
    /// Rounds currently loaded
    pub clip_ammo: u32,
    /// Reload duration in seconds (stored, reloads are instantaneous)
    pub reload_time: u32,
    pub damage: u32,
    /// Whether the character owns this weapon
    pub active: bool,
}

impl WeaponState {
    /// Rounds needed to top the clip up
    pub fn missing_ammo(&self) -> u32 {
        self.max_clip_ammo.saturating_sub(self.clip_ammo)
    }

    /// Overwrite the stat block with a pickup's values and mark owned.
    /// Values are taken as-is; a pickup carrying more clip ammo than its
    /// clip capacity is not clamped.
    pub fn adopt(&mut self, stats: &PickupStats) {
        self.clip_ammo = stats.clip_ammo;
        self.max_clip_ammo = stats.max_clip_ammo;
        self.reload_time = stats.reload_time;
        self.damage = stats.damage;
        self.active = true;
    }
}

/// Stat block transferred to a character when a weapon pickup is collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupStats {
    pub weapon_type: WeaponType,
    pub clip_ammo: u32,
    pub max_clip_ammo: u32,
    pub reload_time: u32,
    pub damage: u32,
}

impl PickupStats {
    /// Stock stat profile placed in levels for each weapon type
    pub fn default_for(weapon_type: WeaponType) -> Self {
        match weapon_type {
            WeaponType::Melee => Self {
                weapon_type,
                clip_ammo: 0,
                max_clip_ammo: 0,
                reload_time: 0,
                damage: 50,
            },
            WeaponType::Revolver => Self {
                weapon_type,
                clip_ammo: 6,
                max_clip_ammo: 6,
                reload_time: 2,
                damage: 35,
            },
            WeaponType::Shotgun => Self {
                weapon_type,
                clip_ammo: 8,
                max_clip_ammo: 8,
                reload_time: 3,
                damage: 60,
            },
            WeaponType::Rifle => Self {
                weapon_type,
                clip_ammo: 30,
                max_clip_ammo: 30,
                reload_time: 2,
                damage: 20,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_indices_follow_declaration_order() {
        for (i, weapon) in WeaponType::ALL.iter().enumerate() {
            assert_eq!(weapon.index(), i);
        }
    }

    #[test]
    fn slots_index_by_weapon_type() {
        let mut slots: WeaponSlots<u32> = WeaponSlots::default();
        slots[WeaponType::Shotgun] = 7;
        assert_eq!(slots[WeaponType::Shotgun], 7);
        assert_eq!(slots[WeaponType::Rifle], 0);

        let caps = WeaponSlots::from_fn(WeaponType::default_max_reserve);
        assert_eq!(caps[WeaponType::Rifle], 100);
        assert_eq!(caps[WeaponType::Melee], 0);
    }

    #[test]
    fn adopt_copies_stats_without_clamping() {
        let mut state = WeaponState::default();
        let stats = PickupStats {
            weapon_type: WeaponType::Revolver,
            clip_ammo: 9,
            max_clip_ammo: 6,
            reload_time: 2,
            damage: 35,
        };
        state.adopt(&stats);

        assert!(state.active);
        assert_eq!(state.clip_ammo, 9);
        assert_eq!(state.max_clip_ammo, 6);
        assert_eq!(state.missing_ammo(), 0);
    }
}
