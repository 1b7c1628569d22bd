//! Sub-objects owned by characters and world entities.
//!
//! Characters are composed from a fixed set of named parts (capsule,
//! camera, meshes, weapon visuals) instead of inheriting an engine actor.
//! Parts expose what they can do through small capability traits.

use glam::Vec3;

use super::weapon::{WeaponSlots, WeaponType};

/// Something that can be shown or hidden
pub trait Renderable {
    fn is_visible(&self) -> bool;
    fn set_visible(&mut self, visible: bool);
}

/// Something that occupies space for overlap queries
pub trait Collidable {
    /// Collision volume, or `None` when collision is disabled
    fn bounds(&self) -> Option<Bounds>;
    fn location(&self) -> Vec3;
}

/// Collision volume centred on an entity's location
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bounds {
    Sphere { radius: f32 },
    /// Upright capsule; `half_height` includes the hemispherical caps
    Capsule { radius: f32, half_height: f32 },
}

impl Bounds {
    fn radius(&self) -> f32 {
        match *self {
            Bounds::Sphere { radius } | Bounds::Capsule { radius, .. } => radius,
        }
    }

    /// Half-length of the vertical core segment
    fn segment_half(&self) -> f32 {
        match *self {
            Bounds::Sphere { .. } => 0.0,
            Bounds::Capsule {
                radius,
                half_height,
            } => (half_height - radius).max(0.0),
        }
    }

    /// Test two volumes for overlap. Both shapes reduce to a vertical
    /// segment swept by a radius, so the test is a segment distance check.
    pub fn overlaps(&self, at: Vec3, other: &Bounds, other_at: Vec3) -> bool {
        let reach = self.radius() + other.radius();
        let horizontal = Vec3::new(other_at.x - at.x, other_at.y - at.y, 0.0).length_squared();

        let (a_lo, a_hi) = (at.z - self.segment_half(), at.z + self.segment_half());
        let (b_lo, b_hi) = (
            other_at.z - other.segment_half(),
            other_at.z + other.segment_half(),
        );
        let vertical = if a_hi < b_lo {
            b_lo - a_hi
        } else if b_hi < a_lo {
            a_lo - b_hi
        } else {
            0.0
        };

        horizontal + vertical * vertical <= reach * reach
    }
}

/// Two collidables overlap this instant
pub fn is_overlapping(a: &dyn Collidable, b: &dyn Collidable) -> bool {
    match (a.bounds(), b.bounds()) {
        (Some(ab), Some(bb)) => ab.overlaps(a.location(), &bb, b.location()),
        _ => false,
    }
}

/// A skeletal or static mesh part
#[derive(Debug, Clone, PartialEq)]
pub struct MeshComponent {
    pub name: &'static str,
    pub visible: bool,
    /// Only rendered for the controlling player
    pub owner_only: bool,
}

impl MeshComponent {
    pub fn new(name: &'static str, owner_only: bool) -> Self {
        Self {
            name,
            visible: true,
            owner_only,
        }
    }

    pub fn hidden(name: &'static str, owner_only: bool) -> Self {
        Self {
            visible: false,
            ..Self::new(name, owner_only)
        }
    }
}

impl Renderable for MeshComponent {
    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

/// First-person camera placement
#[derive(Debug, Clone, PartialEq)]
pub struct CameraComponent {
    pub relative_location: Vec3,
    /// Camera follows the controller rotation rather than the body
    pub use_pawn_control_rotation: bool,
}

/// First- and third-person meshes for a single weapon
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponVisual {
    pub first_person: MeshComponent,
    pub third_person: MeshComponent,
}

impl WeaponVisual {
    fn for_weapon(weapon: WeaponType) -> Self {
        let (fp, tp) = match weapon {
            WeaponType::Melee => ("FP_Melee", "TP_Melee"),
            WeaponType::Revolver => ("FP_Revolver", "TP_Revolver"),
            WeaponType::Shotgun => ("FP_Shotgun", "TP_Shotgun"),
            WeaponType::Rifle => ("FP_Rifle", "TP_Rifle"),
        };
        Self {
            first_person: MeshComponent::hidden(fp, true),
            third_person: MeshComponent::hidden(tp, false),
        }
    }
}

impl Renderable for WeaponVisual {
    fn is_visible(&self) -> bool {
        self.first_person.is_visible() || self.third_person.is_visible()
    }

    fn set_visible(&mut self, visible: bool) {
        self.first_person.set_visible(visible);
        self.third_person.set_visible(visible);
    }
}

/// Weapon meshes for every slot; at most one weapon is shown at a time
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponVisuals {
    slots: WeaponSlots<WeaponVisual>,
}

impl WeaponVisuals {
    pub fn new() -> Self {
        Self {
            slots: WeaponSlots::from_fn(WeaponVisual::for_weapon),
        }
    }

    pub fn show(&mut self, weapon: WeaponType) {
        self.slots[weapon].set_visible(true);
    }

    pub fn hide(&mut self, weapon: WeaponType) {
        self.slots[weapon].set_visible(false);
    }

    pub fn is_shown(&self, weapon: WeaponType) -> bool {
        self.slots[weapon].is_visible()
    }

    pub fn visible_count(&self) -> usize {
        self.slots.iter().filter(|(_, v)| v.is_visible()).count()
    }
}

impl Default for WeaponVisuals {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts of one-shot presentation cues triggered on this instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnimationCues {
    pub fire_montage: u32,
    pub fire_sound: u32,
}

/// Collision capsule radius
pub const CAPSULE_RADIUS: f32 = 55.0;
/// Collision capsule half height
pub const CAPSULE_HALF_HEIGHT: f32 = 96.0;
/// Muzzle location relative to the character origin
pub const MUZZLE_OFFSET: Vec3 = Vec3::new(0.2, 48.4, -10.6);

/// The fixed set of parts every character owns
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterRig {
    pub capsule: Bounds,
    pub camera: CameraComponent,
    /// Arms, seen only by the controlling player
    pub first_person_mesh: MeshComponent,
    /// Full body, seen only by others
    pub third_person_mesh: MeshComponent,
    pub weapons: WeaponVisuals,
    pub muzzle_offset: Vec3,
    pub cues: AnimationCues,
}

impl CharacterRig {
    pub fn new() -> Self {
        Self {
            capsule: Bounds::Capsule {
                radius: CAPSULE_RADIUS,
                half_height: CAPSULE_HALF_HEIGHT,
            },
            camera: CameraComponent {
                relative_location: Vec3::new(-39.56, 1.75, 64.0),
                use_pawn_control_rotation: true,
            },
            first_person_mesh: MeshComponent::new("CharacterMesh1P", true),
            third_person_mesh: MeshComponent::new("CharacterMesh0", false),
            weapons: WeaponVisuals::new(),
            muzzle_offset: MUZZLE_OFFSET,
            cues: AnimationCues::default(),
        }
    }
}

impl Default for CharacterRig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spheres_overlap_within_combined_radius() {
        let a = Bounds::Sphere { radius: 10.0 };
        let b = Bounds::Sphere { radius: 5.0 };
        assert!(a.overlaps(Vec3::ZERO, &b, Vec3::new(14.0, 0.0, 0.0)));
        assert!(!a.overlaps(Vec3::ZERO, &b, Vec3::new(16.0, 0.0, 0.0)));
    }

    #[test]
    fn capsule_reaches_vertically_along_its_core() {
        let capsule = Bounds::Capsule {
            radius: CAPSULE_RADIUS,
            half_height: CAPSULE_HALF_HEIGHT,
        };
        let sphere = Bounds::Sphere { radius: 10.0 };

        // Core spans z in [-41, 41]; reach above is 41 + 55 + 10
        assert!(capsule.overlaps(Vec3::ZERO, &sphere, Vec3::new(0.0, 0.0, 105.0)));
        assert!(!capsule.overlaps(Vec3::ZERO, &sphere, Vec3::new(0.0, 0.0, 107.0)));
    }

    #[test]
    fn weapon_visuals_start_hidden() {
        let mut visuals = WeaponVisuals::new();
        assert_eq!(visuals.visible_count(), 0);

        visuals.show(WeaponType::Rifle);
        assert!(visuals.is_shown(WeaponType::Rifle));
        assert_eq!(visuals.visible_count(), 1);

        visuals.hide(WeaponType::Rifle);
        assert_eq!(visuals.visible_count(), 0);
    }
}
