//! Projectiles and the spawn collaborator

use glam::Vec3;
use uuid::Uuid;

use super::components::{is_overlapping, Bounds, Collidable};
use super::physics::Rotator;

/// Projectile muzzle speed (units/s)
pub const PROJECTILE_SPEED: f32 = 3000.0;
/// Seconds before an unblocked projectile expires
pub const PROJECTILE_LIFETIME: f32 = 3.0;
/// Projectile collision radius
pub const PROJECTILE_RADIUS: f32 = 5.0;

/// A projectile in flight
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub position: Vec3,
    pub velocity: Vec3,
    pub damage: u32,
    pub radius: f32,
    pub lifetime_remaining: f32,
}

impl Projectile {
    pub fn new(id: Uuid, owner_id: Uuid, location: Vec3, rotation: Rotator, damage: u32) -> Self {
        Self {
            id,
            owner_id,
            position: location,
            velocity: rotation.forward() * PROJECTILE_SPEED,
            damage,
            radius: PROJECTILE_RADIUS,
            lifetime_remaining: PROJECTILE_LIFETIME,
        }
    }

    /// Advance the projectile, returns false once expired
    pub fn update(&mut self, dt: f32) -> bool {
        self.position += self.velocity * dt;
        self.lifetime_remaining -= dt;
        self.lifetime_remaining > 0.0
    }

    /// Check contact with a collidable
    pub fn check_hit(&self, target: &dyn Collidable) -> bool {
        is_overlapping(self, target)
    }
}

impl Collidable for Projectile {
    fn bounds(&self) -> Option<Bounds> {
        Some(Bounds::Sphere {
            radius: self.radius,
        })
    }

    fn location(&self) -> Vec3 {
        self.position
    }
}

/// Everything a spawn request carries
#[derive(Debug, Clone, Copy)]
pub struct SpawnRequest {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub location: Vec3,
    pub rotation: Rotator,
    pub damage: u32,
}

/// Instantiates projectiles in a world. A spawn that cannot be placed
/// yields `None` and nothing else.
pub trait ProjectileSpawner {
    fn spawn(&self, request: SpawnRequest) -> Option<Projectile>;
}

/// Refuses to spawn inside any blocker other than the shooter
pub struct CollisionCheckedSpawner<'a> {
    pub blockers: Vec<(Uuid, &'a dyn Collidable)>,
}

impl ProjectileSpawner for CollisionCheckedSpawner<'_> {
    fn spawn(&self, request: SpawnRequest) -> Option<Projectile> {
        let projectile = Projectile::new(
            request.id,
            request.owner_id,
            request.location,
            request.rotation,
            request.damage,
        );

        let blocked = self
            .blockers
            .iter()
            .filter(|(id, _)| *id != request.owner_id)
            .any(|(_, blocker)| projectile.check_hit(*blocker));

        (!blocked).then_some(projectile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Post(Vec3);

    impl Collidable for Post {
        fn bounds(&self) -> Option<Bounds> {
            Some(Bounds::Sphere { radius: 20.0 })
        }

        fn location(&self) -> Vec3 {
            self.0
        }
    }

    fn request(owner_id: Uuid, location: Vec3) -> SpawnRequest {
        SpawnRequest {
            id: Uuid::new_v4(),
            owner_id,
            location,
            rotation: Rotator::default(),
            damage: 10,
        }
    }

    #[test]
    fn projectile_flies_forward_and_expires() {
        let mut p = Projectile::new(Uuid::new_v4(), Uuid::new_v4(), Vec3::ZERO, Rotator::default(), 10);
        assert!(p.update(1.0));
        assert!((p.position.x - PROJECTILE_SPEED).abs() < 1e-2);
        assert!(!p.update(2.0));
    }

    #[test]
    fn spawn_inside_blocker_is_absorbed() {
        let post = Post(Vec3::new(10.0, 0.0, 0.0));
        let spawner = CollisionCheckedSpawner {
            blockers: vec![(Uuid::new_v4(), &post)],
        };

        assert!(spawner.spawn(request(Uuid::new_v4(), Vec3::ZERO)).is_none());
        assert!(spawner
            .spawn(request(Uuid::new_v4(), Vec3::new(500.0, 0.0, 0.0)))
            .is_some());
    }

    #[test]
    fn shooter_does_not_block_itself() {
        let shooter = Uuid::new_v4();
        let post = Post(Vec3::ZERO);
        let spawner = CollisionCheckedSpawner {
            blockers: vec![(shooter, &post)],
        };

        assert!(spawner.spawn(request(shooter, Vec3::ZERO)).is_some());
    }
}
