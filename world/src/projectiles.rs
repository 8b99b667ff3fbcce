//! Homing projectiles launched by ranged attacks.

use hexa_core::{Point, ProjectileId, ProjectileSnapshot, UnitId, PROJECTILE_HIT_RADIUS};

#[derive(Clone, Debug)]
pub(crate) struct Projectile {
    id: ProjectileId,
    shooter: UnitId,
    target: UnitId,
    position: Point,
    speed: f32,
    damage: u32,
}

/// Result of advancing a projectile by one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Flight {
    InFlight,
    Struck {
        shooter: UnitId,
        target: UnitId,
        damage: u32,
    },
    Expired,
}

impl Projectile {
    /// Moves toward the target's current position.
    ///
    /// The hit test uses the distance at the start of the step. A missing
    /// target expires the projectile without damage.
    fn advance(&mut self, target_position: Option<Point>) -> Flight {
        let Some(destination) = target_position else {
            return Flight::Expired;
        };

        let distance = self.position.distance(destination);
        self.position = self.position.step_toward(destination, self.speed);
        if distance < PROJECTILE_HIT_RADIUS {
            Flight::Struck {
                shooter: self.shooter,
                target: self.target,
                damage: self.damage,
            }
        } else {
            Flight::InFlight
        }
    }
}

/// Ordered collection of in-flight projectiles.
#[derive(Debug)]
pub(crate) struct ProjectileRegistry {
    active: Vec<Projectile>,
    next_projectile_id: ProjectileId,
}

impl ProjectileRegistry {
    pub(crate) fn new() -> Self {
        Self {
            active: Vec::new(),
            next_projectile_id: ProjectileId::new(0),
        }
    }

    pub(crate) fn launch(
        &mut self,
        shooter: UnitId,
        target: UnitId,
        origin: Point,
        speed: f32,
        damage: u32,
    ) -> ProjectileId {
        let id = self.next_projectile_id;
        self.next_projectile_id = ProjectileId::new(id.get().saturating_add(1));
        self.active.push(Projectile {
            id,
            shooter,
            target,
            position: origin,
            speed,
            damage,
        });
        id
    }

    /// Advances every projectile in launch order and drops finished ones.
    ///
    /// `locate` returns the position of a living target.
    pub(crate) fn advance<F>(&mut self, mut locate: F) -> Vec<(ProjectileId, Flight)>
    where
        F: FnMut(UnitId) -> Option<Point>,
    {
        let mut finished = Vec::new();
        self.active.retain_mut(|projectile| {
            let flight = projectile.advance(locate(projectile.target));
            if flight == Flight::InFlight {
                true
            } else {
                finished.push((projectile.id, flight));
                false
            }
        });
        finished
    }

    pub(crate) fn clear(&mut self) {
        self.active.clear();
    }

    pub(crate) fn snapshots(&self) -> Vec<ProjectileSnapshot> {
        self.active
            .iter()
            .map(|projectile| ProjectileSnapshot {
                id: projectile.id,
                shooter: projectile.shooter,
                target: projectile.target,
                position: projectile.position,
                damage: projectile.damage,
            })
            .collect()
    }
}
