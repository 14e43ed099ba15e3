//! Constrained knockback.
//!
//! [`KnockbackSolver`] turns "push this entity back by N metres" into a
//! destination that respects the navigable surface and the physical
//! environment:
//!
//! 1. Snap start and desired destination onto the surface. An unreachable
//!    destination collapses to a 0.1 m nudge.
//! 2. Raycast along the surface and stop one skin short of any wall.
//! 3. Sphere-cast the entity's radius through the environment and stop one
//!    skin short of any hit.
//! 4. Snap the result onto the surface again.
//!
//! Without a surface only step 3 runs. [`KnockbackTween`] then eases the
//! entity to the destination while its [`NavAgent`] steering is suspended.

use bevy::prelude::*;

use crate::backend::{PhysicsQuery, ShapeFilter};
use crate::config::KnockbackConfig;
use crate::navigation::{NavAgent, NavSurface};
use crate::tween::{Easing, Tween};

/// Fallback nudge when the destination is off the surface.
const UNREACHABLE_NUDGE: f32 = 0.1;
/// The environment cast starts this far above the start.
const CAST_LIFT: f32 = 0.1;
const MIN_RADIUS: f32 = 0.1;
const MIN_TRAVEL: f32 = 1e-4;

/// Computes knockback destinations.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KnockbackSolver {
    pub config: KnockbackConfig,
}

impl KnockbackSolver {
    pub fn new(config: KnockbackConfig) -> Self {
        Self { config }
    }

    /// Horizontal push direction for a struck target.
    ///
    /// The target's own back (opposite of `target_forward`), else away from
    /// the attacker, else world `+Z`.
    pub fn back_direction(target_forward: Vec3, target_position: Vec3, attacker_position: Vec3) -> Vec3 {
        let back = -Vec3::new(target_forward.x, 0.0, target_forward.z);
        if let Some(back) = back.try_normalize() {
            return back;
        }
        let away = target_position - attacker_position;
        Vec3::new(away.x, 0.0, away.z).try_normalize().unwrap_or(Vec3::Z)
    }

    /// Body radius from collider half extents.
    pub fn radius_from_extents(half_extents: Vec3) -> f32 {
        half_extents.x.max(half_extents.z).max(MIN_RADIUS)
    }

    /// Constrained destination for a push of `config.distance` along `back`.
    pub fn solve(
        &self,
        start: Vec3,
        back: Vec3,
        radius: f32,
        surface: Option<&dyn NavSurface>,
        query: &dyn PhysicsQuery,
        exclude: Option<Entity>,
    ) -> Vec3 {
        let skin = self.config.effective_skin();
        let sample = self.config.nav_sample_distance;
        let mut a = start;
        let mut b = start + back * self.config.distance;

        if let Some(surface) = surface {
            if let Some(sampled) = surface.sample_position(a, sample) {
                a = sampled;
            }
            b = match surface.sample_position(b, sample) {
                Some(sampled) => sampled,
                None => a + (b - a).normalize_or_zero() * UNREACHABLE_NUDGE,
            };
            if let Some(wall) = surface.raycast(a, b) {
                b = wall.position - back * skin;
                b.y = a.y;
                trace!("knockback stopped by nav edge at {:?}", wall.position);
            }
        }

        let delta = b - a;
        let distance = delta.length();
        if distance > MIN_TRAVEL {
            let direction = delta / distance;
            let filter = ShapeFilter::new(self.config.environment_layers).excluding(exclude);
            if let Some(hit) = query.sphere_cast(a + Vec3::Y * CAST_LIFT, radius, direction, distance, &filter) {
                b = hit.point - direction * skin;
                b.y = a.y;
                trace!("knockback stopped by environment at {:?}", hit.point);
            }
        }

        if let Some(surface) = surface {
            if let Some(sampled) = surface.sample_position(b, sample) {
                b = sampled;
            }
        }

        b.y = start.y;
        b
    }
}

/// Eased knockback in progress.
///
/// Holds the agent's steering switches while the tween runs so they can be
/// restored when it ends.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct KnockbackTween {
    pub tween: Tween<Vec3>,
    saved_agent: Option<(bool, bool)>,
}

impl KnockbackTween {
    pub fn new(start: Vec3, target: Vec3, duration: f32) -> Self {
        Self {
            tween: Tween::new(start, target, duration, Easing::SmoothStep),
            saved_agent: None,
        }
    }

    /// Stop the agent's own steering for the duration of the push.
    pub fn suspend(&mut self, agent: &mut NavAgent) {
        if self.saved_agent.is_none() {
            self.saved_agent = Some((agent.steering_enabled, agent.avoidance_enabled));
        }
        agent.steering_enabled = false;
        agent.avoidance_enabled = false;
    }

    /// Give the agent back the steering it had before [`suspend`](Self::suspend).
    pub fn restore(&mut self, agent: &mut NavAgent) {
        if let Some((steering, avoidance)) = self.saved_agent.take() {
            agent.steering_enabled = steering;
            agent.avoidance_enabled = avoidance;
        }
    }

    /// Replace an in-flight push, keeping the originally saved steering.
    pub fn retarget(&mut self, start: Vec3, target: Vec3, duration: f32) {
        self.tween = Tween::new(start, target, duration, Easing::SmoothStep);
    }

    pub fn advance(&mut self, dt: f32) -> Vec3 {
        self.tween.advance(dt)
    }

    pub fn is_finished(&self) -> bool {
        self.tween.is_finished()
    }

    /// Snap to the destination.
    pub fn finish(&mut self) -> Vec3 {
        self.tween.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::LayerMask;
    use crate::navigation::NavigationBounds;
    use crate::world::CollisionWorld;

    fn solver() -> KnockbackSolver {
        KnockbackSolver::new(KnockbackConfig::default())
    }

    // ==================== Direction Tests ====================

    #[test]
    fn back_direction_prefers_target_facing() {
        let back = KnockbackSolver::back_direction(Vec3::new(0.0, 0.3, -2.0), Vec3::ZERO, Vec3::X);
        assert!((back - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn back_direction_falls_back_to_attacker_then_world() {
        let back = KnockbackSolver::back_direction(Vec3::Y, Vec3::new(3.0, 0.0, 0.0), Vec3::new(0.0, 5.0, 0.0));
        assert!((back - Vec3::X).length() < 1e-5);

        let back = KnockbackSolver::back_direction(Vec3::ZERO, Vec3::ONE, Vec3::ONE);
        assert_eq!(back, Vec3::Z);
    }

    #[test]
    fn radius_has_floor() {
        assert_eq!(KnockbackSolver::radius_from_extents(Vec3::new(0.4, 1.0, 0.6)), 0.6);
        assert_eq!(KnockbackSolver::radius_from_extents(Vec3::splat(0.01)), 0.1);
    }

    // ==================== Solve Tests ====================

    #[test]
    fn open_ground_pushes_full_distance() {
        let world = CollisionWorld::new();
        let target = solver().solve(Vec3::ZERO, Vec3::Z, 0.5, None, &world, None);
        assert!((target - Vec3::Z * 2.5).length() < 1e-5);
    }

    #[test]
    fn nav_wall_stops_push_before_impact_by_skin() {
        let world = CollisionWorld::new();
        let bounds = NavigationBounds::new(Vec2::splat(-20.0), Vec2::splat(20.0), 0.0)
            .with_wall(Vec2::new(-20.0, 1.5), Vec2::new(20.0, 2.0));

        let solver = solver();
        let target = solver.solve(Vec3::ZERO, Vec3::Z, 0.3, Some(&bounds), &world, None);

        let skin = solver.config.effective_skin();
        assert!(target.z <= 1.5 - skin + 1e-5, "target {target:?} crosses the wall");
        assert!(target.z > 1.0);
        assert_eq!(target.y, 0.0);
    }

    #[test]
    fn environment_cast_shortens_push() {
        let mut world = CollisionWorld::new();
        world.add_cuboid(Vec3::new(0.0, 0.5, 2.0), Vec3::new(5.0, 1.0, 0.25), LayerMask::ENVIRONMENT, None);

        let solver = solver();
        let target = solver.solve(Vec3::ZERO, Vec3::Z, 0.3, None, &world, None);
        // Contact is on the wall face at z = 1.75.
        assert!(target.z < 1.75);
        assert!(target.z > 1.0);
    }

    #[test]
    fn ignores_non_environment_layers_and_self() {
        let mut world = CollisionWorld::new();
        let mut ecs = World::new();
        let me = ecs.spawn_empty().id();
        world
            .add_sphere(Vec3::new(0.0, 0.5, 1.0), 0.4, LayerMask::ENEMY, None)
            .add_sphere(Vec3::new(0.0, 0.5, 1.0), 0.4, LayerMask::ENVIRONMENT, Some(me));

        let target = solver().solve(Vec3::ZERO, Vec3::Z, 0.3, None, &world, Some(me));
        assert!((target.z - 2.5).abs() < 1e-5);
    }

    #[test]
    fn destination_off_surface_collapses_to_nudge() {
        let world = CollisionWorld::new();
        let bounds = NavigationBounds::new(Vec2::splat(-1.0), Vec2::new(1.0, 0.1), 0.0);
        let solver = KnockbackSolver::new(KnockbackConfig {
            distance: 10.0,
            ..default()
        });

        let target = solver.solve(Vec3::ZERO, Vec3::Z, 0.3, Some(&bounds), &world, None);
        assert!(target.z <= 0.1 + 1e-5);
        assert!(bounds.contains(target));
    }

    #[test]
    fn result_keeps_start_height() {
        let world = CollisionWorld::new();
        let bounds = NavigationBounds::new(Vec2::splat(-20.0), Vec2::splat(20.0), 0.0);
        let start = Vec3::new(0.0, 0.6, 0.0);
        let target = solver().solve(start, Vec3::X, 0.3, Some(&bounds), &world, None);
        assert_eq!(target.y, 0.6);
    }

    // ==================== Tween Tests ====================

    #[test]
    fn tween_suspends_and_restores_agent() {
        let mut agent = NavAgent {
            avoidance_enabled: false,
            ..default()
        };
        let mut knockback = KnockbackTween::new(Vec3::ZERO, Vec3::Z, 0.12);
        knockback.suspend(&mut agent);
        assert!(!agent.steering_enabled);

        // A second push keeps the original switches.
        knockback.retarget(Vec3::ZERO, Vec3::X, 0.12);
        knockback.suspend(&mut agent);

        while !knockback.is_finished() {
            knockback.advance(1.0 / 60.0);
        }
        assert_eq!(knockback.tween.value(), Vec3::X);

        knockback.restore(&mut agent);
        assert!(agent.steering_enabled);
        assert!(!agent.avoidance_enabled);
    }
}
