//! Physics backend abstraction.
//!
//! The controller, camera and ability logic never talk to a physics engine
//! directly. They receive a [`PhysicsQuery`] (sphere overlaps, sphere casts
//! and raycasts filtered by [`LayerMask`]) and a backend decides where those
//! answers come from. This keeps the gameplay code testable against a plain
//! [`CollisionWorld`](crate::world::CollisionWorld) and lets a Rapier3D (or
//! any other) engine be swapped in.

use bevy::ecs::system::{ReadOnlySystemParam, SystemParamItem};
use bevy::prelude::*;

use crate::collision::{CollisionData, LayerMask};

/// Layer and trigger filtering shared by every query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeFilter {
    /// Layers the query may hit.
    pub mask: LayerMask,
    /// Whether trigger (sensor) colliders are reported.
    pub include_triggers: bool,
    /// Entity ignored by the query, usually the querying character.
    pub exclude: Option<Entity>,
}

impl ShapeFilter {
    /// Filter hitting solid colliders on `mask`.
    pub fn new(mask: LayerMask) -> Self {
        Self {
            mask,
            include_triggers: false,
            exclude: None,
        }
    }

    /// Builder: also report trigger colliders.
    pub fn with_triggers(mut self, include: bool) -> Self {
        self.include_triggers = include;
        self
    }

    /// Builder: ignore an entity (if any).
    pub fn excluding(mut self, entity: Option<Entity>) -> Self {
        self.exclude = entity;
        self
    }

    /// Whether a collider with the given properties passes the filter.
    pub fn accepts(&self, layer: LayerMask, is_trigger: bool, entity: Option<Entity>) -> bool {
        if !self.mask.intersects(layer) {
            return false;
        }
        if is_trigger && !self.include_triggers {
            return false;
        }
        match (self.exclude, entity) {
            (Some(excluded), Some(entity)) => excluded != entity,
            _ => true,
        }
    }
}

/// Read-only spatial queries used by the gameplay modules.
///
/// Directions are expected to be normalized. A cast that starts inside a
/// collider reports a hit at distance zero.
pub trait PhysicsQuery {
    /// First collider overlapping the sphere that belongs to an entity.
    fn overlap_sphere(&self, center: Vec3, radius: f32, filter: &ShapeFilter) -> Option<Entity>;

    /// Sweep a sphere along `direction` and return the closest hit.
    fn sphere_cast(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        filter: &ShapeFilter,
    ) -> Option<CollisionData>;

    /// Cast a ray along `direction` and return the closest hit.
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: &ShapeFilter,
    ) -> Option<CollisionData>;

    /// True when any collider overlaps the sphere.
    fn check_sphere(&self, center: Vec3, radius: f32, filter: &ShapeFilter) -> bool {
        self.overlap_sphere(center, radius, filter).is_some()
    }

    /// Sweep a sphere from `start` to `end`.
    ///
    /// Degenerate segments fall back to an overlap test at `start`.
    fn sweep_segment(
        &self,
        start: Vec3,
        end: Vec3,
        radius: f32,
        filter: &ShapeFilter,
    ) -> Option<CollisionData> {
        let delta = end - start;
        let length = delta.length();
        if length <= f32::EPSILON {
            return self
                .overlap_sphere(start, radius, filter)
                .map(|entity| CollisionData::new(0.0, Vec3::Y, start, Some(entity)));
        }
        self.sphere_cast(start, radius, delta / length, length, filter)
    }
}

/// Trait for physics backend implementations.
///
/// A backend names the system parameter it needs to answer queries (a
/// resource, a Rapier context, ...) and hands the controller systems a
/// [`PhysicsQuery`] built from it. When the backend is not ready (no
/// context yet, resource missing) `with_query` returns `None` and the
/// systems skip the tick.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use pogo_character_controller::prelude::*;
///
/// App::new()
///     .add_plugins(MinimalPlugins)
///     .add_plugins(CharacterControllerPlugin::<CollisionWorldBackend>::default());
/// ```
pub trait CharacterPhysicsBackend: 'static + Send + Sync {
    /// System parameter the backend reads its physics state from.
    type Param: ReadOnlySystemParam + 'static;

    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Run `f` against a query view of the physics state.
    fn with_query<R>(
        param: &SystemParamItem<'_, '_, Self::Param>,
        f: impl FnOnce(&dyn PhysicsQuery) -> R,
    ) -> Option<R>;
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}
