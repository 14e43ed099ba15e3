//! Built-in collision world backend.
//!
//! [`CollisionWorld`] is a flat list of spheres and axis-aligned boxes that
//! answers every [`PhysicsQuery`]. Entities carrying a [`WorldCollider`] and a
//! `Transform` are mirrored into it at the start of each fixed tick, so
//! disabling or despawning an entity removes its collider on the next tick.
//! Colliders can also be inserted by hand, which is what most unit tests do.

use bevy::ecs::system::SystemParamItem;
use bevy::prelude::*;

use crate::backend::{CharacterPhysicsBackend, PhysicsQuery, ShapeFilter};
use crate::collision::{CollisionData, LayerMask};
use crate::CharacterControllerSet;

/// Step limit of the corner-region contact search.
const CONTACT_ITERATIONS: usize = 32;
/// Gap at which the corner-region search reports contact.
const CONTACT_EPSILON: f32 = 1e-4;

/// Primitive collider shape.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Sphere { radius: f32 },
    /// Axis-aligned box.
    Cuboid { half_extents: Vec3 },
}

/// Collider attached to an entity and mirrored into [`CollisionWorld`].
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct WorldCollider {
    pub shape: ColliderShape,
    pub layer: LayerMask,
    /// Trigger colliders are only reported to queries that ask for them.
    pub is_trigger: bool,
}

impl WorldCollider {
    pub fn sphere(radius: f32, layer: LayerMask) -> Self {
        Self {
            shape: ColliderShape::Sphere { radius },
            layer,
            is_trigger: false,
        }
    }

    pub fn cuboid(half_extents: Vec3, layer: LayerMask) -> Self {
        Self {
            shape: ColliderShape::Cuboid { half_extents },
            layer,
            is_trigger: false,
        }
    }

    /// Builder: mark as trigger.
    pub fn as_trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }
}

/// A collider placed in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedCollider {
    pub center: Vec3,
    pub shape: ColliderShape,
    pub layer: LayerMask,
    pub is_trigger: bool,
    pub entity: Option<Entity>,
    synced: bool,
}

impl PlacedCollider {
    fn closest_point(&self, point: Vec3) -> Vec3 {
        match self.shape {
            ColliderShape::Sphere { radius } => {
                let offset = point - self.center;
                if offset.length_squared() <= radius * radius {
                    point
                } else {
                    self.center + offset.normalize_or_zero() * radius
                }
            }
            ColliderShape::Cuboid { half_extents } => {
                self.center + (point - self.center).clamp(-half_extents, half_extents)
            }
        }
    }

    fn overlaps_sphere(&self, center: Vec3, radius: f32) -> bool {
        match self.shape {
            ColliderShape::Sphere { radius: own } => {
                center.distance_squared(self.center) <= (own + radius) * (own + radius)
            }
            ColliderShape::Cuboid { .. } => {
                center.distance_squared(self.closest_point(center)) <= radius * radius
            }
        }
    }

    /// Time of impact of a sphere swept along `direction`.
    fn cast(&self, origin: Vec3, radius: f32, direction: Vec3, max_distance: f32) -> Option<CollisionData> {
        if self.overlaps_sphere(origin, radius) {
            let contact = self.closest_point(origin);
            let normal = (origin - contact).try_normalize().unwrap_or(-direction);
            return Some(CollisionData::new(0.0, normal, contact, self.entity));
        }

        let (distance, normal) = match self.shape {
            ColliderShape::Sphere { radius: own } => {
                let offset = origin - self.center;
                let reach = own + radius;
                let b = offset.dot(direction);
                let c = offset.length_squared() - reach * reach;
                if b > 0.0 {
                    return None;
                }
                let discriminant = b * b - c;
                if discriminant < 0.0 {
                    return None;
                }
                let distance = -b - discriminant.sqrt();
                let normal = (origin + direction * distance - self.center).normalize_or_zero();
                (distance, normal)
            }
            ColliderShape::Cuboid { half_extents } => {
                // Slab test against the box inflated by the sphere radius.
                let min = self.center - half_extents - Vec3::splat(radius);
                let max = self.center + half_extents + Vec3::splat(radius);
                let mut entry = f32::NEG_INFINITY;
                let mut exit = f32::INFINITY;
                let mut normal = Vec3::ZERO;
                for axis in 0..3 {
                    let o = origin[axis];
                    let d = direction[axis];
                    if d.abs() < 1e-6 {
                        if o < min[axis] || o > max[axis] {
                            return None;
                        }
                        continue;
                    }
                    let mut near = (min[axis] - o) / d;
                    let mut far = (max[axis] - o) / d;
                    if near > far {
                        std::mem::swap(&mut near, &mut far);
                    }
                    if near > entry {
                        entry = near;
                        normal = Vec3::ZERO;
                        normal[axis] = -d.signum();
                    }
                    exit = exit.min(far);
                    if entry > exit {
                        return None;
                    }
                }
                if entry < 0.0 {
                    // Starts in a corner of the inflated box, outside the rounded shape.
                    let distance = self.advance_to_contact(origin, radius, direction, exit.min(max_distance))?;
                    let center_at_hit = origin + direction * distance;
                    let normal = (center_at_hit - self.closest_point(center_at_hit))
                        .try_normalize()
                        .unwrap_or(-direction);
                    (distance, normal)
                } else {
                    (entry, normal)
                }
            }
        };

        if distance > max_distance {
            return None;
        }
        let center_at_hit = origin + direction * distance;
        let point = self.closest_point(center_at_hit);
        Some(CollisionData::new(distance, normal, point, self.entity))
    }

    /// Walk the sphere forward by its gap to the closest point until it
    /// touches, or `limit` is passed.
    fn advance_to_contact(&self, origin: Vec3, radius: f32, direction: Vec3, limit: f32) -> Option<f32> {
        let mut travelled = 0.0;
        for _ in 0..CONTACT_ITERATIONS {
            let center = origin + direction * travelled;
            let gap = center.distance(self.closest_point(center)) - radius;
            if gap <= CONTACT_EPSILON {
                return Some(travelled);
            }
            travelled += gap;
            if travelled > limit {
                return None;
            }
        }
        None
    }
}

/// Resource holding every collider the built-in backend can query.
#[derive(Resource, Debug, Clone, Default)]
pub struct CollisionWorld {
    colliders: Vec<PlacedCollider>,
}

impl CollisionWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a collider described by a [`WorldCollider`].
    pub fn insert(&mut self, center: Vec3, collider: WorldCollider, entity: Option<Entity>) -> &mut Self {
        self.colliders.push(PlacedCollider {
            center,
            shape: collider.shape,
            layer: collider.layer,
            is_trigger: collider.is_trigger,
            entity,
            synced: false,
        });
        self
    }

    pub fn add_sphere(&mut self, center: Vec3, radius: f32, layer: LayerMask, entity: Option<Entity>) -> &mut Self {
        self.insert(center, WorldCollider::sphere(radius, layer), entity)
    }

    pub fn add_cuboid(
        &mut self,
        center: Vec3,
        half_extents: Vec3,
        layer: LayerMask,
        entity: Option<Entity>,
    ) -> &mut Self {
        self.insert(center, WorldCollider::cuboid(half_extents, layer), entity)
    }

    /// Remove every collider owned by `entity`.
    pub fn remove_entity(&mut self, entity: Entity) {
        self.colliders.retain(|c| c.entity != Some(entity));
    }

    pub fn clear(&mut self) {
        self.colliders.clear();
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlacedCollider> {
        self.colliders.iter()
    }

    fn candidates<'a>(&'a self, filter: &'a ShapeFilter) -> impl Iterator<Item = &'a PlacedCollider> {
        self.colliders
            .iter()
            .filter(move |c| filter.accepts(c.layer, c.is_trigger, c.entity))
    }

    fn closest_cast(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        filter: &ShapeFilter,
    ) -> Option<CollisionData> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || max_distance < 0.0 {
            return None;
        }
        self.candidates(filter)
            .filter_map(|c| c.cast(origin, radius, direction, max_distance))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

impl PhysicsQuery for CollisionWorld {
    fn overlap_sphere(&self, center: Vec3, radius: f32, filter: &ShapeFilter) -> Option<Entity> {
        self.candidates(filter)
            .filter(|c| c.overlaps_sphere(center, radius))
            .find_map(|c| c.entity)
    }

    fn check_sphere(&self, center: Vec3, radius: f32, filter: &ShapeFilter) -> bool {
        self.candidates(filter).any(|c| c.overlaps_sphere(center, radius))
    }

    fn sphere_cast(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        filter: &ShapeFilter,
    ) -> Option<CollisionData> {
        self.closest_cast(origin, radius.max(0.0), direction, max_distance, filter)
    }

    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: &ShapeFilter,
    ) -> Option<CollisionData> {
        self.closest_cast(origin, 0.0, direction, max_distance, filter)
    }
}

/// Mirror [`WorldCollider`] entities into the [`CollisionWorld`].
///
/// Hand-inserted colliders are left alone.
pub fn sync_collision_world(
    mut world: ResMut<CollisionWorld>,
    colliders: Query<(Entity, &Transform, &WorldCollider)>,
) {
    world.colliders.retain(|c| !c.synced);
    for (entity, transform, collider) in &colliders {
        world.colliders.push(PlacedCollider {
            center: transform.translation,
            shape: collider.shape,
            layer: collider.layer,
            is_trigger: collider.is_trigger,
            entity: Some(entity),
            synced: true,
        });
    }
}

/// Plugin installing the [`CollisionWorld`] resource and its sync system.
pub struct CollisionWorldPlugin;

impl Plugin for CollisionWorldPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<WorldCollider>();
        app.init_resource::<CollisionWorld>();
        app.add_systems(
            FixedUpdate,
            sync_collision_world.in_set(CharacterControllerSet::Preparation),
        );
    }
}

/// Backend answering queries from the [`CollisionWorld`] resource.
pub struct CollisionWorldBackend;

impl CharacterPhysicsBackend for CollisionWorldBackend {
    type Param = Option<Res<'static, CollisionWorld>>;

    fn plugin() -> impl Plugin {
        CollisionWorldPlugin
    }

    fn with_query<R>(
        param: &SystemParamItem<'_, '_, Self::Param>,
        f: impl FnOnce(&dyn PhysicsQuery) -> R,
    ) -> Option<R> {
        let world: &CollisionWorld = param.as_deref()?;
        Some(f(world))
    }
}
