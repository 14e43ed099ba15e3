//! Rapier3D physics backend implementation.
//!
//! This module answers [`PhysicsQuery`] calls from the default
//! `bevy_rapier3d` context. Enable with the `rapier3d` feature.
//!
//! Colliders opt into layers through their [`CollisionGroups`]
//! memberships; [`layer_groups`] builds the groups for a [`LayerMask`].

use bevy::ecs::system::SystemParamItem;
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::backend::{CharacterPhysicsBackend, NoOpBackendPlugin, PhysicsQuery, ShapeFilter};
use crate::collision::{CollisionData, LayerMask};

/// Rapier3D physics backend for the character controller.
///
/// Queries run against the single default [`RapierContext`]. Until that
/// context exists the controller systems skip their step.
pub struct Rapier3dBackend;

impl CharacterPhysicsBackend for Rapier3dBackend {
    type Param = ReadRapierContext<'static, 'static>;

    fn plugin() -> impl Plugin {
        NoOpBackendPlugin
    }

    fn with_query<R>(
        param: &SystemParamItem<'_, '_, Self::Param>,
        f: impl FnOnce(&dyn PhysicsQuery) -> R,
    ) -> Option<R> {
        let context = param.single().ok()?;
        Some(f(&RapierQuery { context: &context }))
    }
}

/// Collision groups placing a collider on `layer`, colliding with everything.
pub fn layer_groups(layer: LayerMask) -> CollisionGroups {
    CollisionGroups::new(Group::from_bits_truncate(layer.bits()), Group::ALL)
}

/// Rapier filter equivalent to a [`ShapeFilter`].
pub fn query_filter(filter: &ShapeFilter) -> QueryFilter<'static> {
    let mut query = QueryFilter::default().groups(CollisionGroups::new(
        Group::ALL,
        Group::from_bits_truncate(filter.mask.bits()),
    ));
    if !filter.include_triggers {
        query = query.exclude_sensors();
    }
    if let Some(entity) = filter.exclude {
        query = query.exclude_rigid_body(entity).exclude_collider(entity);
    }
    query
}

/// [`PhysicsQuery`] view over a Rapier context.
struct RapierQuery<'a, 'w> {
    context: &'a RapierContext<'w>,
}

impl PhysicsQuery for RapierQuery<'_, '_> {
    fn overlap_sphere(&self, center: Vec3, radius: f32, filter: &ShapeFilter) -> Option<Entity> {
        self.context
            .intersection_with_shape(center, Quat::IDENTITY, &Collider::ball(radius), query_filter(filter))
    }

    fn sphere_cast(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        filter: &ShapeFilter,
    ) -> Option<CollisionData> {
        self.context
            .cast_shape(
                origin,
                Quat::IDENTITY,
                direction,
                &Collider::ball(radius),
                ShapeCastOptions {
                    max_time_of_impact: max_distance,
                    stop_at_penetration: true,
                    ..default()
                },
                query_filter(filter),
            )
            .map(|(entity, hit)| {
                // The ball is unrotated, so its contact normal is already in world space.
                let outward = hit.details.map_or(direction, |details| details.normal1);
                let center = origin + direction * hit.time_of_impact;
                CollisionData::new(hit.time_of_impact, -outward, center + outward * radius, Some(entity))
            })
    }

    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: &ShapeFilter,
    ) -> Option<CollisionData> {
        self.context
            .cast_ray_and_get_normal(origin, direction, max_distance, true, query_filter(filter))
            .map(|(entity, hit)| CollisionData::new(hit.time_of_impact, hit.normal, hit.point, Some(entity)))
    }
}
