//! Collision result structures and layer masks.
//!
//! These hold the results of physics queries (sphere casts, raycasts and
//! overlaps) and the layer bits used to filter them.

use std::ops::{BitOr, BitOrAssign};

use bevy::prelude::*;

/// Bit mask describing which collision layers a query or collider uses.
///
/// Layers mirror the surfaces the controller cares about: walkable ground,
/// breakable cages, enemies, soft bounce targets and level geometry.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: Self = Self(0);
    pub const GROUND: Self = Self(1 << 0);
    /// Breakable cage, the "special surface" that locks horizontal motion.
    pub const CAGE: Self = Self(1 << 1);
    pub const ENEMY: Self = Self(1 << 2);
    /// Soft bounce targets such as mushrooms.
    pub const SOFT_TARGET: Self = Self(1 << 3);
    /// Walls and props that stop knockback slides.
    pub const ENVIRONMENT: Self = Self(1 << 4);
    pub const PLAYER: Self = Self(1 << 5);
    pub const ALL: Self = Self(u32::MAX);

    /// Raw bits of the mask.
    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }

    /// True when any bit of `other` is also set in `self`.
    #[inline]
    pub fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }

    /// True when every bit of `other` is set in `self`.
    #[inline]
    pub fn contains(self, other: LayerMask) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for LayerMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for LayerMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Information about a sphere cast, raycast or overlap hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionData {
    /// Distance travelled along the cast before the hit.
    pub distance: f32,
    /// Normal of the surface at the hit point.
    pub normal: Vec3,
    /// World position of the contact point.
    pub point: Vec3,
    /// Entity that was hit (if any).
    pub entity: Option<Entity>,
}

impl CollisionData {
    /// Create a collision result.
    pub fn new(distance: f32, normal: Vec3, point: Vec3, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
        }
    }

    /// True when the hit normal points mostly upward (a floor).
    pub fn is_floor(&self) -> bool {
        self.normal.y > 0.5
    }
}
