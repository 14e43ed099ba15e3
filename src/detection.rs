//! Ground probe results.
//!
//! The ground probe is a sphere placed just below the character's feet and
//! tested against the ground layers and the special-surface (cage) layers.
//! Both answers are sampled once per tick and every decision that depends
//! on them (grounded state, special-surface jump height, the cage movement
//! lock) reads this single snapshot.

use bevy::prelude::*;

use crate::backend::{PhysicsQuery, ShapeFilter};
use crate::config::ControllerConfig;

/// One tick's worth of ground contact.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroundProbe {
    /// The probe overlaps a ground layer.
    pub grounded: bool,
    /// The probe overlaps a special-surface layer.
    pub special_contact: bool,
}

impl GroundProbe {
    /// Center of the probe sphere for a character standing at `feet`.
    pub fn center(config: &ControllerConfig, feet: Vec3) -> Vec3 {
        Vec3::new(feet.x, feet.y - config.grounded_offset, feet.z)
    }

    /// Sample the probe at `feet`, ignoring `exclude`.
    pub fn sample(
        config: &ControllerConfig,
        feet: Vec3,
        query: &dyn PhysicsQuery,
        exclude: Option<Entity>,
    ) -> Self {
        let center = Self::center(config, feet);
        let radius = config.grounded_radius;
        let ground = ShapeFilter::new(config.ground_layers).excluding(exclude);
        let special = ShapeFilter::new(config.special_surface_layers).excluding(exclude);

        Self {
            grounded: query.check_sphere(center, radius, &ground),
            special_contact: query.check_sphere(center, radius, &special),
        }
    }

    /// Standing on the special surface this tick.
    #[inline]
    pub fn on_special_surface(&self) -> bool {
        self.grounded && self.special_contact
    }

    /// Grounded on the special surface: the movement lock engages.
    #[inline]
    pub fn acquires_special_lock(&self) -> bool {
        self.grounded && self.special_contact
    }

    /// Grounded with no special contact: the movement lock lets go.
    #[inline]
    pub fn releases_special_lock(&self) -> bool {
        self.grounded && !self.special_contact
    }

    /// Lock state after this probe, given the lock state before it.
    ///
    /// Airborne probes leave the lock untouched.
    pub fn next_special_lock(&self, locked: bool) -> bool {
        if self.acquires_special_lock() {
            true
        } else if self.releases_special_lock() {
            false
        } else {
            locked
        }
    }
}
