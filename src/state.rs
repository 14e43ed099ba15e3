//! State marker components.
//!
//! These components mirror the motion state of a character so other game
//! code can filter queries on them. They are added/removed by
//! [`sync_state_markers`](crate::systems::sync_state_markers) after every
//! fixed step.

use bevy::prelude::*;

use crate::motion::CharacterState;

/// Marker component indicating the character is grounded.
///
/// Mutually exclusive with [`Airborne`].
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use pogo_character_controller::prelude::*;
///
/// // Grounded is a marker component - just use it in queries
/// fn check_grounded(grounded: Option<&Grounded>) -> bool {
///     grounded.is_some()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is airborne.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Marker component indicating the character stands on a cage.
///
/// `movement_locked` is true while the cage freezes horizontal movement.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[reflect(Component)]
pub struct OnSpecialSurface {
    pub movement_locked: bool,
}

/// Which markers a character should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerSet {
    pub grounded: bool,
    pub special_surface: Option<OnSpecialSurface>,
}

impl MarkerSet {
    pub fn from_state(state: &CharacterState) -> Self {
        let special_surface = (state.grounded_on_special_surface || state.movement_locked_by_special_surface)
            .then_some(OnSpecialSurface {
                movement_locked: state.movement_locked_by_special_surface,
            });
        Self {
            grounded: state.grounded,
            special_surface,
        }
    }
}
