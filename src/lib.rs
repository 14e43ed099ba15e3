//! # `pogo_character_controller`
//!
//! A third-person kinematic character controller with a physics backend abstraction.
//!
//! This crate provides a responsive, tuneable character controller that:
//! - Moves a kinematic body with eased speed and smoothed facing
//! - Jumps with an apex hang and separate jump/fall timeouts
//! - Detects ground and a lockable "special surface" (cages) with a sphere probe
//! - Drives a look camera with pitch clamps and an auto-tilt that follows jumps
//! - Layers a dash/pogo ability on top: dashes, downward pogo strikes,
//!   bounces, cage breaking and constrained enemy knockback
//! - Switches camera profiles and shoulder offsets through camera zones
//! - Abstracts the physics backend (a built-in collision world, Rapier3D optional)
//!
//! ## Architecture
//!
//! Gameplay logic lives in plain structs that take their collaborators as
//! arguments ([`motion::MotionIntegrator`], [`camera::LookCameraController`],
//! [`ability::DashPogoAbility`], [`knockback::KnockbackSolver`]). The systems
//! in [`systems`] run them each fixed tick in this order:
//!
//! 1. Gravity and jump
//! 2. Grounded check
//! 3. Deferred camera profile
//! 4. Dash/pogo ability
//! 5. Horizontal movement
//!
//! Everything that happened is published as Bevy messages
//! ([`feedback::FeedbackMessage`], [`feedback::TutorialMessage`],
//! [`feedback::AnimationTriggerMessage`], [`ability::PogoStrike`],
//! [`damage::HitReceived`]).
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use pogo_character_controller::prelude::*;
//!
//! let mut app = App::new();
//! app.add_plugins(MinimalPlugins)
//!     .add_plugins(CharacterControllerPlugin::<CollisionWorldBackend>::default());
//!
//! app.world_mut().spawn((
//!     Transform::default(),
//!     MotionIntegrator::new(ControllerConfig::player()),
//!     MovementIntent::default(),
//!     LookCameraController::default(),
//!     DashPogoAbility::default(),
//! ));
//! ```

use bevy::prelude::*;

pub mod ability;
pub mod backend;
pub mod camera;
pub mod collision;
pub mod config;
pub mod damage;
pub mod detection;
pub mod feedback;
pub mod intent;
pub mod knockback;
pub mod motion;
pub mod navigation;
pub mod state;
pub mod systems;
pub mod tween;
pub mod world;
pub mod zones;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::ability::{AbilityPhase, DashPogoAbility, PogoHit, PogoStrike, StrikeKind};
    pub use crate::backend::{CharacterPhysicsBackend, PhysicsQuery, ShapeFilter};
    pub use crate::camera::LookCameraController;
    pub use crate::collision::{CollisionData, LayerMask};
    pub use crate::config::{
        AbilityConfig, CameraProfile, ControllerConfig, KnockbackConfig, LookSettings, PogoLayout,
    };
    pub use crate::damage::{Health, HitReceived};
    pub use crate::feedback::{
        AnimationParams, AnimationTrigger, AnimationTriggerMessage, FeedbackCue, FeedbackMessage,
        TutorialEvent, TutorialMessage,
    };
    pub use crate::intent::{GamepadPogo, LookDevice, MovementIntent};
    pub use crate::knockback::{KnockbackSolver, KnockbackTween};
    pub use crate::motion::{MotionIntegrator, MotionState};
    pub use crate::navigation::{NavAgent, NavSurface, NavigationBounds};
    pub use crate::state::{Airborne, Grounded, OnSpecialSurface};
    pub use crate::world::{CollisionWorld, CollisionWorldBackend, WorldCollider};
    pub use crate::zones::{CameraRig, CameraZone, CameraZoneRegistry};
    pub use crate::{CharacterControllerPlugin, CharacterControllerSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::Rapier3dBackend;
}

/// Ordering of the controller's fixed-step systems.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum CharacterControllerSet {
    /// Backend sync and new-character setup.
    Preparation,
    /// Character motion and ability ticks.
    Motion,
    /// Strike resolution, damage, knockback and state markers.
    Effects,
}

/// Main plugin for the character controller system.
///
/// This plugin is generic over a physics backend `B` which answers the
/// overlap and cast queries the controller makes.
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `CollisionWorldBackend`)
///
/// # Examples
///
/// With Rapier3D backend:
/// ```rust,ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use pogo_character_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(CharacterControllerPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct CharacterControllerPlugin<B: backend::CharacterPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::CharacterPhysicsBackend> Default for CharacterControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> Plugin for CharacterControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<collision::LayerMask>();
        app.register_type::<config::ControllerConfig>();
        app.register_type::<config::CameraProfile>();
        app.register_type::<config::LookSettings>();
        app.register_type::<config::AbilityConfig>();
        app.register_type::<config::PogoLayout>();
        app.register_type::<config::KnockbackConfig>();
        app.register_type::<intent::MovementIntent>();
        app.register_type::<intent::GamepadPogo>();
        app.register_type::<intent::LookDevice>();
        app.register_type::<detection::GroundProbe>();
        app.register_type::<motion::MotionIntegrator>();
        app.register_type::<motion::CharacterState>();
        app.register_type::<camera::LookCameraController>();
        app.register_type::<camera::CameraAimState>();
        app.register_type::<ability::DashPogoAbility>();
        app.register_type::<ability::AbilityState>();
        app.register_type::<ability::AbilityPhase>();
        app.register_type::<feedback::AnimationParams>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::OnSpecialSurface>();
        app.register_type::<damage::Health>();
        app.register_type::<navigation::NavAgent>();
        app.register_type::<navigation::NavigationBounds>();
        app.register_type::<navigation::NavWall>();
        app.register_type::<zones::CameraZone>();

        app.add_message::<feedback::FeedbackMessage>();
        app.add_message::<feedback::TutorialMessage>();
        app.add_message::<feedback::AnimationTriggerMessage>();
        app.add_message::<ability::PogoStrike>();
        app.add_message::<damage::HitReceived>();
        // Also registered by the input plugin; headless apps may not have it.
        app.add_message::<bevy::input::gamepad::GamepadRumbleRequest>();

        app.init_resource::<config::LookSettings>();
        app.init_resource::<zones::CameraZoneRegistry>();

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.configure_sets(
            FixedUpdate,
            (
                CharacterControllerSet::Preparation,
                CharacterControllerSet::Motion,
                CharacterControllerSet::Effects,
            )
                .chain(),
        );

        // Gameplay runs in FixedUpdate for consistent behavior
        app.add_systems(
            FixedUpdate,
            systems::init_character_bodies.in_set(CharacterControllerSet::Preparation),
        );
        app.add_systems(
            FixedUpdate,
            systems::step_characters::<B>.in_set(CharacterControllerSet::Motion),
        );
        app.add_systems(
            FixedUpdate,
            (
                systems::resolve_pogo_strikes::<B>,
                damage::apply_hits,
                systems::advance_knockback,
                systems::sync_state_markers,
            )
                .chain()
                .in_set(CharacterControllerSet::Effects),
        );

        // Camera and cosmetic tweens follow the frame rate
        app.add_systems(
            Update,
            (
                systems::detect_camera_zones,
                systems::update_look_cameras,
                systems::start_screen_shakes,
                systems::drive_gamepad_rumble,
                systems::advance_camera_rigs,
                systems::advance_cage_shakes,
            )
                .chain(),
        );
    }
}
