//! Feedback, tutorial and animation notifications.
//!
//! Gameplay modules push what happened this tick into a [`ControllerEvents`]
//! buffer. The controller systems forward the buffer as Bevy messages tagged
//! with the character entity, so audio, VFX, tutorial and animation code can
//! react without the controller knowing about any of them.

use std::time::Duration;

use bevy::input::gamepad::{GamepadRumbleIntensity, GamepadRumbleRequest};
use bevy::prelude::*;

use crate::tween::ShakeTween;

/// Audio/VFX cue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedbackCue {
    /// Feet hit the ground while walking.
    Footstep { position: Vec3 },
    /// Character landed after being airborne.
    Landing { position: Vec3 },
    /// Pogo struck a bounceable target.
    PogoHit { target: Entity, position: Vec3 },
    /// Pogo struck a cage without breaking it.
    CageHit { cage: Entity, hits: u32 },
    /// Pogo broke a cage.
    CageBreak { cage: Entity },
    /// Request a camera shake.
    ScreenShake { duration: f32, amplitude: f32 },
    /// Rumble gamepads. Replaces any rumble still running.
    Rumble { low: f32, high: f32, duration: f32 },
    /// Silence gamepad rumble.
    RumbleStop,
}

impl FeedbackCue {
    /// Rumble requests for `gamepad`, empty for cues that do not rumble.
    pub fn rumble_requests(&self, gamepad: Entity) -> Vec<GamepadRumbleRequest> {
        match *self {
            FeedbackCue::Rumble { low, high, duration } => vec![
                GamepadRumbleRequest::Stop { gamepad },
                GamepadRumbleRequest::Add {
                    gamepad,
                    intensity: GamepadRumbleIntensity {
                        strong_motor: low.clamp(0.0, 1.0),
                        weak_motor: high.clamp(0.0, 1.0),
                    },
                    duration: Duration::try_from_secs_f32(duration).unwrap_or(Duration::ZERO),
                },
            ],
            FeedbackCue::RumbleStop => vec![GamepadRumbleRequest::Stop { gamepad }],
            _ => Vec::new(),
        }
    }
}

/// Milestones reported to tutorial/hint code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TutorialEvent {
    /// A jump off the special surface reached its apex.
    FirstJumpApexReached,
    /// A pogo landed on a bounceable target.
    PogoPerformed,
    /// Touched down on the special surface.
    LandedOnSpecialSurface,
    /// A breakable object was destroyed.
    ObjectBroken(Entity),
}

/// One-shot animation triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationTrigger {
    Dash,
    PogoHit,
    PogoLand,
}

/// Per-tick buffer of notifications produced by the gameplay modules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerEvents {
    pub cues: Vec<FeedbackCue>,
    pub tutorial: Vec<TutorialEvent>,
    pub triggers: Vec<AnimationTrigger>,
}

impl ControllerEvents {
    pub fn cue(&mut self, cue: FeedbackCue) {
        self.cues.push(cue);
    }

    pub fn tutorial(&mut self, event: TutorialEvent) {
        self.tutorial.push(event);
    }

    pub fn trigger(&mut self, trigger: AnimationTrigger) {
        self.triggers.push(trigger);
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty() && self.tutorial.is_empty() && self.triggers.is_empty()
    }

    pub fn has_tutorial(&self, event: TutorialEvent) -> bool {
        self.tutorial.contains(&event)
    }

    pub fn has_trigger(&self, trigger: AnimationTrigger) -> bool {
        self.triggers.contains(&trigger)
    }

    pub fn clear(&mut self) {
        self.cues.clear();
        self.tutorial.clear();
        self.triggers.clear();
    }
}

/// A [`FeedbackCue`] emitted by a character.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct FeedbackMessage {
    pub character: Entity,
    pub cue: FeedbackCue,
}

/// A [`TutorialEvent`] emitted by a character.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TutorialMessage {
    pub character: Entity,
    pub event: TutorialEvent,
}

/// An [`AnimationTrigger`] fired by a character.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationTriggerMessage {
    pub character: Entity,
    pub trigger: AnimationTrigger,
}

/// Continuous animation parameters mirrored from the motion state.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Default)]
#[reflect(Component)]
pub struct AnimationParams {
    /// Smoothed horizontal speed.
    pub speed: f32,
    /// Input magnitude (1 for digital input).
    pub motion_speed: f32,
    pub grounded: bool,
    pub jump: bool,
    pub free_fall: bool,
}

/// Shake applied to a struck cage, on real time.
#[derive(Component, Debug, Clone)]
pub struct CageShake {
    pub shake: ShakeTween,
}
