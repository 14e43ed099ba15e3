//! Movement intent components.
//!
//! Intents represent the desired movement from player input or AI. Your code
//! handles device polling and writes plain values here; the controller
//! systems read them (and consume the latched buttons) every tick.

use bevy::prelude::*;

/// Device the look input came from.
///
/// Pointer deltas are already frame-sized, stick values are rates and get
/// scaled by the frame time.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookDevice {
    #[default]
    Pointer,
    Stick,
}

/// Per-frame gamepad button edges used by the pogo layouts.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GamepadPogo {
    /// South button went down this frame.
    pub south_just_pressed: bool,
    /// West button went down this frame.
    pub west_just_pressed: bool,
    /// Layout toggle (d-pad right) went down this frame.
    pub layout_toggle_just_pressed: bool,
}

/// Unified movement intent for the character, its camera and its ability.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use pogo_character_controller::prelude::*;
///
/// let mut intent = MovementIntent::new();
/// intent.set_move(Vec2::new(0.0, 1.0));
/// assert!(intent.is_moving());
///
/// intent.set_jump(true);
/// intent.press_dash();
/// assert!(intent.take_dash());
/// assert!(!intent.take_dash());
/// ```
#[derive(Component, Reflect, Debug, Clone, PartialEq)]
#[reflect(Component)]
pub struct MovementIntent {
    /// Planar movement (x = right, y = forward), length at most 1.
    pub move_axis: Vec2,
    /// Whether `move_axis` magnitude scales the speed.
    pub analog_movement: bool,
    pub sprint: bool,
    /// Look input (x = yaw, y = pitch).
    pub look: Vec2,
    pub look_device: LookDevice,
    /// Jump button state. Cleared by the controller while airborne.
    pub jump: bool,
    /// Latched dash press, consumed by the ability.
    pub dash: bool,
    /// Keyboard/mouse pogo button held state. Edges are detected internally.
    pub pogo_held: bool,
    /// Gamepad pogo edges. When present the keyboard path is ignored.
    pub gamepad_pogo: Option<GamepadPogo>,
    /// External movement gate (menus, cutscenes).
    pub can_move: bool,
}

impl Default for MovementIntent {
    fn default() -> Self {
        Self {
            move_axis: Vec2::ZERO,
            analog_movement: false,
            sprint: false,
            look: Vec2::ZERO,
            look_device: LookDevice::Pointer,
            jump: false,
            dash: false,
            pogo_held: false,
            gamepad_pogo: None,
            can_move: true,
        }
    }
}

impl MovementIntent {
    /// Create a new empty movement intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the planar movement, clamped to unit length.
    pub fn set_move(&mut self, axis: Vec2) {
        self.move_axis = axis.clamp_length_max(1.0);
    }

    /// Set the look input and its source.
    pub fn set_look(&mut self, look: Vec2, device: LookDevice) {
        self.look = look;
        self.look_device = device;
    }

    pub fn set_sprint(&mut self, sprint: bool) {
        self.sprint = sprint;
    }

    pub fn set_jump(&mut self, pressed: bool) {
        self.jump = pressed;
    }

    /// Latch a dash press.
    pub fn press_dash(&mut self) {
        self.dash = true;
    }

    /// Consume a latched dash press.
    pub fn take_dash(&mut self) -> bool {
        std::mem::take(&mut self.dash)
    }

    pub fn set_pogo_held(&mut self, held: bool) {
        self.pogo_held = held;
    }

    /// Provide this frame's gamepad edges, or `None` without a gamepad.
    pub fn set_gamepad_pogo(&mut self, pogo: Option<GamepadPogo>) {
        self.gamepad_pogo = pogo;
    }

    /// Drop this frame's gamepad edges once a fixed step has seen them.
    pub fn consume_gamepad_edges(&mut self) {
        if let Some(pad) = self.gamepad_pogo.as_mut() {
            *pad = GamepadPogo::default();
        }
    }

    pub fn is_moving(&self) -> bool {
        self.move_axis != Vec2::ZERO
    }

    /// Speed multiplier implied by the movement input.
    pub fn input_magnitude(&self) -> f32 {
        if !self.is_moving() {
            0.0
        } else if self.analog_movement {
            self.move_axis.length()
        } else {
            1.0
        }
    }

    /// Clear movement and look, keeping button state.
    pub fn clear(&mut self) {
        self.move_axis = Vec2::ZERO;
        self.look = Vec2::ZERO;
    }
}
