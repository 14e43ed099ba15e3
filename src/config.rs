//! Controller configuration components.
//!
//! Tunables for the motion integrator, the look camera, the dash/pogo
//! ability and pogo knockback. Every config has a sensible `Default`, a few
//! presets and `with_*` builders. Angles are in degrees, distances in meters
//! and times in seconds.

use bevy::prelude::*;

use crate::collision::LayerMask;

/// Configuration parameters for the motion integrator.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct ControllerConfig {
    // === Movement Settings ===
    /// Walk speed (m/s).
    pub move_speed: f32,
    /// Sprint speed (m/s).
    pub sprint_speed: f32,
    /// Time for the facing to catch up with the movement direction.
    pub rotation_smooth_time: f32,
    /// Acceleration and deceleration rate of the horizontal speed.
    pub speed_change_rate: f32,

    // === Jump Settings ===
    /// Jump apex height from normal ground.
    pub jump_height: f32,
    /// Jump apex height when jumping off a special surface (cage).
    pub special_surface_jump_height: f32,
    /// Gravity acceleration (negative is down).
    pub gravity: f32,
    /// |vertical velocity| below which the character counts as near the apex.
    pub apex_threshold: f32,
    /// How long the reduced apex gravity lasts.
    pub apex_hang_time: f32,
    /// Gravity multiplier while hanging at the apex.
    pub apex_gravity_scale: f32,
    /// Time that must pass after landing before jumping again.
    pub jump_timeout: f32,
    /// Time airborne before the free-fall animation kicks in.
    pub fall_timeout: f32,
    /// Maximum fall speed (positive magnitude).
    pub terminal_velocity: f32,
    /// Downward velocity held while grounded to keep contact.
    pub grounded_stick_velocity: f32,
    /// Upward velocity below which a special-surface jump reports its apex.
    pub apex_hint_threshold: f32,

    // === Ground Probe Settings ===
    /// Vertical offset of the ground probe (negative moves it up).
    pub grounded_offset: f32,
    /// Radius of the ground probe sphere.
    pub grounded_radius: f32,
    /// Layers that count as ground.
    pub ground_layers: LayerMask,
    /// Layers that count as the special (cage) surface.
    pub special_surface_layers: LayerMask,

    // === Body Settings ===
    /// Radius of the swept body sphere.
    pub body_radius: f32,
    /// Height of the body center above the feet.
    pub center_height: f32,
    /// Gap kept between the body and obstacles.
    pub skin_width: f32,
    /// Layers that block horizontal and upward movement.
    pub blocking_layers: LayerMask,

    // === Feedback Settings ===
    /// Horizontal distance between footstep cues.
    pub footstep_stride: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            move_speed: 2.0,
            sprint_speed: 5.335,
            rotation_smooth_time: 0.12,
            speed_change_rate: 10.0,

            jump_height: 1.2,
            special_surface_jump_height: 1.2,
            gravity: -15.0,
            apex_threshold: 1.0,
            apex_hang_time: 0.12,
            apex_gravity_scale: 0.25,
            jump_timeout: 0.5,
            fall_timeout: 0.15,
            terminal_velocity: 53.0,
            grounded_stick_velocity: -2.0,
            apex_hint_threshold: 0.5,

            grounded_offset: -0.14,
            grounded_radius: 0.28,
            ground_layers: LayerMask::GROUND | LayerMask::CAGE,
            special_surface_layers: LayerMask::CAGE,

            body_radius: 0.28,
            center_height: 0.93,
            skin_width: 0.02,
            blocking_layers: LayerMask::GROUND | LayerMask::CAGE | LayerMask::ENVIRONMENT,

            footstep_stride: 1.6,
        }
    }
}

impl ControllerConfig {
    /// Magnitude of the configured gravity.
    #[inline]
    pub fn gravity_magnitude(&self) -> f32 {
        self.gravity.abs()
    }

    /// Initial vertical velocity reaching `height` under this gravity.
    #[inline]
    pub fn jump_velocity(&self, height: f32) -> f32 {
        (height.max(0.0) * 2.0 * self.gravity_magnitude()).sqrt()
    }

    /// Create a config tuned for the player.
    pub fn player() -> Self {
        Self::default()
    }

    /// Create a floaty config with a long apex hang.
    pub fn floaty() -> Self {
        Self {
            apex_hang_time: 0.25,
            apex_gravity_scale: 0.15,
            gravity: -12.0,
            ..default()
        }
    }

    /// Builder: set walk and sprint speeds.
    pub fn with_speeds(mut self, move_speed: f32, sprint_speed: f32) -> Self {
        self.move_speed = move_speed;
        self.sprint_speed = sprint_speed;
        self
    }

    /// Builder: set jump height.
    pub fn with_jump_height(mut self, height: f32) -> Self {
        self.jump_height = height;
        self
    }

    /// Builder: set special-surface jump height.
    pub fn with_special_surface_jump_height(mut self, height: f32) -> Self {
        self.special_surface_jump_height = height;
        self
    }

    /// Builder: set gravity (negative is down).
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    /// Builder: set apex hang parameters.
    pub fn with_apex_hang(mut self, threshold: f32, hang_time: f32, gravity_scale: f32) -> Self {
        self.apex_threshold = threshold;
        self.apex_hang_time = hang_time;
        self.apex_gravity_scale = gravity_scale;
        self
    }

    /// Builder: set jump and fall timeouts.
    pub fn with_timeouts(mut self, jump_timeout: f32, fall_timeout: f32) -> Self {
        self.jump_timeout = jump_timeout;
        self.fall_timeout = fall_timeout;
        self
    }

    /// Builder: set the ground probe.
    pub fn with_ground_probe(mut self, offset: f32, radius: f32) -> Self {
        self.grounded_offset = offset;
        self.grounded_radius = radius;
        self
    }

    /// Builder: set ground and special-surface layers.
    pub fn with_layers(mut self, ground: LayerMask, special_surface: LayerMask) -> Self {
        self.ground_layers = ground;
        self.special_surface_layers = special_surface;
        self
    }
}

/// Named bundle of camera tunables, swapped by camera zones.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct CameraProfile {
    /// Label used in logs.
    pub name: String,
    /// Maximum pitch (looking down).
    pub top_clamp: f32,
    /// Minimum pitch (looking up).
    pub bottom_clamp: f32,
    /// Extra pitch added on top of the aim when composing the rotation.
    pub angle_override: f32,
    /// Whether this profile allows airborne auto-tilt.
    pub auto_cam_enabled: bool,
    /// Pitch the auto-cam tilts toward while airborne.
    pub auto_cam_top_clamp: f32,
    /// Auto-cam tilt speed while airborne (deg/s).
    pub auto_cam_up_speed: f32,
    /// Auto-cam ease-back speed after landing (deg/s).
    pub auto_cam_down_speed: f32,
    /// Distance from the tilt target where the tilt starts slowing down.
    pub auto_cam_slowdown_range: f32,
    /// Ramp time of the ease-back after landing.
    pub auto_cam_ease_in_time: f32,
    /// Airborne time required before auto-tilt may start.
    pub auto_cam_min_air_time: f32,
}

impl Default for CameraProfile {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            top_clamp: 70.0,
            bottom_clamp: -30.0,
            angle_override: 0.0,
            auto_cam_enabled: true,
            auto_cam_top_clamp: 70.0,
            auto_cam_up_speed: 60.0,
            auto_cam_down_speed: 40.0,
            auto_cam_slowdown_range: 10.0,
            auto_cam_ease_in_time: 0.25,
            auto_cam_min_air_time: 0.1,
        }
    }
}

impl CameraProfile {
    /// Profile with a named label and default values.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..default()
        }
    }

    /// Tight vertical framing used by pogo arenas.
    pub fn arena() -> Self {
        Self {
            name: "arena".to_string(),
            top_clamp: 70.0,
            auto_cam_top_clamp: 44.0,
            auto_cam_up_speed: 3.0,
            auto_cam_down_speed: 0.25,
            auto_cam_slowdown_range: 0.1,
            auto_cam_ease_in_time: 0.4444,
            ..default()
        }
    }

    /// Builder: set pitch clamps.
    pub fn with_clamps(mut self, top: f32, bottom: f32) -> Self {
        self.top_clamp = top;
        self.bottom_clamp = bottom;
        self
    }

    /// Builder: set the pitch override.
    pub fn with_angle_override(mut self, angle: f32) -> Self {
        self.angle_override = angle;
        self
    }

    /// Builder: enable or disable auto-cam for this profile.
    pub fn with_auto_cam(mut self, enabled: bool) -> Self {
        self.auto_cam_enabled = enabled;
        self
    }

    /// Builder: set auto-cam tilt target and speeds.
    pub fn with_auto_cam_tilt(mut self, top_clamp: f32, up_speed: f32, down_speed: f32) -> Self {
        self.auto_cam_top_clamp = top_clamp;
        self.auto_cam_up_speed = up_speed;
        self.auto_cam_down_speed = down_speed;
        self
    }
}

/// Global look settings shared by every look camera.
#[derive(Resource, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Resource)]
pub struct LookSettings {
    /// Master switch for airborne auto-tilt.
    pub auto_cam_enabled: bool,
    /// Look sensitivity multiplier, kept within `0.5..=1.5`.
    pub sensitivity: f32,
    pub invert_y: bool,
    /// Freeze yaw and pitch entirely.
    pub lock_camera_position: bool,
    /// Squared look magnitude below which input is ignored.
    pub look_threshold: f32,
}

impl Default for LookSettings {
    fn default() -> Self {
        Self {
            auto_cam_enabled: true,
            sensitivity: Self::sensitivity_from_slider(0.5),
            invert_y: false,
            lock_camera_position: false,
            look_threshold: 0.01,
        }
    }
}

impl LookSettings {
    pub const MIN_SENSITIVITY: f32 = 0.5;
    pub const MAX_SENSITIVITY: f32 = 1.5;

    /// Map a `0..=1` settings slider onto the sensitivity range.
    pub fn sensitivity_from_slider(slider: f32) -> f32 {
        Self::MIN_SENSITIVITY + (Self::MAX_SENSITIVITY - Self::MIN_SENSITIVITY) * slider.clamp(0.0, 1.0)
    }

    /// Set sensitivity, clamped to the supported range.
    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.sensitivity = sensitivity.clamp(Self::MIN_SENSITIVITY, Self::MAX_SENSITIVITY);
    }
}

/// Which gamepad button triggers the pogo.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PogoLayout {
    /// South button; it also jumps, so a short air time is required first.
    #[default]
    AttackOnJump,
    /// West button.
    AttackOnX,
}

/// Configuration of the dash/pogo ability.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct AbilityConfig {
    // === Dash Settings ===
    pub dash_duration: f32,
    pub dash_cooldown: f32,
    pub dash_speed: f32,
    /// Upward drift applied while air-dashing (m/s).
    pub air_dash_lift: f32,

    // === Pogo Settings ===
    pub pogo_down_speed: f32,
    pub pogo_check_radius: f32,
    /// Look-ahead distance of the pogo hit query.
    pub pogo_check_ahead: f32,
    pub pogo_cooldown: f32,
    /// Air time required before the south button may pogo.
    pub min_air_time_before_pogo: f32,
    pub layout: PogoLayout,

    // === Special Surface Overrides ===
    /// Pogo speed while the cage lock is held.
    pub cage_pogo_down_speed: f32,
    pub cage_pogo_check_radius: f32,
    pub cage_pogo_check_ahead: f32,

    // === Targets ===
    pub enemy_layers: LayerMask,
    pub soft_target_layers: LayerMask,
    pub cage_layers: LayerMask,
    /// Layers the pogo lands on when nothing bounceable is hit.
    pub landing_layers: LayerMask,
    pub enemy_bounce_height: f32,
    pub soft_target_bounce_height: f32,
    pub cage_bounce_height: f32,
    pub pogo_damage: i32,
    pub cage_pogos_to_break: u32,
    /// Broken cages are disabled instead of despawned.
    pub disable_broken_cage: bool,

    // === Shake Settings ===
    pub enable_screen_shake: bool,
    pub shake_duration: f32,
    pub shake_amplitude: f32,
    pub cage_shake_duration: f32,
    pub cage_shake_amplitude: f32,

    // === Rumble Settings ===
    /// Rumble connected gamepads on every pogo bounce.
    pub enable_rumble: bool,
    /// Low-frequency (strong) motor intensity, 0 to 1.
    pub pogo_rumble_low: f32,
    /// High-frequency (weak) motor intensity, 0 to 1.
    pub pogo_rumble_high: f32,
    pub pogo_rumble_duration: f32,
}

impl Default for AbilityConfig {
    fn default() -> Self {
        Self {
            dash_duration: 0.18,
            dash_cooldown: 0.6,
            dash_speed: 16.0,
            air_dash_lift: 4.0,

            pogo_down_speed: 18.0,
            pogo_check_radius: 0.6,
            pogo_check_ahead: 1.0,
            pogo_cooldown: 0.30,
            min_air_time_before_pogo: 0.05,
            layout: PogoLayout::AttackOnJump,

            cage_pogo_down_speed: 18.0,
            cage_pogo_check_radius: 0.6,
            cage_pogo_check_ahead: 1.0,

            enemy_layers: LayerMask::ENEMY,
            soft_target_layers: LayerMask::SOFT_TARGET,
            cage_layers: LayerMask::CAGE,
            landing_layers: LayerMask::GROUND | LayerMask::CAGE | LayerMask::ENVIRONMENT,
            enemy_bounce_height: 2.2,
            soft_target_bounce_height: 3.5,
            cage_bounce_height: 2.2,
            pogo_damage: 1,
            cage_pogos_to_break: 3,
            disable_broken_cage: true,

            enable_screen_shake: true,
            shake_duration: 0.08,
            shake_amplitude: 0.12,
            cage_shake_duration: 0.12,
            cage_shake_amplitude: 0.08,

            enable_rumble: true,
            pogo_rumble_low: 0.4,
            pogo_rumble_high: 0.8,
            pogo_rumble_duration: 0.12,
        }
    }
}

impl AbilityConfig {
    /// Builder: set the pogo button layout.
    pub fn with_layout(mut self, layout: PogoLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Builder: set dash parameters.
    pub fn with_dash(mut self, speed: f32, duration: f32, cooldown: f32) -> Self {
        self.dash_speed = speed;
        self.dash_duration = duration;
        self.dash_cooldown = cooldown;
        self
    }

    /// Builder: set pogo parameters.
    pub fn with_pogo(mut self, down_speed: f32, check_radius: f32, check_ahead: f32) -> Self {
        self.pogo_down_speed = down_speed;
        self.pogo_check_radius = check_radius;
        self.pogo_check_ahead = check_ahead;
        self
    }

    /// Builder: set the number of pogos that break a cage.
    pub fn with_cage_pogos_to_break(mut self, count: u32) -> Self {
        self.cage_pogos_to_break = count;
        self
    }

    /// Builder: enable or disable screen shake.
    pub fn with_screen_shake(mut self, enabled: bool) -> Self {
        self.enable_screen_shake = enabled;
        self
    }

    /// Builder: set the pogo rumble motors and duration.
    pub fn with_rumble(mut self, low: f32, high: f32, duration: f32) -> Self {
        self.enable_rumble = true;
        self.pogo_rumble_low = low;
        self.pogo_rumble_high = high;
        self.pogo_rumble_duration = duration;
        self
    }

    /// Builder: turn the pogo rumble off.
    pub fn without_rumble(mut self) -> Self {
        self.enable_rumble = false;
        self
    }
}

/// Configuration of the knockback applied to pogo'd enemies.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct KnockbackConfig {
    pub distance: f32,
    pub duration: f32,
    /// Gap kept between the pushed body and walls.
    pub skin: f32,
    /// Layers that stop the slide.
    pub environment_layers: LayerMask,
    /// Search radius when snapping points onto the navigation surface.
    pub nav_sample_distance: f32,
}

impl Default for KnockbackConfig {
    fn default() -> Self {
        Self {
            distance: 2.5,
            duration: 0.12,
            skin: 0.08,
            environment_layers: LayerMask::ENVIRONMENT,
            nav_sample_distance: 1.0,
        }
    }
}

impl KnockbackConfig {
    pub const MIN_SKIN: f32 = 0.02;

    /// Skin actually used by the solver.
    #[inline]
    pub fn effective_skin(&self) -> f32 {
        self.skin.max(Self::MIN_SKIN)
    }

    /// Builder: set distance and duration.
    pub fn with_distance(mut self, distance: f32, duration: f32) -> Self {
        self.distance = distance;
        self.duration = duration;
        self
    }
}
