//! Look camera with airborne auto-tilt.
//!
//! [`LookCameraController`] turns look input into a yaw/pitch aim. While the
//! character is airborne and the player is not touching the look input, the
//! camera slowly tilts down toward the profile's auto-cam pitch so the
//! landing spot stays in view; after landing it eases exactly that tilt back
//! out. Camera profiles swap the clamps and auto-cam tunables, but only while
//! grounded so the camera never jumps mid-air.
//!
//! Pitch is in degrees with positive values looking down.

use bevy::prelude::*;

use crate::config::{CameraProfile, LookSettings};
use crate::intent::LookDevice;
use crate::motion::yaw_rotation;

const AUTO_TILT_EPSILON: f32 = 0.001;
const MIN_SLOWDOWN_FACTOR: f32 = 0.1;

/// Wrap an angle into `(-360, 360)` once, then clamp it.
pub fn clamp_angle(mut angle: f32, min: f32, max: f32) -> f32 {
    if angle < -360.0 {
        angle += 360.0;
    }
    if angle > 360.0 {
        angle -= 360.0;
    }
    angle.clamp(min, max)
}

/// Slowdown factor applied within `range` of a tilt target.
fn slowdown_factor(distance: f32, range: f32) -> f32 {
    let t = (distance / range).clamp(0.0, 1.0);
    MIN_SLOWDOWN_FACTOR + (1.0 - MIN_SLOWDOWN_FACTOR) * t
}

/// Aim and auto-cam bookkeeping.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct CameraAimState {
    pub yaw: f32,
    pub pitch: f32,
    pub auto_cam_active: bool,
    /// Auto-tilt may still start during the current airborne span.
    pub auto_cam_eligible: bool,
    /// Pitch added by the auto-tilt, removed again after landing.
    pub auto_tilt_offset: f32,
    pub time_since_grounded: f32,
    pub time_since_airborne: f32,
    /// Effective top clamp, possibly widened by a profile switch.
    pub current_top_clamp: f32,
    /// Effective bottom clamp, possibly widened by a profile switch.
    pub current_bottom_clamp: f32,
    was_grounded: bool,
}

/// Follow camera aim for one character.
#[derive(Component, Reflect, Debug, Clone, PartialEq)]
#[reflect(Component)]
pub struct LookCameraController {
    pub profile: CameraProfile,
    pub state: CameraAimState,
    pending_profile: Option<CameraProfile>,
}

impl Default for LookCameraController {
    fn default() -> Self {
        Self::new(CameraProfile::default())
    }
}

impl LookCameraController {
    pub fn new(profile: CameraProfile) -> Self {
        Self {
            state: CameraAimState {
                yaw: 0.0,
                pitch: 0.0,
                auto_cam_active: false,
                auto_cam_eligible: false,
                auto_tilt_offset: 0.0,
                time_since_grounded: 0.0,
                time_since_airborne: 0.0,
                current_top_clamp: profile.top_clamp,
                current_bottom_clamp: profile.bottom_clamp,
                was_grounded: true,
            },
            profile,
            pending_profile: None,
        }
    }

    /// Builder: initial aim.
    pub fn with_aim(mut self, yaw: f32, pitch: f32) -> Self {
        self.state.yaw = yaw;
        self.state.pitch = pitch;
        self
    }

    pub fn yaw(&self) -> f32 {
        self.state.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.state.pitch
    }

    pub fn pending_profile(&self) -> Option<&CameraProfile> {
        self.pending_profile.as_ref()
    }

    /// Camera rotation: yaw, then pitch plus the profile's angle override.
    pub fn rotation(&self) -> Quat {
        let pitch = self.state.pitch + self.profile.angle_override;
        yaw_rotation(self.state.yaw) * Quat::from_rotation_x(-pitch.to_radians())
    }

    /// Queue `profile`, applying it right away when grounded.
    pub fn set_camera_profile(&mut self, profile: CameraProfile, grounded: bool) {
        debug!("camera profile '{}' queued (grounded {})", profile.name, grounded);
        self.pending_profile = Some(profile);
        if grounded {
            self.apply_pending_profile(grounded);
        }
    }

    /// Apply the queued profile if the character is grounded.
    ///
    /// Returns whether a profile was applied.
    pub fn apply_pending_profile(&mut self, grounded: bool) -> bool {
        if !grounded {
            return false;
        }
        let Some(profile) = self.pending_profile.take() else {
            return false;
        };

        let pitch = self.state.pitch;
        self.state.current_top_clamp = if pitch > profile.top_clamp {
            pitch
        } else {
            profile.top_clamp
        };
        self.state.current_bottom_clamp = if pitch < profile.bottom_clamp {
            pitch
        } else {
            profile.bottom_clamp
        };
        debug!(
            "camera profile '{}' applied, clamps {:.1}..{:.1}",
            profile.name, self.state.current_bottom_clamp, self.state.current_top_clamp
        );
        self.profile = profile;
        true
    }

    /// Advance the aim by one frame.
    pub fn update(&mut self, look: Vec2, device: LookDevice, grounded: bool, settings: &LookSettings, dt: f32) {
        self.track_grounded(grounded, dt);

        if !settings.lock_camera_position {
            let base = match device {
                LookDevice::Pointer => 1.0,
                LookDevice::Stick => dt,
            };
            let multiplier = base
                * settings
                    .sensitivity
                    .clamp(LookSettings::MIN_SENSITIVITY, LookSettings::MAX_SENSITIVITY);
            let use_auto_cam = settings.auto_cam_enabled && self.profile.auto_cam_enabled;

            if look.length_squared() >= settings.look_threshold {
                let look_y = if settings.invert_y { -look.y } else { look.y };
                self.state.yaw += look.x * multiplier;
                self.state.pitch += look_y * multiplier;

                if use_auto_cam {
                    self.state.auto_cam_eligible = false;
                    self.state.auto_cam_active = false;
                    self.state.auto_tilt_offset = 0.0;
                }
            }

            if use_auto_cam {
                if grounded {
                    self.ease_tilt_back(dt);
                } else {
                    self.tilt_toward_target(dt);
                }
            }
        }

        self.state.yaw = clamp_angle(self.state.yaw, f32::MIN, f32::MAX);
        self.state.pitch = clamp_angle(
            self.state.pitch,
            self.state.current_bottom_clamp,
            self.state.current_top_clamp,
        );

        // Widened clamps snap back once the pitch is inside the nominal range.
        if self.state.current_top_clamp > self.profile.top_clamp && self.state.pitch <= self.profile.top_clamp {
            self.state.current_top_clamp = self.profile.top_clamp;
        }
        if self.state.current_bottom_clamp < self.profile.bottom_clamp
            && self.state.pitch >= self.profile.bottom_clamp
        {
            self.state.current_bottom_clamp = self.profile.bottom_clamp;
        }
    }

    fn track_grounded(&mut self, grounded: bool, dt: f32) {
        let state = &mut self.state;
        if grounded {
            if !state.was_grounded {
                state.time_since_grounded = 0.0;
            }
            state.time_since_grounded += dt;
            state.time_since_airborne = 0.0;
        } else {
            if state.was_grounded {
                state.auto_cam_eligible = true;
                state.auto_cam_active = false;
                state.auto_tilt_offset = 0.0;
                state.time_since_airborne = 0.0;
            }
            state.time_since_airborne += dt;
            state.time_since_grounded = 0.0;
        }
        state.was_grounded = grounded;
    }

    fn tilt_toward_target(&mut self, dt: f32) {
        let profile = &self.profile;
        let state = &mut self.state;

        if state.auto_cam_eligible && !state.auto_cam_active && state.time_since_airborne >= profile.auto_cam_min_air_time {
            state.auto_cam_active = true;
            trace!("auto-cam tilt started");
        }
        if !state.auto_cam_active {
            return;
        }

        let distance = profile.auto_cam_top_clamp - state.pitch;
        let mut speed = profile.auto_cam_up_speed;
        if distance <= 0.0 {
            speed = 0.0;
        } else if profile.auto_cam_slowdown_range > 0.0 && distance <= profile.auto_cam_slowdown_range {
            speed *= slowdown_factor(distance, profile.auto_cam_slowdown_range);
        }

        let step = (speed * dt).min(distance);
        state.pitch += step;
        state.auto_tilt_offset += step;
    }

    fn ease_tilt_back(&mut self, dt: f32) {
        let profile = &self.profile;
        let state = &mut self.state;

        if !state.auto_cam_active || state.auto_tilt_offset.abs() <= AUTO_TILT_EPSILON {
            return;
        }

        let ease = if profile.auto_cam_ease_in_time > 0.0 {
            (state.time_since_grounded / profile.auto_cam_ease_in_time).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let mut max_step = profile.auto_cam_down_speed * ease * dt;

        let magnitude = state.auto_tilt_offset.abs();
        if profile.auto_cam_slowdown_range > 0.0 && magnitude <= profile.auto_cam_slowdown_range {
            max_step *= slowdown_factor(magnitude, profile.auto_cam_slowdown_range);
        }

        let step = magnitude.min(max_step) * state.auto_tilt_offset.signum();
        state.pitch -= step;
        state.auto_tilt_offset -= step;

        if state.auto_tilt_offset.abs() <= AUTO_TILT_EPSILON {
            state.auto_cam_active = false;
            state.auto_tilt_offset = 0.0;
            trace!("auto-cam tilt settled");
        }
    }
}
