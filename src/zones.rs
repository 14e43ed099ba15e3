//! Camera zones and the follow-camera rig.
//!
//! A [`CameraZone`] is a box volume carrying a [`CameraProfile`] and a
//! shoulder offset. When a character walks into a zone that is not the last
//! activated one, the zone's profile is queued on the character's
//! [`LookCameraController`](crate::camera::LookCameraController) and every
//! [`CameraRig`] following that character blends its shoulder offset from
//! the previous zone's offset to the new one.
//!
//! The last activated zone lives in the [`CameraZoneRegistry`] resource so
//! separate apps never share it.

use bevy::prelude::*;

use crate::config::CameraProfile;
use crate::tween::{Easing, ShakeTween, Tween};

/// Vertical jitter scale of the screen shake.
const SCREEN_SHAKE_VERTICAL_SCALE: f32 = 0.5;

/// Box volume that retunes the camera of characters entering it.
#[derive(Component, Reflect, Debug, Clone, PartialEq)]
#[reflect(Component)]
pub struct CameraZone {
    /// Half extents of the trigger box around the zone's translation.
    pub half_extents: Vec3,
    pub profile: CameraProfile,
    /// Shoulder offset of the rig while this zone is active.
    pub shoulder_offset: Vec3,
    /// Time to blend from the previous zone's offset.
    pub blend_duration: f32,
}

impl Default for CameraZone {
    fn default() -> Self {
        Self {
            half_extents: Vec3::splat(5.0),
            profile: CameraProfile::default(),
            shoulder_offset: CameraRig::DEFAULT_SHOULDER_OFFSET,
            blend_duration: 0.4,
        }
    }
}

impl CameraZone {
    pub fn new(half_extents: Vec3, profile: CameraProfile) -> Self {
        Self {
            half_extents,
            profile,
            ..default()
        }
    }

    /// Builder: shoulder offset and blend time.
    pub fn with_shoulder(mut self, offset: Vec3, blend_duration: f32) -> Self {
        self.shoulder_offset = offset;
        self.blend_duration = blend_duration;
        self
    }

    /// Whether `point` is inside the zone placed at `center`.
    pub fn contains(&self, center: Vec3, point: Vec3) -> bool {
        let local = (point - center).abs();
        local.cmple(self.half_extents).all()
    }
}

/// Result of entering a new zone.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneActivation {
    pub zone: Entity,
    /// Offset of the previously active zone, if any.
    pub from_offset: Option<Vec3>,
    pub to_offset: Vec3,
    pub blend_duration: f32,
    pub profile: CameraProfile,
}

/// The last activated camera zone.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct CameraZoneRegistry {
    last_activated: Option<(Entity, Vec3)>,
}

impl CameraZoneRegistry {
    pub fn last_activated(&self) -> Option<Entity> {
        self.last_activated.map(|(zone, _)| zone)
    }

    /// Make `zone` the active one. Re-entering the active zone does nothing.
    pub fn activate(&mut self, entity: Entity, zone: &CameraZone) -> Option<ZoneActivation> {
        if self.last_activated() == Some(entity) {
            trace!("camera zone {entity:?} already active");
            return None;
        }
        let from_offset = self.last_activated.map(|(_, offset)| offset);
        self.last_activated = Some((entity, zone.shoulder_offset));
        debug!("camera zone {entity:?} activated");
        Some(ZoneActivation {
            zone: entity,
            from_offset,
            to_offset: zone.shoulder_offset,
            blend_duration: zone.blend_duration,
            profile: zone.profile.clone(),
        })
    }

    /// Forget the active zone.
    pub fn reset(&mut self) {
        self.last_activated = None;
    }
}

/// Zones a character is currently inside, for enter-edge detection.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct ZoneOccupancy {
    pub inside: Vec<Entity>,
}

/// Third-person follow camera attached to a character.
#[derive(Component, Debug, Clone)]
pub struct CameraRig {
    /// Character followed by this rig.
    pub target: Entity,
    /// Distance behind the pivot.
    pub distance: f32,
    /// Height of the pivot above the character's feet.
    pub pivot_height: f32,
    pub shoulder_offset: Vec3,
    shoulder_blend: Option<Tween<Vec3>>,
    shake: Option<ShakeTween>,
}

impl CameraRig {
    pub const DEFAULT_SHOULDER_OFFSET: Vec3 = Vec3::new(1.0, 0.0, 0.0);

    pub fn new(target: Entity) -> Self {
        Self {
            target,
            distance: 4.0,
            pivot_height: 1.375,
            shoulder_offset: Self::DEFAULT_SHOULDER_OFFSET,
            shoulder_blend: None,
            shake: None,
        }
    }

    /// Builder: follow distance and pivot height.
    pub fn with_framing(mut self, distance: f32, pivot_height: f32) -> Self {
        self.distance = distance;
        self.pivot_height = pivot_height;
        self
    }

    /// Move the shoulder offset to `to`, blending from `from` when there is one.
    pub fn blend_shoulder(&mut self, from: Option<Vec3>, to: Vec3, duration: f32) {
        match from {
            Some(from) if duration > 0.0 && from != to => {
                self.shoulder_offset = from;
                self.shoulder_blend = Some(Tween::new(from, to, duration, Easing::Linear));
            }
            _ => {
                self.shoulder_offset = to;
                self.shoulder_blend = None;
            }
        }
    }

    pub fn is_blending(&self) -> bool {
        self.shoulder_blend.is_some()
    }

    /// Start (or restart) a screen shake.
    pub fn start_shake(&mut self, amplitude: f32, duration: f32) {
        if duration <= 0.0 || amplitude <= 0.0 {
            return;
        }
        self.shake = Some(ShakeTween::new(Vec3::ZERO, amplitude, duration).with_vertical_scale(SCREEN_SHAKE_VERTICAL_SCALE));
    }

    pub fn is_shaking(&self) -> bool {
        self.shake.is_some()
    }

    /// Cancel any shake; the pivot returns to rest immediately.
    pub fn force_stop_screen_shake(&mut self) {
        if let Some(mut shake) = self.shake.take() {
            shake.cancel();
        }
    }

    /// Advance blend and shake on real time; returns the current pivot jitter.
    pub fn advance(&mut self, dt: f32) -> Vec3 {
        if let Some(blend) = self.shoulder_blend.as_mut() {
            self.shoulder_offset = blend.advance(dt);
            if blend.is_finished() {
                self.shoulder_blend = None;
            }
        }

        let Some(shake) = self.shake.as_mut() else {
            return Vec3::ZERO;
        };
        let offset = shake.advance(dt);
        if shake.is_finished() {
            self.shake = None;
            return Vec3::ZERO;
        }
        offset
    }

    /// Camera transform for a character at `feet` looking with `rotation`.
    pub fn camera_transform(&self, feet: Vec3, rotation: Quat, jitter: Vec3) -> Transform {
        let pivot = feet + Vec3::Y * self.pivot_height + jitter;
        let local = self.shoulder_offset + Vec3::Z * self.distance;
        Transform::from_translation(pivot + rotation * local).with_rotation(rotation)
    }
}
