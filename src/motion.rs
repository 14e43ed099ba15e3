//! Kinematic motion integrator.
//!
//! [`MotionIntegrator`] owns the character's position, facing and vertical
//! velocity and advances them once per fixed tick in three phases:
//!
//! 1. [`jump_and_gravity`](MotionIntegrator::jump_and_gravity): jump
//!    impulse, timeouts, apex hang and gravity.
//! 2. [`grounded_check`](MotionIntegrator::grounded_check): ground probe,
//!    landing edges and the special-surface movement lock.
//! 3. [`apply_movement`](MotionIntegrator::apply_movement): speed easing,
//!    facing and the swept move.
//!
//! Abilities run between phases 2 and 3 through the [`MotionState`] trait.
//!
//! Yaw is a compass heading in degrees (positive turns right, `0` faces
//! `-Z`); use [`yaw_rotation`] and [`yaw_direction`] to convert.

use bevy::prelude::*;

use crate::backend::{PhysicsQuery, ShapeFilter};
use crate::config::ControllerConfig;
use crate::detection::GroundProbe;
use crate::feedback::{AnimationParams, ControllerEvents, FeedbackCue, TutorialEvent};
use crate::intent::MovementIntent;

/// Rotation for a compass yaw in degrees.
pub fn yaw_rotation(yaw_degrees: f32) -> Quat {
    Quat::from_rotation_y(-yaw_degrees.to_radians())
}

/// Planar forward direction for a compass yaw in degrees.
pub fn yaw_direction(yaw_degrees: f32) -> Vec3 {
    let yaw = yaw_degrees.to_radians();
    Vec3::new(yaw.sin(), 0.0, -yaw.cos())
}

/// Shortest signed difference between two angles in degrees.
pub fn delta_angle(current: f32, target: f32) -> f32 {
    let delta = (target - current).rem_euclid(360.0);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// Critically damped spring toward `target`.
pub fn smooth_damp(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        return current;
    }
    let smooth_time = smooth_time.max(1e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);
    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let mut output = target + (change + temp) * decay;

    // No overshoot.
    if (target - current > 0.0) == (output > target) {
        output = target;
        *velocity = (output - target) / dt;
    }
    output
}

/// [`smooth_damp`] for angles in degrees, taking the short way around.
pub fn smooth_damp_angle(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    let target = current + delta_angle(current, target);
    smooth_damp(current, target, velocity, smooth_time, dt)
}

/// Contract between the motion integrator and abilities acting on it.
pub trait MotionState {
    fn grounded(&self) -> bool;
    fn grounded_on_special_surface(&self) -> bool;
    fn movement_locked_by_special_surface(&self) -> bool;
    /// Drop the special-surface lock (the surface was destroyed).
    fn release_special_surface_lock(&mut self);
    fn vertical_velocity(&self) -> f32;
    fn set_vertical_velocity(&mut self, velocity: f32);
    /// Launch upward to reach `height`, bypassing the next grounded check.
    fn bounce(&mut self, height: f32);
    /// While locked, airborne vertical velocity is held at zero.
    fn set_gravity_locked(&mut self, locked: bool);
    /// The last swept move ended against something below.
    fn collided_below(&self) -> bool;
    /// Feet position.
    fn position(&self) -> Vec3;
    /// Body center position.
    fn center(&self) -> Vec3;
    /// Planar facing direction.
    fn facing(&self) -> Vec3;
    /// Swept move by `delta`, returning the displacement actually applied.
    fn move_by(&mut self, delta: Vec3, query: &dyn PhysicsQuery) -> Vec3;
}

/// Per-character motion state.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct CharacterState {
    /// Feet position.
    pub position: Vec3,
    /// Facing yaw in degrees.
    pub facing_yaw: f32,
    pub vertical_velocity: f32,
    /// Eased horizontal speed.
    pub speed: f32,
    /// Smoothed speed fed to animation.
    pub animation_blend: f32,
    pub grounded: bool,
    pub grounded_on_special_surface: bool,
    pub movement_locked_by_special_surface: bool,
    /// Set by a bounce, cleared after the next grounded check.
    pub external_velocity_override: bool,
    pub gravity_locked: bool,
    pub collided_below: bool,
    pub jump_timeout_remaining: f32,
    pub fall_timeout_remaining: f32,
    /// Time spent near the apex in the current airborne span.
    pub apex_timer: f32,
    pub jumping: bool,
    pub free_fall: bool,
    target_yaw: f32,
    yaw_velocity: f32,
    horizontal_speed: f32,
    footstep_distance: f32,
    awaiting_apex: bool,
}

impl CharacterState {
    fn new(config: &ControllerConfig) -> Self {
        Self {
            position: Vec3::ZERO,
            facing_yaw: 0.0,
            vertical_velocity: 0.0,
            speed: 0.0,
            animation_blend: 0.0,
            grounded: true,
            grounded_on_special_surface: false,
            movement_locked_by_special_surface: false,
            external_velocity_override: false,
            gravity_locked: false,
            collided_below: false,
            jump_timeout_remaining: config.jump_timeout,
            fall_timeout_remaining: config.fall_timeout,
            apex_timer: 0.0,
            jumping: false,
            free_fall: false,
            target_yaw: 0.0,
            yaw_velocity: 0.0,
            horizontal_speed: 0.0,
            footstep_distance: 0.0,
            awaiting_apex: false,
        }
    }
}

/// Kinematic character body.
#[derive(Component, Reflect, Debug, Clone, PartialEq)]
#[reflect(Component)]
pub struct MotionIntegrator {
    pub config: ControllerConfig,
    pub state: CharacterState,
    /// Entity ignored by this body's own queries.
    pub body: Option<Entity>,
}

impl Default for MotionIntegrator {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}

impl MotionIntegrator {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            state: CharacterState::new(&config),
            config,
            body: None,
        }
    }

    /// Builder: start at `position`.
    pub fn at(mut self, position: Vec3) -> Self {
        self.state.position = position;
        self
    }

    /// Builder: exclude `entity` from this body's queries.
    pub fn with_body(mut self, entity: Entity) -> Self {
        self.body = Some(entity);
        self
    }

    pub fn state(&self) -> &CharacterState {
        &self.state
    }

    /// Run all three phases with no ability in between.
    pub fn tick(
        &mut self,
        intent: &mut MovementIntent,
        camera_yaw: f32,
        query: &dyn PhysicsQuery,
        dt: f32,
        events: &mut ControllerEvents,
    ) {
        self.jump_and_gravity(intent, dt, events);
        self.grounded_check(query, events);
        self.apply_movement(intent, camera_yaw, query, dt, events);
    }

    /// Phase 1: jump impulse, timeouts, apex hang and gravity.
    pub fn jump_and_gravity(&mut self, intent: &mut MovementIntent, dt: f32, events: &mut ControllerEvents) {
        let config = self.config;
        let state = &mut self.state;
        let mut jumped = false;

        if state.grounded && !state.external_velocity_override {
            state.fall_timeout_remaining = config.fall_timeout;
            state.jumping = false;
            state.free_fall = false;

            if state.vertical_velocity < 0.0 {
                state.vertical_velocity = config.grounded_stick_velocity;
            }

            if intent.jump && state.jump_timeout_remaining <= 0.0 {
                let height = if state.grounded_on_special_surface {
                    config.special_surface_jump_height
                } else {
                    config.jump_height
                };
                state.vertical_velocity = config.jump_velocity(height);
                state.jump_timeout_remaining = config.jump_timeout;
                state.jumping = true;
                state.awaiting_apex = state.grounded_on_special_surface;
                jumped = true;
                debug!(
                    "jump: height {:.2} velocity {:.2} special {}",
                    height, state.vertical_velocity, state.grounded_on_special_surface
                );
            }

            if !jumped && state.jump_timeout_remaining >= 0.0 {
                state.jump_timeout_remaining -= dt;
            }
            state.apex_timer = 0.0;
        } else {
            state.grounded = false;
            state.jump_timeout_remaining = config.jump_timeout;

            if state.fall_timeout_remaining >= 0.0 {
                state.fall_timeout_remaining -= dt;
            } else {
                state.free_fall = true;
            }

            intent.jump = false;

            let near_apex = state.vertical_velocity.abs() <= config.apex_threshold;
            state.apex_timer = if near_apex { state.apex_timer + dt } else { 0.0 };
            let gravity_scale = if near_apex && state.apex_timer <= config.apex_hang_time {
                config.apex_gravity_scale
            } else {
                1.0
            };

            if state.gravity_locked {
                state.vertical_velocity = 0.0;
            } else if state.vertical_velocity > -config.terminal_velocity {
                state.vertical_velocity = (state.vertical_velocity
                    + config.gravity * gravity_scale * dt)
                    .max(-config.terminal_velocity);
            }
        }

        if state.awaiting_apex
            && !state.grounded
            && state.vertical_velocity > 0.0
            && state.vertical_velocity <= config.apex_hint_threshold
        {
            state.awaiting_apex = false;
            events.tutorial(TutorialEvent::FirstJumpApexReached);
        }
    }

    /// Phase 2: sample the ground probe once and derive every ground flag.
    pub fn grounded_check(&mut self, query: &dyn PhysicsQuery, events: &mut ControllerEvents) {
        if self.state.external_velocity_override {
            self.state.external_velocity_override = false;
            self.state.grounded = false;
            self.state.grounded_on_special_surface = false;
            return;
        }

        let probe = GroundProbe::sample(&self.config, self.state.position, query, self.body);
        let state = &mut self.state;
        let was_grounded = state.grounded;
        let was_on_special = state.grounded_on_special_surface;

        state.grounded = probe.grounded;
        state.grounded_on_special_surface = probe.on_special_surface();

        let locked = probe.next_special_lock(state.movement_locked_by_special_surface);
        if locked != state.movement_locked_by_special_surface {
            debug!("special surface lock {}", if locked { "engaged" } else { "released" });
        }
        state.movement_locked_by_special_surface = locked;

        if state.grounded && !was_grounded {
            state.awaiting_apex = false;
            events.cue(FeedbackCue::Landing {
                position: state.position,
            });
        }
        if state.grounded_on_special_surface && !was_on_special {
            events.tutorial(TutorialEvent::LandedOnSpecialSurface);
        }
    }

    /// Phase 3: ease speed, turn toward the input and sweep the body.
    pub fn apply_movement(
        &mut self,
        intent: &MovementIntent,
        camera_yaw: f32,
        query: &dyn PhysicsQuery,
        dt: f32,
        events: &mut ControllerEvents,
    ) {
        let config = self.config;
        let can_move = intent.can_move && !self.state.movement_locked_by_special_surface;

        let target_speed = match (can_move && intent.is_moving(), intent.sprint) {
            (false, _) => 0.0,
            (true, true) => config.sprint_speed,
            (true, false) => config.move_speed,
        };
        let input_magnitude = if can_move { intent.input_magnitude() } else { 0.0 };
        let rate = (dt * config.speed_change_rate).clamp(0.0, 1.0);

        let current = self.state.horizontal_speed;
        const SPEED_OFFSET: f32 = 0.1;
        self.state.speed = if current < target_speed - SPEED_OFFSET || current > target_speed + SPEED_OFFSET {
            let eased = current + (target_speed * input_magnitude - current) * rate;
            (eased * 1000.0).round() / 1000.0
        } else {
            target_speed
        };

        self.state.animation_blend += (target_speed - self.state.animation_blend) * rate;
        if self.state.animation_blend < 0.01 {
            self.state.animation_blend = 0.0;
        }

        let mut direction = Vec3::ZERO;
        if can_move {
            if intent.is_moving() {
                let axis = intent.move_axis.normalize_or_zero();
                self.state.target_yaw = axis.x.atan2(axis.y).to_degrees() + camera_yaw;
                self.state.facing_yaw = smooth_damp_angle(
                    self.state.facing_yaw,
                    self.state.target_yaw,
                    &mut self.state.yaw_velocity,
                    config.rotation_smooth_time,
                    dt,
                );
            }
            direction = yaw_direction(self.state.target_yaw);
        }

        let delta = direction * (self.state.speed * dt) + Vec3::Y * (self.state.vertical_velocity * dt);
        let moved = self.move_by(delta, query);

        let planar = Vec2::new(moved.x, moved.z).length();
        self.state.horizontal_speed = if dt > 0.0 { planar / dt } else { 0.0 };

        if self.state.grounded && planar > 0.0 && config.footstep_stride > 0.0 {
            self.state.footstep_distance += planar;
            if self.state.footstep_distance >= config.footstep_stride {
                self.state.footstep_distance -= config.footstep_stride;
                events.cue(FeedbackCue::Footstep {
                    position: self.state.position,
                });
            }
        }
    }

    /// Snapshot for the animation layer.
    pub fn animation_params(&self, intent: &MovementIntent) -> AnimationParams {
        AnimationParams {
            speed: self.state.animation_blend,
            motion_speed: if intent.analog_movement {
                intent.move_axis.length()
            } else {
                1.0
            },
            grounded: self.state.grounded,
            jump: self.state.jumping,
            free_fall: self.state.free_fall,
        }
    }

    /// Place the body at `position` without sweeping.
    pub fn teleport(&mut self, position: Vec3) {
        self.state.position = position;
    }
}

impl MotionState for MotionIntegrator {
    fn grounded(&self) -> bool {
        self.state.grounded
    }

    fn grounded_on_special_surface(&self) -> bool {
        self.state.grounded_on_special_surface
    }

    fn movement_locked_by_special_surface(&self) -> bool {
        self.state.movement_locked_by_special_surface
    }

    fn release_special_surface_lock(&mut self) {
        if self.state.movement_locked_by_special_surface {
            debug!("special surface lock released externally");
        }
        self.state.movement_locked_by_special_surface = false;
    }

    fn vertical_velocity(&self) -> f32 {
        self.state.vertical_velocity
    }

    fn set_vertical_velocity(&mut self, velocity: f32) {
        self.state.vertical_velocity = velocity;
    }

    fn bounce(&mut self, height: f32) {
        self.state.vertical_velocity = self.config.jump_velocity(height);
        self.state.external_velocity_override = true;
        debug!("bounce: height {:.2} velocity {:.2}", height, self.state.vertical_velocity);
    }

    fn set_gravity_locked(&mut self, locked: bool) {
        self.state.gravity_locked = locked;
    }

    fn collided_below(&self) -> bool {
        self.state.collided_below
    }

    fn position(&self) -> Vec3 {
        self.state.position
    }

    fn center(&self) -> Vec3 {
        self.state.position + Vec3::Y * self.config.center_height
    }

    fn facing(&self) -> Vec3 {
        yaw_direction(self.state.facing_yaw)
    }

    fn move_by(&mut self, delta: Vec3, query: &dyn PhysicsQuery) -> Vec3 {
        let radius = self.config.body_radius;
        let skin = self.config.skin_width;
        let start = self.state.position;
        let mut position = start;

        let horizontal = Vec3::new(delta.x, 0.0, delta.z);
        let length = horizontal.length();
        if length > f32::EPSILON {
            let direction = horizontal / length;
            let blocking = ShapeFilter::new(self.config.blocking_layers).excluding(self.body);
            let origin = position + Vec3::Y * (radius + skin);
            let travel = match query.sphere_cast(origin, radius, direction, length + skin, &blocking) {
                Some(hit) => (hit.distance - skin).clamp(0.0, length),
                None => length,
            };
            position += direction * travel;
        }

        self.state.collided_below = false;
        if delta.y < 0.0 {
            let ground = ShapeFilter::new(self.config.ground_layers).excluding(self.body);
            let origin = position + Vec3::Y * radius;
            let drop = -delta.y;
            match query.sphere_cast(origin, radius, Vec3::NEG_Y, drop + skin, &ground) {
                Some(hit) => {
                    position.y -= (hit.distance - skin).clamp(0.0, drop);
                    self.state.collided_below = true;
                }
                None => position.y -= drop,
            }
        } else if delta.y > 0.0 {
            let blocking = ShapeFilter::new(self.config.blocking_layers).excluding(self.body);
            let origin = position + Vec3::Y * radius;
            let rise = delta.y;
            position.y += match query.sphere_cast(origin, radius, Vec3::Y, rise + skin, &blocking) {
                Some(hit) if hit.distance > 0.0 => (hit.distance - skin).clamp(0.0, rise),
                // Starting overlap (usually the floor we stand on) does not block rising.
                Some(_) | None => rise,
            };
        }

        self.state.position = position;
        position - start
    }
}
