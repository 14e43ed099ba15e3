//! Dash and pogo ability.
//!
//! [`DashPogoAbility`] is a small state machine layered on top of a
//! [`MotionState`]:
//!
//! - `Idle`: waits for a dash or pogo press.
//! - `DashingForward`: sweeps the body along the dash direction for a fixed
//!   duration, holding vertical velocity at zero while airborne.
//! - `PogoDescending`: sweeps the body straight down and probes for
//!   enemies, soft targets and cages (in that priority order). A hit
//!   bounces the character and restores the air dash; touching anything
//!   else ends the pogo.
//!
//! The ability reports what it struck as a [`PogoHit`]. Damage, knockback
//! and cage removal are applied by the ECS systems, which own the targets.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::backend::{PhysicsQuery, ShapeFilter};
use crate::collision::LayerMask;
use crate::config::{AbilityConfig, PogoLayout};
use crate::feedback::{AnimationTrigger, ControllerEvents, FeedbackCue, TutorialEvent};
use crate::intent::MovementIntent;
use crate::motion::{yaw_direction, MotionState};

/// Minimum distance of the "did we touch something" probe below the body.
const SURFACE_PROBE_MIN: f32 = 0.2;
/// Extra reach of the surface probe beyond this tick's travel.
const SURFACE_PROBE_MARGIN: f32 = 0.1;
/// Squared move input below which the dash uses the facing direction.
const DASH_INPUT_THRESHOLD: f32 = 0.01;

/// Phase of the ability state machine.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbilityPhase {
    #[default]
    Idle,
    DashingForward,
    PogoDescending,
}

/// What a pogo struck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrikeKind {
    Enemy,
    SoftTarget,
    /// `hits` counts pogos on this cage so far; `broken` once it reaches the threshold.
    Cage { hits: u32, broken: bool },
}

/// A pogo strike resolved this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PogoHit {
    pub target: Entity,
    pub kind: StrikeKind,
    /// Contact point (or the probe position for overlap hits).
    pub point: Vec3,
}

/// A pogo strike to be resolved against its target.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct PogoStrike {
    pub attacker: Entity,
    pub attacker_position: Vec3,
    pub hit: PogoHit,
}

/// Runtime state of the ability.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct AbilityState {
    pub phase: AbilityPhase,
    /// Unit direction of the current dash or pogo.
    pub direction: Vec3,
    pub speed: f32,
    /// Remaining dash time.
    pub remaining: f32,
    pub dash_cooldown_remaining: f32,
    pub pogo_cooldown_remaining: f32,
    pub air_dash_available: bool,
    pub air_time: f32,
    /// Pogo input is accepted only after touching the ground once.
    pub armed: bool,
    was_grounded: bool,
    keyboard_pogo_held_last: bool,
    /// Set by `disable`, sent as a rumble stop on the next tick.
    rumble_stop_pending: bool,
    #[reflect(ignore)]
    cage_hits: HashMap<Entity, u32>,
}

impl Default for AbilityState {
    fn default() -> Self {
        Self {
            phase: AbilityPhase::Idle,
            direction: Vec3::ZERO,
            speed: 0.0,
            remaining: 0.0,
            dash_cooldown_remaining: 0.0,
            pogo_cooldown_remaining: 0.0,
            air_dash_available: true,
            air_time: 0.0,
            armed: false,
            was_grounded: false,
            keyboard_pogo_held_last: false,
            rumble_stop_pending: false,
            cage_hits: HashMap::new(),
        }
    }
}

impl AbilityState {
    /// Pogos recorded on `cage` so far.
    pub fn cage_hits(&self, cage: Entity) -> u32 {
        self.cage_hits.get(&cage).copied().unwrap_or(0)
    }
}

/// Dash/pogo ability component.
#[derive(Component, Reflect, Debug, Clone, PartialEq)]
#[reflect(Component)]
pub struct DashPogoAbility {
    pub config: AbilityConfig,
    pub state: AbilityState,
    pub enabled: bool,
    /// Entity ignored by the ability's queries.
    pub body: Option<Entity>,
}

impl Default for DashPogoAbility {
    fn default() -> Self {
        Self::new(AbilityConfig::default())
    }
}

impl DashPogoAbility {
    pub fn new(config: AbilityConfig) -> Self {
        Self {
            config,
            state: AbilityState::default(),
            enabled: true,
            body: None,
        }
    }

    /// Builder: exclude `entity` from the ability's queries.
    pub fn with_body(mut self, entity: Entity) -> Self {
        self.body = Some(entity);
        self
    }

    pub fn phase(&self) -> AbilityPhase {
        self.state.phase
    }

    pub fn is_busy(&self) -> bool {
        self.state.phase != AbilityPhase::Idle
    }

    /// Reset to a fresh state and start accepting input.
    pub fn enable(&mut self, motion: &mut dyn MotionState) {
        self.state = AbilityState::default();
        self.enabled = true;
        motion.set_gravity_locked(false);
    }

    /// Stop any dash or pogo and ignore input until re-enabled.
    ///
    /// Gamepad rumble is silenced on the next tick.
    pub fn disable(&mut self, motion: &mut dyn MotionState) {
        self.stop(motion);
        self.enabled = false;
        self.state.rumble_stop_pending = true;
    }

    /// Flip between the two gamepad pogo layouts.
    pub fn toggle_layout(&mut self) {
        self.config.layout = match self.config.layout {
            PogoLayout::AttackOnJump => PogoLayout::AttackOnX,
            PogoLayout::AttackOnX => PogoLayout::AttackOnJump,
        };
        debug!("pogo layout {:?}", self.config.layout);
    }

    /// Advance one tick, between the grounded check and movement.
    pub fn tick(
        &mut self,
        intent: &mut MovementIntent,
        camera_yaw: f32,
        motion: &mut dyn MotionState,
        query: &dyn PhysicsQuery,
        dt: f32,
        events: &mut ControllerEvents,
    ) -> Option<PogoHit> {
        if !self.enabled {
            intent.dash = false;
            if std::mem::take(&mut self.state.rumble_stop_pending) {
                events.cue(FeedbackCue::RumbleStop);
            }
            return None;
        }

        if self.state.dash_cooldown_remaining > 0.0 {
            self.state.dash_cooldown_remaining -= dt;
        }
        if self.state.pogo_cooldown_remaining > 0.0 {
            self.state.pogo_cooldown_remaining -= dt;
        }

        if intent.gamepad_pogo.is_some_and(|pad| pad.layout_toggle_just_pressed) {
            self.toggle_layout();
        }

        let grounded = motion.grounded();
        if grounded && !self.state.was_grounded {
            self.state.air_dash_available = true;
            self.state.pogo_cooldown_remaining = 0.0;
        }
        if grounded {
            self.state.air_time = 0.0;
            self.state.armed = true;
        } else {
            self.state.air_time += dt;
        }
        self.state.was_grounded = grounded;

        // Presses while busy or cooling down are swallowed, not buffered.
        if self.is_busy() || self.state.dash_cooldown_remaining > 0.0 {
            intent.dash = false;
        }

        if !self.is_busy() && self.state.dash_cooldown_remaining <= 0.0 && intent.take_dash() {
            if !motion.movement_locked_by_special_surface() && (grounded || self.state.air_dash_available) {
                self.state.direction = self.dash_direction(intent, camera_yaw, motion);
                self.start_dash(grounded, motion, events);
                if !grounded {
                    self.state.air_dash_available = false;
                }
            }
        }

        if self.pogo_pressed(intent, grounded) {
            if self.state.phase == AbilityPhase::DashingForward {
                self.stop(motion);
            }
            self.start_pogo(motion);
        }

        match self.state.phase {
            AbilityPhase::Idle => None,
            AbilityPhase::DashingForward => {
                let mut step = self.state.direction * self.state.speed * dt;
                if !grounded && self.config.air_dash_lift != 0.0 {
                    step += Vec3::Y * self.config.air_dash_lift * dt;
                }
                motion.move_by(step, query);

                self.state.remaining -= dt;
                if self.state.remaining <= 0.0 {
                    self.stop(motion);
                }
                None
            }
            AbilityPhase::PogoDescending => {
                let step = self.state.direction * self.state.speed * dt;
                motion.move_by(step, query);
                motion.set_vertical_velocity(0.0);
                self.resolve_pogo(step.length(), motion, query, events)
            }
        }
    }

    fn dash_direction(&self, intent: &MovementIntent, camera_yaw: f32, motion: &dyn MotionState) -> Vec3 {
        let axis = intent.move_axis;
        if axis.length_squared() > DASH_INPUT_THRESHOLD {
            let forward = yaw_direction(camera_yaw);
            let right = yaw_direction(camera_yaw + 90.0);
            if let Some(direction) = (forward * axis.y + right * axis.x).try_normalize() {
                return direction;
            }
        }
        let facing = motion.facing();
        Vec3::new(facing.x, 0.0, facing.z).try_normalize().unwrap_or(Vec3::NEG_Z)
    }

    /// Pogo input for this tick, honoring arming, cooldown and layout.
    fn pogo_pressed(&mut self, intent: &MovementIntent, grounded: bool) -> bool {
        // The key state is tracked every tick so a release during cooldown is seen.
        let held = intent.pogo_held;
        let rising = held && !self.state.keyboard_pogo_held_last;
        self.state.keyboard_pogo_held_last = held;

        if !self.state.armed || grounded || self.state.pogo_cooldown_remaining > 0.0 {
            return false;
        }

        if let Some(pad) = intent.gamepad_pogo {
            return match self.config.layout {
                PogoLayout::AttackOnJump => {
                    self.state.air_time >= self.config.min_air_time_before_pogo && pad.south_just_pressed
                }
                PogoLayout::AttackOnX => pad.west_just_pressed,
            };
        }
        rising
    }

    fn start_dash(&mut self, grounded: bool, motion: &mut dyn MotionState, events: &mut ControllerEvents) {
        self.state.phase = AbilityPhase::DashingForward;
        self.state.remaining = self.config.dash_duration;
        self.state.dash_cooldown_remaining = self.config.dash_cooldown;
        self.state.speed = self.config.dash_speed;

        if !grounded {
            motion.set_vertical_velocity(0.0);
            motion.set_gravity_locked(true);
        }
        events.trigger(AnimationTrigger::Dash);
        debug!("dash started (grounded {grounded})");
    }

    fn start_pogo(&mut self, motion: &mut dyn MotionState) {
        self.state.phase = AbilityPhase::PogoDescending;
        self.state.direction = Vec3::NEG_Y;
        self.state.speed = if motion.movement_locked_by_special_surface() {
            self.config.cage_pogo_down_speed
        } else {
            self.config.pogo_down_speed
        };
        self.state.pogo_cooldown_remaining = self.state.pogo_cooldown_remaining.max(self.config.pogo_cooldown);
        motion.set_vertical_velocity(0.0);
        motion.set_gravity_locked(false);
        debug!("pogo started");
    }

    fn stop(&mut self, motion: &mut dyn MotionState) {
        self.state.phase = AbilityPhase::Idle;
        self.state.remaining = 0.0;
        motion.set_gravity_locked(false);
    }

    /// Probe radius and look-ahead, with the special-surface overrides.
    fn pogo_probe(&self, motion: &dyn MotionState) -> (f32, f32) {
        if motion.movement_locked_by_special_surface() {
            (self.config.cage_pogo_check_radius, self.config.cage_pogo_check_ahead)
        } else {
            (self.config.pogo_check_radius, self.config.pogo_check_ahead)
        }
    }

    /// Three-stage hit query: this tick's travel, the look-ahead cast, then
    /// an overlap at the end of the look-ahead.
    #[allow(clippy::too_many_arguments)]
    fn find_target(
        &self,
        query: &dyn PhysicsQuery,
        origin: Vec3,
        step_distance: f32,
        radius: f32,
        ahead: f32,
        mask: LayerMask,
        include_triggers: bool,
    ) -> Option<(Entity, Vec3)> {
        let filter = ShapeFilter::new(mask)
            .with_triggers(include_triggers)
            .excluding(self.body);

        let travelled_from = origin + Vec3::Y * step_distance;
        if let Some(hit) = query.sweep_segment(travelled_from, origin, radius, &filter) {
            if let Some(entity) = hit.entity {
                return Some((entity, hit.point));
            }
        }

        let ahead = ahead.max(step_distance);
        if let Some(hit) = query.sphere_cast(origin, radius, Vec3::NEG_Y, ahead, &filter) {
            if let Some(entity) = hit.entity {
                return Some((entity, hit.point));
            }
        }

        let end = origin + Vec3::NEG_Y * ahead;
        query.overlap_sphere(end, radius, &filter).map(|entity| (entity, end))
    }

    fn touches_surface(&self, query: &dyn PhysicsQuery, origin: Vec3, step_distance: f32, radius: f32) -> bool {
        let reach = SURFACE_PROBE_MIN.max(step_distance + SURFACE_PROBE_MARGIN);
        let filter = ShapeFilter::new(self.config.landing_layers).excluding(self.body);
        query.sphere_cast(origin, radius, Vec3::NEG_Y, reach, &filter).is_some()
    }

    fn resolve_pogo(
        &mut self,
        step_distance: f32,
        motion: &mut dyn MotionState,
        query: &dyn PhysicsQuery,
        events: &mut ControllerEvents,
    ) -> Option<PogoHit> {
        let origin = motion.center();
        let (radius, ahead) = self.pogo_probe(motion);
        let config = self.config;

        if let Some((target, point)) =
            self.find_target(query, origin, step_distance, radius, ahead, config.enemy_layers, true)
        {
            self.bounce_off(config.enemy_bounce_height, target, point, motion, events);
            return Some(PogoHit {
                target,
                kind: StrikeKind::Enemy,
                point,
            });
        }

        if let Some((target, point)) =
            self.find_target(query, origin, step_distance, radius, ahead, config.soft_target_layers, false)
        {
            self.bounce_off(config.soft_target_bounce_height, target, point, motion, events);
            return Some(PogoHit {
                target,
                kind: StrikeKind::SoftTarget,
                point,
            });
        }

        if let Some((cage, point)) =
            self.find_target(query, origin, step_distance, radius, ahead, config.cage_layers, true)
        {
            let hits = {
                let count = self.state.cage_hits.entry(cage).or_insert(0);
                *count += 1;
                *count
            };
            let broken = hits >= config.cage_pogos_to_break;
            events.cue(FeedbackCue::CageHit { cage, hits });
            self.bounce_off(config.cage_bounce_height, cage, point, motion, events);

            if broken {
                self.state.cage_hits.remove(&cage);
                motion.release_special_surface_lock();
                events.cue(FeedbackCue::CageBreak { cage });
                events.tutorial(TutorialEvent::ObjectBroken(cage));
                debug!("cage {cage:?} broken after {hits} pogos");
            }
            return Some(PogoHit {
                target: cage,
                kind: StrikeKind::Cage { hits, broken },
                point,
            });
        }

        if motion.grounded() || motion.collided_below() || self.touches_surface(query, origin, step_distance, radius) {
            events.trigger(AnimationTrigger::PogoLand);
            self.stop(motion);
            trace!("pogo landed");
        }
        None
    }

    fn bounce_off(
        &mut self,
        height: f32,
        target: Entity,
        point: Vec3,
        motion: &mut dyn MotionState,
        events: &mut ControllerEvents,
    ) {
        self.stop(motion);
        motion.bounce(height);
        self.state.air_dash_available = true;

        events.cue(FeedbackCue::PogoHit { target, position: point });
        events.trigger(AnimationTrigger::PogoHit);
        events.tutorial(TutorialEvent::PogoPerformed);
        if self.config.enable_screen_shake {
            events.cue(FeedbackCue::ScreenShake {
                duration: self.config.shake_duration,
                amplitude: self.config.shake_amplitude,
            });
        }
        if self.config.enable_rumble {
            events.cue(FeedbackCue::Rumble {
                low: self.config.pogo_rumble_low,
                high: self.config.pogo_rumble_high,
                duration: self.config.pogo_rumble_duration,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::GamepadPogo;
    use crate::motion::MotionIntegrator;
    use crate::world::CollisionWorld;

    const DT: f32 = 1.0 / 60.0;

    struct Rig {
        world: CollisionWorld,
        ecs: World,
        motion: MotionIntegrator,
        ability: DashPogoAbility,
        intent: MovementIntent,
        events: ControllerEvents,
    }

    impl Rig {
        fn new() -> Self {
            let mut world = CollisionWorld::new();
            world.add_cuboid(
                Vec3::new(0.0, -0.5, 0.0),
                Vec3::new(50.0, 0.5, 50.0),
                LayerMask::GROUND,
                None,
            );
            Self {
                world,
                ecs: World::new(),
                motion: MotionIntegrator::default(),
                ability: DashPogoAbility::default(),
                intent: MovementIntent::new(),
                events: ControllerEvents::default(),
            }
        }

        /// One full tick in controller order.
        fn tick(&mut self) -> Option<PogoHit> {
            self.motion.jump_and_gravity(&mut self.intent, DT, &mut self.events);
            self.motion.grounded_check(&self.world, &mut self.events);
            let hit = self.ability.tick(
                &mut self.intent,
                0.0,
                &mut self.motion,
                &self.world,
                DT,
                &mut self.events,
            );
            self.motion
                .apply_movement(&self.intent, 0.0, &self.world, DT, &mut self.events);
            hit
        }

        fn ticks(&mut self, count: usize) -> Vec<PogoHit> {
            (0..count).filter_map(|_| self.tick()).collect()
        }

        /// Put the body back on the floor at rest.
        fn land(&mut self) {
            self.motion.teleport(Vec3::ZERO);
            self.motion.state.vertical_velocity = 0.0;
            self.ticks(3);
            assert!(self.motion.grounded());
        }

        /// Stand on the floor, then appear airborne at `height`.
        fn airborne_at(&mut self, height: f32) {
            self.land();
            self.motion.teleport(Vec3::Y * height);
            self.ticks(2);
            assert!(!self.motion.grounded());
        }

        fn press_pogo(&mut self) {
            self.intent.set_pogo_held(true);
        }
    }

    // ==================== Dash Tests ====================

    #[test]
    fn grounded_dash_moves_along_camera_relative_input() {
        let mut rig = Rig::new();
        rig.ticks(2);
        rig.intent.set_move(Vec2::new(1.0, 0.0));
        rig.intent.press_dash();

        rig.tick();
        assert_eq!(rig.ability.phase(), AbilityPhase::DashingForward);
        assert!((rig.ability.state.direction - Vec3::X).length() < 1e-5);
        assert!(rig.events.has_trigger(AnimationTrigger::Dash));

        rig.ticks(20);
        assert_eq!(rig.ability.phase(), AbilityPhase::Idle);
        // 16 m/s for 0.18 s plus a little walking.
        assert!(rig.motion.position().x > 2.5);
    }

    #[test]
    fn dash_without_input_uses_facing() {
        let mut rig = Rig::new();
        rig.ticks(2);
        rig.intent.press_dash();
        rig.tick();
        assert!((rig.ability.state.direction - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn dash_press_during_cooldown_is_swallowed() {
        let mut rig = Rig::new();
        rig.ticks(2);
        rig.intent.press_dash();
        rig.tick();
        rig.ticks(15);
        assert_eq!(rig.ability.phase(), AbilityPhase::Idle);
        assert!(rig.ability.state.dash_cooldown_remaining > 0.0);

        rig.intent.press_dash();
        rig.tick();
        assert!(!rig.intent.dash);
        assert_eq!(rig.ability.phase(), AbilityPhase::Idle);

        // The swallowed press does not fire once the cooldown ends.
        rig.ticks(40);
        assert_eq!(rig.ability.phase(), AbilityPhase::Idle);
    }

    #[test]
    fn air_dash_locks_gravity_and_is_spent() {
        let mut rig = Rig::new();
        rig.airborne_at(50.0);
        rig.intent.press_dash();
        rig.tick();

        assert_eq!(rig.ability.phase(), AbilityPhase::DashingForward);
        assert!(rig.motion.state.gravity_locked);
        assert_eq!(rig.motion.vertical_velocity(), 0.0);
        assert!(!rig.ability.state.air_dash_available);

        // Past the dash and its cooldown, still airborne.
        rig.ticks(45);
        assert!(!rig.motion.grounded());
        assert!(!rig.motion.state.gravity_locked);
        rig.intent.press_dash();
        rig.tick();
        assert_ne!(rig.ability.phase(), AbilityPhase::DashingForward);
    }

    #[test]
    fn no_dash_while_cage_locked() {
        let mut rig = Rig::new();
        rig.world.clear();
        rig.world.add_cuboid(Vec3::new(0.0, -0.5, 0.0), Vec3::splat(0.5), LayerMask::CAGE, None);
        rig.ticks(3);
        assert!(rig.motion.movement_locked_by_special_surface());

        rig.intent.press_dash();
        rig.tick();
        assert_eq!(rig.ability.phase(), AbilityPhase::Idle);
        assert!(!rig.intent.dash);
    }

    // ==================== Pogo Input Tests ====================

    #[test]
    fn pogo_requires_arming_by_ground_contact() {
        let mut rig = Rig::new();
        rig.motion.teleport(Vec3::Y * 5.0);
        rig.ticks(2);
        rig.press_pogo();
        rig.tick();
        assert_eq!(rig.ability.phase(), AbilityPhase::Idle);
    }

    #[test]
    fn keyboard_pogo_fires_on_rising_edge_only() {
        let mut rig = Rig::new();
        rig.airborne_at(20.0);
        rig.press_pogo();
        rig.tick();
        assert_eq!(rig.ability.phase(), AbilityPhase::PogoDescending);
        assert!(rig.ability.state.pogo_cooldown_remaining > 0.0);
    }

    #[test]
    fn gamepad_layouts_pick_their_button() {
        let mut rig = Rig::new();
        rig.airborne_at(20.0);
        rig.intent.set_gamepad_pogo(Some(GamepadPogo {
            west_just_pressed: true,
            ..default()
        }));
        rig.tick();
        assert_eq!(rig.ability.phase(), AbilityPhase::Idle);

        rig.ability.toggle_layout();
        rig.tick();
        assert_eq!(rig.ability.phase(), AbilityPhase::PogoDescending);
    }

    #[test]
    fn south_layout_waits_for_min_air_time() {
        let mut rig = Rig::new();
        rig.ability.config.min_air_time_before_pogo = 10.0;
        rig.airborne_at(50.0);
        rig.intent.set_gamepad_pogo(Some(GamepadPogo {
            south_just_pressed: true,
            ..default()
        }));
        rig.tick();
        assert_eq!(rig.ability.phase(), AbilityPhase::Idle);

        rig.ability.config.min_air_time_before_pogo = 0.0;
        rig.tick();
        assert_eq!(rig.ability.phase(), AbilityPhase::PogoDescending);
    }

    // ==================== Pogo Hit Tests ====================

    #[test]
    fn pogo_on_enemy_bounces_and_restores_air_dash() {
        let mut rig = Rig::new();
        let enemy = rig.ecs.spawn_empty().id();
        rig.world.add_sphere(Vec3::new(0.0, 3.2, 0.0), 0.5, LayerMask::ENEMY, Some(enemy));
        rig.airborne_at(4.0);
        rig.ability.state.air_dash_available = false;

        rig.press_pogo();
        let hits = rig.ticks(1);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, enemy);
        assert_eq!(hits[0].kind, StrikeKind::Enemy);
        assert_eq!(rig.ability.phase(), AbilityPhase::Idle);
        assert!(rig.ability.state.air_dash_available);
        assert!(rig.events.has_tutorial(TutorialEvent::PogoPerformed));
        let expected = (2.0_f32 * 2.2 * 15.0).sqrt();
        // One movement tick of gravity has not run yet: the bounce sets it exactly.
        assert!((rig.motion.vertical_velocity() - expected).abs() < 1e-4);
    }

    #[test]
    fn enemy_has_priority_over_soft_target_and_cage() {
        let mut rig = Rig::new();
        let enemy = rig.ecs.spawn_empty().id();
        let mushroom = rig.ecs.spawn_empty().id();
        let cage = rig.ecs.spawn_empty().id();
        rig.world
            .add_sphere(Vec3::new(0.0, 3.2, 0.0), 0.5, LayerMask::SOFT_TARGET, Some(mushroom))
            .add_sphere(Vec3::new(0.0, 3.2, 0.0), 0.5, LayerMask::CAGE, Some(cage))
            .add_sphere(Vec3::new(0.0, 3.2, 0.0), 0.5, LayerMask::ENEMY, Some(enemy));
        rig.airborne_at(4.0);

        rig.press_pogo();
        let hits = rig.ticks(1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, enemy);
    }

    #[test]
    fn soft_target_uses_its_bounce_height() {
        let mut rig = Rig::new();
        let mushroom = rig.ecs.spawn_empty().id();
        rig.world
            .add_sphere(Vec3::new(0.0, 3.2, 0.0), 0.5, LayerMask::SOFT_TARGET, Some(mushroom));
        rig.airborne_at(4.0);

        rig.press_pogo();
        let hits = rig.ticks(1);
        assert_eq!(hits[0].kind, StrikeKind::SoftTarget);
        let expected = (2.0_f32 * rig.ability.config.soft_target_bounce_height * 15.0).sqrt();
        assert!((rig.motion.vertical_velocity() - expected).abs() < 1e-4);
    }

    #[test]
    fn cage_breaks_on_third_pogo() {
        let mut rig = Rig::new();
        let cage = rig.ecs.spawn_empty().id();
        rig.world.add_sphere(Vec3::new(0.0, 3.2, 0.0), 0.5, LayerMask::CAGE, Some(cage));

        for expected_hits in 1..=3 {
            rig.airborne_at(4.0);
            rig.intent.set_pogo_held(false);
            rig.tick();
            rig.press_pogo();
            let hits = rig.ticks(1);
            assert_eq!(hits.len(), 1, "pogo {expected_hits} should strike the cage");
            match hits[0].kind {
                StrikeKind::Cage { hits, broken } => {
                    assert_eq!(hits, expected_hits);
                    assert_eq!(broken, expected_hits == 3);
                }
                other => panic!("unexpected strike {other:?}"),
            }
            rig.intent.set_pogo_held(false);
        }

        assert!(rig.events.has_tutorial(TutorialEvent::ObjectBroken(cage)));
        assert_eq!(rig.ability.state.cage_hits(cage), 0);
    }

    #[test]
    fn pogo_ends_on_landing() {
        let mut rig = Rig::new();
        rig.airborne_at(3.0);
        rig.press_pogo();
        rig.tick();
        assert_eq!(rig.ability.phase(), AbilityPhase::PogoDescending);

        rig.ticks(30);
        assert_eq!(rig.ability.phase(), AbilityPhase::Idle);
        assert!(rig.events.has_trigger(AnimationTrigger::PogoLand));
        assert!(rig.motion.position().y >= 0.0);
        assert!(rig.motion.position().y < 0.1);
    }

    #[test]
    fn pogo_ignores_overlaps_without_an_entity() {
        let mut rig = Rig::new();
        rig.world.add_sphere(Vec3::new(0.0, 3.2, 0.0), 0.5, LayerMask::ENEMY, None);
        rig.airborne_at(4.0);

        rig.press_pogo();
        let hits = rig.ticks(1);
        assert!(hits.is_empty());
        assert_eq!(rig.ability.phase(), AbilityPhase::PogoDescending);
    }

    #[test]
    fn pogo_cancels_air_dash() {
        let mut rig = Rig::new();
        rig.airborne_at(20.0);
        rig.intent.press_dash();
        rig.tick();
        assert_eq!(rig.ability.phase(), AbilityPhase::DashingForward);

        rig.press_pogo();
        rig.tick();
        assert_eq!(rig.ability.phase(), AbilityPhase::PogoDescending);
        assert!(!rig.motion.state.gravity_locked);
    }

    // ==================== Cooldown / Landing Tests ====================

    #[test]
    fn pogo_cooldown_refuses_a_second_pogo_in_the_air() {
        let mut rig = Rig::new();
        let enemy = rig.ecs.spawn_empty().id();
        rig.world.add_sphere(Vec3::new(0.0, 3.2, 0.0), 0.5, LayerMask::ENEMY, Some(enemy));
        rig.airborne_at(4.0);

        rig.press_pogo();
        assert_eq!(rig.ticks(1).len(), 1);
        assert_eq!(rig.ability.phase(), AbilityPhase::Idle);

        rig.intent.set_pogo_held(false);
        rig.tick();
        rig.press_pogo();
        let hits = rig.ticks(1);

        assert!(hits.is_empty());
        assert!(!rig.motion.grounded());
        assert_eq!(rig.ability.phase(), AbilityPhase::Idle);
        assert!(rig.ability.state.pogo_cooldown_remaining < rig.ability.config.pogo_cooldown);
    }

    #[test]
    fn landing_resets_pogo_cooldown() {
        let mut rig = Rig::new();
        rig.airborne_at(1.0);
        rig.press_pogo();
        rig.tick();
        assert_eq!(rig.ability.phase(), AbilityPhase::PogoDescending);
        rig.intent.set_pogo_held(false);

        // Lands well inside the cooldown.
        rig.ticks(8);
        assert!(rig.motion.grounded());
        assert_eq!(rig.ability.phase(), AbilityPhase::Idle);
        assert_eq!(rig.ability.state.pogo_cooldown_remaining, 0.0);

        rig.motion.teleport(Vec3::Y * 20.0);
        rig.ticks(2);
        assert!(!rig.motion.grounded());
        rig.press_pogo();
        rig.tick();
        assert_eq!(rig.ability.phase(), AbilityPhase::PogoDescending);
    }

    #[test]
    fn release_during_cooldown_allows_the_next_press() {
        let mut rig = Rig::new();
        rig.airborne_at(40.0);
        rig.press_pogo();
        rig.tick();
        assert_eq!(rig.ability.phase(), AbilityPhase::PogoDescending);

        // Released while the cooldown still blocks pogo input.
        rig.intent.set_pogo_held(false);
        rig.ticks(2);
        assert!(rig.ability.state.pogo_cooldown_remaining > 0.0);

        rig.ability.state.pogo_cooldown_remaining = 0.0;
        rig.press_pogo();
        rig.tick();
        assert!(!rig.motion.grounded());
        assert_eq!(rig.ability.state.pogo_cooldown_remaining, rig.ability.config.pogo_cooldown);
    }

    #[test]
    fn landing_restores_spent_air_dash() {
        let mut rig = Rig::new();
        rig.airborne_at(1.0);
        rig.intent.press_dash();
        rig.tick();
        assert_eq!(rig.ability.phase(), AbilityPhase::DashingForward);
        assert!(!rig.ability.state.air_dash_available);

        rig.ticks(60);
        assert!(rig.motion.grounded());
        assert!(rig.ability.state.air_dash_available);
    }

    // ==================== Rumble Tests ====================

    #[test]
    fn pogo_hit_requests_rumble() {
        let mut rig = Rig::new();
        let enemy = rig.ecs.spawn_empty().id();
        rig.world.add_sphere(Vec3::new(0.0, 3.2, 0.0), 0.5, LayerMask::ENEMY, Some(enemy));
        rig.airborne_at(4.0);

        rig.press_pogo();
        rig.tick();
        assert!(rig.events.cues.contains(&FeedbackCue::Rumble {
            low: 0.4,
            high: 0.8,
            duration: 0.12,
        }));
    }

    #[test]
    fn rumble_can_be_turned_off() {
        let mut rig = Rig::new();
        rig.ability.config = rig.ability.config.without_rumble();
        let mushroom = rig.ecs.spawn_empty().id();
        rig.world
            .add_sphere(Vec3::new(0.0, 3.2, 0.0), 0.5, LayerMask::SOFT_TARGET, Some(mushroom));
        rig.airborne_at(4.0);

        rig.press_pogo();
        assert_eq!(rig.ticks(1).len(), 1);
        assert!(!rig
            .events
            .cues
            .iter()
            .any(|cue| matches!(cue, FeedbackCue::Rumble { .. })));
    }

    #[test]
    fn disable_stops_rumble_once() {
        let mut rig = Rig::new();
        rig.ticks(2);
        rig.ability.disable(&mut rig.motion);
        rig.ticks(3);

        let stops = rig
            .events
            .cues
            .iter()
            .filter(|cue| matches!(cue, FeedbackCue::RumbleStop))
            .count();
        assert_eq!(stops, 1);
    }

    // ==================== Enable / Disable Tests ====================

    #[test]
    fn disable_releases_gravity_lock_and_ignores_input() {
        let mut rig = Rig::new();
        rig.airborne_at(20.0);
        rig.intent.press_dash();
        rig.tick();
        assert!(rig.motion.state.gravity_locked);

        rig.ability.disable(&mut rig.motion);
        assert!(!rig.motion.state.gravity_locked);
        assert_eq!(rig.ability.phase(), AbilityPhase::Idle);

        rig.press_pogo();
        rig.tick();
        assert_eq!(rig.ability.phase(), AbilityPhase::Idle);

        rig.ability.enable(&mut rig.motion);
        assert!(rig.ability.enabled);
        assert!(!rig.ability.state.armed);
    }
}
