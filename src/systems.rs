//! Core controller systems.
//!
//! Fixed-step systems drive the motion integrator and the ability and
//! resolve what the ability struck. Frame systems drive the look camera, the
//! camera zones and the cosmetic tweens. Systems that query physics are
//! generic over the physics backend.

use bevy::ecs::entity_disabling::Disabled;
use bevy::ecs::system::StaticSystemParam;
use bevy::input::gamepad::GamepadRumbleRequest;
use bevy::prelude::*;

use crate::ability::{DashPogoAbility, PogoStrike, StrikeKind};
use crate::backend::CharacterPhysicsBackend;
use crate::camera::LookCameraController;
use crate::config::{KnockbackConfig, LookSettings};
use crate::damage::HitReceived;
use crate::feedback::{
    AnimationParams, AnimationTriggerMessage, CageShake, ControllerEvents, FeedbackCue, FeedbackMessage,
    TutorialMessage,
};
use crate::intent::MovementIntent;
use crate::knockback::{KnockbackSolver, KnockbackTween};
use crate::motion::{yaw_rotation, MotionIntegrator, MotionState};
use crate::navigation::{NavAgent, NavSurface, NavigationBounds};
use crate::state::{Airborne, Grounded, MarkerSet, OnSpecialSurface};
use crate::tween::ShakeTween;
use crate::world::{ColliderShape, WorldCollider};
use crate::zones::{CameraRig, CameraZone, CameraZoneRegistry, ZoneOccupancy};

/// Body radius assumed for knockback targets without a collider.
const DEFAULT_TARGET_RADIUS: f32 = 0.5;

/// Seed new characters from their spawn transform.
pub fn init_character_bodies(
    mut commands: Commands,
    mut characters: Query<(Entity, &Transform, &mut MotionIntegrator, Option<&mut DashPogoAbility>), Added<MotionIntegrator>>,
) {
    for (entity, transform, mut motion, ability) in &mut characters {
        commands
            .entity(entity)
            .insert_if_new((AnimationParams::default(), ZoneOccupancy::default()));
        motion.teleport(transform.translation);
        motion.body.get_or_insert(entity);
        if let Some(mut ability) = ability {
            ability.body.get_or_insert(entity);
        }
        debug!("character {entity:?} spawned at {:?}", transform.translation);
    }
}

/// Run one fixed step of every character: gravity and jump, grounded check,
/// deferred camera profile, ability, movement.
///
/// Writes the result back to the `Transform` and `AnimationParams` and
/// forwards everything that happened as messages.
#[allow(clippy::too_many_arguments)]
pub fn step_characters<B: CharacterPhysicsBackend>(
    time: Res<Time<Fixed>>,
    physics: StaticSystemParam<B::Param>,
    mut characters: Query<(
        Entity,
        &mut MotionIntegrator,
        &mut MovementIntent,
        &mut Transform,
        Option<&mut LookCameraController>,
        Option<&mut DashPogoAbility>,
        Option<&mut AnimationParams>,
    )>,
    mut feedback: MessageWriter<FeedbackMessage>,
    mut tutorial: MessageWriter<TutorialMessage>,
    mut triggers: MessageWriter<AnimationTriggerMessage>,
    mut strikes: MessageWriter<PogoStrike>,
    mut warned: Local<bool>,
) {
    let dt = time.timestep().as_secs_f32();
    if dt <= 0.0 {
        return;
    }

    let stepped = B::with_query(&*physics, |query| {
        let mut events = ControllerEvents::default();
        for (entity, mut motion, mut intent, mut transform, mut look, mut ability, animation) in &mut characters {
            events.clear();
            let camera_yaw = look.as_ref().map_or(0.0, |look| look.yaw());

            motion.jump_and_gravity(&mut intent, dt, &mut events);
            motion.grounded_check(query, &mut events);

            if let Some(look) = look.as_mut() {
                look.apply_pending_profile(motion.grounded());
            }

            let hit = match ability.as_mut() {
                Some(ability) => ability.tick(&mut intent, camera_yaw, &mut *motion, query, dt, &mut events),
                None => None,
            };

            motion.apply_movement(&intent, camera_yaw, query, dt, &mut events);
            intent.consume_gamepad_edges();

            transform.translation = motion.state.position;
            transform.rotation = yaw_rotation(motion.state.facing_yaw);
            if let Some(mut animation) = animation {
                *animation = motion.animation_params(&intent);
            }

            feedback.write_batch(events.cues.drain(..).map(|cue| FeedbackMessage { character: entity, cue }));
            tutorial.write_batch(
                events
                    .tutorial
                    .drain(..)
                    .map(|event| TutorialMessage { character: entity, event }),
            );
            triggers.write_batch(
                events
                    .triggers
                    .drain(..)
                    .map(|trigger| AnimationTriggerMessage { character: entity, trigger }),
            );

            if let Some(hit) = hit {
                strikes.write(PogoStrike {
                    attacker: entity,
                    attacker_position: motion.position(),
                    hit,
                });
            }
        }
    });

    if stepped.is_none() && !*warned {
        warn!("physics backend not ready, characters are not stepped");
        *warned = true;
    }
}

/// Resolve pogo strikes: damage, knockback and cage shake/removal.
#[allow(clippy::too_many_arguments)]
pub fn resolve_pogo_strikes<B: CharacterPhysicsBackend>(
    mut commands: Commands,
    physics: StaticSystemParam<B::Param>,
    mut strikes: MessageReader<PogoStrike>,
    mut hits: MessageWriter<HitReceived>,
    attackers: Query<(&DashPogoAbility, Option<&KnockbackConfig>)>,
    mut targets: Query<
        (
            &mut Transform,
            Option<&WorldCollider>,
            Option<&mut NavAgent>,
            Option<&mut KnockbackTween>,
            Option<&CageShake>,
        ),
        Without<MotionIntegrator>,
    >,
    surfaces: Query<&NavigationBounds>,
) {
    for strike in strikes.read() {
        let Ok((ability, knockback)) = attackers.get(strike.attacker) else {
            continue;
        };
        let config = ability.config;
        let target = strike.hit.target;

        match strike.hit.kind {
            StrikeKind::Enemy => {
                hits.write(HitReceived {
                    target,
                    attacker: strike.attacker,
                    damage: config.pogo_damage,
                });

                let Ok((transform, collider, mut agent, existing, _)) = targets.get_mut(target) else {
                    continue;
                };
                let solver = KnockbackSolver::new(knockback.copied().unwrap_or_default());
                let start = transform.translation;
                let back = KnockbackSolver::back_direction(transform.forward().into(), start, strike.attacker_position);
                let radius = match collider.map(|c| c.shape) {
                    Some(ColliderShape::Sphere { radius }) => KnockbackSolver::radius_from_extents(Vec3::splat(radius)),
                    Some(ColliderShape::Cuboid { half_extents }) => KnockbackSolver::radius_from_extents(half_extents),
                    None => DEFAULT_TARGET_RADIUS,
                };
                let surface = agent
                    .as_ref()
                    .and_then(|agent| agent.surface)
                    .and_then(|surface| surfaces.get(surface).ok());

                let Some(destination) = B::with_query(&*physics, |query| {
                    solver.solve(
                        start,
                        back,
                        radius,
                        surface.map(|s| s as &dyn NavSurface),
                        query,
                        Some(target),
                    )
                }) else {
                    continue;
                };

                debug!("knockback {target:?} from {start:?} to {destination:?}");
                let duration = solver.config.duration;
                match existing {
                    Some(mut tween) => tween.retarget(start, destination, duration),
                    None => {
                        let mut tween = KnockbackTween::new(start, destination, duration);
                        if let Some(agent) = agent.as_mut() {
                            tween.suspend(agent);
                        }
                        commands.entity(target).insert(tween);
                    }
                }
            }
            StrikeKind::SoftTarget => {
                hits.write(HitReceived {
                    target,
                    attacker: strike.attacker,
                    damage: config.pogo_damage,
                });
            }
            StrikeKind::Cage { broken, .. } => {
                let Ok((mut transform, _, _, _, shaking)) = targets.get_mut(target) else {
                    continue;
                };
                if broken {
                    if let Some(shaking) = shaking {
                        transform.translation = shaking.shake.rest();
                    }
                    let mut cage = commands.entity(target);
                    cage.remove::<CageShake>();
                    if config.disable_broken_cage {
                        cage.insert(Disabled);
                    } else {
                        cage.despawn();
                    }
                    continue;
                }
                let rest = shaking.map_or(transform.translation, |s| s.shake.rest());
                commands.entity(target).insert(CageShake {
                    shake: ShakeTween::new(rest, config.cage_shake_amplitude, config.cage_shake_duration),
                });
            }
        }
    }
}

/// Advance knockback tweens on gameplay time and hand steering back when done.
pub fn advance_knockback(
    mut commands: Commands,
    time: Res<Time<Fixed>>,
    mut knocked: Query<(Entity, &mut Transform, &mut KnockbackTween, Option<&mut NavAgent>)>,
) {
    let dt = time.timestep().as_secs_f32();
    for (entity, mut transform, mut tween, agent) in &mut knocked {
        transform.translation = tween.advance(dt);
        if tween.is_finished() {
            transform.translation = tween.finish();
            if let Some(mut agent) = agent {
                tween.restore(&mut agent);
            }
            commands.entity(entity).remove::<KnockbackTween>();
        }
    }
}

/// Sync state marker components with the motion state.
pub fn sync_state_markers(
    mut commands: Commands,
    q_characters: Query<(
        Entity,
        &MotionIntegrator,
        Has<Grounded>,
        Has<Airborne>,
        Option<&OnSpecialSurface>,
    )>,
) {
    for (entity, motion, has_grounded, has_airborne, special) in &q_characters {
        let markers = MarkerSet::from_state(motion.state());

        if markers.grounded && !has_grounded {
            commands.entity(entity).insert(Grounded).remove::<Airborne>();
        } else if !markers.grounded && !has_airborne {
            commands.entity(entity).insert(Airborne).remove::<Grounded>();
        }

        match (markers.special_surface, special) {
            (Some(wanted), Some(current)) if wanted == *current => {}
            (Some(wanted), _) => {
                commands.entity(entity).insert(wanted);
            }
            (None, Some(_)) => {
                commands.entity(entity).remove::<OnSpecialSurface>();
            }
            (None, None) => {}
        }
    }
}

/// Queue zone profiles and blend rig shoulders when a character enters a new zone.
pub fn detect_camera_zones(
    mut registry: ResMut<CameraZoneRegistry>,
    mut characters: Query<(
        Entity,
        &Transform,
        &MotionIntegrator,
        &mut ZoneOccupancy,
        &mut LookCameraController,
    )>,
    zones: Query<(Entity, &Transform, &CameraZone), Without<MotionIntegrator>>,
    mut rigs: Query<&mut CameraRig>,
) {
    for (character, transform, motion, mut occupancy, mut look) in &mut characters {
        let inside: Vec<Entity> = zones
            .iter()
            .filter(|(_, zone_transform, zone)| zone.contains(zone_transform.translation, transform.translation))
            .map(|(entity, _, _)| entity)
            .collect();

        for &zone_entity in inside.iter().filter(|zone| !occupancy.inside.contains(*zone)) {
            let Ok((_, _, zone)) = zones.get(zone_entity) else {
                continue;
            };
            let Some(activation) = registry.activate(zone_entity, zone) else {
                continue;
            };
            for mut rig in rigs.iter_mut().filter(|rig| rig.target == character) {
                rig.blend_shoulder(activation.from_offset, activation.to_offset, activation.blend_duration);
            }
            look.set_camera_profile(activation.profile, motion.grounded());
        }

        if occupancy.inside != inside {
            occupancy.inside = inside;
        }
    }
}

/// Advance look cameras from look input.
pub fn update_look_cameras(
    time: Res<Time>,
    settings: Res<LookSettings>,
    mut cameras: Query<(&mut LookCameraController, &MovementIntent, &MotionIntegrator)>,
) {
    let dt = time.delta_secs();
    for (mut look, intent, motion) in &mut cameras {
        look.update(intent.look, intent.look_device, motion.grounded(), &settings, dt);
    }
}

/// Start screen shakes requested by characters on the rigs following them.
pub fn start_screen_shakes(mut feedback: MessageReader<FeedbackMessage>, mut rigs: Query<&mut CameraRig>) {
    for message in feedback.read() {
        let FeedbackCue::ScreenShake { duration, amplitude } = message.cue else {
            continue;
        };
        for mut rig in rigs.iter_mut().filter(|rig| rig.target == message.character) {
            rig.start_shake(amplitude, duration);
        }
    }
}

/// Place camera rigs behind their characters, on real time.
pub fn advance_camera_rigs(
    time: Res<Time<Real>>,
    mut rigs: Query<(&mut CameraRig, &mut Transform)>,
    targets: Query<(&Transform, &LookCameraController), Without<CameraRig>>,
) {
    let dt = time.delta_secs();
    for (mut rig, mut transform) in &mut rigs {
        let jitter = rig.advance(dt);
        let Ok((target, look)) = targets.get(rig.target) else {
            continue;
        };
        *transform = rig.camera_transform(target.translation, look.rotation(), jitter);
    }
}

/// Turn rumble cues into rumble requests for every connected gamepad.
pub fn drive_gamepad_rumble(
    mut feedback: MessageReader<FeedbackMessage>,
    gamepads: Query<Entity, With<Gamepad>>,
    mut rumble: MessageWriter<GamepadRumbleRequest>,
) {
    for message in feedback.read() {
        if !matches!(message.cue, FeedbackCue::Rumble { .. } | FeedbackCue::RumbleStop) {
            continue;
        }
        for gamepad in &gamepads {
            rumble.write_batch(message.cue.rumble_requests(gamepad));
        }
    }
}

/// Stop every screen shake and gamepad rumble at once (pause menus, cutscenes).
pub fn force_stop_screen_shakes(
    mut rigs: Query<&mut CameraRig>,
    gamepads: Query<Entity, With<Gamepad>>,
    mut rumble: MessageWriter<GamepadRumbleRequest>,
) {
    for mut rig in &mut rigs {
        rig.force_stop_screen_shake();
    }
    rumble.write_batch(gamepads.iter().map(|gamepad| GamepadRumbleRequest::Stop { gamepad }));
}

/// Jitter struck cages on real time and put them back at rest afterwards.
pub fn advance_cage_shakes(
    mut commands: Commands,
    time: Res<Time<Real>>,
    mut cages: Query<(Entity, &mut Transform, &mut CageShake)>,
) {
    let dt = time.delta_secs();
    for (entity, mut transform, mut cage) in &mut cages {
        transform.translation = cage.shake.advance(dt);
        if cage.shake.is_finished() {
            transform.translation = cage.shake.rest();
            commands.entity(entity).remove::<CageShake>();
        }
    }
}
