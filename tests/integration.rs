//! Integration tests for the character controller.
//!
//! These tests run the full plugin in a headless app on the built-in
//! collision world and drive the fixed schedule by hand, one tick per call.

use bevy::ecs::entity_disabling::Disabled;
use bevy::ecs::message::Message;
use bevy::ecs::system::RunSystemOnce;
use bevy::prelude::*;
use pogo_character_controller::prelude::*;
use pogo_character_controller::systems::force_stop_screen_shakes;

/// Messages of type `M` seen after the controller's effects ran.
#[derive(Resource)]
struct Collected<M: Message>(Vec<M>);

impl<M: Message> Default for Collected<M> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

fn collect<M: Message + Clone>(mut reader: MessageReader<M>, mut collected: ResMut<Collected<M>>) {
    collected.0.extend(reader.read().cloned());
}

/// Create a minimal test app with the controller and a floor.
fn create_test_app() -> App {
    let mut app = App::new();

    app.add_plugins(MinimalPlugins);
    app.add_plugins(CharacterControllerPlugin::<CollisionWorldBackend>::default());
    app.insert_resource(Time::<Fixed>::from_hz(60.0));
    app.init_resource::<Collected<FeedbackMessage>>();
    app.init_resource::<Collected<TutorialMessage>>();
    app.add_systems(
        FixedUpdate,
        (collect::<FeedbackMessage>, collect::<TutorialMessage>).after(CharacterControllerSet::Effects),
    );

    app.finish();
    app.cleanup();

    app.world_mut().spawn((
        Transform::from_xyz(0.0, -0.5, 0.0),
        WorldCollider::cuboid(Vec3::new(50.0, 0.5, 50.0), LayerMask::GROUND),
    ));
    app
}

/// Spawn a player character standing at `position`.
fn spawn_character(app: &mut App, position: Vec3) -> Entity {
    app.world_mut()
        .spawn((
            Transform::from_translation(position),
            MotionIntegrator::new(ControllerConfig::player()),
            MovementIntent::default(),
            LookCameraController::default(),
            DashPogoAbility::default(),
        ))
        .id()
}

/// Run one fixed tick.
fn tick(app: &mut App) {
    app.world_mut().run_schedule(FixedUpdate);
}

fn run_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        tick(app);
    }
}

/// Run the frame-rate systems once.
fn frame(app: &mut App) {
    app.world_mut().run_schedule(Update);
}

fn motion(app: &mut App, character: Entity) -> Mut<'_, MotionIntegrator> {
    app.world_mut()
        .get_mut::<MotionIntegrator>(character)
        .expect("character has a motion integrator")
}

fn intent(app: &mut App, character: Entity) -> Mut<'_, MovementIntent> {
    app.world_mut()
        .get_mut::<MovementIntent>(character)
        .expect("character has an intent")
}

/// Rest on the floor, then appear airborne at `height`.
fn place_airborne(app: &mut App, character: Entity, height: f32) {
    {
        let mut motion = motion(app, character);
        motion.teleport(Vec3::ZERO);
        motion.state.vertical_velocity = 0.0;
    }
    run_ticks(app, 3);
    assert!(motion(app, character).grounded());

    motion(app, character).teleport(Vec3::Y * height);
    run_ticks(app, 2);
    assert!(!motion(app, character).grounded());
}

fn height_of(app: &App, entity: Entity) -> f32 {
    app.world()
        .get::<Transform>(entity)
        .map(|t| t.translation.y)
        .unwrap_or(f32::NAN)
}

// ==================== Jump Tests ====================

mod jump {
    use super::*;

    #[test]
    fn jump_reaches_configured_height_and_lands() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::ZERO);

        // Jump timeout has to run out on the ground first.
        run_ticks(&mut app, 40);
        assert!(app.world().get::<Grounded>(character).is_some());

        intent(&mut app, character).set_jump(true);
        let mut peak: f32 = 0.0;
        let mut saw_airborne = false;
        for _ in 0..90 {
            tick(&mut app);
            peak = peak.max(height_of(&app, character));
            saw_airborne |= app.world().get::<Airborne>(character).is_some();
        }

        // PROOF: v0 = sqrt(2 * 1.2 * 15) = 6 m/s, apex hang adds a little.
        assert!(peak > 1.1, "peak {peak} below jump height");
        assert!(peak < 1.45, "peak {peak} far above jump height");
        assert!(saw_airborne);

        assert!(app.world().get::<Grounded>(character).is_some());
        assert!(app.world().get::<Airborne>(character).is_none());
        assert!(height_of(&app, character).abs() < 0.05);
        assert!(!intent(&mut app, character).jump, "jump is cleared while airborne");

        let landed = app
            .world()
            .resource::<Collected<FeedbackMessage>>()
            .0
            .iter()
            .any(|m| m.character == character && matches!(m.cue, FeedbackCue::Landing { .. }));
        assert!(landed);
    }

    #[test]
    fn animation_params_follow_the_jump() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::ZERO);
        run_ticks(&mut app, 40);

        intent(&mut app, character).set_jump(true);
        tick(&mut app);
        let params = app.world().get::<AnimationParams>(character).copied().unwrap_or_default();
        assert!(params.jump);

        run_ticks(&mut app, 10);
        let params = app.world().get::<AnimationParams>(character).copied().unwrap_or_default();
        assert!(!params.grounded);
        assert!(!params.jump);
    }
}

// ==================== Pogo Tests ====================

mod pogo {
    use super::*;

    fn spawn_enemy(app: &mut App) -> Entity {
        app.world_mut()
            .spawn((
                Transform::from_xyz(0.0, 3.2, 0.0),
                WorldCollider::sphere(0.5, LayerMask::ENEMY),
                Health::new(3),
            ))
            .id()
    }

    #[test]
    fn pogo_on_enemy_damages_and_knocks_back() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::ZERO);
        let enemy = spawn_enemy(&mut app);

        place_airborne(&mut app, character, 4.0);
        intent(&mut app, character).set_pogo_held(true);
        tick(&mut app);

        // PROOF: the hit went through damage, bounce and knockback.
        let health = app.world().get::<Health>(enemy).copied().expect("enemy health");
        assert_eq!(health.current, 2);
        assert!(motion(&mut app, character).vertical_velocity() > 0.0);
        assert!(app.world().get::<KnockbackTween>(enemy).is_some());

        run_ticks(&mut app, 20);

        // Facing -Z, so the enemy is pushed toward +Z by the full distance.
        let position = app.world().get::<Transform>(enemy).map(|t| t.translation).unwrap_or_default();
        assert!((position.z - 2.5).abs() < 1e-3, "enemy ended at {position:?}");
        assert!((position.y - 3.2).abs() < 1e-5);
        assert!(app.world().get::<KnockbackTween>(enemy).is_none());

        let tutorial = &app.world().resource::<Collected<TutorialMessage>>().0;
        assert!(tutorial.iter().any(|m| m.event == TutorialEvent::PogoPerformed));

        let feedback = &app.world().resource::<Collected<FeedbackMessage>>().0;
        assert!(feedback
            .iter()
            .any(|m| m.character == character && matches!(m.cue, FeedbackCue::Rumble { .. })));
    }

    #[test]
    fn knockback_suspends_and_restores_nav_agent() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::ZERO);
        let surface = app
            .world_mut()
            .spawn(NavigationBounds::new(Vec2::splat(-20.0), Vec2::splat(20.0), 3.2))
            .id();
        let enemy = spawn_enemy(&mut app);
        app.world_mut().entity_mut(enemy).insert(NavAgent::on(surface));

        place_airborne(&mut app, character, 4.0);
        intent(&mut app, character).set_pogo_held(true);
        tick(&mut app);

        let agent = app.world().get::<NavAgent>(enemy).copied().expect("agent");
        assert!(!agent.steering_enabled);

        run_ticks(&mut app, 20);
        let agent = app.world().get::<NavAgent>(enemy).copied().expect("agent");
        assert!(agent.steering_enabled);
        assert!(agent.avoidance_enabled);
    }

    #[test]
    fn third_pogo_disables_cage() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::ZERO);
        let cage = app
            .world_mut()
            .spawn((
                Transform::from_xyz(0.0, 3.2, 0.0),
                WorldCollider::sphere(0.5, LayerMask::CAGE),
            ))
            .id();

        for strike in 1..=3 {
            place_airborne(&mut app, character, 4.0);
            intent(&mut app, character).set_pogo_held(false);
            tick(&mut app);
            intent(&mut app, character).set_pogo_held(true);
            tick(&mut app);
            intent(&mut app, character).set_pogo_held(false);

            let disabled = app.world().entity(cage).contains::<Disabled>();
            assert_eq!(disabled, strike == 3, "after pogo {strike}");
        }

        // The disabled cage drops out of the collision world on the next tick.
        tick(&mut app);
        let world = app.world().resource::<CollisionWorld>();
        assert!(world.iter().all(|collider| collider.entity != Some(cage)));

        let broken = app
            .world()
            .resource::<Collected<TutorialMessage>>()
            .0
            .iter()
            .any(|m| m.event == TutorialEvent::ObjectBroken(cage));
        assert!(broken);
    }
}

// ==================== Camera Tests ====================

mod camera {
    use super::*;

    #[test]
    fn entering_zones_switches_profile_and_blends_shoulder() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::ZERO);
        let rig = app
            .world_mut()
            .spawn((Transform::default(), CameraRig::new(character)))
            .id();
        let first = app
            .world_mut()
            .spawn((
                Transform::default(),
                CameraZone::new(Vec3::splat(5.0), CameraProfile::named("hub")).with_shoulder(Vec3::X * 2.0, 0.4),
            ))
            .id();
        let second = app
            .world_mut()
            .spawn((
                Transform::from_xyz(20.0, 0.0, 0.0),
                CameraZone::new(Vec3::splat(5.0), CameraProfile::arena()).with_shoulder(Vec3::NEG_X, 0.4),
            ))
            .id();

        run_ticks(&mut app, 2);
        frame(&mut app);

        // First activation snaps.
        assert_eq!(app.world().resource::<CameraZoneRegistry>().last_activated(), Some(first));
        let camera = app.world().get::<CameraRig>(rig).expect("rig");
        assert_eq!(camera.shoulder_offset, Vec3::X * 2.0);
        assert!(!camera.is_blending());

        motion(&mut app, character).teleport(Vec3::new(20.0, 0.0, 0.0));
        run_ticks(&mut app, 2);
        frame(&mut app);

        assert_eq!(app.world().resource::<CameraZoneRegistry>().last_activated(), Some(second));
        let camera = app.world().get::<CameraRig>(rig).expect("rig");
        assert!(camera.is_blending());
        assert_eq!(camera.shoulder_offset, Vec3::X * 2.0);

        let look = app.world().get::<LookCameraController>(character).expect("look");
        assert_eq!(look.profile.name, "arena");
    }

    #[test]
    fn pogo_shake_can_be_force_stopped() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::ZERO);
        let rig = app
            .world_mut()
            .spawn((Transform::default(), CameraRig::new(character)))
            .id();
        app.world_mut().spawn((
            Transform::from_xyz(0.0, 3.2, 0.0),
            WorldCollider::sphere(0.5, LayerMask::ENEMY),
        ));

        place_airborne(&mut app, character, 4.0);
        intent(&mut app, character).set_pogo_held(true);
        tick(&mut app);
        frame(&mut app);

        assert!(app.world().get::<CameraRig>(rig).is_some_and(|r| r.is_shaking()));

        app.world_mut()
            .run_system_once(force_stop_screen_shakes)
            .expect("force stop runs");
        assert!(app.world().get::<CameraRig>(rig).is_some_and(|r| !r.is_shaking()));
    }
}
