use bevy::prelude::*;
use rand::Rng;

use crate::alarm::{self, Alarm, AlarmSound};
use crate::config::RunParameters;
use crate::input::{CameraInput, FlyCamera};
use crate::room::{FlickerLight, ShakeProp, StartTrigger, ROOM_HALF_EXTENT, ROOM_HEIGHT};
use crate::scenario::{ScenarioController, ScenarioPhase, StartOutcome};
use crate::MainCamera;

const DUST_FALL_SPEED: f32 = 1.5;
const DUST_SIZE: f32 = 0.04;

pub struct ScenarioPlugin;
impl Plugin for ScenarioPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ScenarioController>()
            .init_resource::<TriggerLabel>()
            .insert_resource(DustSpawnTimer(Timer::from_seconds(0.12, TimerMode::Repeating)))
            .add_event::<StartScenario>()
            .add_systems(Startup, (alarm::load_alarm, init_dust_assets))
            .add_systems(
                Update,
                (handle_start_requests, drive_scenario)
                    .chain()
                    .after(CameraInput),
            )
            .add_systems(
                Update,
                tint_trigger.run_if(resource_changed::<TriggerLabel>),
            )
            .add_systems(OnEnter(ScenarioPhase::Running), reset_dust_timer)
            .add_systems(
                Update,
                spawn_dust.run_if(in_state(ScenarioPhase::Running)),
            )
            .add_systems(Update, update_dust)
            .add_systems(OnExit(ScenarioPhase::Running), clear_dust);
    }
}

/// Request to begin a drill, from the trigger mesh, the HUD or the keyboard.
#[derive(Event, Default)]
pub struct StartScenario;

/// Text and colour of the start control.
#[derive(Resource, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriggerLabel {
    pub text: &'static str,
    pub alert: bool,
}

impl TriggerLabel {
    pub const IDLE: TriggerLabel = TriggerLabel {
        text: "Start Simulation",
        alert: false,
    };
    pub const ALERT: TriggerLabel = TriggerLabel {
        text: "Drop, Cover and Hold On",
        alert: true,
    };
}

impl Default for TriggerLabel {
    fn default() -> Self {
        Self::IDLE
    }
}

#[derive(Resource)]
struct DustSpawnTimer(Timer);

#[derive(Resource)]
struct DustAssets {
    mesh: Handle<Mesh>,
    material: Handle<StandardMaterial>,
}

#[derive(Component)]
struct Dust {
    lifespan: f32,
}

#[allow(clippy::too_many_arguments)]
fn handle_start_requests(
    mut commands: Commands,
    mut ev_start: EventReader<StartScenario>,
    mut controller: ResMut<ScenarioController>,
    mut label: ResMut<TriggerLabel>,
    params: Res<RunParameters>,
    lights: Query<&PointLight, With<FlickerLight>>,
    alarm_asset: Option<Res<Alarm>>,
    sources: Res<Assets<AudioSource>>,
    mut next_state: ResMut<NextState<ScenarioPhase>>,
) {
    for _ in ev_start.read() {
        let baseline = match lights.get_single() {
            Ok(light) => light.intensity,
            Err(_) => {
                warn!("no flicker light in the scene; flicker will drive a zero baseline");
                0.0
            }
        };

        match controller.start(&params, baseline) {
            StartOutcome::AlreadyRunning => {
                debug!("drill already running, start request ignored");
                continue;
            }
            StartOutcome::Started => {}
        }

        *label = TriggerLabel::ALERT;
        match alarm_asset.as_deref() {
            Some(handle) => {
                if let Err(e) = alarm::play_alarm(&mut commands, handle, &sources) {
                    warn!("{e}; running the drill without sound");
                }
            }
            None => warn!("alarm was never requested; running the drill without sound"),
        }
        next_state.set(ScenarioPhase::Running);
        info!(
            "earthquake drill started ({} revision, {:.1}s)",
            params.revision.label(),
            params.shake_duration.as_secs_f32()
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn drive_scenario(
    mut commands: Commands,
    time: Res<Time>,
    mut controller: ResMut<ScenarioController>,
    mut label: ResMut<TriggerLabel>,
    mut cameras: Query<(&mut Transform, Option<&mut FlyCamera>), With<MainCamera>>,
    mut props: Query<(&mut Transform, &ShakeProp), Without<MainCamera>>,
    mut lights: Query<&mut PointLight, With<FlickerLight>>,
    alarms: Query<(Entity, Option<&AudioSink>), With<AlarmSound>>,
    mut next_state: ResMut<NextState<ScenarioPhase>>,
) {
    let mut rng = rand::thread_rng();
    let step = controller.advance(time.delta(), &mut rng);

    if !step.shakes.is_empty() {
        let total: Vec3 = step.shakes.iter().sum();
        if let Ok((mut t, _)) = cameras.get_single_mut() {
            t.translation += total;
        }
        if step.shake_props {
            for (mut t, _) in &mut props {
                t.translation += total;
            }
        }
    }

    if let Some(intensity) = step.intensity {
        for mut light in &mut lights {
            light.intensity = intensity;
        }
    }

    if let Some(end) = step.ended {
        // Periodic effects are already cancelled; restore the room.
        alarm::stop_alarm(&mut commands, &alarms);
        for mut light in &mut lights {
            light.intensity = end.baseline;
        }
        if let Ok((mut t, fly)) = cameras.get_single_mut() {
            *t = end.camera_reset.transform();
            if let Some(mut fly) = fly {
                *fly = FlyCamera::from_transform(&t);
            }
        }
        for (mut t, prop) in &mut props {
            t.translation = prop.rest;
        }
        *label = TriggerLabel::IDLE;
        next_state.set(ScenarioPhase::Debrief);
        info!(
            "earthquake drill finished (run {}): {}",
            controller.runs_completed(),
            end.report.message
        );
    }

    if step.debrief_closed {
        next_state.set(ScenarioPhase::Idle);
    }
}

fn tint_trigger(
    label: Res<TriggerLabel>,
    triggers: Query<&Handle<StandardMaterial>, With<StartTrigger>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let color = if label.alert {
        Color::srgb(1.0, 0.0, 0.0)
    } else {
        Color::srgb(0.0, 1.0, 0.0)
    };
    for handle in &triggers {
        if let Some(material) = materials.get_mut(handle) {
            material.base_color = color;
            material.emissive = color.to_linear() * 0.6;
        }
    }
}

fn init_dust_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.insert_resource(DustAssets {
        mesh: meshes.add(Cuboid::from_length(DUST_SIZE)),
        material: materials.add(StandardMaterial {
            base_color: Color::srgb(0.7, 0.68, 0.62),
            unlit: true,
            ..default()
        }),
    });
}

fn reset_dust_timer(controller: Res<ScenarioController>, mut timer: ResMut<DustSpawnTimer>) {
    if let Some(params) = controller.active_parameters() {
        timer.0 = Timer::new(params.dust_tick, TimerMode::Repeating);
    }
}

fn spawn_dust(
    mut commands: Commands,
    time: Res<Time>,
    controller: Res<ScenarioController>,
    mut timer: ResMut<DustSpawnTimer>,
    assets: Option<Res<DustAssets>>,
) {
    let Some(params) = controller.active_parameters() else {
        return;
    };
    let Some(assets) = assets else {
        return;
    };
    timer.0.tick(time.delta());
    if !params.dust_enabled || !timer.0.just_finished() {
        return;
    }

    let mut rng = rand::thread_rng();
    let lifespan = params.dust_lifespan.as_secs_f32();
    let limit = ROOM_HALF_EXTENT - 0.2;
    for _ in 0..timer.0.times_finished_this_tick() {
        let pos = Vec3::new(
            rng.gen_range(-limit..limit),
            ROOM_HEIGHT - 0.1,
            rng.gen_range(-limit..limit),
        );
        commands.spawn((
            PbrBundle {
                mesh: assets.mesh.clone(),
                material: assets.material.clone(),
                transform: Transform::from_translation(pos),
                ..default()
            },
            Dust { lifespan },
        ));
    }
}

fn update_dust(
    mut commands: Commands,
    time: Res<Time>,
    mut dust_q: Query<(Entity, &mut Dust, &mut Transform)>,
) {
    let dt = time.delta_seconds();
    for (e, mut dust, mut t) in &mut dust_q {
        dust.lifespan -= dt;
        t.translation.y -= DUST_FALL_SPEED * dt;
        if dust.lifespan <= 0.0 || t.translation.y <= 0.0 {
            commands.entity(e).despawn();
        }
    }
}

fn clear_dust(mut commands: Commands, dust_q: Query<Entity, With<Dust>>) {
    for e in &dust_q {
        commands.entity(e).despawn();
    }
}
