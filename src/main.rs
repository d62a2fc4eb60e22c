mod alarm;
mod config;
mod effects;
mod input;
mod room;
mod scenario;
mod ui;

use bevy::core_pipeline::bloom::BloomSettings;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;
use config::{ConfigPlugin, RunParameters};
use effects::ScenarioPlugin;
use input::{FlyCamera, InputPlugin};
use room::RoomPlugin;
use scenario::ScenarioPhase;
use ui::UiPlugin;

fn main() {
    App::new()
        .insert_resource(ClearColor(Color::srgb(0.05, 0.05, 0.07)))
        .insert_resource(Msaa::Sample4)
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "quake-room: earthquake safety drill".into(),
                resolution: (1400., 900.).into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(FrameTimeDiagnosticsPlugin)
        .add_plugins(ConfigPlugin)
        .init_state::<ScenarioPhase>()
        .add_plugins((RoomPlugin, ScenarioPlugin, UiPlugin, InputPlugin))
        .add_systems(Startup, setup_camera)
        .run();
}

fn setup_camera(mut commands: Commands, params: Res<RunParameters>) {
    let transform = params.camera_reset.transform();
    commands.spawn((
        Camera3dBundle {
            camera: Camera {
                hdr: true,
                ..default()
            },
            tonemapping: Tonemapping::TonyMcMapface,
            transform,
            ..default()
        },
        BloomSettings::NATURAL,
        FlyCamera::from_transform(&transform),
        MainCamera,
    ));
}

#[derive(Component)]
pub struct MainCamera;
