use std::fmt;

use bevy::audio::AudioSinkPlayback;
use bevy::prelude::*;

use crate::config::RunParameters;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetNotReady {
    pub asset: String,
}

impl fmt::Display for AssetNotReady {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset '{}' is not loaded yet", self.asset)
    }
}

impl std::error::Error for AssetNotReady {}

/// Handle to the earthquake rumble. Loading is fire-and-forget; the handle is
/// checked for readiness each time a run starts.
#[derive(Resource)]
pub struct Alarm {
    pub path: String,
    pub handle: Handle<AudioSource>,
}

#[derive(Component)]
pub struct AlarmSound;

pub fn load_alarm(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    params: Res<RunParameters>,
) {
    let handle = asset_server.load(params.alarm_path.clone());
    commands.insert_resource(Alarm {
        path: params.alarm_path.clone(),
        handle,
    });
}

pub fn play_alarm(
    commands: &mut Commands,
    alarm: &Alarm,
    sources: &Assets<AudioSource>,
) -> Result<(), AssetNotReady> {
    if sources.get(&alarm.handle).is_none() {
        return Err(AssetNotReady {
            asset: alarm.path.clone(),
        });
    }
    commands.spawn((
        AudioBundle {
            source: alarm.handle.clone(),
            settings: PlaybackSettings::DESPAWN,
        },
        AlarmSound,
    ));
    Ok(())
}

pub fn stop_alarm(
    commands: &mut Commands,
    playing: &Query<(Entity, Option<&AudioSink>), With<AlarmSound>>,
) {
    for (entity, sink) in playing.iter() {
        if let Some(sink) = sink {
            sink.stop();
        }
        commands.entity(entity).despawn();
    }
}
