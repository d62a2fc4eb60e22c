use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bevy::prelude::*;
use serde::Deserialize;

/// Environment variable naming an alternative run configuration file.
pub const CONFIG_ENV: &str = "QUAKE_ROOM_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "quake_room.json";

pub struct ConfigPlugin;
impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        let (overrides, params) = load_run_config();
        app.insert_resource(overrides).insert_resource(params);
    }
}

/// Tuned presets, one per revision of the drill room.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Revision {
    Classic,
    #[default]
    Walkthrough,
    Aftershock,
}

impl Revision {
    pub const ALL: [Revision; 3] = [Revision::Classic, Revision::Walkthrough, Revision::Aftershock];

    pub fn label(&self) -> &'static str {
        match *self {
            Revision::Classic => "Classic",
            Revision::Walkthrough => "Walkthrough",
            Revision::Aftershock => "Aftershock",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum FlickerMode {
    /// Intensity becomes `baseline * U(min, max)` on every tick.
    Scale { min: f32, max: f32 },
    /// Intensity toggles between `baseline * dim` and `baseline`.
    Alternate { dim: f32 },
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CameraPose {
    pub position: Vec3,
    pub look_at: Vec3,
}

impl CameraPose {
    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.position).looking_at(self.look_at, Vec3::Y)
    }
}

#[derive(Resource, Clone, Debug, PartialEq)]
pub struct RunParameters {
    pub revision: Revision,
    pub shake_duration: Duration,
    pub shake_tick: Duration,
    /// Per-axis bound of a single shake offset. Zero axes are left alone.
    pub shake_magnitude: Vec3,
    pub shake_props: bool,
    pub flicker_tick: Duration,
    pub flicker_mode: FlickerMode,
    pub camera_reset: CameraPose,
    pub debrief_hold: Duration,
    pub dust_enabled: bool,
    pub dust_tick: Duration,
    pub dust_lifespan: Duration,
    pub alarm_path: String,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self::from_revision(Revision::default())
    }
}

impl RunParameters {
    pub fn from_revision(revision: Revision) -> Self {
        let mut params = RunParameters {
            revision,
            shake_duration: Duration::from_secs(8),
            shake_tick: Duration::from_millis(50),
            shake_magnitude: Vec3::splat(0.15),
            shake_props: true,
            flicker_tick: Duration::from_millis(100),
            flicker_mode: FlickerMode::Scale { min: 0.6, max: 1.3 },
            camera_reset: CameraPose {
                position: Vec3::new(0.0, 1.6, -2.0),
                look_at: Vec3::new(0.0, 1.6, 0.0),
            },
            debrief_hold: Duration::from_secs(5),
            dust_enabled: true,
            dust_tick: Duration::from_millis(120),
            dust_lifespan: Duration::from_millis(2500),
            alarm_path: "audio/earthquake.ogg".to_string(),
        };
        match revision {
            Revision::Classic => {
                params.camera_reset.position = Vec3::new(0.0, 1.6, -5.0);
                params.shake_props = false;
                params.dust_enabled = false;
            }
            Revision::Walkthrough => {
                params.shake_magnitude = Vec3::new(0.2, 0.0, 0.0);
            }
            Revision::Aftershock => {
                params.shake_duration = Duration::from_secs(10);
                params.shake_magnitude = Vec3::splat(0.1);
                params.flicker_tick = Duration::from_millis(500);
                params.flicker_mode = FlickerMode::Alternate { dim: 0.25 };
                params.dust_tick = Duration::from_millis(80);
            }
        }
        params
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.shake_duration.is_zero() {
            return Err("shake duration must be positive".to_string());
        }
        for (name, tick) in [
            ("shake tick", self.shake_tick),
            ("flicker tick", self.flicker_tick),
            ("dust tick", self.dust_tick),
        ] {
            if tick.is_zero() {
                return Err(format!("{name} must be positive"));
            }
            if tick > self.shake_duration {
                return Err(format!(
                    "{name} ({} ms) exceeds the shake duration ({} ms)",
                    tick.as_millis(),
                    self.shake_duration.as_millis()
                ));
            }
        }
        if self.shake_magnitude.min_element() < 0.0 {
            return Err("shake magnitude must not be negative".to_string());
        }
        match self.flicker_mode {
            FlickerMode::Scale { min, max } if min < 0.0 || min > max => Err(format!(
                "flicker scale range {min}..{max} is empty or negative"
            )),
            FlickerMode::Alternate { dim } if !(0.0..=1.0).contains(&dim) => {
                Err(format!("flicker dim factor {dim} is outside 0..=1"))
            }
            _ => Ok(()),
        }
    }
}

/// Partial override file. Every field is optional and lands on top of the
/// chosen revision preset. Kept as a resource so switching revision at
/// runtime re-applies the file's fields.
#[derive(Resource, Deserialize, Default, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RunOverrides {
    pub revision: Option<Revision>,
    pub shake_duration_ms: Option<u64>,
    pub shake_tick_ms: Option<u64>,
    pub shake_magnitude: Option<[f32; 3]>,
    pub shake_props: Option<bool>,
    pub flicker_tick_ms: Option<u64>,
    pub flicker_scale: Option<[f32; 2]>,
    pub flicker_dim: Option<f32>,
    pub camera_reset: Option<[f32; 3]>,
    pub debrief_hold_ms: Option<u64>,
    pub dust_enabled: Option<bool>,
    pub alarm_path: Option<String>,
}

impl RunOverrides {
    pub fn apply(&self) -> Result<RunParameters, String> {
        self.apply_to(self.revision.unwrap_or_default())
    }

    /// Applies the overrides to `revision`'s preset, ignoring the file's own
    /// revision selector.
    pub fn apply_to(&self, revision: Revision) -> Result<RunParameters, String> {
        if self.flicker_scale.is_some() && self.flicker_dim.is_some() {
            return Err("flicker_scale and flicker_dim are mutually exclusive".to_string());
        }

        let mut params = RunParameters::from_revision(revision);
        if let Some(ms) = self.shake_duration_ms {
            params.shake_duration = Duration::from_millis(ms);
        }
        if let Some(ms) = self.shake_tick_ms {
            params.shake_tick = Duration::from_millis(ms);
        }
        if let Some(m) = self.shake_magnitude {
            params.shake_magnitude = Vec3::from_array(m);
        }
        if let Some(on) = self.shake_props {
            params.shake_props = on;
        }
        if let Some(ms) = self.flicker_tick_ms {
            params.flicker_tick = Duration::from_millis(ms);
        }
        if let Some([min, max]) = self.flicker_scale {
            params.flicker_mode = FlickerMode::Scale { min, max };
        }
        if let Some(dim) = self.flicker_dim {
            params.flicker_mode = FlickerMode::Alternate { dim };
        }
        if let Some(p) = self.camera_reset {
            params.camera_reset.position = Vec3::from_array(p);
        }
        if let Some(ms) = self.debrief_hold_ms {
            params.debrief_hold = Duration::from_millis(ms);
        }
        if let Some(on) = self.dust_enabled {
            params.dust_enabled = on;
        }
        if let Some(path) = &self.alarm_path {
            params.alarm_path = path.clone();
        }

        params.validate()?;
        Ok(params)
    }
}

/// Parses and validates an override file body.
pub fn parse_run_overrides(raw: &str, origin: &str) -> Result<RunOverrides, String> {
    let overrides: RunOverrides = serde_json::from_str(raw)
        .map_err(|e| format!("Failed to parse run config {origin}: {e}"))?;
    overrides
        .apply()
        .map_err(|e| format!("Invalid run config {origin}: {e}"))?;
    Ok(overrides)
}

/// `Ok(None)` when the file does not exist.
pub fn load_run_overrides_from_path(path: &Path) -> Result<Option<RunOverrides>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read run config {}: {e}", path.display()))?;
    parse_run_overrides(&raw, &path.display().to_string()).map(Some)
}

pub fn config_path() -> PathBuf {
    env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

fn load_run_config() -> (RunOverrides, RunParameters) {
    let path = config_path();
    let overrides = match load_run_overrides_from_path(&path) {
        Ok(Some(overrides)) => overrides,
        Ok(None) => return (RunOverrides::default(), RunParameters::default()),
        Err(e) => {
            error!("{e}; falling back to defaults");
            return (RunOverrides::default(), RunParameters::default());
        }
    };
    match overrides.apply() {
        Ok(params) => {
            info!(
                "Loaded run config {} (revision {})",
                path.display(),
                params.revision.label()
            );
            (overrides, params)
        }
        Err(e) => {
            error!("Invalid run config {}: {e}; falling back to defaults", path.display());
            (RunOverrides::default(), RunParameters::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn parse_run_parameters(raw: &str, origin: &str) -> Result<RunParameters, String> {
        parse_run_overrides(raw, origin)?.apply()
    }

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        env::temp_dir().join(format!(
            "quake_room_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn presets_are_valid() {
        for revision in Revision::ALL {
            let params = RunParameters::from_revision(revision);
            assert_eq!(params.revision, revision);
            assert!(params.validate().is_ok(), "{revision:?} preset invalid");
            let secs = params.shake_duration.as_secs();
            assert!((8..=10).contains(&secs));
        }
    }

    #[test]
    fn walkthrough_shakes_only_along_x() {
        let params = RunParameters::from_revision(Revision::Walkthrough);
        assert!(params.shake_magnitude.x > 0.0);
        assert_eq!(params.shake_magnitude.y, 0.0);
        assert_eq!(params.shake_magnitude.z, 0.0);
    }

    #[test]
    fn overrides_land_on_selected_revision() {
        let raw =
            r#"{ "revision": "aftershock", "shake_duration_ms": 9000, "dust_enabled": false }"#;
        let params = parse_run_parameters(raw, "inline").expect("valid config");
        assert_eq!(params.revision, Revision::Aftershock);
        assert_eq!(params.shake_duration, Duration::from_millis(9000));
        assert!(!params.dust_enabled);
        assert_eq!(params.flicker_mode, FlickerMode::Alternate { dim: 0.25 });
    }

    #[test]
    fn empty_object_yields_default_parameters() {
        let params = parse_run_parameters("{}", "inline").expect("valid config");
        assert_eq!(params, RunParameters::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = parse_run_parameters(r#"{ "shake_speed": 3 }"#, "inline").unwrap_err();
        assert!(err.contains("Failed to parse run config inline"), "{err}");
    }

    #[test]
    fn tick_longer_than_duration_is_rejected() {
        let raw = r#"{ "shake_duration_ms": 1000, "flicker_tick_ms": 1500 }"#;
        let err = parse_run_parameters(raw, "inline").unwrap_err();
        assert!(err.contains("flicker tick"), "{err}");
    }

    #[test]
    fn conflicting_flicker_modes_are_rejected() {
        let raw = r#"{ "flicker_scale": [0.5, 1.0], "flicker_dim": 0.3 }"#;
        let err = parse_run_parameters(raw, "inline").unwrap_err();
        assert!(err.contains("mutually exclusive"), "{err}");
    }

    #[test]
    fn inverted_scale_range_is_rejected() {
        let raw = r#"{ "flicker_scale": [1.2, 0.4] }"#;
        assert!(parse_run_parameters(raw, "inline").is_err());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let path = temp_file_path("missing");
        assert_eq!(load_run_overrides_from_path(&path), Ok(None));
    }

    #[test]
    fn switching_revision_keeps_file_overrides() {
        let raw = r#"{
            "revision": "walkthrough",
            "alarm_path": "audio/siren.ogg",
            "camera_reset": [1.0, 1.4, -3.0],
            "debrief_hold_ms": 7000
        }"#;
        let overrides = parse_run_overrides(raw, "inline").expect("valid config");
        let params = overrides
            .apply_to(Revision::Aftershock)
            .expect("overrides fit the aftershock preset");

        assert_eq!(params.revision, Revision::Aftershock);
        assert_eq!(params.shake_duration, Duration::from_secs(10));
        assert_eq!(params.alarm_path, "audio/siren.ogg");
        assert_eq!(params.camera_reset.position, Vec3::new(1.0, 1.4, -3.0));
        assert_eq!(params.debrief_hold, Duration::from_millis(7000));
    }

    #[test]
    fn default_overrides_reproduce_each_preset() {
        let overrides = RunOverrides::default();
        for revision in Revision::ALL {
            assert_eq!(
                overrides.apply_to(revision),
                Ok(RunParameters::from_revision(revision))
            );
        }
    }

    #[test]
    fn load_from_path_reads_overrides() {
        let path = temp_file_path("valid");
        fs::write(&path, r#"{ "camera_reset": [1.0, 1.5, -3.0] }"#)
            .expect("failed to write temp config file");
        let params = load_run_overrides_from_path(&path)
            .expect("config should load")
            .expect("config file exists")
            .apply()
            .expect("overrides are valid");
        assert_eq!(params.camera_reset.position, Vec3::new(1.0, 1.5, -3.0));
        let _ = fs::remove_file(path);
    }
}
