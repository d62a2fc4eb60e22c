use crate::effects::StartScenario;
use crate::room::{PickBounds, StartTrigger, ROOM_HALF_EXTENT};
use crate::ui::HudToggles;
use crate::MainCamera;
use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use bevy_egui::EguiContexts;

const WALK_SPEED: f32 = 2.5;
const BOOST: f32 = 1.75;
const LOOK_SENSITIVITY: f32 = 0.003;
const WALL_MARGIN: f32 = 0.3;
const EYE_MIN: f32 = 0.4;
const EYE_MAX: f32 = 2.6;
const PITCH_LIMIT: f32 = 85.0 * std::f32::consts::PI / 180.0;

/// Camera movement runs in this set so the shake can layer on top of it.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct CameraInput;

pub struct InputPlugin;
impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (fly_camera_look, fly_camera_move)
                .chain()
                .in_set(CameraInput),
        )
        .add_systems(
            Update,
            (pick_trigger, start_shortcut, help_toggle, settings_toggle),
        );
    }
}

#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct FlyCamera {
    pub yaw: f32,
    pub pitch: f32,
}

impl FlyCamera {
    pub fn from_transform(t: &Transform) -> Self {
        let (yaw, pitch, _) = t.rotation.to_euler(EulerRot::YXZ);
        Self { yaw, pitch }
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    /// Forward and right vectors on the floor plane.
    pub fn ground_axes(&self) -> (Vec3, Vec3) {
        let (sin, cos) = self.yaw.sin_cos();
        (Vec3::new(-sin, 0.0, -cos), Vec3::new(cos, 0.0, -sin))
    }
}

pub fn clamp_to_room(p: Vec3) -> Vec3 {
    let limit = ROOM_HALF_EXTENT - WALL_MARGIN;
    Vec3::new(
        p.x.clamp(-limit, limit),
        p.y.clamp(EYE_MIN, EYE_MAX),
        p.z.clamp(-limit, limit),
    )
}

/// Slab test against an axis-aligned box. Returns the distance along the ray
/// to the first hit in front of the origin.
pub fn ray_box_hit(origin: Vec3, dir: Vec3, center: Vec3, half_extents: Vec3) -> Option<f32> {
    let min = center - half_extents;
    let max = center + half_extents;
    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;

    for axis in 0..3 {
        let (o, d) = (origin[axis], dir[axis]);
        if d.abs() < 1e-8 {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let a = (min[axis] - o) / d;
        let b = (max[axis] - o) / d;
        t_near = t_near.max(a.min(b));
        t_far = t_far.min(a.max(b));
        if t_near > t_far {
            return None;
        }
    }

    if t_far < 0.0 {
        None
    } else {
        Some(t_near.max(0.0))
    }
}

fn fly_camera_look(
    buttons: Res<ButtonInput<MouseButton>>,
    mut motion: EventReader<MouseMotion>,
    mut q_cam: Query<(&mut Transform, &mut FlyCamera), With<MainCamera>>,
) {
    let Ok((mut t, mut fly)) = q_cam.get_single_mut() else {
        motion.clear();
        return;
    };

    if buttons.pressed(MouseButton::Right) {
        for m in motion.read() {
            fly.yaw -= m.delta.x * LOOK_SENSITIVITY;
            fly.pitch = (fly.pitch - m.delta.y * LOOK_SENSITIVITY).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
    } else {
        motion.clear();
    }
    t.rotation = fly.rotation();
}

fn fly_camera_move(
    time: Res<Time>,
    keys: Res<ButtonInput<KeyCode>>,
    mut q_cam: Query<(&mut Transform, &FlyCamera), With<MainCamera>>,
) {
    let Ok((mut t, fly)) = q_cam.get_single_mut() else {
        return;
    };
    let (forward, right) = fly.ground_axes();
    let mut dir = Vec3::ZERO;

    if keys.pressed(KeyCode::ArrowUp) || keys.pressed(KeyCode::KeyW) {
        dir += forward;
    }
    if keys.pressed(KeyCode::ArrowDown) || keys.pressed(KeyCode::KeyS) {
        dir -= forward;
    }
    if keys.pressed(KeyCode::ArrowLeft) || keys.pressed(KeyCode::KeyA) {
        dir -= right;
    }
    if keys.pressed(KeyCode::ArrowRight) || keys.pressed(KeyCode::KeyD) {
        dir += right;
    }
    // Crouch to get under the table.
    if keys.pressed(KeyCode::KeyQ) {
        dir -= Vec3::Y;
    }
    if keys.pressed(KeyCode::KeyE) {
        dir += Vec3::Y;
    }

    if dir != Vec3::ZERO {
        let boost = if keys.pressed(KeyCode::ShiftLeft) || keys.pressed(KeyCode::ShiftRight) {
            BOOST
        } else {
            1.0
        };
        let step = dir.normalize() * WALK_SPEED * boost * time.delta_seconds();
        t.translation = clamp_to_room(t.translation + step);
    }
}

fn pick_trigger(
    mut contexts: EguiContexts,
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window>,
    q_cam: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    triggers: Query<(&GlobalTransform, &PickBounds), With<StartTrigger>>,
    mut ev_start: EventWriter<StartScenario>,
) {
    if !buttons.just_pressed(MouseButton::Left) {
        return;
    }
    let ctx = contexts.ctx_mut();
    if ctx.wants_pointer_input() || ctx.is_pointer_over_area() {
        return;
    }
    let Ok(win) = windows.get_single() else {
        return;
    };
    let Some(cursor) = win.cursor_position() else {
        return;
    };
    let Ok((cam, cam_transform)) = q_cam.get_single() else {
        return;
    };
    let Some(ray) = cam.viewport_to_world(cam_transform, cursor) else {
        return;
    };

    let hit = triggers.iter().any(|(gt, bounds)| {
        ray_box_hit(ray.origin, *ray.direction, gt.translation(), bounds.half_extents).is_some()
    });
    if hit {
        ev_start.send(StartScenario);
    }
}

fn start_shortcut(mut ev_start: EventWriter<StartScenario>, keys: Res<ButtonInput<KeyCode>>) {
    if keys.just_pressed(KeyCode::Enter) {
        ev_start.send(StartScenario);
    }
}

fn help_toggle(mut toggles: ResMut<HudToggles>, keys: Res<ButtonInput<KeyCode>>) {
    if keys.just_pressed(KeyCode::KeyH) {
        toggles.show_help = !toggles.show_help;
    }
}

fn settings_toggle(mut toggles: ResMut<HudToggles>, keys: Res<ButtonInput<KeyCode>>) {
    if keys.just_pressed(KeyCode::F1) {
        toggles.show_settings = !toggles.show_settings;
    }
}
