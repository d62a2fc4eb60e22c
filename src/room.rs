use bevy::color::LinearRgba;
use bevy::prelude::*;

pub const ROOM_HALF_EXTENT: f32 = 5.0;
pub const ROOM_HEIGHT: f32 = 3.0;
const WALL_THICKNESS: f32 = 0.1;

pub const TRIGGER_POSITION: Vec3 = Vec3::new(0.0, 1.5, 4.95);
pub const TRIGGER_SIZE: Vec3 = Vec3::new(0.5, 0.3, 0.05);

pub struct RoomPlugin;
impl Plugin for RoomPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(AmbientLight {
            color: Color::WHITE,
            brightness: 250.0,
        })
        .add_systems(Startup, (spawn_room, spawn_table, spawn_trigger, spawn_props));
    }
}

/// The light whose intensity flickers during a run.
#[derive(Component)]
pub struct FlickerLight;

#[derive(Component)]
pub struct StartTrigger;

/// Axis-aligned half extents used when casting pointer rays at an entity.
#[derive(Component, Clone, Copy, Debug)]
pub struct PickBounds {
    pub half_extents: Vec3,
}

/// Decorative object rattled by the shake. Remembers where it belongs.
#[derive(Component)]
pub struct ShakeProp {
    pub rest: Vec3,
}

fn spawn_room(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let size = ROOM_HALF_EXTENT * 2.0;

    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Plane3d::default().mesh().size(size, size)),
            material: materials.add(StandardMaterial {
                base_color: Color::srgb(0.6, 0.7, 0.5),
                perceptual_roughness: 0.9,
                ..default()
            }),
            ..default()
        },
        Name::new("floor"),
    ));

    let wall_mesh = meshes.add(Cuboid::new(size, ROOM_HEIGHT, WALL_THICKNESS));
    let wall_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.9, 0.8, 0.8),
        ..default()
    });
    let half_height = ROOM_HEIGHT * 0.5;
    let walls = [
        ("wall_back", Vec3::new(0.0, half_height, -ROOM_HALF_EXTENT), 0.0),
        ("wall_front", Vec3::new(0.0, half_height, ROOM_HALF_EXTENT), 0.0),
        (
            "wall_right",
            Vec3::new(ROOM_HALF_EXTENT, half_height, 0.0),
            std::f32::consts::FRAC_PI_2,
        ),
        (
            "wall_left",
            Vec3::new(-ROOM_HALF_EXTENT, half_height, 0.0),
            std::f32::consts::FRAC_PI_2,
        ),
    ];
    for (name, pos, yaw) in walls {
        commands.spawn((
            PbrBundle {
                mesh: wall_mesh.clone(),
                material: wall_material.clone(),
                transform: Transform::from_translation(pos)
                    .with_rotation(Quat::from_rotation_y(yaw)),
                ..default()
            },
            Name::new(name),
        ));
    }

    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Cuboid::new(size, WALL_THICKNESS, size)),
            material: materials.add(StandardMaterial {
                base_color: Color::srgb(0.85, 0.85, 0.85),
                emissive: LinearRgba::rgb(0.3, 0.3, 0.3),
                double_sided: true,
                cull_mode: None,
                ..default()
            }),
            transform: Transform::from_xyz(0.0, ROOM_HEIGHT, 0.0),
            ..default()
        },
        Name::new("ceiling"),
    ));

    commands.spawn((
        PointLightBundle {
            point_light: PointLight {
                intensity: 400_000.0,
                range: 20.0,
                shadows_enabled: true,
                ..default()
            },
            transform: Transform::from_xyz(0.0, ROOM_HEIGHT - 0.2, 0.0),
            ..default()
        },
        FlickerLight,
        Name::new("room_light"),
    ));

    commands.spawn((
        DirectionalLightBundle {
            directional_light: DirectionalLight {
                illuminance: 1_500.0,
                ..default()
            },
            transform: Transform::from_xyz(0.0, ROOM_HEIGHT, 0.0)
                .looking_at(Vec3::new(0.3, 0.0, 0.2), Vec3::Y),
            ..default()
        },
        Name::new("fill_light"),
    ));
}

fn spawn_table(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let wood = materials.add(StandardMaterial {
        base_color: Color::srgb(0.6, 0.3, 0.0),
        ..default()
    });

    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Cuboid::new(2.0, 0.2, 1.5)),
            material: wood.clone(),
            transform: Transform::from_xyz(0.0, 1.2, 0.0),
            ..default()
        },
        Name::new("table_top"),
    ));

    let leg = meshes.add(Cuboid::new(0.2, 1.0, 0.2));
    for (x, z) in [(0.9, 0.65), (0.9, -0.65), (-0.9, 0.65), (-0.9, -0.65)] {
        commands.spawn((
            PbrBundle {
                mesh: leg.clone(),
                material: wood.clone(),
                transform: Transform::from_xyz(x, 0.7, z),
                ..default()
            },
            Name::new("table_leg"),
        ));
    }
}

fn spawn_trigger(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Cuboid::from_size(TRIGGER_SIZE)),
            material: materials.add(StandardMaterial {
                base_color: Color::srgb(0.0, 1.0, 0.0),
                emissive: LinearRgba::rgb(0.0, 0.6, 0.0),
                ..default()
            }),
            transform: Transform::from_translation(TRIGGER_POSITION),
            ..default()
        },
        StartTrigger,
        PickBounds {
            half_extents: TRIGGER_SIZE * 0.5,
        },
        Name::new("start_trigger"),
    ));
}

fn spawn_props(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let crate_mesh = meshes.add(Cuboid::new(0.5, 0.5, 0.5));
    let crate_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.45, 0.35, 0.2),
        ..default()
    });
    for rest in [Vec3::new(3.2, 0.25, 3.0), Vec3::new(-3.4, 0.25, 2.4)] {
        commands.spawn((
            PbrBundle {
                mesh: crate_mesh.clone(),
                material: crate_material.clone(),
                transform: Transform::from_translation(rest),
                ..default()
            },
            ShakeProp { rest },
            Name::new("crate"),
        ));
    }

    // Lamp standing on the table top.
    let rest = Vec3::new(0.6, 1.7, 0.3);
    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Cylinder::new(0.12, 0.8)),
            material: materials.add(StandardMaterial {
                base_color: Color::srgb(0.9, 0.85, 0.5),
                emissive: LinearRgba::rgb(0.4, 0.35, 0.1),
                ..default()
            }),
            transform: Transform::from_translation(rest),
            ..default()
        },
        ShakeProp { rest },
        Name::new("lamp"),
    ));
}
