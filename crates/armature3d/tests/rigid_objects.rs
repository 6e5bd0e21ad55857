use approx::assert_relative_eq;
use armature3d::prelude::*;
use std::collections::HashSet;
use std::f32::consts::FRAC_PI_2;

fn world_without_backend() -> PhysicsWorld {
    let config = WorldConfig {
        backend: BackendKind::None,
        gravity: [0.0, 0.0, 0.0],
        ..WorldConfig::default()
    };
    PhysicsWorld::new(config).unwrap()
}

fn undamped(handle: &str, mass: Real) -> ObjectAttributes {
    ObjectAttributes {
        mass,
        linear_damping: 0.0,
        angular_damping: 0.0,
        ..ObjectAttributes::new(handle)
    }
}

#[test]
fn new_objects_are_alive_with_unique_ids() {
    let mut world = world_without_backend();
    let keys: Vec<_> = (0..5)
        .map(|_| world.add_rigid_object(&ObjectAttributes::new("box")).unwrap())
        .collect();

    let ids: HashSet<_> = keys
        .iter()
        .map(|key| world.object(*key).unwrap().id())
        .collect();
    assert_eq!(ids.len(), keys.len());
    for key in keys {
        assert!(world.is_alive(key));
        assert!(world.object(key).unwrap().is_alive());
    }
}

#[test]
fn removed_objects_reject_mutations() {
    let mut world = world_without_backend();
    let key = world.add_rigid_object(&undamped("ball", 3.0)).unwrap();
    let handle = world.object(key).unwrap().handle().to_string();

    let mut removed = world.remove_object(key).unwrap();
    assert!(!removed.is_alive());
    assert!(!world.is_alive(key));
    assert_eq!(world.key_by_handle(&handle), None);

    // Getters keep working on the last known state.
    assert_eq!(removed.as_dynamics().unwrap().mass(), 3.0);

    let dead = |result: PhysicsResult<()>| matches!(result, Err(PhysicsError::DeadHandle { .. }));
    assert!(dead(removed.set_translation(Vector::x())));
    assert!(dead(removed.set_motion_type(MotionType::Kinematic)));
    assert!(dead(
        removed
            .as_dynamics_mut()
            .unwrap()
            .apply_force(Vector::y(), Vector::zeros())
    ));
    assert!(matches!(
        world.object(key),
        Err(PhysicsError::DeadHandle { .. })
    ));
    assert!(world.remove_object(key).is_err());
}

#[test]
fn static_objects_always_reject_forces() {
    let mut world = world_without_backend();
    let key = world.add_rigid_object(&ObjectAttributes::new("box")).unwrap();

    for _ in 0..3 {
        let object = world.rigid_object_mut(key).unwrap();
        object.set_motion_type(MotionType::Dynamic).unwrap();
        object.set_motion_type(MotionType::Static).unwrap();
        let err = object
            .apply_force(Vector::new(0.0, 10.0, 0.0), Vector::zeros())
            .unwrap_err();
        assert!(matches!(
            err,
            PhysicsError::MotionType {
                operation: "apply_force",
                motion_type: MotionType::Static,
                ..
            }
        ));
        assert!(object.rigid_base().pending_loads().is_empty());
    }
}

#[test]
fn motion_type_change_discards_group_override() {
    let mut world = world_without_backend();
    let key = world.add_rigid_object(&ObjectAttributes::new("box")).unwrap();
    let object = world.rigid_object_mut(key).unwrap();

    object
        .override_collision_group(CollisionGroup::USER_GROUP3)
        .unwrap();
    assert_eq!(object.collision_group(), CollisionGroup::USER_GROUP3);
    assert!(object.is_collision_group_overridden());

    object.set_motion_type(MotionType::Kinematic).unwrap();
    assert_eq!(object.collision_group(), CollisionGroup::KINEMATIC);
    assert!(!object.is_collision_group_overridden());

    // An override made after the motion type change sticks.
    object.override_collision_group(CollisionGroup::ROBOT).unwrap();
    assert_eq!(object.collision_group(), CollisionGroup::ROBOT);
}

#[test]
fn force_at_com_changes_velocity_by_f_dt_over_m() {
    let mut world = world_without_backend();
    let key = world.add_rigid_object(&undamped("crate", 2.0)).unwrap();
    world
        .rigid_object_mut(key)
        .unwrap()
        .apply_force(Vector::new(0.0, 10.0, 0.0), Vector::zeros())
        .unwrap();

    let dt = world.config().timestep;
    world.step().unwrap();

    let object = world.rigid_object(key).unwrap();
    assert_relative_eq!(
        object.linear_velocity(),
        Vector::new(0.0, 10.0 * dt / 2.0, 0.0),
        epsilon = 1.0e-6
    );
    assert!(object.rigid_base().pending_loads().is_empty());

    // The force was consumed: the next step keeps the velocity.
    world.step().unwrap();
    assert_relative_eq!(
        world.rigid_object(key).unwrap().linear_velocity().y,
        10.0 * dt / 2.0,
        epsilon = 1.0e-6
    );
}

#[test]
fn impulses_apply_in_queue_order() {
    let mut world = world_without_backend();
    let key = world.add_rigid_object(&undamped("puck", 1.0)).unwrap();
    let object = world.rigid_object_mut(key).unwrap();
    object.apply_impulse(Vector::x(), Vector::zeros()).unwrap();
    object.apply_impulse(-Vector::x(), Vector::zeros()).unwrap();
    object.apply_impulse(Vector::z(), Vector::zeros()).unwrap();
    assert_eq!(object.rigid_base().pending_loads().len(), 3);

    world.step_by(0.5).unwrap();
    let object = world.rigid_object(key).unwrap();
    assert_relative_eq!(object.linear_velocity(), Vector::z(), epsilon = 1.0e-6);
    assert_relative_eq!(object.translation(), Vector::new(0.0, 0.0, 0.5), epsilon = 1.0e-6);
}

#[test]
fn sleeping_objects_do_not_move() {
    let mut world = world_without_backend();
    world.set_gravity(Vector::new(0.0, -9.8, 0.0)).unwrap();
    let key = world.add_rigid_object(&ObjectAttributes::new("box")).unwrap();
    world.rigid_object_mut(key).unwrap().set_active(false).unwrap();

    world.step().unwrap();
    let object = world.rigid_object(key).unwrap();
    assert!(!object.is_active());
    assert_eq!(object.translation(), Vector::zeros());
}

#[test]
fn kinematic_velocity_control_moves_the_object() {
    let mut world = world_without_backend();
    let attributes = ObjectAttributes {
        motion_type: MotionType::Kinematic,
        ..ObjectAttributes::new("platform")
    };
    let key = world.add_rigid_object(&attributes).unwrap();
    {
        let control = world
            .rigid_object_mut(key)
            .unwrap()
            .velocity_control_mut()
            .unwrap();
        control.lin_vel = Vector::new(2.0, 0.0, 0.0);
        control.controlling_lin_vel = true;
    }

    world.step_by(0.25).unwrap();
    assert_relative_eq!(
        world.rigid_object(key).unwrap().translation(),
        Vector::new(0.5, 0.0, 0.0),
        epsilon = 1.0e-6
    );
}

#[test]
fn kinematic_objects_reject_dynamics_setters_but_report_values() {
    let mut world = world_without_backend();
    let key = world.add_rigid_object(&undamped("box", 4.0)).unwrap();
    let object = world.rigid_object_mut(key).unwrap();
    object.set_motion_type(MotionType::Kinematic).unwrap();

    assert!(matches!(
        object.set_mass(1.0),
        Err(PhysicsError::MotionType { .. })
    ));
    assert!(object.set_linear_velocity(Vector::x()).is_err());
    assert_eq!(object.mass(), 4.0);
}

#[test]
fn local_and_world_rotations_differ() {
    let mut world = world_without_backend();
    let key = world.add_rigid_object(&ObjectAttributes::new("arrow")).unwrap();
    let object = world.rigid_object_mut(key).unwrap();
    object.set_translation(Vector::new(1.0, 0.0, 0.0)).unwrap();

    // Local rotations keep the translation.
    object.rotate_y_local(FRAC_PI_2).unwrap();
    assert_relative_eq!(object.translation(), Vector::new(1.0, 0.0, 0.0), epsilon = 1.0e-6);

    // World rotations turn about the world origin.
    object.rotate_z(FRAC_PI_2).unwrap();
    assert_relative_eq!(object.translation(), Vector::new(0.0, 1.0, 0.0), epsilon = 1.0e-6);

    object.translate_local(Vector::new(0.0, 0.0, 1.0)).unwrap();
    let expected = object.rotation() * Vector::z() + Vector::new(0.0, 1.0, 0.0);
    assert_relative_eq!(object.translation(), expected, epsilon = 1.0e-6);
}

#[test]
fn non_rigid_transformations_are_rejected() {
    let mut world = world_without_backend();
    let key = world.add_rigid_object(&ObjectAttributes::new("box")).unwrap();
    let object = world.rigid_object_mut(key).unwrap();
    let before = object.transformation();
    assert!(object
        .set_transformation(&Matrix4::new_scaling(2.0))
        .is_err());
    assert_eq!(object.transformation(), before);
}

#[test]
fn backend_queries_are_unsupported_without_a_backend() {
    let mut world = world_without_backend();
    let key = world.add_rigid_object(&ObjectAttributes::new("box")).unwrap();

    assert!(!world.has_backend());
    assert!(world.contact_test(key).unwrap_err().is_unsupported());
    assert!(world.collision_shape_aabb(key).unwrap_err().is_unsupported());
    assert!(world.collision_margin(key).unwrap_err().is_unsupported());
    assert!(world
        .set_collision_margin(key, 0.1)
        .unwrap_err()
        .is_unsupported());
}

#[test]
fn scene_nodes_follow_the_object() {
    let mut world = world_without_backend();
    let attributes = ObjectAttributes {
        render_asset_handles: vec!["mesh.glb".to_string()],
        ..ObjectAttributes::new("chair")
    };
    let key = world.add_rigid_object(&attributes).unwrap();
    world
        .rigid_object_mut(key)
        .unwrap()
        .set_translation(Vector::new(0.0, 2.0, 0.0))
        .unwrap();
    world.update_scene_graph();

    let object = world.rigid_object(key).unwrap();
    assert_eq!(object.visual_scene_nodes().len(), 1);
    let visual = object.visual_scene_nodes()[0];
    let pose = world.scene().absolute_transformation(visual).unwrap();
    assert_relative_eq!(pose.translation.vector, Vector::new(0.0, 2.0, 0.0));
}
