#![cfg(feature = "rapier")]

use approx::assert_relative_eq;
use armature3d::prelude::*;

fn rapier_world(gravity: [Real; 3]) -> PhysicsWorld {
    let config = WorldConfig {
        backend: BackendKind::Rapier,
        gravity,
        ..WorldConfig::default()
    };
    PhysicsWorld::new(config).unwrap()
}

fn ball(handle: &str) -> ObjectAttributes {
    ObjectAttributes {
        collision_shape: Some(CollisionShape::ball(0.5)),
        linear_damping: 0.0,
        angular_damping: 0.0,
        ..ObjectAttributes::new(handle)
    }
}

fn add_ball_at(world: &mut PhysicsWorld, handle: &str, translation: Vector) -> ObjectKey {
    let key = world.add_rigid_object(&ball(handle)).unwrap();
    world
        .rigid_object_mut(key)
        .unwrap()
        .set_translation(translation)
        .unwrap();
    key
}

#[test]
fn objects_are_named_after_the_backend() {
    let mut world = rapier_world([0.0, -9.8, 0.0]);
    assert!(world.has_backend());
    assert_eq!(world.backend_name(), "rapier");

    let key = world.add_rigid_object(&ball("ball")).unwrap();
    let object = world.object(key).unwrap();
    assert_eq!(object.template_class(), "RapierRigidObject");
    assert_eq!(object.handle(), "ball_:0000");

    let arm = world
        .add_articulated_object(&ArticulatedObjectAttributes::new(
            "arm",
            vec![LinkAttributes::new("l0", None, JointType::Revolute)],
        ))
        .unwrap();
    assert_eq!(
        world.object(arm).unwrap().template_class(),
        "RapierArticulatedObject"
    );
}

#[test]
fn dynamic_objects_fall() {
    let mut world = rapier_world([0.0, -9.8, 0.0]);
    let key = add_ball_at(&mut world, "ball", Vector::new(0.0, 10.0, 0.0));

    for _ in 0..30 {
        world.step().unwrap();
    }
    let object = world.rigid_object(key).unwrap();
    assert!(object.translation().y < 10.0);
    assert!(object.linear_velocity().y < 0.0);
    assert_relative_eq!(object.translation().x, 0.0, epsilon = 1.0e-5);
}

#[test]
fn static_objects_stay_put() {
    let mut world = rapier_world([0.0, -9.8, 0.0]);
    let attributes = ObjectAttributes {
        motion_type: MotionType::Static,
        ..ball("floor")
    };
    let key = world.add_rigid_object(&attributes).unwrap();

    for _ in 0..10 {
        world.step().unwrap();
    }
    assert_eq!(world.rigid_object(key).unwrap().translation(), Vector::zeros());
}

#[test]
fn pose_writes_before_a_step_are_kept() {
    let mut world = rapier_world([0.0, 0.0, 0.0]);
    let key = world.add_rigid_object(&ball("ball")).unwrap();
    world.step().unwrap();

    world
        .rigid_object_mut(key)
        .unwrap()
        .set_translation(Vector::new(5.0, 5.0, 5.0))
        .unwrap();
    world.step().unwrap();

    assert_relative_eq!(
        world.rigid_object(key).unwrap().translation(),
        Vector::new(5.0, 5.0, 5.0),
        epsilon = 1.0e-4
    );
}

#[test]
fn queued_force_is_applied_once() {
    let mut world = rapier_world([0.0, 0.0, 0.0]);
    let key = world.add_rigid_object(&ball("ball")).unwrap();
    world
        .rigid_object_mut(key)
        .unwrap()
        .apply_impulse(Vector::new(2.0, 0.0, 0.0), Vector::zeros())
        .unwrap();

    world.step().unwrap();
    let velocity = world.rigid_object(key).unwrap().linear_velocity();
    assert_relative_eq!(velocity.x, 2.0, epsilon = 1.0e-3);
    assert!(world.rigid_object(key).unwrap().rigid_base().pending_loads().is_empty());

    world.step().unwrap();
    let velocity = world.rigid_object(key).unwrap().linear_velocity();
    assert_relative_eq!(velocity.x, 2.0, epsilon = 1.0e-3);
}

#[test]
fn contact_test_sees_overlapping_objects() {
    let mut world = rapier_world([0.0, 0.0, 0.0]);
    let a = add_ball_at(&mut world, "a", Vector::zeros());
    let b = add_ball_at(&mut world, "b", Vector::new(0.8, 0.0, 0.0));

    assert!(world.contact_test(a).unwrap());
    assert!(world.contact_test(b).unwrap());

    world
        .rigid_object_mut(b)
        .unwrap()
        .set_translation(Vector::new(3.0, 0.0, 0.0))
        .unwrap();
    assert!(!world.contact_test(a).unwrap());
}

#[test]
fn noncollidable_objects_have_no_contacts() {
    let mut world = rapier_world([0.0, 0.0, 0.0]);
    let a = add_ball_at(&mut world, "a", Vector::zeros());
    let _b = add_ball_at(&mut world, "b", Vector::new(0.5, 0.0, 0.0));

    world
        .rigid_object_mut(a)
        .unwrap()
        .override_collision_group(CollisionGroup::NONCOLLIDABLE)
        .unwrap();
    assert!(!world.contact_test(a).unwrap());
}

#[test]
fn aabb_and_margin_queries() {
    let mut world = rapier_world([0.0, 0.0, 0.0]);
    let key = world.add_rigid_object(&ball("ball")).unwrap();

    let aabb = world.collision_shape_aabb(key).unwrap();
    assert_relative_eq!(aabb.half_extents(), Vector::repeat(0.5), epsilon = 1.0e-6);

    assert_relative_eq!(world.collision_margin(key).unwrap(), 0.04);
    world.set_collision_margin(key, 0.1).unwrap();
    assert_relative_eq!(world.collision_margin(key).unwrap(), 0.1);
    assert!(world.set_collision_margin(key, -1.0).is_err());

    let arm = world
        .add_articulated_object(&ArticulatedObjectAttributes::new("arm", vec![]))
        .unwrap();
    assert!(matches!(
        world.collision_margin(arm),
        Err(PhysicsError::WrongKind { .. })
    ));
}

fn drop_ball_on_floor(ball_group: Option<CollisionGroup>) -> (PhysicsWorld, ObjectKey) {
    let mut world = rapier_world([0.0, -9.8, 0.0]);
    let floor = ObjectAttributes {
        motion_type: MotionType::Static,
        ..ball("floor")
    };
    world.add_rigid_object(&floor).unwrap();
    let key = add_ball_at(&mut world, "ball", Vector::new(0.0, 1.2, 0.0));
    if let Some(group) = ball_group {
        world
            .rigid_object_mut(key)
            .unwrap()
            .override_collision_group(group)
            .unwrap();
    }
    for _ in 0..120 {
        world.step().unwrap();
    }
    (world, key)
}

#[test]
fn collision_groups_filter_the_simulation() {
    let (world, resting) = drop_ball_on_floor(None);
    assert!(world.rigid_object(resting).unwrap().translation().y > 0.5);

    // KINEMATIC and STATIC never touch, so the ball falls through the floor.
    let (world, falling) = drop_ball_on_floor(Some(CollisionGroup::KINEMATIC));
    assert!(world.rigid_object(falling).unwrap().translation().y < -1.0);
}
