//! Rapier-backed solver.

use super::{BodyDesc, BodyKey, BodyState, BodySync, PhysicsBackend};
use crate::dynamics::Load;
use crate::error::{PhysicsError, PhysicsResult};
use crate::math::{Point, Real, Vector};
use crate::object::{CollisionGroup, MotionType, ObjectId};
use crate::shapes::{Aabb, CollisionShape};
use rapier::parry::query;
use rapier::prelude::{
    CCDSolver, ColliderBuilder, ColliderHandle, ColliderSet, DefaultBroadPhase, Group,
    ImpulseJointSet, IntegrationParameters, InteractionGroups, IslandManager, MassProperties,
    MultibodyJointSet, NarrowPhase, PhysicsPipeline, RigidBody, RigidBodyBuilder,
    RigidBodyHandle, RigidBodySet, RigidBodyType, SharedShape,
};
use std::collections::HashMap;

#[derive(Copy, Clone, Debug)]
struct BodyEntry {
    body: RigidBodyHandle,
    collider: Option<ColliderHandle>,
    group: CollisionGroup,
    collidable: bool,
}

/// Simulates rigid objects with rapier.
///
/// Articulated links are inserted as kinematic bodies following the poses
/// computed by the articulated objects themselves, so they take part in
/// collisions and contact tests without being driven by rapier.
pub struct RapierBackend {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    entries: HashMap<BodyKey, BodyEntry>,
    owners: HashMap<ColliderHandle, BodyKey>,
}

impl Default for RapierBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierBackend {
    /// An empty rapier world.
    pub fn new() -> Self {
        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            params: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            entries: HashMap::new(),
            owners: HashMap::new(),
        }
    }

    /// Number of rapier bodies.
    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    fn entry(&self, key: BodyKey) -> PhysicsResult<BodyEntry> {
        self.entries
            .get(&key)
            .copied()
            .ok_or_else(|| PhysicsError::Backend(format!("no rapier body for {key:?}")))
    }

    fn body_mut(&mut self, key: BodyKey) -> PhysicsResult<(BodyEntry, &mut RigidBody)> {
        let entry = self.entry(key)?;
        let body = self
            .bodies
            .get_mut(entry.body)
            .ok_or_else(|| PhysicsError::Backend(format!("stale rapier body for {key:?}")))?;
        Ok((entry, body))
    }

    fn shape_entry(&self, key: BodyKey, operation: &'static str) -> PhysicsResult<ColliderHandle> {
        self.entry(key)?.collider.ok_or_else(|| {
            PhysicsError::invalid("collision shape", format!("`{operation}` on a body without one"))
        })
    }
}

fn body_type(motion_type: MotionType) -> RigidBodyType {
    match motion_type {
        MotionType::Static => RigidBodyType::Fixed,
        MotionType::Kinematic => RigidBodyType::KinematicPositionBased,
        MotionType::Dynamic => RigidBodyType::Dynamic,
    }
}

fn shared_shape(shape: &CollisionShape) -> SharedShape {
    match *shape {
        CollisionShape::Ball { radius } => SharedShape::ball(radius),
        CollisionShape::Cuboid { half_extents } => {
            SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }
        CollisionShape::Capsule {
            half_height,
            radius,
        } => SharedShape::capsule_y(half_height, radius),
        CollisionShape::Cylinder {
            half_height,
            radius,
        } => SharedShape::cylinder(half_height, radius),
        CollisionShape::Cone {
            half_height,
            radius,
        } => SharedShape::cone(half_height, radius),
    }
}

fn mass_properties(desc: &BodyDesc) -> MassProperties {
    MassProperties::new(Point::from(desc.com), desc.mass, desc.inertia_diagonal)
}

/// Rapier groups mirroring the membership and mask of a collision group.
fn interaction_groups(group: CollisionGroup) -> InteractionGroups {
    InteractionGroups::new(
        Group::from_bits_truncate(group.bits()),
        Group::from_bits_truncate(group.mask().bits()),
    )
}

fn collider_enabled(desc: &BodyDesc) -> bool {
    desc.collidable && !desc.collision_group.contains(CollisionGroup::NONCOLLIDABLE)
}

impl PhysicsBackend for RapierBackend {
    fn name(&self) -> &str {
        "rapier"
    }

    fn class_prefix(&self) -> &str {
        "Rapier"
    }

    fn simulates_dynamics(&self) -> bool {
        true
    }

    fn insert_body(&mut self, key: BodyKey, desc: &BodyDesc) -> PhysicsResult<()> {
        if self.entries.contains_key(&key) {
            return Err(PhysicsError::Backend(format!("{key:?} already inserted")));
        }

        // Articulated links follow the poses computed by their object.
        let rb_type = if key.link.is_some() {
            RigidBodyType::KinematicPositionBased
        } else {
            body_type(desc.motion_type)
        };
        let rb = RigidBodyBuilder::new(rb_type)
            .position(desc.pose)
            .linvel(desc.linvel)
            .angvel(desc.angvel)
            .linear_damping(desc.linear_damping)
            .angular_damping(desc.angular_damping)
            .additional_mass_properties(mass_properties(desc))
            .sleeping(!desc.awake)
            .build();
        let body = self.bodies.insert(rb);

        let collider = desc.shape.as_ref().map(|shape| {
            let co = ColliderBuilder::new(shared_shape(shape))
                .density(0.0)
                .friction(desc.friction)
                .restitution(desc.restitution)
                .contact_skin(desc.margin)
                .collision_groups(interaction_groups(desc.collision_group))
                .enabled(collider_enabled(desc))
                .build();
            self.colliders
                .insert_with_parent(co, body, &mut self.bodies)
        });

        if let Some(handle) = collider {
            self.owners.insert(handle, key);
        }
        self.entries.insert(
            key,
            BodyEntry {
                body,
                collider,
                group: desc.collision_group,
                collidable: collider_enabled(desc),
            },
        );
        log::trace!("inserted rapier body for {key:?}");
        Ok(())
    }

    fn update_body(&mut self, key: BodyKey, desc: &BodyDesc, sync: BodySync) -> PhysicsResult<()> {
        let is_link = key.link.is_some();
        let (entry, rb) = self.body_mut(key)?;

        if sync.properties && !is_link {
            rb.set_body_type(body_type(desc.motion_type), true);
            rb.set_additional_mass_properties(mass_properties(desc), true);
        }
        if sync.pose {
            if rb.is_kinematic() {
                rb.set_next_kinematic_position(desc.pose);
            }
            rb.set_position(desc.pose, true);
        }
        if sync.velocity && !is_link {
            rb.set_linvel(desc.linvel, false);
            rb.set_angvel(desc.angvel, false);
            rb.set_linear_damping(desc.linear_damping);
            rb.set_angular_damping(desc.angular_damping);
            if desc.awake {
                rb.wake_up(true);
            } else {
                rb.sleep();
            }
        }

        if sync.properties {
            let enabled = collider_enabled(desc);
            if let Some(co) = entry.collider.and_then(|h| self.colliders.get_mut(h)) {
                co.set_friction(desc.friction);
                co.set_restitution(desc.restitution);
                co.set_collision_groups(interaction_groups(desc.collision_group));
                co.set_enabled(enabled);
            }
            if let Some(entry) = self.entries.get_mut(&key) {
                entry.group = desc.collision_group;
                entry.collidable = enabled;
            }
        }
        Ok(())
    }

    fn remove_object(&mut self, object: ObjectId) {
        let keys: Vec<BodyKey> = self
            .entries
            .keys()
            .filter(|key| key.object == object)
            .copied()
            .collect();
        for key in keys {
            if let Some(entry) = self.entries.remove(&key) {
                if let Some(collider) = entry.collider {
                    self.owners.remove(&collider);
                }
                self.bodies.remove(
                    entry.body,
                    &mut self.islands,
                    &mut self.colliders,
                    &mut self.impulse_joints,
                    &mut self.multibody_joints,
                    true,
                );
            }
        }
    }

    fn apply_loads(&mut self, key: BodyKey, loads: &[Load]) -> PhysicsResult<()> {
        let (_, rb) = self.body_mut(key)?;
        let com = *rb.center_of_mass();
        for load in loads {
            match *load {
                Load::Force {
                    force,
                    relative_position,
                } => rb.add_force_at_point(force, com + relative_position, true),
                Load::Impulse {
                    impulse,
                    relative_position,
                } => rb.apply_impulse_at_point(impulse, com + relative_position, true),
                Load::Torque(torque) => rb.add_torque(torque, true),
                Load::ImpulseTorque(impulse) => rb.apply_torque_impulse(impulse, true),
            }
        }
        Ok(())
    }

    fn discard_loads(&mut self) {
        for (_, rb) in self.bodies.iter_mut() {
            rb.reset_forces(false);
            rb.reset_torques(false);
        }
    }

    fn step(&mut self, dt: Real, gravity: &Vector) -> PhysicsResult<()> {
        self.params.dt = dt;
        self.pipeline.step(
            gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );

        // Forces only last for the step they were applied in.
        self.discard_loads();
        Ok(())
    }

    fn body_state(&self, key: BodyKey) -> PhysicsResult<BodyState> {
        let entry = self.entry(key)?;
        let rb = self
            .bodies
            .get(entry.body)
            .ok_or_else(|| PhysicsError::Backend(format!("stale rapier body for {key:?}")))?;
        Ok(BodyState {
            pose: *rb.position(),
            linvel: *rb.linvel(),
            angvel: *rb.angvel(),
            awake: !rb.is_sleeping(),
        })
    }

    fn contact_test(&self, object: ObjectId) -> PhysicsResult<bool> {
        let world_shape = |handle: ColliderHandle| {
            let co = self.colliders.get(handle)?;
            let parent = co.parent().and_then(|h| self.bodies.get(h))?;
            let pose = co
                .position_wrt_parent()
                .map(|local| parent.position() * local)
                .unwrap_or(*co.position());
            Some((pose, co.shape()))
        };

        for entry in self
            .entries
            .iter()
            .filter(|(key, entry)| key.object == object && entry.collidable)
            .map(|(_, entry)| entry)
        {
            let Some((pose1, shape1)) = entry.collider.and_then(world_shape) else {
                continue;
            };
            for (&handle, other_key) in &self.owners {
                if other_key.object == object {
                    continue;
                }
                let Some(other) = self.entries.get(other_key) else {
                    continue;
                };
                if !other.collidable || !entry.group.interacts_with(other.group) {
                    continue;
                }
                let Some((pose2, shape2)) = world_shape(handle) else {
                    continue;
                };
                let hit = query::intersection_test(&pose1, shape1, &pose2, shape2)
                    .map_err(|e| PhysicsError::Backend(format!("{e:?}")))?;
                if hit {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn collision_shape_aabb(&self, key: BodyKey) -> PhysicsResult<Aabb> {
        let handle = self.shape_entry(key, "collision_shape_aabb")?;
        let co = &self.colliders[handle];
        let aabb = co.shape().compute_local_aabb();
        Ok(Aabb::new(aabb.mins, aabb.maxs))
    }

    fn collision_margin(&self, key: BodyKey) -> PhysicsResult<Real> {
        let handle = self.shape_entry(key, "collision_margin")?;
        Ok(self.colliders[handle].contact_skin())
    }

    fn set_collision_margin(&mut self, key: BodyKey, margin: Real) -> PhysicsResult<()> {
        let handle = self.shape_entry(key, "set_collision_margin")?;
        self.colliders[handle].set_contact_skin(margin);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Isometry;
    use approx::assert_relative_eq;

    fn ball_desc(pose: Isometry) -> BodyDesc {
        BodyDesc {
            motion_type: MotionType::Dynamic,
            pose,
            linvel: Vector::zeros(),
            angvel: Vector::zeros(),
            mass: 1.0,
            inertia_diagonal: Vector::repeat(0.1),
            com: Vector::zeros(),
            linear_damping: 0.0,
            angular_damping: 0.0,
            friction: 0.5,
            restitution: 0.0,
            collidable: true,
            collision_group: CollisionGroup::DYNAMIC,
            shape: Some(CollisionShape::ball(0.5)),
            margin: 0.04,
            awake: true,
        }
    }

    #[test]
    fn overlapping_balls_are_in_contact() {
        let mut backend = RapierBackend::new();
        let a = BodyKey::rigid(ObjectId(0));
        let b = BodyKey::rigid(ObjectId(1));
        backend.insert_body(a, &ball_desc(Isometry::identity())).unwrap();
        backend
            .insert_body(b, &ball_desc(Isometry::translation(0.8, 0.0, 0.0)))
            .unwrap();
        assert!(backend.contact_test(ObjectId(0)).unwrap());

        backend
            .update_body(
                b,
                &ball_desc(Isometry::translation(3.0, 0.0, 0.0)),
                BodySync::all(),
            )
            .unwrap();
        assert!(!backend.contact_test(ObjectId(0)).unwrap());
    }

    #[test]
    fn collider_groups_follow_the_object() {
        let mut backend = RapierBackend::new();
        let key = BodyKey::rigid(ObjectId(0));
        let mut desc = ball_desc(Isometry::identity());
        backend.insert_body(key, &desc).unwrap();
        let collider = backend.entries[&key].collider.unwrap();
        assert_eq!(
            backend.colliders[collider].collision_groups(),
            interaction_groups(CollisionGroup::DYNAMIC)
        );

        desc.collision_group = CollisionGroup::KINEMATIC;
        backend
            .update_body(
                key,
                &desc,
                BodySync {
                    properties: true,
                    ..Default::default()
                },
            )
            .unwrap();
        let groups = backend.colliders[collider].collision_groups();
        assert_eq!(groups.memberships, Group::from_bits_truncate(CollisionGroup::KINEMATIC.bits()));
        assert!(!groups.filter.contains(Group::from_bits_truncate(CollisionGroup::STATIC.bits())));
    }

    #[test]
    fn local_aabb_and_margin() {
        let mut backend = RapierBackend::new();
        let key = BodyKey::rigid(ObjectId(0));
        backend.insert_body(key, &ball_desc(Isometry::identity())).unwrap();
        let aabb = backend.collision_shape_aabb(key).unwrap();
        assert_relative_eq!(aabb.half_extents(), Vector::repeat(0.5));
        backend.set_collision_margin(key, 0.1).unwrap();
        assert_relative_eq!(backend.collision_margin(key).unwrap(), 0.1);
    }

    #[test]
    fn removing_an_object_removes_its_bodies() {
        let mut backend = RapierBackend::new();
        backend
            .insert_body(BodyKey::rigid(ObjectId(3)), &ball_desc(Isometry::identity()))
            .unwrap();
        backend.remove_object(ObjectId(3));
        assert_eq!(backend.num_bodies(), 0);
        assert!(backend.body_state(BodyKey::rigid(ObjectId(3))).is_err());
    }
}
