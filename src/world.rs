//! The world: object arena, stepping and backend synchronization.

use crate::articulated::{ArticulatedObject, Link};
use crate::attributes::{ArticulatedObjectAttributes, ObjectAttributes};
use crate::backend::{BodyDesc, BodyKey, BodySync, NullBackend, PhysicsBackend};
use crate::config::{BackendKind, WorldConfig};
use crate::dynamics::integrate::integrate_rigid_object;
use crate::dynamics::{DynamicsCapable, RigidBase, RigidObject};
use crate::error::{check_non_negative, check_positive, PhysicsError, PhysicsResult};
use crate::math::{Isometry, Real, Vector};
use crate::object::{MotionState, MotionType, ObjectCore, ObjectId, PhysicsObject, PhysicsObjectBase};
use crate::scene::{NodeId, NodeKind, SceneTree};
use crate::shapes::Aabb;
use slotmap::{new_key_type, SlotMap};
use std::collections::{BTreeSet, HashMap};

new_key_type! {
    /// Stale-safe reference to an object of a [`PhysicsWorld`].
    ///
    /// Unlike an [`ObjectId`], a key is never reused: once its object is
    /// removed, every lookup through it fails with
    /// [`PhysicsError::DeadHandle`].
    pub struct ObjectKey;
}

/// Collision margin given to articulated link bodies.
const LINK_MARGIN: Real = 0.04;

/// Owns every physics object, the scene tree they publish to and the
/// backend that simulates them.
pub struct PhysicsWorld {
    config: WorldConfig,
    gravity: Vector,
    elapsed_time: Real,
    objects: SlotMap<ObjectKey, PhysicsObject>,
    ids: HashMap<ObjectId, ObjectKey>,
    handles: HashMap<String, ObjectKey>,
    free_ids: BTreeSet<u32>,
    next_id: u32,
    handle_counters: HashMap<String, u32>,
    scene: SceneTree,
    backend: Box<dyn PhysicsBackend>,
}

impl PhysicsWorld {
    /// A world using the backend selected by `config`.
    ///
    /// Selecting the rapier backend in a build without the `rapier` feature
    /// falls back to the null backend.
    pub fn new(config: WorldConfig) -> PhysicsResult<Self> {
        let backend: Box<dyn PhysicsBackend> = match config.backend {
            BackendKind::None => Box::new(NullBackend),
            #[cfg(feature = "rapier")]
            BackendKind::Rapier => Box::new(crate::backend::RapierBackend::new()),
            #[cfg(not(feature = "rapier"))]
            BackendKind::Rapier => {
                log::warn!("rapier backend requested but the `rapier` feature is disabled; using no backend");
                Box::new(NullBackend)
            }
        };
        Self::with_backend(config, backend)
    }

    /// A world using a custom backend.
    pub fn with_backend(
        config: WorldConfig,
        backend: Box<dyn PhysicsBackend>,
    ) -> PhysicsResult<Self> {
        config.validate()?;
        log::info!(
            "creating physics world (backend: {}, timestep: {})",
            backend.name(),
            config.timestep
        );
        Ok(Self {
            gravity: config.gravity(),
            config,
            elapsed_time: 0.0,
            objects: SlotMap::with_key(),
            ids: HashMap::new(),
            handles: HashMap::new(),
            free_ids: BTreeSet::new(),
            next_id: 0,
            handle_counters: HashMap::new(),
            scene: SceneTree::new(),
            backend,
        })
    }

    /// The configuration this world was created with.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Name of the installed backend.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Is a dynamics backend installed?
    pub fn has_backend(&self) -> bool {
        self.backend.simulates_dynamics()
    }

    /// Current gravity.
    pub fn gravity(&self) -> Vector {
        self.gravity
    }

    /// Sets the gravity.
    pub fn set_gravity(&mut self, gravity: Vector) -> PhysicsResult<()> {
        if !gravity.iter().all(|g| g.is_finite()) {
            return Err(PhysicsError::invalid("gravity", "components must be finite"));
        }
        self.gravity = gravity;
        Ok(())
    }

    /// Simulated time since creation.
    pub fn elapsed_time(&self) -> Real {
        self.elapsed_time
    }

    /// The scene tree objects publish their poses to.
    pub fn scene(&self) -> &SceneTree {
        &self.scene
    }

    /// Number of live objects.
    pub fn num_objects(&self) -> usize {
        self.objects.len()
    }

    /// Ids of the live objects, in increasing order.
    pub fn object_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<_> = self.ids.keys().copied().collect();
        ids.sort();
        ids
    }

    /// The key of the live object with the given id.
    pub fn key_by_id(&self, id: ObjectId) -> Option<ObjectKey> {
        self.ids.get(&id).copied()
    }

    /// The key of the live object with the given handle.
    pub fn key_by_handle(&self, handle: &str) -> Option<ObjectKey> {
        self.handles.get(handle).copied()
    }

    /// Is the object still in this world?
    pub fn is_alive(&self, key: ObjectKey) -> bool {
        self.objects.contains_key(key)
    }

    /// The object referenced by `key`.
    pub fn object(&self, key: ObjectKey) -> PhysicsResult<&PhysicsObject> {
        self.objects
            .get(key)
            .ok_or_else(|| ObjectCore::dead_key_error(key))
    }

    /// The object referenced by `key`, mutably.
    pub fn object_mut(&mut self, key: ObjectKey) -> PhysicsResult<&mut PhysicsObject> {
        self.objects
            .get_mut(key)
            .ok_or_else(|| ObjectCore::dead_key_error(key))
    }

    /// The rigid object referenced by `key`.
    pub fn rigid_object(&self, key: ObjectKey) -> PhysicsResult<&RigidObject> {
        let object = self.object(key)?;
        object
            .as_rigid()
            .ok_or_else(|| wrong_kind("rigid_object", object, "rigid object"))
    }

    /// The rigid object referenced by `key`, mutably.
    pub fn rigid_object_mut(&mut self, key: ObjectKey) -> PhysicsResult<&mut RigidObject> {
        match self.object_mut(key)? {
            PhysicsObject::Rigid(object) => Ok(object),
            object => Err(wrong_kind("rigid_object_mut", object, "rigid object")),
        }
    }

    /// The articulated object referenced by `key`.
    pub fn articulated_object(&self, key: ObjectKey) -> PhysicsResult<&ArticulatedObject> {
        let object = self.object(key)?;
        object
            .as_articulated()
            .ok_or_else(|| wrong_kind("articulated_object", object, "articulated object"))
    }

    /// The articulated object referenced by `key`, mutably.
    pub fn articulated_object_mut(
        &mut self,
        key: ObjectKey,
    ) -> PhysicsResult<&mut ArticulatedObject> {
        match self.object_mut(key)? {
            PhysicsObject::Articulated(object) => Ok(object),
            object => Err(wrong_kind(
                "articulated_object_mut",
                object,
                "articulated object",
            )),
        }
    }

    fn allocate_id(&mut self) -> ObjectId {
        match self.free_ids.pop_first() {
            Some(id) => ObjectId(id),
            None => {
                self.next_id += 1;
                ObjectId(self.next_id - 1)
            }
        }
    }

    fn allocate_handle(&mut self, template: &str) -> String {
        let counter = self
            .handle_counters
            .entry(template.to_string())
            .or_insert(0);
        loop {
            let handle = format!("{template}_:{:04}", *counter);
            *counter += 1;
            if !self.handles.contains_key(&handle) {
                return handle;
            }
        }
    }

    fn add_physics_node(&mut self, parent: Option<NodeId>) -> PhysicsResult<NodeId> {
        self.scene
            .add_node(parent, NodeKind::Physics)
            .ok_or_else(|| PhysicsError::invalid("scene node", "parent node does not exist"))
    }

    fn add_visual_nodes(&mut self, parent: NodeId, assets: &[String]) -> Vec<NodeId> {
        assets
            .iter()
            .filter_map(|asset| {
                self.scene.add_node(
                    Some(parent),
                    NodeKind::Visual {
                        asset: asset.clone(),
                    },
                )
            })
            .collect()
    }

    /// Undoes the bookkeeping of an object whose creation failed.
    fn abort_creation(&mut self, id: ObjectId, root: NodeId) {
        self.scene.remove_subtree(root);
        self.backend.remove_object(id);
        self.free_ids.insert(id.0);
    }

    fn register(&mut self, object: PhysicsObject) -> ObjectKey {
        let id = object.id();
        let handle = object.handle().to_string();
        let key = self.objects.insert(object);
        self.ids.insert(id, key);
        self.handles.insert(handle, key);
        key
    }

    /// Creates a rigid object from a template.
    pub fn add_rigid_object(&mut self, attributes: &ObjectAttributes) -> PhysicsResult<ObjectKey> {
        let base = RigidBase::from_attributes(
            attributes,
            self.config.default_friction_coefficient,
            self.config.default_restitution_coefficient,
        )?;
        check_non_negative("linear damping", attributes.linear_damping)?;
        check_non_negative("angular damping", attributes.angular_damping)?;

        let root = self.add_physics_node(None)?;
        let visual_nodes = self.add_visual_nodes(root, &attributes.render_asset_handles);
        let id = self.allocate_id();
        let handle = self.allocate_handle(&attributes.handle);

        let mut motion = MotionState::new(Isometry::identity());
        motion.set_linear_damping(attributes.linear_damping);
        motion.set_angular_damping(attributes.angular_damping);
        let core = ObjectCore::new(
            id,
            handle,
            format!("{}RigidObject", self.backend.class_prefix()),
            attributes.motion_type,
            motion,
            root,
            visual_nodes,
            attributes.light_setup_key.clone(),
            attributes.user_attributes.clone(),
        );
        let object = RigidObject::new(core, base, attributes.clone());

        if let Err(e) = self
            .backend
            .insert_body(BodyKey::rigid(id), &rigid_desc(&object))
        {
            self.abort_creation(id, root);
            return Err(e);
        }

        log::debug!("added rigid object `{}` (id {id})", object.handle());
        let key = self.register(PhysicsObject::Rigid(object));
        self.update_object_nodes(key);
        Ok(key)
    }

    /// Creates an articulated object from a template.
    pub fn add_articulated_object(
        &mut self,
        attributes: &ArticulatedObjectAttributes,
    ) -> PhysicsResult<ObjectKey> {
        let axes = ArticulatedObject::validate_attributes(attributes)?;

        let root = self.add_physics_node(None)?;
        let visual_nodes = self.add_visual_nodes(root, &attributes.render_asset_handles);
        let mut link_nodes = Vec::with_capacity(attributes.links.len());
        for link in &attributes.links {
            let node = match self.add_physics_node(Some(root)) {
                Ok(node) => node,
                Err(e) => {
                    self.scene.remove_subtree(root);
                    return Err(e);
                }
            };
            let visuals = self.add_visual_nodes(node, &link.render_asset_handles);
            link_nodes.push((node, visuals));
        }

        let id = self.allocate_id();
        let handle = self.allocate_handle(&attributes.handle);
        let core = ObjectCore::new(
            id,
            handle,
            format!("{}ArticulatedObject", self.backend.class_prefix()),
            attributes.motion_type,
            MotionState::new(Isometry::identity()),
            root,
            visual_nodes.clone(),
            attributes.light_setup_key.clone(),
            attributes.user_attributes.clone(),
        );
        let object = ArticulatedObject::new(
            core,
            attributes.clone(),
            axes,
            (root, visual_nodes),
            link_nodes,
        );

        for (link_id, link) in object.all_links() {
            let desc = link_desc(&object, link, self.config.default_restitution_coefficient);
            if let Err(e) = self.backend.insert_body(BodyKey::link(id, link_id), &desc) {
                self.abort_creation(id, root);
                return Err(e);
            }
        }

        log::debug!(
            "added articulated object `{}` (id {id}, {} links, {} dofs)",
            object.handle(),
            object.num_links(),
            object.num_dofs()
        );
        let key = self.register(PhysicsObject::Articulated(object));
        self.update_object_nodes(key);
        Ok(key)
    }

    /// Removes an object from the world and returns it.
    ///
    /// The returned object is dead: its getters still work but every
    /// mutator fails with [`PhysicsError::DeadHandle`].
    pub fn remove_object(&mut self, key: ObjectKey) -> PhysicsResult<PhysicsObject> {
        let mut object = self
            .objects
            .remove(key)
            .ok_or_else(|| ObjectCore::dead_key_error(key))?;
        let id = object.id();
        self.ids.remove(&id);
        self.handles.remove(object.handle());
        self.free_ids.insert(id.0);
        self.scene.remove_subtree(object.root_scene_node());
        self.backend.remove_object(id);
        object.core_mut().kill();
        log::debug!("removed `{}` (id {id})", object.handle());
        Ok(object)
    }

    /// Advances the simulation by the configured timestep.
    pub fn step(&mut self) -> PhysicsResult<()> {
        self.step_by(self.config.timestep)
    }

    /// Advances the simulation by `dt`.
    ///
    /// Velocity control is applied first, then joints are integrated, then
    /// rigid objects are simulated by the backend or by the built-in
    /// integrator. Loads queued since the last step are consumed exactly
    /// once. Finally the scene tree receives the new poses.
    ///
    /// A failed step leaves every object as it was before the call, and the
    /// whole state is pushed to the backend again at the next sync.
    pub fn step_by(&mut self, dt: Real) -> PhysicsResult<()> {
        check_positive("timestep", dt)?;

        let snapshot = self.objects.clone();
        if let Err(e) = self.advance(dt) {
            log::warn!("step of {dt} s failed, restoring the previous object state: {e}");
            self.objects = snapshot;
            self.backend.discard_loads();
            for (_, object) in self.objects.iter_mut() {
                object.core_mut().mark_unsynced();
            }
            return Err(e);
        }

        self.elapsed_time += dt;
        self.update_scene_graph();
        Ok(())
    }

    fn advance(&mut self, dt: Real) -> PhysicsResult<()> {
        let gravity = self.gravity;

        for (_, object) in self.objects.iter_mut() {
            match object {
                PhysicsObject::Rigid(rigid) => rigid.apply_velocity_control(dt),
                PhysicsObject::Articulated(articulated) => articulated.integrate(dt, &gravity),
            }
        }

        if self.backend.simulates_dynamics() {
            self.sync_backend(true)?;
            self.backend.step(dt, &gravity)?;
            for (_, object) in self.objects.iter_mut() {
                let PhysicsObject::Rigid(rigid) = object else {
                    continue;
                };
                if rigid.motion_type() != MotionType::Dynamic {
                    continue;
                }
                let state = self.backend.body_state(BodyKey::rigid(rigid.id()))?;
                rigid.core_mut().motion.store_simulated(
                    state.pose,
                    state.linvel,
                    state.angvel,
                    state.awake,
                );
            }
        } else {
            for (_, object) in self.objects.iter_mut() {
                if let PhysicsObject::Rigid(rigid) = object {
                    integrate_rigid_object(rigid, dt, &gravity);
                }
            }
            self.sync_backend(false)?;
        }
        Ok(())
    }

    /// Pushes every pending change into the backend.
    fn sync_backend(&mut self, apply_loads: bool) -> PhysicsResult<()> {
        let restitution = self.config.default_restitution_coefficient;
        for (_, object) in self.objects.iter_mut() {
            let id = object.id();
            match object {
                PhysicsObject::Rigid(rigid) => {
                    let motion = rigid.motion_state();
                    let sync = BodySync {
                        pose: motion.is_pose_dirty(),
                        velocity: motion.is_velocity_dirty(),
                        properties: rigid.core().is_properties_dirty(),
                    };
                    let key = BodyKey::rigid(id);
                    if sync.any() {
                        self.backend.update_body(key, &rigid_desc(rigid), sync)?;
                    }
                    // Sleeping objects keep their loads until they wake up.
                    if apply_loads && rigid.is_active() {
                        let loads = rigid.rigid_base_mut().take_pending_loads();
                        if !loads.is_empty() {
                            self.backend.apply_loads(key, &loads)?;
                        }
                    }
                }
                PhysicsObject::Articulated(articulated) => {
                    let sync = BodySync {
                        pose: true,
                        velocity: false,
                        properties: articulated.core().is_properties_dirty(),
                    };
                    for (link_id, link) in articulated.all_links() {
                        let desc = link_desc(articulated, link, restitution);
                        self.backend
                            .update_body(BodyKey::link(id, link_id), &desc, sync)?;
                    }
                }
            }
            object.core_mut().mark_synced();
        }
        Ok(())
    }

    /// Publishes the pose of every object to the scene tree.
    pub fn update_scene_graph(&mut self) {
        let keys: Vec<ObjectKey> = self.objects.keys().collect();
        for key in keys {
            self.update_object_nodes(key);
        }
    }

    fn update_object_nodes(&mut self, key: ObjectKey) {
        let Some(object) = self.objects.get(key) else {
            return;
        };
        let root_pose = object.pose();
        self.scene
            .set_transformation(object.root_scene_node(), root_pose);
        if let PhysicsObject::Articulated(articulated) = object {
            for (_, link) in articulated.all_links().skip(1) {
                self.scene
                    .set_transformation(link.scene_node(), root_pose.inv_mul(link.world_pose()));
            }
        }
    }

    /// Is the object in contact with any other object?
    ///
    /// This is a discrete query on the current poses; it does not step the
    /// simulation.
    pub fn contact_test(&mut self, key: ObjectKey) -> PhysicsResult<bool> {
        let id = self.object(key)?.id();
        self.sync_backend(false)?;
        self.backend.contact_test(id)
    }

    fn rigid_body_key(&self, key: ObjectKey, operation: &'static str) -> PhysicsResult<BodyKey> {
        let object = self.object(key)?;
        if object.as_rigid().is_none() {
            return Err(wrong_kind(operation, object, "rigid object"));
        }
        Ok(BodyKey::rigid(object.id()))
    }

    /// Bounding box of a rigid object's collision shape, in its local frame.
    pub fn collision_shape_aabb(&mut self, key: ObjectKey) -> PhysicsResult<Aabb> {
        let body = self.rigid_body_key(key, "collision_shape_aabb")?;
        self.sync_backend(false)?;
        self.backend.collision_shape_aabb(body)
    }

    /// Collision margin of a rigid object.
    pub fn collision_margin(&mut self, key: ObjectKey) -> PhysicsResult<Real> {
        let body = self.rigid_body_key(key, "collision_margin")?;
        self.sync_backend(false)?;
        self.backend.collision_margin(body)
    }

    /// Sets the collision margin of a rigid object.
    pub fn set_collision_margin(&mut self, key: ObjectKey, margin: Real) -> PhysicsResult<()> {
        let body = self.rigid_body_key(key, "set_collision_margin")?;
        check_non_negative("margin", margin)?;
        self.sync_backend(false)?;
        self.backend.set_collision_margin(body, margin)
    }
}

fn wrong_kind(operation: &'static str, object: &PhysicsObject, expected: &'static str) -> PhysicsError {
    PhysicsError::WrongKind {
        operation,
        handle: object.handle().to_string(),
        expected,
    }
}

fn rigid_desc(object: &RigidObject) -> BodyDesc {
    let motion = object.motion_state();
    let base = object.rigid_base();
    BodyDesc {
        motion_type: object.motion_type(),
        pose: *motion.pose(),
        linvel: *motion.linvel(),
        angvel: *motion.angvel(),
        mass: object.mass(),
        inertia_diagonal: object.inertia_diagonal(),
        com: object.com(),
        linear_damping: motion.linear_damping(),
        angular_damping: motion.angular_damping(),
        friction: object.friction_coefficient(),
        restitution: object.restitution_coefficient(),
        collidable: object.is_collidable(),
        collision_group: object.collision_group(),
        shape: base.collision_shape().copied(),
        margin: base.initial_margin(),
        awake: motion.is_awake(),
    }
}

fn link_desc(object: &ArticulatedObject, link: &Link, restitution: Real) -> BodyDesc {
    let shape = link.collision_shape().copied();
    let inertia_diagonal = shape
        .map(|shape| shape.principal_inertia(link.mass()))
        .unwrap_or_else(|| Vector::repeat(link.mass()));
    BodyDesc {
        motion_type: object.motion_type(),
        pose: *link.world_pose(),
        linvel: Vector::zeros(),
        angvel: Vector::zeros(),
        mass: link.mass(),
        inertia_diagonal,
        com: Vector::zeros(),
        linear_damping: 0.0,
        angular_damping: 0.0,
        friction: link.friction_coefficient(),
        restitution,
        collidable: true,
        collision_group: object.collision_group(),
        shape,
        margin: LINK_MARGIN,
        awake: object.is_active(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::LinkAttributes;
    use crate::articulated::JointType;
    use crate::backend::BodyState;
    use crate::dynamics::Load;

    /// Keeps bodies but fails every step.
    struct DivergingBackend;

    impl PhysicsBackend for DivergingBackend {
        fn name(&self) -> &str {
            "diverging"
        }

        fn class_prefix(&self) -> &str {
            ""
        }

        fn simulates_dynamics(&self) -> bool {
            true
        }

        fn insert_body(&mut self, _key: BodyKey, _desc: &BodyDesc) -> PhysicsResult<()> {
            Ok(())
        }

        fn update_body(&mut self, _key: BodyKey, _desc: &BodyDesc, _sync: BodySync) -> PhysicsResult<()> {
            Ok(())
        }

        fn remove_object(&mut self, _object: ObjectId) {}

        fn apply_loads(&mut self, _key: BodyKey, _loads: &[Load]) -> PhysicsResult<()> {
            Ok(())
        }

        fn step(&mut self, _dt: Real, _gravity: &Vector) -> PhysicsResult<()> {
            Err(PhysicsError::Backend("solver diverged".to_string()))
        }

        fn body_state(&self, _key: BodyKey) -> PhysicsResult<BodyState> {
            Err(PhysicsError::Backend("no state".to_string()))
        }

        fn contact_test(&self, _object: ObjectId) -> PhysicsResult<bool> {
            Ok(false)
        }

        fn collision_shape_aabb(&self, _key: BodyKey) -> PhysicsResult<Aabb> {
            Err(PhysicsError::Backend("no shape".to_string()))
        }

        fn collision_margin(&self, _key: BodyKey) -> PhysicsResult<Real> {
            Ok(0.0)
        }

        fn set_collision_margin(&mut self, _key: BodyKey, _margin: Real) -> PhysicsResult<()> {
            Ok(())
        }
    }

    fn null_world() -> PhysicsWorld {
        PhysicsWorld::with_backend(WorldConfig::default(), Box::new(NullBackend)).unwrap()
    }

    #[test]
    fn handles_are_numbered_per_template() {
        let mut world = null_world();
        let a = world.add_rigid_object(&ObjectAttributes::new("box")).unwrap();
        let b = world.add_rigid_object(&ObjectAttributes::new("box")).unwrap();
        assert_eq!(world.object(a).unwrap().handle(), "box_:0000");
        assert_eq!(world.object(b).unwrap().handle(), "box_:0001");
        assert_eq!(world.key_by_handle("box_:0001"), Some(b));
        assert_eq!(world.object(a).unwrap().template_class(), "RigidObject");
    }

    #[test]
    fn ids_are_recycled_but_keys_are_not() {
        let mut world = null_world();
        let a = world.add_rigid_object(&ObjectAttributes::new("a")).unwrap();
        let id = world.object(a).unwrap().id();
        world.remove_object(a).unwrap();
        let b = world.add_rigid_object(&ObjectAttributes::new("b")).unwrap();
        assert_eq!(world.object(b).unwrap().id(), id);
        assert!(matches!(
            world.object(a),
            Err(PhysicsError::DeadHandle { .. })
        ));
    }

    #[test]
    fn failed_creation_leaves_no_trace() {
        let mut world = null_world();
        let attributes = ObjectAttributes {
            mass: -1.0,
            ..ObjectAttributes::new("bad")
        };
        assert!(world.add_rigid_object(&attributes).is_err());
        assert_eq!(world.num_objects(), 0);
        assert!(world.scene().is_empty());
    }

    #[test]
    fn wrong_kind_is_reported() {
        let mut world = null_world();
        let key = world
            .add_articulated_object(&ArticulatedObjectAttributes::new(
                "arm",
                vec![LinkAttributes::new("l0", None, JointType::Revolute)],
            ))
            .unwrap();
        assert!(matches!(
            world.rigid_object(key),
            Err(PhysicsError::WrongKind { .. })
        ));
        assert!(matches!(
            world.collision_margin(key),
            Err(PhysicsError::WrongKind { .. })
        ));
    }

    #[test]
    fn link_nodes_follow_forward_kinematics() {
        let mut world = null_world();
        let key = world
            .add_articulated_object(&ArticulatedObjectAttributes::new(
                "slider",
                vec![LinkAttributes::new("l0", None, JointType::Prismatic)
                    .with_axis(Vector::x())],
            ))
            .unwrap();
        world
            .articulated_object_mut(key)
            .unwrap()
            .set_joint_positions(&[2.0])
            .unwrap();
        world.update_scene_graph();
        let node = world.articulated_object(key).unwrap().get_link_scene_node(0).unwrap();
        let pose = world.scene().absolute_transformation(node).unwrap();
        approx::assert_relative_eq!(pose.translation.vector, Vector::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn failed_step_leaves_objects_untouched() {
        let mut world =
            PhysicsWorld::with_backend(WorldConfig::default(), Box::new(DivergingBackend)).unwrap();
        let arm = world
            .add_articulated_object(&ArticulatedObjectAttributes::new(
                "arm",
                vec![LinkAttributes::new("l0", None, JointType::Revolute)],
            ))
            .unwrap();
        let crate_key = world.add_rigid_object(&ObjectAttributes::new("crate")).unwrap();
        world
            .articulated_object_mut(arm)
            .unwrap()
            .set_joint_velocities(&[1.0])
            .unwrap();
        world
            .rigid_object_mut(crate_key)
            .unwrap()
            .apply_force(Vector::y(), Vector::zeros())
            .unwrap();

        let err = world.step_by(0.5).unwrap_err();
        assert_eq!(err, PhysicsError::Backend("solver diverged".to_string()));

        assert_eq!(world.articulated_object(arm).unwrap().joint_positions(), &[0.0]);
        let rigid = world.rigid_object(crate_key).unwrap();
        assert_eq!(rigid.rigid_base().pending_loads().len(), 1);
        assert!(rigid.motion_state().is_pose_dirty());
        assert_eq!(world.elapsed_time(), 0.0);
    }

    #[test]
    fn sleeping_objects_keep_their_loads() {
        let mut world = null_world();
        world.set_gravity(Vector::zeros()).unwrap();
        let attributes = ObjectAttributes {
            linear_damping: 0.0,
            ..ObjectAttributes::new("puck")
        };
        let key = world.add_rigid_object(&attributes).unwrap();
        let object = world.rigid_object_mut(key).unwrap();
        object.apply_impulse(Vector::x(), Vector::zeros()).unwrap();
        object.set_active(false).unwrap();

        world.step().unwrap();
        let object = world.rigid_object_mut(key).unwrap();
        assert_eq!(object.rigid_base().pending_loads().len(), 1);
        assert_eq!(object.linear_velocity(), Vector::zeros());

        object.set_active(true).unwrap();
        world.step().unwrap();
        let object = world.rigid_object(key).unwrap();
        assert!(object.rigid_base().pending_loads().is_empty());
        approx::assert_relative_eq!(object.linear_velocity(), Vector::x(), epsilon = 1.0e-6);
    }
}
