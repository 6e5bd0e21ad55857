//! Identity, lifecycle and pose state shared by every physics object.
//!
//! Rigid and articulated objects are built by composition: each one owns an
//! [`ObjectCore`] and implements [`PhysicsObjectBase`], which provides the
//! whole common API on top of it. Kind-specific capabilities are separate
//! traits ([`DynamicsCapable`](crate::dynamics::DynamicsCapable)) or inherent
//! methods ([`ArticulatedObject`]).

pub use collision::CollisionGroup;
pub use motion::MotionState;

use crate::articulated::ArticulatedObject;
use crate::attributes::UserAttributes;
use crate::dynamics::{DynamicsCapable, RigidObject};
use crate::error::{PhysicsError, PhysicsResult};
use crate::math::{Isometry, Matrix3, Matrix4, Real, Rotation, Translation3, Vector};
use crate::scene::NodeId;
use collision::CollisionGroupState;
use na::{Rotation3, Unit};
use serde::{Deserialize, Serialize};
use std::fmt;

mod collision;
mod motion;

/// Tolerance used when checking that a matrix is a rigid transformation.
const RIGID_EPSILON: Real = 1.0e-4;

/// Identifier of an object, unique among the live objects of a world.
///
/// Ids of removed objects may be handed out again; use an
/// [`ObjectKey`](crate::world::ObjectKey) to hold on to an object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an object moves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionType {
    /// Never moves once placed.
    Static,
    /// Moved only by pose writes and velocity control.
    Kinematic,
    /// Moved by the simulation.
    #[default]
    Dynamic,
}

/// A pose split into its translation and rotation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RigidState {
    /// World-space translation.
    pub translation: Vector,
    /// World-space rotation.
    pub rotation: Rotation,
}

impl RigidState {
    /// Creates a rigid state.
    pub fn new(translation: Vector, rotation: Rotation) -> Self {
        Self {
            translation,
            rotation,
        }
    }
}

impl From<Isometry> for RigidState {
    fn from(pose: Isometry) -> Self {
        Self::new(pose.translation.vector, pose.rotation)
    }
}

impl From<RigidState> for Isometry {
    fn from(state: RigidState) -> Self {
        Isometry::from_parts(Translation3::from(state.translation), state.rotation)
    }
}

/// State common to every physics object.
#[derive(Clone, Debug)]
pub struct ObjectCore {
    id: ObjectId,
    handle: String,
    template_class: String,
    motion_type: MotionType,
    collision: CollisionGroupState,
    pub(crate) motion: MotionState,
    root_node: NodeId,
    visual_nodes: Vec<NodeId>,
    light_setup_key: String,
    user_attributes: UserAttributes,
    alive: bool,
    properties_dirty: bool,
}

impl ObjectCore {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: ObjectId,
        handle: String,
        template_class: String,
        motion_type: MotionType,
        motion: MotionState,
        root_node: NodeId,
        visual_nodes: Vec<NodeId>,
        light_setup_key: String,
        user_attributes: UserAttributes,
    ) -> Self {
        Self {
            id,
            handle,
            template_class,
            motion_type,
            collision: CollisionGroupState::new(motion_type),
            motion,
            root_node,
            visual_nodes,
            light_setup_key,
            user_attributes,
            alive: true,
            properties_dirty: true,
        }
    }

    /// The object id.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The object handle.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// The current motion type.
    pub fn motion_type(&self) -> MotionType {
        self.motion_type
    }

    /// Whether the object is still in its world.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Fails with [`PhysicsError::DeadHandle`] once the object was removed.
    pub fn ensure_alive(&self) -> PhysicsResult<()> {
        if self.alive {
            Ok(())
        } else {
            Err(PhysicsError::DeadHandle {
                handle: self.handle.clone(),
            })
        }
    }

    /// Fails with [`PhysicsError::MotionType`] unless the object is DYNAMIC.
    pub fn ensure_dynamic(&self, operation: &'static str) -> PhysicsResult<()> {
        self.ensure_alive()?;
        if self.motion_type == MotionType::Dynamic {
            Ok(())
        } else {
            Err(PhysicsError::MotionType {
                operation,
                handle: self.handle.clone(),
                motion_type: self.motion_type,
            })
        }
    }

    pub(crate) fn kill(&mut self) {
        self.alive = false;
    }

    pub(crate) fn mark_properties_dirty(&mut self) {
        self.properties_dirty = true;
    }

    pub(crate) fn is_properties_dirty(&self) -> bool {
        self.properties_dirty
    }

    pub(crate) fn mark_synced(&mut self) {
        self.properties_dirty = false;
        self.motion.mark_synced();
    }

    /// Forces a full push of the object at the next backend sync.
    pub(crate) fn mark_unsynced(&mut self) {
        self.properties_dirty = true;
        self.motion.mark_dirty();
    }

    pub(crate) fn dead_key_error(key: impl fmt::Debug) -> PhysicsError {
        PhysicsError::DeadHandle {
            handle: format!("{key:?}"),
        }
    }
}

/// The API shared by every physics object.
///
/// Implementors only provide access to their [`ObjectCore`]; every other
/// method has a default implementation. The `on_*` hooks let an object react
/// to changes of the shared state.
pub trait PhysicsObjectBase {
    /// The shared object state.
    fn core(&self) -> &ObjectCore;
    /// The shared object state, mutably.
    fn core_mut(&mut self) -> &mut ObjectCore;

    /// Can this object take the given motion type?
    fn accepts_motion_type(&self, _motion_type: MotionType) -> bool {
        true
    }

    /// Called after the motion type changed.
    fn on_motion_type_changed(&mut self, _previous: MotionType) {}

    /// Called after the root pose was written.
    fn on_pose_changed(&mut self) {}

    /// Can this object be put to sleep?
    fn can_sleep(&self) -> bool {
        true
    }

    /// System-generated id, unique among the live objects of the world.
    fn id(&self) -> ObjectId {
        self.core().id
    }

    /// Unique name of this object within its world.
    fn handle(&self) -> &str {
        &self.core().handle
    }

    /// Class name of this object.
    fn template_class(&self) -> &str {
        &self.core().template_class
    }

    /// Whether this object still exists in its world.
    fn is_alive(&self) -> bool {
        self.core().alive
    }

    /// Root scene node of this object's subtree.
    fn root_scene_node(&self) -> NodeId {
        self.core().root_node
    }

    /// Scene nodes carrying this object's render assets.
    ///
    /// Changes to these nodes do not affect the simulation.
    fn visual_scene_nodes(&self) -> &[NodeId] {
        &self.core().visual_nodes
    }

    /// The motion record of the object's root.
    fn motion_state(&self) -> &MotionState {
        &self.core().motion
    }

    /// Root pose as an isometry.
    fn pose(&self) -> Isometry {
        *self.core().motion.pose()
    }

    /// Replaces the root pose.
    fn set_pose(&mut self, pose: Isometry) -> PhysicsResult<()> {
        self.core().ensure_alive()?;
        if !pose.translation.vector.iter().all(|x| x.is_finite()) {
            return Err(PhysicsError::invalid(
                "pose",
                "translation components must be finite",
            ));
        }
        self.core_mut().motion.set_pose(pose);
        self.on_pose_changed();
        Ok(())
    }

    /// Root transformation as a homogeneous matrix.
    fn transformation(&self) -> Matrix4<Real> {
        self.pose().to_homogeneous()
    }

    /// Replaces the root transformation.
    ///
    /// The matrix must be a rigid transformation (orthonormal rotation part,
    /// no scale, no shear, no projection).
    fn set_transformation(&mut self, transformation: &Matrix4<Real>) -> PhysicsResult<()> {
        let pose = rigid_from_matrix(transformation)?;
        self.set_pose(pose)
    }

    /// Root translation.
    fn translation(&self) -> Vector {
        self.pose().translation.vector
    }

    /// Replaces the root translation, keeping the rotation.
    fn set_translation(&mut self, translation: Vector) -> PhysicsResult<()> {
        let mut pose = self.pose();
        pose.translation.vector = translation;
        self.set_pose(pose)
    }

    /// Root rotation.
    fn rotation(&self) -> Rotation {
        self.pose().rotation
    }

    /// Replaces the root rotation, keeping the translation.
    fn set_rotation(&mut self, rotation: Rotation) -> PhysicsResult<()> {
        let mut pose = self.pose();
        pose.rotation = rotation;
        self.set_pose(pose)
    }

    /// Root pose as a translation/rotation pair.
    fn rigid_state(&self) -> RigidState {
        self.pose().into()
    }

    /// Replaces the root pose from a translation/rotation pair.
    fn set_rigid_state(&mut self, state: RigidState) -> PhysicsResult<()> {
        self.set_pose(state.into())
    }

    /// Moves the object by `offset`, expressed in world space.
    fn translate(&mut self, offset: Vector) -> PhysicsResult<()> {
        let mut pose = self.pose();
        pose.translation.vector += offset;
        self.set_pose(pose)
    }

    /// Moves the object by `offset`, expressed in the object's local frame.
    fn translate_local(&mut self, offset: Vector) -> PhysicsResult<()> {
        let pose = self.pose() * Translation3::from(offset);
        self.set_pose(pose)
    }

    /// Applies a world-space rotation of `angle` radians around `axis`.
    ///
    /// The rotation is about the world origin, so it also moves the
    /// translation of an object that is not at the origin.
    fn rotate(&mut self, angle: Real, axis: &Vector) -> PhysicsResult<()> {
        let rotation = axis_angle(angle, axis)?;
        let pose = Isometry::from_parts(Translation3::identity(), rotation) * self.pose();
        self.set_pose(pose)
    }

    /// Rotates the object by `angle` radians around `axis`, expressed in its
    /// local frame. The translation is unchanged.
    fn rotate_local(&mut self, angle: Real, axis: &Vector) -> PhysicsResult<()> {
        let rotation = axis_angle(angle, axis)?;
        let pose = self.pose() * Isometry::from_parts(Translation3::identity(), rotation);
        self.set_pose(pose)
    }

    /// World-space rotation around the `X` axis.
    fn rotate_x(&mut self, angle: Real) -> PhysicsResult<()> {
        self.rotate(angle, &Vector::x())
    }

    /// Local-space rotation around the `X` axis.
    fn rotate_x_local(&mut self, angle: Real) -> PhysicsResult<()> {
        self.rotate_local(angle, &Vector::x())
    }

    /// World-space rotation around the `Y` axis.
    fn rotate_y(&mut self, angle: Real) -> PhysicsResult<()> {
        self.rotate(angle, &Vector::y())
    }

    /// Local-space rotation around the `Y` axis.
    fn rotate_y_local(&mut self, angle: Real) -> PhysicsResult<()> {
        self.rotate_local(angle, &Vector::y())
    }

    /// World-space rotation around the `Z` axis.
    fn rotate_z(&mut self, angle: Real) -> PhysicsResult<()> {
        self.rotate(angle, &Vector::z())
    }

    /// Local-space rotation around the `Z` axis.
    fn rotate_z_local(&mut self, angle: Real) -> PhysicsResult<()> {
        self.rotate_local(angle, &Vector::z())
    }

    /// Current motion type.
    fn motion_type(&self) -> MotionType {
        self.core().motion_type
    }

    /// Changes the motion type.
    ///
    /// This resets the collision group to the new motion type's default,
    /// discarding any group set with
    /// [`override_collision_group`](Self::override_collision_group).
    fn set_motion_type(&mut self, motion_type: MotionType) -> PhysicsResult<()> {
        self.core().ensure_alive()?;
        if !self.accepts_motion_type(motion_type) {
            return Err(PhysicsError::invalid(
                "motion type",
                format!("`{}` does not support {motion_type:?}", self.handle()),
            ));
        }

        let core = self.core_mut();
        let previous = core.motion_type;
        core.motion_type = motion_type;
        core.collision.on_motion_type_set(motion_type);
        core.mark_properties_dirty();
        core.motion.set_awake(true);
        self.on_motion_type_changed(previous);
        Ok(())
    }

    /// Current collision group.
    fn collision_group(&self) -> CollisionGroup {
        self.core().collision.group()
    }

    /// Was the collision group set manually since the last motion type change?
    fn is_collision_group_overridden(&self) -> bool {
        self.core().collision.is_overridden()
    }

    /// Sets the collision group manually, until the next motion type change.
    fn override_collision_group(&mut self, group: CollisionGroup) -> PhysicsResult<()> {
        self.core().ensure_alive()?;
        let core = self.core_mut();
        core.collision.override_group(group);
        core.mark_properties_dirty();
        Ok(())
    }

    /// Is the object being simulated, as opposed to sleeping?
    fn is_active(&self) -> bool {
        self.core().motion.is_awake()
    }

    /// Wakes the object up or puts it to sleep.
    ///
    /// Putting to sleep an object that cannot sleep is ignored.
    fn set_active(&mut self, active: bool) -> PhysicsResult<()> {
        self.core().ensure_alive()?;
        if !active && !self.can_sleep() {
            log::debug!("`{}` cannot sleep; ignoring request", self.handle());
            return Ok(());
        }
        self.core_mut().motion.set_awake(active);
        Ok(())
    }

    /// Key of the light setup this object's render assets are drawn with.
    fn light_setup_key(&self) -> &str {
        &self.core().light_setup_key
    }

    /// Sets the light setup key.
    fn set_light_setup(&mut self, light_setup_key: &str) -> PhysicsResult<()> {
        self.core().ensure_alive()?;
        self.core_mut().light_setup_key = light_setup_key.to_string();
        Ok(())
    }

    /// User-defined metadata. Never read by the simulation.
    fn user_attributes(&self) -> &UserAttributes {
        &self.core().user_attributes
    }

    /// User-defined metadata, mutably.
    fn user_attributes_mut(&mut self) -> PhysicsResult<&mut UserAttributes> {
        self.core().ensure_alive()?;
        Ok(&mut self.core_mut().user_attributes)
    }
}

fn axis_angle(angle: Real, axis: &Vector) -> PhysicsResult<Rotation> {
    if !angle.is_finite() {
        return Err(PhysicsError::invalid("rotation angle", "must be finite"));
    }
    let axis = Unit::try_new(*axis, 1.0e-6)
        .ok_or_else(|| PhysicsError::invalid("rotation axis", "must be non-zero"))?;
    Ok(Rotation::from_axis_angle(&axis, angle))
}

/// Splits a homogeneous matrix into an isometry, rejecting non-rigid ones.
pub(crate) fn rigid_from_matrix(m: &Matrix4<Real>) -> PhysicsResult<Isometry> {
    let not_rigid = |reason: &str| PhysicsError::invalid("transformation", reason.to_string());

    if !m.iter().all(|x| x.is_finite()) {
        return Err(not_rigid("components must be finite"));
    }
    let last_row = m.fixed_view::<1, 4>(3, 0);
    if (last_row[0].abs() + last_row[1].abs() + last_row[2].abs()) > RIGID_EPSILON
        || (last_row[3] - 1.0).abs() > RIGID_EPSILON
    {
        return Err(not_rigid("last row must be [0, 0, 0, 1]"));
    }

    let basis: Matrix3<Real> = m.fixed_view::<3, 3>(0, 0).into_owned();
    let orthonormality = (basis.transpose() * basis - Matrix3::identity()).abs().max();
    if orthonormality > RIGID_EPSILON || basis.determinant() < 0.0 {
        return Err(not_rigid("rotation part must be a proper orthonormal matrix"));
    }

    let rotation = Rotation::from_rotation_matrix(&Rotation3::from_matrix_unchecked(basis));
    let translation = Vector::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
    Ok(Isometry::from_parts(Translation3::from(translation), rotation))
}

/// A physics object of any kind.
///
/// Use [`as_rigid`](Self::as_rigid) / [`as_articulated`](Self::as_articulated)
/// (or [`as_dynamics`](Self::as_dynamics)) to query for a capability.
#[derive(Clone, Debug)]
pub enum PhysicsObject {
    /// A single rigid body.
    Rigid(RigidObject),
    /// A multi-link articulated body.
    Articulated(ArticulatedObject),
}

impl PhysicsObject {
    /// The rigid object, if this is one.
    pub fn as_rigid(&self) -> Option<&RigidObject> {
        match self {
            Self::Rigid(object) => Some(object),
            Self::Articulated(_) => None,
        }
    }

    /// The rigid object, mutably, if this is one.
    pub fn as_rigid_mut(&mut self) -> Option<&mut RigidObject> {
        match self {
            Self::Rigid(object) => Some(object),
            Self::Articulated(_) => None,
        }
    }

    /// The articulated object, if this is one.
    pub fn as_articulated(&self) -> Option<&ArticulatedObject> {
        match self {
            Self::Articulated(object) => Some(object),
            Self::Rigid(_) => None,
        }
    }

    /// The articulated object, mutably, if this is one.
    pub fn as_articulated_mut(&mut self) -> Option<&mut ArticulatedObject> {
        match self {
            Self::Articulated(object) => Some(object),
            Self::Rigid(_) => None,
        }
    }

    /// The rigid-body dynamics capability, if this object has it.
    pub fn as_dynamics(&self) -> Option<&dyn DynamicsCapable> {
        self.as_rigid().map(|object| object as &dyn DynamicsCapable)
    }

    /// The rigid-body dynamics capability, mutably, if this object has it.
    pub fn as_dynamics_mut(&mut self) -> Option<&mut dyn DynamicsCapable> {
        self.as_rigid_mut()
            .map(|object| object as &mut dyn DynamicsCapable)
    }

    /// Short name of this object's kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Rigid(_) => "rigid object",
            Self::Articulated(_) => "articulated object",
        }
    }
}

impl PhysicsObjectBase for PhysicsObject {
    fn core(&self) -> &ObjectCore {
        match self {
            Self::Rigid(object) => object.core(),
            Self::Articulated(object) => object.core(),
        }
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        match self {
            Self::Rigid(object) => object.core_mut(),
            Self::Articulated(object) => object.core_mut(),
        }
    }

    fn accepts_motion_type(&self, motion_type: MotionType) -> bool {
        match self {
            Self::Rigid(object) => object.accepts_motion_type(motion_type),
            Self::Articulated(object) => object.accepts_motion_type(motion_type),
        }
    }

    fn on_motion_type_changed(&mut self, previous: MotionType) {
        match self {
            Self::Rigid(object) => object.on_motion_type_changed(previous),
            Self::Articulated(object) => object.on_motion_type_changed(previous),
        }
    }

    fn on_pose_changed(&mut self) {
        match self {
            Self::Rigid(object) => object.on_pose_changed(),
            Self::Articulated(object) => object.on_pose_changed(),
        }
    }

    fn can_sleep(&self) -> bool {
        match self {
            Self::Rigid(object) => object.can_sleep(),
            Self::Articulated(object) => object.can_sleep(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn rigid_matrix_round_trip() {
        let pose = Isometry::new(Vector::new(1.0, 2.0, 3.0), Vector::new(0.3, -0.2, 0.9));
        let decomposed = rigid_from_matrix(&pose.to_homogeneous()).unwrap();
        assert_relative_eq!(decomposed, pose, epsilon = 1.0e-5);
    }

    #[test]
    fn scaled_matrix_is_rejected() {
        let m = Matrix4::new_scaling(2.0);
        assert!(matches!(
            rigid_from_matrix(&m),
            Err(PhysicsError::InvalidArgument {
                what: "transformation",
                ..
            })
        ));
    }

    #[test]
    fn reflection_is_rejected() {
        let mut m = Matrix4::identity();
        m[(0, 0)] = -1.0;
        assert!(rigid_from_matrix(&m).is_err());
    }

    #[test]
    fn zero_axis_is_rejected() {
        assert!(axis_angle(FRAC_PI_2, &Vector::zeros()).is_err());
        assert!(axis_angle(f32::NAN, &Vector::x()).is_err());
    }
}
