use crate::articulated::JointType;
use crate::attributes::LinkAttributes;
use crate::math::{Isometry, Real, Vector};
use crate::scene::NodeId;
use crate::shapes::CollisionShape;
use na::Unit;
use num_traits::Zero;

/// One rigid segment of an articulated object.
///
/// The base link is a `Link` too: it has no parent and a fixed joint, and its
/// frame is the object's root frame.
#[derive(Clone, Debug)]
pub struct Link {
    pub(crate) name: String,
    pub(crate) parent: Option<usize>,
    pub(crate) joint_type: JointType,
    pub(crate) axis: Unit<Vector>,
    pub(crate) parent_anchor: Isometry,
    pub(crate) mass: Real,
    pub(crate) joint_inertia: Real,
    pub(crate) friction: Real,
    pub(crate) collision_shape: Option<CollisionShape>,
    pub(crate) scene_node: NodeId,
    pub(crate) visual_nodes: Vec<NodeId>,
    pub(crate) dof_offset: usize,
    pub(crate) pos_offset: usize,
    pub(crate) joint_frame: Isometry,
    pub(crate) world_pose: Isometry,
    pub(crate) pending_force: Vector,
}

impl Link {
    pub(crate) fn base(
        mass: Real,
        friction: Real,
        collision_shape: Option<CollisionShape>,
        scene_node: NodeId,
        visual_nodes: Vec<NodeId>,
    ) -> Self {
        Self {
            name: "base".to_string(),
            parent: None,
            joint_type: JointType::Fixed,
            axis: Vector::z_axis(),
            parent_anchor: Isometry::identity(),
            mass,
            joint_inertia: 1.0,
            friction,
            collision_shape,
            scene_node,
            visual_nodes,
            dof_offset: 0,
            pos_offset: 0,
            joint_frame: Isometry::identity(),
            world_pose: Isometry::identity(),
            pending_force: Vector::zero(),
        }
    }

    /// Builds a link from its validated template.
    pub(crate) fn from_attributes(
        attributes: &LinkAttributes,
        axis: Unit<Vector>,
        dof_offset: usize,
        pos_offset: usize,
        scene_node: NodeId,
        visual_nodes: Vec<NodeId>,
    ) -> Self {
        Self {
            name: attributes.name.clone(),
            parent: attributes.parent,
            joint_type: attributes.joint_type,
            axis,
            parent_anchor: attributes.parent_anchor,
            mass: attributes.mass,
            joint_inertia: attributes.joint_inertia,
            friction: attributes.friction_coefficient,
            collision_shape: attributes.collision_shape,
            scene_node,
            visual_nodes,
            dof_offset,
            pos_offset,
            joint_frame: Isometry::identity(),
            world_pose: Isometry::identity(),
            pending_force: Vector::zero(),
        }
    }

    /// Name of the link.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of the parent link; `None` when attached to the base (or for the
    /// base itself).
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Type of the joint connecting this link to its parent.
    pub fn joint_type(&self) -> JointType {
        self.joint_type
    }

    /// Joint axis, in the joint frame.
    pub fn joint_axis(&self) -> &Unit<Vector> {
        &self.axis
    }

    /// Pose of the joint frame relative to the parent link.
    pub fn parent_anchor(&self) -> &Isometry {
        &self.parent_anchor
    }

    /// Mass of the link.
    pub fn mass(&self) -> Real {
        self.mass
    }

    /// Friction coefficient of the link's collider.
    pub fn friction_coefficient(&self) -> Real {
        self.friction
    }

    /// Collision shape of the link.
    pub fn collision_shape(&self) -> Option<&CollisionShape> {
        self.collision_shape.as_ref()
    }

    /// Scene node driven by this link.
    pub fn scene_node(&self) -> NodeId {
        self.scene_node
    }

    /// Visual nodes attached to this link.
    pub fn visual_nodes(&self) -> &[NodeId] {
        &self.visual_nodes
    }

    /// World pose of the link, as of the last forward kinematics pass.
    pub fn world_pose(&self) -> &Isometry {
        &self.world_pose
    }

    /// Force queued on this link for the next step.
    pub fn pending_force(&self) -> &Vector {
        &self.pending_force
    }

    pub(crate) fn num_dofs(&self) -> usize {
        self.joint_type.num_dofs()
    }

    pub(crate) fn num_positions(&self) -> usize {
        self.joint_type.num_positions()
    }
}
