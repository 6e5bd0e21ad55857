//! Multi-link articulated objects.
//!
//! An articulated object is a tree of links rooted at a base link. Each
//! non-base link is connected to its parent by a joint, and the joint state
//! of the whole object is stored in flat arrays partitioned by link in
//! declaration order: link `i` owns `get_link_num_joint_pos(i)` entries of
//! the position array starting at `get_link_joint_pos_offset(i)`, and
//! `get_link_num_dofs(i)` entries of the velocity and force arrays starting
//! at `get_link_dof_offset(i)`.

pub use joint::JointType;
pub use link::Link;

use crate::attributes::ArticulatedObjectAttributes;
use crate::dynamics::integrate::integrate_pose;
use crate::error::{check_len, check_non_negative, check_positive, PhysicsError, PhysicsResult};
use crate::math::{Point, Real, Vector};
use crate::object::{MotionType, ObjectCore, PhysicsObjectBase};
use crate::scene::NodeId;
use na::Unit;
use num_traits::Zero;

mod joint;
mod link;

/// Link id designating the base link.
pub const BASE_LINK_ID: i32 = -1;

/// An articulated object: a base link plus a tree of jointed links.
#[derive(Clone, Debug)]
pub struct ArticulatedObject {
    core: ObjectCore,
    base: Link,
    links: Vec<Link>,
    joint_positions: Vec<Real>,
    joint_velocities: Vec<Real>,
    joint_forces: Vec<Real>,
    lower_limits: Vec<Real>,
    upper_limits: Vec<Real>,
    auto_clamp: bool,
    attributes: ArticulatedObjectAttributes,
}

impl ArticulatedObject {
    /// Checks a template, returning the normalized joint axes of its links.
    pub(crate) fn validate_attributes(
        attributes: &ArticulatedObjectAttributes,
    ) -> PhysicsResult<Vec<Unit<Vector>>> {
        if attributes.motion_type == MotionType::Static {
            return Err(PhysicsError::invalid(
                "motion type",
                "articulated objects cannot be STATIC",
            ));
        }
        check_positive("base mass", attributes.base_mass)?;
        check_non_negative("friction coefficient", attributes.base_friction_coefficient)?;
        if let Some(shape) = &attributes.base_collision_shape {
            if !shape.is_valid() {
                return Err(PhysicsError::invalid(
                    "collision shape",
                    format!("degenerate base shape {shape:?}"),
                ));
            }
        }

        let mut axes = Vec::with_capacity(attributes.links.len());
        for (i, link) in attributes.links.iter().enumerate() {
            if let Some(parent) = link.parent {
                if parent >= i {
                    return Err(PhysicsError::invalid(
                        "link parent",
                        format!("link {i} (`{}`) must come after its parent {parent}", link.name),
                    ));
                }
            }
            check_positive("link mass", link.mass)?;
            check_positive("joint inertia", link.joint_inertia)?;
            check_non_negative("friction coefficient", link.friction_coefficient)?;
            if let Some(shape) = &link.collision_shape {
                if !shape.is_valid() {
                    return Err(PhysicsError::invalid(
                        "collision shape",
                        format!("degenerate shape {shape:?} on link {i}"),
                    ));
                }
            }

            let num_positions = link.joint_type.num_positions();
            for limits in [&link.lower_limits, &link.upper_limits] {
                if !limits.is_empty() {
                    check_len("joint limits", num_positions, limits.len())?;
                }
            }
            if !link.lower_limits.is_empty() && !link.upper_limits.is_empty() {
                let ordered = link
                    .lower_limits
                    .iter()
                    .zip(&link.upper_limits)
                    .all(|(lo, hi)| lo <= hi);
                if !ordered {
                    return Err(PhysicsError::invalid(
                        "joint limits",
                        format!("lower limits exceed upper limits on link {i}"),
                    ));
                }
            }

            let axis = if link.joint_type.has_axis() {
                Unit::try_new(link.joint_axis, 1.0e-6).ok_or_else(|| {
                    PhysicsError::invalid("joint axis", format!("zero axis on link {i}"))
                })?
            } else {
                Vector::z_axis()
            };
            axes.push(axis);
        }

        Ok(axes)
    }

    /// Builds an object from a template checked by
    /// [`validate_attributes`](Self::validate_attributes).
    ///
    /// `link_nodes` holds the scene node and visual nodes of every link.
    pub(crate) fn new(
        core: ObjectCore,
        attributes: ArticulatedObjectAttributes,
        axes: Vec<Unit<Vector>>,
        base_nodes: (NodeId, Vec<NodeId>),
        link_nodes: Vec<(NodeId, Vec<NodeId>)>,
    ) -> Self {
        let base = Link::base(
            attributes.base_mass,
            attributes.base_friction_coefficient,
            attributes.base_collision_shape,
            base_nodes.0,
            base_nodes.1,
        );

        let mut links = Vec::with_capacity(attributes.links.len());
        let mut dof_offset = 0;
        let mut pos_offset = 0;
        for ((link_attributes, axis), (node, visual_nodes)) in
            attributes.links.iter().zip(axes).zip(link_nodes)
        {
            let link = Link::from_attributes(
                link_attributes,
                axis,
                dof_offset,
                pos_offset,
                node,
                visual_nodes,
            );
            dof_offset += link.num_dofs();
            pos_offset += link.num_positions();
            links.push(link);
        }

        let mut joint_positions = vec![0.0; pos_offset];
        let mut lower_limits = vec![Real::NEG_INFINITY; pos_offset];
        let mut upper_limits = vec![Real::INFINITY; pos_offset];
        for (link, link_attributes) in links.iter().zip(&attributes.links) {
            let range = link.pos_offset..link.pos_offset + link.num_positions();
            link.joint_type
                .write_zero_configuration(&mut joint_positions[range.clone()]);
            if !link_attributes.lower_limits.is_empty() {
                lower_limits[range.clone()].copy_from_slice(&link_attributes.lower_limits);
            }
            if !link_attributes.upper_limits.is_empty() {
                upper_limits[range].copy_from_slice(&link_attributes.upper_limits);
            }
        }

        let mut result = Self {
            core,
            base,
            links,
            joint_positions,
            joint_velocities: vec![0.0; dof_offset],
            joint_forces: vec![0.0; dof_offset],
            lower_limits,
            upper_limits,
            auto_clamp: attributes.auto_clamp_joint_limits,
            attributes,
        };
        result.update_kinematics();
        result
    }

    /// The template this object was created from.
    pub fn creation_attributes(&self) -> &ArticulatedObjectAttributes {
        &self.attributes
    }

    /// Is the base welded to the world?
    pub fn fixed_base(&self) -> bool {
        self.attributes.fixed_base
    }

    /// Number of links, excluding the base.
    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    /// Ids of the links, excluding the base.
    pub fn get_link_ids(&self) -> Vec<i32> {
        (0..self.links.len() as i32).collect()
    }

    /// Total number of joint position coordinates.
    pub fn num_joint_positions(&self) -> usize {
        self.joint_positions.len()
    }

    /// Total number of degrees of freedom.
    pub fn num_dofs(&self) -> usize {
        self.joint_velocities.len()
    }

    /// Sum of the masses of every link, base included.
    pub fn total_mass(&self) -> Real {
        self.base.mass + self.links.iter().map(|link| link.mass).sum::<Real>()
    }

    fn invalid_link(&self, link_id: i32) -> PhysicsError {
        PhysicsError::InvalidLink {
            handle: self.core.handle().to_string(),
            link_id,
            num_links: self.links.len(),
        }
    }

    /// Index of a non-base link.
    fn link_index(&self, link_id: i32) -> PhysicsResult<usize> {
        usize::try_from(link_id)
            .ok()
            .filter(|i| *i < self.links.len())
            .ok_or_else(|| self.invalid_link(link_id))
    }

    /// The link with the given id; [`BASE_LINK_ID`] designates the base.
    pub fn get_link(&self, link_id: i32) -> PhysicsResult<&Link> {
        if link_id == BASE_LINK_ID {
            Ok(&self.base)
        } else {
            Ok(&self.links[self.link_index(link_id)?])
        }
    }

    fn get_link_mut(&mut self, link_id: i32) -> PhysicsResult<&mut Link> {
        if link_id == BASE_LINK_ID {
            Ok(&mut self.base)
        } else {
            let i = self.link_index(link_id)?;
            Ok(&mut self.links[i])
        }
    }

    /// Name of the link with the given id.
    pub fn link_name(&self, link_id: i32) -> PhysicsResult<&str> {
        Ok(self.get_link(link_id)?.name())
    }

    /// Scene node driven by the link with the given id.
    pub fn get_link_scene_node(&self, link_id: i32) -> PhysicsResult<NodeId> {
        Ok(self.get_link(link_id)?.scene_node)
    }

    /// Visual nodes attached to the link with the given id.
    pub fn get_link_visual_nodes(&self, link_id: i32) -> PhysicsResult<&[NodeId]> {
        Ok(&self.get_link(link_id)?.visual_nodes)
    }

    /// Offset of the link's first degree of freedom in the velocity and force
    /// arrays. The base has no joint and is rejected.
    pub fn get_link_dof_offset(&self, link_id: i32) -> PhysicsResult<usize> {
        Ok(self.links[self.link_index(link_id)?].dof_offset)
    }

    /// Number of degrees of freedom of the link's joint.
    pub fn get_link_num_dofs(&self, link_id: i32) -> PhysicsResult<usize> {
        Ok(self.links[self.link_index(link_id)?].num_dofs())
    }

    /// Offset of the link's first position coordinate in the position array.
    pub fn get_link_joint_pos_offset(&self, link_id: i32) -> PhysicsResult<usize> {
        Ok(self.links[self.link_index(link_id)?].pos_offset)
    }

    /// Number of position coordinates of the link's joint.
    pub fn get_link_num_joint_pos(&self, link_id: i32) -> PhysicsResult<usize> {
        Ok(self.links[self.link_index(link_id)?].num_positions())
    }

    /// Type of the joint connecting the link to its parent.
    pub fn get_link_joint_type(&self, link_id: i32) -> PhysicsResult<JointType> {
        Ok(self.links[self.link_index(link_id)?].joint_type)
    }

    /// Friction coefficient of the link's collider.
    pub fn get_link_friction(&self, link_id: i32) -> PhysicsResult<Real> {
        Ok(self.get_link(link_id)?.friction)
    }

    /// Overrides the friction coefficient of one link.
    pub fn set_link_friction(&mut self, link_id: i32, friction: Real) -> PhysicsResult<()> {
        self.core.ensure_alive()?;
        check_non_negative("friction coefficient", friction)?;
        self.get_link_mut(link_id)?.friction = friction;
        self.core.mark_properties_dirty();
        Ok(())
    }

    /// Queues a world-space force on one link's origin for the next step.
    ///
    /// This is independent of the joint force array.
    pub fn add_link_force(&mut self, link_id: i32, force: Vector) -> PhysicsResult<()> {
        self.core.ensure_dynamic("add_link_force")?;
        if !force.iter().all(|x| x.is_finite()) {
            return Err(PhysicsError::invalid("link force", "components must be finite"));
        }
        self.get_link_mut(link_id)?.pending_force += force;
        self.core.motion.set_awake(true);
        Ok(())
    }

    /// Joint positions, partitioned by link.
    pub fn joint_positions(&self) -> &[Real] {
        &self.joint_positions
    }

    /// Replaces every joint position.
    ///
    /// When auto-clamping is enabled, the stored positions are clamped to the
    /// joint limits.
    pub fn set_joint_positions(&mut self, positions: &[Real]) -> PhysicsResult<()> {
        self.core.ensure_alive()?;
        check_len("joint positions", self.joint_positions.len(), positions.len())?;
        check_all_finite("joint positions", positions)?;
        self.joint_positions.copy_from_slice(positions);
        if self.auto_clamp {
            self.clamp_positions(false);
        }
        self.update_kinematics();
        Ok(())
    }

    /// Joint velocities, partitioned by link.
    pub fn joint_velocities(&self) -> &[Real] {
        &self.joint_velocities
    }

    /// Replaces every joint velocity.
    pub fn set_joint_velocities(&mut self, velocities: &[Real]) -> PhysicsResult<()> {
        self.core.ensure_alive()?;
        check_len("joint velocities", self.joint_velocities.len(), velocities.len())?;
        check_all_finite("joint velocities", velocities)?;
        self.joint_velocities.copy_from_slice(velocities);
        Ok(())
    }

    /// Joint forces queued for the next step.
    pub fn joint_forces(&self) -> &[Real] {
        &self.joint_forces
    }

    /// Replaces the queued joint forces.
    pub fn set_joint_forces(&mut self, forces: &[Real]) -> PhysicsResult<()> {
        self.core.ensure_dynamic("set_joint_forces")?;
        check_len("joint forces", self.joint_forces.len(), forces.len())?;
        check_all_finite("joint forces", forces)?;
        self.joint_forces.copy_from_slice(forces);
        Ok(())
    }

    /// Adds to the queued joint forces.
    pub fn add_joint_forces(&mut self, forces: &[Real]) -> PhysicsResult<()> {
        self.core.ensure_dynamic("add_joint_forces")?;
        check_len("joint forces", self.joint_forces.len(), forces.len())?;
        check_all_finite("joint forces", forces)?;
        for (f, df) in self.joint_forces.iter_mut().zip(forces) {
            *f += df;
        }
        Ok(())
    }

    /// Lower (`upper == false`) or upper joint position limits, one per
    /// position coordinate. Unlimited coordinates are infinite.
    pub fn get_joint_position_limits(&self, upper: bool) -> &[Real] {
        if upper {
            &self.upper_limits
        } else {
            &self.lower_limits
        }
    }

    /// Are joint positions clamped after every write and step?
    pub fn auto_clamp_joint_limits(&self) -> bool {
        self.auto_clamp
    }

    /// Enables or disables automatic clamping.
    ///
    /// Current positions are left as they are; use
    /// [`clamp_joint_limits`](Self::clamp_joint_limits) to clamp them now.
    pub fn set_auto_clamp_joint_limits(&mut self, auto_clamp: bool) -> PhysicsResult<()> {
        self.core.ensure_alive()?;
        self.auto_clamp = auto_clamp;
        Ok(())
    }

    /// Clamps the current joint positions to the joint limits.
    pub fn clamp_joint_limits(&mut self) -> PhysicsResult<()> {
        self.core.ensure_alive()?;
        self.clamp_positions(false);
        self.update_kinematics();
        Ok(())
    }

    /// Resets the joints to their zero configuration with no velocity and no
    /// queued force. The root pose and velocities are not changed.
    pub fn clear_joint_states(&mut self) -> PhysicsResult<()> {
        self.core.ensure_alive()?;
        for link in &mut self.links {
            let range = link.pos_offset..link.pos_offset + link.num_positions();
            link.joint_type
                .write_zero_configuration(&mut self.joint_positions[range]);
            link.pending_force = Vector::zero();
        }
        self.base.pending_force = Vector::zero();
        self.joint_velocities.fill(0.0);
        self.joint_forces.fill(0.0);
        self.update_kinematics();
        Ok(())
    }

    /// Linear velocity of the base.
    pub fn root_linear_velocity(&self) -> Vector {
        *self.core.motion.linvel()
    }

    /// Sets the linear velocity of the base.
    pub fn set_root_linear_velocity(&mut self, linvel: Vector) -> PhysicsResult<()> {
        self.core.ensure_dynamic("set_root_linear_velocity")?;
        check_all_finite("root linear velocity", linvel.as_slice())?;
        self.core.motion.set_linvel(linvel);
        self.core.motion.set_awake(true);
        Ok(())
    }

    /// Angular velocity of the base.
    pub fn root_angular_velocity(&self) -> Vector {
        *self.core.motion.angvel()
    }

    /// Sets the angular velocity of the base.
    pub fn set_root_angular_velocity(&mut self, angvel: Vector) -> PhysicsResult<()> {
        self.core.ensure_dynamic("set_root_angular_velocity")?;
        check_all_finite("root angular velocity", angvel.as_slice())?;
        self.core.motion.set_angvel(angvel);
        self.core.motion.set_awake(true);
        Ok(())
    }

    /// Iterates over the base followed by every link.
    pub(crate) fn all_links(&self) -> impl Iterator<Item = (i32, &Link)> {
        std::iter::once((BASE_LINK_ID, &self.base))
            .chain(self.links.iter().enumerate().map(|(i, l)| (i as i32, l)))
    }

    fn clamp_positions(&mut self, stop_velocities: bool) {
        for link in &self.links {
            for k in 0..link.num_positions() {
                let i = link.pos_offset + k;
                let q = self.joint_positions[i];
                let clamped = q.max(self.lower_limits[i]).min(self.upper_limits[i]);
                if clamped != q {
                    self.joint_positions[i] = clamped;
                    if stop_velocities && link.joint_type.positions_match_dofs() {
                        self.joint_velocities[link.dof_offset + k] = 0.0;
                    }
                }
            }
        }
    }

    /// Recomputes the world pose of every link from the root pose and the
    /// joint positions.
    pub(crate) fn update_kinematics(&mut self) {
        let root = *self.core.motion.pose();
        self.base.joint_frame = root;
        self.base.world_pose = root;

        for i in 0..self.links.len() {
            let parent_pose = match self.links[i].parent {
                Some(parent) => self.links[parent].world_pose,
                None => root,
            };
            let link = &mut self.links[i];
            let positions =
                &self.joint_positions[link.pos_offset..link.pos_offset + link.num_positions()];
            link.joint_frame = parent_pose * link.parent_anchor;
            link.world_pose = link.joint_frame * link.joint_type.motion(&link.axis, positions);
        }
    }

    /// Advances the joint state by `dt`.
    ///
    /// Only awake DYNAMIC objects are integrated. Queued joint and link
    /// forces are consumed by the step that integrates them.
    pub(crate) fn integrate(&mut self, dt: Real, gravity: &Vector) {
        if self.core.motion_type() != MotionType::Dynamic || !self.core.motion.is_awake() {
            return;
        }

        let num_dofs = self.num_dofs();
        let mut generalized = std::mem::replace(&mut self.joint_forces, vec![0.0; num_dofs]);
        let base_force = std::mem::take(&mut self.base.pending_force);
        let link_forces: Vec<Vector> = self
            .links
            .iter_mut()
            .map(|link| std::mem::take(&mut link.pending_force))
            .collect();

        // Jacobian transpose of every joint between the link and the base.
        let mut root_force = base_force;
        for (i, force) in link_forces.iter().enumerate() {
            if force.is_zero() {
                continue;
            }
            root_force += force;
            let point = Point::from(self.links[i].world_pose.translation.vector);
            let mut current = Some(i);
            while let Some(j) = current {
                let link = &self.links[j];
                let columns = link.joint_type.point_jacobian(
                    &link.axis,
                    &link.joint_frame,
                    &link.world_pose,
                    &point,
                );
                for (k, column) in columns.iter().enumerate() {
                    generalized[link.dof_offset + k] += column.dot(force);
                }
                current = link.parent;
            }
        }

        for link in &self.links {
            let dofs = link.dof_offset..link.dof_offset + link.num_dofs();
            for dof in dofs.clone() {
                self.joint_velocities[dof] += generalized[dof] / link.joint_inertia * dt;
            }
            let positions = link.pos_offset..link.pos_offset + link.num_positions();
            link.joint_type.integrate_positions(
                &mut self.joint_positions[positions],
                &self.joint_velocities[dofs],
                dt,
            );
        }

        if !self.fixed_base() {
            let total_mass = self.total_mass();
            let angvel = *self.core.motion.angvel();
            let linvel = self.core.motion.linvel() + (root_force / total_mass + gravity) * dt;
            let pose = integrate_pose(self.core.motion.pose(), &Vector::zero(), &linvel, &angvel, dt);
            self.core.motion.store_simulated(pose, linvel, angvel, true);
        }

        if self.auto_clamp {
            self.clamp_positions(true);
        }
        self.update_kinematics();
    }
}

fn check_all_finite(what: &'static str, values: &[Real]) -> PhysicsResult<()> {
    if values.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(PhysicsError::invalid(what, "values must be finite"))
    }
}

impl PhysicsObjectBase for ArticulatedObject {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn accepts_motion_type(&self, motion_type: MotionType) -> bool {
        motion_type != MotionType::Static
    }

    fn on_motion_type_changed(&mut self, previous: MotionType) {
        if previous == MotionType::Dynamic && self.core.motion_type() != MotionType::Dynamic {
            self.joint_forces.fill(0.0);
            self.joint_velocities.fill(0.0);
            for link in &mut self.links {
                link.pending_force = Vector::zero();
            }
            self.base.pending_force = Vector::zero();
            self.core.motion.clear_velocities();
        }
    }

    fn on_pose_changed(&mut self) {
        self.update_kinematics();
    }

    fn can_sleep(&self) -> bool {
        self.attributes.can_sleep
    }
}
