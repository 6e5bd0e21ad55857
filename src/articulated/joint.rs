//! Joint types and their kinematics.

use crate::math::{Isometry, Point, Real, Rotation, Translation3, Vector};
use na::{Quaternion, Unit};
use serde::{Deserialize, Serialize};

/// Type of the joint connecting a link to its parent.
///
/// Some joints have more position coordinates than degrees of freedom: a
/// spherical joint stores its orientation as a quaternion (4 positions) but
/// moves with an angular velocity (3 dofs).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointType {
    /// Rigid connection.
    #[default]
    Fixed,
    /// Rotation about the joint axis.
    Revolute,
    /// Translation along the joint axis.
    Prismatic,
    /// Rotation about the joint axis and translation along it. Positions are
    /// `[angle, offset]`.
    Cylindrical,
    /// Ball and socket. Positions are a quaternion `[x, y, z, w]`, dofs are
    /// an angular velocity in the child frame.
    Spherical,
    /// Rotation about the joint axis, then translation in the plane
    /// orthogonal to it. Positions are `[angle, u, v]`.
    Planar,
}

impl JointType {
    /// Number of degrees of freedom (velocity and force components).
    pub fn num_dofs(self) -> usize {
        match self {
            Self::Fixed => 0,
            Self::Revolute | Self::Prismatic => 1,
            Self::Cylindrical => 2,
            Self::Spherical | Self::Planar => 3,
        }
    }

    /// Number of position coordinates.
    pub fn num_positions(self) -> usize {
        match self {
            Self::Fixed => 0,
            Self::Revolute | Self::Prismatic => 1,
            Self::Cylindrical => 2,
            Self::Spherical => 4,
            Self::Planar => 3,
        }
    }

    /// Does this joint need an axis?
    pub fn has_axis(self) -> bool {
        matches!(
            self,
            Self::Revolute | Self::Prismatic | Self::Cylindrical | Self::Planar
        )
    }

    /// Do position coordinates map one-to-one to degrees of freedom?
    pub fn positions_match_dofs(self) -> bool {
        self.num_dofs() == self.num_positions()
    }

    /// Writes the zero configuration of this joint into `positions`.
    ///
    /// This is all zeros, except for the identity quaternion of spherical
    /// joints.
    pub fn write_zero_configuration(self, positions: &mut [Real]) {
        positions.fill(0.0);
        if self == Self::Spherical {
            positions[3] = 1.0;
        }
    }

    /// Transform from the joint frame to the child link frame at the given
    /// position coordinates.
    pub fn motion(self, axis: &Unit<Vector>, positions: &[Real]) -> Isometry {
        match self {
            Self::Fixed => Isometry::identity(),
            Self::Revolute => Isometry::from_parts(
                Translation3::identity(),
                Rotation::from_axis_angle(axis, positions[0]),
            ),
            Self::Prismatic => Isometry::from_parts(
                Translation3::from(axis.into_inner() * positions[0]),
                Rotation::identity(),
            ),
            Self::Cylindrical => Isometry::from_parts(
                Translation3::from(axis.into_inner() * positions[1]),
                Rotation::from_axis_angle(axis, positions[0]),
            ),
            Self::Spherical => Isometry::from_parts(
                Translation3::identity(),
                spherical_rotation(positions),
            ),
            Self::Planar => {
                let (u, v) = plane_basis(axis);
                Isometry::from_parts(
                    Translation3::from(u * positions[1] + v * positions[2]),
                    Rotation::from_axis_angle(axis, positions[0]),
                )
            }
        }
    }

    /// Advances `positions` by `velocities` over `dt`.
    pub fn integrate_positions(self, positions: &mut [Real], velocities: &[Real], dt: Real) {
        match self {
            Self::Fixed => {}
            Self::Revolute | Self::Prismatic | Self::Cylindrical | Self::Planar => {
                for (q, qd) in positions.iter_mut().zip(velocities) {
                    *q += qd * dt;
                }
            }
            Self::Spherical => {
                let omega = Vector::new(velocities[0], velocities[1], velocities[2]);
                let next = spherical_rotation(positions) * Rotation::from_scaled_axis(omega * dt);
                positions.copy_from_slice(next.coords.as_slice());
            }
        }
    }

    /// Columns of the point Jacobian of this joint.
    ///
    /// Column `k` is the world-space velocity of `point` caused by a unit
    /// velocity of the joint's `k`-th dof. Its dot product with a force
    /// applied at `point` is the generalized force on that dof.
    ///
    /// `joint_frame` is the world pose of the joint frame, `child_frame` the
    /// world pose of the child link.
    pub fn point_jacobian(
        self,
        axis: &Unit<Vector>,
        joint_frame: &Isometry,
        child_frame: &Isometry,
        point: &Point,
    ) -> Vec<Vector> {
        let world_axis = joint_frame.rotation * axis.into_inner();
        match self {
            Self::Fixed => vec![],
            Self::Revolute => {
                let arm = point - Point::from(joint_frame.translation.vector);
                vec![world_axis.cross(&arm)]
            }
            Self::Prismatic => vec![world_axis],
            Self::Cylindrical => {
                let arm = point - Point::from(joint_frame.translation.vector);
                vec![world_axis.cross(&arm), world_axis]
            }
            Self::Spherical => {
                let arm = point - Point::from(child_frame.translation.vector);
                (0..3)
                    .map(|k| {
                        let basis = child_frame.rotation * Vector::ith(k, 1.0);
                        basis.cross(&arm)
                    })
                    .collect()
            }
            Self::Planar => {
                let (u, v) = plane_basis(axis);
                let arm = point - Point::from(child_frame.translation.vector);
                vec![
                    world_axis.cross(&arm),
                    joint_frame.rotation * u,
                    joint_frame.rotation * v,
                ]
            }
        }
    }
}

/// Rotation stored in the `[x, y, z, w]` positions of a spherical joint.
///
/// Degenerate (zero) quaternions are read as the identity.
pub(crate) fn spherical_rotation(positions: &[Real]) -> Rotation {
    let q = Quaternion::new(positions[3], positions[0], positions[1], positions[2]);
    Rotation::try_new(q, 1.0e-6).unwrap_or_else(Rotation::identity)
}

/// Orthonormal basis of the plane orthogonal to `axis`.
pub(crate) fn plane_basis(axis: &Unit<Vector>) -> (Vector, Vector) {
    let helper = if axis.x.abs() < 0.9 {
        Vector::x()
    } else {
        Vector::y()
    };
    let u = axis.cross(&helper).normalize();
    let v = axis.cross(&u);
    (u, v)
}
