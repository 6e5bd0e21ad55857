//! Force and velocity integration.
//!
//! This is the integrator used for rigid objects when the installed backend
//! does not simulate dynamics itself. It has no collision response: it only
//! turns queued loads, gravity and damping into velocities and poses.

use crate::dynamics::{DynamicsCapable, Load, RigidObject};
use crate::math::{AngularInertia, Isometry, Real, Rotation, Translation3, Vector};
use crate::object::{MotionType, PhysicsObjectBase};
use num_traits::Zero;

/// Integrates the loads, velocities and pose of a rigid object over `dt`.
///
/// Only awake DYNAMIC objects are integrated. Their queued loads are
/// consumed in the order they were applied; a sleeping object keeps its
/// queue until it is integrated again.
pub fn integrate_rigid_object(object: &mut RigidObject, dt: Real, gravity: &Vector) {
    if object.motion_type() != MotionType::Dynamic || !object.is_active() {
        return;
    }
    let loads = object.rigid_base_mut().take_pending_loads();

    let mprops = *object.rigid_base().mass_properties();
    let pose = object.pose();
    let inv_mass = mprops.inv_mass();
    let inv_inertia = world_inv_inertia(&pose.rotation, &mprops.inv_principal_inertia());

    let mut linvel = object.linear_velocity();
    let mut angvel = object.angular_velocity();
    let mut force = Vector::zero();
    let mut torque = Vector::zero();

    for load in loads {
        match load {
            Load::Force {
                force: f,
                relative_position,
            } => {
                force += f;
                torque += relative_position.cross(&f);
            }
            Load::Impulse {
                impulse,
                relative_position,
            } => {
                linvel += impulse * inv_mass;
                angvel += inv_inertia * relative_position.cross(&impulse);
            }
            Load::Torque(t) => torque += t,
            Load::ImpulseTorque(t) => angvel += inv_inertia * t,
        }
    }

    linvel += (force * inv_mass + gravity) * dt;
    angvel += inv_inertia * torque * dt;
    linvel *= damping_factor(object.linear_damping(), dt);
    angvel *= damping_factor(object.angular_damping(), dt);

    let next_pose = integrate_pose(&pose, &mprops.local_com, &linvel, &angvel, dt);
    object
        .core_mut()
        .motion
        .store_simulated(next_pose, linvel, angvel, true);
}

/// World-space inverse inertia tensor of a body with the given orientation.
pub fn world_inv_inertia(rotation: &Rotation, inv_principal_inertia: &Vector) -> AngularInertia {
    let r = rotation.to_rotation_matrix();
    r.matrix() * AngularInertia::from_diagonal(inv_principal_inertia) * r.matrix().transpose()
}

/// Velocity scaling applied by a damping coefficient over `dt`.
pub fn damping_factor(damping: Real, dt: Real) -> Real {
    (1.0 - damping).clamp(0.0, 1.0).powf(dt)
}

/// Moves a pose with the given center-of-mass velocities.
///
/// The body rotates around its center of mass, `local_com`, not around its
/// frame origin.
pub fn integrate_pose(
    pose: &Isometry,
    local_com: &Vector,
    linvel: &Vector,
    angvel: &Vector,
    dt: Real,
) -> Isometry {
    let com = pose * na::Point3::from(*local_com);
    let next_com = com + linvel * dt;
    let next_rotation = Rotation::from_scaled_axis(angvel * dt) * pose.rotation;
    let translation = next_com.coords - next_rotation * local_com;
    Isometry::from_parts(Translation3::from(translation), next_rotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn no_damping_keeps_velocity() {
        assert_eq!(damping_factor(0.0, 0.1), 1.0);
        assert!(damping_factor(0.5, 1.0) < 1.0);
        assert_eq!(damping_factor(2.0, 1.0), 0.0);
    }

    #[test]
    fn rotation_is_about_the_center_of_mass() {
        let com = Vector::new(1.0, 0.0, 0.0);
        let pose = Isometry::identity();
        let angvel = Vector::new(0.0, std::f32::consts::PI, 0.0);
        let next = integrate_pose(&pose, &com, &Vector::zeros(), &angvel, 1.0);
        // Half a turn about the COM at (1, 0, 0) moves the origin to (2, 0, 0).
        assert_relative_eq!(
            next.translation.vector,
            Vector::new(2.0, 0.0, 0.0),
            epsilon = 1.0e-5
        );
        let com_after = next * na::Point3::from(com);
        assert_relative_eq!(com_after.coords, com, epsilon = 1.0e-5);
    }

    #[test]
    fn inverse_inertia_rotates_with_the_body() {
        let rotation = Rotation::from_axis_angle(&Vector::z_axis(), std::f32::consts::FRAC_PI_2);
        let inv = world_inv_inertia(&rotation, &Vector::new(1.0, 2.0, 3.0));
        assert_relative_eq!(inv.diagonal(), Vector::new(2.0, 1.0, 3.0), epsilon = 1.0e-5);
    }
}
