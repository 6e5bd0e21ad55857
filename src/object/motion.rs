//! Per-object motion record.

use crate::math::{Isometry, Real, Vector};
use num_traits::Zero;

/// Transform, velocities, damping and activation state of an object's root.
///
/// This is the single source of truth the world reconciles with the scene
/// tree and the backend. Writes made outside of a simulation step raise the
/// matching dirty flag so the next synchronization pushes them to the backend
/// instead of being overwritten by the backend's own state.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionState {
    pose: Isometry,
    linvel: Vector,
    angvel: Vector,
    linear_damping: Real,
    angular_damping: Real,
    awake: bool,
    pose_dirty: bool,
    velocity_dirty: bool,
}

impl MotionState {
    /// A motion state at rest at the given pose.
    pub fn new(pose: Isometry) -> Self {
        Self {
            pose,
            linvel: Vector::zero(),
            angvel: Vector::zero(),
            linear_damping: 0.0,
            angular_damping: 0.0,
            awake: true,
            pose_dirty: true,
            velocity_dirty: true,
        }
    }

    /// World-space pose of the root.
    pub fn pose(&self) -> &Isometry {
        &self.pose
    }

    /// Linear velocity of the root, in world space.
    pub fn linvel(&self) -> &Vector {
        &self.linvel
    }

    /// Angular velocity of the root, in world space.
    pub fn angvel(&self) -> &Vector {
        &self.angvel
    }

    /// Linear damping coefficient.
    pub fn linear_damping(&self) -> Real {
        self.linear_damping
    }

    /// Angular damping coefficient.
    pub fn angular_damping(&self) -> Real {
        self.angular_damping
    }

    /// Is the object being simulated (as opposed to sleeping)?
    pub fn is_awake(&self) -> bool {
        self.awake
    }

    pub(crate) fn set_pose(&mut self, pose: Isometry) {
        self.pose = pose;
        self.pose_dirty = true;
    }

    pub(crate) fn set_linvel(&mut self, linvel: Vector) {
        self.linvel = linvel;
        self.velocity_dirty = true;
    }

    pub(crate) fn set_angvel(&mut self, angvel: Vector) {
        self.angvel = angvel;
        self.velocity_dirty = true;
    }

    pub(crate) fn set_linear_damping(&mut self, damping: Real) {
        self.linear_damping = damping;
        self.velocity_dirty = true;
    }

    pub(crate) fn set_angular_damping(&mut self, damping: Real) {
        self.angular_damping = damping;
        self.velocity_dirty = true;
    }

    pub(crate) fn set_awake(&mut self, awake: bool) {
        self.awake = awake;
        self.velocity_dirty = true;
    }

    pub(crate) fn clear_velocities(&mut self) {
        self.set_linvel(Vector::zero());
        self.set_angvel(Vector::zero());
    }

    /// Overwrites the state with values read back from a simulation step.
    ///
    /// Unlike user writes, this does not mark anything dirty.
    pub(crate) fn store_simulated(
        &mut self,
        pose: Isometry,
        linvel: Vector,
        angvel: Vector,
        awake: bool,
    ) {
        self.pose = pose;
        self.linvel = linvel;
        self.angvel = angvel;
        self.awake = awake;
    }

    pub(crate) fn is_pose_dirty(&self) -> bool {
        self.pose_dirty
    }

    pub(crate) fn is_velocity_dirty(&self) -> bool {
        self.velocity_dirty
    }

    pub(crate) fn mark_synced(&mut self) {
        self.pose_dirty = false;
        self.velocity_dirty = false;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.pose_dirty = true;
        self.velocity_dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_writes_are_dirty_simulated_writes_are_not() {
        let mut state = MotionState::new(Isometry::identity());
        state.mark_synced();
        state.store_simulated(
            Isometry::translation(1.0, 0.0, 0.0),
            Vector::x(),
            Vector::zero(),
            true,
        );
        assert!(!state.is_pose_dirty());
        assert!(!state.is_velocity_dirty());

        state.set_pose(Isometry::identity());
        assert!(state.is_pose_dirty());
        state.set_linvel(Vector::y());
        assert!(state.is_velocity_dirty());
    }
}
