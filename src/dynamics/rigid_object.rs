//! Concrete single-body objects.

use crate::attributes::ObjectAttributes;
use crate::dynamics::{DynamicsCapable, RigidBase};
use crate::error::PhysicsResult;
use crate::math::{Real, Rotation, Vector};
use crate::object::{MotionType, ObjectCore, PhysicsObjectBase, RigidState};

/// Externally driven velocity targets of a rigid object.
///
/// The world consults this record at the beginning of every step. KINEMATIC
/// objects have their pose integrated from the controlled velocities;
/// DYNAMIC objects have the controlled velocity components written over
/// their current velocities before the dynamics are integrated.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct VelocityControl {
    /// Target linear velocity.
    pub lin_vel: Vector,
    /// Target angular velocity.
    pub ang_vel: Vector,
    /// Whether the linear velocity is controlled.
    pub controlling_lin_vel: bool,
    /// Whether `lin_vel` is expressed in the object's local frame.
    pub lin_vel_is_local: bool,
    /// Whether the angular velocity is controlled.
    pub controlling_ang_vel: bool,
    /// Whether `ang_vel` is expressed in the object's local frame.
    pub ang_vel_is_local: bool,
}

impl VelocityControl {
    /// Is any velocity component controlled?
    pub fn is_active(&self) -> bool {
        self.controlling_lin_vel || self.controlling_ang_vel
    }

    /// World-space linear velocity target for an object with the given rotation.
    pub fn world_lin_vel(&self, rotation: &Rotation) -> Vector {
        if self.lin_vel_is_local {
            rotation * self.lin_vel
        } else {
            self.lin_vel
        }
    }

    /// World-space angular velocity target for an object with the given rotation.
    pub fn world_ang_vel(&self, rotation: &Rotation) -> Vector {
        if self.ang_vel_is_local {
            rotation * self.ang_vel
        } else {
            self.ang_vel
        }
    }

    /// Integrates `state` forward by `dt` with the controlled velocities.
    ///
    /// Uncontrolled components are left unchanged.
    pub fn integrate_transform(&self, dt: Real, state: &RigidState) -> RigidState {
        let mut result = *state;
        if self.controlling_lin_vel {
            result.translation += self.world_lin_vel(&state.rotation) * dt;
        }
        if self.controlling_ang_vel {
            let delta = Rotation::from_scaled_axis(self.world_ang_vel(&state.rotation) * dt);
            result.rotation = delta * state.rotation;
        }
        result
    }
}

/// A single rigid body.
#[derive(Clone, Debug)]
pub struct RigidObject {
    core: ObjectCore,
    base: RigidBase,
    velocity_control: VelocityControl,
    attributes: ObjectAttributes,
}

impl RigidObject {
    pub(crate) fn new(core: ObjectCore, base: RigidBase, attributes: ObjectAttributes) -> Self {
        Self {
            core,
            base,
            velocity_control: VelocityControl::default(),
            attributes,
        }
    }

    /// The template this object was created from.
    pub fn creation_attributes(&self) -> &ObjectAttributes {
        &self.attributes
    }

    /// The velocity control record.
    pub fn velocity_control(&self) -> &VelocityControl {
        &self.velocity_control
    }

    /// The velocity control record, mutably.
    pub fn velocity_control_mut(&mut self) -> PhysicsResult<&mut VelocityControl> {
        self.core.ensure_alive()?;
        Ok(&mut self.velocity_control)
    }

    /// Applies the velocity control for a step of length `dt`.
    pub(crate) fn apply_velocity_control(&mut self, dt: Real) {
        let control = self.velocity_control;
        if !control.is_active() || !self.core.motion.is_awake() {
            return;
        }

        match self.core.motion_type() {
            MotionType::Kinematic => {
                let state = control.integrate_transform(dt, &self.rigid_state());
                self.core.motion.set_pose(state.into());
            }
            MotionType::Dynamic => {
                let rotation = self.rotation();
                if control.controlling_lin_vel {
                    self.core
                        .motion
                        .set_linvel(control.world_lin_vel(&rotation));
                }
                if control.controlling_ang_vel {
                    self.core
                        .motion
                        .set_angvel(control.world_ang_vel(&rotation));
                }
            }
            MotionType::Static => {}
        }
    }
}

impl PhysicsObjectBase for RigidObject {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn on_motion_type_changed(&mut self, previous: MotionType) {
        if previous == MotionType::Dynamic && self.core.motion_type() != MotionType::Dynamic {
            if !self.base.pending_loads().is_empty() {
                log::debug!(
                    "`{}` left DYNAMIC; dropping {} pending loads",
                    self.core.handle(),
                    self.base.pending_loads().len()
                );
            }
            self.base.clear_pending_loads();
            self.core.motion.clear_velocities();
        }
    }
}

impl DynamicsCapable for RigidObject {
    fn rigid_base(&self) -> &RigidBase {
        &self.base
    }

    fn rigid_base_mut(&mut self) -> &mut RigidBase {
        &mut self.base
    }
}
