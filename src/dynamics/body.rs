//! Rigid-body properties and the dynamics capability.

use crate::attributes::ObjectAttributes;
use crate::error::{check_non_negative, check_positive, PhysicsError, PhysicsResult};
use crate::math::{AngularInertia, Real, Vector};
use crate::object::PhysicsObjectBase;
use crate::shapes::CollisionShape;

#[derive(Copy, Clone, Debug, PartialEq)]
/// Rigid-body mass properties in the body's local frame.
///
/// The body is assumed to be simulated in its principal axes of inertia, so
/// the inertia tensor is fully described by its diagonal.
pub struct MassProperties {
    /// The mass.
    pub mass: Real,
    /// The diagonal of the inertia tensor.
    pub principal_inertia: Vector,
    /// The center of mass, in local space.
    pub local_com: Vector,
}

impl MassProperties {
    /// The inverse mass.
    pub fn inv_mass(&self) -> Real {
        1.0 / self.mass
    }

    /// The full (diagonal) inertia tensor.
    pub fn inertia_matrix(&self) -> AngularInertia {
        AngularInertia::from_diagonal(&self.principal_inertia)
    }

    /// The diagonal of the inverse inertia tensor.
    pub fn inv_principal_inertia(&self) -> Vector {
        self.principal_inertia.map(|i| 1.0 / i)
    }
}

impl Default for MassProperties {
    fn default() -> Self {
        Self {
            mass: 1.0,
            principal_inertia: Vector::repeat(1.0),
            local_com: Vector::zeros(),
        }
    }
}

/// An external load queued on a rigid body until the next simulation step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Load {
    /// A force applied during the step, at an offset from the center of mass.
    Force {
        /// World-space force.
        force: Vector,
        /// World-space offset of the application point from the center of mass.
        relative_position: Vector,
    },
    /// An instantaneous change of momentum, at an offset from the center of mass.
    Impulse {
        /// World-space impulse.
        impulse: Vector,
        /// World-space offset of the application point from the center of mass.
        relative_position: Vector,
    },
    /// A torque applied during the step.
    Torque(Vector),
    /// An instantaneous change of angular momentum.
    ImpulseTorque(Vector),
}

/// Dynamics properties of a rigid body.
#[derive(Clone, Debug, PartialEq)]
pub struct RigidBase {
    pub(crate) mprops: MassProperties,
    friction: Real,
    restitution: Real,
    semantic_id: u32,
    collidable: bool,
    scale: Vector,
    collision_shape: Option<CollisionShape>,
    margin: Real,
    pending_loads: Vec<Load>,
}

impl RigidBase {
    /// Builds the dynamics properties described by a template.
    ///
    /// The world defaults are used for unset coefficients, and the inertia is
    /// derived from the scaled collision shape when the template has none.
    pub fn from_attributes(
        attributes: &ObjectAttributes,
        default_friction: Real,
        default_restitution: Real,
    ) -> PhysicsResult<Self> {
        check_positive("mass", attributes.mass)?;
        check_non_negative("margin", attributes.margin)?;
        check_finite("center of mass", &attributes.com)?;
        if !attributes.scale.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(PhysicsError::invalid(
                "scale",
                "components must be finite and positive",
            ));
        }

        let collision_shape = attributes.scaled_collision_shape();
        if let Some(shape) = &collision_shape {
            if !shape.is_valid() {
                return Err(PhysicsError::invalid(
                    "collision shape",
                    format!("degenerate shape {shape:?}"),
                ));
            }
        }

        let principal_inertia = match (attributes.inertia, &collision_shape) {
            (Some(inertia), _) => inertia,
            (None, Some(shape)) => shape.principal_inertia(attributes.mass),
            (None, None) => Vector::repeat(attributes.mass),
        };
        check_inertia(&principal_inertia)?;

        let friction = attributes.friction_coefficient.unwrap_or(default_friction);
        let restitution = attributes
            .restitution_coefficient
            .unwrap_or(default_restitution);
        check_non_negative("friction coefficient", friction)?;
        check_non_negative("restitution coefficient", restitution)?;

        Ok(Self {
            mprops: MassProperties {
                mass: attributes.mass,
                principal_inertia,
                local_com: attributes.com,
            },
            friction,
            restitution,
            semantic_id: attributes.semantic_id,
            collidable: attributes.is_collidable,
            scale: attributes.scale,
            collision_shape,
            margin: attributes.margin,
            pending_loads: vec![],
        })
    }

    /// The mass properties.
    pub fn mass_properties(&self) -> &MassProperties {
        &self.mprops
    }

    /// The scaled collision shape, if any.
    pub fn collision_shape(&self) -> Option<&CollisionShape> {
        self.collision_shape.as_ref()
    }

    /// The collision margin requested at creation.
    pub fn initial_margin(&self) -> Real {
        self.margin
    }

    /// Loads queued for the next step, in application order.
    pub fn pending_loads(&self) -> &[Load] {
        &self.pending_loads
    }

    pub(crate) fn take_pending_loads(&mut self) -> Vec<Load> {
        std::mem::take(&mut self.pending_loads)
    }

    pub(crate) fn clear_pending_loads(&mut self) {
        self.pending_loads.clear();
    }
}

fn check_inertia(inertia: &Vector) -> PhysicsResult<()> {
    if inertia.iter().all(|i| i.is_finite() && *i > 0.0) {
        Ok(())
    } else {
        Err(PhysicsError::invalid(
            "inertia diagonal",
            format!("components must be finite and positive, got {inertia:?}"),
        ))
    }
}

fn check_finite(what: &'static str, v: &Vector) -> PhysicsResult<()> {
    if v.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(PhysicsError::invalid(what, "components must be finite"))
    }
}

/// Rigid-body dynamics capability.
///
/// Every getter works whatever the motion type, so a STATIC object still
/// reports its last known mass and velocities. Setters of dynamics-only
/// properties (mass, inertia, velocities, damping, friction, restitution)
/// and load application are rejected with [`PhysicsError::MotionType`]
/// unless the object is DYNAMIC.
pub trait DynamicsCapable: PhysicsObjectBase {
    /// The rigid-body properties.
    fn rigid_base(&self) -> &RigidBase;
    /// The rigid-body properties, mutably.
    fn rigid_base_mut(&mut self) -> &mut RigidBase;

    /// The scale applied at creation. Read-only.
    fn scale(&self) -> Vector {
        self.rigid_base().scale
    }

    /// The mass.
    fn mass(&self) -> Real {
        self.rigid_base().mprops.mass
    }

    /// Sets the mass.
    fn set_mass(&mut self, mass: Real) -> PhysicsResult<()> {
        self.core().ensure_dynamic("set_mass")?;
        check_positive("mass", mass)?;
        self.rigid_base_mut().mprops.mass = mass;
        self.core_mut().mark_properties_dirty();
        Ok(())
    }

    /// The diagonal of the inertia tensor.
    fn inertia_diagonal(&self) -> Vector {
        self.rigid_base().mprops.principal_inertia
    }

    /// Sets the diagonal of the inertia tensor.
    fn set_inertia_diagonal(&mut self, inertia: Vector) -> PhysicsResult<()> {
        self.core().ensure_dynamic("set_inertia_diagonal")?;
        check_inertia(&inertia)?;
        self.rigid_base_mut().mprops.principal_inertia = inertia;
        self.core_mut().mark_properties_dirty();
        Ok(())
    }

    /// The inertia tensor, derived from its diagonal. Read-only.
    fn inertia_matrix(&self) -> AngularInertia {
        self.rigid_base().mprops.inertia_matrix()
    }

    /// The center of mass, in the object's local frame.
    fn com(&self) -> Vector {
        self.rigid_base().mprops.local_com
    }

    /// Sets the center of mass, in the object's local frame.
    fn set_com(&mut self, com: Vector) -> PhysicsResult<()> {
        self.core().ensure_alive()?;
        check_finite("center of mass", &com)?;
        self.rigid_base_mut().mprops.local_com = com;
        self.core_mut().mark_properties_dirty();
        Ok(())
    }

    /// World-space linear velocity.
    fn linear_velocity(&self) -> Vector {
        *self.core().motion.linvel()
    }

    /// Sets the world-space linear velocity and wakes the object up.
    fn set_linear_velocity(&mut self, linvel: Vector) -> PhysicsResult<()> {
        self.core().ensure_dynamic("set_linear_velocity")?;
        check_finite("linear velocity", &linvel)?;
        let motion = &mut self.core_mut().motion;
        motion.set_linvel(linvel);
        motion.set_awake(true);
        Ok(())
    }

    /// World-space angular velocity.
    fn angular_velocity(&self) -> Vector {
        *self.core().motion.angvel()
    }

    /// Sets the world-space angular velocity and wakes the object up.
    fn set_angular_velocity(&mut self, angvel: Vector) -> PhysicsResult<()> {
        self.core().ensure_dynamic("set_angular_velocity")?;
        check_finite("angular velocity", &angvel)?;
        let motion = &mut self.core_mut().motion;
        motion.set_angvel(angvel);
        motion.set_awake(true);
        Ok(())
    }

    /// Linear damping coefficient.
    fn linear_damping(&self) -> Real {
        self.core().motion.linear_damping()
    }

    /// Sets the linear damping coefficient.
    fn set_linear_damping(&mut self, damping: Real) -> PhysicsResult<()> {
        self.core().ensure_dynamic("set_linear_damping")?;
        check_non_negative("linear damping", damping)?;
        self.core_mut().motion.set_linear_damping(damping);
        Ok(())
    }

    /// Angular damping coefficient.
    fn angular_damping(&self) -> Real {
        self.core().motion.angular_damping()
    }

    /// Sets the angular damping coefficient.
    fn set_angular_damping(&mut self, damping: Real) -> PhysicsResult<()> {
        self.core().ensure_dynamic("set_angular_damping")?;
        check_non_negative("angular damping", damping)?;
        self.core_mut().motion.set_angular_damping(damping);
        Ok(())
    }

    /// Friction coefficient.
    fn friction_coefficient(&self) -> Real {
        self.rigid_base().friction
    }

    /// Sets the friction coefficient.
    fn set_friction_coefficient(&mut self, friction: Real) -> PhysicsResult<()> {
        self.core().ensure_dynamic("set_friction_coefficient")?;
        check_non_negative("friction coefficient", friction)?;
        self.rigid_base_mut().friction = friction;
        self.core_mut().mark_properties_dirty();
        Ok(())
    }

    /// Restitution coefficient.
    fn restitution_coefficient(&self) -> Real {
        self.rigid_base().restitution
    }

    /// Sets the restitution coefficient.
    fn set_restitution_coefficient(&mut self, restitution: Real) -> PhysicsResult<()> {
        self.core().ensure_dynamic("set_restitution_coefficient")?;
        check_non_negative("restitution coefficient", restitution)?;
        self.rigid_base_mut().restitution = restitution;
        self.core_mut().mark_properties_dirty();
        Ok(())
    }

    /// Semantic id.
    fn semantic_id(&self) -> u32 {
        self.rigid_base().semantic_id
    }

    /// Sets the semantic id.
    fn set_semantic_id(&mut self, semantic_id: u32) -> PhysicsResult<()> {
        self.core().ensure_alive()?;
        self.rigid_base_mut().semantic_id = semantic_id;
        Ok(())
    }

    /// Whether collisions are enabled.
    fn is_collidable(&self) -> bool {
        self.rigid_base().collidable
    }

    /// Enables or disables collisions.
    fn set_collidable(&mut self, collidable: bool) -> PhysicsResult<()> {
        self.core().ensure_alive()?;
        self.rigid_base_mut().collidable = collidable;
        self.core_mut().mark_properties_dirty();
        Ok(())
    }

    /// Queues a force applied at `relative_position` from the center of mass.
    ///
    /// Both vectors are in world space. The force acts during the next step
    /// only.
    fn apply_force(&mut self, force: Vector, relative_position: Vector) -> PhysicsResult<()> {
        self.queue_load(
            "apply_force",
            Load::Force {
                force,
                relative_position,
            },
        )
    }

    /// Queues an impulse applied at `relative_position` from the center of mass.
    fn apply_impulse(&mut self, impulse: Vector, relative_position: Vector) -> PhysicsResult<()> {
        self.queue_load(
            "apply_impulse",
            Load::Impulse {
                impulse,
                relative_position,
            },
        )
    }

    /// Queues a world-space torque acting during the next step.
    fn apply_torque(&mut self, torque: Vector) -> PhysicsResult<()> {
        self.queue_load("apply_torque", Load::Torque(torque))
    }

    /// Queues a world-space torque impulse.
    fn apply_impulse_torque(&mut self, impulse: Vector) -> PhysicsResult<()> {
        self.queue_load("apply_impulse_torque", Load::ImpulseTorque(impulse))
    }

    /// Validates and queues a load, waking the object up.
    #[doc(hidden)]
    fn queue_load(&mut self, operation: &'static str, load: Load) -> PhysicsResult<()> {
        self.core().ensure_dynamic(operation)?;
        let finite = match &load {
            Load::Force {
                force: v,
                relative_position: p,
            }
            | Load::Impulse {
                impulse: v,
                relative_position: p,
            } => v.iter().chain(p.iter()).all(|x| x.is_finite()),
            Load::Torque(v) | Load::ImpulseTorque(v) => v.iter().all(|x| x.is_finite()),
        };
        if !finite {
            return Err(PhysicsError::invalid(operation, "components must be finite"));
        }
        self.rigid_base_mut().pending_loads.push(load);
        self.core_mut().motion.set_awake(true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inertia_defaults_to_the_shape() {
        let attributes = ObjectAttributes {
            mass: 5.0,
            collision_shape: Some(CollisionShape::ball(2.0)),
            ..ObjectAttributes::new("ball")
        };
        let base = RigidBase::from_attributes(&attributes, 0.4, 0.1).unwrap();
        assert_eq!(base.mass_properties().principal_inertia, Vector::repeat(8.0));
        // The template sets its own coefficients.
        assert_eq!(base.friction, 0.5);
    }

    #[test]
    fn world_defaults_fill_unset_coefficients() {
        let attributes = ObjectAttributes {
            friction_coefficient: None,
            restitution_coefficient: None,
            ..ObjectAttributes::new("box")
        };
        let base = RigidBase::from_attributes(&attributes, 0.7, 0.3).unwrap();
        assert_eq!(base.friction, 0.7);
        assert_eq!(base.restitution, 0.3);
    }

    #[test]
    fn invalid_templates_are_rejected() {
        let zero_mass = ObjectAttributes {
            mass: 0.0,
            ..ObjectAttributes::new("bad")
        };
        assert!(RigidBase::from_attributes(&zero_mass, 0.4, 0.1).is_err());

        let bad_inertia = ObjectAttributes {
            inertia: Some(Vector::new(1.0, -1.0, 1.0)),
            ..ObjectAttributes::new("bad")
        };
        assert!(RigidBase::from_attributes(&bad_inertia, 0.4, 0.1).is_err());

        let nan_com = ObjectAttributes {
            com: Vector::new(0.0, Real::NAN, 0.0),
            ..ObjectAttributes::new("bad")
        };
        assert!(matches!(
            RigidBase::from_attributes(&nan_com, 0.4, 0.1),
            Err(PhysicsError::InvalidArgument {
                what: "center of mass",
                ..
            })
        ));
    }

    #[test]
    fn inertia_matrix_is_diagonal() {
        let mprops = MassProperties {
            mass: 2.0,
            principal_inertia: Vector::new(1.0, 2.0, 3.0),
            local_com: Vector::zeros(),
        };
        let m = mprops.inertia_matrix();
        assert_eq!(m.diagonal(), Vector::new(1.0, 2.0, 3.0));
        assert_eq!(m[(0, 1)], 0.0);
        assert_eq!(mprops.inv_principal_inertia(), Vector::new(1.0, 0.5, 1.0 / 3.0));
    }
}
