//! Rigid-body dynamics (mass properties, forces, velocities, etc.)

pub use body::{DynamicsCapable, Load, MassProperties, RigidBase};
pub use rigid_object::{RigidObject, VelocityControl};

/// Rigid-body properties and the dynamics capability.
pub mod body;
/// Built-in force and velocity integration.
pub mod integrate;
/// Concrete single-body objects.
pub mod rigid_object;
