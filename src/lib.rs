#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

extern crate nalgebra as na;
/// Re-export of the Rapier 3D physics engine.
///
/// This is available when the `rapier` feature is enabled.
#[cfg(feature = "rapier")]
pub extern crate rapier3d as rapier;

/// Articulated (multi-link) objects, their joints and joint-state vectors.
pub mod articulated;
/// Physics backend adapters.
///
/// The [`backend::PhysicsBackend`] trait is the seam between the object model
/// and a concrete solver. [`backend::NullBackend`] is used when no solver is
/// installed and reports every backend-specific query as unsupported.
pub mod backend;
/// World-level configuration.
pub mod config;
/// Rigid-body dynamics properties, loads and the built-in integrator.
pub mod dynamics;
/// Error types shared by every object operation.
pub mod error;
/// Identity, lifecycle and pose state common to every physics object.
pub mod object;
/// Templates objects are created from.
pub mod attributes;
/// Scene tree the physics objects publish their poses to.
pub mod scene;
/// Collision shape descriptions and derived mass properties.
pub mod shapes;
/// The world owning every physics object.
pub mod world;

/// Mathematical types used throughout the crate.
pub mod math {
    pub use na::{Isometry3, Matrix3, Matrix4, Point3, Translation3, UnitQuaternion, Vector3};

    /// The scalar type used by the object model.
    pub type Real = f32;
    /// A 3D vector.
    pub type Vector = Vector3<Real>;
    /// A 3D point.
    pub type Point = Point3<Real>;
    /// A 3D rotation, stored as a unit quaternion.
    pub type Rotation = UnitQuaternion<Real>;
    /// A rigid transformation (rotation followed by a translation).
    pub type Isometry = Isometry3<Real>;
    /// Angular inertia tensor.
    pub type AngularInertia = Matrix3<Real>;
}

/// Commonly used types and traits.
pub mod prelude {
    pub use crate::articulated::{ArticulatedObject, JointType, Link, BASE_LINK_ID};
    pub use crate::attributes::{
        ArticulatedObjectAttributes, LinkAttributes, ObjectAttributes, UserAttributes,
    };
    pub use crate::backend::{NullBackend, PhysicsBackend};
    pub use crate::config::{BackendKind, WorldConfig};
    pub use crate::dynamics::{DynamicsCapable, RigidObject, VelocityControl};
    pub use crate::error::{PhysicsError, PhysicsResult};
    pub use crate::math::*;
    pub use crate::object::{
        CollisionGroup, MotionType, ObjectId, PhysicsObject, PhysicsObjectBase, RigidState,
    };
    pub use crate::scene::{NodeId, SceneTree};
    pub use crate::shapes::{Aabb, CollisionShape};
    pub use crate::world::{ObjectKey, PhysicsWorld};
}
