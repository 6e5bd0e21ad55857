pub use null::NullBackend;
#[cfg(feature = "rapier")]
pub use self::rapier::RapierBackend;

use crate::dynamics::Load;
use crate::error::PhysicsResult;
use crate::math::{Isometry, Real, Vector};
use crate::object::{CollisionGroup, MotionType, ObjectId};
use crate::shapes::{Aabb, CollisionShape};

mod null;
#[cfg(feature = "rapier")]
mod rapier;

/// Identifies one backend body.
///
/// Rigid objects map to a single body with `link == None`. Every link of an
/// articulated object, including its base ([`BASE_LINK_ID`](crate::articulated::BASE_LINK_ID)),
/// maps to its own body.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BodyKey {
    /// The object owning the body.
    pub object: ObjectId,
    /// The link of an articulated object.
    pub link: Option<i32>,
}

impl BodyKey {
    /// The body of a rigid object.
    pub fn rigid(object: ObjectId) -> Self {
        Self { object, link: None }
    }

    /// The body of one link of an articulated object.
    pub fn link(object: ObjectId, link: i32) -> Self {
        Self {
            object,
            link: Some(link),
        }
    }
}

/// Everything a backend needs to know about a body.
#[derive(Clone, Debug, PartialEq)]
pub struct BodyDesc {
    /// How the body moves.
    pub motion_type: MotionType,
    /// World pose of the body frame.
    pub pose: Isometry,
    /// Linear velocity of the center of mass.
    pub linvel: Vector,
    /// Angular velocity.
    pub angvel: Vector,
    /// Mass.
    pub mass: Real,
    /// Principal angular inertia.
    pub inertia_diagonal: Vector,
    /// Center of mass, in the body's local frame.
    pub com: Vector,
    /// Linear damping coefficient.
    pub linear_damping: Real,
    /// Angular damping coefficient.
    pub angular_damping: Real,
    /// Friction coefficient.
    pub friction: Real,
    /// Restitution coefficient.
    pub restitution: Real,
    /// Are collisions enabled?
    pub collidable: bool,
    /// Collision group.
    pub collision_group: CollisionGroup,
    /// Collision shape, already scaled.
    pub shape: Option<CollisionShape>,
    /// Collision margin.
    pub margin: Real,
    /// Is the body awake?
    pub awake: bool,
}

/// Which parts of a [`BodyDesc`] changed since the last synchronization.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct BodySync {
    /// The pose changed.
    pub pose: bool,
    /// Velocities, damping or activation changed.
    pub velocity: bool,
    /// Mass, material, collision or motion type changed.
    pub properties: bool,
}

impl BodySync {
    /// Everything changed.
    pub fn all() -> Self {
        Self {
            pose: true,
            velocity: true,
            properties: true,
        }
    }

    /// Is there anything to push?
    pub fn any(&self) -> bool {
        self.pose || self.velocity || self.properties
    }
}

/// State of a body as simulated by the backend.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BodyState {
    /// World pose of the body frame.
    pub pose: Isometry,
    /// Linear velocity of the center of mass.
    pub linvel: Vector,
    /// Angular velocity.
    pub angvel: Vector,
    /// Is the body awake?
    pub awake: bool,
}

/// A physics solver the world delegates to.
///
/// The world owns the authoritative object state and pushes it in before
/// each step and each query; the backend reports simulated poses back after
/// a step. Backend-specific queries return
/// [`PhysicsError::Unsupported`](crate::error::PhysicsError::Unsupported)
/// when a backend cannot answer them.
pub trait PhysicsBackend {
    /// Human-readable name of the backend.
    fn name(&self) -> &str;

    /// Prefix of the class names of objects simulated by this backend.
    fn class_prefix(&self) -> &str;

    /// Does [`step`](Self::step) integrate rigid-body dynamics?
    ///
    /// When it does not, the world uses its built-in integrator.
    fn simulates_dynamics(&self) -> bool;

    /// Adds a body.
    fn insert_body(&mut self, key: BodyKey, desc: &BodyDesc) -> PhysicsResult<()>;

    /// Pushes the parts of `desc` selected by `sync` into an existing body.
    fn update_body(&mut self, key: BodyKey, desc: &BodyDesc, sync: BodySync) -> PhysicsResult<()>;

    /// Removes every body of an object.
    fn remove_object(&mut self, object: ObjectId);

    /// Applies queued loads to a body, in order.
    fn apply_loads(&mut self, key: BodyKey, loads: &[Load]) -> PhysicsResult<()>;

    /// Drops loads applied since the last step, after that step failed to run.
    fn discard_loads(&mut self) {}

    /// Advances the simulation by `dt`.
    fn step(&mut self, dt: Real, gravity: &Vector) -> PhysicsResult<()>;

    /// The simulated state of a body.
    fn body_state(&self, key: BodyKey) -> PhysicsResult<BodyState>;

    /// Is any body of `object` currently in contact with another object?
    fn contact_test(&self, object: ObjectId) -> PhysicsResult<bool>;

    /// Bounding box of a body's collision shape, in its local frame.
    fn collision_shape_aabb(&self, key: BodyKey) -> PhysicsResult<Aabb>;

    /// Collision margin of a body.
    fn collision_margin(&self, key: BodyKey) -> PhysicsResult<Real>;

    /// Sets the collision margin of a body.
    fn set_collision_margin(&mut self, key: BodyKey, margin: Real) -> PhysicsResult<()>;
}
