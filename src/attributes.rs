//! Creation templates.
//!
//! A template is consumed when an object is created; the object keeps a copy
//! of it as a read-only snapshot. Nothing here is interpreted after creation
//! except through the object that was built from it.

use crate::articulated::JointType;
use crate::math::{Isometry, Real, Vector};
use crate::object::MotionType;
use crate::shapes::CollisionShape;
use serde::{Deserialize, Serialize};

/// Arbitrary user metadata attached to an object. Never read by this crate.
pub type UserAttributes = serde_json::Map<String, serde_json::Value>;

/// Template of a rigid object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectAttributes {
    /// Name of the template. Object handles are derived from it.
    pub handle: String,
    /// Initial motion type.
    pub motion_type: MotionType,
    /// Mass of the object.
    pub mass: Real,
    /// Diagonal of the inertia tensor. Derived from `collision_shape` when unset.
    pub inertia: Option<Vector>,
    /// Center of mass, in the object's local frame.
    pub com: Vector,
    /// Scale applied to the collision shape and render assets.
    pub scale: Vector,
    /// Linear damping coefficient.
    pub linear_damping: Real,
    /// Angular damping coefficient.
    pub angular_damping: Real,
    /// Friction coefficient. The world default is used when unset.
    pub friction_coefficient: Option<Real>,
    /// Restitution coefficient. The world default is used when unset.
    pub restitution_coefficient: Option<Real>,
    /// Collision margin handed to the backend.
    pub margin: Real,
    /// Semantic id used by downstream consumers.
    pub semantic_id: u32,
    /// Whether the object starts with collisions enabled.
    pub is_collidable: bool,
    /// Collision shape, before scaling.
    pub collision_shape: Option<CollisionShape>,
    /// Render assets; each one gets a visual scene node under the object's root.
    pub render_asset_handles: Vec<String>,
    /// Key of the light setup the render assets are drawn with.
    pub light_setup_key: String,
    /// Opaque user metadata.
    pub user_attributes: UserAttributes,
}

impl Default for ObjectAttributes {
    fn default() -> Self {
        Self {
            handle: "object".to_string(),
            motion_type: MotionType::Dynamic,
            mass: 1.0,
            inertia: None,
            com: Vector::zeros(),
            scale: Vector::repeat(1.0),
            linear_damping: 0.2,
            angular_damping: 0.2,
            friction_coefficient: Some(0.5),
            restitution_coefficient: Some(0.1),
            margin: 0.04,
            semantic_id: 0,
            is_collidable: true,
            collision_shape: None,
            render_asset_handles: vec![],
            light_setup_key: String::new(),
            user_attributes: UserAttributes::new(),
        }
    }
}

impl ObjectAttributes {
    /// A default template with the given handle.
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            ..Default::default()
        }
    }

    /// Parses a template from its JSON representation.
    pub fn from_json_str(json: &str) -> crate::error::PhysicsResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| crate::error::PhysicsError::invalid("object attributes", e.to_string()))
    }

    /// The collision shape after applying `scale`.
    pub fn scaled_collision_shape(&self) -> Option<CollisionShape> {
        self.collision_shape.map(|shape| shape.scaled(&self.scale))
    }
}

/// Template of one link of an articulated object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkAttributes {
    /// Name of the link.
    pub name: String,
    /// Index of the parent link, `None` for links attached to the base.
    pub parent: Option<usize>,
    /// Type of the joint connecting this link to its parent.
    pub joint_type: JointType,
    /// Joint axis, in the joint frame.
    pub joint_axis: Vector,
    /// Pose of the joint frame relative to the parent link frame.
    pub parent_anchor: Isometry,
    /// Lower position limits, one per position coordinate. Unlimited when empty.
    pub lower_limits: Vec<Real>,
    /// Upper position limits, one per position coordinate. Unlimited when empty.
    pub upper_limits: Vec<Real>,
    /// Mass of the link.
    pub mass: Real,
    /// Diagonal generalized inertia of each of the joint's degrees of freedom.
    pub joint_inertia: Real,
    /// Friction coefficient of the link's collider.
    pub friction_coefficient: Real,
    /// Collision shape of the link.
    pub collision_shape: Option<CollisionShape>,
    /// Render assets attached to the link.
    pub render_asset_handles: Vec<String>,
}

impl Default for LinkAttributes {
    fn default() -> Self {
        Self {
            name: String::new(),
            parent: None,
            joint_type: JointType::Fixed,
            joint_axis: Vector::z(),
            parent_anchor: Isometry::identity(),
            lower_limits: vec![],
            upper_limits: vec![],
            mass: 1.0,
            joint_inertia: 1.0,
            friction_coefficient: 0.5,
            collision_shape: None,
            render_asset_handles: vec![],
        }
    }
}

impl LinkAttributes {
    /// A link of the given joint type attached to `parent`.
    pub fn new(name: impl Into<String>, parent: Option<usize>, joint_type: JointType) -> Self {
        Self {
            name: name.into(),
            parent,
            joint_type,
            ..Default::default()
        }
    }

    /// Sets the joint axis.
    pub fn with_axis(mut self, axis: Vector) -> Self {
        self.joint_axis = axis;
        self
    }

    /// Sets the pose of the joint relative to the parent link.
    pub fn with_parent_anchor(mut self, anchor: Isometry) -> Self {
        self.parent_anchor = anchor;
        self
    }

    /// Sets the position limits of the joint.
    pub fn with_limits(mut self, lower: Vec<Real>, upper: Vec<Real>) -> Self {
        self.lower_limits = lower;
        self.upper_limits = upper;
        self
    }
}

/// Template of an articulated object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticulatedObjectAttributes {
    /// Name of the template. Object handles are derived from it.
    pub handle: String,
    /// Initial motion type (DYNAMIC or KINEMATIC).
    pub motion_type: MotionType,
    /// Whether the base is welded to the world.
    pub fixed_base: bool,
    /// Whether the object may be put to sleep.
    pub can_sleep: bool,
    /// Whether every joint position write is clamped to the joint limits.
    pub auto_clamp_joint_limits: bool,
    /// Mass of the base link.
    pub base_mass: Real,
    /// Friction coefficient of the base link.
    pub base_friction_coefficient: Real,
    /// Collision shape of the base link.
    pub base_collision_shape: Option<CollisionShape>,
    /// Render assets attached to the base link.
    pub render_asset_handles: Vec<String>,
    /// Links, parents first.
    pub links: Vec<LinkAttributes>,
    /// Key of the light setup the render assets are drawn with.
    pub light_setup_key: String,
    /// Opaque user metadata.
    pub user_attributes: UserAttributes,
}

impl Default for ArticulatedObjectAttributes {
    fn default() -> Self {
        Self {
            handle: "articulated_object".to_string(),
            motion_type: MotionType::Dynamic,
            fixed_base: true,
            can_sleep: true,
            auto_clamp_joint_limits: false,
            base_mass: 1.0,
            base_friction_coefficient: 0.5,
            base_collision_shape: None,
            render_asset_handles: vec![],
            links: vec![],
            light_setup_key: String::new(),
            user_attributes: UserAttributes::new(),
        }
    }
}

impl ArticulatedObjectAttributes {
    /// A template with the given handle and links.
    pub fn new(handle: impl Into<String>, links: Vec<LinkAttributes>) -> Self {
        Self {
            handle: handle.into(),
            links,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_attributes_from_json() {
        let attrs = ObjectAttributes::from_json_str(
            r#"{
                "handle": "crate",
                "mass": 3.5,
                "collision_shape": { "type": "ball", "radius": 0.25 },
                "user_attributes": { "color": "red" }
            }"#,
        )
        .unwrap();
        assert_eq!(attrs.handle, "crate");
        assert_eq!(attrs.mass, 3.5);
        assert_eq!(attrs.collision_shape, Some(CollisionShape::ball(0.25)));
        assert_eq!(attrs.user_attributes["color"], "red");
        // Unset fields keep their defaults.
        assert_eq!(attrs.linear_damping, 0.2);
        assert_eq!(attrs.motion_type, MotionType::Dynamic);
    }

    #[test]
    fn scale_is_applied_to_the_shape() {
        let attrs = ObjectAttributes {
            scale: Vector::repeat(2.0),
            collision_shape: Some(CollisionShape::ball(0.5)),
            ..ObjectAttributes::new("ball")
        };
        assert_eq!(
            attrs.scaled_collision_shape(),
            Some(CollisionShape::ball(1.0))
        );
    }
}
