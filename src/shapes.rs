//! Collision shape descriptions.
//!
//! Shapes are described independently from any backend. A backend converts
//! them into its own representation when a body is inserted; the object
//! model only uses them to derive default mass properties.

use crate::math::{Point, Real, Vector};
use serde::{Deserialize, Serialize};

/// A collision shape expressed in the local frame of its body.
///
/// Capsules, cylinders and cones have their principal axis along `+Y`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CollisionShape {
    /// A sphere.
    Ball {
        /// The sphere radius.
        radius: Real,
    },
    /// A box.
    Cuboid {
        /// Half-width, half-height and half-depth of the box.
        half_extents: Vector,
    },
    /// A segment along `Y` with rounded ends.
    Capsule {
        /// Half the length of the central segment.
        half_height: Real,
        /// Radius of the rounded ends.
        radius: Real,
    },
    /// A cylinder along `Y`.
    Cylinder {
        /// Half the height of the cylinder.
        half_height: Real,
        /// Radius of the cylinder.
        radius: Real,
    },
    /// A cone along `Y`, apex pointing to `+Y`.
    Cone {
        /// Half the height of the cone.
        half_height: Real,
        /// Radius of the base.
        radius: Real,
    },
}

impl CollisionShape {
    /// Create a ball shape.
    pub fn ball(radius: Real) -> Self {
        Self::Ball { radius }
    }

    /// Create a cuboid shape from its half-extents.
    pub fn cuboid(half_extents: Vector) -> Self {
        Self::Cuboid { half_extents }
    }

    /// Create a capsule shape.
    pub fn capsule(half_height: Real, radius: Real) -> Self {
        Self::Capsule {
            half_height,
            radius,
        }
    }

    /// Create a cylinder shape.
    pub fn cylinder(half_height: Real, radius: Real) -> Self {
        Self::Cylinder {
            half_height,
            radius,
        }
    }

    /// Create a cone shape.
    pub fn cone(half_height: Real, radius: Real) -> Self {
        Self::Cone {
            half_height,
            radius,
        }
    }

    /// Applies a (possibly non-uniform) scale to this shape.
    ///
    /// Round shapes cannot be stretched: their radius is scaled by the mean
    /// of the two scale components orthogonal to their axis (all three for
    /// balls).
    pub fn scaled(&self, scale: &Vector) -> Self {
        let radial = (scale.x + scale.z) * 0.5;
        match *self {
            Self::Ball { radius } => Self::Ball {
                radius: radius * scale.mean(),
            },
            Self::Cuboid { half_extents } => Self::Cuboid {
                half_extents: half_extents.component_mul(scale),
            },
            Self::Capsule {
                half_height,
                radius,
            } => Self::Capsule {
                half_height: half_height * scale.y,
                radius: radius * radial,
            },
            Self::Cylinder {
                half_height,
                radius,
            } => Self::Cylinder {
                half_height: half_height * scale.y,
                radius: radius * radial,
            },
            Self::Cone {
                half_height,
                radius,
            } => Self::Cone {
                half_height: half_height * scale.y,
                radius: radius * radial,
            },
        }
    }

    /// Diagonal of the inertia tensor of this shape filled uniformly with
    /// the given `mass`, expressed at its center of mass.
    pub fn principal_inertia(&self, mass: Real) -> Vector {
        match *self {
            Self::Ball { radius } => Vector::repeat(0.4 * mass * radius * radius),
            Self::Cuboid { half_extents: h } => {
                let (x2, y2, z2) = (h.x * h.x, h.y * h.y, h.z * h.z);
                Vector::new(y2 + z2, x2 + z2, x2 + y2) * (mass / 3.0)
            }
            // NOTE: the capsule is approximated by its bounding cylinder.
            Self::Capsule {
                half_height,
                radius,
            } => cylinder_inertia(mass, half_height + radius, radius),
            Self::Cylinder {
                half_height,
                radius,
            } => cylinder_inertia(mass, half_height, radius),
            Self::Cone {
                half_height,
                radius,
            } => {
                let height = half_height * 2.0;
                let r2 = radius * radius;
                let off_axis = mass * (0.15 * r2 + 0.0375 * height * height);
                Vector::new(off_axis, 0.3 * mass * r2, off_axis)
            }
        }
    }

    /// The local-space axis-aligned bounding box of this shape.
    pub fn local_aabb(&self) -> Aabb {
        let half = match *self {
            Self::Ball { radius } => Vector::repeat(radius),
            Self::Cuboid { half_extents } => half_extents,
            Self::Capsule {
                half_height,
                radius,
            } => Vector::new(radius, half_height + radius, radius),
            Self::Cylinder {
                half_height,
                radius,
            }
            | Self::Cone {
                half_height,
                radius,
            } => Vector::new(radius, half_height, radius),
        };
        Aabb::new(Point::from(-half), Point::from(half))
    }

    /// Checks that every dimension of this shape is finite and positive.
    pub fn is_valid(&self) -> bool {
        let positive = |d: Real| d.is_finite() && d > 0.0;
        match *self {
            Self::Ball { radius } => positive(radius),
            Self::Cuboid { half_extents } => half_extents.iter().all(|d| positive(*d)),
            Self::Capsule {
                half_height,
                radius,
            }
            | Self::Cylinder {
                half_height,
                radius,
            }
            | Self::Cone {
                half_height,
                radius,
            } => positive(half_height) && positive(radius),
        }
    }
}

fn cylinder_inertia(mass: Real, half_height: Real, radius: Real) -> Vector {
    let r2 = radius * radius;
    let height = half_height * 2.0;
    let off_axis = mass * (3.0 * r2 + height * height) / 12.0;
    Vector::new(off_axis, 0.5 * mass * r2, off_axis)
}

/// An axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Lower corner.
    pub mins: Point,
    /// Upper corner.
    pub maxs: Point,
}

impl Aabb {
    /// Creates a box from its two corners.
    pub fn new(mins: Point, maxs: Point) -> Self {
        Self { mins, maxs }
    }

    /// Center of the box.
    pub fn center(&self) -> Point {
        na::center(&self.mins, &self.maxs)
    }

    /// Half the size of the box along each axis.
    pub fn half_extents(&self) -> Vector {
        (self.maxs - self.mins) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cube_inertia_is_isotropic() {
        let inertia = CollisionShape::cuboid(Vector::repeat(0.5)).principal_inertia(6.0);
        // m * (2h)^2 / 6 for a cube of side 2h.
        assert_relative_eq!(inertia, Vector::repeat(1.0), epsilon = 1.0e-6);
    }

    #[test]
    fn ball_inertia() {
        let inertia = CollisionShape::ball(2.0).principal_inertia(5.0);
        assert_relative_eq!(inertia, Vector::repeat(8.0), epsilon = 1.0e-6);
    }

    #[test]
    fn scaling_a_cuboid_scales_each_axis() {
        let shape = CollisionShape::cuboid(Vector::new(1.0, 1.0, 1.0)).scaled(&Vector::new(
            2.0, 3.0, 4.0,
        ));
        assert_eq!(
            shape,
            CollisionShape::cuboid(Vector::new(2.0, 3.0, 4.0))
        );
        assert_relative_eq!(shape.local_aabb().half_extents(), Vector::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn rejects_degenerate_shapes() {
        assert!(CollisionShape::ball(1.0).is_valid());
        assert!(!CollisionShape::ball(0.0).is_valid());
        assert!(!CollisionShape::capsule(1.0, -1.0).is_valid());
        assert!(!CollisionShape::cuboid(Vector::new(1.0, f32::NAN, 1.0)).is_valid());
    }
}
