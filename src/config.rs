//! World configuration, loadable from a JSON physics configuration file.

use crate::error::{PhysicsError, PhysicsResult};
use crate::math::Vector;
use serde::{Deserialize, Serialize};

/// The physics backend a world should be created with.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// No simulation backend: objects are integrated by the built-in
    /// integrator and backend-specific queries are unsupported.
    None,
    /// The Rapier rigid-body engine (requires the `rapier` feature).
    #[default]
    Rapier,
}

/// Parameters of a [`PhysicsWorld`](crate::world::PhysicsWorld).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Duration of one simulation step, in seconds.
    pub timestep: f32,
    /// World-space gravity.
    pub gravity: [f32; 3],
    /// Requested simulation backend.
    pub backend: BackendKind,
    /// Friction coefficient applied to objects whose template leaves it unset.
    pub default_friction_coefficient: f32,
    /// Restitution coefficient applied to objects whose template leaves it unset.
    pub default_restitution_coefficient: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            timestep: 1.0 / 60.0,
            gravity: [0.0, -9.8, 0.0],
            backend: BackendKind::default(),
            default_friction_coefficient: 0.4,
            default_restitution_coefficient: 0.1,
        }
    }
}

impl WorldConfig {
    /// Parses a configuration from its JSON representation.
    ///
    /// Missing fields take their default value.
    pub fn from_json_str(json: &str) -> PhysicsResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PhysicsError::invalid("physics configuration", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The gravity as a vector.
    pub fn gravity(&self) -> Vector {
        Vector::from(self.gravity)
    }

    /// Checks that the configured values are usable.
    pub fn validate(&self) -> PhysicsResult<()> {
        crate::error::check_positive("timestep", self.timestep)?;
        crate::error::check_non_negative(
            "default_friction_coefficient",
            self.default_friction_coefficient,
        )?;
        crate::error::check_non_negative(
            "default_restitution_coefficient",
            self.default_restitution_coefficient,
        )?;
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(PhysicsError::invalid("gravity", "components must be finite"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_json() {
        let config =
            WorldConfig::from_json_str(r#"{ "timestep": 0.01, "backend": "none" }"#).unwrap();
        assert_eq!(config.timestep, 0.01);
        assert_eq!(config.backend, BackendKind::None);
        assert_eq!(config.gravity, [0.0, -9.8, 0.0]);
    }

    #[test]
    fn rejects_bad_timestep() {
        let err = WorldConfig::from_json_str(r#"{ "timestep": 0.0 }"#).unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidArgument { what: "timestep", .. }));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(WorldConfig::from_json_str("{ timestep").is_err());
    }
}
