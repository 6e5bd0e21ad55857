use super::{BodyDesc, BodyKey, BodyState, BodySync, PhysicsBackend};
use crate::dynamics::Load;
use crate::error::{PhysicsError, PhysicsResult};
use crate::math::{Real, Vector};
use crate::object::ObjectId;
use crate::shapes::Aabb;

/// The backend used when no solver is installed.
///
/// Body bookkeeping succeeds and does nothing; dynamics are left to the
/// world's built-in integrator. Every query fails with
/// [`PhysicsError::Unsupported`].
#[derive(Copy, Clone, Debug, Default)]
pub struct NullBackend;

impl NullBackend {
    fn unsupported(&self, operation: &'static str) -> PhysicsError {
        PhysicsError::Unsupported {
            operation,
            backend: self.name().to_string(),
        }
    }
}

impl PhysicsBackend for NullBackend {
    fn name(&self) -> &str {
        "none"
    }

    fn class_prefix(&self) -> &str {
        ""
    }

    fn simulates_dynamics(&self) -> bool {
        false
    }

    fn insert_body(&mut self, _key: BodyKey, _desc: &BodyDesc) -> PhysicsResult<()> {
        Ok(())
    }

    fn update_body(&mut self, _key: BodyKey, _desc: &BodyDesc, _sync: BodySync) -> PhysicsResult<()> {
        Ok(())
    }

    fn remove_object(&mut self, _object: ObjectId) {}

    fn apply_loads(&mut self, _key: BodyKey, _loads: &[Load]) -> PhysicsResult<()> {
        Ok(())
    }

    fn step(&mut self, _dt: Real, _gravity: &Vector) -> PhysicsResult<()> {
        Ok(())
    }

    fn body_state(&self, _key: BodyKey) -> PhysicsResult<BodyState> {
        Err(self.unsupported("body_state"))
    }

    fn contact_test(&self, _object: ObjectId) -> PhysicsResult<bool> {
        Err(self.unsupported("contact_test"))
    }

    fn collision_shape_aabb(&self, _key: BodyKey) -> PhysicsResult<Aabb> {
        Err(self.unsupported("collision_shape_aabb"))
    }

    fn collision_margin(&self, _key: BodyKey) -> PhysicsResult<Real> {
        Err(self.unsupported("collision_margin"))
    }

    fn set_collision_margin(&mut self, _key: BodyKey, _margin: Real) -> PhysicsResult<()> {
        Err(self.unsupported("set_collision_margin"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_are_unsupported() {
        let key = BodyKey::rigid(ObjectId(0));
        let backend = NullBackend;
        let err = backend.collision_margin(key).unwrap_err();
        assert!(err.is_unsupported());
        assert!(backend.contact_test(ObjectId(0)).unwrap_err().is_unsupported());
        assert!(!backend.simulates_dynamics());
    }
}
