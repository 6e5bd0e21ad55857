use crate::object::MotionType;

/// Errors returned by physics object operations.
///
/// Every operation validates its inputs before touching any state, so an
/// `Err` always means the object was left unchanged.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum PhysicsError {
    /// The object was removed from its world.
    #[error("`{handle}` is no longer alive")]
    DeadHandle {
        /// Handle (or key) of the dead object.
        handle: String,
    },
    /// A dynamics-only property was written on a non-dynamic object.
    #[error("`{operation}` requires a DYNAMIC object but `{handle}` is {motion_type:?}")]
    MotionType {
        /// The rejected operation.
        operation: &'static str,
        /// Handle of the object.
        handle: String,
        /// Motion type of the object at the time of the call.
        motion_type: MotionType,
    },
    /// A joint-state vector had the wrong number of entries.
    #[error("{what} expects {expected} values, got {actual}")]
    SizeMismatch {
        /// Name of the vector being written.
        what: &'static str,
        /// Number of values the object holds.
        expected: usize,
        /// Number of values provided.
        actual: usize,
    },
    /// The operation needs a physics backend that is not installed.
    #[error("`{operation}` is unsupported: {backend} backend does not provide it")]
    Unsupported {
        /// The rejected operation.
        operation: &'static str,
        /// Name of the installed backend.
        backend: String,
    },
    /// A link id outside of `[-1, num_links)`, or `-1` where the base link
    /// is not accepted.
    #[error("invalid link id {link_id} for `{handle}` ({num_links} links)")]
    InvalidLink {
        /// Handle of the articulated object.
        handle: String,
        /// The rejected link id.
        link_id: i32,
        /// Number of non-base links.
        num_links: usize,
    },
    /// A numeric or structural argument is out of its valid domain.
    #[error("invalid {what}: {reason}")]
    InvalidArgument {
        /// The argument being validated.
        what: &'static str,
        /// Why it was rejected.
        reason: String,
    },
    /// The operation only applies to another kind of object.
    #[error("`{operation}` is not available on `{handle}`: expected a {expected}")]
    WrongKind {
        /// The rejected operation.
        operation: &'static str,
        /// Handle of the object.
        handle: String,
        /// The kind of object the operation expects.
        expected: &'static str,
    },
    /// The backend failed while processing a request.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type of every fallible operation of this crate.
pub type PhysicsResult<T> = Result<T, PhysicsError>;

impl PhysicsError {
    pub(crate) fn invalid(what: &'static str, reason: impl Into<String>) -> Self {
        PhysicsError::InvalidArgument {
            what,
            reason: reason.into(),
        }
    }

    /// Is this error the "backend not installed" kind?
    ///
    /// Callers can use this to feature-detect backend-specific operations.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, PhysicsError::Unsupported { .. })
    }
}

pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> PhysicsResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(PhysicsError::SizeMismatch {
            what,
            expected,
            actual,
        })
    }
}

pub(crate) fn check_non_negative(what: &'static str, value: f32) -> PhysicsResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PhysicsError::invalid(
            what,
            format!("expected a finite non-negative value, got {value}"),
        ))
    }
}

pub(crate) fn check_positive(what: &'static str, value: f32) -> PhysicsResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PhysicsError::invalid(
            what,
            format!("expected a finite positive value, got {value}"),
        ))
    }
}
