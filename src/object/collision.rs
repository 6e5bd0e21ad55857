use super::MotionType;
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Collision group membership of a physics object.
    ///
    /// Each group is paired with a mask (see [`CollisionGroup::mask`]). Two
    /// objects can touch only if each one's group intersects the other's mask.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CollisionGroup: u32 {
        /// Objects with no specific role.
        const DEFAULT = 1;
        /// Default group of STATIC objects.
        const STATIC = 1 << 1;
        /// Default group of KINEMATIC objects.
        const KINEMATIC = 1 << 2;
        /// Default group of DYNAMIC objects.
        const DYNAMIC = 1 << 3;
        /// Robots and other agent-controlled articulated objects.
        const ROBOT = 1 << 4;
        /// Collides with nothing.
        const NONCOLLIDABLE = 1 << 5;
        /// User-defined group.
        const USER_GROUP0 = 1 << 6;
        /// User-defined group.
        const USER_GROUP1 = 1 << 7;
        /// User-defined group.
        const USER_GROUP2 = 1 << 8;
        /// User-defined group.
        const USER_GROUP3 = 1 << 9;
        /// User-defined group.
        const USER_GROUP4 = 1 << 10;
        /// User-defined group.
        const USER_GROUP5 = 1 << 11;
        /// User-defined group.
        const USER_GROUP6 = 1 << 12;
        /// User-defined group.
        const USER_GROUP7 = 1 << 13;
        /// User-defined group.
        const USER_GROUP8 = 1 << 14;
        /// User-defined group.
        const USER_GROUP9 = 1 << 15;
    }
}

impl CollisionGroup {
    /// The group an object is placed in when its motion type is set.
    pub fn for_motion_type(motion_type: MotionType) -> Self {
        match motion_type {
            MotionType::Static => Self::STATIC,
            MotionType::Kinematic => Self::KINEMATIC,
            MotionType::Dynamic => Self::DYNAMIC,
        }
    }

    /// The set of groups members of this group may collide with.
    pub fn mask(self) -> Self {
        if self.contains(Self::NONCOLLIDABLE) {
            Self::empty()
        } else if self.intersects(Self::STATIC | Self::KINEMATIC) {
            Self::all() - (Self::STATIC | Self::KINEMATIC | Self::NONCOLLIDABLE)
        } else {
            Self::all() - Self::NONCOLLIDABLE
        }
    }

    /// Can members of `self` and members of `other` collide?
    pub fn interacts_with(self, other: Self) -> bool {
        self.mask().intersects(other) && other.mask().intersects(self)
    }
}

/// The `(motion type, collision group override)` state machine.
///
/// Setting a motion type always resets the group to that type's default and
/// discards any override; an override lasts until the next motion type change.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct CollisionGroupState {
    motion_default: CollisionGroup,
    overridden: Option<CollisionGroup>,
}

impl CollisionGroupState {
    pub fn new(motion_type: MotionType) -> Self {
        Self {
            motion_default: CollisionGroup::for_motion_type(motion_type),
            overridden: None,
        }
    }

    pub fn group(&self) -> CollisionGroup {
        self.overridden.unwrap_or(self.motion_default)
    }

    pub fn is_overridden(&self) -> bool {
        self.overridden.is_some()
    }

    pub fn on_motion_type_set(&mut self, motion_type: MotionType) {
        self.motion_default = CollisionGroup::for_motion_type(motion_type);
        self.overridden = None;
    }

    pub fn override_group(&mut self, group: CollisionGroup) {
        self.overridden = Some(group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_and_kinematic_do_not_collide() {
        assert!(!CollisionGroup::STATIC.interacts_with(CollisionGroup::KINEMATIC));
        assert!(!CollisionGroup::STATIC.interacts_with(CollisionGroup::STATIC));
        assert!(CollisionGroup::STATIC.interacts_with(CollisionGroup::DYNAMIC));
        assert!(CollisionGroup::DYNAMIC.interacts_with(CollisionGroup::DYNAMIC));
    }

    #[test]
    fn noncollidable_collides_with_nothing() {
        for group in [
            CollisionGroup::DEFAULT,
            CollisionGroup::DYNAMIC,
            CollisionGroup::NONCOLLIDABLE,
        ] {
            assert!(!CollisionGroup::NONCOLLIDABLE.interacts_with(group));
        }
    }

    #[test]
    fn motion_type_resets_override() {
        let mut state = CollisionGroupState::new(MotionType::Dynamic);
        state.override_group(CollisionGroup::USER_GROUP3);
        assert_eq!(state.group(), CollisionGroup::USER_GROUP3);
        state.on_motion_type_set(MotionType::Kinematic);
        assert!(!state.is_overridden());
        assert_eq!(state.group(), CollisionGroup::KINEMATIC);
    }
}
