//! Entity traits: identity and ownership.

use crate::id::UserId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}

/// An entity that belongs to a user.
///
/// Ownership is what the owner-or-staff authorization rule is checked against.
pub trait Owned: Entity {
    fn owner_id(&self) -> UserId;
}
