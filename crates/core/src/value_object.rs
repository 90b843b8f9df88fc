//! Value object marker: equality by value, not identity.

/// Marker trait for immutable configuration values.
///
/// Implementors are built once and replaced, never edited in place. A
/// permission rule or a password policy is a value object; a configurer that
/// moves from open to sealed is not.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
