//! ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;

/// A user's ID, a validated opaque string supplied by the identity layer.
pub type UserId = String;

/// A group's ID, a validated opaque string.
pub type GroupId = String;
