//! Shared primitive types used across the desk.

/// A stable, unique identifier for one call.
pub type CallId = String;

/// Position of an event within its call, starting at 0.
pub type Seq = u32;
