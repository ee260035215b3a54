//! CLI command implementations.

pub mod capabilities;
pub mod results;
pub mod verify;
