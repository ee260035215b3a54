//! Domain layer for Attestor
//!
//! This module contains the verification models, the ports to external
//! collaborators and the domain error type.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
