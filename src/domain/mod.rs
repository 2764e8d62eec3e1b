//! Domain layer for the cardfleet bot manager
//!
//! This module contains the domain models, port traits and error types that
//! the fleet engine is written against.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult, FleetError, GatewayError};
