//! # Forum Core
//!
//! The domain layer of the forum client.
//! This crate contains the client-side rules (listing order, ownership,
//! comment threading, UI settings) and the ports the infrastructure
//! implements. It performs no I/O of its own.

pub mod domain;
pub mod error;
pub mod ports;

pub use error::{DomainError, GatewayError};
