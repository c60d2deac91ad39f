//! # Forum Shared
//!
//! Form payloads, query strings and response envelopes used by the web
//! handlers.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, ErrorResponse};
