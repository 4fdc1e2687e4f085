//! LabDesk HTTP API contract types and validation
//!
//! This crate defines the row types, request/response DTOs, and error body
//! shared between the server, the backend clients, and the test suites.

pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
