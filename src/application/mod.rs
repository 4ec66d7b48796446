//! Application layer - Use cases and orchestration
//!
//! This layer contains:
//! - Services: command services for each bounded context
//! - Errors: the error taxonomy returned to callers

pub mod errors;
pub mod services;
