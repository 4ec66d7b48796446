//! Domain layer - Core business logic with no I/O
//!
//! This layer contains:
//! - Shared: typed identifiers and validated metadata
//! - Entities: aggregates that own their invariants
//! - Traits: abstractions for storage, external providers and time

pub mod entities;
pub mod errors;
pub mod shared;
pub mod traits;

pub use errors::{DomainError, ErrorKind};
