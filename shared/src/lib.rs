//! Shared types and models for the production planning platform
//!
//! This crate holds the entity models, the planning arithmetic, and the
//! validation rules shared by the backend and its tests. It performs no I/O.

pub mod models;
pub mod planning;
pub mod types;
pub mod validation;

pub use models::*;
pub use planning::*;
pub use types::*;
pub use validation::*;
