//! Domain models for the production planning platform

mod action_plan;
mod production;
mod project;
mod rbac;
mod tracker;

pub use action_plan::*;
pub use production::*;
pub use project::*;
pub use rbac::*;
pub use tracker::*;
