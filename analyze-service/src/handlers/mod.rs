//! HTTP handlers for the analyze relay.

pub mod analyze;
pub mod health;

pub use analyze::{analyze, index, method_not_allowed};
pub use health::{health_check, metrics};
