//! skyplan-core — shared building blocks for elastic topology plans.
//!
//! Every skyplan builder is a pure function from a config record to a
//! validated value. This crate carries the pieces they all share: the
//! [`BuildError`] taxonomy, the [`CapacityProfile`] triple, and ISO-8601
//! duration parsing for rule windows and cooldowns.

pub mod capacity;
pub mod duration;
pub mod error;

pub use capacity::{CapacityConfig, CapacityProfile};
pub use duration::IsoDuration;
pub use error::{require, BuildError, BuildResult, ErrorKind};
