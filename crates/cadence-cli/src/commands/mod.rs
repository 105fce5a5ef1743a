//! CLI command implementations.

pub mod common;
pub mod copy;
pub mod onset;
pub mod pitch;
pub mod tempo;
