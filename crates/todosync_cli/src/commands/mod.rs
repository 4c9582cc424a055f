//! CLI command implementations.

pub mod items;
pub mod status;
pub mod sync;
