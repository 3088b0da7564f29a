//! Loading scenario files and serving them from a read-only registry.

pub mod loader;
pub mod registry;
