//! Adapter implementations for the settings and transport ports.

pub mod json;
pub mod memory;

mod file;

pub use file::JsonFileEndpointSettings;
