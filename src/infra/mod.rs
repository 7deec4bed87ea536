//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod files;
pub mod http;
pub mod memory;
pub mod telemetry;
