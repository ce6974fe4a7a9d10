//! Concrete source implementations.

pub mod http;
pub mod simulated;

pub use http::HttpCloudSource;
pub use simulated::{SimulatedCloudSource, SimulatedNativeSource};
