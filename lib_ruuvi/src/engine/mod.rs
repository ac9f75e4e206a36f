//! # Engine
//!
//! Configuration-driven logic between the sensor source and the sink.
//!
//! ## Contained Modules:
//! - **`registry`**: hardware id to display name mapping.
//! - **`normalizer`**: raw reading validation, unit conversion, zero policy.
//! - **`context`**: the explicit application context shared by both modes.
//! - **`scheduler`**: polling and push drivers.

pub mod context;
pub mod normalizer;
pub mod registry;
pub mod scheduler;
