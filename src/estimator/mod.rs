//! Live wait estimation.
//!
//! Routing and flow signals are fetched per tunnel direction, flow samples
//! are reduced with a trimmed sum, and the two are fused into one figure.

pub mod aggregate;
pub mod fusion;
pub mod signals;
pub mod types;

pub use fusion::{Estimator, FlowSignal, fuse};
pub use types::{Estimation, FlowChain, Method, RouteDelay};
