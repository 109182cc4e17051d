//! Demand request abstraction.
//!
//! This module provides the `AdRequestClient` trait for issuing demand fetches
//! against an ad-serving backend, the `HostView` trait for the view that
//! displays the resulting creative, and the request/outcome types they exchange.

mod traits;
mod types;

pub use traits::*;
pub use types::*;
