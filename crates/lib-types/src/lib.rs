//! # lib-types
//!
//! Core type definitions shared by the sigil DSP engine and its front ends.
//!
//! - Physical units with compile-time safety
//! - Closed selectors for buffer reads and curve rendering
//! - The `(x, y)` [`Curve`] handed back for display

pub mod units;
pub mod selector;
pub mod curve;

pub use units::*;
pub use selector::*;
pub use curve::*;
