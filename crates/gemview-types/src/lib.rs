//! Foundation types shared by the gemview crates.
//!
//! Geometry primitives, platform-agnostic input events, palette and font
//! identifiers, and the common error type.

pub mod error;
pub mod geometry;
pub mod input;
pub mod palette;
