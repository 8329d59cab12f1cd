//! Utility types and functions for MNG.
//!
//! This module contains fundamental types used throughout the library:
//! - [`ColorType`] - PNG/JNG color types and sample layout
//! - [`Point`] / [`Rect`] - Canvas geometry
//! - [`Error`] / [`Result`] - Error handling

mod color;
mod error;
mod geom;

pub use color::*;
pub use error::*;
pub use geom::*;
