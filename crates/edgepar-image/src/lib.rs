#![deny(missing_docs)]
//! Image grid types consumed and produced by the edgepar filters

/// single channel image representation.
pub mod image;

/// Error types for the image module.
pub mod error;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize};
