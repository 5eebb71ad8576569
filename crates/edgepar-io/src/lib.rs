#![deny(missing_docs)]
//! Grayscale image decoding and encoding

/// Error types for the io module.
pub mod error;

/// Read and write grayscale images.
pub mod functional;

pub use crate::error::IoError;
pub use crate::functional::{read_image_gray8, write_image_gray8};
