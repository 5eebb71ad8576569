//! Filter building blocks
//!
//! Fixed gradient kernels, the gaussian kernel generator, the border
//! replication policy and the windowed convolutions built on them.

/// Filter kernels
pub mod kernels;

/// Border replication policy
mod border;
pub use border::*;

/// Windowed convolutions
mod convolution;
pub use convolution::*;
