#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// multi-stage canny edge detector.
pub mod canny;

/// error types of the filters.
pub mod error;
pub use error::FilterError;

/// kernels, border policy and convolutions.
pub mod filter;

/// result type shared by the filters.
pub mod output;
pub use output::FilterOutput;

/// execution strategies and the parallel executor.
pub mod parallel;

/// block layout and tile splitting utilities.
pub mod partition;

/// sobel edge detector.
pub mod sobel;

/// wall time measurement.
pub mod timing;
