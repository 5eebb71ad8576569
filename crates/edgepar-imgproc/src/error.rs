use edgepar_image::ImageError;

use crate::parallel::ParallelError;

/// Errors returned by the edge filters before any pixel is computed.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FilterError {
    /// The input or an intermediate image is invalid.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The execution strategy is misconfigured.
    #[error(transparent)]
    Parallel(#[from] ParallelError),

    /// The gaussian kernel size must be odd and positive.
    #[error("gaussian kernel size must be odd and > 0, got {0}")]
    InvalidKernelSize(usize),

    /// The gaussian sigma must be finite and positive.
    #[error("gaussian sigma must be finite and > 0, got {0}")]
    InvalidSigma(f64),

    /// The hysteresis thresholds must satisfy `low <= high`.
    #[error("low threshold ({low}) must not exceed high threshold ({high})")]
    InvalidThresholds {
        /// Lower hysteresis threshold.
        low: u8,
        /// Upper hysteresis threshold.
        high: u8,
    },
}
