use std::time::Duration;

use edgepar_image::Image;

use crate::parallel::PixelFault;

/// The result of one filter invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutput {
    /// The freshly allocated output grid.
    pub image: Image<u8>,
    /// Pixels whose neighborhood could not be read, left at zero.
    pub faults: Vec<PixelFault>,
    /// Wall time spent computing the output.
    pub elapsed: Duration,
}

impl FilterOutput {
    /// Elapsed wall time in microseconds.
    pub fn elapsed_micros(&self) -> u128 {
        self.elapsed.as_micros()
    }

    /// Whether every pixel was computed.
    pub fn is_complete(&self) -> bool {
        self.faults.is_empty()
    }
}
