use edgepar_image::{Image, ImageError};

use crate::error::FilterError;
use crate::filter::{
    ensure_min_size, gaussian_blur,
    kernels::{gradient, GaussianKernel},
    neighborhood3, replicate_border,
};
use crate::output::FilterOutput;
use crate::parallel::{ExecutionStrategy, Executor, PixelFault};
use crate::timing::timed;

/// Default side length of the gaussian smoothing kernel.
pub const CANNY_KERNEL_SIZE: usize = 3;

/// Default standard deviation of the gaussian smoothing kernel.
pub const CANNY_SIGMA: f64 = 1.0;

/// Default lower hysteresis threshold.
pub const CANNY_LOW_THRESHOLD: u8 = 20;

/// Default upper hysteresis threshold.
pub const CANNY_HIGH_THRESHOLD: u8 = 40;

/// Parameters of the Canny pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CannyConfig {
    /// Side length of the gaussian kernel, odd.
    pub kernel_size: usize,
    /// Standard deviation of the gaussian kernel.
    pub sigma: f64,
    /// Magnitudes in `[low_threshold, high_threshold]` are weak edges.
    pub low_threshold: u8,
    /// Magnitudes above this value are strong edges.
    pub high_threshold: u8,
}

impl Default for CannyConfig {
    fn default() -> Self {
        Self {
            kernel_size: CANNY_KERNEL_SIZE,
            sigma: CANNY_SIGMA,
            low_threshold: CANNY_LOW_THRESHOLD,
            high_threshold: CANNY_HIGH_THRESHOLD,
        }
    }
}

impl CannyConfig {
    /// Configuration with the given smoothing parameters and the default thresholds.
    pub fn new(kernel_size: usize, sigma: f64) -> Self {
        Self {
            kernel_size,
            sigma,
            ..Default::default()
        }
    }

    /// Replace the hysteresis thresholds.
    pub fn with_thresholds(mut self, low: u8, high: u8) -> Self {
        self.low_threshold = low;
        self.high_threshold = high;
        self
    }
}

/// Every intermediate grid of one pipeline run, except the angle map.
#[derive(Debug, Clone, PartialEq)]
pub struct CannyStages {
    /// Gaussian smoothed input.
    pub smoothed: Image<u8>,
    /// Gradient magnitude of the smoothed input.
    pub magnitude: Image<u8>,
    /// Magnitude after non-maximum suppression.
    pub suppressed: Image<u8>,
    /// Binary edge map, edges at 255.
    pub edges: Image<u8>,
    /// Faulted pixels over all stages.
    pub faults: Vec<PixelFault>,
}

/// Gradient direction quantized to the four principal directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Deg0,
    Deg45,
    Deg90,
    Deg135,
}

impl Direction {
    /// Fold an `atan2` angle in radians into `[0, 180)` degrees and bin it.
    fn quantize(angle: f64) -> Self {
        let mut degrees = angle.to_degrees();
        if degrees < 0.0 {
            degrees += 180.0;
        }
        if degrees >= 180.0 {
            degrees -= 180.0;
        }

        match degrees {
            d if d < 22.5 => Direction::Deg0,
            d if d < 67.5 => Direction::Deg45,
            d if d < 112.5 => Direction::Deg90,
            d if d < 157.5 => Direction::Deg135,
            _ => Direction::Deg0,
        }
    }

    /// `(row, col)` offsets of the two neighbors along the gradient.
    fn neighbors(self) -> [(isize, isize); 2] {
        match self {
            Direction::Deg0 => [(0, -1), (0, 1)],
            Direction::Deg45 => [(1, 1), (-1, -1)],
            Direction::Deg90 => [(1, 0), (-1, 0)],
            Direction::Deg135 => [(1, -1), (-1, 1)],
        }
    }
}

/// Hysteresis class of a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum EdgeClass {
    #[default]
    Suppressed,
    Weak,
    Strong,
}

/// The multi-stage Canny edge detector.
///
/// The gaussian kernel is generated once when the pipeline is built; build a
/// new pipeline to change the kernel size or sigma.
///
/// # Examples
///
/// ```
/// use edgepar_image::Image;
/// use edgepar_imgproc::canny::{CannyConfig, CannyPipeline};
/// use edgepar_imgproc::parallel::Executor;
///
/// let pipeline = CannyPipeline::new(CannyConfig::new(5, 1.4)).unwrap();
/// let src = Image::from_fn([16, 16].into(), |_, col| if col < 8 { 0u8 } else { 255 });
/// let output = pipeline.compute(&src, &Executor::serial()).unwrap();
/// assert!(output.image.as_slice().iter().all(|&px| px == 0 || px == 255));
/// ```
#[derive(Debug, Clone)]
pub struct CannyPipeline {
    config: CannyConfig,
    kernel: GaussianKernel,
}

impl CannyPipeline {
    /// Validate `config` and generate its gaussian kernel.
    pub fn new(config: CannyConfig) -> Result<Self, FilterError> {
        if config.low_threshold > config.high_threshold {
            return Err(FilterError::InvalidThresholds {
                low: config.low_threshold,
                high: config.high_threshold,
            });
        }
        let kernel = GaussianKernel::new(config.kernel_size, config.sigma)?;
        Ok(Self { config, kernel })
    }

    /// The pipeline parameters.
    pub fn config(&self) -> &CannyConfig {
        &self.config
    }

    /// Run every stage and keep the intermediate grids.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::ImageTooSmall`] when the image cannot hold the
    /// gaussian kernel or a 3x3 neighborhood.
    pub fn run_stages(
        &self,
        src: &Image<u8>,
        executor: &Executor,
    ) -> Result<CannyStages, FilterError> {
        ensure_min_size(src, self.kernel.size().max(3))?;

        let (smoothed, mut faults) = gaussian_blur(src, &self.kernel, executor)?;

        let (magnitude, angles, gradient_faults) = gradient_stage(&smoothed, executor)?;
        faults.extend(gradient_faults);

        let (suppressed, nms_faults) = non_max_suppression(&magnitude, &angles, executor)?;
        faults.extend(nms_faults);

        let (edges, hysteresis_faults) = hysteresis(
            &suppressed,
            self.config.low_threshold,
            self.config.high_threshold,
            executor,
        )?;
        faults.extend(hysteresis_faults);

        Ok(CannyStages {
            smoothed,
            magnitude,
            suppressed,
            edges,
            faults,
        })
    }

    /// Compute the binary edge map of `src`.
    pub fn compute(&self, src: &Image<u8>, executor: &Executor) -> Result<FilterOutput, FilterError> {
        let result = timed(|| self.run_stages(src, executor));
        let stages = result.value?;
        log::debug!(
            "canny {} on {}: {}us",
            executor.strategy(),
            src.size(),
            result.elapsed.as_micros()
        );

        Ok(FilterOutput {
            image: stages.edges,
            faults: stages.faults,
            elapsed: result.elapsed,
        })
    }
}

/// Compute the Canny edge map with a one-off pipeline and executor.
pub fn canny(
    src: &Image<u8>,
    config: CannyConfig,
    strategy: ExecutionStrategy,
) -> Result<FilterOutput, FilterError> {
    let pipeline = CannyPipeline::new(config)?;
    let executor = Executor::new(strategy)?;
    pipeline.compute(src, &executor)
}

/// Gradient magnitude (without weak-gradient suppression) and angle of every pixel.
fn gradient_stage(
    smoothed: &Image<u8>,
    executor: &Executor,
) -> Result<(Image<u8>, Image<f64>, Vec<PixelFault>), ImageError> {
    let mut samples = Image::from_size_val(smoothed.size(), (0u8, 0.0f64));
    let faults = executor.map_interior(&mut samples, 1, |row, col| {
        let g = gradient(&neighborhood3(smoothed, row, col)?);
        Ok((g.magnitude(), g.angle()))
    });
    replicate_border(&mut samples, 1)?;

    let magnitude = samples.map(|&(m, _)| m);
    let angles = samples.map(|&(_, a)| a);
    Ok((magnitude, angles, faults))
}

/// Keep a pixel only if its magnitude is a maximum along its gradient direction.
fn non_max_suppression(
    magnitude: &Image<u8>,
    angles: &Image<f64>,
    executor: &Executor,
) -> Result<(Image<u8>, Vec<PixelFault>), ImageError> {
    if magnitude.size() != angles.size() {
        return Err(ImageError::InvalidImageSize(
            magnitude.cols(),
            magnitude.rows(),
            angles.cols(),
            angles.rows(),
        ));
    }

    let mut dst = Image::from_size_val(magnitude.size(), 0u8);
    let faults = executor.map_interior(&mut dst, 1, |row, col| {
        let fault = PixelFault { row, col };
        let m = *magnitude.get(row, col).ok_or(fault)?;
        let angle = *angles.get(row, col).ok_or(fault)?;

        for (dr, dc) in Direction::quantize(angle).neighbors() {
            let neighbor = row
                .checked_add_signed(dr)
                .zip(col.checked_add_signed(dc))
                .and_then(|(r, c)| magnitude.get(r, c))
                .ok_or(fault)?;
            if m < *neighbor {
                return Ok(0);
            }
        }
        Ok(m)
    });
    replicate_border(&mut dst, 1)?;

    Ok((dst, faults))
}

/// Double threshold followed by 8-connected edge tracking.
///
/// The classification pass runs on the executor. Tracking from the strong
/// pixels is a flood fill and runs on the calling thread.
fn hysteresis(
    suppressed: &Image<u8>,
    low: u8,
    high: u8,
    executor: &Executor,
) -> Result<(Image<u8>, Vec<PixelFault>), ImageError> {
    let mut classes = Image::from_size_val(suppressed.size(), EdgeClass::Suppressed);
    let faults = executor.map_interior(&mut classes, 1, |row, col| {
        let v = *suppressed.get(row, col).ok_or(PixelFault { row, col })?;
        Ok(match v {
            0 => EdgeClass::Suppressed,
            v if v > high => EdgeClass::Strong,
            v if v >= low => EdgeClass::Weak,
            _ => EdgeClass::Suppressed,
        })
    });

    let (width, height) = (suppressed.width(), suppressed.height());
    let classes = classes.as_slice();
    let mut edges = Image::from_size_val(suppressed.size(), 0u8);
    let marks = edges.as_slice_mut();
    let mut stack = Vec::new();

    for seed in 0..classes.len() {
        if classes[seed] != EdgeClass::Strong || marks[seed] != 0 {
            continue;
        }
        marks[seed] = 255;
        stack.push(seed);

        while let Some(idx) = stack.pop() {
            let (row, col) = (idx / width, idx % width);
            for r in row.saturating_sub(1)..(row + 2).min(height) {
                for c in col.saturating_sub(1)..(col + 2).min(width) {
                    let n = r * width + c;
                    if classes[n] != EdgeClass::Suppressed && marks[n] == 0 {
                        marks[n] = 255;
                        stack.push(n);
                    }
                }
            }
        }
    }

    replicate_border(&mut edges, 1)?;
    Ok((edges, faults))
}
