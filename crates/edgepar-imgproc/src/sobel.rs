use edgepar_image::{Image, ImageError};

use crate::error::FilterError;
use crate::filter::{
    ensure_min_size,
    kernels::{gradient, thresholded_magnitude},
    neighborhood3, replicate_border,
};
use crate::output::FilterOutput;
use crate::parallel::{ExecutionStrategy, Executor, PixelFault};
use crate::timing::timed;

/// Sobel magnitude of a single interior pixel, weak gradients suppressed.
pub fn sobel_at(src: &Image<u8>, row: usize, col: usize) -> Result<u8, PixelFault> {
    let neighborhood = neighborhood3(src, row, col)?;
    Ok(thresholded_magnitude(&gradient(&neighborhood)))
}

/// Compute the Sobel edge map of a grayscale image.
///
/// Every interior pixel gets the rounded gradient magnitude clamped to
/// `[0, 255]`, with values below
/// [`SOBEL_WEAK_GRADIENT_THRESHOLD`](crate::filter::kernels::SOBEL_WEAK_GRADIENT_THRESHOLD)
/// forced to zero. The outermost rows and columns are then filled by
/// [`replicate_border`]. The output does not depend on the executor strategy.
///
/// # Arguments
///
/// * `src` - The input image, at least 3x3.
/// * `executor` - Decides how the interior pass is spread over threads.
///
/// # Returns
///
/// The edge map, the faulted pixels and the elapsed time.
///
/// # Errors
///
/// Returns [`ImageError::ImageTooSmall`] for images smaller than 3x3.
///
/// # Examples
///
/// ```
/// use edgepar_image::Image;
/// use edgepar_imgproc::parallel::Executor;
/// use edgepar_imgproc::sobel::sobel;
///
/// let flat = Image::from_size_val([6, 4].into(), 90u8);
/// let output = sobel(&flat, &Executor::serial()).unwrap();
/// assert!(output.image.as_slice().iter().all(|&px| px == 0));
/// ```
pub fn sobel(src: &Image<u8>, executor: &Executor) -> Result<FilterOutput, FilterError> {
    ensure_min_size(src, 3)?;

    let result = timed(|| -> Result<_, ImageError> {
        let mut dst = Image::from_size_val(src.size(), 0u8);
        let faults = executor.map_interior(&mut dst, 1, |row, col| sobel_at(src, row, col));
        replicate_border(&mut dst, 1)?;
        Ok((dst, faults))
    });

    let (image, faults) = result.value?;
    log::debug!(
        "sobel {} on {}: {}us",
        executor.strategy(),
        src.size(),
        result.elapsed.as_micros()
    );

    Ok(FilterOutput {
        image,
        faults,
        elapsed: result.elapsed,
    })
}

/// Compute the Sobel edge map with a one-off executor for `strategy`.
///
/// The thread pool is built before the timed section starts.
pub fn sobel_with_strategy(
    src: &Image<u8>,
    strategy: ExecutionStrategy,
) -> Result<FilterOutput, FilterError> {
    let executor = Executor::new(strategy)?;
    sobel(src, &executor)
}
