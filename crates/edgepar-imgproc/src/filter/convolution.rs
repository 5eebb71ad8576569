use edgepar_image::{Image, ImageError};

use crate::parallel::{Executor, PixelFault};

use super::{kernels::GaussianKernel, replicate_border};

/// Reject images with a side shorter than `min`.
pub fn ensure_min_size<T>(src: &Image<T>, min: usize) -> Result<(), ImageError> {
    if src.width() < min || src.height() < min {
        return Err(ImageError::ImageTooSmall {
            width: src.width(),
            height: src.height(),
            min,
        });
    }
    Ok(())
}

/// Read the 3x3 neighborhood centred on `(row, col)` in row-major order.
///
/// Returns a [`PixelFault`] when any of the nine samples lies outside the image.
pub fn neighborhood3<T: Copy>(src: &Image<T>, row: usize, col: usize) -> Result<[T; 9], PixelFault> {
    let fault = PixelFault { row, col };
    let (top, left) = (
        row.checked_sub(1).ok_or(fault)?,
        col.checked_sub(1).ok_or(fault)?,
    );

    let mut samples = [*src.get(row, col).ok_or(fault)?; 9];
    for (k, sample) in samples.iter_mut().enumerate() {
        *sample = *src.get(top + k / 3, left + k % 3).ok_or(fault)?;
    }
    Ok(samples)
}

/// Convolve the `kernel.size() x kernel.size()` window centred on `(row, col)`.
///
/// The result is rounded and clamped to `[0, 255]`.
pub fn gaussian_at(
    src: &Image<u8>,
    kernel: &GaussianKernel,
    row: usize,
    col: usize,
) -> Result<u8, PixelFault> {
    let fault = PixelFault { row, col };
    let radius = kernel.radius();
    let top = row.checked_sub(radius).ok_or(fault)?;
    let left = col.checked_sub(radius).ok_or(fault)?;

    let mut acc = 0.0;
    for (k, &weight) in kernel.as_slice().iter().enumerate() {
        let (ky, kx) = (k / kernel.size(), k % kernel.size());
        let px = *src.get(top + ky, left + kx).ok_or(fault)?;
        acc += weight * px as f64;
    }

    Ok(acc.round().clamp(0.0, 255.0) as u8)
}

/// Smooth an image with a gaussian kernel.
///
/// The pixels within `kernel.radius()` of the border are filled by
/// [`replicate_border`] with the same margin.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `kernel` - The smoothing kernel.
/// * `executor` - Decides how the pass is spread over threads.
///
/// # Returns
///
/// The smoothed image and the pixels whose window could not be read.
pub fn gaussian_blur(
    src: &Image<u8>,
    kernel: &GaussianKernel,
    executor: &Executor,
) -> Result<(Image<u8>, Vec<PixelFault>), ImageError> {
    let margin = kernel.radius();
    ensure_min_size(src, kernel.size().max(3))?;

    let mut dst = Image::from_size_val(src.size(), 0u8);
    let faults = executor.map_interior(&mut dst, margin, |row, col| {
        gaussian_at(src, kernel, row, col)
    });
    replicate_border(&mut dst, margin)?;

    Ok((dst, faults))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::kernels::GaussianKernel;
    use crate::FilterError;

    #[test]
    fn test_neighborhood3() -> Result<(), ImageError> {
        let image = Image::from_fn([4, 4].into(), |row, col| (row * 4 + col) as u8);
        assert_eq!(
            neighborhood3(&image, 1, 2),
            Ok([1, 2, 3, 5, 6, 7, 9, 10, 11])
        );
        assert_eq!(
            neighborhood3(&image, 0, 2),
            Err(PixelFault { row: 0, col: 2 })
        );
        assert_eq!(
            neighborhood3(&image, 2, 3),
            Err(PixelFault { row: 2, col: 3 })
        );
        Ok(())
    }

    #[test]
    fn test_gaussian_blur_flat() -> Result<(), FilterError> {
        let src = Image::from_size_val([8, 6].into(), 120u8);
        let kernel = GaussianKernel::new(5, 1.4)?;
        let (dst, faults) = gaussian_blur(&src, &kernel, &Executor::serial())?;
        assert!(faults.is_empty());
        assert_eq!(dst, src);
        Ok(())
    }

    #[test]
    fn test_gaussian_blur_impulse() -> Result<(), FilterError> {
        let mut src = Image::from_size_val([5, 5].into(), 0u8);
        src.set(2, 2, 255)?;
        let kernel = GaussianKernel::new(3, 1.0)?;
        let (dst, _) = gaussian_blur(&src, &kernel, &Executor::serial())?;

        let center = (255.0 * kernel.get(1, 1).unwrap_or_default()).round() as u8;
        let side = (255.0 * kernel.get(0, 1).unwrap_or_default()).round() as u8;
        assert_eq!(dst.get(2, 2), Some(&center));
        assert_eq!(dst.get(1, 2), Some(&side));
        assert!(center > side);
        Ok(())
    }

    #[test]
    fn test_gaussian_blur_too_small() -> Result<(), FilterError> {
        let src = Image::from_size_val([4, 9].into(), 0u8);
        let kernel = GaussianKernel::new(5, 1.0)?;
        assert_eq!(
            gaussian_blur(&src, &kernel, &Executor::serial()).err(),
            Some(ImageError::ImageTooSmall {
                width: 4,
                height: 9,
                min: 5
            })
        );
        Ok(())
    }
}
