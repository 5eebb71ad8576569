use edgepar_image::{Image, ImageError};

/// Fill the outer `margin` rows and columns of an image by replicating the nearest interior ones.
///
/// The interior is `[margin, n - margin)` on both axes. The rows are replicated
/// first, then the columns, and finally each corner block takes the value of
/// its nearest interior-diagonal pixel. With `margin = 1` this is:
///
/// * row 0 <- row 1, last row <- second-to-last row
/// * column 0 <- column 1, last column <- second-to-last column
/// * top-left <- (1, 1) and likewise for the other three corners
///
/// Applying the policy twice leaves the image unchanged.
///
/// # Arguments
///
/// * `image` - The image to update in place.
/// * `margin` - The width of the border band. A margin of zero is a no-op.
///
/// # Errors
///
/// Returns [`ImageError::ImageTooSmall`] when no interior pixel remains.
///
/// # Examples
///
/// ```
/// use edgepar_image::Image;
/// use edgepar_imgproc::filter::replicate_border;
///
/// let mut image = Image::new([3, 3].into(), vec![0u8, 0, 0, 0, 7, 0, 0, 0, 0]).unwrap();
/// replicate_border(&mut image, 1).unwrap();
/// assert_eq!(image.as_slice(), &[7u8; 9]);
/// ```
pub fn replicate_border<T: Copy>(image: &mut Image<T>, margin: usize) -> Result<(), ImageError> {
    if margin == 0 {
        return Ok(());
    }

    let (width, height) = (image.width(), image.height());
    let min = 2 * margin + 1;
    if width < min || height < min {
        return Err(ImageError::ImageTooSmall { width, height, min });
    }

    let first = margin;
    let last_row = height - margin - 1;
    let last_col = width - margin - 1;
    let data = image.as_slice_mut();

    // replicate rows
    for row in 0..margin {
        data.copy_within(first * width..(first + 1) * width, row * width);
    }
    for row in height - margin..height {
        data.copy_within(last_row * width..(last_row + 1) * width, row * width);
    }

    // replicate columns
    for line in data.chunks_exact_mut(width) {
        let (left, right) = (line[first], line[last_col]);
        line[..margin].fill(left);
        line[width - margin..].fill(right);
    }

    // replicate corners
    let corners = [
        (0..margin, 0..margin, (first, first)),
        (0..margin, width - margin..width, (first, last_col)),
        (height - margin..height, 0..margin, (last_row, first)),
        (height - margin..height, width - margin..width, (last_row, last_col)),
    ];
    for (rows, cols, (src_row, src_col)) in corners {
        let val = data[src_row * width + src_col];
        for row in rows {
            data[row * width + cols.start..row * width + cols.end].fill(val);
        }
    }

    Ok(())
}
