/// An error type for the image module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Error when the data length does not match the image size.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidDataLength(usize, usize),

    /// Error when the pixel index is out of bounds.
    #[error("Pixel index ({0}, {1}) is out of bounds ({2}, {3})")]
    PixelIndexOutOfBounds(usize, usize, usize, usize),

    /// Error when two images are expected to share a size.
    #[error("Image size mismatch: ({0}, {1}) vs ({2}, {3})")]
    InvalidImageSize(usize, usize, usize, usize),

    /// Error when the image cannot hold the neighborhood a filter needs.
    #[error("Image of size {width}x{height} is smaller than the required {min}x{min}")]
    ImageTooSmall {
        /// Width of the rejected image.
        width: usize,
        /// Height of the rejected image.
        height: usize,
        /// Minimum accepted side length.
        min: usize,
    },
}
