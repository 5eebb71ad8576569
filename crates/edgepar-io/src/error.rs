use std::path::PathBuf;

use edgepar_image::ImageError;

/// An error type for the io module.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(PathBuf),

    /// Error from the image crate while decoding or encoding.
    #[error("Failed to decode or encode the image. {0}")]
    ImageCrateError(#[from] image::ImageError),

    /// Error when the decoded data does not fit the image type.
    #[error(transparent)]
    ImageError(#[from] ImageError),

    /// Error when the image is too large for the encoder.
    #[error("Image of size {0}x{1} cannot be encoded")]
    ImageTooLarge(usize, usize),
}
