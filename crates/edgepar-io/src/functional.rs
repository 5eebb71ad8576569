use std::path::Path;

use edgepar_image::{Image, ImageSize};

use crate::error::IoError;

/// Reads an image from the given file path as 8-bit grayscale.
///
/// Any format supported by the `image` crate is accepted; color images are
/// converted to luma.
///
/// # Arguments
///
/// * `file_path` - The path to the image.
///
/// # Returns
///
/// A single channel image with the decoded intensities.
pub fn read_image_gray8(file_path: impl AsRef<Path>) -> Result<Image<u8>, IoError> {
    let file_path = file_path.as_ref();

    // verify the file exists
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let img = image::open(file_path)?.into_luma8();
    let size = ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    };
    log::debug!("decoded {} as {size}", file_path.display());

    Ok(Image::new(size, img.into_raw())?)
}

/// Writes a grayscale image to the given file path.
///
/// The encoding is chosen from the file extension.
///
/// # Arguments
///
/// * `file_path` - The destination path.
/// * `image` - The image to encode.
pub fn write_image_gray8(file_path: impl AsRef<Path>, image: &Image<u8>) -> Result<(), IoError> {
    let (width, height) = (image.width(), image.height());
    let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
        return Err(IoError::ImageTooLarge(width, height));
    };

    let buffer = image::GrayImage::from_raw(w, h, image.as_slice().to_vec())
        .ok_or(IoError::ImageTooLarge(width, height))?;
    buffer.save(file_path.as_ref())?;

    Ok(())
}
