//! Image loading and saving via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::{GrayBuffer, ImageView, RawImage};
use crate::util::{RetMatchError, RetMatchResult};
use std::path::Path;

/// Converts a decoded dynamic image into a [`RawImage`].
///
/// Grayscale inputs keep their single channel; everything else is flattened
/// to 8-bit RGB.
pub fn raw_from_dynamic_image(img: &image::DynamicImage) -> RetMatchResult<RawImage> {
    match img {
        image::DynamicImage::ImageLuma8(gray) => RawImage::new(
            gray.as_raw().clone(),
            gray.width() as usize,
            gray.height() as usize,
            1,
        ),
        other => {
            let rgb = other.to_rgb8();
            RawImage::new(
                rgb.as_raw().clone(),
                rgb.width() as usize,
                rgb.height() as usize,
                3,
            )
        }
    }
}

/// Loads an image from disk without flattening its channels.
///
/// A missing file maps to [`RetMatchError::FileNotFound`], any decoder
/// failure to [`RetMatchError::DecodeError`].
pub fn load_raw_image<P: AsRef<Path>>(path: P) -> RetMatchResult<RawImage> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|err| match err {
        image::ImageError::IoError(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
            RetMatchError::FileNotFound {
                path: path.display().to_string(),
            }
        }
        other => RetMatchError::DecodeError {
            reason: other.to_string(),
        },
    })?;
    raw_from_dynamic_image(&img)
}

/// Saves a single-channel view to disk; the format follows the extension.
pub fn save_gray_image<P: AsRef<Path>>(path: P, view: ImageView<'_, u8>) -> RetMatchResult<()> {
    let buffer = GrayBuffer::from_view(view);
    let width = buffer.width() as u32;
    let height = buffer.height() as u32;
    let img = image::GrayImage::from_raw(width, height, buffer.into_data())
        .expect("buffer length matches dimensions");
    img.save(path).map_err(|err| RetMatchError::WriteError {
        reason: err.to_string(),
    })
}
