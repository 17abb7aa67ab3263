//! Image containers.
//!
//! `ImageView` is a borrowed single-channel 2D view into a 1D buffer with an
//! explicit stride. The stride counts elements between the starts of
//! consecutive rows, so padded rows are representable. `RawImage` owns the
//! interleaved bytes of a decoded photograph with one or three channels and
//! is never mutated by the pipeline. `GrayBuffer` owns a contiguous
//! single-channel image and is the working type passed between stages.

use crate::util::{RetMatchError, RetMatchResult};

#[cfg(feature = "image-io")]
pub mod io;
pub mod pyramid;

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> RetMatchResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> RetMatchResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(RetMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> RetMatchResult<usize> {
    if width == 0 || height == 0 {
        return Err(RetMatchError::InvalidImage { width, height });
    }
    if stride < width {
        return Err(RetMatchError::InvalidStride { width, stride });
    }
    let needed = (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(RetMatchError::InvalidImage { width, height })?;
    Ok(needed)
}

/// Owned interleaved 8-bit image as decoded from disk.
///
/// Either a single intensity channel or three color channels in RGB order.
#[derive(Clone, Debug)]
pub struct RawImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
    channels: u8,
}

impl RawImage {
    /// Wraps interleaved pixel data.
    ///
    /// The buffer length must be exactly `width * height * channels` and the
    /// channel count must be 1 or 3.
    pub fn new(data: Vec<u8>, width: usize, height: usize, channels: u8) -> RetMatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(RetMatchError::InvalidImage { width, height });
        }
        if channels != 1 && channels != 3 {
            return Err(RetMatchError::UnsupportedChannelCount {
                operation: "raw image construction",
                got: channels,
            });
        }
        let needed = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(channels as usize))
            .ok_or(RetMatchError::InvalidImage { width, height })?;
        if data.len() < needed {
            return Err(RetMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(RetMatchError::InvalidImage { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of interleaved channels (1 or 3).
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Returns the interleaved pixel bytes in row-major order.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Owned contiguous single-channel image.
#[derive(Clone, Debug)]
pub struct GrayBuffer {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl GrayBuffer {
    /// Wraps a contiguous buffer of exactly `width * height` pixels.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> RetMatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(RetMatchError::InvalidImage { width, height });
        }
        let needed = width
            .checked_mul(height)
            .ok_or(RetMatchError::InvalidImage { width, height })?;
        if data.len() < needed {
            return Err(RetMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(RetMatchError::InvalidImage { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Allocates a buffer filled with a constant value.
    pub fn filled(width: usize, height: usize, value: u8) -> RetMatchResult<Self> {
        let needed = width
            .checked_mul(height)
            .ok_or(RetMatchError::InvalidImage { width, height })?;
        Self::new(vec![value; needed], width, height)
    }

    /// Copies a view into an owned contiguous buffer.
    pub fn from_view(view: ImageView<'_, u8>) -> Self {
        let mut data = Vec::with_capacity(view.width() * view.height());
        for y in 0..view.height() {
            let row = view.row(y).expect("view rows are in bounds");
            data.extend_from_slice(row);
        }
        Self {
            data,
            width: view.width(),
            height: view.height(),
        }
    }

    /// Crate-internal constructor for buffers whose geometry is known correct.
    pub(crate) fn from_raw(data: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            data,
            width,
            height,
        }
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the pixel bytes in row-major order.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns a borrowed view of the full image.
    pub fn view(&self) -> ImageView<'_, u8> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }

    /// Consumes the buffer and returns the pixel bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}
