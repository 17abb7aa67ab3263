//! RGB to HSV conversion, the optional pre-stage for color inputs.
//!
//! Follows the common 8-bit convention: hue is halved into `[0, 180)` so it
//! fits a byte, saturation and value span the full `[0, 255]` range.

use crate::image::RawImage;
use crate::util::{RetMatchError, RetMatchResult};

/// Converts a three-channel RGB image into HSV with the same geometry.
pub fn rgb_to_hsv(src: &RawImage) -> RetMatchResult<RawImage> {
    if src.channels() != 3 {
        return Err(RetMatchError::UnsupportedChannelCount {
            operation: "hsv conversion",
            got: src.channels(),
        });
    }

    let mut out = Vec::with_capacity(src.data().len());
    for px in src.data().chunks_exact(3) {
        let (h, s, v) = hsv_components(px[0], px[1], px[2]);
        out.push(h);
        out.push(s);
        out.push(v);
    }
    RawImage::new(out, src.width(), src.height(), 3)
}

fn hsv_components(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let chroma = f32::from(max) - f32::from(min);

    let v = max;
    let s = if max == 0 {
        0
    } else {
        (255.0 * chroma / f32::from(max)).round() as u8
    };

    let h_deg = if chroma == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((f32::from(g) - f32::from(b)) / chroma)
    } else if max == g {
        120.0 + 60.0 * ((f32::from(b) - f32::from(r)) / chroma)
    } else {
        240.0 + 60.0 * ((f32::from(r) - f32::from(g)) / chroma)
    };
    let h_deg = if h_deg < 0.0 { h_deg + 360.0 } else { h_deg };
    let h = ((h_deg / 2.0).round() as u16 % 180) as u8;

    (h, s, v)
}
