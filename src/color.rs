//! BGR to HSV conversion.
//!
//! Byte-range convention matches the common 8-bit HSV encoding: hue in
//! `[0, 180)` (degrees halved), saturation and value in `[0, 255]`. The
//! analysis engine itself only ever reads the value channel; hue and
//! saturation are filled in so exported frames stay faithful.

use crate::video::{Frame, PixelLayout};

/// Converts a packed BGR frame into a packed HSV frame of the same size.
pub fn bgr_to_hsv(frame: &Frame) -> Frame {
    debug_assert_eq!(frame.layout, PixelLayout::Bgr24);
    let mut out = Vec::with_capacity(frame.data.len());
    for px in frame.pixels() {
        let hsv = hsv_pixel(px[0], px[1], px[2]);
        out.extend_from_slice(&hsv);
    }
    Frame::new(frame.width, frame.height, PixelLayout::Hsv24, out)
}

fn hsv_pixel(b: u8, g: u8, r: u8) -> [u8; 3] {
    let v = b.max(g).max(r);
    let min = b.min(g).min(r);
    let delta = v - min;
    if delta == 0 {
        // Grey pixel: hue and saturation are undefined, encoded as zero.
        return [0, 0, v];
    }

    let s = ((255 * u32::from(delta) + u32::from(v) / 2) / u32::from(v)) as u8;

    let delta_f = f32::from(delta);
    let degrees = if v == r {
        60.0 * (f32::from(g) - f32::from(b)) / delta_f
    } else if v == g {
        120.0 + 60.0 * (f32::from(b) - f32::from(r)) / delta_f
    } else {
        240.0 + 60.0 * (f32::from(r) - f32::from(g)) / delta_f
    };
    let degrees = if degrees < 0.0 { degrees + 360.0 } else { degrees };
    let h = ((degrees / 2.0).round() as u16 % 180) as u8;

    [h, s, v]
}
