//! Pixel luminosity kernels.
//!
//! Two scoring formulas sit behind one contract: a BT.709 weighted sum over
//! the BGR channels, and the value channel of the HSV-converted frame. Both
//! produce one byte per pixel; [`plane_for_frame`] applies the selected
//! kernel across a frame in raster order.

use clap::ValueEnum;
use serde::Deserialize;

use crate::color;
use crate::video::Frame;

/// BT.709 luma weights for 8-bit channels.
pub const LUMA_WEIGHT_B: f32 = 0.0722;
pub const LUMA_WEIGHT_G: f32 = 0.7152;
pub const LUMA_WEIGHT_R: f32 = 0.2126;

/// Which luminosity formula a run scores frames with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LumaMode {
    /// Weighted BT.709 sum over blue, green and red.
    Rec709,
    /// Value channel of the HSV representation (the brightest channel).
    HsvValue,
}

impl Default for LumaMode {
    fn default() -> Self {
        LumaMode::HsvValue
    }
}

/// Per-pixel luminosity of one eligible frame.
///
/// The plane carries the index of the frame it was derived from, so frames
/// skipped as degenerate never shift the correspondence between planes and
/// their source frames.
#[derive(Debug, Clone, PartialEq)]
pub struct LumaPlane {
    pub frame_index: usize,
    pub values: Vec<u8>,
}

impl LumaPlane {
    /// Truncated integer mean of the plane; zero for an empty plane.
    pub fn mean(&self) -> u32 {
        if self.values.is_empty() {
            return 0;
        }
        let sum: u64 = self.values.iter().map(|&v| u64::from(v)).sum();
        (sum / self.values.len() as u64) as u32
    }
}

/// Relative luminance of one BGR pixel, rounded to the nearest integer.
///
/// The weighted sum is carried in `f32` so intermediate values above a byte
/// survive until the final narrowing; the weights sum to one, so the result
/// always fits.
pub fn rec709_luma(b: u8, g: u8, r: u8) -> u8 {
    let weighted =
        LUMA_WEIGHT_B * f32::from(b) + LUMA_WEIGHT_G * f32::from(g) + LUMA_WEIGHT_R * f32::from(r);
    weighted.round() as u8
}

/// Applies `mode` across one frame, or returns `None` for a degenerate frame.
pub fn plane_for_frame(frame: &Frame, frame_index: usize, mode: LumaMode) -> Option<LumaPlane> {
    if frame.is_degenerate() {
        return None;
    }
    let values = match mode {
        LumaMode::Rec709 => frame
            .pixels()
            .map(|px| rec709_luma(px[0], px[1], px[2]))
            .collect(),
        LumaMode::HsvValue => {
            let hsv = color::bgr_to_hsv(frame);
            hsv.pixels().map(|px| px[2]).collect()
        }
    };
    Some(LumaPlane {
        frame_index,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::PixelLayout;

    fn bgr_frame(width: u32, height: u32, pixel: [u8; 3]) -> Frame {
        let data = pixel
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Frame::new(width, height, PixelLayout::Bgr24, data)
    }

    #[test]
    fn rec709_extremes() {
        assert_eq!(rec709_luma(0, 0, 0), 0);
        assert_eq!(rec709_luma(255, 255, 255), 255);
    }

    #[test]
    fn rec709_rounds_to_nearest() {
        // 0.7152 * 200 = 143.04 -> 143, and 0.2126 * 200 = 42.52 -> 43.
        assert_eq!(rec709_luma(0, 200, 0), 143);
        assert_eq!(rec709_luma(0, 0, 200), 43);
    }

    #[test]
    fn hsv_value_mode_scores_channel_maximum() {
        let frame = bgr_frame(2, 2, [10, 250, 30]);
        let plane = plane_for_frame(&frame, 0, LumaMode::HsvValue).unwrap();
        assert_eq!(plane.values, vec![250; 4]);
    }

    #[test]
    fn degenerate_frames_produce_no_plane() {
        let row = bgr_frame(5, 1, [9, 9, 9]);
        let column = bgr_frame(1, 5, [9, 9, 9]);
        assert!(plane_for_frame(&row, 0, LumaMode::Rec709).is_none());
        assert!(plane_for_frame(&column, 1, LumaMode::HsvValue).is_none());
    }

    #[test]
    fn plane_mean_truncates() {
        let plane = LumaPlane {
            frame_index: 0,
            values: vec![1, 2],
        };
        assert_eq!(plane.mean(), 1);
        let empty = LumaPlane {
            frame_index: 0,
            values: Vec::new(),
        };
        assert_eq!(empty.mean(), 0);
    }
}
