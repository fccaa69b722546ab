use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use tracing::debug;

use crate::video::{Frame, PixelLayout};

/// Writes every frame as `frame-N.jpg` under `dir`, creating the directory
/// as needed. Returns the written paths in frame order.
pub fn save_frames(frames: &[Frame], dir: &Path, quality: u8) -> Result<Vec<PathBuf>> {
    if !(1..=100).contains(&quality) {
        bail!("JPEG quality {quality} outside 1..=100");
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory: {}", dir.display()))?;

    let mut written = Vec::with_capacity(frames.len());
    for (index, frame) in frames.iter().enumerate() {
        let path = dir.join(format!("frame-{index}.jpg"));
        let encoded = encode_jpeg(frame, quality)?;
        fs::write(&path, &encoded)
            .with_context(|| format!("Failed to write frame: {}", path.display()))?;
        written.push(path);
    }
    debug!(dir = %dir.display(), frames = written.len(), "Exported frames");
    Ok(written)
}

fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>> {
    let rgb = to_rgb8(frame)?;
    let mut cursor = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
    encoder
        .write_image(&rgb, frame.width, frame.height, ExtendedColorType::Rgb8)
        .context("JPEG encode failed")?;
    Ok(cursor.into_inner())
}

fn to_rgb8(frame: &Frame) -> Result<Vec<u8>> {
    match frame.layout {
        PixelLayout::Bgr24 => Ok(frame
            .pixels()
            .flat_map(|px| [px[2], px[1], px[0]])
            .collect()),
        PixelLayout::Hsv24 => bail!("HSV frames cannot be exported"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_jpeg_with_soi_marker() {
        let frame = Frame::new(2, 2, PixelLayout::Bgr24, vec![128; 12]);
        let bytes = encode_jpeg(&frame, 100).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn rejects_out_of_range_quality() {
        let frame = Frame::new(2, 2, PixelLayout::Bgr24, vec![0; 12]);
        assert!(save_frames(&[frame], Path::new("unused"), 0).is_err());
    }
}
