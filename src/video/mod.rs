//! Decoded-frame model and the decoder boundary.
//!
//! The analysis engine never touches container or codec internals. Anything
//! that can turn a file into a sequence of packed BGR frames plugs in through
//! the [`Decoder`] trait; the rest of the crate only sees [`Frame`] buffers.

pub mod raw;

use std::path::Path;

use crate::error::Result;

/// Channel ordering of a packed 3-byte-per-pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// Blue, green, red. The layout every decoder hands over.
    Bgr24,
    /// Hue, saturation, value. Produced by the color converter.
    Hsv24,
}

/// A single decoded frame: packed rows, three bytes per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, layout: PixelLayout, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * 3);
        Self {
            width,
            height,
            layout,
            data,
        }
    }

    /// Frames narrower than two columns or shorter than two rows carry no
    /// analyzable area and are excluded from luminosity extraction.
    pub fn is_degenerate(&self) -> bool {
        self.width < 2 || self.height < 2
    }

    /// Raster-order pixel triples in this frame's layout.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(3)
    }
}

/// Boundary contract for turning a video file into frames.
///
/// Implementations report malformed input through [`Error::Decode`] and file
/// IO problems through [`Error::Io`]; the scheduler contains either kind
/// without affecting sibling workers.
///
/// [`Error::Decode`]: crate::error::Error::Decode
/// [`Error::Io`]: crate::error::Error::Io
pub trait Decoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<Vec<Frame>>;
}
