//! Decoder for the `.lvr` uncompressed video container.
//!
//! Layout: a fixed header (`LVR1` magic, then big-endian u32 width, height
//! and frame count) followed by exactly `count` packed BGR24 frames. The
//! format keeps the decoder boundary honest without dragging a codec stack
//! into the crate.

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use crate::error::{Error, Result};
use crate::video::{Decoder, Frame, PixelLayout};

pub const LVR_MAGIC: [u8; 4] = *b"LVR1";
pub const LVR_EXTENSION: &str = "lvr";

const HEADER_LEN: usize = 16;
const MAX_DIMENSION: u32 = 8192;
const MAX_FRAMES: u32 = 1_000_000;

#[derive(Debug, Default, Clone, Copy)]
pub struct RawDecoder;

impl RawDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for RawDecoder {
    fn decode(&self, path: &Path) -> Result<Vec<Frame>> {
        let data = fs::read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse_lvr(path, &data)
    }
}

fn parse_lvr(path: &Path, data: &[u8]) -> Result<Vec<Frame>> {
    let mut cursor = Cursor::new(data);

    let mut magic = [0u8; 4];
    cursor
        .read_exact(&mut magic)
        .map_err(|_| decode_error(path, "truncated header"))?;
    if magic != LVR_MAGIC {
        return Err(decode_error(path, format!("bad magic {magic:02x?}")));
    }

    let width = read_u32(&mut cursor).ok_or_else(|| decode_error(path, "truncated header"))?;
    let height = read_u32(&mut cursor).ok_or_else(|| decode_error(path, "truncated header"))?;
    let count = read_u32(&mut cursor).ok_or_else(|| decode_error(path, "truncated header"))?;

    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(decode_error(
            path,
            format!("implausible dimensions {width}x{height}"),
        ));
    }
    if count > MAX_FRAMES {
        return Err(decode_error(path, format!("implausible frame count {count}")));
    }

    let frame_len = width as usize * height as usize * 3;
    let expected = count as u64 * frame_len as u64;
    let remaining = (data.len() - HEADER_LEN) as u64;
    if remaining != expected {
        return Err(decode_error(
            path,
            format!("payload is {remaining} bytes, header declares {expected}"),
        ));
    }

    let mut frames = Vec::with_capacity(count as usize);
    for index in 0..count {
        let mut pixels = vec![0u8; frame_len];
        cursor
            .read_exact(&mut pixels)
            .map_err(|_| decode_error(path, format!("truncated frame {index} of {count}")))?;
        frames.push(Frame::new(width, height, PixelLayout::Bgr24, pixels));
    }
    Ok(frames)
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Option<u32> {
    let mut buf = [0u8; 4];
    cursor.read_exact(&mut buf).ok()?;
    Some(u32::from_be_bytes(buf))
}

fn decode_error(path: &Path, reason: impl Into<String>) -> Error {
    Error::Decode {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}
