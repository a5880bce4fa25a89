//! Video frame size from container headers.
//!
//! Only the first bytes of the file are inspected. This is not a demuxer:
//! it finds the track header fields that carry the frame size for the common
//! containers and falls back to 16:9 when they can't be found, so a video
//! always gets a tile.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, trace};

/// Size assumed for videos whose headers could not be parsed.
pub const FALLBACK_DIMENSIONS: (u32, u32) = (1920, 1080);

const HEADER_BYTES: u64 = 128 * 1024;

/// Frame size of the video at `path`, or [`FALLBACK_DIMENSIONS`].
pub fn video_dimensions(path: &Path) -> Result<(u32, u32)> {
    let mut header = Vec::new();
    File::open(path)
        .with_context(|| format!("Failed to open video {}", path.display()))?
        .take(HEADER_BYTES)
        .read_to_end(&mut header)
        .with_context(|| format!("Failed to read video {}", path.display()))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let parsed = match ext.as_str() {
        "webm" | "mkv" => parse_matroska_dimensions(&header),
        "mp4" | "mov" => parse_mp4_dimensions(&header),
        "avi" => parse_avi_dimensions(&header),
        _ => None,
    };

    match parsed {
        Some((width, height)) => {
            trace!(path = %path.display(), width, height, "Parsed video dimensions");
            Ok((width, height))
        }
        None => {
            debug!(path = %path.display(), "Could not parse video dimensions, using fallback");
            Ok(FALLBACK_DIMENSIONS)
        }
    }
}

fn plausible(width: u32, height: u32) -> Option<(u32, u32)> {
    (width > 0 && height > 0 && width < 65536 && height < 65536).then_some((width, height))
}

fn be_u16(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 2)?;
    Some(u32::from(u16::from_be_bytes([bytes[0], bytes[1]])))
}

fn be_u32(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn le_i32(data: &[u8], at: usize) -> Option<i32> {
    let bytes = data.get(at..at + 4)?;
    Some(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// MP4/MOV: the `tkhd` box of a video track, then the visual sample entry.
///
/// `tkhd` stores width and height as 16.16 fixed point, 80 bytes after the
/// box type for version 0 and 92 for version 1. Audio tracks carry zeros
/// there and are skipped.
fn parse_mp4_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    for i in 0..data.len().saturating_sub(4) {
        if &data[i..i + 4] != b"tkhd" {
            continue;
        }
        let offset = match data.get(i + 4) {
            Some(0) => i + 80,
            Some(_) => i + 92,
            None => continue,
        };
        let (Some(width), Some(height)) = (be_u32(data, offset), be_u32(data, offset + 4)) else {
            continue;
        };
        if let Some(dimensions) = plausible(width >> 16, height >> 16) {
            return Some(dimensions);
        }
    }

    for i in 0..data.len().saturating_sub(4) {
        let tag = &data[i..i + 4];
        if tag != b"avc1" && tag != b"hvc1" && tag != b"mp4v" && tag != b"vp09" && tag != b"av01" {
            continue;
        }
        let (Some(width), Some(height)) = (be_u16(data, i + 28), be_u16(data, i + 30)) else {
            continue;
        };
        if let Some(dimensions) = plausible(width, height) {
            return Some(dimensions);
        }
    }
    None
}

/// Matroska/WebM: `PixelWidth` (0xB0) and `PixelHeight` (0xBA) inside the
/// first `Video` element (0xE0).
fn parse_matroska_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let video = data.iter().position(|&byte| byte == 0xE0)?;
    let mut width = None;
    let mut height = None;

    let mut i = video + 1;
    while i < data.len() && (width.is_none() || height.is_none()) {
        match data[i] {
            0xB0 if width.is_none() => width = read_ebml_uint(data, i + 1),
            0xBA if height.is_none() => height = read_ebml_uint(data, i + 1),
            _ => {}
        }
        i += 1;
    }

    let width = u32::try_from(width?).ok()?;
    let height = u32::try_from(height?).ok()?;
    plausible(width, height)
}

/// Reads an EBML unsigned integer element body starting at its size field.
fn read_ebml_uint(data: &[u8], at: usize) -> Option<u64> {
    let (size, size_len) = read_vint(data.get(at..)?)?;
    if size == 0 || size > 4 {
        return None;
    }
    let start = at + size_len;
    let bytes = data.get(start..start + size as usize)?;
    Some(bytes.iter().fold(0u64, |value, &byte| (value << 8) | u64::from(byte)))
}

/// EBML variable-length integer: the count of leading zeros in the first
/// byte gives the length, the marker bit is masked off.
fn read_vint(data: &[u8]) -> Option<(u64, usize)> {
    let first = *data.first()?;
    if first == 0 {
        return None;
    }
    let len = first.leading_zeros() as usize + 1;
    let rest = data.get(1..len)?;
    let mask = if len == 8 { 0 } else { 0xFFu8 >> len };
    let value = rest
        .iter()
        .fold(u64::from(first & mask), |value, &byte| (value << 8) | u64::from(byte));
    Some((value, len))
}

/// AVI: the BITMAPINFOHEADER inside the video stream's `strf` chunk.
fn parse_avi_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    for i in 0..data.len().saturating_sub(4) {
        if &data[i..i + 4] != b"strf" {
            continue;
        }
        let header = i + 8;
        let (Some(width), Some(height)) = (le_i32(data, header + 4), le_i32(data, header + 8)) else {
            continue;
        };
        // Negative height marks a top-down bitmap.
        if let Some(dimensions) = plausible(width.unsigned_abs(), height.unsigned_abs()) {
            return Some(dimensions);
        }
    }
    None
}
