//! Binary format definitions for TV head animation files.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

use crate::delta::{ChangeEntry, ChangeList};
use crate::geometry::Pixel;

/// Magic bytes identifying a TV head animation file.
pub const ANIMATION_MAGIC: &[u8; 4] = b"TVHA";

/// Current format version.
pub const ANIMATION_VERSION: u16 = 1;

/// File extension of the binary form.
pub const ANIMATION_EXTENSION: &str = "tvha";

/// Longest label the header can carry.
pub const MAX_LABEL_LEN: usize = u16::MAX as usize;

/// Compression type for change list records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum CompressionType {
    /// No compression (raw entries).
    #[default]
    None = 0,
    /// LZ4 fast compression.
    Lz4 = 1,
}

impl CompressionType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(CompressionType::None),
            1 => Some(CompressionType::Lz4),
            _ => None,
        }
    }
}

/// Animation file header flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnimationFlags {
    /// Compression type (lower 4 bits).
    pub compression: CompressionType,
    /// If true, indices are stored as u32 instead of u16.
    pub wide_indices: bool,
}

impl AnimationFlags {
    pub fn to_u16(self) -> u16 {
        let mut flags = self.compression as u16;
        if self.wide_indices {
            flags |= 1 << 4;
        }
        flags
    }

    pub fn from_u16(v: u16) -> Self {
        Self {
            compression: CompressionType::from_u8((v & 0x0F) as u8).unwrap_or_default(),
            wide_indices: (v & (1 << 4)) != 0,
        }
    }

    /// Flags for a display of `pixel_count` LEDs.
    pub fn for_pixels(pixel_count: usize, compression: CompressionType) -> Self {
        Self {
            compression,
            wide_indices: pixel_count > u16::MAX as usize + 1,
        }
    }

    /// Bytes per stored change entry.
    #[inline]
    pub fn entry_size(self) -> usize {
        if self.wide_indices { 4 + 3 } else { 2 + 3 }
    }
}

/// File header: stored once, not per frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationHeader {
    /// Display width in LEDs.
    pub width: u16,
    /// Display height in LEDs.
    pub height: u16,
    /// Total number of change lists.
    pub frame_count: u32,
    /// Animation flags.
    pub flags: AnimationFlags,
    /// Human-readable label.
    pub label: String,
}

impl AnimationHeader {
    /// Size of the fixed part of the header in bytes.
    /// Magic(4) + Version(2) + Flags(2) + Width(2) + Height(2) +
    /// FrameCount(4) + Reserved(4) = 20, followed by LabelLen(2) + label.
    pub const FIXED_SIZE: usize = 20;

    /// Byte offset of the frame count field.
    pub const FRAME_COUNT_OFFSET: u64 = 12;

    /// Total encoded size including the label.
    pub fn size(&self) -> usize {
        Self::FIXED_SIZE + 2 + self.label.len()
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Write header to output.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        if self.label.len() > MAX_LABEL_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Label is {} bytes, limit is {}", self.label.len(), MAX_LABEL_LEN),
            ));
        }
        w.write_all(ANIMATION_MAGIC)?;
        w.write_all(&ANIMATION_VERSION.to_le_bytes())?;
        w.write_all(&self.flags.to_u16().to_le_bytes())?;
        w.write_all(&self.width.to_le_bytes())?;
        w.write_all(&self.height.to_le_bytes())?;
        w.write_all(&self.frame_count.to_le_bytes())?;
        // Reserved bytes
        w.write_all(&[0u8; 4])?;
        w.write_all(&(self.label.len() as u16).to_le_bytes())?;
        w.write_all(self.label.as_bytes())?;
        Ok(())
    }

    /// Read header from input.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != ANIMATION_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid TVHA magic bytes",
            ));
        }

        let mut buf2 = [0u8; 2];
        let mut buf4 = [0u8; 4];

        r.read_exact(&mut buf2)?;
        let version = u16::from_le_bytes(buf2);
        if version != ANIMATION_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unsupported TVHA version: {}", version),
            ));
        }

        r.read_exact(&mut buf2)?;
        let flags = AnimationFlags::from_u16(u16::from_le_bytes(buf2));

        r.read_exact(&mut buf2)?;
        let width = u16::from_le_bytes(buf2);

        r.read_exact(&mut buf2)?;
        let height = u16::from_le_bytes(buf2);

        r.read_exact(&mut buf4)?;
        let frame_count = u32::from_le_bytes(buf4);

        // Skip reserved bytes
        r.read_exact(&mut buf4)?;

        r.read_exact(&mut buf2)?;
        let mut label = vec![0u8; u16::from_le_bytes(buf2) as usize];
        r.read_exact(&mut label)?;
        let label = String::from_utf8(label)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        Ok(Self {
            width,
            height,
            frame_count,
            flags,
            label,
        })
    }
}

/// Encode a change list into record payload bytes.
pub fn encode_changes(changes: &[ChangeEntry], flags: AnimationFlags, out: &mut Vec<u8>) {
    out.clear();
    out.reserve(changes.len() * flags.entry_size());
    for entry in changes {
        if flags.wide_indices {
            out.extend_from_slice(&entry.index.to_le_bytes());
        } else {
            out.extend_from_slice(&(entry.index as u16).to_le_bytes());
        }
        out.extend_from_slice(&[entry.pixel.r, entry.pixel.g, entry.pixel.b]);
    }
}

/// Decode record payload bytes into `out`, validating every index against
/// the display size.
pub fn decode_changes(
    bytes: &[u8],
    flags: AnimationFlags,
    pixel_count: usize,
    out: &mut ChangeList,
) -> io::Result<()> {
    let entry_size = flags.entry_size();
    if bytes.len() % entry_size != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Record size {} is not a multiple of entry size {}",
                bytes.len(),
                entry_size
            ),
        ));
    }

    out.clear();
    out.reserve(bytes.len() / entry_size);
    for chunk in bytes.chunks_exact(entry_size) {
        let (index, rgb) = if flags.wide_indices {
            (
                u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
                &chunk[4..],
            )
        } else {
            (u16::from_le_bytes([chunk[0], chunk[1]]) as u32, &chunk[2..])
        };
        if index as usize >= pixel_count {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Pixel index {} out of range for {} pixels", index, pixel_count),
            ));
        }
        out.push(ChangeEntry {
            index,
            pixel: Pixel::new(rgb[0], rgb[1], rgb[2]),
        });
    }
    Ok(())
}

/// Compress data using LZ4.
#[cfg(feature = "lz4")]
pub fn compress_lz4(data: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(data)
}

/// Decompress LZ4 data whose decompressed size must not exceed `max_size`.
#[cfg(feature = "lz4")]
pub fn decompress_lz4(data: &[u8], max_size: usize) -> io::Result<Vec<u8>> {
    let Some(prefix) = data.get(..4) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "Compressed record shorter than its size prefix",
        ));
    };
    let size = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    check_record_size(size, max_size)?;
    lz4_flex::decompress_size_prepended(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn check_record_size(size: usize, max_size: usize) -> io::Result<()> {
    if size > max_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Decompressed record is {} bytes, limit is {}", size, max_size),
        ));
    }
    Ok(())
}

/// Fallback when LZ4 is not available.
#[cfg(not(feature = "lz4"))]
pub fn compress_lz4(data: &[u8]) -> Vec<u8> {
    data.to_vec()
}

#[cfg(not(feature = "lz4"))]
pub fn decompress_lz4(data: &[u8], max_size: usize) -> io::Result<Vec<u8>> {
    check_record_size(data.len(), max_size)?;
    Ok(data.to_vec())
}
