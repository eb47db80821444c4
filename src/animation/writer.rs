//! Streaming writer for animation files.

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use super::format::{
    AnimationFlags, AnimationHeader, CompressionType, compress_lz4, encode_changes,
};
use crate::delta::{Animation, ChangeEntry};

/// Writes change lists one record at a time.
///
/// Usage:
/// ```ignore
/// let mut writer = AnimationWriter::create("eye.tvha", "eye", 16, 10, CompressionType::None)?;
/// for changes in &animation.frames {
///     writer.write_frame(changes)?;
/// }
/// writer.finalize()?;
/// ```
pub struct AnimationWriter<W: Write + Seek> {
    writer: W,
    header: AnimationHeader,
    header_offset: u64,
    frames_written: u32,
    entries_written: u64,
    /// Pre-allocated buffer for record encoding.
    encode_buffer: Vec<u8>,
}

impl AnimationWriter<BufWriter<File>> {
    /// Create a new animation file.
    pub fn create<P: AsRef<Path>>(
        path: P,
        label: &str,
        width: u16,
        height: u16,
        compression: CompressionType,
    ) -> io::Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), label, width, height, compression)
    }
}

impl<W: Write + Seek> AnimationWriter<W> {
    /// Start an animation at the writer's current position.
    pub fn new(
        mut writer: W,
        label: &str,
        width: u16,
        height: u16,
        compression: CompressionType,
    ) -> io::Result<Self> {
        let header_offset = writer.stream_position()?;
        let header = AnimationHeader {
            width,
            height,
            frame_count: 0, // Will be updated on finalize
            flags: AnimationFlags::for_pixels(
                width as usize * height as usize,
                compression,
            ),
            label: label.to_string(),
        };

        // Write placeholder header
        header.write_to(&mut writer)?;

        Ok(Self {
            writer,
            header,
            header_offset,
            frames_written: 0,
            entries_written: 0,
            encode_buffer: Vec::new(),
        })
    }

    /// Append one change list as a record.
    ///
    /// Indices must be in range and strictly ascending.
    pub fn write_frame(&mut self, changes: &[ChangeEntry]) -> io::Result<()> {
        let pixel_count = self.header.pixel_count();
        if let Some(entry) = changes.iter().find(|e| e.index as usize >= pixel_count) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Pixel index {} out of range for {}x{} display",
                    entry.index, self.header.width, self.header.height
                ),
            ));
        }
        // Strictly ascending indices keep a record within `pixel_count` entries.
        if let Some(pair) = changes.windows(2).find(|w| w[0].index >= w[1].index) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Change list not strictly ascending: index {} follows {}",
                    pair[1].index, pair[0].index
                ),
            ));
        }
        if self.frames_written == u32::MAX {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Too many frames for one animation",
            ));
        }

        encode_changes(changes, self.header.flags, &mut self.encode_buffer);

        match self.header.flags.compression {
            CompressionType::None => {
                self.writer
                    .write_all(&(self.encode_buffer.len() as u32).to_le_bytes())?;
                self.writer.write_all(&self.encode_buffer)?;
            }
            CompressionType::Lz4 => {
                let compressed = compress_lz4(&self.encode_buffer);
                self.writer
                    .write_all(&(compressed.len() as u32).to_le_bytes())?;
                self.writer.write_all(&compressed)?;
            }
        }

        self.frames_written += 1;
        self.entries_written += changes.len() as u64;
        Ok(())
    }

    /// Finalize the animation file.
    ///
    /// Patches the frame count into the header and flushes.
    pub fn finalize(mut self) -> io::Result<AnimationStats> {
        let end = self.writer.stream_position()?;

        self.header.frame_count = self.frames_written;
        self.writer.seek(SeekFrom::Start(
            self.header_offset + AnimationHeader::FRAME_COUNT_OFFSET,
        ))?;
        self.writer
            .write_all(&self.header.frame_count.to_le_bytes())?;
        self.writer.seek(SeekFrom::Start(end))?;

        // Flush and close
        self.writer.flush()?;

        Ok(AnimationStats {
            frame_count: self.frames_written,
            entries: self.entries_written,
            total_bytes: end - self.header_offset,
            compression: self.header.flags.compression,
        })
    }

    /// Get number of frames written so far.
    pub fn frames_written(&self) -> u32 {
        self.frames_written
    }
}

/// Statistics from a write session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationStats {
    /// Total change lists written.
    pub frame_count: u32,
    /// Total change entries written.
    pub entries: u64,
    /// Total file size in bytes.
    pub total_bytes: u64,
    /// Compression used.
    pub compression: CompressionType,
}

impl std::fmt::Display for AnimationStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames, {} entries, {} bytes total ({:?} compression)",
            self.frame_count, self.entries, self.total_bytes, self.compression
        )
    }
}

/// Serialize a whole animation.
pub fn write_animation<W: Write + Seek>(
    animation: &Animation,
    writer: W,
    compression: CompressionType,
) -> io::Result<AnimationStats> {
    let mut writer = AnimationWriter::new(
        writer,
        &animation.label,
        animation.width,
        animation.height,
        compression,
    )?;
    for changes in &animation.frames {
        writer.write_frame(changes)?;
    }
    writer.finalize()
}

/// Serialize a whole animation to a file.
pub fn save_animation<P: AsRef<Path>>(
    path: P,
    animation: &Animation,
    compression: CompressionType,
) -> io::Result<AnimationStats> {
    let file = File::create(path)?;
    write_animation(animation, BufWriter::new(file), compression)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn test_animation() -> Animation {
        let mut animation = Animation::new("blink", 4, 2);
        animation.frames = vec![
            vec![ChangeEntry::new(0, 255, 0, 0), ChangeEntry::new(7, 0, 0, 255)],
            vec![ChangeEntry::new(0, 0, 0, 0)],
            vec![ChangeEntry::new(0, 0, 0, 0)],
        ];
        animation
    }

    #[test]
    fn test_writer_basic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blink.tvha");

        let stats = save_animation(&path, &test_animation(), CompressionType::None).unwrap();
        assert_eq!(stats.frame_count, 3);
        assert_eq!(stats.entries, 4);

        let metadata = fs::metadata(&path).unwrap();
        assert_eq!(metadata.len(), stats.total_bytes);
        // Header + 3 length prefixes + 4 entries of 5 bytes.
        assert_eq!(stats.total_bytes, (22 + 5 + 3 * 4 + 4 * 5) as u64);
    }

    #[test]
    fn test_writer_patches_frame_count() {
        let mut cursor = Cursor::new(Vec::new());
        write_animation(&test_animation(), &mut cursor, CompressionType::None).unwrap();
        let bytes = cursor.into_inner();
        let at = AnimationHeader::FRAME_COUNT_OFFSET as usize;
        assert_eq!(&bytes[at..at + 4], &3u32.to_le_bytes());
    }

    #[test]
    fn test_writer_rejects_out_of_range_index() {
        let mut cursor = Cursor::new(Vec::new());
        let mut writer =
            AnimationWriter::new(&mut cursor, "bad", 2, 2, CompressionType::None).unwrap();
        let err = writer
            .write_frame(&[ChangeEntry::new(4, 1, 1, 1)])
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(writer.frames_written(), 0);
    }

    #[test]
    fn test_writer_rejects_unordered_changes() {
        let mut cursor = Cursor::new(Vec::new());
        let mut writer =
            AnimationWriter::new(&mut cursor, "bad", 1, 1, CompressionType::None).unwrap();
        let repeated = [ChangeEntry::new(0, 1, 1, 1), ChangeEntry::new(0, 2, 2, 2)];
        let err = writer.write_frame(&repeated).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let mut writer =
            AnimationWriter::new(Cursor::new(Vec::new()), "bad", 4, 1, CompressionType::None)
                .unwrap();
        let descending = [ChangeEntry::new(3, 1, 1, 1), ChangeEntry::new(1, 1, 1, 1)];
        assert!(writer.write_frame(&descending).is_err());
        let ascending = [ChangeEntry::new(1, 1, 1, 1), ChangeEntry::new(3, 1, 1, 1)];
        assert!(writer.write_frame(&ascending).is_ok());
        assert_eq!(writer.frames_written(), 1);
    }

    #[test]
    fn test_writer_empty_animation() {
        let mut cursor = Cursor::new(Vec::new());
        let stats =
            write_animation(&Animation::new("none", 3, 3), &mut cursor, CompressionType::None)
                .unwrap();
        assert_eq!(stats.frame_count, 0);
        assert_eq!(stats.total_bytes, (22 + 4) as u64);
    }
}
