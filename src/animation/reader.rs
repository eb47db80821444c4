//! Streaming reader for animation files.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use super::format::{AnimationHeader, CompressionType, decode_changes, decompress_lz4};
use crate::delta::{Animation, ChangeList};

/// Reads change lists back one record at a time.
///
/// Only the current record is held in memory, so playback of long
/// animations never loads the whole file.
///
/// Usage:
/// ```ignore
/// let mut reader = AnimationReader::open("eye.tvha")?;
/// println!("{} has {} frames", reader.label(), reader.frame_count());
///
/// let mut changes = Vec::new();
/// while reader.read_frame_into(&mut changes)? {
///     // Apply changes...
/// }
/// ```
pub struct AnimationReader<R: Read> {
    reader: R,
    header: AnimationHeader,
    frames_read: u32,
    /// Pre-allocated record buffer.
    record_buffer: Vec<u8>,
}

impl AnimationReader<BufReader<File>> {
    /// Open an animation file for playback.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> AnimationReader<R> {
    /// Read the header and position the stream at the first record.
    pub fn new(mut reader: R) -> io::Result<Self> {
        let header = AnimationHeader::read_from(&mut reader)?;
        Ok(Self {
            reader,
            header,
            frames_read: 0,
            record_buffer: Vec::new(),
        })
    }

    /// Get animation header.
    pub fn header(&self) -> &AnimationHeader {
        &self.header
    }

    pub fn label(&self) -> &str {
        &self.header.label
    }

    /// Get display dimensions `(width, height)`.
    pub fn dimensions(&self) -> (u16, u16) {
        (self.header.width, self.header.height)
    }

    /// Get total number of frames.
    pub fn frame_count(&self) -> u32 {
        self.header.frame_count
    }

    pub fn frames_read(&self) -> u32 {
        self.frames_read
    }

    /// True once every record has been consumed.
    pub fn is_finished(&self) -> bool {
        self.frames_read >= self.header.frame_count
    }

    /// Upper bound on a stored record, so a corrupt length prefix cannot
    /// trigger a huge allocation.
    fn max_record_size(&self) -> usize {
        let raw = self.header.pixel_count() * self.header.flags.entry_size();
        match self.header.flags.compression {
            CompressionType::None => raw,
            // Incompressible input grows by at most 1/255 plus framing.
            CompressionType::Lz4 => raw + raw / 255 + 16 + 4,
        }
    }

    /// Read the next change list into `out`.
    ///
    /// Returns `Ok(false)` once the animation is exhausted and leaves `out`
    /// untouched in that case.
    pub fn read_frame_into(&mut self, out: &mut ChangeList) -> io::Result<bool> {
        if self.is_finished() {
            return Ok(false);
        }

        let mut len = [0u8; 4];
        self.reader.read_exact(&mut len)?;
        let len = u32::from_le_bytes(len) as usize;
        if len > self.max_record_size() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Record {} is {} bytes, limit is {}",
                    self.frames_read,
                    len,
                    self.max_record_size()
                ),
            ));
        }

        self.record_buffer.resize(len, 0);
        self.reader.read_exact(&mut self.record_buffer)?;

        let pixel_count = self.header.pixel_count();
        match self.header.flags.compression {
            CompressionType::None => {
                decode_changes(&self.record_buffer, self.header.flags, pixel_count, out)?
            }
            CompressionType::Lz4 => {
                let max_size = pixel_count * self.header.flags.entry_size();
                let raw = decompress_lz4(&self.record_buffer, max_size)?;
                decode_changes(&raw, self.header.flags, pixel_count, out)?
            }
        }

        self.frames_read += 1;
        Ok(true)
    }

    /// Read the next change list, or `None` once exhausted.
    pub fn next_frame(&mut self) -> io::Result<Option<ChangeList>> {
        let mut changes = ChangeList::new();
        Ok(self.read_frame_into(&mut changes)?.then_some(changes))
    }

    /// Iterate over the remaining change lists.
    pub fn frames(&mut self) -> FrameIterator<'_, R> {
        FrameIterator {
            reader: self,
            failed: false,
        }
    }

    /// Read every remaining record into an [`Animation`].
    pub fn into_animation(mut self) -> io::Result<Animation> {
        let mut animation = Animation::new(
            self.header.label.clone(),
            self.header.width,
            self.header.height,
        );
        animation
            .frames
            .reserve(self.header.frame_count.saturating_sub(self.frames_read) as usize);
        while let Some(changes) = self.next_frame()? {
            animation.frames.push(changes);
        }
        Ok(animation)
    }
}

/// Iterator over animation records.
///
/// Stops after the first error.
pub struct FrameIterator<'a, R: Read> {
    reader: &'a mut AnimationReader<R>,
    failed: bool,
}

impl<R: Read> Iterator for FrameIterator<'_, R> {
    type Item = io::Result<ChangeList>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let next = self.reader.next_frame().transpose();
        self.failed = matches!(next, Some(Err(_)));
        next
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .reader
            .frame_count()
            .saturating_sub(self.reader.frames_read()) as usize;
        (0, Some(remaining))
    }
}

/// Deserialize a whole animation.
pub fn read_animation<R: Read>(reader: R) -> io::Result<Animation> {
    AnimationReader::new(reader)?.into_animation()
}

/// Load a whole animation from a file.
pub fn load_animation<P: AsRef<Path>>(path: P) -> io::Result<Animation> {
    AnimationReader::open(path)?.into_animation()
}
