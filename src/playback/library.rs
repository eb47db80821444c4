//! Animations available to the device, one per channel.

use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use log::debug;

use crate::animation::{ANIMATION_EXTENSION, AnimationReader, CompressionType, write_animation};
use crate::delta::{Animation, ChangeList};
use crate::error::{Error, Result};

/// A sequence of change lists consumed one at a time.
pub trait FrameStream {
    /// Stored `(width, height)`.
    fn dimensions(&self) -> (u16, u16);

    /// Read the next change list into `out`. `Ok(false)` at the end.
    fn next_frame_into(&mut self, out: &mut ChangeList) -> io::Result<bool>;
}

impl<R: Read> FrameStream for AnimationReader<R> {
    fn dimensions(&self) -> (u16, u16) {
        AnimationReader::dimensions(self)
    }

    fn next_frame_into(&mut self, out: &mut ChangeList) -> io::Result<bool> {
        self.read_frame_into(out)
    }
}

/// Channel-indexed animation storage.
pub trait AnimationSource {
    fn channel_count(&self) -> usize;

    /// Human-readable identifier of a channel.
    fn channel_name(&self, channel: u32) -> Option<&str>;

    /// Open the animation bound to `channel` for streaming. Channels wrap
    /// modulo [`AnimationSource::channel_count`].
    fn open(&self, channel: u32) -> Result<Box<dyn FrameStream>>;
}

/// Device animation directory: one subdirectory per animation, each holding
/// its `.tvha` file. Directory names are the channel names.
#[derive(Debug, Clone)]
pub struct DirectoryLibrary {
    root: PathBuf,
    channels: Vec<(String, PathBuf)>,
}

impl DirectoryLibrary {
    /// Scan `root` for animation directories, sorted by name.
    ///
    /// Directories without an animation file are skipped.
    pub fn scan<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut channels = Vec::new();

        let mut dirs: Vec<PathBuf> = fs::read_dir(&root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        for dir in dirs {
            let Some(name) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            match find_animation(&dir, &name)? {
                Some(path) => channels.push((name, path)),
                None => debug!("No animation in {}", dir.display()),
            }
        }

        Ok(Self { root, channels })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|(name, _)| name.as_str())
    }

    fn resolve(&self, channel: u32) -> Result<&(String, PathBuf)> {
        if self.channels.is_empty() {
            return Err(Error::ChannelUnavailable(channel));
        }
        Ok(&self.channels[channel as usize % self.channels.len()])
    }
}

/// `<dir>/<name>.tvha`, or else the first `.tvha` file in name order.
fn find_animation(dir: &Path, name: &str) -> Result<Option<PathBuf>> {
    let preferred = dir.join(format!("{}.{}", name, ANIMATION_EXTENSION));
    if preferred.is_file() {
        return Ok(Some(preferred));
    }
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().is_some_and(|ext| ext == ANIMATION_EXTENSION)
        })
        .collect();
    candidates.sort();
    Ok(candidates.into_iter().next())
}

impl AnimationSource for DirectoryLibrary {
    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn channel_name(&self, channel: u32) -> Option<&str> {
        self.resolve(channel).ok().map(|(name, _)| name.as_str())
    }

    fn open(&self, channel: u32) -> Result<Box<dyn FrameStream>> {
        let (_, path) = self.resolve(channel)?;
        Ok(Box::new(AnimationReader::open(path)?))
    }
}

/// In-memory library of encoded animations.
///
/// Animations are stored in their binary form, so playback goes through
/// the same streaming reader as on disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryLibrary {
    channels: Vec<(String, Vec<u8>)>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, animation: &Animation) -> Result<()> {
        let mut cursor = Cursor::new(Vec::new());
        write_animation(animation, &mut cursor, CompressionType::None)?;
        self.channels
            .push((animation.label.clone(), cursor.into_inner()));
        Ok(())
    }

    /// Store raw bytes as a channel, valid or not.
    pub fn push_raw(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.channels.push((name.into(), bytes));
    }
}

impl AnimationSource for MemoryLibrary {
    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn channel_name(&self, channel: u32) -> Option<&str> {
        if self.channels.is_empty() {
            return None;
        }
        let (name, _) = &self.channels[channel as usize % self.channels.len()];
        Some(name)
    }

    fn open(&self, channel: u32) -> Result<Box<dyn FrameStream>> {
        if self.channels.is_empty() {
            return Err(Error::ChannelUnavailable(channel));
        }
        let (_, bytes) = &self.channels[channel as usize % self.channels.len()];
        Ok(Box::new(AnimationReader::new(Cursor::new(bytes.clone()))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::save_animation;
    use crate::delta::ChangeEntry;
    use tempfile::tempdir;

    fn animation(label: &str, frames: usize) -> Animation {
        let mut animation = Animation::new(label, 2, 2);
        animation.frames = (0..frames)
            .map(|i| vec![ChangeEntry::new(0, i as u8, 0, 0)])
            .collect();
        animation
    }

    fn save_into(root: &Path, animation: &Animation) {
        let dir = root.join(&animation.label);
        fs::create_dir_all(&dir).unwrap();
        save_animation(
            dir.join(format!("{}.tvha", animation.label)),
            animation,
            CompressionType::None,
        )
        .unwrap();
    }

    #[test]
    fn test_directory_scan() {
        let root = tempdir().unwrap();
        save_into(root.path(), &animation("zebra", 2));
        save_into(root.path(), &animation("apple", 3));
        fs::create_dir(root.path().join("empty")).unwrap();
        fs::write(root.path().join("stray.tvha"), b"ignored").unwrap();

        let library = DirectoryLibrary::scan(root.path()).unwrap();
        assert_eq!(library.channel_count(), 2);
        assert_eq!(
            library.channel_names().collect::<Vec<_>>(),
            vec!["apple", "zebra"]
        );
        assert_eq!(library.channel_name(1), Some("zebra"));
        // Channels wrap.
        assert_eq!(library.channel_name(2), Some("apple"));

        let mut stream = library.open(0).unwrap();
        assert_eq!(stream.dimensions(), (2, 2));
        let mut changes = Vec::new();
        let mut frames = 0;
        while stream.next_frame_into(&mut changes).unwrap() {
            frames += 1;
        }
        assert_eq!(frames, 3);
    }

    #[test]
    fn test_fallback_file_name() {
        let root = tempdir().unwrap();
        let dir = root.path().join("blink");
        fs::create_dir(&dir).unwrap();
        save_animation(dir.join("other.tvha"), &animation("x", 1), CompressionType::None)
            .unwrap();

        let library = DirectoryLibrary::scan(root.path()).unwrap();
        assert_eq!(library.channel_name(0), Some("blink"));
        assert!(library.open(0).is_ok());
    }

    #[test]
    fn test_empty_library() {
        let root = tempdir().unwrap();
        let library = DirectoryLibrary::scan(root.path()).unwrap();
        assert!(matches!(library.open(0), Err(Error::ChannelUnavailable(0))));
        assert!(MemoryLibrary::new().open(4).is_err());
    }

    #[test]
    fn test_memory_library() {
        let mut library = MemoryLibrary::new();
        library.push(&animation("a", 1)).unwrap();
        library.push(&animation("b", 4)).unwrap();
        library.push_raw("broken", b"nope".to_vec());

        assert_eq!(library.channel_count(), 3);
        assert_eq!(library.channel_name(4), Some("b"));
        assert!(library.open(1).is_ok());
        assert!(matches!(library.open(2), Err(Error::Io(_))));
    }
}
