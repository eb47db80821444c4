//! Source folders: ordered image files decoded into frames.

use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageFormat, ImageReader};
use log::{debug, warn};

use crate::delta::{Animation, DeltaEncoder};
use crate::error::{Error, Result};
use crate::geometry::{Frame, Geometry};

/// True when the file extension names a format this build can decode.
pub fn is_image(path: &Path) -> bool {
    ImageFormat::from_path(path).is_ok_and(|format| format.reading_enabled())
}

/// Image files of `folder` in lexicographic file name order.
///
/// Hidden files, directories and anything that is not a decodable image
/// format are ignored.
pub fn list_images(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden || !entry.file_type()?.is_file() {
            continue;
        }
        if is_image(&path) {
            images.push(path);
        } else {
            debug!("Ignoring non-image file {}", path.display());
        }
    }
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(images)
}

/// Decode one image as 8-bit RGB.
pub fn load_frame(path: &Path) -> Result<Frame> {
    let load_failure = |reason: String| Error::LoadFailure {
        path: path.to_path_buf(),
        reason,
    };
    let image = ImageReader::open(path)
        .map_err(|e| load_failure(e.to_string()))?
        .decode()
        .map_err(|e| load_failure(e.to_string()))?
        .to_rgb8();
    Ok(Frame::from_image(&image))
}

/// Decode, map and delta-encode every image of `folder`.
///
/// Frames are encoded as they are decoded, so only the previous frame is
/// held in memory. Images that fail to decode are skipped with a warning.
/// A folder without a single usable image is [`Error::EmptySequence`].
pub fn encode_folder(folder: &Path, label: &str, geometry: &Geometry) -> Result<Animation> {
    let mut animation = Animation::new(label, geometry.width() as u16, geometry.height() as u16);
    let mut encoder = DeltaEncoder::new(geometry.width(), geometry.height());
    let mut skipped = 0usize;

    for path in list_images(folder)? {
        let frame = match load_frame(&path) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("{}", e);
                skipped += 1;
                continue;
            }
        };
        animation.frames.push(encoder.push(&geometry.map(&frame))?);
    }

    if animation.frames.is_empty() {
        return Err(Error::EmptySequence {
            folder: folder.to_path_buf(),
        });
    }

    debug!(
        "{}: encoded {} frames, skipped {}",
        label,
        animation.frame_count(),
        skipped
    );
    Ok(animation)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::geometry::{Flip, Pixel, Rotation};
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    /// Write a solid-color PNG.
    pub(crate) fn write_png(path: &Path, width: u32, height: u32, color: [u8; 3]) {
        RgbImage::from_pixel(width, height, Rgb(color))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_list_images_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        write_png(&dir.path().join("frame_10.png"), 2, 2, [1, 1, 1]);
        write_png(&dir.path().join("frame_02.png"), 2, 2, [1, 1, 1]);
        write_png(&dir.path().join(".hidden.png"), 2, 2, [1, 1, 1]);
        fs::write(dir.path().join("notes.txt"), "not an image").unwrap();
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        let names: Vec<_> = list_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["frame_02.png", "frame_10.png"]);
    }

    #[test]
    fn test_load_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"definitely not a png").unwrap();
        assert!(matches!(load_frame(&path), Err(Error::LoadFailure { .. })));
    }

    #[test]
    fn test_encode_folder_skips_bad_images() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("00.png"), b"garbage").unwrap();
        write_png(&dir.path().join("01.png"), 4, 2, [10, 20, 30]);
        write_png(&dir.path().join("02.png"), 4, 2, [10, 20, 30]);

        let geometry = Geometry::new(4, 2, Rotation::None, Flip::None);
        let animation = encode_folder(dir.path(), "solid", &geometry).unwrap();

        assert_eq!(animation.frame_count(), 2);
        assert_eq!(animation.frames[0].len(), 8);
        // Identical second frame keeps its tick.
        assert_eq!(animation.frames[1].len(), 1);
        assert_eq!(animation.replay()[1], vec![Pixel::new(10, 20, 30); 8]);
    }

    #[test]
    fn test_encode_folder_resizes() {
        let dir = tempdir().unwrap();
        write_png(&dir.path().join("big.png"), 32, 20, [0, 0, 200]);

        let geometry = Geometry::new(4, 2, Rotation::Rotate90, Flip::None);
        let animation = encode_folder(dir.path(), "big", &geometry).unwrap();
        assert_eq!((animation.width, animation.height), (4, 2));
        assert_eq!(animation.frames[0].len(), 8);
    }

    #[test]
    fn test_empty_sequence() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("readme.md"), "# nothing").unwrap();
        fs::write(dir.path().join("bad.png"), b"garbage").unwrap();

        let geometry = Geometry::new(2, 2, Rotation::None, Flip::None);
        assert!(matches!(
            encode_folder(dir.path(), "empty", &geometry),
            Err(Error::EmptySequence { .. })
        ));
    }
}
