//! Batch conversion of an images root into per-animation artifacts.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use rayon::prelude::*;

use super::source::encode_folder;
use crate::animation::{
    ANIMATION_EXTENSION, DOCUMENT_EXTENSION, save_animation, save_document,
};
use crate::delta::{Animation, DeltaStats};
use crate::error::Result;
use crate::geometry::Geometry;
use crate::schema::ConverterConfig;

/// Result of converting one folder.
#[derive(Debug)]
pub struct FolderOutcome {
    pub label: String,
    pub folder: PathBuf,
    pub result: Result<ConvertedAnimation>,
}

impl FolderOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Artifacts written for one animation.
#[derive(Debug, Clone)]
pub struct ConvertedAnimation {
    pub binary: PathBuf,
    pub document: Option<PathBuf>,
    pub stats: DeltaStats,
}

/// Per-folder results of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    /// One outcome per folder, in folder name order.
    pub outcomes: Vec<FolderOutcome>,
}

impl BatchReport {
    fn from_outcomes(outcomes: Vec<FolderOutcome>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            succeeded,
            failed: outcomes.len() - succeeded,
            outcomes,
        }
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "processed {}/{} folders", self.succeeded, self.total())?;
        for outcome in &self.outcomes {
            match &outcome.result {
                Ok(converted) => writeln!(f, "  ok     {}: {}", outcome.label, converted.stats)?,
                Err(e) => writeln!(f, "  failed {}: {}", outcome.label, e)?,
            }
        }
        Ok(())
    }
}

/// Desktop converter: images root in, one artifact directory per animation
/// out.
pub struct Converter {
    config: ConverterConfig,
    geometry: Geometry,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Result<Self> {
        config.validate()?;
        let geometry = Geometry::from_display(&config.display);
        Ok(Self { config, geometry })
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert one source folder into `<output_root>/<label>/<label>.tvha`
    /// (plus the JSON document when enabled).
    pub fn convert_folder(&self, folder: &Path, output_root: &Path) -> FolderOutcome {
        let label = folder_label(folder);
        let result = encode_folder(folder, &label, &self.geometry)
            .and_then(|animation| self.write_artifacts(&animation, output_root));

        match &result {
            Ok(converted) => info!("{}: {}", label, converted.stats),
            Err(e) => warn!("{}: conversion failed: {}", label, e),
        }

        FolderOutcome {
            label,
            folder: folder.to_path_buf(),
            result,
        }
    }

    /// Convert every subfolder of `images_root`, one worker per folder.
    ///
    /// A failing folder never aborts the batch.
    pub fn convert_all(&self, images_root: &Path, output_root: &Path) -> Result<BatchReport> {
        let folders = list_folders(images_root)?;
        fs::create_dir_all(output_root)?;

        let outcomes: Vec<FolderOutcome> = folders
            .par_iter()
            .map(|folder| self.convert_folder(folder, output_root))
            .collect();

        let report = BatchReport::from_outcomes(outcomes);
        info!("processed {}/{} folders", report.succeeded, report.total());
        Ok(report)
    }

    fn write_artifacts(
        &self,
        animation: &Animation,
        output_root: &Path,
    ) -> Result<ConvertedAnimation> {
        let dir = output_root.join(&animation.label);
        let binary = dir.join(format!("{}.{}", animation.label, ANIMATION_EXTENSION));
        let document = self
            .config
            .write_document
            .then(|| dir.join(format!("{}.{}", animation.label, DOCUMENT_EXTENSION)));

        self.config.retry.run(&animation.label, |_| {
            fs::create_dir_all(&dir)?;
            save_animation(&binary, animation, self.config.compression)?;
            if let Some(document) = &document {
                save_document(document, animation)?;
            }
            Ok(())
        })?;

        Ok(ConvertedAnimation {
            binary,
            document,
            stats: animation.stats(),
        })
    }
}

/// Name of the folder, used as the animation label.
fn folder_label(folder: &Path) -> String {
    folder
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "animation".to_string())
}

/// Non-hidden subdirectories of `root`, sorted by name.
pub fn list_folders(root: &Path) -> Result<Vec<PathBuf>> {
    let mut folders = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() && !entry.file_name().to_string_lossy().starts_with('.') {
            folders.push(entry.path());
        }
    }
    folders.sort();
    Ok(folders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{load_animation, load_document};
    use crate::error::Error;
    use crate::pipeline::source::tests::write_png;
    use crate::schema::DisplayConfig;
    use tempfile::tempdir;

    fn config() -> ConverterConfig {
        ConverterConfig {
            display: DisplayConfig {
                width: 4,
                height: 2,
                ..DisplayConfig::default()
            },
            ..ConverterConfig::default()
        }
    }

    #[test]
    fn test_convert_all() {
        let images = tempdir().unwrap();
        let output = tempdir().unwrap();

        let eye = images.path().join("eye");
        fs::create_dir(&eye).unwrap();
        write_png(&eye.join("0.png"), 4, 2, [255, 0, 0]);
        write_png(&eye.join("1.png"), 4, 2, [0, 255, 0]);

        let empty = images.path().join("empty");
        fs::create_dir(&empty).unwrap();
        fs::write(empty.join("notes.txt"), "no frames here").unwrap();

        let converter = Converter::new(config()).unwrap();
        let report = converter.convert_all(images.path(), output.path()).unwrap();

        assert_eq!(report.total(), 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        // Sorted by folder name.
        assert_eq!(report.outcomes[0].label, "empty");
        assert!(matches!(
            report.outcomes[0].result,
            Err(Error::EmptySequence { .. })
        ));
        assert!(report.to_string().starts_with("processed 1/2 folders"));

        let binary = output.path().join("eye").join("eye.tvha");
        let animation = load_animation(&binary).unwrap();
        assert_eq!(animation.label, "eye");
        assert_eq!(animation.frame_count(), 2);

        let document = output.path().join("eye").join("eye.json");
        assert_eq!(load_document(&document).unwrap(), animation);
    }

    #[test]
    fn test_document_optional() {
        let images = tempdir().unwrap();
        let output = tempdir().unwrap();
        let blink = images.path().join("blink");
        fs::create_dir(&blink).unwrap();
        write_png(&blink.join("a.png"), 4, 2, [9, 9, 9]);

        let converter = Converter::new(ConverterConfig {
            write_document: false,
            ..config()
        })
        .unwrap();
        let outcome = converter.convert_folder(&blink, output.path());
        let converted = outcome.result.unwrap();
        assert!(converted.binary.exists());
        assert!(converted.document.is_none());
        assert!(!output.path().join("blink").join("blink.json").exists());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = config();
        config.display.width = 0;
        assert!(matches!(Converter::new(config), Err(Error::Config(_))));
    }
}
