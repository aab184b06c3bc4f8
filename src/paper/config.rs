//! Parser configuration.

use std::path::{Path, PathBuf};

use md5::{Digest, Md5};

use crate::extract::text::{DEFAULT_PAGE_SEPARATOR, DEFAULT_PREVIEW_CHARS};
use crate::extract::{ImageFormat, Quality};
use crate::render::CleanupPreset;

/// Name of the directory under the system temp dir that holds default
/// image output.
const DEFAULT_OUTPUT_ROOT: &str = "parse_paper";

/// Defaults applied when a request leaves a parameter out.
#[derive(Debug, Clone)]
pub struct PaperConfig {
    /// Image directory; `None` means `<temp>/parse_paper/<pdf stem>-<path hash>`
    pub output_dir: Option<PathBuf>,

    /// Image compression tier
    pub quality: Quality,

    /// Output image encoding
    pub image_format: ImageFormat,

    /// Separator placed between pages of extracted text
    pub page_separator: String,

    /// Text cleanup applied to each page
    pub cleanup: CleanupPreset,

    /// Characters of text returned when the full text is saved to a file
    pub preview_chars: usize,
}

impl PaperConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default image output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Set the default quality tier.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Set the default image format.
    pub fn with_image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self
    }

    /// Set the page separator.
    pub fn with_page_separator(mut self, separator: impl Into<String>) -> Self {
        self.page_separator = separator.into();
        self
    }

    /// Set the cleanup preset.
    pub fn with_cleanup_preset(mut self, preset: CleanupPreset) -> Self {
        self.cleanup = preset;
        self
    }

    /// Set the preview length used with `save_to`.
    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars;
        self
    }

    /// Output directory for a document when the request names none.
    ///
    /// Keyed on the canonical path of the PDF: reruns on the same file
    /// overwrite earlier output, other files never share a directory.
    pub fn output_dir_for(&self, pdf_path: &Path) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => default_output_dir(&std::env::temp_dir(), pdf_path),
        }
    }
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            quality: Quality::default(),
            image_format: ImageFormat::default(),
            page_separator: DEFAULT_PAGE_SEPARATOR.to_string(),
            cleanup: CleanupPreset::default(),
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

fn default_output_dir(temp: &Path, pdf_path: &Path) -> PathBuf {
    let canonical = std::fs::canonicalize(pdf_path).unwrap_or_else(|_| pdf_path.to_path_buf());
    let stem = canonical
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    temp.join(DEFAULT_OUTPUT_ROOT)
        .join(format!("{}-{}", stem, path_hash(&canonical)))
}

/// First 8 hex digits of the MD5 of a path.
fn path_hash(path: &Path) -> String {
    let digest = Md5::digest(path.to_string_lossy().as_bytes());
    digest[..4].iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = PaperConfig::new()
            .with_output_dir("/tmp/out")
            .with_quality(Quality::Low)
            .with_image_format(ImageFormat::Png)
            .with_page_separator("\n\n")
            .with_cleanup_preset(CleanupPreset::Minimal)
            .with_preview_chars(100);

        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(config.quality, Quality::Low);
        assert_eq!(config.image_format, ImageFormat::Png);
        assert_eq!(config.page_separator, "\n\n");
        assert_eq!(config.cleanup, CleanupPreset::Minimal);
        assert_eq!(config.preview_chars, 100);
    }

    #[test]
    fn test_default_output_dir_is_stable_per_file() {
        let config = PaperConfig::default();
        let a = config.output_dir_for(Path::new("/papers/attention.pdf"));
        assert_eq!(a, config.output_dir_for(Path::new("/papers/attention.pdf")));
        assert_eq!(a.parent().unwrap().file_name().unwrap(), "parse_paper");

        let name = a.file_name().unwrap().to_string_lossy().into_owned();
        let (stem, hash) = name.rsplit_once('-').unwrap();
        assert_eq!(stem, "attention");
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_same_stem_in_different_dirs_gets_own_output() {
        let config = PaperConfig::default();
        let a = config.output_dir_for(Path::new("/a/paper.pdf"));
        let b = config.output_dir_for(Path::new("/b/paper.pdf"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_relative_and_absolute_paths_share_output() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("paper.pdf");
        std::fs::write(&pdf, b"%PDF-1.5\n").unwrap();
        let config = PaperConfig::default();
        let via_dot = dir.path().join(".").join("paper.pdf");
        assert_eq!(config.output_dir_for(&pdf), config.output_dir_for(&via_dot));
    }

    #[test]
    fn test_configured_output_dir_wins() {
        let config = PaperConfig::new().with_output_dir("/data/images");
        assert_eq!(
            config.output_dir_for(Path::new("x.pdf")),
            PathBuf::from("/data/images")
        );
    }
}
