//! Image quality tiers and output formats.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Fixed compression settings of a quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QualitySettings {
    /// Longest side of an output image, in pixels
    pub max_dimension: u32,
    /// JPEG quality, 1-100
    pub jpeg_quality: u8,
    /// Density written to the JPEG header
    pub dpi: u16,
}

/// Image quality tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Quality {
    /// 1500 px, quality 90, 200 dpi
    High,
    /// 1024 px, quality 85, 150 dpi
    #[default]
    Medium,
    /// 768 px, quality 75, 100 dpi
    Low,
}

impl Quality {
    /// All tiers, best first.
    pub const ALL: [Quality; 3] = [Quality::High, Quality::Medium, Quality::Low];

    /// Compression settings of this tier.
    pub const fn settings(self) -> QualitySettings {
        match self {
            Quality::High => QualitySettings {
                max_dimension: 1500,
                jpeg_quality: 90,
                dpi: 200,
            },
            Quality::Medium => QualitySettings {
                max_dimension: 1024,
                jpeg_quality: 85,
                dpi: 150,
            },
            Quality::Low => QualitySettings {
                max_dimension: 768,
                jpeg_quality: 75,
                dpi: 100,
            },
        }
    }

    /// Lowercase tier name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Quality::High => "high",
            Quality::Medium => "medium",
            Quality::Low => "low",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Quality::High),
            "medium" => Ok(Quality::Medium),
            "low" => Ok(Quality::Low),
            _ => Err(Error::InvalidQuality(s.to_string())),
        }
    }
}

impl TryFrom<String> for Quality {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Encoding of extracted image files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ImageFormat {
    /// Lossy JPEG at the tier's quality
    #[default]
    Jpeg,
    /// Lossless PNG, resized only
    Png,
}

impl ImageFormat {
    /// File extension without the dot.
    pub const fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            _ => Err(Error::InvalidImageFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for ImageFormat {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ImageFormat> for String {
    fn from(format: ImageFormat) -> Self {
        format.extension().to_string()
    }
}
