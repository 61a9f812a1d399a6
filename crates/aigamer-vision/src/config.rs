//! Capture configuration.
//!
//! Settings are bound from the `Capture` table of the application config,
//! which uses PascalCase keys.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Image format for frames sent to vision models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless)
    #[default]
    #[serde(alias = "Png", alias = "PNG")]
    Png,
    /// JPEG format (lossy, smaller payloads)
    #[serde(alias = "Jpeg", alias = "JPEG", alias = "jpg")]
    Jpeg,
}

impl ImageFormat {
    /// Get the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    /// Get the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// Capture and encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CaptureSettings {
    /// Image format for encoded frames
    pub format: ImageFormat,
    /// JPEG quality (1-100), only used for JPEG format
    pub jpeg_quality: u8,
    /// Maximum image dimension (width or height).
    /// Larger frames are scaled down preserving aspect ratio.
    pub max_dimension: u32,
    /// Write every captured frame to disk for inspection
    pub save_debug_images: bool,
    /// Directory for debug frames
    pub debug_image_dir: PathBuf,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            format: ImageFormat::Png,
            jpeg_quality: 85,
            max_dimension: 1600,
            save_debug_images: false,
            debug_image_dir: PathBuf::from("."),
        }
    }
}
