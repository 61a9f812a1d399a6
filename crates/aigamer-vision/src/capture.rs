//! Window capture for the game loop.
//!
//! This module provides:
//! - `GameWindow`, the platform-neutral handle for a located window
//! - `Screenshot` with downscaling, encoding and base64 helpers
//! - The `ScreenCapture` trait with an xcap-backed implementation
//! - A static capture source for tests and headless builds

use crate::config::{CaptureSettings, ImageFormat};
use async_trait::async_trait;
use image::DynamicImage;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur during screen capture.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Screen capture not available on this platform")]
    NotAvailable,

    #[error("Failed to capture window: {0}")]
    CaptureFailed(String),

    #[error("Window not found: {0}")]
    WindowNotFound(String),

    #[error("Invalid window region: {0}")]
    InvalidRegion(String),

    #[error("Image encoding failed: {0}")]
    EncodingFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// A rectangular region on the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check if this region has positive dimensions.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// A window the game is believed to run in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameWindow {
    /// Platform window id (HWND on Windows, X11 window id on Linux)
    pub id: u64,
    /// Window title
    pub title: String,
    /// Owning application name as reported by the window system
    pub app_name: String,
    /// Owning process id, 0 when unknown
    pub pid: u32,
    /// Window bounds
    pub region: Region,
    /// Whether the window is minimized
    pub is_minimized: bool,
}

impl GameWindow {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            app_name: String::new(),
            pid: 0,
            region: Region::default(),
            is_minimized: false,
        }
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn minimized(mut self) -> Self {
        self.is_minimized = true;
        self
    }
}

/// A captured frame of the game window.
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// The captured image
    pub image: DynamicImage,
    /// Region that was captured
    pub region: Region,
    /// Timestamp of capture (Unix milliseconds)
    pub timestamp: i64,
    /// Window title the frame came from
    pub source: String,
}

impl Screenshot {
    pub fn new(image: DynamicImage, region: Region, source: impl Into<String>) -> Self {
        Self {
            image,
            region,
            timestamp: chrono::Utc::now().timestamp_millis(),
            source: source.into(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Dimensions after applying the `max_dimension` ceiling.
    ///
    /// The longer side becomes `max_dimension`; the other side is scaled by
    /// the same factor and truncated.
    pub fn scaled_dimensions(&self, max_dimension: u32) -> (u32, u32) {
        let (width, height) = (self.width(), self.height());
        if max_dimension == 0 || (width <= max_dimension && height <= max_dimension) {
            return (width, height);
        }

        if width > height {
            let scaled = (height as u64 * max_dimension as u64 / width as u64) as u32;
            (max_dimension, scaled.max(1))
        } else {
            let scaled = (width as u64 * max_dimension as u64 / height as u64) as u32;
            (scaled.max(1), max_dimension)
        }
    }

    /// Encode the screenshot to bytes, downscaling first if needed.
    pub fn encode(&self, settings: &CaptureSettings) -> CaptureResult<Vec<u8>> {
        let (width, height) = self.scaled_dimensions(settings.max_dimension);
        let image = if (width, height) != (self.width(), self.height()) {
            debug!(
                "Downscaling frame from {}x{} to {}x{}",
                self.width(),
                self.height(),
                width,
                height
            );
            self.image
                .resize_exact(width, height, image::imageops::FilterType::CatmullRom)
        } else {
            self.image.clone()
        };

        let mut buffer = Cursor::new(Vec::new());
        match settings.format {
            ImageFormat::Png => {
                image
                    .write_to(&mut buffer, image::ImageFormat::Png)
                    .map_err(|e| CaptureError::EncodingFailed(e.to_string()))?;
            }
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel
                let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                    &mut buffer,
                    settings.jpeg_quality,
                );
                DynamicImage::ImageRgb8(image.to_rgb8())
                    .write_with_encoder(encoder)
                    .map_err(|e| CaptureError::EncodingFailed(e.to_string()))?;
            }
        }

        Ok(buffer.into_inner())
    }

    /// Encode to base64 for API transmission.
    pub fn to_base64(&self, settings: &CaptureSettings) -> CaptureResult<String> {
        let bytes = self.encode(settings)?;
        Ok(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            &bytes,
        ))
    }

    /// Write the frame as `<prefix>_image_input_<yyyyMMddHHmmss>.png` under `dir`.
    pub fn save_debug_copy(&self, dir: &Path, prefix: &str) -> CaptureResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
        let path = dir.join(format!("{}_image_input_{}.png", prefix, stamp));
        self.image
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| CaptureError::EncodingFailed(e.to_string()))?;
        Ok(path)
    }
}

/// Save a debug copy if enabled, warning instead of failing.
pub fn save_debug_frame(screenshot: &Screenshot, settings: &CaptureSettings, prefix: &str) {
    if !settings.save_debug_images {
        return;
    }
    match screenshot.save_debug_copy(&settings.debug_image_dir, prefix) {
        Ok(path) => debug!("Saved debug frame to {}", path.display()),
        Err(e) => warn!("Could not save debug frame: {}", e),
    }
}

/// Source of window frames.
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    /// Check if screen capture is available on this platform.
    fn is_available(&self) -> bool;

    /// Capture the current pixels of a window, sized to its bounds.
    async fn capture_window(&self, window: &GameWindow) -> CaptureResult<Screenshot>;
}

/// Platform-specific screen capture implementation using xcap.
#[cfg(feature = "gui-automation")]
pub mod platform {
    use super::*;

    /// Cross-platform window capture using xcap.
    #[derive(Debug, Default)]
    pub struct XcapCapture;

    impl XcapCapture {
        pub fn new() -> Self {
            Self
        }

        fn find_window(id: u64) -> CaptureResult<xcap::Window> {
            let windows =
                xcap::Window::all().map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
            windows
                .into_iter()
                .find(|w| w.id().map(|wid| wid as u64 == id).unwrap_or(false))
                .ok_or_else(|| CaptureError::WindowNotFound(format!("ID: {}", id)))
        }
    }

    #[async_trait]
    impl ScreenCapture for XcapCapture {
        fn is_available(&self) -> bool {
            xcap::Window::all().is_ok()
        }

        async fn capture_window(&self, window: &GameWindow) -> CaptureResult<Screenshot> {
            let target = Self::find_window(window.id)?;

            let region = match (target.x(), target.y(), target.width(), target.height()) {
                (Ok(x), Ok(y), Ok(width), Ok(height)) => Region::new(x, y, width, height),
                _ => {
                    return Err(CaptureError::InvalidRegion(format!(
                        "could not read bounds of '{}'",
                        window.title
                    )))
                }
            };
            if !region.is_valid() {
                return Err(CaptureError::InvalidRegion(format!(
                    "'{}' has empty bounds {}x{}",
                    window.title, region.width, region.height
                )));
            }

            let capture = target
                .capture_image()
                .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
            debug!(
                "Captured '{}' at {}x{}",
                window.title,
                capture.width(),
                capture.height()
            );

            Ok(Screenshot::new(
                DynamicImage::ImageRgba8(capture),
                region,
                window.title.clone(),
            ))
        }
    }
}

/// Create the default screen capture implementation for the current platform.
#[cfg(feature = "gui-automation")]
pub fn create_screen_capture() -> Box<dyn ScreenCapture> {
    Box::new(platform::XcapCapture::new())
}

#[cfg(not(feature = "gui-automation"))]
pub fn create_screen_capture() -> Box<dyn ScreenCapture> {
    Box::new(mock::StaticCapture::unavailable())
}

/// Static capture source for tests or when gui-automation is disabled.
pub mod mock {
    use super::*;

    /// Returns the same frame on every call, or `NotAvailable` when empty.
    #[derive(Debug)]
    pub struct StaticCapture {
        frame: Option<DynamicImage>,
        calls: AtomicUsize,
    }

    impl StaticCapture {
        pub fn new(frame: DynamicImage) -> Self {
            Self {
                frame: Some(frame),
                calls: AtomicUsize::new(0),
            }
        }

        /// A blank frame of the given size.
        pub fn blank(width: u32, height: u32) -> Self {
            Self::new(DynamicImage::new_rgba8(width, height))
        }

        pub fn unavailable() -> Self {
            Self {
                frame: None,
                calls: AtomicUsize::new(0),
            }
        }

        /// Number of capture requests served so far.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ScreenCapture for StaticCapture {
        fn is_available(&self) -> bool {
            self.frame.is_some()
        }

        async fn capture_window(&self, window: &GameWindow) -> CaptureResult<Screenshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let frame = self.frame.clone().ok_or(CaptureError::NotAvailable)?;
            let region = Region::new(0, 0, frame.width(), frame.height());
            Ok(Screenshot::new(frame, region, window.title.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot(width: u32, height: u32) -> Screenshot {
        Screenshot::new(
            DynamicImage::new_rgba8(width, height),
            Region::new(0, 0, width, height),
            "test",
        )
    }

    #[test]
    fn test_region_valid() {
        assert!(Region::new(0, 0, 100, 100).is_valid());
        assert!(!Region::new(0, 0, 0, 100).is_valid());
        assert!(!Region::new(0, 0, 100, 0).is_valid());
    }

    #[test]
    fn test_scaled_dimensions_wide_frame() {
        assert_eq!(shot(3200, 1000).scaled_dimensions(1600), (1600, 500));
    }

    #[test]
    fn test_scaled_dimensions_tall_and_square_frames() {
        assert_eq!(shot(1000, 3200).scaled_dimensions(1600), (500, 1600));
        assert_eq!(shot(2000, 2000).scaled_dimensions(1600), (1600, 1600));
    }

    #[test]
    fn test_small_frame_is_untouched() {
        assert_eq!(shot(1600, 900).scaled_dimensions(1600), (1600, 900));
        assert_eq!(shot(640, 480).scaled_dimensions(1600), (640, 480));
    }

    #[test]
    fn test_encode_png_downscales() {
        let bytes = shot(2400, 1200).encode(&CaptureSettings::default()).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1600, 800));
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_encode_jpeg() {
        let settings = CaptureSettings {
            format: ImageFormat::Jpeg,
            ..Default::default()
        };
        let bytes = shot(64, 32).encode(&settings).unwrap();
        // JPEG SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_to_base64_is_png_payload() {
        let encoded = shot(10, 10).to_base64(&CaptureSettings::default()).unwrap();
        // base64 of the PNG signature
        assert!(encoded.starts_with("iVBORw0KGgo"));
    }

    #[test]
    fn test_save_debug_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = shot(8, 8).save_debug_copy(dir.path(), "ollama").unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("ollama_image_input_"));
        assert!(name.ends_with(".png"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_static_capture() {
        let capture = mock::StaticCapture::blank(320, 200);
        let window = GameWindow::new(7, "Warsim");
        let frame = capture.capture_window(&window).await.unwrap();
        assert_eq!((frame.width(), frame.height()), (320, 200));
        assert_eq!(frame.source, "Warsim");
        assert_eq!(capture.calls(), 1);
    }

    #[test]
    fn test_unavailable_capture() {
        let capture = mock::StaticCapture::unavailable();
        let window = GameWindow::new(7, "Warsim");
        assert!(!capture.is_available());
        assert!(matches!(
            tokio_test::block_on(capture.capture_window(&window)),
            Err(CaptureError::NotAvailable)
        ));
    }
}
