//! Manual-completion fallback.
//!
//! When every attempt fails, the user still gets the screenshot: the
//! [`FallbackPresenter`] receives the file (when it decoded) and the
//! original image data, and offers a manual path such as a download.
//! The engine calls it at most once per capture.

// ============================================================================
// Imports
// ============================================================================

use std::io::{Error as IoError, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::info;

use crate::capture::{CaptureFile, DataUrl};
use crate::error::Result;
use crate::identifiers::CaptureId;
use crate::platform::PlatformKey;

// ============================================================================
// FallbackRequest
// ============================================================================

/// Everything the presenter needs to offer manual completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackRequest {
    /// Capture this belongs to.
    pub capture_id: CaptureId,
    /// Decoded file; `None` if the payload could not be decoded.
    pub file: Option<CaptureFile>,
    /// Target platform.
    pub platform: PlatformKey,
    /// The original `data:` URL.
    pub image_data: String,
}

// ============================================================================
// FallbackPresenter
// ============================================================================

/// Offers the user a manual way to finish the upload.
///
/// Cleanup after the user dismisses the offer is the presenter's business.
#[async_trait]
pub trait FallbackPresenter: Send + Sync {
    /// Presents the fallback for one exhausted capture.
    async fn present(&self, request: FallbackRequest) -> Result<()>;
}

// ============================================================================
// DownloadFallback
// ============================================================================

/// Saves the screenshot into a directory, like a browser download.
///
/// Writes go through a temporary file in the same directory and are renamed
/// into place, so a partial file is never visible.
#[derive(Debug, Clone)]
pub struct DownloadFallback {
    dir: PathBuf,
    file_name: String,
}

impl DownloadFallback {
    /// Default name of the saved file.
    pub const DEFAULT_FILE_NAME: &'static str = "screenshot.png";

    /// Saves into `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            file_name: Self::DEFAULT_FILE_NAME.to_string(),
        }
    }

    /// Overrides the saved file name.
    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Where the download lands.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

#[async_trait]
impl FallbackPresenter for DownloadFallback {
    async fn present(&self, request: FallbackRequest) -> Result<()> {
        let bytes = match &request.file {
            Some(file) => file.bytes().to_vec(),
            None => DataUrl::parse(&request.image_data)?.bytes,
        };

        let dir = self.dir.clone();
        let target = self.path();
        let written = target.clone();
        tokio::task::spawn_blocking(move || write_atomic(&dir, &target, &bytes))
            .await
            .map_err(IoError::other)??;

        info!(
            capture_id = %request.capture_id,
            platform = %request.platform,
            path = %written.display(),
            "Saved screenshot for manual upload"
        );
        Ok(())
    }
}

fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::capture::file::{sample_data_url, sample_png};

    fn request(file: Option<CaptureFile>, image_data: String) -> FallbackRequest {
        FallbackRequest {
            capture_id: CaptureId::generate(),
            file,
            platform: PlatformKey::Qwen,
            image_data,
        }
    }

    #[tokio::test]
    async fn test_download_writes_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = DownloadFallback::new(dir.path());
        let file = CaptureFile::new("a.png", "image/png", vec![7u8; 32]);

        fallback.present(request(Some(file), String::new())).await.unwrap();
        assert_eq!(std::fs::read(fallback.path()).unwrap(), vec![7u8; 32]);
        assert!(fallback.path().ends_with("screenshot.png"));
    }

    #[tokio::test]
    async fn test_download_decodes_image_data_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = DownloadFallback::new(dir.path()).with_file_name("manual.png");

        fallback
            .present(request(None, sample_data_url(2, 2)))
            .await
            .unwrap();
        assert_eq!(std::fs::read(dir.path().join("manual.png")).unwrap(), sample_png(2, 2));
    }

    #[tokio::test]
    async fn test_download_overwrites_previous() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = DownloadFallback::new(dir.path());
        for byte in [1u8, 2] {
            let file = CaptureFile::new("a.png", "image/png", vec![byte; 4]);
            fallback.present(request(Some(file), String::new())).await.unwrap();
        }
        assert_eq!(std::fs::read(fallback.path()).unwrap(), vec![2u8; 4]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_download_fails_on_garbage_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = DownloadFallback::new(dir.path());
        assert!(fallback.present(request(None, "garbage".into())).await.is_err());
        assert!(!fallback.path().exists());
    }
}
