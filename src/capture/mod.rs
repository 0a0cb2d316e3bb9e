//! Capture input.
//!
//! A [`CaptureRequest`] is what the engine receives: the screenshot as a
//! self-describing `data:` URL plus the target platform. It is consumed once.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `file` | [`CaptureFile`], [`ImageFormat`], [`DataUrl`] |
//! | `record` | [`ScreenshotRecord`], [`PendingStore`], [`PendingRecord`] |

// ============================================================================
// Submodules
// ============================================================================

/// Decoded image file.
pub mod file;

/// Pending-record storage.
pub mod record;

// ============================================================================
// Re-exports
// ============================================================================

pub use file::{CaptureFile, DEFAULT_FILE_NAME, DataUrl, ImageFormat};
pub use record::{MemoryStore, PendingRecord, PendingStore, ScreenshotRecord, now_ms};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::platform::PlatformKey;

// ============================================================================
// CaptureRequest
// ============================================================================

/// One screenshot to deliver to one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    /// Image payload as a `data:` URL.
    pub image_data: String,
    /// Target platform.
    pub platform: PlatformKey,
}

impl CaptureRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(image_data: impl Into<String>, platform: PlatformKey) -> Self {
        Self {
            image_data: image_data.into(),
            platform,
        }
    }

    /// Builds a request from a stored record.
    #[must_use]
    pub fn from_record(record: &ScreenshotRecord) -> Self {
        Self::new(record.image_data.clone(), record.platform)
    }

    /// Decodes the payload into a file named `file_name`.
    pub fn decode(&self, file_name: &str) -> Result<CaptureFile> {
        CaptureFile::from_data_url(&self.image_data, file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::capture::file::sample_data_url;

    #[test]
    fn test_from_record_and_decode() {
        let record = ScreenshotRecord::new(sample_data_url(4, 3), PlatformKey::Deepseek);
        let request = CaptureRequest::from_record(&record);
        assert_eq!(request.platform, PlatformKey::Deepseek);

        let file = request.decode("shot.png").unwrap();
        assert_eq!(file.name(), "shot.png");
        assert_eq!(file.dimensions(), Some((4, 3)));
    }

    #[test]
    fn test_request_json() {
        let request: CaptureRequest =
            serde_json::from_str(r#"{"imageData": "data:,x", "platform": "qwen"}"#).unwrap();
        assert_eq!(request, CaptureRequest::new("data:,x", PlatformKey::Qwen));
    }
}
