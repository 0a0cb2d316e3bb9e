//! Captured image file.
//!
//! The capture request carries the screenshot as a `data:` URL. It is decoded
//! once into a [`CaptureFile`], whose bytes are shared by every payload
//! container built from it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use image::GenericImageView;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Name given to the uploaded file unless configured otherwise.
pub const DEFAULT_FILE_NAME: &str = "ask-screenshot.png";

// ============================================================================
// ImageFormat
// ============================================================================

/// Image formats the engine can validate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// PNG (what tab capture produces).
    #[default]
    Png,
    /// JPEG.
    Jpeg,
}

impl ImageFormat {
    /// Looks up a format by MIME type.
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Returns the MIME type for this format.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Returns the file extension for this format.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    /// Decodes `bytes` and returns `(width, height)`.
    pub fn dimensions(&self, bytes: &[u8]) -> Result<(u32, u32)> {
        let img = image::load_from_memory_with_format(bytes, self.into())?;
        Ok(img.dimensions())
    }
}

impl From<&ImageFormat> for image::ImageFormat {
    fn from(format: &ImageFormat) -> Self {
        match format {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

// ============================================================================
// DataUrl
// ============================================================================

/// A decoded `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// Lowercase media type (`text/plain` when omitted).
    pub mime: String,
    /// Decoded payload.
    pub bytes: Vec<u8>,
}

impl DataUrl {
    /// Parses `data:[<mime>][;param]*[;base64],<payload>`.
    ///
    /// # Errors
    ///
    /// [`Error::DataUrl`] for a missing scheme or comma, or a bad base64 body.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let rest = input
            .get(..5)
            .filter(|scheme| scheme.eq_ignore_ascii_case("data:"))
            .map(|_| &input[5..])
            .ok_or_else(|| Error::data_url("missing data: scheme"))?;

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| Error::data_url("missing ',' before payload"))?;

        let mut params = header.split(';');
        let mime = params.next().unwrap_or_default().trim().to_ascii_lowercase();
        let is_base64 = params.any(|param| param.trim().eq_ignore_ascii_case("base64"));

        let unescaped = urlencoding::decode_binary(payload.as_bytes());
        let bytes = if is_base64 {
            let compact: Vec<u8> = unescaped
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            STANDARD
                .decode(&compact)
                .or_else(|_| STANDARD_NO_PAD.decode(&compact))
                .map_err(|e| Error::data_url(format!("bad base64 payload: {e}")))?
        } else {
            unescaped.into_owned()
        };

        Ok(Self {
            mime: if mime.is_empty() {
                "text/plain".to_string()
            } else {
                mime
            },
            bytes,
        })
    }
}

// ============================================================================
// CaptureFile
// ============================================================================

/// The file delivered to the page: one entry, a name, a media type.
#[derive(Clone, PartialEq, Eq)]
pub struct CaptureFile {
    name: String,
    mime: String,
    bytes: Arc<[u8]>,
    dimensions: Option<(u32, u32)>,
}

impl CaptureFile {
    /// Wraps raw bytes without validation.
    #[must_use]
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: Arc::from(bytes.into()),
            dimensions: None,
        }
    }

    /// Decodes a `data:` URL into an image file named `name`.
    ///
    /// PNG and JPEG payloads are decoded to validate them and record their
    /// dimensions; other `image/*` types are accepted as-is.
    ///
    /// # Errors
    ///
    /// - [`Error::DataUrl`] if the URL is malformed or not an image
    /// - [`Error::Image`] if a PNG/JPEG payload does not decode
    pub fn from_data_url(data_url: &str, name: impl Into<String>) -> Result<Self> {
        let DataUrl { mime, bytes } = DataUrl::parse(data_url)?;
        if !mime.starts_with("image/") {
            return Err(Error::data_url(format!("expected an image, got {mime}")));
        }

        let dimensions = ImageFormat::from_mime(&mime)
            .map(|format| format.dimensions(&bytes))
            .transpose()?;

        Ok(Self {
            name: name.into(),
            mime,
            bytes: Arc::from(bytes),
            dimensions,
        })
    }

    /// Returns a copy with a different file name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// File name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Media type.
    #[inline]
    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// File contents.
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for an empty file.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `(width, height)` when the payload was decoded.
    #[inline]
    #[must_use]
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }
}

impl fmt::Debug for CaptureFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

// ============================================================================
// Test Support
// ============================================================================

/// Encodes a blank RGBA PNG of the given size.
#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image::RgbaImage::new(width, height))
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

/// `data:image/png;base64,…` for [`sample_png`].
#[cfg(test)]
pub(crate) fn sample_data_url(width: u32, height: u32) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(sample_png(width, height)))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_format_lookup() {
        assert_eq!(ImageFormat::from_mime("IMAGE/PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_mime("image/jpg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_mime("image/webp"), None);
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
        assert_eq!(ImageFormat::default().mime_type(), "image/png");
    }

    #[test]
    fn test_data_url_base64() {
        let url = DataUrl::parse("data:text/plain;charset=utf-8;base64,aGVsbG8=").unwrap();
        assert_eq!(url.mime, "text/plain");
        assert_eq!(url.bytes, b"hello");

        let unpadded = DataUrl::parse("data:;base64,aGVsbG8").unwrap();
        assert_eq!(unpadded.bytes, b"hello");
    }

    #[test]
    fn test_data_url_percent_encoded() {
        let url = DataUrl::parse("DATA:,a%20b%2Cc").unwrap();
        assert_eq!(url.mime, "text/plain");
        assert_eq!(url.bytes, b"a b,c");
    }

    #[test]
    fn test_data_url_errors() {
        for bad in ["image/png;base64,AAAA", "data:image/png;base64", "data:image/png;base64,%%%"] {
            assert!(matches!(DataUrl::parse(bad), Err(Error::DataUrl { .. })), "{bad}");
        }
    }

    #[test]
    fn test_capture_file_from_png() {
        let file = CaptureFile::from_data_url(&sample_data_url(10, 10), DEFAULT_FILE_NAME).unwrap();
        assert_eq!(file.name(), "ask-screenshot.png");
        assert_eq!(file.mime(), "image/png");
        assert_eq!(file.dimensions(), Some((10, 10)));
        assert_eq!(file.bytes(), sample_png(10, 10).as_slice());
    }

    #[test]
    fn test_capture_file_rejects_corrupt_png() {
        let err = CaptureFile::from_data_url("data:image/png;base64,AAAAAAAA", "x.png").unwrap_err();
        assert!(matches!(err, Error::Image(_)));
    }

    #[test]
    fn test_capture_file_rejects_non_image() {
        let err = CaptureFile::from_data_url("data:text/html,<b>hi</b>", "x.png").unwrap_err();
        assert!(matches!(err, Error::DataUrl { .. }));
    }

    #[test]
    fn test_clone_shares_bytes() {
        let file = CaptureFile::new("a.png", "image/png", vec![0u8; 1024]);
        let copy = file.clone().with_name("b.png");
        assert_eq!(copy.bytes().as_ptr(), file.bytes().as_ptr());
        assert_eq!(copy.name(), "b.png");
        assert!(format!("{file:?}").contains("len: 1024"));
    }
}
