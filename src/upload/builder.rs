//! Builder pattern for uploader configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ask_screenshot::{Document, DownloadFallback, MemoryStore, Uploader};
//!
//! let uploader = Uploader::builder()
//!     .dom(Arc::new(Document::parse(html)?))
//!     .store(Arc::new(MemoryStore::new()))
//!     .fallback(Arc::new(DownloadFallback::new("/tmp")))
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::capture::{MemoryStore, PendingStore};
use crate::discovery::DeepWalker;
use crate::dom::Dom;
use crate::error::{Error, Result};
use crate::platform::PlatformKey;
use crate::platform::catalog::{CompiledCatalog, SelectorCatalog};

use super::fallback::FallbackPresenter;
use super::options::UploadOptions;
use super::scheduler::Uploader;

// ============================================================================
// UploaderBuilder
// ============================================================================

/// Builder for an [`Uploader`].
///
/// Use [`Uploader::builder()`] to create one.
pub struct UploaderBuilder<D: ?Sized> {
    /// Page to work on.
    dom: Option<Arc<D>>,
    /// Pending-record storage.
    store: Option<Arc<dyn PendingStore>>,
    /// Manual-completion path.
    fallback: Option<Arc<dyn FallbackPresenter>>,
    /// Retry settings.
    options: UploadOptions,
    /// Extra catalog patterns per platform.
    overrides: Vec<(PlatformKey, SelectorCatalog)>,
}

impl<D: ?Sized> Default for UploaderBuilder<D> {
    fn default() -> Self {
        Self {
            dom: None,
            store: None,
            fallback: None,
            options: UploadOptions::new(),
            overrides: Vec::new(),
        }
    }
}

// ============================================================================
// UploaderBuilder Implementation
// ============================================================================

impl<D: Dom + ?Sized> UploaderBuilder<D> {
    /// Creates an empty builder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page.
    #[inline]
    #[must_use]
    pub fn dom(mut self, dom: Arc<D>) -> Self {
        self.dom = Some(dom);
        self
    }

    /// Sets the pending-record store (defaults to a [`MemoryStore`]).
    #[inline]
    #[must_use]
    pub fn store(mut self, store: Arc<dyn PendingStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the fallback presenter.
    #[inline]
    #[must_use]
    pub fn fallback(mut self, fallback: Arc<dyn FallbackPresenter>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Replaces the options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }

    /// Appends extra patterns to `platform`'s catalog.
    ///
    /// Merged after the built-in overrides with the usual dedupe rule.
    #[must_use]
    pub fn catalog_overrides(mut self, platform: PlatformKey, overrides: SelectorCatalog) -> Self {
        self.overrides.push((platform, overrides));
        self
    }

    /// Builds the uploader with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the page or fallback is missing, or options are invalid
    /// - [`Error::InvalidSelector`] if an override pattern does not parse
    pub fn build(self) -> Result<Uploader<D>> {
        let dom = self.dom.ok_or_else(|| {
            Error::config(
                "DOM host is required. Use .dom() to set it.\n\
                 Example: Uploader::builder().dom(Arc::new(Document::new()))",
            )
        })?;
        let fallback = self.fallback.ok_or_else(|| {
            Error::config("Fallback presenter is required. Use .fallback() to set it.")
        })?;
        self.options.validate()?;

        let mut catalogs = FxHashMap::default();
        for platform in PlatformKey::ALL {
            let mut catalog = SelectorCatalog::build(platform);
            for (_, extra) in self.overrides.iter().filter(|(key, _)| *key == platform) {
                catalog.merge(extra);
            }
            catalogs.insert(platform, CompiledCatalog::compile(&catalog, platform)?);
        }

        Ok(Uploader {
            walker: DeepWalker::new(dom),
            catalogs,
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn PendingStore>),
            fallback,
            options: self.options,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dom::Document;
    use crate::platform::catalog::Role;
    use crate::upload::fallback::DownloadFallback;

    fn fallback() -> Arc<dyn FallbackPresenter> {
        Arc::new(DownloadFallback::new(std::env::temp_dir()))
    }

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = UploaderBuilder::<Document>::new();
        assert!(builder.dom.is_none());
        assert!(builder.fallback.is_none());
        assert_eq!(builder.options, UploadOptions::new());
    }

    #[test]
    fn test_missing_dom() {
        let err = Uploader::<Document>::builder()
            .fallback(fallback())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config { message } if message.contains(".dom()")));
    }

    #[test]
    fn test_missing_fallback() {
        let err = Uploader::builder()
            .dom(Arc::new(Document::new()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_invalid_options() {
        let result = Uploader::builder()
            .dom(Arc::new(Document::new()))
            .fallback(fallback())
            .options(UploadOptions::new().with_max_attempts(0))
            .build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_overrides_are_compiled_per_platform() {
        let extra = SelectorCatalog::from_json(r#"{"dropZone": [".composer-area"]}"#).unwrap();
        let uploader = Uploader::builder()
            .dom(Arc::new(Document::new()))
            .fallback(fallback())
            .catalog_overrides(PlatformKey::Deepseek, extra)
            .build()
            .unwrap();

        let drop_zone = |key: PlatformKey| {
            uploader.catalogs[&key]
                .get(Role::DropZone)
                .iter()
                .map(|s| s.as_str().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(drop_zone(PlatformKey::Deepseek).last().map(String::as_str), Some(".composer-area"));
        assert!(!drop_zone(PlatformKey::Qwen).contains(&".composer-area".to_string()));
    }

    #[test]
    fn test_bad_override_pattern() {
        let result = Uploader::builder()
            .dom(Arc::new(Document::new()))
            .fallback(fallback())
            .catalog_overrides(
                PlatformKey::Qwen,
                SelectorCatalog {
                    file_input: vec!["input:not([hidden])".into()],
                    ..SelectorCatalog::default()
                },
            )
            .build();
        assert!(matches!(result, Err(Error::InvalidSelector { .. })));
    }
}
