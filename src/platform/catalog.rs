//! Selector catalogs.
//!
//! Upload affordances are found by structural pattern matching, one ordered
//! pattern list per [`Role`]. The order encodes priority: the most specific,
//! most likely patterns come first.
//!
//! A catalog is the base table followed by the platform's overrides, with
//! duplicates removed and first-seen order kept:
//!
//! ```text
//! build(platform).role == dedupe(BASE.role ++ platform.overrides.role)
//! ```
//!
//! New platforms or page redesigns are handled by data: extra overrides can
//! be loaded from JSON and merged with the same rule.
//!
//! ```ignore
//! let mut catalog = SelectorCatalog::build(PlatformKey::Qwen);
//! catalog.merge(&SelectorCatalog::from_json(r#"{"dropZone": [".composer"]}"#)?);
//! let compiled = CompiledCatalog::compile(&catalog, PlatformKey::Qwen)?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::dom::Selector;
use crate::error::Result;

use super::PlatformKey;

// ============================================================================
// Role
// ============================================================================

/// What an upload affordance is expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// Native `<input type="file">`.
    FileInput,
    /// Clickable control that opens a file picker.
    UploadControl,
    /// Area that accepts dropped files.
    DropZone,
}

impl Role {
    /// Every role, in discovery order.
    pub const ALL: [Role; 3] = [Self::FileInput, Self::UploadControl, Self::DropZone];

    /// Returns the wire name (`fileInput`, `uploadControl`, `dropZone`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FileInput => "fileInput",
            Self::UploadControl => "uploadControl",
            Self::DropZone => "dropZone",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Static Tables
// ============================================================================

/// Static per-role pattern lists.
#[derive(Debug, Clone, Copy)]
pub struct RoleTable {
    /// `fileInput` patterns.
    pub file_input: &'static [&'static str],
    /// `uploadControl` patterns.
    pub upload_control: &'static [&'static str],
    /// `dropZone` patterns.
    pub drop_zone: &'static [&'static str],
}

impl RoleTable {
    /// Returns the patterns for `role`.
    #[must_use]
    pub const fn get(&self, role: Role) -> &'static [&'static str] {
        match role {
            Role::FileInput => self.file_input,
            Role::UploadControl => self.upload_control,
            Role::DropZone => self.drop_zone,
        }
    }
}

/// Catalog shared by every platform.
pub const BASE: RoleTable = RoleTable {
    file_input: &[r#"input[type="file"]"#, r#"input[accept*="image" i]"#],
    upload_control: &[
        r#"[data-testid*="upload"]"#,
        r#"[class*="upload" i]"#,
        r#"[class*="attach" i]"#,
        r#"button[title*="上传"]"#,
        r#"button[title*="upload" i]"#,
        r#"[aria-label*="upload" i]"#,
        r#"[aria-label*="attach" i]"#,
        r#"[aria-label*="上传"]"#,
    ],
    drop_zone: &[
        r#"[class*="dropzone" i]"#,
        r#"[class*="drop-zone" i]"#,
        r#"[class*="drop-area" i]"#,
        r#"[data-testid*="drop"]"#,
        "[aria-dropeffect]",
    ],
};

/// Generic chat-input patterns, tried after the platform's hints.
pub const CHAT_INPUT: &[&str] = &[
    "textarea",
    r#"input[type="text"]"#,
    r#"[contenteditable="true"]"#,
    r#"[data-testid*="input"]"#,
    r#"[class*="input" i]"#,
    r#"[role="textbox"]"#,
];

// ============================================================================
// SelectorCatalog
// ============================================================================

/// Ordered, duplicate-free pattern lists per role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorCatalog {
    /// `fileInput` patterns.
    #[serde(default)]
    pub file_input: Vec<String>,
    /// `uploadControl` patterns.
    #[serde(default)]
    pub upload_control: Vec<String>,
    /// `dropZone` patterns.
    #[serde(default)]
    pub drop_zone: Vec<String>,
}

impl SelectorCatalog {
    /// The base catalog alone.
    #[must_use]
    pub fn base() -> Self {
        Self::from_tables(&BASE, None)
    }

    /// Base catalog merged with `platform`'s overrides.
    #[must_use]
    pub fn build(platform: PlatformKey) -> Self {
        Self::from_tables(&BASE, Some(&platform.profile().overrides))
    }

    /// Catalog for a raw key; unknown keys get the base catalog.
    #[must_use]
    pub fn for_key(key: &str) -> Self {
        key.parse::<PlatformKey>()
            .map_or_else(|_| Self::base(), Self::build)
    }

    /// Parses an overrides document (`{"fileInput": [...], ...}`).
    ///
    /// Missing roles default to empty lists.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn from_tables(base: &RoleTable, overrides: Option<&RoleTable>) -> Self {
        let merged = |role: Role| {
            let extra = overrides.map_or(&[][..], |table| table.get(role));
            dedupe_concat(base.get(role), extra)
        };
        Self {
            file_input: merged(Role::FileInput),
            upload_control: merged(Role::UploadControl),
            drop_zone: merged(Role::DropZone),
        }
    }

    /// Returns the patterns for `role`.
    #[must_use]
    pub fn get(&self, role: Role) -> &[String] {
        match role {
            Role::FileInput => &self.file_input,
            Role::UploadControl => &self.upload_control,
            Role::DropZone => &self.drop_zone,
        }
    }

    /// Appends `other`'s patterns after this catalog's, per role.
    pub fn merge(&mut self, other: &SelectorCatalog) {
        self.file_input = dedupe_concat(&self.file_input, &other.file_input);
        self.upload_control = dedupe_concat(&self.upload_control, &other.upload_control);
        self.drop_zone = dedupe_concat(&self.drop_zone, &other.drop_zone);
    }
}

/// Concatenates `base ++ extra`, keeping the first occurrence of each pattern.
#[must_use]
pub fn dedupe_concat<A, B>(base: &[A], extra: &[B]) -> Vec<String>
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let mut seen = FxHashSet::default();
    base.iter()
        .map(AsRef::as_ref)
        .chain(extra.iter().map(AsRef::as_ref))
        .filter(|pattern| seen.insert(*pattern))
        .map(str::to_string)
        .collect()
}

/// Builds the catalog for `platform`.
///
/// Shorthand for [`SelectorCatalog::build`].
#[inline]
#[must_use]
pub fn build_catalog(platform: PlatformKey) -> SelectorCatalog {
    SelectorCatalog::build(platform)
}

// ============================================================================
// CompiledCatalog
// ============================================================================

/// A catalog with every pattern parsed, plus the platform's chat-input list.
#[derive(Debug, Clone)]
pub struct CompiledCatalog {
    file_input: Vec<Selector>,
    upload_control: Vec<Selector>,
    drop_zone: Vec<Selector>,
    chat_input: Vec<Selector>,
}

impl CompiledCatalog {
    /// Parses every pattern of `catalog` and `platform`'s chat-input list.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSelector`](crate::Error::InvalidSelector) naming the
    /// first pattern that does not parse.
    pub fn compile(catalog: &SelectorCatalog, platform: PlatformKey) -> Result<Self> {
        let chat_input = dedupe_concat(platform.profile().chat_input_hints, CHAT_INPUT);
        Ok(Self {
            file_input: compile_all(&catalog.file_input)?,
            upload_control: compile_all(&catalog.upload_control)?,
            drop_zone: compile_all(&catalog.drop_zone)?,
            chat_input: compile_all(&chat_input)?,
        })
    }

    /// Compiles the built-in catalog for `platform`.
    pub fn for_platform(platform: PlatformKey) -> Result<Self> {
        Self::compile(&SelectorCatalog::build(platform), platform)
    }

    /// Returns the selectors for `role`.
    #[must_use]
    pub fn get(&self, role: Role) -> &[Selector] {
        match role {
            Role::FileInput => &self.file_input,
            Role::UploadControl => &self.upload_control,
            Role::DropZone => &self.drop_zone,
        }
    }

    /// Chat-input selectors (platform hints first).
    #[must_use]
    pub fn chat_input(&self) -> &[Selector] {
        &self.chat_input
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Selector>> {
    patterns.iter().map(|p| Selector::parse(p)).collect()
}

// ============================================================================
// Tests
// ============================================================================
