//! Supported AI chat platforms.
//!
//! A [`PlatformKey`] is chosen once per capture and carried through every
//! downstream call. Everything platform-specific lives in one static table of
//! [`PlatformProfile`]s, looked up by an exhaustive match.
//!
//! | Key | Display name | Host |
//! |-----|--------------|------|
//! | `qwen` | Qwen | `chat.qwen.ai` |
//! | `deepseek` | Deepseek | `chat.deepseek.com` |

// ============================================================================
// Submodules
// ============================================================================

/// Per-role selector catalogs.
pub mod catalog;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

use self::catalog::RoleTable;

// ============================================================================
// PlatformKey
// ============================================================================

/// Identifier of a supported chat platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKey {
    /// Qwen chat.
    Qwen,
    /// DeepSeek chat.
    Deepseek,
}

impl PlatformKey {
    /// Every supported platform.
    pub const ALL: [PlatformKey; 2] = [Self::Qwen, Self::Deepseek];

    /// Returns the wire key (`"qwen"`, `"deepseek"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Qwen => "qwen",
            Self::Deepseek => "deepseek",
        }
    }

    /// Returns the static profile for this platform.
    #[must_use]
    pub fn profile(self) -> &'static PlatformProfile {
        match self {
            Self::Qwen => &QWEN,
            Self::Deepseek => &DEEPSEEK,
        }
    }

    /// Detects the platform serving `url`, by exact host match.
    ///
    /// # Example
    ///
    /// ```ignore
    /// assert_eq!(PlatformKey::from_url("https://chat.qwen.ai/c/123"), Some(PlatformKey::Qwen));
    /// ```
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        Self::ALL
            .into_iter()
            .find(|key| key.profile().host.eq_ignore_ascii_case(host))
    }

    /// Maps a context-menu item id (`askQwen`, `askDeepseek`) to a platform.
    #[must_use]
    pub fn from_menu_id(menu_id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.profile().menu_id == menu_id)
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::unknown_platform(s))
    }
}

// ============================================================================
// PlatformProfile
// ============================================================================

/// Static description of one platform.
#[derive(Debug)]
pub struct PlatformProfile {
    /// Platform key.
    pub key: PlatformKey,
    /// Human-readable name used in notifications and logs.
    pub display_name: &'static str,
    /// Host the content script activates on.
    pub host: &'static str,
    /// Page opened for a new capture.
    pub home_url: &'static str,
    /// Context-menu item that selects this platform.
    pub menu_id: &'static str,
    /// Chat-input patterns tried before the generic ones.
    pub chat_input_hints: &'static [&'static str],
    /// Catalog patterns appended after the base catalog.
    pub overrides: RoleTable,
}

static QWEN: PlatformProfile = PlatformProfile {
    key: PlatformKey::Qwen,
    display_name: "Qwen",
    host: "chat.qwen.ai",
    home_url: "https://chat.qwen.ai",
    menu_id: "askQwen",
    chat_input_hints: &["textarea#chat-input", r#"[class*="chat-input" i] textarea"#],
    overrides: RoleTable {
        file_input: &[r#"input[type="file"]"#, r#"input[type="file"][accept*="image" i]"#],
        upload_control: &[r#"[class*="qwen" i]"#, r#"[data-testid*="qwen"]"#],
        drop_zone: &[r#"[class*="chat-container" i]"#],
    },
};

static DEEPSEEK: PlatformProfile = PlatformProfile {
    key: PlatformKey::Deepseek,
    display_name: "Deepseek",
    host: "chat.deepseek.com",
    home_url: "https://chat.deepseek.com",
    menu_id: "askDeepseek",
    chat_input_hints: &["textarea#chat-input", r#"textarea[placeholder*="DeepSeek" i]"#],
    overrides: RoleTable {
        file_input: &[],
        upload_control: &[r#"[class*="deepseek" i]"#, r#"[data-testid*="deepseek"]"#],
        drop_zone: &[],
    },
};

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_round_trip() {
        for key in PlatformKey::ALL {
            assert_eq!(key.as_str().parse::<PlatformKey>().unwrap(), key);
        }
        assert_eq!("Qwen".parse::<PlatformKey>().unwrap(), PlatformKey::Qwen);
    }

    #[test]
    fn test_unknown_key() {
        let err = "gemini".parse::<PlatformKey>().unwrap_err();
        assert!(matches!(err, Error::UnknownPlatform { key } if key == "gemini"));
    }

    #[test]
    fn test_from_url() {
        assert_eq!(
            PlatformKey::from_url("https://chat.qwen.ai/c/abc"),
            Some(PlatformKey::Qwen)
        );
        assert_eq!(
            PlatformKey::from_url("https://chat.deepseek.com/"),
            Some(PlatformKey::Deepseek)
        );
        assert_eq!(PlatformKey::from_url("https://qwen.ai.evil.example/"), None);
        assert_eq!(PlatformKey::from_url("not a url"), None);
    }

    #[test]
    fn test_from_menu_id() {
        assert_eq!(PlatformKey::from_menu_id("askDeepseek"), Some(PlatformKey::Deepseek));
        assert_eq!(PlatformKey::from_menu_id("askGemini"), None);
    }

    #[test]
    fn test_profiles_are_keyed_consistently() {
        for key in PlatformKey::ALL {
            assert_eq!(key.profile().key, key);
        }
        assert_eq!(PlatformKey::Qwen.profile().display_name, "Qwen");
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&PlatformKey::Deepseek).unwrap();
        assert_eq!(json, "\"deepseek\"");
    }
}
