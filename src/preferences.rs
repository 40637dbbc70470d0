//! The two persisted UI flags: colour palette and dark mode.
//!
//! Values are stored as strings under the same keys the dashboard has always
//! used, so existing saved state keeps loading.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const PALETTE_KEY: &str = "warframeChecklistPalette";
pub const DARK_MODE_KEY: &str = "warframeChecklistPaletteDark";
pub const DEFAULT_PALETTE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiPreferences {
    pub palette: String,
    pub dark_mode: bool,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE.to_string(),
            dark_mode: false,
        }
    }
}

impl UiPreferences {
    /// Apply raw stored values. Unknown palettes are ignored when
    /// `allowed_palettes` is non-empty; dark mode is on only for `"1"`.
    pub fn from_stored(
        palette: Option<&str>,
        dark_mode: Option<&str>,
        allowed_palettes: &[String],
    ) -> Self {
        let mut prefs = Self::default();
        if let Some(palette) = palette {
            if allowed_palettes.is_empty() || allowed_palettes.iter().any(|p| p == palette) {
                prefs.palette = palette.to_string();
            }
        }
        if let Some(flag) = dark_mode {
            prefs.dark_mode = flag == "1";
        }
        prefs
    }

    fn dark_mode_flag(&self) -> &'static str {
        if self.dark_mode { "1" } else { "0" }
    }
}

pub trait PreferenceStore {
    fn load(&self) -> Result<UiPreferences>;
    fn save(&mut self, prefs: &UiPreferences) -> Result<()>;
}

/// Flat JSON object on disk holding the two keys.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    allowed_palettes: Vec<String>,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            allowed_palettes: Vec::new(),
        }
    }

    pub fn with_allowed_palettes<I, S>(mut self, palettes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_palettes = palettes.into_iter().map(Into::into).collect();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonFileStore {
    fn load(&self) -> Result<UiPreferences> {
        if !self.path.exists() {
            return Ok(UiPreferences::default());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let stored: BTreeMap<String, String> = serde_json::from_str(&raw)?;
        Ok(UiPreferences::from_stored(
            stored.get(PALETTE_KEY).map(String::as_str),
            stored.get(DARK_MODE_KEY).map(String::as_str),
            &self.allowed_palettes,
        ))
    }

    fn save(&mut self, prefs: &UiPreferences) -> Result<()> {
        let mut stored = BTreeMap::new();
        stored.insert(PALETTE_KEY, prefs.palette.as_str());
        stored.insert(DARK_MODE_KEY, prefs.dark_mode_flag());
        let raw = serde_json::to_string_pretty(&stored)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

/// In-memory store holding the raw stored strings.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    palette: Option<String>,
    dark_mode: Option<String>,
    allowed_palettes: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(palette: Option<&str>, dark_mode: Option<&str>) -> Self {
        Self {
            palette: palette.map(str::to_string),
            dark_mode: dark_mode.map(str::to_string),
            allowed_palettes: Vec::new(),
        }
    }

    pub fn with_allowed_palettes(mut self, palettes: &[&str]) -> Self {
        self.allowed_palettes = palettes.iter().map(|p| p.to_string()).collect();
        self
    }
}

impl PreferenceStore for MemoryStore {
    fn load(&self) -> Result<UiPreferences> {
        Ok(UiPreferences::from_stored(
            self.palette.as_deref(),
            self.dark_mode.as_deref(),
            &self.allowed_palettes,
        ))
    }

    fn save(&mut self, prefs: &UiPreferences) -> Result<()> {
        self.palette = Some(prefs.palette.clone());
        self.dark_mode = Some(prefs.dark_mode_flag().to_string());
        Ok(())
    }
}
