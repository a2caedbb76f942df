//! Theme System - Visual Contracts
//!
//! A theme fixes everything about a signature that is not user input:
//! organization, colors, fonts, logo, and the background layout constants.

use image::Rgba;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ENGINE_VERSION;

pub type ThemeId = String;

pub const BUILTIN_THEME_ID: &str = "anniversary";

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Theme {0} requires engine >= {1}, current is {2}")]
    EngineVersionMismatch(String, String, String),

    #[error("Invalid version: {0}")]
    InvalidVersion(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub id: ThemeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub theme_version: String,
    pub engine_min_version: String,
    pub organization: String,
    #[serde(default)]
    pub palette: Palette,
    #[serde(default)]
    pub typography: Typography,
    #[serde(default)]
    pub logo: Option<Logo>,
    #[serde(default)]
    pub background: BackgroundLayout,
    #[serde(default)]
    pub validation: ThemeValidation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Palette {
    pub primary_text: String,
    pub secondary_text: String,
    pub link: String,
    pub accent: String,
    pub placeholder: String,
    pub overlay_text: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary_text: "#405965".to_string(),
            secondary_text: "#577582".to_string(),
            link: "#c12d63".to_string(),
            accent: "#f58025".to_string(),
            placeholder: "#999999".to_string(),
            overlay_text: "#ffffff".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    pub font_family: String,
    pub base_size: u32,
    pub name_size: u32,
    pub title_size: u32,
    pub organization_size: u32,
    pub contact_size: u32,
    pub note_size: u32,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            font_family: "Arial, sans-serif".to_string(),
            base_size: 14,
            name_size: 16,
            title_size: 14,
            organization_size: 13,
            contact_size: 13,
            note_size: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logo {
    pub url: String,
    pub alt: String,
    pub width: u32,
    pub height: u32,
}

/// Layout constants for the meeting background.
///
/// Text sits to the right of the accent bar, top-aligned with it. Line 2
/// starts `large_font_px + line_gap` below line 1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundLayout {
    pub width: u32,
    pub height: u32,
    pub bar_x: u32,
    pub bar_y: u32,
    pub bar_width: u32,
    pub bar_height: u32,
    pub text_gap_x: u32,
    pub large_font_px: f32,
    pub small_font_px: f32,
    pub line_gap: f32,
    pub jpeg_quality: u8,
    #[serde(default)]
    pub image_path: Option<PathBuf>,
    #[serde(default)]
    pub font_path: Option<PathBuf>,
}

impl Default for BackgroundLayout {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            bar_x: 60,
            bar_y: 60,
            bar_width: 8,
            bar_height: 110,
            text_gap_x: 24,
            large_font_px: 56.0,
            small_font_px: 36.0,
            line_gap: 12.0,
            jpeg_quality: 92,
            image_path: None,
            font_path: None,
        }
    }
}

impl BackgroundLayout {
    pub fn text_x(&self) -> f32 {
        (self.bar_x + self.bar_width + self.text_gap_x) as f32
    }

    pub fn text_y(&self) -> f32 {
        self.bar_y as f32
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeValidation {
    #[serde(default)]
    pub failure_mode: FailureMode,
    #[serde(default)]
    pub allowed_email_domain: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    #[default]
    Block,
    Warn,
    Log,
}

impl Theme {
    /// The theme compiled into the engine. Used when no theme directory is
    /// available.
    pub fn builtin() -> Self {
        Self {
            id: BUILTIN_THEME_ID.to_string(),
            name: "75th Anniversary".to_string(),
            description: "Anniversary signature with pronouns and meeting background".to_string(),
            theme_version: "2.0.0".to_string(),
            engine_min_version: "1.0.0".to_string(),
            organization: "Princeton Plasma Physics Laboratory".to_string(),
            palette: Palette::default(),
            typography: Typography::default(),
            logo: Some(Logo {
                url: "https://www.pppl.gov/sites/g/files/toruqf286/files/2025-12/75_anni_logo.png"
                    .to_string(),
                alt: "PPPL 75th Anniversary".to_string(),
                width: 70,
                height: 73,
            }),
            background: BackgroundLayout::default(),
            validation: ThemeValidation {
                failure_mode: FailureMode::Block,
                allowed_email_domain: Some("pppl.gov".to_string()),
            },
        }
    }

    pub fn check_engine_version(&self) -> Result<(), ThemeError> {
        let engine_ver = semver::Version::parse(ENGINE_VERSION)
            .map_err(|_| ThemeError::InvalidVersion(ENGINE_VERSION.to_string()))?;
        let min_ver = semver::Version::parse(&self.engine_min_version)
            .map_err(|_| ThemeError::InvalidVersion(self.engine_min_version.clone()))?;

        if engine_ver < min_ver {
            return Err(ThemeError::EngineVersionMismatch(
                self.id.clone(),
                self.engine_min_version.clone(),
                ENGINE_VERSION.to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse `#rgb` or `#rrggbb` into an opaque color.
pub fn parse_hex_color(s: &str) -> Result<Rgba<u8>, ThemeError> {
    let hex_digits = s.trim().trim_start_matches('#');
    let expanded: String = match hex_digits.len() {
        3 => hex_digits.chars().flat_map(|c| [c, c]).collect(),
        6 => hex_digits.to_string(),
        _ => return Err(ThemeError::InvalidColor(s.to_string())),
    };
    let bytes = hex::decode(&expanded).map_err(|_| ThemeError::InvalidColor(s.to_string()))?;
    Ok(Rgba([bytes[0], bytes[1], bytes[2], 255]))
}

/// Theme registry - loads and caches themes
pub struct ThemeRegistry {
    themes: HashMap<ThemeId, Theme>,
}

impl ThemeRegistry {
    pub fn new() -> Self {
        Self { themes: HashMap::new() }
    }

    /// Registry holding only the built-in theme.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Theme::builtin());
        registry
    }

    /// Load every `*.json` theme in `dir` on top of the built-in theme. A file
    /// with the built-in id replaces it.
    pub fn load_from_dir(dir: &Path) -> Result<Self, std::io::Error> {
        let mut registry = Self::with_builtin();
        if dir.exists() {
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().map_or(false, |e| e == "json") {
                    match load_theme_file(&path) {
                        Ok(theme) => {
                            debug!("loaded theme {} from {}", theme.id, path.display());
                            registry.register(theme);
                        }
                        Err(e) => warn!("skipping theme file {}: {}", path.display(), e),
                    }
                }
            }
        } else {
            debug!("theme directory {} not found, using built-in theme", dir.display());
        }
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&Theme> {
        self.themes.get(id)
    }

    pub fn list(&self) -> Vec<&Theme> {
        let mut themes: Vec<_> = self.themes.values().collect();
        themes.sort_by(|a, b| a.id.cmp(&b.id));
        themes
    }

    pub fn register(&mut self, theme: Theme) {
        self.themes.insert(theme.id.clone(), theme);
    }
}

fn load_theme_file(path: &Path) -> Result<Theme, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str::<Theme>(&content)?)
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#f58025").unwrap(), Rgba([0xf5, 0x80, 0x25, 255]));
        assert_eq!(parse_hex_color("#999").unwrap(), Rgba([0x99, 0x99, 0x99, 255]));
        assert_eq!(parse_hex_color("FFFFFF").unwrap(), Rgba([255, 255, 255, 255]));
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#gggggg").is_err());
    }

    #[test]
    fn test_builtin_theme_is_compatible() {
        let theme = Theme::builtin();
        assert!(theme.check_engine_version().is_ok());
        assert!(parse_hex_color(&theme.palette.accent).is_ok());
        assert!(parse_hex_color(&theme.palette.overlay_text).is_ok());
    }

    #[test]
    fn test_future_engine_rejected() {
        let mut theme = Theme::builtin();
        theme.engine_min_version = "99.0.0".to_string();
        assert!(matches!(
            theme.check_engine_version(),
            Err(ThemeError::EngineVersionMismatch(..))
        ));
    }

    #[test]
    fn test_load_from_dir_skips_invalid_files() {
        let dir = tempfile::tempdir().unwrap();

        let mut custom = Theme::builtin();
        custom.id = "plain".to_string();
        custom.organization = "Example Lab".to_string();
        fs::write(
            dir.path().join("plain.json"),
            serde_json::to_string(&custom).unwrap(),
        )
        .unwrap();

        let mut broken = fs::File::create(dir.path().join("broken.json")).unwrap();
        broken.write_all(b"{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let registry = ThemeRegistry::load_from_dir(dir.path()).unwrap();
        let ids: Vec<_> = registry.list().iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec!["anniversary".to_string(), "plain".to_string()]);
        assert_eq!(registry.get("plain").unwrap().organization, "Example Lab");
    }

    #[test]
    fn test_minimal_theme_json_uses_defaults() {
        let json = r#"{
            "id": "minimal",
            "name": "Minimal",
            "themeVersion": "1.0.0",
            "engineMinVersion": "1.0.0",
            "organization": "Example Lab"
        }"#;
        let theme: Theme = serde_json::from_str(json).unwrap();
        assert_eq!(theme.background, BackgroundLayout::default());
        assert_eq!(theme.validation.failure_mode, FailureMode::Block);
        assert!(theme.logo.is_none());
    }
}
