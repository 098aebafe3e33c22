//! Serializable recolor settings and build manifests.
//!
//! A [`RecolorProfile`] captures everything one recolor job needs in a
//! JSON-friendly form; a [`BuildManifest`] lists many jobs.
//!
//! # Example
//!
//! ```
//! use artwork_recolor::{BackgroundSetting, RecolorProfile};
//!
//! let profile = RecolorProfile::new("#333")
//!     .with_background(BackgroundSetting::Level(0))
//!     .with_hidden("caret");
//!
//! let json = profile.to_json().unwrap();
//! let restored = RecolorProfile::from_json(&json).unwrap();
//! assert_eq!(restored, profile);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::{Color, ColorError};
use crate::error::{Error, Result};
use crate::export::RasterOptions;
use crate::recolor::{Background, Recolorer};

// ============================================================================
// Serializable Background
// ============================================================================

/// Serializable form of [`Background`].
///
/// Serializes as a bare number (gray level) or a color string:
///
/// ```json
/// { "background": 0 }
/// // or
/// { "background": "#1e1e1e" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackgroundSetting {
    Level(u8),
    Color(String),
}

impl BackgroundSetting {
    /// Parses the stored literal into a [`Background`].
    pub fn resolve(&self) -> std::result::Result<Background, ColorError> {
        match self {
            Self::Level(level) => Ok(Background::Level(*level)),
            Self::Color(literal) => literal.parse(),
        }
    }
}

impl From<&Background> for BackgroundSetting {
    fn from(background: &Background) -> Self {
        match background {
            Background::Level(level) => Self::Level(*level),
            Background::Color(color) => Self::Color(color.to_hex()),
        }
    }
}

// ============================================================================
// RecolorProfile
// ============================================================================

/// Settings for one recolor job.
///
/// # JSON Format
///
/// ```json
/// {
///   "baseColor": "#333",
///   "background": 0,
///   "hide": ["caret"],
///   "raster": { "height": 80 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecolorProfile {
    /// Brand color literal.
    pub base_color: String,

    /// Background, if the artwork is shown on one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<BackgroundSetting>,

    /// Hide names (`caret` hides elements with class `v_caret`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hide: Vec<String>,

    /// Raster sizing, used for image outputs.
    #[serde(default)]
    pub raster: RasterOptions,
}

impl RecolorProfile {
    /// Creates a profile with just a brand color.
    pub fn new(base_color: impl Into<String>) -> Self {
        Self {
            base_color: base_color.into(),
            background: None,
            hide: Vec::new(),
            raster: RasterOptions::default(),
        }
    }

    pub fn with_background(mut self, background: BackgroundSetting) -> Self {
        self.background = Some(background);
        self
    }

    pub fn with_hidden(mut self, name: impl Into<String>) -> Self {
        self.hide.push(name.into());
        self
    }

    pub fn with_raster(mut self, raster: RasterOptions) -> Self {
        self.raster = raster;
        self
    }

    /// Builds the [`Recolorer`] described by this profile.
    pub fn recolorer(&self) -> std::result::Result<Recolorer, ColorError> {
        let brand = Color::parse(&self.base_color)?;
        let background = self.background.as_ref().map(BackgroundSetting::resolve).transpose()?;
        Ok(Recolorer::new(brand, background, &self.hide))
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ============================================================================
// BuildManifest
// ============================================================================

/// One input rendered with one profile to one or more outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildJob {
    pub input: PathBuf,
    pub outputs: Vec<PathBuf>,
    #[serde(flatten)]
    pub profile: RecolorProfile,
}

/// A list of recolor jobs plus the splash animation to assemble afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildManifest {
    pub jobs: Vec<BuildJob>,

    /// Frames (raster outputs of earlier jobs) for the splash GIF.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub splash_frames: Vec<PathBuf>,

    /// Where the splash GIF is written, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub splash: Option<PathBuf>,
}

impl BuildManifest {
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Loads a manifest from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_json(&text)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_json_format() {
        let profile = RecolorProfile::new("#333")
            .with_background(BackgroundSetting::Level(0))
            .with_raster(RasterOptions::with_height(80));
        let json = profile.to_json().unwrap();

        assert!(json.contains("\"baseColor\":\"#333\""));
        assert!(json.contains("\"background\":0"));
        assert!(!json.contains("\"hide\""));
        assert!(json.contains("\"height\":80"));
    }

    #[test]
    fn minimal_profile_deserializes() {
        let profile = RecolorProfile::from_json(r##"{"baseColor":"red"}"##).unwrap();
        assert_eq!(profile.background, None);
        assert!(profile.hide.is_empty());
        assert_eq!(profile.raster, RasterOptions::default());
    }

    #[test]
    fn background_setting_accepts_number_or_string() {
        let level: BackgroundSetting = serde_json::from_str("255").unwrap();
        assert_eq!(level, BackgroundSetting::Level(255));

        let color: BackgroundSetting = serde_json::from_str("\"#1e1e1e\"").unwrap();
        assert_eq!(color, BackgroundSetting::Color("#1e1e1e".into()));
        assert!(matches!(color.resolve().unwrap(), Background::Color(_)));

        assert!(serde_json::from_str::<BackgroundSetting>("300").is_err());
    }

    #[test]
    fn background_setting_round_trips_through_background() {
        let dark = Background::Level(0);
        assert_eq!(BackgroundSetting::from(&dark).resolve().unwrap(), dark);

        let explicit = Background::Color(Color::parse("#102030").unwrap());
        assert_eq!(
            BackgroundSetting::from(&explicit),
            BackgroundSetting::Color("#102030".into())
        );
    }

    #[test]
    fn profile_builds_recolorer() {
        let recolorer = RecolorProfile::new("#333")
            .with_background(BackgroundSetting::Level(0))
            .recolorer()
            .unwrap();
        assert!(recolorer.is_dark());
        assert_eq!(recolorer.brand().to_hex(), "#333333");

        let bad = RecolorProfile::new("#33").recolorer();
        assert!(matches!(bad, Err(ColorError::Invalid(_))));

        let bad_bg = RecolorProfile::new("#333")
            .with_background(BackgroundSetting::Color("nope".into()))
            .recolorer();
        assert!(matches!(bad_bg, Err(ColorError::InvalidBackground(_))));
    }

    #[test]
    fn manifest_job_flattens_profile() {
        let json = r##"{
            "jobs": [
                { "input": "source/logo.svg", "outputs": ["build/svg/logo_dark.svg"], "baseColor": "#333", "background": 0 }
            ]
        }"##;
        let manifest = BuildManifest::from_json(json).unwrap();
        assert_eq!(manifest.jobs.len(), 1);
        assert_eq!(manifest.jobs[0].profile.base_color, "#333");
        assert_eq!(manifest.jobs[0].profile.background, Some(BackgroundSetting::Level(0)));
        assert!(manifest.splash.is_none());

        let restored = BuildManifest::from_json(&manifest.to_json_pretty().unwrap()).unwrap();
        assert_eq!(restored, manifest);
    }

    #[test]
    fn manifest_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        fs::write(&path, r#"{"jobs": []}"#).unwrap();
        assert!(BuildManifest::load(&path).unwrap().jobs.is_empty());

        fs::write(&path, "{").unwrap();
        assert!(matches!(BuildManifest::load(&path), Err(Error::Manifest(_))));
    }
}
