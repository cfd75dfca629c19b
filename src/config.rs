use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level settings for the exif-desk backend.
///
/// Controls rename patterns, health-check rules, keyword suggestion ranking,
/// country normalization for geocoding, and where to find ExifTool.
///
/// # Loading
///
/// ```rust,no_run
/// use exif_desk::config::Settings;
///
/// // From a JSON file
/// let settings = Settings::load(Some("settings.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut settings = Settings::default();
/// settings.rename.pattern = "${DateTimeOriginal:%Y%m%d}_${Title}".into();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Startup behavior and folder memory.
    pub app_behavior: AppBehavior,
    /// Filename pattern and extension casing rules.
    pub rename: RenameSettings,
    /// Rules applied by the batch health check.
    pub health: HealthRules,
    /// Keyword suggestion ranking knobs.
    pub sorting: SortingSettings,
    /// Country code → display name normalization used by geocoding.
    pub country_mappings: Vec<CountryMapping>,
    /// ExifTool executable; a bare name resolves through PATH.
    pub exiftool_path: String,
    /// User agent sent to the reverse-geocoding service.
    pub geocoding_user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppBehavior {
    /// `"last"` reopens the previous folder, `"fixed"` always opens `fixed_path`.
    pub startup_mode: String,
    pub fixed_path: String,
    pub last_opened_folder: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameSettings {
    /// Filename pattern with `${Tag}` / `${Tag:%fmt}` placeholders.
    pub pattern: String,
    pub extension_rules: Vec<ExtensionRule>,
}

/// Casing rule for one file extension after a rename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionRule {
    /// Extension including the leading dot, e.g. `".cr2"`.
    pub extension: String,
    pub casing: Casing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Casing {
    Lowercase,
    Uppercase,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HealthRules {
    /// Field names that must hold a non-empty value.
    pub required_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SortingSettings {
    /// Score bonus applied to recently used keywords.
    pub recency_bonus: i64,
    /// Window in days in which a use counts as recent.
    pub recency_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryMapping {
    /// ISO 3166-1 alpha-2 code, case-insensitive.
    pub code: String,
    /// The name to write into country fields for this code.
    pub name: String,
}

impl Default for AppBehavior {
    fn default() -> Self {
        Self {
            startup_mode: "last".to_string(),
            fixed_path: String::new(),
            last_opened_folder: None,
        }
    }
}

impl Default for RenameSettings {
    fn default() -> Self {
        Self {
            pattern: "${DateTimeOriginal:%Y%m%d_%H%M%S}_${Title}".to_string(),
            extension_rules: vec![
                ExtensionRule::lowercase(".jpg"),
                ExtensionRule::lowercase(".jpeg"),
                ExtensionRule::lowercase(".png"),
                ExtensionRule::lowercase(".gif"),
                ExtensionRule::lowercase(".tiff"),
                ExtensionRule::uppercase(".cr2"),
                ExtensionRule::uppercase(".nef"),
                ExtensionRule::uppercase(".arw"),
                ExtensionRule::uppercase(".dng"),
            ],
        }
    }
}

impl ExtensionRule {
    fn lowercase(extension: &str) -> Self {
        Self {
            extension: extension.to_string(),
            casing: Casing::Lowercase,
        }
    }

    fn uppercase(extension: &str) -> Self {
        Self {
            extension: extension.to_string(),
            casing: Casing::Uppercase,
        }
    }
}

impl Default for SortingSettings {
    fn default() -> Self {
        Self {
            recency_bonus: 100,
            recency_days: 7,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_behavior: AppBehavior::default(),
            rename: RenameSettings::default(),
            health: HealthRules::default(),
            sorting: SortingSettings::default(),
            country_mappings: Vec::new(),
            exiftool_path: "exiftool".to_string(),
            geocoding_user_agent: "exif-desk".to_string(),
        }
    }
}

impl Settings {
    /// Resolve the settings file path — same directory as the executable.
    pub fn settings_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("settings.json"))
    }

    /// Load settings from the given path, or from the default location.
    ///
    /// A missing file falls back to defaults; unknown keys are ignored and
    /// missing sections are filled in from defaults, so older settings files
    /// keep working after upgrades.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::settings_path()?,
        };

        if !settings_path.exists() {
            log::warn!(
                "Settings file not found at {}. Using defaults.",
                settings_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&settings_path).context("Failed to read settings file")?;
        let settings: Settings =
            serde_json::from_str(&contents).context("Failed to parse settings file")?;
        Ok(settings)
    }

    /// Save settings to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let settings_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::settings_path()?,
        };

        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(&settings_path, contents).context("Failed to write settings file")?;
        log::info!("Settings saved to {}", settings_path.display());
        Ok(())
    }
}
