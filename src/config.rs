//! Configuration management for worktree-colors
//!
//! Settings come from up to two JSON files, layered key by key over the
//! built-in defaults: the per-user file in the platform config directory and the
//! per-workspace file in the workspace root. The workspace file wins.

use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::color::StyleParameters;

/// The name of the config file stored in the workspace root
pub const CONFIG_FILE_NAME: &str = ".worktree-colors.json";

/// Directory below the platform config dir holding the user config
pub const USER_CONFIG_DIR: &str = "worktree-colors";

/// Effective configuration after layering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Whether colors are managed at all; disabling removes them
    pub enabled: bool,
    /// Saturation in percent
    pub saturation: i32,
    /// Lightness in percent
    pub lightness: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            saturation: 44,
            lightness: 78,
        }
    }
}

/// One config file. Absent keys defer to the layer below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturation: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lightness: Option<i32>,
}

impl ConfigLayer {
    /// Load a layer, treating a missing file as empty
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let layer: ConfigLayer = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(layer)
    }

    /// Save the layer, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn apply_to(&self, config: &mut Config) {
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
        if let Some(saturation) = self.saturation {
            config.saturation = saturation;
        }
        if let Some(lightness) = self.lightness {
            config.lightness = lightness;
        }
    }
}

/// Where the config layers live for one workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    /// Per-user file, if the platform has a config directory
    pub user: Option<PathBuf>,
    /// Per-workspace file
    pub workspace: PathBuf,
}

impl ConfigPaths {
    pub fn for_workspace(workspace_root: &Path) -> Self {
        Self {
            user: dirs::config_dir().map(|dir| dir.join(USER_CONFIG_DIR).join("config.json")),
            workspace: workspace_root.join(CONFIG_FILE_NAME),
        }
    }

    /// All layer files, lowest precedence first
    pub fn layers(&self) -> impl Iterator<Item = &Path> {
        self.user
            .as_deref()
            .into_iter()
            .chain(std::iter::once(self.workspace.as_path()))
    }
}

impl Config {
    /// Load the effective config for a workspace
    pub fn load(paths: &ConfigPaths) -> Result<Self> {
        let mut config = Config::default();
        for path in paths.layers() {
            ConfigLayer::load(path)?.apply_to(&mut config);
        }
        Ok(config)
    }

    pub fn style(&self) -> StyleParameters {
        StyleParameters {
            saturation: self.saturation,
            lightness: self.lightness,
        }
    }
}
