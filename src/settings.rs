//! Editor workspace settings
//!
//! The theme ends up in `workbench.colorCustomizations` of the workspace's
//! `.vscode/settings.json`. Only the managed status bar keys are touched; every
//! other setting and color customization is preserved.

use color_eyre::eyre::{Context, Result, eyre};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::color::StatusBarTheme;

/// Settings key holding the color customization map
pub const COLOR_CUSTOMIZATIONS_KEY: &str = "workbench.colorCustomizations";

/// Settings directory and file inside a workspace
pub const SETTINGS_DIR: &str = ".vscode";
pub const SETTINGS_FILE: &str = "settings.json";

pub const STATUS_BAR_BACKGROUND: &str = "statusBar.background";
pub const STATUS_BAR_FOREGROUND: &str = "statusBar.foreground";
pub const STATUS_BAR_DEBUGGING_BACKGROUND: &str = "statusBar.debuggingBackground";
pub const STATUS_BAR_NO_FOLDER_BACKGROUND: &str = "statusBar.noFolderBackground";

/// Keys owned by this tool
pub const MANAGED_KEYS: [&str; 4] = [
    STATUS_BAR_BACKGROUND,
    STATUS_BAR_FOREGROUND,
    STATUS_BAR_DEBUGGING_BACKGROUND,
    STATUS_BAR_NO_FOLDER_BACKGROUND,
];

/// Contents of `workbench.colorCustomizations`
pub type ColorCustomizations = Map<String, Value>;

/// Key-value store the theme is written into
pub trait SettingsStore {
    /// Current color customizations (empty when none are set)
    fn read_color_customizations(&self) -> Result<ColorCustomizations>;

    /// Replace the color customizations
    fn write_color_customizations(&self, colors: &ColorCustomizations) -> Result<()>;
}

/// `.vscode/settings.json` of one workspace folder
#[derive(Debug, Clone)]
pub struct WorkspaceSettings {
    path: PathBuf,
}

impl WorkspaceSettings {
    pub fn for_workspace(workspace_root: &Path) -> Self {
        Self {
            path: workspace_root.join(SETTINGS_DIR).join(SETTINGS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings file: {}", self.path.display()))?;

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        let document: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", self.path.display()))?;

        match document {
            Value::Object(map) => Ok(map),
            _ => Err(eyre!(
                "Settings file is not a JSON object: {}",
                self.path.display()
            )),
        }
    }
}

impl SettingsStore for WorkspaceSettings {
    fn read_color_customizations(&self) -> Result<ColorCustomizations> {
        let document = self.read_document()?;
        match document.get(COLOR_CUSTOMIZATIONS_KEY) {
            Some(Value::Object(colors)) => Ok(colors.clone()),
            _ => Ok(Map::new()),
        }
    }

    fn write_color_customizations(&self, colors: &ColorCustomizations) -> Result<()> {
        let mut document = self.read_document()?;

        if colors.is_empty() {
            document.remove(COLOR_CUSTOMIZATIONS_KEY);
        } else {
            document.insert(
                COLOR_CUSTOMIZATIONS_KEY.to_string(),
                Value::Object(colors.clone()),
            );
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory: {}", parent.display())
            })?;
        }

        let mut content = serde_json::to_string_pretty(&Value::Object(document))
            .with_context(|| "Failed to serialize settings")?;
        content.push('\n');

        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write settings file: {}", self.path.display()))?;

        debug!("Wrote color customizations to {}", self.path.display());
        Ok(())
    }
}

/// Copy of `existing` with the theme in every managed slot
pub fn apply_theme(existing: &ColorCustomizations, theme: &StatusBarTheme) -> ColorCustomizations {
    let mut next = existing.clone();
    let background = Value::String(theme.background.clone());

    next.insert(STATUS_BAR_BACKGROUND.to_string(), background.clone());
    next.insert(
        STATUS_BAR_FOREGROUND.to_string(),
        Value::String(theme.foreground.clone()),
    );
    next.insert(STATUS_BAR_DEBUGGING_BACKGROUND.to_string(), background.clone());
    next.insert(STATUS_BAR_NO_FOLDER_BACKGROUND.to_string(), background);
    next
}

/// Copy of `existing` without any managed key
pub fn clear_managed(existing: &ColorCustomizations) -> ColorCustomizations {
    let mut next = existing.clone();
    for key in MANAGED_KEYS {
        next.remove(key);
    }
    next
}

/// Whether any managed key differs between the two maps
pub fn managed_colors_changed(before: &ColorCustomizations, after: &ColorCustomizations) -> bool {
    MANAGED_KEYS
        .iter()
        .any(|key| before.get(*key) != after.get(*key))
}
