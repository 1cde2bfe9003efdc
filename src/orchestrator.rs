//! Applies the worktree theme to the workspace settings
//!
//! Reads the layered config, resolves the workspace identity, derives the theme
//! and writes it into the settings store when a managed color actually changed.

use color_eyre::eyre::Result;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, TryLockError};
use tracing::{debug, info};

use crate::color::{self, StatusBarTheme};
use crate::config::{Config, ConfigPaths};
use crate::git::WorktreeIdentity;
use crate::settings::{self, SettingsStore};

/// Result of one apply round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The theme was written
    Applied {
        identity: WorktreeIdentity,
        theme: StatusBarTheme,
    },
    /// Managed colors were removed
    Cleared,
    /// Managed colors were already up to date
    Unchanged,
    /// Another update was in flight
    Skipped,
}

/// Everything derived for a workspace, without touching the settings
#[derive(Debug, Clone)]
pub struct Preview {
    pub identity: WorktreeIdentity,
    pub config: Config,
    pub hue: u16,
    pub theme: StatusBarTheme,
}

/// Wires config, identity, color and settings together for one workspace
pub struct Orchestrator<S> {
    workspace_root: PathBuf,
    config_paths: ConfigPaths,
    store: S,
    /// Held while an update runs; re-entrant requests are dropped
    updating: Mutex<()>,
}

impl<S: SettingsStore> Orchestrator<S> {
    pub fn new(workspace_root: &Path, config_paths: ConfigPaths, store: S) -> Self {
        Self {
            workspace_root: workspace_root.to_path_buf(),
            config_paths,
            store,
            updating: Mutex::new(()),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config_paths(&self) -> &ConfigPaths {
        &self.config_paths
    }

    /// Derive identity and theme without writing anything
    pub fn preview(&self) -> Result<Preview> {
        let config = Config::load(&self.config_paths)?;
        let identity = WorktreeIdentity::resolve(&self.workspace_root);
        let hue = color::hue(identity.as_str());
        let theme = color::build_theme(identity.as_str(), config.style());

        Ok(Preview {
            identity,
            config,
            hue,
            theme,
        })
    }

    /// Bring the settings in line with the current config and worktree
    pub fn apply(&self) -> Result<ApplyOutcome> {
        let Some(_guard) = self.try_begin_update() else {
            return Ok(ApplyOutcome::Skipped);
        };

        let preview = self.preview()?;
        if !preview.config.enabled {
            debug!("Worktree colors disabled, clearing managed colors");
            return self.clear_locked();
        }

        let existing = self.store.read_color_customizations()?;
        let next = settings::apply_theme(&existing, &preview.theme);

        if !settings::managed_colors_changed(&existing, &next) {
            debug!("Status bar colors already up to date");
            return Ok(ApplyOutcome::Unchanged);
        }

        self.store.write_color_customizations(&next)?;
        info!(
            "Applied {} to {}",
            preview.theme.background, preview.identity
        );

        Ok(ApplyOutcome::Applied {
            identity: preview.identity,
            theme: preview.theme,
        })
    }

    /// Remove the managed colors regardless of config
    pub fn clear(&self) -> Result<ApplyOutcome> {
        let Some(_guard) = self.try_begin_update() else {
            return Ok(ApplyOutcome::Skipped);
        };
        self.clear_locked()
    }

    fn clear_locked(&self) -> Result<ApplyOutcome> {
        let existing = self.store.read_color_customizations()?;
        let next = settings::clear_managed(&existing);

        if !settings::managed_colors_changed(&existing, &next) {
            return Ok(ApplyOutcome::Unchanged);
        }

        self.store.write_color_customizations(&next)?;
        info!("Cleared status bar colors for {}", self.workspace_root.display());
        Ok(ApplyOutcome::Cleared)
    }

    fn try_begin_update(&self) -> Option<MutexGuard<'_, ()>> {
        match self.updating.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => {
                debug!("Update already in progress, skipping");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CONFIG_FILE_NAME, ConfigLayer};
    use crate::settings::{ColorCustomizations, STATUS_BAR_BACKGROUND};
    use serde_json::{Value, json};
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::thread;

    /// In-memory store counting writes
    #[derive(Default)]
    struct MemoryStore {
        colors: Mutex<ColorCustomizations>,
        writes: Mutex<usize>,
    }

    impl SettingsStore for MemoryStore {
        fn read_color_customizations(&self) -> Result<ColorCustomizations> {
            Ok(self.colors.lock().unwrap().clone())
        }

        fn write_color_customizations(&self, colors: &ColorCustomizations) -> Result<()> {
            *self.colors.lock().unwrap() = colors.clone();
            *self.writes.lock().unwrap() += 1;
            Ok(())
        }
    }

    /// Store whose writes wait until the test releases them
    struct GatedStore {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl SettingsStore for GatedStore {
        fn read_color_customizations(&self) -> Result<ColorCustomizations> {
            Ok(ColorCustomizations::new())
        }

        fn write_color_customizations(&self, _colors: &ColorCustomizations) -> Result<()> {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            Ok(())
        }
    }

    fn workspace() -> (tempfile::TempDir, ConfigPaths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths {
            user: None,
            workspace: dir.path().join(CONFIG_FILE_NAME),
        };
        (dir, paths)
    }

    #[test]
    fn test_apply_writes_theme_once() {
        let (dir, paths) = workspace();
        let orchestrator = Orchestrator::new(dir.path(), paths, MemoryStore::default());

        let (identity, theme) = match orchestrator.apply().unwrap() {
            ApplyOutcome::Applied { identity, theme } => (identity, theme),
            other => panic!("expected Applied, got {:?}", other),
        };
        assert_eq!(
            identity,
            WorktreeIdentity::resolve(&std::fs::canonicalize(dir.path()).unwrap())
        );
        assert_eq!(theme.foreground, "#1f2937");

        let stored = orchestrator.store.read_color_customizations().unwrap();
        assert_eq!(stored[STATUS_BAR_BACKGROUND], Value::String(theme.background));

        assert_eq!(orchestrator.apply().unwrap(), ApplyOutcome::Unchanged);
        assert_eq!(*orchestrator.store.writes.lock().unwrap(), 1);
    }

    #[test]
    fn test_apply_keeps_unrelated_customizations() {
        let (dir, paths) = workspace();
        let store = MemoryStore::default();
        store
            .colors
            .lock()
            .unwrap()
            .insert("editor.background".to_string(), json!("#000000"));
        let orchestrator = Orchestrator::new(dir.path(), paths, store);

        orchestrator.apply().unwrap();

        let stored = orchestrator.store.read_color_customizations().unwrap();
        assert_eq!(stored["editor.background"], "#000000");
        assert_eq!(stored.len(), 5);
    }

    #[test]
    fn test_disabled_config_clears_colors() {
        let (dir, paths) = workspace();
        let orchestrator = Orchestrator::new(dir.path(), paths.clone(), MemoryStore::default());
        assert!(matches!(
            orchestrator.apply().unwrap(),
            ApplyOutcome::Applied { .. }
        ));

        ConfigLayer {
            enabled: Some(false),
            ..Default::default()
        }
        .save(&paths.workspace)
        .unwrap();

        assert_eq!(orchestrator.apply().unwrap(), ApplyOutcome::Cleared);
        assert!(orchestrator.store.read_color_customizations().unwrap().is_empty());
        assert_eq!(orchestrator.apply().unwrap(), ApplyOutcome::Unchanged);
    }

    #[test]
    fn test_config_change_rewrites_theme() {
        let (dir, paths) = workspace();
        let orchestrator = Orchestrator::new(dir.path(), paths.clone(), MemoryStore::default());
        orchestrator.apply().unwrap();

        ConfigLayer {
            lightness: Some(30),
            ..Default::default()
        }
        .save(&paths.workspace)
        .unwrap();

        let theme = match orchestrator.apply().unwrap() {
            ApplyOutcome::Applied { theme, .. } => theme,
            other => panic!("expected Applied, got {:?}", other),
        };
        assert_eq!(theme.foreground, "#f9fafb");
        assert_eq!(*orchestrator.store.writes.lock().unwrap(), 2);
    }

    #[test]
    fn test_clear_without_managed_colors_is_unchanged() {
        let (dir, paths) = workspace();
        let orchestrator = Orchestrator::new(dir.path(), paths, MemoryStore::default());
        assert_eq!(orchestrator.clear().unwrap(), ApplyOutcome::Unchanged);
        assert_eq!(*orchestrator.store.writes.lock().unwrap(), 0);
    }

    #[test]
    fn test_concurrent_apply_is_skipped() {
        let (dir, paths) = workspace();
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let store = GatedStore {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        };
        let orchestrator = Arc::new(Orchestrator::new(dir.path(), paths, store));

        let background = Arc::clone(&orchestrator);
        let handle = thread::spawn(move || background.apply().unwrap());

        entered_rx.recv().unwrap();
        assert_eq!(orchestrator.apply().unwrap(), ApplyOutcome::Skipped);

        release_tx.send(()).unwrap();
        assert!(matches!(
            handle.join().unwrap(),
            ApplyOutcome::Applied { .. }
        ));
    }

    #[test]
    fn test_preview_uses_config_style() {
        let (dir, paths) = workspace();
        ConfigLayer {
            saturation: Some(100),
            lightness: Some(50),
            ..Default::default()
        }
        .save(&paths.workspace)
        .unwrap();
        let orchestrator = Orchestrator::new(dir.path(), paths, MemoryStore::default());

        let preview = orchestrator.preview().unwrap();
        assert_eq!(preview.hue, color::hue(preview.identity.as_str()));
        assert_eq!(preview.theme.background, color::to_hex(preview.hue, 100, 50));
        assert_eq!(*orchestrator.store.writes.lock().unwrap(), 0);
    }
}
