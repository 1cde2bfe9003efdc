//! Input watcher
//!
//! Polls the config files, the settings file and the workspace identity and
//! reports when any of them changed so the theme can be re-applied.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::debug;

use crate::config::ConfigPaths;
use crate::git::WorktreeIdentity;

/// Default polling interval in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Which input changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    UserConfig,
    WorkspaceConfig,
    Settings,
    Identity,
}

/// Events emitted by the watcher thread
#[derive(Debug, Clone)]
pub enum WatcherEvent {
    /// One or more inputs changed since the previous sample
    InputsChanged {
        reasons: Vec<ChangeReason>,
        at: DateTime<Utc>,
    },
}

/// Files and folder the watcher samples
#[derive(Debug, Clone)]
pub struct WatchedInputs {
    pub workspace_root: PathBuf,
    pub config: ConfigPaths,
    pub settings_file: PathBuf,
}

/// Snapshot of all watched inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    user_config: Option<SystemTime>,
    workspace_config: Option<SystemTime>,
    settings: Option<SystemTime>,
    identity: WorktreeIdentity,
}

impl Fingerprint {
    pub fn sample(inputs: &WatchedInputs) -> Self {
        Self {
            user_config: inputs.config.user.as_deref().and_then(modified),
            workspace_config: modified(&inputs.config.workspace),
            settings: modified(&inputs.settings_file),
            identity: WorktreeIdentity::resolve(&inputs.workspace_root),
        }
    }

    /// Inputs that differ from `previous`
    pub fn changes_since(&self, previous: &Fingerprint) -> Vec<ChangeReason> {
        let mut reasons = Vec::new();
        if self.user_config != previous.user_config {
            reasons.push(ChangeReason::UserConfig);
        }
        if self.workspace_config != previous.workspace_config {
            reasons.push(ChangeReason::WorkspaceConfig);
        }
        if self.settings != previous.settings {
            reasons.push(ChangeReason::Settings);
        }
        if self.identity != previous.identity {
            reasons.push(ChangeReason::Identity);
        }
        reasons
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Polling watcher for one workspace
pub struct Watcher {
    inputs: WatchedInputs,
    interval: Duration,
    last: Fingerprint,
}

impl Watcher {
    /// Create a watcher, taking the initial snapshot now
    pub fn new(inputs: WatchedInputs, interval: Duration) -> Self {
        let last = Fingerprint::sample(&inputs);
        Self {
            inputs,
            interval,
            last,
        }
    }

    /// Sample once and return an event if anything changed
    pub fn poll(&mut self) -> Option<WatcherEvent> {
        let current = Fingerprint::sample(&self.inputs);
        let reasons = current.changes_since(&self.last);
        self.last = current;

        if reasons.is_empty() {
            return None;
        }

        debug!("Watched inputs changed: {:?}", reasons);
        Some(WatcherEvent::InputsChanged {
            reasons,
            at: Utc::now(),
        })
    }

    /// Poll on a background thread until the receiver is dropped
    pub fn spawn(mut self, event_tx: mpsc::Sender<WatcherEvent>) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            loop {
                thread::sleep(self.interval);
                if let Some(event) = self.poll() {
                    if event_tx.send(event).is_err() {
                        debug!("Watcher receiver dropped, stopping");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_FILE_NAME;

    fn inputs(dir: &Path) -> WatchedInputs {
        WatchedInputs {
            workspace_root: dir.to_path_buf(),
            config: ConfigPaths {
                user: Some(dir.join("user-config.json")),
                workspace: dir.join(CONFIG_FILE_NAME),
            },
            settings_file: dir.join(".vscode").join("settings.json"),
        }
    }

    #[test]
    fn test_no_event_without_changes() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = Watcher::new(inputs(dir.path()), Duration::from_millis(10));
        assert!(watcher.poll().is_none());
    }

    #[test]
    fn test_new_config_file_is_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = Watcher::new(inputs(dir.path()), Duration::from_millis(10));

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{}").unwrap();

        let Some(WatcherEvent::InputsChanged { reasons, .. }) = watcher.poll() else {
            panic!("expected a change event");
        };
        assert_eq!(reasons, vec![ChangeReason::WorkspaceConfig]);
        assert!(watcher.poll().is_none());
    }

    #[test]
    fn test_removed_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = inputs(dir.path());
        std::fs::write(inputs.config.user.as_ref().unwrap(), "{}").unwrap();
        std::fs::create_dir_all(inputs.settings_file.parent().unwrap()).unwrap();
        std::fs::write(&inputs.settings_file, "{}").unwrap();

        let mut watcher = Watcher::new(inputs.clone(), Duration::from_millis(10));
        std::fs::remove_file(inputs.config.user.as_ref().unwrap()).unwrap();
        std::fs::remove_file(&inputs.settings_file).unwrap();

        let Some(WatcherEvent::InputsChanged { reasons, .. }) = watcher.poll() else {
            panic!("expected a change event");
        };
        assert_eq!(reasons, vec![ChangeReason::UserConfig, ChangeReason::Settings]);
    }

    #[test]
    fn test_identity_change_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = inputs(dir.path());
        let before = Fingerprint::sample(&inputs);

        let mut after = before.clone();
        after.identity = WorktreeIdentity::resolve(&dir.path().join("elsewhere"));

        assert_eq!(after.changes_since(&before), vec![ChangeReason::Identity]);
    }

    #[test]
    fn test_spawned_watcher_delivers_events() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = Watcher::new(inputs(dir.path()), Duration::from_millis(10));
        let (tx, rx) = mpsc::channel();
        let _handle = watcher.spawn(tx);

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{}").unwrap();

        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let WatcherEvent::InputsChanged { reasons, .. } = event;
        assert!(reasons.contains(&ChangeReason::WorkspaceConfig));
    }
}
