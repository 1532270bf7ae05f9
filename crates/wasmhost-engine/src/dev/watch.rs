//! File watching for dev mode
//!
//! Watches the parent directory of every module payload (editors often
//! replace files rather than write them in place) and forwards create and
//! modify events for exactly the watched files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crossbeam::channel::Sender;
use notify::{recommended_watcher, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::config::normalize_path;
use crate::dev::ChangeEvent;
use crate::error::{Error, Result};

/// Keeps an OS watcher alive; dropping it stops event delivery
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    files: BTreeSet<PathBuf>,
}

impl FileWatcher {
    /// Watch `files` and send a [`ChangeEvent`] for each change
    pub fn spawn(
        files: impl IntoIterator<Item = PathBuf>,
        sender: Sender<ChangeEvent>,
    ) -> Result<Self> {
        let files: BTreeSet<PathBuf> = files.into_iter().map(|f| normalize_path(&f)).collect();
        let watched = files.clone();

        let mut watcher = recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    return;
                }
                for path in event.paths {
                    let path = normalize_path(&path);
                    if watched.contains(&path) {
                        debug!(path = %path.display(), "watched file changed");
                        let _ = sender.send(ChangeEvent::new(path));
                    }
                }
            }
            Err(e) => warn!(error = %e, "file watcher error"),
        })
        .map_err(|e| watch_error(Path::new("."), e))?;

        let parents: BTreeSet<&Path> = files
            .iter()
            .filter_map(|f| f.parent())
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        for parent in parents {
            watcher
                .watch(parent, RecursiveMode::NonRecursive)
                .map_err(|e| watch_error(parent, e))?;
        }

        Ok(Self {
            _watcher: watcher,
            files,
        })
    }

    /// Files being watched
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }
}

fn watch_error(path: &Path, e: notify::Error) -> Error {
    Error::io(path, std::io::Error::other(e.to_string()))
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("files", &self.files)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_spawn_watches_normalized_files() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("add.wasm");
        std::fs::write(&file, b"\0asm").unwrap();
        let (tx, _rx) = crossbeam::channel::unbounded();

        let watcher = FileWatcher::spawn(vec![dir.path().join("./x/../add.wasm")], tx).unwrap();
        let files: Vec<&Path> = watcher.files().collect();
        assert_eq!(files, vec![file.as_path()]);
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let (tx, _rx) = crossbeam::channel::unbounded();
        let missing = dir.path().join("gone/add.wasm");
        assert!(matches!(
            FileWatcher::spawn(vec![missing], tx),
            Err(Error::Io { .. })
        ));
    }
}
