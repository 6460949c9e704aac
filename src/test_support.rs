use crate::context::ProjectContext;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};
use tempfile::TempDir;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// Create an initialized scratch project: a temp dir with the `.broom`
/// state tree already in place.
pub(crate) fn create_test_project() -> (TempDir, ProjectContext) {
    let temp_dir = TempDir::new().unwrap();
    let ctx = ProjectContext::resolve_from(temp_dir.path()).unwrap();

    std::fs::create_dir_all(&ctx.state_dir).unwrap();
    std::fs::create_dir_all(&ctx.backups_dir).unwrap();
    std::fs::create_dir_all(&ctx.locks_dir).unwrap();
    std::fs::create_dir_all(ctx.events_dir()).unwrap();
    std::fs::create_dir_all(ctx.reports_dir()).unwrap();

    (temp_dir, ctx)
}

/// Write a file under the project root, creating parent directories.
pub(crate) fn write_file(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}
