// ABOUTME: Advisory lock guarding the tracking store against concurrent invocations.
// ABOUTME: Uses atomic file creation with lock info stored next to the tracking file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::TrackingError;

/// Information about who holds a tracking lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    /// Target org the tracking store belongs to.
    pub target: String,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new(target: &str) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            target: target.to_string(),
        }
    }

    /// Check if this lock is stale (older than 1 hour).
    pub fn is_stale(&self) -> bool {
        let age = Utc::now() - self.started_at;
        age.num_hours() >= 1
    }
}

/// A held tracking lock that releases on drop.
#[derive(Debug)]
pub struct TrackingLock {
    path: PathBuf,
}

impl TrackingLock {
    /// Acquire the lock file at `path`.
    ///
    /// Creation uses `create_new` so two processes cannot both succeed.
    /// Stale (>1 hour) or unreadable locks are broken with a warning.
    pub fn acquire(path: &Path, target: &str) -> Result<Self, TrackingError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| TrackingError::io(parent, e))?;
        }

        let info = LockInfo::new(target);
        let json = serde_json::to_string(&info)
            .map_err(|e| TrackingError::Lock(format!("failed to serialize lock: {e}")))?;

        if Self::try_create(path, &json)? {
            return Ok(Self {
                path: path.to_path_buf(),
            });
        }

        match fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str::<LockInfo>(&s).ok())
        {
            Some(existing) if !existing.is_stale() => {
                return Err(TrackingError::LockHeld {
                    holder: existing.holder,
                    pid: existing.pid,
                    started_at: existing.started_at,
                });
            }
            Some(existing) => tracing::warn!(
                "Auto-breaking stale tracking lock held by {} (pid {}) since {}",
                existing.holder,
                existing.pid,
                existing.started_at
            ),
            None => tracing::warn!("Tracking lock info unreadable, breaking lock"),
        }

        fs::remove_file(path).map_err(|e| TrackingError::io(path, e))?;
        if Self::try_create(path, &json)? {
            Ok(Self {
                path: path.to_path_buf(),
            })
        } else {
            Err(TrackingError::Lock(
                "lock acquired by another process during break".to_string(),
            ))
        }
    }

    /// Returns false when the file already exists.
    fn try_create(path: &Path, contents: &str) -> Result<bool, TrackingError> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                file.write_all(contents.as_bytes())
                    .map_err(|e| TrackingError::io(path, e))?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(TrackingError::io(path, e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TrackingLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("failed to release tracking lock {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_info_creates_with_current_host_and_pid() {
        let info = LockInfo::new("dev");

        assert_eq!(info.target, "dev");
        assert_eq!(info.pid, std::process::id());
        assert!(!info.holder.is_empty());
    }

    #[test]
    fn old_lock_is_stale() {
        let mut info = LockInfo::new("dev");
        assert!(!info.is_stale());
        info.started_at = Utc::now() - chrono::Duration::hours(2);
        assert!(info.is_stale());
    }

    #[test]
    fn second_acquire_fails_until_released() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orgs/dev/tracking.lock");

        let lock = TrackingLock::acquire(&path, "dev").unwrap();
        let err = TrackingLock::acquire(&path, "dev").unwrap_err();
        assert!(matches!(err, TrackingError::LockHeld { pid, .. } if pid == std::process::id()));

        drop(lock);
        assert!(!path.exists());
        TrackingLock::acquire(&path, "dev").unwrap();
    }

    #[test]
    fn breaks_stale_and_corrupt_locks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracking.lock");

        let mut stale = LockInfo::new("dev");
        stale.started_at = Utc::now() - chrono::Duration::hours(3);
        fs::write(&path, serde_json::to_string(&stale).unwrap()).unwrap();
        let lock = TrackingLock::acquire(&path, "dev").unwrap();
        drop(lock);

        fs::write(&path, "not json").unwrap();
        let _lock = TrackingLock::acquire(&path, "dev").unwrap();
        let current: LockInfo =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(current.pid, std::process::id());
    }
}
