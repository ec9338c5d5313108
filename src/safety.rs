use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub fn backup_path(source_file: &Path) -> PathBuf {
    let mut backup = source_file.to_path_buf();
    let name = format!(
        ".{}.mutscore.bak",
        source_file.file_name().unwrap_or_default().to_string_lossy()
    );
    backup.set_file_name(name);
    backup
}

/// Check if a backup file exists from a previous interrupted run.
pub fn check_interrupted_run(source_file: &Path) -> Option<PathBuf> {
    let bak = backup_path(source_file);
    if bak.exists() { Some(bak) } else { None }
}

/// Restore source from backup file and remove the backup.
pub fn restore_from_backup(source_file: &Path, backup_file: &Path) -> io::Result<()> {
    fs::copy(backup_file, source_file)?;
    fs::remove_file(backup_file)?;
    clear_pycache(source_file);
    Ok(())
}

/// Exclusive ownership of one source file for the length of a mutation cycle.
///
/// Acquiring reads the file and writes a durable backup beside it. The
/// original content is written back by [`RestoreGuard::restore`], or by
/// `Drop` if the guard goes away first (early return, panic unwinding).
#[derive(Debug)]
pub struct RestoreGuard {
    path: PathBuf,
    backup: PathBuf,
    original: String,
    restored: bool,
}

impl RestoreGuard {
    /// Fails with `AlreadyExists` when a backup is already present: the file
    /// may still hold a mutant from an interrupted run and must be recovered
    /// first.
    pub fn acquire(path: &Path) -> io::Result<Self> {
        let original = fs::read_to_string(path)?;
        let backup = backup_path(path);
        let mut file = OpenOptions::new().write(true).create_new(true).open(&backup)?;
        if let Err(e) = file.write_all(original.as_bytes()).and_then(|()| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&backup);
            return Err(e);
        }
        tracing::debug!(path = %path.display(), backup = %backup.display(), "backed up");
        Ok(Self {
            path: path.to_path_buf(),
            backup,
            original,
            restored: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup(&self) -> &Path {
        &self.backup
    }

    /// Content of the file at acquisition time.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Write the original content back and remove the backup. On failure the
    /// guard stays armed and `Drop` tries once more.
    pub fn restore(&mut self) -> io::Result<()> {
        self.write_back()?;
        self.restored = true;
        Ok(())
    }

    fn write_back(&self) -> io::Result<()> {
        // Leave a file the mutant never reached alone; it may not be writable.
        let unchanged = fs::read_to_string(&self.path).is_ok_and(|current| current == self.original);
        if !unchanged {
            fs::write(&self.path, &self.original)?;
        }
        match fs::remove_file(&self.backup) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
            _ => {}
        }
        clear_pycache(&self.path);
        Ok(())
    }
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        match self.write_back() {
            Ok(()) => tracing::warn!(path = %self.path.display(), "restored original content on abnormal exit"),
            Err(e) => tracing::error!(
                path = %self.path.display(),
                backup = %self.backup.display(),
                error = %e,
                "CRITICAL: failed to restore original content; recover it from the backup"
            ),
        }
    }
}

/// Drop stale bytecode for a Python source so the next import re-reads the
/// file even when the rewrite kept its mtime.
fn clear_pycache(source_file: &Path) {
    if source_file.extension().is_none_or(|ext| ext != "py") {
        return;
    }
    let (Some(parent), Some(stem)) = (source_file.parent(), source_file.file_stem()) else {
        return;
    };
    let cache_dir = parent.join("__pycache__");
    let Ok(entries) = fs::read_dir(&cache_dir) else {
        return;
    };
    let prefix = format!("{}.", stem.to_string_lossy());
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(&prefix) && name.ends_with(".pyc") {
            let _ = fs::remove_file(entry.path());
        }
    }
}
