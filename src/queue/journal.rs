//! Append-only SQL journal with size-based rotation.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{error, info};

/// Journal line for an accepted write: `/* <ts> */  <sql>;`
pub fn format_entry(at: DateTime<Local>, sql: &str) -> String {
    format!("/* {} */  {};\n", at.format("%Y-%m-%d %H-%M-%S"), sql)
}

/// Failure journal line: `/* [<ts>][<error>] */  <sql>;`
pub fn format_failure(at: DateTime<Local>, error: &str, sql: &str) -> String {
    format!(
        "/* [{}][{}] */  {};\n",
        at.format("%Y-%m-%d %H-%M-%S"),
        error,
        sql
    )
}

/// Path a journal is renamed to when rotated at `at`.
pub fn rotated_path(path: &Path, at: DateTime<Local>) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!("_{}.bak", at.format("%Y%m%d_%H%M%S")));
    PathBuf::from(name)
}

/// An open journal file.
pub struct Journal {
    path: PathBuf,
    file: File,
    written: u64,
    max_bytes: u64,
}

impl Journal {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64) -> io::Result<Self> {
        let path = path.into();
        let file = open_append(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            file,
            written,
            max_bytes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line and flushes it to the file.
    pub fn append(&mut self, line: &str) -> io::Result<()> {
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        self.written += line.len() as u64;
        Ok(())
    }

    /// Rotates once the file has reached its size limit.
    ///
    /// A failed rotation is logged and the current handle stays in use.
    pub fn rotate_if_needed(&mut self) {
        if self.written < self.max_bytes {
            return;
        }
        match self.rotate() {
            Ok(backup) => info!(
                "Journal {} rotated to {}",
                self.path.display(),
                backup.display()
            ),
            Err(e) => error!("Journal {} rotation failed: {}", self.path.display(), e),
        }
    }

    fn rotate(&mut self) -> io::Result<PathBuf> {
        let backup = rotated_path(&self.path, Local::now());
        fs::rename(&self.path, &backup)?;
        let file = open_append(&self.path)?;
        self.file = file;
        self.written = 0;
        Ok(backup)
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap()
    }

    #[test]
    fn test_line_formats() {
        assert_eq!(
            format_entry(fixed_time(), "DELETE FROM t WHERE id=1"),
            "/* 2024-03-09 07-05-02 */  DELETE FROM t WHERE id=1;\n"
        );
        assert_eq!(
            format_failure(fixed_time(), "no such table: t", "DELETE FROM t WHERE id=1"),
            "/* [2024-03-09 07-05-02][no such table: t] */  DELETE FROM t WHERE id=1;\n"
        );
    }

    #[test]
    fn test_rotated_path() {
        let path = rotated_path(Path::new("/tmp/users_async_sql.sql"), fixed_time());
        assert_eq!(path, PathBuf::from("/tmp/users_async_sql.sql_20240309_070502.bak"));
    }

    #[test]
    fn test_append_and_reopen_counts_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("j.sql");

        let mut journal = Journal::open(&path, 1024).unwrap();
        journal.append("abc\n").unwrap();
        drop(journal);

        let journal = Journal::open(&path, 1024).unwrap();
        assert_eq!(journal.written, 4);
        assert_eq!(fs::read_to_string(&path).unwrap(), "abc\n");
    }

    #[test]
    fn test_rotation_creates_backup_and_fresh_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("j.sql");

        let mut journal = Journal::open(&path, 8).unwrap();
        journal.append("0123456789\n").unwrap();
        journal.rotate_if_needed();
        journal.append("next\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "next\n");
        let backups: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".bak"))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(
            fs::read_to_string(backups[0].path()).unwrap(),
            "0123456789\n"
        );
    }

    #[test]
    fn test_rotation_failure_keeps_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("j.sql");

        let mut journal = Journal::open(&path, 1).unwrap();
        journal.append("a\n").unwrap();
        fs::remove_file(&path).unwrap();

        journal.rotate_if_needed();
        assert!(journal.append("b\n").is_ok());
    }
}
