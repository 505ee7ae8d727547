//! # Process file.
//!
//! While the app runs, a marker file holds its pid. The file is created with
//! create-new semantics: if it already exists another instance is assumed to be
//! running and launch fails, reporting the pid found inside.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::error::RuntimeError;

/// Creates `path` and writes the current pid into it.
pub(crate) fn create(path: &Path) -> Result<(), RuntimeError> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            let pid = fs::read_to_string(path)
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            return Err(RuntimeError::AlreadyRunning {
                path: path.to_path_buf(),
                pid,
            });
        }
        Err(source) => {
            return Err(RuntimeError::ProcessFile {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    write!(file, "{}", std::process::id()).map_err(|source| RuntimeError::ProcessFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Removes `path`; failures are logged, never returned.
pub(crate) fn remove(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        tracing::error!(path = %path.display(), error = %err, "failed to remove process file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_writes_pid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.pid");

        create(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, std::process::id().to_string());

        remove(&path);
        assert!(!path.exists());
    }

    #[test]
    fn test_existing_file_reports_recorded_pid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.pid");
        fs::write(&path, "4242\n").unwrap();

        match create(&path) {
            Err(RuntimeError::AlreadyRunning { pid, .. }) => assert_eq!(pid.as_deref(), Some("4242")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "4242\n");
    }

    #[test]
    fn test_missing_directory_is_a_process_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("app.pid");

        let err = create(&path).unwrap_err();
        assert_eq!(err.as_label(), "runtime_process_file");
    }
}
