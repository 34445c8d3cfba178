//! Directory handler.

use crate::core::error::StepError;
use std::path::Path;

/// Create `path` and any missing parents.
pub fn create(path: &Path) -> Result<(), StepError> {
    std::fs::create_dir_all(path).map_err(|e| StepError::DirectoryCreate {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("home/vagrant/dev/buildbox");
        create(&target).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_create_existing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        create(dir.path()).unwrap();
        assert!(dir.path().is_dir());
    }

    #[test]
    fn test_create_on_existing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Makefile");
        std::fs::write(&file, "all:").unwrap();
        assert!(create(&file).is_err());
    }

    #[test]
    fn test_create_over_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("blocker");
        std::fs::write(&file, "x").unwrap();
        let err = create(&file.join("child")).unwrap_err();
        assert!(matches!(err, StepError::DirectoryCreate { .. }));
    }
}
