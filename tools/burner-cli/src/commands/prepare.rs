//! Create the default input and output directories.

use std::fs;
use std::path::Path;

use burner_common::BurnerError;

pub fn run(base: &Path) -> anyhow::Result<()> {
    for (dir, role) in [("in", "input"), ("out", "output")] {
        let path = base.join(dir);
        fs::create_dir_all(&path).map_err(|e| {
            BurnerError::setup(format!("was not able to create {role} dir {}: {e}", path.display()))
        })?;
        println!("Created {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_both_directories() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path()).unwrap();
        assert!(dir.path().join("in").is_dir());
        assert!(dir.path().join("out").is_dir());

        // running again is harmless
        run(dir.path()).unwrap();
    }

    #[test]
    fn test_blocked_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("in"), b"file in the way").unwrap();
        let err = run(dir.path()).unwrap_err();
        let err = err.downcast::<BurnerError>().unwrap();
        assert!(err.is_fatal());
    }
}
