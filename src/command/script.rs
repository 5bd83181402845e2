// src/command/script.rs

//! Scoped temporary script/recipe files.
//!
//! A [`TempScriptFile`] is written and closed on creation and removed when
//! dropped, so it goes away on success, on error, and when the owning action
//! future is dropped on cancellation. Names are unique per file
//! (`tempfile`'s random suffix), so concurrent actions never collide.

use std::io::Write;
use std::path::Path;

use tempfile::{Builder, TempPath};
use tracing::debug;

use crate::errors::Result;

#[derive(Debug)]
pub struct TempScriptFile {
    path: TempPath,
}

impl TempScriptFile {
    /// Write `body` verbatim to a fresh file in `dir`, appending a trailing
    /// newline if the body lacks one.
    pub fn create(
        dir: &Path,
        prefix: &str,
        suffix: &str,
        body: &str,
        executable: bool,
    ) -> Result<Self> {
        let mut file = Builder::new().prefix(prefix).suffix(suffix).tempfile_in(dir)?;
        file.write_all(body.as_bytes())?;
        if !body.ends_with('\n') {
            file.write_all(b"\n")?;
        }
        file.flush()?;

        // Close the handle: executing a file still open for writing fails
        // with ETXTBSY on Linux.
        let path = file.into_temp_path();

        if executable {
            make_executable(&path)?;
        }

        debug!(path = %path.display(), bytes = body.len(), "wrote temp script");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the file.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("/"))
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_is_written_verbatim_and_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let script =
                TempScriptFile::create(dir.path(), "run-", ".sh", "echo 'Echo'", true).unwrap();
            let contents = std::fs::read_to_string(script.path()).unwrap();
            assert_eq!(contents, "echo 'Echo'\n");
            script.path().to_path_buf()
        };
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn executable_bit_is_set() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = TempScriptFile::create(dir.path(), "run-", ".sh", "true\n", true).unwrap();
        let mode = std::fs::metadata(script.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = TempScriptFile::create(dir.path(), "run-", ".sh", "a", false).unwrap();
        let b = TempScriptFile::create(dir.path(), "run-", ".sh", "a", false).unwrap();
        assert_ne!(a.path(), b.path());
    }
}
