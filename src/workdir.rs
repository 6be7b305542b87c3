use crate::error::Result;
use std::path::Path;
use tempfile::TempDir;

/// Scratch directory for a session's downloads. Call [WorkDir::close] when done so a failed
/// removal is reported; on early returns the directory is still removed when dropped.
pub struct WorkDir {
    dir: TempDir,
}

impl WorkDir {
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("mlhub-stac-").tempdir()?;
        Ok(Self { dir })
    }

    pub fn create_in<P: AsRef<Path>>(parent: P) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("mlhub-stac-")
            .tempdir_in(parent)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn close(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}
