//! Workspace management - exclusive scratch directories for plan archives.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

/// One plan archive extracted into a scratch directory.
///
/// The directory is wholly owned by the item being processed; two live items
/// must never share one, or extraction silently corrupts the other item's
/// inputs. Callers hand each item its own path.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Extract `archive` (`.zip` or `.tar.bz2`) into `scratch`.
    pub fn extract(archive: &Path, scratch: &Path) -> Result<Self> {
        std::fs::create_dir_all(scratch)?;

        let name = archive
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        if name.ends_with(".zip") {
            let file = File::open(archive)?;
            let mut zip = zip::ZipArchive::new(file)?;
            zip.extract(scratch)?;
        } else if name.ends_with(".tar.bz2") {
            let file = File::open(archive)?;
            let decoder = bzip2::read::BzDecoder::new(file);
            let mut tarball = tar::Archive::new(decoder);
            tarball.unpack(scratch)?;
        } else {
            return Err(PipelineError::UnsupportedArchive(archive.to_path_buf()));
        }

        Ok(Self {
            root: scratch.to_path_buf(),
        })
    }

    /// Wrap an already-extracted directory.
    pub fn open(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn domain_file(&self) -> PathBuf {
        self.root.join(super::DOMAIN_FILE)
    }

    /// Copy the workspace's current file set under `dst` for post-mortem
    /// inspection of a failed item.
    pub fn snapshot_to(&self, dst: &Path) -> Result<()> {
        copy_dir_recursive(&self.root, dst)
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;

    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zip_archive(dir: &Path, entries: &[(&str, &str)]) -> PathBuf {
        let path = dir.join("item.zip");
        let file = File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default();
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn test_zip_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let archive = zip_archive(dir.path(), &[("obs.dat", "(pickup a)\n")]);

        let scratch = dir.path().join("scratch");
        let workspace = Workspace::extract(&archive, &scratch).unwrap();
        let content = std::fs::read_to_string(workspace.root().join("obs.dat")).unwrap();
        assert_eq!(content, "(pickup a)\n");
    }

    #[test]
    fn test_unknown_format_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("item.rar");
        std::fs::write(&path, b"junk").unwrap();

        let err = Workspace::extract(&path, &dir.path().join("scratch")).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedArchive(_)));
    }

    #[test]
    fn test_snapshot_copies_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("ws");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("obs.dat"), "x").unwrap();

        let workspace = Workspace::open(&root);
        let snap = dir.path().join("snap");
        workspace.snapshot_to(&snap).unwrap();
        assert_eq!(std::fs::read_to_string(snap.join("obs.dat")).unwrap(), "x");
    }
}
