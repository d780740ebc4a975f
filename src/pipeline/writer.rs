use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use super::files::backup_path;

/// Whole-file writes. The orchestrator only touches disk through this.
pub trait DocWriter {
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;
}

/// Writes through a temp file in the target directory, then renames over the target.
pub struct FsWriter;

impl DocWriter for FsWriter {
    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        write_atomic(path, contents)
    }
}

pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[derive(Debug)]
pub enum ReplaceError {
    Backup(io::Error),
    Write(io::Error),
}

/// Saves `original` next to `path` under `suffix`, then overwrites `path` with `contents`.
/// The overwrite is never attempted if the backup failed.
pub fn write_with_backup(
    writer: &dyn DocWriter,
    path: &Path,
    original: &str,
    contents: &str,
    suffix: &str,
) -> Result<(), ReplaceError> {
    let backup = backup_path(path, suffix);
    writer.write(&backup, original).map_err(ReplaceError::Backup)?;
    writer.write(path, contents).map_err(ReplaceError::Write)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io;
    use std::path::{Path, PathBuf};

    use super::{write_atomic, write_with_backup, DocWriter, FsWriter, ReplaceError};

    /// Real writes, except the path named `fail_on` errors out.
    struct FailingWriter {
        fail_on: PathBuf,
        calls: RefCell<Vec<PathBuf>>,
    }

    impl DocWriter for FailingWriter {
        fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
            self.calls.borrow_mut().push(path.to_path_buf());
            if path == self.fail_on {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "disk says no"));
            }
            FsWriter.write(path, contents)
        }
    }

    #[test]
    fn overwrite_failure_leaves_backup_and_original() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("b.mdx");
        std::fs::write(&doc, "original\n").unwrap();
        let w = FailingWriter {
            fail_on: doc.clone(),
            calls: RefCell::new(Vec::new()),
        };

        let err = write_with_backup(&w, &doc, "original\n", "TRANSLATED\n", ".backup").unwrap_err();
        assert!(matches!(err, ReplaceError::Write(_)));
        assert_eq!(std::fs::read_to_string(dir.path().join("b.mdx.backup")).unwrap(), "original\n");
        assert_eq!(std::fs::read_to_string(&doc).unwrap(), "original\n");
        assert_eq!(w.calls.borrow().len(), 2);
    }

    #[test]
    fn backup_failure_skips_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("b.mdx");
        std::fs::write(&doc, "original\n").unwrap();
        let w = FailingWriter {
            fail_on: dir.path().join("b.mdx.bak"),
            calls: RefCell::new(Vec::new()),
        };

        let err = write_with_backup(&w, &doc, "original\n", "TRANSLATED\n", ".bak").unwrap_err();
        assert!(matches!(err, ReplaceError::Backup(_)));
        assert_eq!(std::fs::read_to_string(&doc).unwrap(), "original\n");
        assert_eq!(w.calls.borrow().len(), 1);
    }

    #[test]
    fn atomic_write_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("en/a/b/x.mdx");
        write_atomic(&target, "hello\n").unwrap();
        write_atomic(&target, "again\n").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "again\n");
        let entries = std::fs::read_dir(target.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }
}
