//! Local file storage: directory bootstrap, writes and archival naming

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{Error, Result};

/// Outcome of a completed write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSaveResult {
    pub path: PathBuf,
    pub name: String,
    pub size: usize,
}

/// Filesystem store rooted at the archival directory
///
/// Imported CSVs land under `<root>/csv`, recombined upload PDFs under
/// `<root>/pdf`; per-boleto output files go wherever the caller points.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Archival directory for imported CSV content
    pub fn csv_archive_dir(&self) -> PathBuf {
        self.root.join("csv")
    }

    /// Archival directory for recombined upload PDFs
    pub fn pdf_archive_dir(&self) -> PathBuf {
        self.root.join("pdf")
    }

    /// Create a directory and its parents if missing
    pub fn ensure_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    /// Write bytes under `dir`, creating it first
    pub fn save_file(&self, name: &str, bytes: &[u8], dir: &Path) -> Result<FileSaveResult> {
        self.ensure_directory(dir)?;
        let path = dir.join(name);
        fs::write(&path, bytes)?;
        Ok(FileSaveResult {
            path,
            name: name.to_string(),
            size: bytes.len(),
        })
    }
}

/// Archival file name: `import_<millis>_<original>`
pub fn archival_name(original: &str) -> String {
    format!("import_{}_{}", Utc::now().timestamp_millis(), original)
}

/// Read a file fully, failing with a typed error when it does not exist
pub fn load_file(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    Ok(fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_file_creates_directory_and_reports_size() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path());

        let dir = tmp.path().join("boletos");
        let result = store.save_file("1.pdf", b"content", &dir).unwrap();

        assert_eq!(result.name, "1.pdf");
        assert_eq!(result.size, 7);
        assert_eq!(fs::read(&result.path).unwrap(), b"content");
    }

    #[test]
    fn test_archive_dirs_hang_off_the_root() {
        let store = FileStore::new("storage");
        assert_eq!(store.csv_archive_dir(), PathBuf::from("storage/csv"));
        assert_eq!(store.pdf_archive_dir(), PathBuf::from("storage/pdf"));
    }

    #[test]
    fn test_archival_name_keeps_original_name() {
        let name = archival_name("boletos.csv");
        assert!(name.starts_with("import_"));
        assert!(name.ends_with("_boletos.csv"));
    }

    #[test]
    fn test_load_file_missing_is_typed() {
        let result = load_file(Path::new("does/not/exist.pdf"));
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }
}
