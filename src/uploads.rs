use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::extract::UploadedFile;

const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "txt", "xlsx"];

/// Local files or directories to attach to a session.
pub struct LocalSource {
    path: PathBuf,
}

impl LocalSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_owned(),
        }
    }

    /// Read the source into uploads. A file is taken as-is whatever its type;
    /// a directory is walked and only supported document types are kept.
    pub fn collect(&self) -> Result<Vec<UploadedFile>> {
        let mut collected = Vec::new();

        if self.path.is_file() {
            collected.push(read_upload(&self.path)?);
        } else if self.path.is_dir() {
            for entry in WalkDir::new(&self.path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() && is_supported_file(entry.path()) {
                    collected.push(read_upload(entry.path())?);
                } else if entry.file_type().is_file() {
                    debug!(path = %entry.path().display(), "Skipping unsupported file");
                }
            }
        } else {
            return Err(anyhow!("No such file or directory: {}", self.path.display()));
        }

        info!(path = %self.path.display(), files = collected.len(), "Collected uploads");
        Ok(collected)
    }
}

fn is_supported_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Read one file, guessing its MIME type from the extension.
pub fn read_upload(path: &Path) -> Result<UploadedFile> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .ok_or_else(|| anyhow!("Invalid filename"))?
        .to_string_lossy()
        .into_owned();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    Ok(UploadedFile::new(name, mime.essence_str(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DocumentFormat;
    use tempfile::tempdir;

    #[test]
    fn test_collect_single_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("transcript.txt");
        std::fs::write(&path, "GPA 3.9").unwrap();

        let files = LocalSource::new(&path).collect().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name(), "transcript.txt");
        assert_eq!(files[0].format(), &DocumentFormat::PlainText);
        assert_eq!(files[0].bytes(), b"GPA 3.9");
    }

    #[test]
    fn test_collect_directory_filters_types() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        std::fs::write(dir.path().join("notes.md"), "# skipped").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("list.PDF"), b"%PDF").unwrap();

        let files = LocalSource::new(dir.path()).collect().unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["a.txt", "list.PDF"]);
        assert_eq!(files[1].format(), &DocumentFormat::Pdf);
    }

    #[test]
    fn test_single_unsupported_file_is_kept_as_unknown() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let files = LocalSource::new(&path).collect().unwrap();
        assert!(!files[0].format().is_supported());
        assert_eq!(files[0].mime_type(), "image/png");
    }

    #[test]
    fn test_missing_path() {
        let dir = tempdir().unwrap();
        assert!(LocalSource::new(dir.path().join("absent.pdf")).collect().is_err());
    }

    #[test]
    fn test_docx_mime_guess() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("offer.docx");
        std::fs::write(&path, b"PK").unwrap();
        let upload = read_upload(&path).unwrap();
        assert_eq!(upload.format(), &DocumentFormat::Docx);
    }
}
