//! Artifact storage: uploaded sources and converted outputs.
//!
//! Artifacts are plain files named with a random unique prefix plus the
//! original basename, split across two logically separate directories (raw
//! uploads vs. converted outputs). Both are subject to the same retention
//! window.

use alembic_common::{Error, FormatToken, JobId, OutputShape, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct ArtifactStorage {
    upload_dir: PathBuf,
    converted_dir: PathBuf,
}

impl ArtifactStorage {
    /// Create the storage, ensuring both directories exist.
    pub fn new(upload_dir: PathBuf, converted_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&upload_dir)?;
        fs::create_dir_all(&converted_dir)?;
        Ok(Self {
            upload_dir,
            converted_dir,
        })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn converted_dir(&self) -> &Path {
        &self.converted_dir
    }

    /// Store uploaded bytes under a random unique prefix, keeping the
    /// original basename.
    pub fn store_upload(&self, original_filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let name = format!("{}_{}", Uuid::new_v4(), sanitize(original_filename));
        let path = self.upload_dir.join(name);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Caller-facing output name and on-disk path for one conversion.
    ///
    /// The pdf-to-image fan-out produces `{stem}_pages.zip` instead of a
    /// single `{stem}.{target}` file.
    pub fn converted_target(
        &self,
        job_id: JobId,
        original_filename: &str,
        target: &FormatToken,
        shape: OutputShape,
    ) -> (String, PathBuf) {
        let sanitized = sanitize(original_filename);
        let stem = Path::new(&sanitized)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());

        let display_name = match shape {
            OutputShape::Single => format!("{stem}.{target}"),
            OutputShape::PageArchive => format!("{stem}_pages.zip"),
        };
        let path = self.converted_dir.join(format!("{job_id}_{display_name}"));
        (display_name, path)
    }

    pub fn read(&self, location: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(location)?)
    }

    pub fn exists(&self, location: &Path) -> bool {
        location.is_file()
    }

    pub fn size_of(&self, location: &Path) -> Option<u64> {
        fs::metadata(location).ok().map(|m| m.len())
    }

    /// Best-effort delete; a missing artifact is not an error.
    pub fn delete(&self, location: &Path) {
        match fs::remove_file(location) {
            Ok(()) => tracing::debug!(path = %location.display(), "Artifact deleted"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %location.display(), error = %e, "Failed to delete artifact"),
        }
    }

    /// Resolve a download name inside the converted directory, rejecting
    /// path traversal.
    pub fn download_path(&self, name: &str) -> Result<PathBuf> {
        if name.contains("..") || name.contains('/') || name.contains('\\') {
            return Err(Error::Validation("invalid artifact name".to_string()));
        }
        let path = self.converted_dir.join(name);
        if !path.is_file() {
            return Err(Error::not_found("artifact", name));
        }
        Ok(path)
    }

    /// Files in either directory last modified before `cutoff`.
    ///
    /// Used by the sweeper to reclaim orphans (uploads whose submission
    /// failed, outputs whose job record is already gone).
    pub fn stale_files(&self, cutoff: DateTime<Utc>) -> Vec<PathBuf> {
        let mut stale = Vec::new();
        for dir in [&self.upload_dir, &self.converted_dir] {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let Ok(metadata) = entry.metadata() else {
                    continue;
                };
                let Ok(modified) = metadata.modified() else {
                    continue;
                };
                let modified: DateTime<Utc> = modified.into();
                if modified < cutoff {
                    stale.push(path);
                }
            }
        }
        stale
    }
}

/// Keep only the basename and replace anything unusual in it.
fn sanitize(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alembic_common::FormatToken;

    fn storage() -> (tempfile::TempDir, ArtifactStorage) {
        let root = tempfile::tempdir().unwrap();
        let storage = ArtifactStorage::new(
            root.path().join("uploads"),
            root.path().join("converted"),
        )
        .unwrap();
        (root, storage)
    }

    #[test]
    fn uploads_keep_basename_behind_unique_prefix() {
        let (_root, storage) = storage();
        let a = storage.store_upload("report.pdf", b"x").unwrap();
        let b = storage.store_upload("report.pdf", b"y").unwrap();

        assert_ne!(a, b);
        let name = a.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with("_report.pdf"));
        assert_eq!(storage.read(&a).unwrap(), b"x");
    }

    #[test]
    fn sanitize_strips_directories_and_odd_characters() {
        assert_eq!(sanitize("../../etc/passwd"), "passwd");
        assert_eq!(sanitize("weird name!.txt"), "weird_name_.txt");
        assert_eq!(sanitize(""), "upload");
    }

    #[test]
    fn converted_target_naming() {
        let (_root, storage) = storage();
        let id = JobId::new();

        let (name, path) =
            storage.converted_target(id, "report.pdf", &FormatToken::new("docx"), OutputShape::Single);
        assert_eq!(name, "report.docx");
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(&id.to_string()));

        let (name, _) = storage.converted_target(
            id,
            "report.pdf",
            &FormatToken::new("png"),
            OutputShape::PageArchive,
        );
        assert_eq!(name, "report_pages.zip");
    }

    #[test]
    fn download_path_rejects_traversal() {
        let (_root, storage) = storage();
        assert!(storage.download_path("../secret").is_err());
        assert!(storage.download_path("a/b").is_err());
        // Unknown but well-formed names are a not-found, not a validation error.
        let err = storage.download_path("missing.txt").unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn delete_is_best_effort() {
        let (_root, storage) = storage();
        let path = storage.store_upload("a.txt", b"x").unwrap();
        storage.delete(&path);
        assert!(!storage.exists(&path));
        // Deleting again must not panic or error.
        storage.delete(&path);
    }
}
