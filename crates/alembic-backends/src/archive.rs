//! Archive repackaging.
//!
//! zip and tar/tar.gz are handled in-process; 7z and rar go through external
//! tools when present. rar is extract-only: creating RAR archives requires
//! proprietary software and is refused upstream by the resolver.

use crate::backend::{require_input, write_cleanly, Backend, BackendError, ConvertTask};
use crate::tools::{ToolConfig, ToolRegistry};
use alembic_common::{BackendFamily, Capability};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Backend for archive format conversions.
pub struct ArchiveBackend {
    caps: Capability,
    sevenzip: Option<ToolConfig>,
    unrar: Option<ToolConfig>,
}

impl ArchiveBackend {
    pub fn probe(tools: &ToolRegistry) -> Self {
        let sevenzip = tools.first_of(&["7z", "7za"]).cloned();
        let unrar = tools.get("unrar").cloned();

        let mut caps = Capability::of(
            BackendFamily::Archive,
            &["zip", "tar", "gz", "tgz"],
            &["zip", "tar", "gz"],
        );
        if sevenzip.is_some() {
            caps.add_inputs(&["7z"]);
            caps.add_outputs(&["7z"]);
        }
        if unrar.is_some() {
            caps.add_inputs(&["rar"]);
        }

        Self {
            caps,
            sevenzip,
            unrar,
        }
    }

    fn extract(&self, input: &Path, format: &str, dest: &Path) -> Result<(), BackendError> {
        match format {
            "zip" => {
                let file = fs::File::open(input)?;
                ZipArchive::new(file)?.extract(dest)?;
                Ok(())
            }
            "tar" => {
                let file = fs::File::open(input)?;
                tar::Archive::new(file).unpack(dest)?;
                Ok(())
            }
            "gz" | "tgz" => {
                let file = fs::File::open(input)?;
                tar::Archive::new(GzDecoder::new(file)).unpack(dest)?;
                Ok(())
            }
            "7z" => {
                let tool = self
                    .sevenzip
                    .as_ref()
                    .ok_or_else(|| BackendError::new("7z is not available"))?;
                tool.run(&[
                    "x".to_string(),
                    "-y".to_string(),
                    format!("-o{}", dest.display()),
                    input.display().to_string(),
                ])
            }
            "rar" => {
                let tool = self
                    .unrar
                    .as_ref()
                    .ok_or_else(|| BackendError::new("unrar is not available"))?;
                // unrar requires a trailing separator on the destination.
                tool.run(&[
                    "x".to_string(),
                    "-y".to_string(),
                    input.display().to_string(),
                    format!("{}/", dest.display()),
                ])
            }
            other => Err(BackendError::new(format!(
                "unsupported archive input format: {other}"
            ))),
        }
    }

    fn create(&self, source_dir: &Path, output: &Path, format: &str) -> Result<(), BackendError> {
        match format {
            "zip" => {
                let file = fs::File::create(output)?;
                let mut writer = ZipWriter::new(file);
                let options =
                    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

                for entry in WalkDir::new(source_dir) {
                    let entry =
                        entry.map_err(|e| BackendError::new(format!("walk error: {e}")))?;
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let rel = entry
                        .path()
                        .strip_prefix(source_dir)
                        .map_err(|e| BackendError::new(format!("path error: {e}")))?;
                    writer.start_file(rel.to_string_lossy().replace('\\', "/"), options)?;
                    writer.write_all(&fs::read(entry.path())?)?;
                }
                writer.finish()?;
                Ok(())
            }
            "tar" => {
                let file = fs::File::create(output)?;
                let mut builder = tar::Builder::new(file);
                builder.append_dir_all(".", source_dir)?;
                builder.finish()?;
                Ok(())
            }
            "gz" => {
                let file = fs::File::create(output)?;
                let encoder = GzEncoder::new(file, Compression::default());
                let mut builder = tar::Builder::new(encoder);
                builder.append_dir_all(".", source_dir)?;
                let encoder = builder.into_inner()?;
                encoder.finish()?;
                Ok(())
            }
            "7z" => {
                let tool = self
                    .sevenzip
                    .as_ref()
                    .ok_or_else(|| BackendError::new("7z is not available"))?;
                let abs_output = if output.is_absolute() {
                    output.to_path_buf()
                } else {
                    std::env::current_dir()?.join(output)
                };
                tool.run_in(
                    Some(source_dir),
                    &[
                        "a".to_string(),
                        "-y".to_string(),
                        abs_output.display().to_string(),
                        ".".to_string(),
                    ],
                )
            }
            other => Err(BackendError::new(format!(
                "unsupported archive output format: {other}"
            ))),
        }
    }
}

impl Backend for ArchiveBackend {
    fn family(&self) -> BackendFamily {
        BackendFamily::Archive
    }

    fn capabilities(&self) -> &Capability {
        &self.caps
    }

    fn convert(&self, task: &ConvertTask<'_>) -> Result<(), BackendError> {
        require_input(task.input)?;

        let scratch = tempfile::tempdir()?;
        self.extract(task.input, task.source_format.as_str(), scratch.path())?;

        write_cleanly(task.output, || {
            self.create(scratch.path(), task.output, task.target_format.as_str())
        })
    }
}
