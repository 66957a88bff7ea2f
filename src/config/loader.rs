// src/config/loader.rs

use std::path::{Path, PathBuf};

use crate::config::model::{PipelineFile, RawPipelineFile};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};

/// Load a pipeline file and return the raw `RawPipelineFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPipelineFile> {
    load_with(&RealFileSystem, path)
}

/// Like [`load_from_path`], reading through `fs`.
pub fn load_with(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<RawPipelineFile> {
    let contents = fs.read_to_string(path.as_ref())?;
    let raw: RawPipelineFile = toml::from_str(&contents)?;
    Ok(raw)
}

/// Load a pipeline file from path and validate it.
///
/// Checks for:
/// - stages listed in the order without a section (and vice versa),
/// - malformed file patterns,
/// - unknown or cyclic `previous_module` references,
/// - backend sanity (`max_in_flight`, `submit_timeout`).
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineFile> {
    let raw = load_from_path(path)?;
    PipelineFile::try_from(raw)
}

/// `Pipedag.toml` in the current working directory.
pub fn default_pipeline_path() -> PathBuf {
    PathBuf::from("Pipedag.toml")
}
