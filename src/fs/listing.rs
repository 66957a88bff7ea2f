// src/fs/listing.rs

//! Directory listing with include/exclude file-name patterns.

use std::path::Path;

use anyhow::{Context, Result};
use globset::Glob;
use tracing::debug;

use crate::fs::FileSystem;
use crate::paths::patterns::{FilePattern, matches_any};
use crate::paths::template::join;

/// List the plain files directly inside `dir` (no recursion) whose names
/// match any of `include` and none of `exclude`.
///
/// An empty `include` list keeps everything. Results are full locations
/// built from `dir` as spelled by the caller, sorted by name.
pub fn list_files(
    fs: &dyn FileSystem,
    dir: &str,
    include: &[FilePattern],
    exclude: &[FilePattern],
) -> Result<Vec<String>> {
    let names = file_names_in(fs, dir)?;
    let files: Vec<String> = names
        .into_iter()
        .filter(|name| matches_any(name, include))
        .filter(|name| exclude.is_empty() || !matches_any(name, exclude))
        .map(|name| join(dir, &name))
        .collect();

    debug!(dir, found = files.len(), "listed files by pattern");
    Ok(files)
}

/// List the plain files directly inside `dir` whose names match a glob
/// such as `*_R1.fastq.gz`.
pub fn list_files_glob(fs: &dyn FileSystem, dir: &str, glob: &str) -> Result<Vec<String>> {
    let matcher = Glob::new(glob)
        .with_context(|| format!("invalid glob pattern '{glob}'"))?
        .compile_matcher();

    let files: Vec<String> = file_names_in(fs, dir)?
        .into_iter()
        .filter(|name| matcher.is_match(name))
        .map(|name| join(dir, &name))
        .collect();

    debug!(dir, glob, found = files.len(), "listed files by glob");
    Ok(files)
}

fn file_names_in(fs: &dyn FileSystem, dir: &str) -> Result<Vec<String>> {
    let trimmed = dir.trim_end_matches('/');
    let lookup = if trimmed.is_empty() { "/" } else { trimmed };

    let mut names = fs.file_names(Path::new(lookup))?;
    names.sort();
    Ok(names)
}
