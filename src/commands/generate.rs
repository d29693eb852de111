// src/commands/generate.rs
// Writes the built-in catalog to disk so users can start from a working
// example instead of an empty file. An existing file is never overwritten.

use crate::libs::manifest_loading::{BUILTIN_CATALOG, ManifestFormat};
use crate::libs::paths::MANIFEST_FILE_NAME;
use crate::libs::utilities::path_helpers::expand_path;
use crate::{log_debug, log_info};
use anyhow::{Context, Result, bail};
use colored::Colorize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// What `generate` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    Created(PathBuf),
    SkippedExisting(PathBuf),
}

/// The main entry point for the `generate` command.
///
/// # Arguments
/// * `output`: where to write the catalog; defaults to `./toolsuite.yaml`.
pub fn run(output: Option<String>) -> Result<i32> {
    log_debug!("[Generate] Starting generation with output: {:?}", output);
    let path = expand_path(output.as_deref().unwrap_or(MANIFEST_FILE_NAME));
    match generate_catalog(&path)? {
        GenerateOutcome::Created(path) => {
            log_info!("[Generate] Wrote catalog to {}", path.display().to_string().green());
        }
        GenerateOutcome::SkippedExisting(path) => {
            log_info!(
                "[Generate] Skipping existing file {}. We don't want to overwrite your changes!",
                path.display().to_string().yellow()
            );
        }
    }
    Ok(0)
}

/// Writes the built-in catalog to `path` unless something already exists there.
pub fn generate_catalog(path: &Path) -> Result<GenerateOutcome> {
    if ManifestFormat::from_path(path) == ManifestFormat::Toml {
        bail!("the catalog is generated as YAML; choose a path ending in .yaml");
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("could not create {}", parent.display()))?;
    }

    // `create_new` makes the existence check and the creation a single step.
    let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Ok(GenerateOutcome::SkippedExisting(path.to_path_buf()));
        }
        Err(e) => return Err(e).with_context(|| format!("could not create {}", path.display())),
    };
    file.write_all(BUILTIN_CATALOG.as_bytes())
        .with_context(|| format!("could not write {}", path.display()))?;
    Ok(GenerateOutcome::Created(path.to_path_buf()))
}
