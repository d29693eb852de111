// Finds, reads and validates the tool catalog.
//
// Lookup order: an explicit `--manifest` path, then `toolsuite.yaml` inside the
// installed package root, then the catalog compiled into the binary. The format
// follows the file extension (`.toml` is TOML, anything else YAML).

use crate::libs::paths::MANIFEST_FILE_NAME;
use crate::libs::utilities::path_helpers::expand_path;
use crate::schemas::errors::ManifestError;
use crate::schemas::manifest::Manifest;
use crate::{log_debug, log_info};
use colored::Colorize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// The catalog shipped with the binary; also what `generate` writes out.
pub const BUILTIN_CATALOG: &str = include_str!("../../catalog/as-tools.yaml");

/// Serialization format of a manifest file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Toml,
}

impl ManifestFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ManifestFormat::Toml,
            _ => ManifestFormat::Yaml,
        }
    }
}

/// Where the manifest in use was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestOrigin {
    File(PathBuf),
    BuiltIn,
}

impl fmt::Display for ManifestOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestOrigin::File(path) => write!(f, "{}", path.display()),
            ManifestOrigin::BuiltIn => write!(f, "built-in catalog"),
        }
    }
}

/// Parses and validates manifest text. `source` is only used in error messages.
pub fn parse_manifest(contents: &str, format: ManifestFormat, source: &Path) -> Result<Manifest, ManifestError> {
    let manifest: Manifest = match format {
        ManifestFormat::Yaml => serde_yaml::from_str(contents).map_err(|e| ManifestError::Parse {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?,
        ManifestFormat::Toml => toml::from_str(contents).map_err(|e| ManifestError::Parse {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?,
    };
    manifest.validate()?;
    Ok(manifest)
}

/// Reads, parses and validates the manifest at `path`.
pub fn load_manifest_file(path: &Path) -> Result<Manifest, ManifestError> {
    log_debug!("[Manifest] Reading {}", path.display());
    let contents = fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(&contents, ManifestFormat::from_path(path), path)
}

pub fn load_builtin_catalog() -> Result<Manifest, ManifestError> {
    parse_manifest(BUILTIN_CATALOG, ManifestFormat::Yaml, Path::new("<built-in catalog>"))
}

/// Picks the manifest for a run.
///
/// # Arguments
/// * `explicit`: the user's `--manifest`, tilde and variables expanded.
/// * `package_root`: searched for `toolsuite.yaml` when no path is given.
pub fn resolve_manifest(
    explicit: Option<&str>,
    package_root: &Path,
) -> Result<(Manifest, ManifestOrigin), ManifestError> {
    let origin = match explicit {
        Some(raw) => ManifestOrigin::File(expand_path(raw)),
        None => {
            let staged = package_root.join(MANIFEST_FILE_NAME);
            if staged.is_file() {
                ManifestOrigin::File(staged)
            } else {
                ManifestOrigin::BuiltIn
            }
        }
    };

    let manifest = match &origin {
        ManifestOrigin::File(path) => load_manifest_file(path)?,
        ManifestOrigin::BuiltIn => load_builtin_catalog()?,
    };
    log_info!(
        "[Manifest] Loaded {} tools for {} from {}",
        manifest.tools.len(),
        manifest.suite.display_name.bold(),
        origin.to_string().cyan()
    );
    Ok((manifest, origin))
}
