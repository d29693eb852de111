// Register application subcommands.
// Each module corresponds to a specific `toolsuite` command-line action and
// returns the process exit code.

use crate::cli::cmd_enums::TargetArgs;
use crate::libs::manifest_loading::{ManifestOrigin, resolve_manifest};
use crate::libs::paths::{InstallLayout, package_root_for, resolve_prefix};
use crate::schema::Manifest;
use anyhow::Result;

// Writes the built-in catalog to disk as a starting point.
pub mod generate;
// Provisions the whole suite.
pub mod install;
// Dry run: prints the wrappers an install would write.
pub mod plan;
// Checks an existing installation.
pub mod verify;
// Displays the version of toolsuite.
pub mod version;

/// Resolves the prefix and manifest of a command that works on an existing
/// (or about to be written) installation.
pub(crate) fn load_target(target: &TargetArgs) -> Result<(Manifest, ManifestOrigin, InstallLayout)> {
    let prefix = resolve_prefix(target.prefix.as_deref())?;
    let (manifest, origin) = resolve_manifest(target.manifest.as_deref(), &package_root_for(&prefix))?;
    let layout = InstallLayout::new(&prefix, &manifest.suite.name);
    Ok((manifest, origin, layout))
}
