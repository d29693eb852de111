// Copies a package tree (tool sources, shared resources, optional
// `toolsuite.yaml`) into `<prefix>/libexec` ahead of provisioning.
//
// Environment directories and VCS metadata in the source are left behind:
// environments are always rebuilt in place and are not relocatable anyway.

use crate::libs::utilities::file_operations::copy_file;
use crate::{log_debug, log_info};
use anyhow::{Context, Result, bail};
use colored::Colorize;
use std::fs;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Directory names never copied, in addition to the environment directory name.
const ALWAYS_SKIPPED: [&str; 2] = [".git", ".hg"];

/// What a staging pass copied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSummary {
    pub directories: usize,
    pub files: usize,
    pub symlinks: usize,
}

/// Copies `source` into `package_root`, overwriting files that already exist there.
///
/// Directories named `env_dir_name`, `.git` or `.hg` are skipped at any depth. If
/// `package_root` lies inside `source`, the directories leading to it are skipped so
/// the tree is never copied into itself; if both are the same directory nothing
/// happens. Symlinks are recreated as symlinks on Unix.
///
/// # Errors
/// Fails if `source` is not a directory or anything cannot be read or written.
pub fn stage_package(source: &Path, package_root: &Path, env_dir_name: &str) -> Result<StageSummary> {
    let source = fs::canonicalize(source)
        .with_context(|| format!("package source {} does not exist", source.display()))?;
    if !source.is_dir() {
        bail!("package source {} is not a directory", source.display());
    }
    fs::create_dir_all(package_root)
        .with_context(|| format!("could not create package root {}", package_root.display()))?;
    let destination = fs::canonicalize(package_root)
        .with_context(|| format!("could not resolve package root {}", package_root.display()))?;

    if destination == source {
        log_info!("[Stage] Package tree is already in place at {}", destination.display());
        return Ok(StageSummary::default());
    }

    log_info!(
        "[Stage] Copying {} into {}",
        source.display().to_string().cyan(),
        destination.display().to_string().cyan()
    );

    let mut summary = StageSummary::default();
    let walker = WalkDir::new(&source)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| !is_skipped(entry, env_dir_name) && !destination.starts_with(entry.path()));

    for entry in walker {
        let entry = entry.with_context(|| format!("could not walk {}", source.display()))?;
        let relative = entry
            .path()
            .strip_prefix(&source)
            .with_context(|| format!("{} is outside {}", entry.path().display(), source.display()))?;
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("could not create {}", target.display()))?;
            summary.directories += 1;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
            summary.symlinks += 1;
        } else {
            copy_file(entry.path(), &target)
                .with_context(|| format!("could not copy {}", entry.path().display()))?;
            summary.files += 1;
        }
    }

    log_info!(
        "[Stage] Staged {} files in {} directories",
        summary.files.to_string().green(),
        summary.directories
    );
    Ok(summary)
}

fn is_skipped(entry: &DirEntry, env_dir_name: &str) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let skipped = entry
        .file_name()
        .to_str()
        .is_some_and(|name| name == env_dir_name || ALWAYS_SKIPPED.contains(&name));
    if skipped {
        log_debug!("[Stage] Skipping {}", entry.path().display());
    }
    skipped
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    let pointee = fs::read_link(link).with_context(|| format!("could not read link {}", link.display()))?;
    if fs::symlink_metadata(target).is_ok() {
        fs::remove_file(target).with_context(|| format!("could not replace {}", target.display()))?;
    }
    std::os::unix::fs::symlink(&pointee, target)
        .with_context(|| format!("could not create link {}", target.display()))
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    copy_file(link, target).with_context(|| format!("could not copy {}", link.display()))?;
    Ok(())
}
