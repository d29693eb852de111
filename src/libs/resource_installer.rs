// Copies the suite's shared files (shell integration script, terminal theme,
// documentation) from the package tree into `<prefix>/share/<suite>/`.
//
// All sources are checked before anything is copied, so a missing file never
// leaves the share directory half-populated.

use crate::libs::paths::InstallLayout;
use crate::libs::utilities::file_operations::copy_file;
use crate::schemas::errors::InstallError;
use crate::schemas::manifest::SharedResources;
use crate::{log_debug, log_error, log_info};
use colored::Colorize;
use std::path::PathBuf;

/// Installs every declared shared resource and returns their destination paths in order.
///
/// Resources are resolved relative to the package root and flattened into the share
/// directory by file name. Existing copies are overwritten, so re-running is safe.
///
/// # Errors
/// * `ResourceMissing` naming the first declared file absent from the package tree.
/// * `ResourceCopyFailed` if a present file cannot be copied.
pub fn install_shared_resources(
    resources: &SharedResources,
    layout: &InstallLayout,
) -> Result<Vec<PathBuf>, InstallError> {
    log_info!(
        "[Resources] Installing shared resources into {}",
        layout.share_dir.display().to_string().cyan()
    );

    let mut plan = Vec::new();
    for resource in resources.all() {
        let source = layout.package_root.join(resource);
        if !source.is_file() {
            log_error!(
                "[Resources] Declared resource is missing: {}",
                source.display().to_string().red()
            );
            return Err(InstallError::ResourceMissing { path: source });
        }
        plan.push((source, layout.shared_resource_path(resource)));
    }

    let mut installed = Vec::with_capacity(plan.len());
    for (source, destination) in plan {
        copy_file(&source, &destination).map_err(|e| InstallError::ResourceCopyFailed {
            path: source.clone(),
            reason: e.to_string(),
        })?;
        log_debug!(
            "[Resources] {} -> {}",
            source.display(),
            destination.display()
        );
        installed.push(destination);
    }

    log_info!(
        "[Resources] {} shared resources installed",
        installed.len().to_string().green()
    );
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn resources() -> SharedResources {
        SharedResources {
            shell_script: PathBuf::from("shell/as-tools.sh"),
            theme_file: PathBuf::from("theme/AS-Dark.terminal"),
            documentation: PathBuf::from("README.md"),
        }
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn copies_all_resources_flat_into_share_dir() {
        let prefix = TempDir::new().unwrap();
        let layout = InstallLayout::new(prefix.path(), "as-tools");
        write(&layout.package_root, "shell/as-tools.sh", "__as_tools_help() { echo help; }\n");
        write(&layout.package_root, "theme/AS-Dark.terminal", "<plist/>");
        write(&layout.package_root, "README.md", "# AS Tools\n");

        let installed = install_shared_resources(&resources(), &layout).unwrap();

        assert_eq!(
            installed,
            vec![
                layout.share_dir.join("as-tools.sh"),
                layout.share_dir.join("AS-Dark.terminal"),
                layout.share_dir.join("README.md"),
            ]
        );
        assert_eq!(
            fs::read_to_string(layout.share_dir.join("README.md")).unwrap(),
            "# AS Tools\n"
        );
    }

    #[test]
    fn missing_resource_names_the_file_and_copies_nothing() {
        let prefix = TempDir::new().unwrap();
        let layout = InstallLayout::new(prefix.path(), "as-tools");
        write(&layout.package_root, "shell/as-tools.sh", "");
        write(&layout.package_root, "README.md", "");

        let err = install_shared_resources(&resources(), &layout).unwrap_err();
        assert_eq!(
            err,
            InstallError::ResourceMissing {
                path: layout.package_root.join("theme/AS-Dark.terminal")
            }
        );
        assert!(!layout.share_dir.exists());
    }

    #[test]
    fn reinstall_overwrites_existing_copies() {
        let prefix = TempDir::new().unwrap();
        let layout = InstallLayout::new(prefix.path(), "as-tools");
        write(&layout.package_root, "shell/as-tools.sh", "v1");
        write(&layout.package_root, "theme/AS-Dark.terminal", "");
        write(&layout.package_root, "README.md", "");
        install_shared_resources(&resources(), &layout).unwrap();

        write(&layout.package_root, "shell/as-tools.sh", "v2");
        install_shared_resources(&resources(), &layout).unwrap();
        assert_eq!(
            fs::read_to_string(layout.share_dir.join("as-tools.sh")).unwrap(),
            "v2"
        );
    }
}
