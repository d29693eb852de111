// Post-install instructions printed after a run that produced at least one
// working command: shell integration, verification, theme import and the
// list of available commands.

use crate::libs::paths::InstallLayout;
use crate::schemas::install_result::InstallReport;
use crate::schemas::manifest::Manifest;
use colored::Colorize;

/// Width of the rule framing the heading.
const RULE_WIDTH: usize = 46;

/// Builds the caveats text. Only commands that were actually installed are listed.
pub fn render_caveats(manifest: &Manifest, layout: &InstallLayout, report: &InstallReport) -> String {
    let suite = &manifest.suite;
    let rule = "━".repeat(RULE_WIDTH);
    let shell_script = layout.shared_resource_path(&suite.resources.shell_script);
    let theme_name = suite
        .resources
        .theme_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "theme".to_string());
    let installed: Vec<&str> = report
        .tools
        .iter()
        .filter(|t| t.succeeded)
        .map(|t| t.command_name.as_str())
        .collect();

    let mut text = String::new();
    text.push('\n');
    text.push_str(&format!("{rule}\n  {} installed successfully!\n{rule}\n\n", suite.display_name));
    text.push_str("1. Add shell integration to your shell startup file (e.g. ~/.zshrc):\n\n");
    text.push_str(&format!(
        "     echo 'source \"{}\"' >> ~/.zshrc\n     source ~/.zshrc\n\n",
        shell_script.display()
    ));
    text.push_str(&format!(
        "2. Make sure {} is on your PATH, then verify the installation:\n\n     {}\n\n",
        layout.bin_dir.display(),
        suite.name
    ));
    text.push_str(&format!(
        "3. Optional: import the {theme_name} terminal theme:\n\n     {}\n\n",
        suite.theme_command()
    ));
    text.push_str(&format!("Available commands: {}\n", installed.join(", ")));
    text
}

/// Prints the caveats to stdout with the heading highlighted.
pub fn print_caveats(manifest: &Manifest, layout: &InstallLayout, report: &InstallReport) {
    let heading = format!("{} installed successfully!", manifest.suite.display_name);
    let text = render_caveats(manifest, layout, report);
    print!("{}", text.replacen(&heading, &heading.bold().green().to_string(), 1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::manifest_loading::load_builtin_catalog;
    use crate::schemas::errors::InstallError;
    use crate::schemas::install_result::{InstallResult, InstallStage, WrittenWrapper};
    use std::path::{Path, PathBuf};

    #[test]
    fn lists_installed_commands_and_shared_script() {
        let manifest = load_builtin_catalog().unwrap();
        let layout = InstallLayout::new(Path::new("/opt/suite"), &manifest.suite.name);
        let mut report = InstallReport::default();
        report.record(InstallResult::done(WrittenWrapper {
            command_name: "filter".to_string(),
            path: PathBuf::from("/opt/suite/bin/filter"),
            sha256: String::new(),
        }));
        report.record(InstallResult::failed(
            "assign",
            InstallStage::Build,
            InstallError::DirectoryNotFound {
                path: PathBuf::from("/opt/suite/libexec/assign/app"),
            },
        ));

        let text = render_caveats(&manifest, &layout, &report);
        assert!(text.contains("AS Tools installed successfully!"));
        assert!(text.contains("source \"/opt/suite/share/as-tools/as-tools.sh\""));
        assert!(text.contains("     as-tools\n"));
        assert!(text.contains("     as-tools-theme\n"));
        assert!(text.contains("AS-Dark terminal theme"));
        assert!(text.contains("Available commands: filter\n"));
    }
}
