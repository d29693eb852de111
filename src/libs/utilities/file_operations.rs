// Filesystem helpers for wrappers and shared resources.
use crate::log_debug;
use colored::Colorize;
use std::fs;
use std::io;
use std::path::Path;

/// Mode given to every generated wrapper: rwxr-xr-x.
pub const WRAPPER_MODE: u32 = 0o755;

/// Sets `path` to [`WRAPPER_MODE`].
#[cfg(unix)]
pub fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(WRAPPER_MODE);
    fs::set_permissions(path, perms)?;
    log_debug!("[Files] {} is now executable", path.display().to_string().green());
    Ok(())
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Whether `path` is a regular file with at least one execute bit set.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Copies `from` to `to`, creating the destination's parent directories.
pub fn copy_file(from: &Path, to: &Path) -> io::Result<u64> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to)
}
