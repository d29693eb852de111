// Data types shared across the installer: the catalog, per-tool results
// and the error kinds.

pub mod errors;
pub mod install_result;
pub mod manifest;
