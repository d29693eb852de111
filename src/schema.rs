// src/schema.rs
// One import path for the types the command handlers work with. The
// definitions live in `schemas/`, grouped by concern.

pub use crate::schemas::install_result::InstallReport;
pub use crate::schemas::manifest::{Manifest, RuntimeKind};
