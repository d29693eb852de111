// Small helpers shared by the installer modules.

// Path expansion and lexical normalization.
pub mod path_helpers;
// Permission handling and plain file copies.
pub mod file_operations;
// RFC 3339 timestamps and elapsed-time formatting for the report.
pub mod timestamps;
