// Building blocks of an install run, from process execution up to the orchestrator.

// Caveats printed after a successful install.
pub mod caveats;
// `CommandRunner` seam plus the real, interruptible `SystemRunner`.
pub mod command_runner;
// Drives a whole install: tools, shared resources, meta-commands, summary.
pub mod install_orchestrator;
// Ctrl-C handling.
pub mod interrupt;
// Manifest lookup, parsing and the built-in catalog.
pub mod manifest_loading;
// Copies a package tree into the install prefix.
pub mod package_stager;
// Install prefix layout.
pub mod paths;
// Copies shared resources into the share directory.
pub mod resource_installer;
pub mod utilities;
// Renders and atomically publishes wrapper scripts.
pub mod wrapper_generator;
