// The provisioning primitives, one per runtime kind.
//
// Both turn a declared tool into something a wrapper can exec: `venv` yields the
// interpreter of a fresh per-tool environment, `build` runs build commands and
// yields the launcher. Neither writes wrappers; the orchestrator does that once
// provisioning succeeds.

/// Environment-based tools: `python -m venv` plus a batched `pip install`.
pub(crate) mod venv;

/// Build-based tools: ordered `sh -c` build steps, launcher resolution
/// and fallback-script location.
pub(crate) mod build;
