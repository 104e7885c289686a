//! Shim Registry: materialises the mocha-compat module once at startup and
//! publishes its path so the engine's module loader resolves the bare
//! specifier `"mocha"` to it instead of walking `node_modules`.
//!
//! The shim's content is static (see `shim_template.mjs`, embedded via
//! `include_str!`); only its on-disk location is decided at runtime.

use crate::error::WorkerError;
use std::path::PathBuf;

const SHIM_SOURCE: &str = include_str!("shim_template.mjs");

/// Writes the shim module into a well-known per-runner subdirectory of the
/// system temp directory and publishes its path to `fastnode-runtime`'s
/// module loader. Call once, at startup, before the first request.
pub fn install() -> Result<PathBuf, WorkerError> {
    let dir = std::env::temp_dir().join(format!("howth-testw-shim-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("mocha.mjs");
    std::fs::write(&path, SHIM_SOURCE)?;
    fastnode_runtime::set_mocha_shim_path(path.clone());
    Ok(path)
}
