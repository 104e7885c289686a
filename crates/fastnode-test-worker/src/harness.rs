//! From-scratch `describe`/`it` test-framework primitives, installed once
//! per process as a set of globals in the shared realm.
//!
//! `fastnode-runtime`'s embedding has no `node:test`-shaped event-stream API,
//! so this module supplies a minimal stand-in: `describe`/`it` register into
//! an in-realm suite tree instead of running immediately, and
//! `crate::executor` drives leaves one at a time by calling
//! `globalThis.__howth_harness.runLeaf(i)` and polling for completion. See
//! `harness.js` for the registration/execution logic itself; this module is
//! just the one-time install step.

use crate::error::WorkerError;
use fastnode_runtime::Runtime;

const HARNESS_SOURCE: &str = include_str!("harness.js");

/// Installs the harness globals. Call once, at startup, before the first
/// request's files are loaded — the suite tree these globals maintain is
/// reset per-request (`crate::executor`) but the globals themselves persist
/// for the worker's whole lifetime, matching the non-isolated realm that
/// every request runs in.
pub async fn install(runtime: &mut Runtime) -> Result<(), WorkerError> {
    runtime.execute_script(HARNESS_SOURCE).await?;
    Ok(())
}
