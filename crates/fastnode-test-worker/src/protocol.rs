//! Wire types for the test-worker protocol.
//!
//! One JSON object per line in each direction. See module docs on
//! [`crate::framer`] for the framing rules.

use serde::{Deserialize, Serialize};

/// A single source file to execute, already transpiled by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestFile {
    /// Host-filesystem path to the *original* source (not yet written anywhere).
    pub path: String,
    /// Already-transpiled JavaScript text to execute.
    pub code: String,
}

/// One test-execution request read from stdin.
///
/// Derives `Serialize` too: the worker itself only ever deserializes these
/// off stdin, but the daemon's test-worker client constructs and serializes
/// one to pipe to a spawned worker process, so both directions need it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Opaque correlation id, unique within the daemon's lifetime.
    pub id: String,
    /// Files to run, in order. Never empty for a well-formed request.
    pub files: Vec<RequestFile>,
    /// Tightens the idle deadline the Drain Supervisor applies to this run.
    #[serde(default)]
    pub force_exit: bool,
}

/// Leaf-test outcome as observed by the harness.
///
/// Derives `Deserialize` too so the daemon's test-worker client can read a
/// `WorkerResult` back off the worker's stdout, not just write one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
    Skip,
}

/// One leaf test result, in observation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRecord {
    pub name: String,
    #[serde(default)]
    pub file: String,
    pub status: TestStatus,
    pub duration_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The single Result emitted per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResult {
    pub id: String,
    pub ok: bool,
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub duration_ms: f64,
    pub tests: Vec<TestRecord>,
    #[serde(default)]
    pub diagnostics: String,
}

impl WorkerResult {
    /// A Result for a request whose files could not be prepared at all:
    /// zeroed counters, `ok == false`, diagnostics carrying the cause.
    pub fn preparation_failed(id: String, duration_ms: f64, cause: impl std::fmt::Display) -> Self {
        Self {
            id,
            ok: false,
            total: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
            duration_ms,
            tests: Vec::new(),
            diagnostics: format!("{cause}\n"),
        }
    }
}
