//! Run Executor: for one request, loads its prepared files into the shared
//! realm, then drives the harness's suite tree one leaf at a time, counting
//! outcomes and formatting failures, under the Drain Supervisor's idle
//! deadline.
//!
//! The one logical blocking action per leaf is realized here as polling
//! `globalThis.__howth_leaf_done` between `Runtime::run_event_loop` steps —
//! see `crate::drain`. Once every leaf has settled, a tail phase
//! (`DrainSupervisor::drain_tail`) keeps driving the event loop until it
//! drains on its own or the idle deadline elapses again — this is what
//! actually bounds a handle (timer, socket, unresolved promise) the last
//! test leaked behind it rather than one it awaited directly.

use crate::drain::{DrainOutcome, DrainSupervisor};
use crate::error::WorkerError;
use crate::protocol::{TestRecord, TestStatus};
use crate::workspace::PreparedFile;
use fastnode_runtime::{Runtime, RuntimeError};
use serde::Deserialize;

/// Literal prefixes of the harness's own summary lines, filtered out of
/// diagnostics to avoid double-reporting when a surrounding CLI computes
/// its own summary. This harness never emits such lines itself today;
/// kept as a narrow filter in case a future harness revision adds one.
const SUMMARY_LINE_PREFIXES: &[&str] = &[
    "tests ",
    "suites ",
    "pass ",
    "fail ",
    "cancelled ",
    "skipped ",
    "todo ",
    "duration_ms ",
];

/// Stack frames kept per formatted failure: at most the first five.
const MAX_STACK_FRAMES: usize = 5;

/// Accumulated outcome of running every leaf test in one request.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub tests: Vec<TestRecord>,
    pub diagnostics: String,
}

#[derive(Debug, Deserialize)]
struct LeafError {
    message: String,
    #[serde(default)]
    expected: Option<serde_json::Value>,
    #[serde(default)]
    actual: Option<serde_json::Value>,
    #[serde(default)]
    stack: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LeafRecord {
    name: String,
    #[serde(default)]
    file: String,
    status: String,
    #[serde(rename = "durationMs", default)]
    duration_ms: f64,
    #[serde(default)]
    error: Option<LeafError>,
}

/// Runs every prepared file's leaves to completion or until the Drain
/// Supervisor abandons the run.
pub async fn run(
    runtime: &mut Runtime,
    files: &[PreparedFile],
    force_exit: bool,
) -> Result<RunOutcome, WorkerError> {
    let mut outcome = RunOutcome::default();
    let mut supervisor = DrainSupervisor::new(force_exit);

    runtime
        .execute_script("globalThis.__howth_harness.reset();")
        .await?;

    for file in files {
        set_current_file(runtime, &file.original_path.to_string_lossy()).await?;
        if let Err(err) = runtime.execute_module(&file.written_path).await {
            push_diagnostic(&mut outcome.diagnostics, &format!("runner error: {err}"));
        }
    }

    for err in registration_errors(runtime)? {
        push_diagnostic(&mut outcome.diagnostics, &err);
    }

    runtime
        .execute_script("globalThis.__howth_harness.finalize();")
        .await?;
    let leaf_count = leaf_count(runtime)?;

    let mut drained_early = false;
    for i in 0..leaf_count {
        supervisor.note_event();
        runtime
            .execute_script(&format!("globalThis.__howth_harness.runLeaf({i});"))
            .await?;

        match supervisor.run_until(runtime, poll_leaf).await? {
            DrainOutcome::Completed(record) => {
                supervisor.note_event();
                apply_record(&mut outcome, record);
            }
            // Abandoned: stop running further leaves, keep whatever was
            // already observed.
            DrainOutcome::Drained => {
                drained_early = true;
                break;
            }
        }
    }

    // Every leaf finished on its own, but a leaked timer/socket/unresolved
    // promise from the last one can still keep the loop alive with nothing
    // left for `check` to observe. Give the tail of the run the same idle
    // budget, measured from the last leaf's completion, before giving up on
    // it draining naturally. Skipped if a leaf itself already tripped the
    // deadline — the run is already being abandoned.
    if !drained_early {
        supervisor.drain_tail(runtime).await?;
    }

    Ok(outcome)
}

async fn set_current_file(runtime: &mut Runtime, path: &str) -> Result<(), WorkerError> {
    let escaped = path.replace('\\', "\\\\").replace('\'', "\\'");
    runtime
        .execute_script(&format!("globalThis.__howth_current_file = '{escaped}';"))
        .await?;
    Ok(())
}

fn registration_errors(runtime: &mut Runtime) -> Result<Vec<String>, WorkerError> {
    let json = runtime.eval_string("JSON.stringify(globalThis.__howth_harness.registrationErrors())")?;
    Ok(serde_json::from_str(&json)?)
}

fn leaf_count(runtime: &mut Runtime) -> Result<usize, WorkerError> {
    let rendered = runtime.eval_string("String(globalThis.__howth_harness.leafCount())")?;
    Ok(rendered.trim().parse().unwrap_or(0))
}

/// One `check` step for [`DrainSupervisor::run_until`]: `Ok(None)` while
/// the in-flight leaf hasn't finished, `Ok(Some(record))` once
/// `__howth_leaf_done` flips true.
fn poll_leaf(runtime: &mut Runtime) -> Result<Option<LeafRecord>, RuntimeError> {
    let done = runtime.eval_string("String(!!globalThis.__howth_leaf_done)")?;
    if done.trim() != "true" {
        return Ok(None);
    }
    let json = runtime.eval_string("globalThis.__howth_leaf_result || 'null'")?;
    serde_json::from_str(&json)
        .map_err(|e| RuntimeError::JavaScript(format!("malformed leaf result: {e}")))
}

fn apply_record(outcome: &mut RunOutcome, leaf: LeafRecord) {
    outcome.total += 1;
    let status = match leaf.status.as_str() {
        "pass" => TestStatus::Pass,
        "fail" => TestStatus::Fail,
        _ => TestStatus::Skip,
    };
    match status {
        TestStatus::Pass => outcome.passed += 1,
        TestStatus::Fail => outcome.failed += 1,
        TestStatus::Skip => outcome.skipped += 1,
    }
    let duration_ms = if status == TestStatus::Skip {
        0.0
    } else {
        leaf.duration_ms
    };
    outcome.tests.push(TestRecord {
        name: leaf.name,
        file: leaf.file,
        status,
        duration_ms,
        error: leaf.error.as_ref().map(format_error),
    });
}

/// Formats one leaf failure: message, then expected/actual (if both
/// present), then at most five `at `-prefixed stack frames.
fn format_error(error: &LeafError) -> String {
    let mut text = error.message.clone();

    if let (Some(expected), Some(actual)) = (&error.expected, &error.actual) {
        text.push('\n');
        text.push_str(&format!(
            "expected: {}",
            serde_json::to_string(expected).unwrap_or_default()
        ));
        text.push('\n');
        text.push_str(&format!(
            "actual:   {}",
            serde_json::to_string(actual).unwrap_or_default()
        ));
    }

    if let Some(stack) = &error.stack {
        for frame in stack
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with("at "))
            .take(MAX_STACK_FRAMES)
        {
            text.push('\n');
            text.push_str(frame);
        }
    }

    text
}

/// Appends one diagnostic message unless it matches a framework summary
/// line.
fn push_diagnostic(diagnostics: &mut String, message: &str) {
    if SUMMARY_LINE_PREFIXES
        .iter()
        .any(|prefix| message.starts_with(prefix))
    {
        return;
    }
    diagnostics.push_str(message);
    diagnostics.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_error_includes_message_expected_actual() {
        let err = LeafError {
            message: "bad".to_string(),
            expected: Some(serde_json::json!(1)),
            actual: Some(serde_json::json!(2)),
            stack: None,
        };
        let text = format_error(&err);
        assert!(text.contains("bad"));
        assert!(text.contains("expected: 1"));
        assert!(text.contains("actual:   2"));
    }

    #[test]
    fn format_error_keeps_at_most_five_stack_frames() {
        let stack = (0..10)
            .map(|i| format!("    at frame{i} (file.js:1:1)"))
            .collect::<Vec<_>>()
            .join("\n");
        let err = LeafError {
            message: "boom".to_string(),
            expected: None,
            actual: None,
            stack: Some(format!("Error: boom\n{stack}")),
        };
        let text = format_error(&err);
        assert_eq!(text.matches("at frame").count(), 5);
    }

    #[test]
    fn push_diagnostic_filters_summary_lines() {
        let mut diagnostics = String::new();
        push_diagnostic(&mut diagnostics, "pass 3");
        push_diagnostic(&mut diagnostics, "a real diagnostic");
        assert_eq!(diagnostics, "a real diagnostic\n");
    }
}
