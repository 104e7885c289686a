//! Entry point: wires the Stdio Framer, Workspace Manager, Shim Registry,
//! Run Executor, and Drain Supervisor into a strictly-FIFO request loop —
//! one request runs to completion before the next is read off stdin, unless
//! `SIGTERM` arrives first, which aborts the in-flight run and the process
//! along with it.
//!
//! Runs on a current-thread Tokio executor — `fastnode_runtime::Runtime`'s
//! `JsRuntime` is `!Send`, matching the single-threaded cooperative model
//! this worker commits to. Because the Framer is never polled while a run
//! is in flight, there's no ref/unref handoff to manage for a libuv-style
//! embedding: a request in flight already has the input channel off the
//! executor's attention. `SIGTERM` is raced against the run itself (not
//! just against reading the next request) so a hung run can still be
//! cancelled — the parent daemon's only cancellation mechanism.

use fastnode_runtime::{Runtime, RuntimeOptions};
use fastnode_test_worker::framer::{ResponseWriter, StdioFramer};
use fastnode_test_worker::protocol::WorkerResult;
use fastnode_test_worker::workspace::WorkspaceManager;
use fastnode_test_worker::{executor, harness, shim};
use std::time::Instant;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Must happen before anything else touches stdout.
    let mut response_writer = match ResponseWriter::install() {
        Ok(writer) => writer,
        Err(err) => {
            eprintln!("fastnode-test-worker: failed to install response channel: {err}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("fastnode_test_worker=info")),
        )
        .init();

    let workspace = WorkspaceManager::new();
    workspace.install_exit_hooks();

    let mut runtime = match Runtime::new(RuntimeOptions::default()) {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!("failed to start engine: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = harness::install(&mut runtime).await {
        tracing::error!("failed to install test harness: {err}");
        std::process::exit(1);
    }
    if let Err(err) = shim::install() {
        tracing::error!("failed to install mocha shim: {err}");
        std::process::exit(1);
    }

    let mut framer = StdioFramer::new();

    #[cfg(unix)]
    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(sig) => sig,
        Err(err) => {
            tracing::error!("failed to install SIGTERM handler: {err}");
            std::process::exit(1);
        }
    };

    loop {
        let next = {
            #[cfg(unix)]
            {
                tokio::select! {
                    biased;
                    _ = sigterm.recv() => None,
                    request = framer.next_request() => Some(request),
                }
            }
            #[cfg(not(unix))]
            {
                Some(framer.next_request().await)
            }
        };

        let Some(request) = next else {
            // SIGTERM: the workspace's exit hook (registered via libc
            // atexit) runs the cleanup sweep; process::exit triggers it
            // the same way a normal exit() would.
            std::process::exit(0);
        };

        let Some(request) = request else {
            // Clean end-of-input.
            std::process::exit(0);
        };

        let request = match request {
            Ok(request) => request,
            Err(err) => {
                tracing::error!("{err}");
                continue;
            }
        };

        let id = request.id.clone();
        let start = Instant::now();

        // This request's own prepare/run/cleanup, as one future so it can be
        // raced against SIGTERM below — a signal delivered mid-run must
        // still abort the process immediately (§5: SIGTERM is the daemon's
        // only cancellation mechanism), not wait for the current run to
        // finish.
        let run_request = async {
            match workspace.prepare(&request) {
                Ok(prepared) => {
                    let outcome = executor::run(&mut runtime, &prepared, request.force_exit).await;
                    workspace.release(&prepared);
                    match outcome {
                        Ok(outcome) => WorkerResult {
                            id,
                            ok: outcome.failed == 0,
                            total: outcome.total,
                            passed: outcome.passed,
                            failed: outcome.failed,
                            skipped: outcome.skipped,
                            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                            tests: outcome.tests,
                            diagnostics: outcome.diagnostics,
                        },
                        Err(err) => WorkerResult::preparation_failed(
                            id,
                            start.elapsed().as_secs_f64() * 1000.0,
                            err,
                        ),
                    }
                }
                Err(err) => {
                    WorkerResult::preparation_failed(id, start.elapsed().as_secs_f64() * 1000.0, err)
                }
            }
        };

        let result = {
            #[cfg(unix)]
            {
                tokio::select! {
                    biased;
                    _ = sigterm.recv() => {
                        // Same exit path as the between-requests case: the
                        // atexit hook cleans up this request's already
                        // `prepare`d files (registered in the cleanup set
                        // before the run started), no Result is emitted.
                        std::process::exit(0);
                    }
                    result = run_request => result,
                }
            }
            #[cfg(not(unix))]
            {
                run_request.await
            }
        };

        if let Err(err) = response_writer.emit_result(&result) {
            tracing::error!("failed to write result: {err}");
        }
    }
}
