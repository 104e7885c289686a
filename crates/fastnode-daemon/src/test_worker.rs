//! Client for the warm test-execution worker process used by `howth test`.
//!
//! Keeps a long-running `fastnode-test-worker` child process alive across
//! requests, speaking its newline-delimited JSON protocol directly via
//! `fastnode_test_worker::protocol` rather than redefining the wire types
//! here.

use fastnode_test_worker::protocol::{Request as WorkerRequest, RequestFile, WorkerResult};
use std::io;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

/// How long to wait for one batch of tests before giving up on the worker.
const RUN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);

/// Manages a warm `fastnode-test-worker` child process.
pub struct TestWorkerProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    binary_path: PathBuf,
    next_id: u64,
}

/// Locates the `fastnode-test-worker` binary: first next to the daemon's own
/// executable (the normal installed layout), falling back to `PATH` so a
/// `cargo run`-built daemon can still find a separately built worker.
fn locate_worker_binary() -> io::Result<PathBuf> {
    let exe_name = if cfg!(windows) {
        "fastnode-test-worker.exe"
    } else {
        "fastnode-test-worker"
    };

    if let Ok(current_exe) = std::env::current_exe() {
        if let Some(dir) = current_exe.parent() {
            let candidate = dir.join(exe_name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    Ok(PathBuf::from(exe_name))
}

impl TestWorkerProcess {
    /// Spawn a new test worker process.
    pub async fn spawn() -> io::Result<Self> {
        let binary_path = locate_worker_binary()?;
        let (child, stdin, stdout) = Self::spawn_child(&binary_path)?;

        let pid: u32 = child.id().unwrap_or(0);
        debug!("spawned test worker (pid={pid})");

        Ok(Self {
            child,
            stdin,
            stdout,
            binary_path,
            next_id: 0,
        })
    }

    fn spawn_child(
        binary_path: &std::path::Path,
    ) -> io::Result<(Child, ChildStdin, BufReader<ChildStdout>)> {
        let mut child = Command::new(binary_path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("failed to capture test worker stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("failed to capture test worker stdout"))?;

        Ok((child, stdin, BufReader::new(stdout)))
    }

    /// Check if the worker process is still alive.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Respawn the worker if it has died (e.g. crashed on a prior batch).
    async fn ensure_alive(&mut self) -> io::Result<()> {
        if !self.is_alive() {
            warn!("test worker died, respawning");
            let (child, stdin, stdout) = Self::spawn_child(&self.binary_path)?;
            self.child = child;
            self.stdin = stdin;
            self.stdout = stdout;
            debug!(
                "respawned test worker (pid={})",
                self.child.id().unwrap_or(0)
            );
        }
        Ok(())
    }

    /// Run one batch of already-transpiled files on the warm worker.
    pub async fn run_tests(
        &mut self,
        files: Vec<RequestFile>,
        force_exit: bool,
    ) -> io::Result<WorkerResult> {
        self.ensure_alive().await?;

        self.next_id += 1;
        let id = format!("t{}", self.next_id);

        let request = WorkerRequest {
            id: id.clone(),
            files,
            force_exit,
        };

        let mut json = serde_json::to_string(&request)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        json.push('\n');

        self.stdin.write_all(json.as_bytes()).await?;
        self.stdin.flush().await?;

        let mut line = String::new();
        let read_result = tokio::time::timeout(RUN_TIMEOUT, self.stdout.read_line(&mut line)).await;

        match read_result {
            Ok(Ok(0)) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "test worker closed stdout",
            )),
            Ok(Ok(_)) => {
                let result: WorkerResult = serde_json::from_str(line.trim())
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                if result.id != id {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("response id mismatch: expected {id}, got {}", result.id),
                    ));
                }
                Ok(result)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("test worker timed out after {}s", RUN_TIMEOUT.as_secs()),
            )),
        }
    }
}
