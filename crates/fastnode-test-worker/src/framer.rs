//! Stdio Framer: newline-delimited JSON in, newline-delimited JSON out.
//!
//! Response-channel hygiene — the invariant that nothing but
//! [`ResponseWriter::emit_result`] ever reaches the real stdout pipe — is
//! enforced structurally: on Unix, [`ResponseWriter::install`] duplicates
//! fd 1 aside and redirects the process's fd 1 to `/dev/null` before
//! anything else runs, so later writes through `std::io::stdout()`
//! (including third-party crates and the embedded engine's print op) are
//! swallowed. There is no such trick on Windows; there the JS-level
//! console override installed by [`crate::shim`] is the only defense.

use crate::protocol::{Request, WorkerResult};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Reads framed [`Request`]s from stdin.
pub struct StdioFramer {
    lines: Lines<BufReader<Stdin>>,
}

/// One malformed input line. Carries no request id — there is nothing to
/// echo in a Result, so the caller logs this and keeps reading.
#[derive(Debug)]
pub struct ProtocolError(pub serde_json::Error);

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed request line: {}", self.0)
    }
}

impl Default for StdioFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl StdioFramer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Returns the next request, `None` on clean end-of-input, or
    /// `Some(Err(..))` for a line that didn't parse as JSON (the run for
    /// that line is aborted by the caller; reading continues).
    ///
    /// Blank and whitespace-only lines are skipped without being treated
    /// as a boundary.
    pub async fn next_request(&mut self) -> Option<Result<Request, ProtocolError>> {
        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Some(serde_json::from_str(trimmed).map_err(ProtocolError));
                }
                Ok(None) => return None,
                Err(io_err) => {
                    // Treat a broken pipe/read error the same as EOF: there is
                    // nothing further we can usefully read.
                    tracing::error!("stdin read error: {io_err}");
                    return None;
                }
            }
        }
    }
}

/// Writes framed [`WorkerResult`]s to the real response channel.
pub struct ResponseWriter {
    out: ResponseHandle,
}

#[cfg(unix)]
type ResponseHandle = std::fs::File;

#[cfg(not(unix))]
type ResponseHandle = io::Stdout;

impl ResponseWriter {
    /// Install response-channel hygiene and return the writer.
    ///
    /// Must be called once, as early as possible in `main`, before any
    /// other code has a chance to write to stdout.
    pub fn install() -> io::Result<Self> {
        #[cfg(unix)]
        {
            Ok(Self {
                out: unix_hygiene::redirect_stdout_to_devnull()?,
            })
        }
        #[cfg(not(unix))]
        {
            // No OS-level redirection available; rely on the JS-level
            // console override to keep user output off this channel.
            Ok(Self { out: io::stdout() })
        }
    }

    /// Emit one Result as a single JSON line, then flush immediately.
    ///
    /// The whole line is written in one `write_all` call; no other code
    /// path writes to `self.out`, so no interleaving is possible.
    pub fn emit_result(&mut self, result: &WorkerResult) -> io::Result<()> {
        let mut line = serde_json::to_string(result)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        line.push('\n');
        self.out.write_all(line.as_bytes())?;
        self.out.flush()
    }
}

#[cfg(unix)]
mod unix_hygiene {
    use std::io;
    use std::os::fd::{AsRawFd, FromRawFd};

    /// Duplicates fd 1 aside, then points fd 1 at `/dev/null`.
    ///
    /// Returns a `File` wrapping the duplicate — the only handle through
    /// which the real pipe remains reachable.
    pub fn redirect_stdout_to_devnull() -> io::Result<std::fs::File> {
        // SAFETY: dup() on a valid, open fd (stdout is always open at
        // process start) returns a new fd or -1; we check for -1 below.
        let saved_fd = unsafe { libc::dup(1) };
        if saved_fd < 0 {
            return Err(io::Error::last_os_error());
        }

        let devnull = std::fs::OpenOptions::new().write(true).open("/dev/null")?;

        // SAFETY: dup2() with a valid source fd and the fixed destination
        // fd 1; it atomically closes the previous fd 1 and re-targets it.
        let rc = unsafe { libc::dup2(devnull.as_raw_fd(), 1) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: saved_fd was just returned by a successful dup() above
        // and is not owned anywhere else.
        Ok(unsafe { std::fs::File::from_raw_fd(saved_fd) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_message_mentions_cause() {
        let err = serde_json::from_str::<Request>("not json").unwrap_err();
        let wrapped = ProtocolError(err);
        assert!(wrapped.to_string().contains("malformed request line"));
    }
}
