//! Warm, single-realm test-execution worker for howth test.
//!
//! Accepts newline-delimited JSON [`protocol::Request`]s on stdin, runs
//! each request's already-transpiled files in one shared `fastnode-runtime`
//! realm, and emits one newline-delimited JSON [`protocol::WorkerResult`]
//! per request on stdout. See `DESIGN.md` for how each component below maps
//! onto this module layout.
//!
//! | Component | Module |
//! |---|---|
//! | Stdio Framer | [`framer`] |
//! | Workspace Manager | [`workspace`] |
//! | Shim Registry | [`shim`] |
//! | Run Executor | [`executor`], [`harness`] |
//! | Drain Supervisor | [`drain`] |

pub mod drain;
pub mod error;
pub mod executor;
pub mod framer;
pub mod harness;
pub mod protocol;
pub mod shim;
pub mod workspace;

pub use error::WorkerError;
pub use protocol::{Request, RequestFile, TestRecord, TestStatus, WorkerResult};
