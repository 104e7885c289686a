//! Workspace Manager: materialises request files as temp sources adjacent
//! to their declared paths (so the engine's module resolver finds
//! `node_modules` and sibling imports the way it would for the real file),
//! tracks them for cleanup, and sweeps stale files left behind by a prior
//! process.

use crate::error::WorkerError;
use crate::protocol::Request;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

/// Fixed literal identifying this runner in prepared file names, and the
/// marker the stale-file sweep looks for.
const PREFIX: &str = "howth-testw";

/// Extensions treated as CommonJS when choosing the prepared file's own
/// extension. Anything else is written out with the ESM extension, which
/// sidesteps `package.json`'s `"type"` field entirely for the synthetic
/// file.
const CJS_EXTENSIONS: &[&str] = &["cjs"];

/// One request file, written to disk next to its declared original path.
#[derive(Debug, Clone)]
pub struct PreparedFile {
    /// The path the caller declared. Used only for the `file` field of
    /// emitted `TestRecord`s — never read from or written to.
    pub original_path: PathBuf,
    /// The absolute path the (already-transpiled) code was actually
    /// written to; this is what gets imported.
    pub written_path: PathBuf,
}

fn cleanup_set() -> &'static Mutex<HashSet<PathBuf>> {
    static SET: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    SET.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Drop a single trailing `.test` or `.spec` segment from a file stem, so
/// the prepared file is never itself re-discovered as a test by a
/// directory scan.
fn strip_test_suffix(stem: &str) -> &str {
    stem.strip_suffix(".test")
        .or_else(|| stem.strip_suffix(".spec"))
        .unwrap_or(stem)
}

fn target_extension(original: &Path) -> &'static str {
    let ext = original
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if CJS_EXTENSIONS.contains(&ext.as_str()) {
        "cjs"
    } else {
        "mjs"
    }
}

/// Best-effort removal of `.<prefix>-*` entries in `dir` whose embedded pid
/// differs from `current_pid` — leftovers from a process that did not get
/// to run its own exit hooks (e.g. `kill -9`).
fn sweep_stale(dir: &Path, current_pid: u32) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let marker = format!(".{PREFIX}-");
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Some(rest) = name.strip_prefix(marker.as_str()) else {
            continue;
        };
        let pid_matches = rest
            .split('-')
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .map(|pid| pid == current_pid)
            .unwrap_or(false);
        if !pid_matches {
            let _ = std::fs::remove_file(entry.path());
        }
    }
}

/// Registered once at process startup; deletes everything in the
/// process-wide cleanup set. Installed as a libc `atexit` handler so it
/// also fires when user code calls the engine's process-exit primitive
/// (which goes through libc's `exit()`, running atexit hooks) and, on
/// Unix, when the SIGTERM handler in `main` calls `std::process::exit`.
#[cfg(unix)]
extern "C" fn cleanup_on_exit() {
    if let Ok(set) = cleanup_set().lock() {
        for path in set.iter() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[derive(Default)]
pub struct WorkspaceManager {
    _private: (),
}

impl WorkspaceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write each request file to its prepared path, in request order.
    /// Sweeps each distinct directory for stale files from other
    /// processes at most once per call.
    pub fn prepare(&self, request: &Request) -> Result<Vec<PreparedFile>, WorkerError> {
        let pid = std::process::id();
        let mut swept_dirs: HashSet<PathBuf> = HashSet::new();
        let mut seen_names: HashMap<(PathBuf, String), u32> = HashMap::new();
        let mut prepared = Vec::with_capacity(request.files.len());

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        for file in &request.files {
            let declared_path = PathBuf::from(&file.path);
            // The engine's module resolver treats a leading `/` as an
            // absolute specifier; a relative declared path is made
            // absolute against the worker's cwd so the prepared file can
            // be `import()`-ed directly by path.
            let original_path = if declared_path.is_absolute() {
                declared_path
            } else {
                cwd.join(declared_path)
            };
            let dir = original_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf();

            if swept_dirs.insert(dir.clone()) {
                sweep_stale(&dir, pid);
            }

            let stem = original_path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let stem = strip_test_suffix(&stem).to_string();
            let ext = target_extension(&original_path);

            let index = seen_names.entry((dir.clone(), stem.clone())).or_insert(0);
            let disambiguator = if *index == 0 {
                String::new()
            } else {
                format!("-{index}")
            };
            *index += 1;

            let file_name =
                format!(".{PREFIX}-{pid}-{}-{stem}{disambiguator}.{ext}", request.id);
            let written_path = dir.join(file_name);

            std::fs::write(&written_path, &file.code)?;
            if let Ok(mut set) = cleanup_set().lock() {
                set.insert(written_path.clone());
            }

            prepared.push(PreparedFile {
                original_path,
                written_path,
            });
        }

        Ok(prepared)
    }

    /// Best-effort delete each prepared file and drop it from the cleanup
    /// set. Deletion failures are ignored — the next sweep will catch a
    /// leftover.
    pub fn release(&self, files: &[PreparedFile]) {
        if let Ok(mut set) = cleanup_set().lock() {
            for file in files {
                let _ = std::fs::remove_file(&file.written_path);
                set.remove(&file.written_path);
            }
        }
    }

    /// Register the process-exit cleanup hook. Call once, at startup.
    pub fn install_exit_hooks(&self) {
        #[cfg(unix)]
        unsafe {
            libc::atexit(cleanup_on_exit);
        }
    }
}
