//! Deterministic hashing for the build system.
//!
//! Uses blake3 for fast, cryptographic hashing.
//! All hashing is deterministic across platforms.
//!
//! ## Hashing Rules (v1)
//!
//! - Paths are normalized to forward slashes
//! - Files are hashed by content
//! - Globs expand deterministically (sorted by path)
//! - Environment variables are hashed by allowlist only

use super::graph::{BuildInput, BuildNode, DEFAULT_GLOB_EXCLUSIONS};
use blake3::Hasher;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Result type for hashing operations.
pub type HashResult<T> = Result<T, HashError>;

/// Error during hashing.
#[derive(Debug)]
pub struct HashError {
    /// Error code.
    pub code: &'static str,
    /// Error message.
    pub message: String,
    /// Path that caused the error (if applicable).
    pub path: Option<PathBuf>,
}

impl HashError {
    /// Create a new hash error.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    /// Create with path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Create an I/O error.
    #[must_use]
    pub fn io(path: &Path, err: io::Error) -> Self {
        Self {
            code: super::codes::BUILD_HASH_IO_ERROR,
            message: err.to_string(),
            path: Some(path.to_path_buf()),
        }
    }
}

impl std::fmt::Display for HashError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}: {} ({})", self.code, self.message, path.display())
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for HashError {}

/// Normalize a path for hashing.
///
/// - Converts to absolute path (if not already)
/// - Normalizes separators to forward slashes
/// - Strips trailing slashes
/// - Keeps case as-is (no lowercasing)
#[must_use]
pub fn normalize_path(path: &Path) -> String {
    let abs_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_default()
            .join(path)
    };

    let mut normalized = abs_path
        .to_string_lossy()
        .replace('\\', "/");

    // Strip trailing slash
    while normalized.ends_with('/') && normalized.len() > 1 {
        normalized.pop();
    }

    normalized
}

/// Hash a file by its contents.
pub fn hash_file(path: &Path) -> HashResult<String> {
    let contents = fs::read(path).map_err(|e| HashError::io(path, e))?;
    Ok(hash_bytes(&contents))
}

/// Hash raw bytes.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> String {
    let hash = blake3::hash(data);
    hash.to_hex().to_string()
}

/// Hash a string.
#[must_use]
pub fn hash_string(s: &str) -> String {
    hash_bytes(s.as_bytes())
}

/// Expand a glob pattern and return sorted file paths.
///
/// Files are sorted by normalized path for determinism.
pub fn expand_glob(pattern: &str, root: &Path, exclusions: &[&str]) -> HashResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    // Walk the directory
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            // Check exclusions
            let path = e.path();
            let rel = path.strip_prefix(root).unwrap_or(path);
            let rel_str = rel.to_string_lossy();

            // Skip excluded patterns
            for exclusion in exclusions {
                if let Some(prefix) = exclusion.strip_suffix("/**") {
                    if rel_str.starts_with(prefix) || rel_str == prefix.trim_end_matches('/') {
                        return false;
                    }
                } else if glob::Pattern::new(exclusion)
                    .map(|p| p.matches(&rel_str))
                    .unwrap_or(false)
                {
                    return false;
                }
            }
            true
        })
    {
        let entry = entry.map_err(|e| {
            HashError::new(
                super::codes::BUILD_HASH_IO_ERROR,
                format!("Failed to walk directory: {e}"),
            )
        })?;

        if entry.file_type().is_file() {
            let path = entry.path();
            let rel = path.strip_prefix(root).unwrap_or(path);
            let rel_str = rel.to_string_lossy();

            // Check if matches pattern
            let matches = if pattern == "**/*" {
                true
            } else {
                glob::Pattern::new(pattern)
                    .map(|p| p.matches(&rel_str))
                    .unwrap_or(false)
            };

            if matches {
                files.push(path.to_path_buf());
            }
        }
    }

    // Sort by normalized path for determinism
    files.sort_by(|a, b| {
        let a_norm = normalize_path(a);
        let b_norm = normalize_path(b);
        a_norm.cmp(&b_norm)
    });

    Ok(files)
}

/// Hash all files matched by a glob pattern.
pub fn hash_glob(pattern: &str, root: &Path, exclusions: &[&str]) -> HashResult<String> {
    let files = expand_glob(pattern, root, exclusions)?;

    let mut hasher = Hasher::new();

    for file in &files {
        let normalized = normalize_path(file);
        hasher.update(normalized.as_bytes());
        hasher.update(b"\0");

        match fs::read(file) {
            Ok(contents) => {
                hasher.update(&contents);
            }
            Err(_) => {
                // File missing - include marker
                hasher.update(b"<missing>");
            }
        }
        hasher.update(b"\0");
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Hash environment variables from allowlist.
#[must_use]
pub fn hash_env(allowlist: &[String]) -> String {
    let mut hasher = Hasher::new();

    // Sort allowlist for determinism
    let mut sorted: Vec<_> = allowlist.iter().collect();
    sorted.sort();

    for key in sorted {
        let value = std::env::var(key).unwrap_or_default();
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\0");
    }

    hasher.finalize().to_hex().to_string()
}

/// Canonical encoding for a build input.
fn encode_input(input: &BuildInput) -> Vec<u8> {
    let mut buf = Vec::new();

    match input {
        BuildInput::File { path } => {
            buf.extend_from_slice(b"file\0");
            buf.extend_from_slice(path.as_bytes());
            buf.push(0);
        }
        BuildInput::Glob { pattern, root } => {
            buf.extend_from_slice(b"glob\0");
            buf.extend_from_slice(pattern.as_bytes());
            buf.push(0);
            buf.extend_from_slice(root.as_bytes());
            buf.push(0);
        }
        BuildInput::Package { name, version } => {
            buf.extend_from_slice(b"package\0");
            buf.extend_from_slice(name.as_bytes());
            buf.push(0);
            buf.extend_from_slice(version.as_deref().unwrap_or("unknown").as_bytes());
            buf.push(0);
        }
        BuildInput::Lockfile { path, schema_version } => {
            buf.extend_from_slice(b"lockfile\0");
            buf.extend_from_slice(path.as_bytes());
            buf.push(0);
            buf.extend_from_slice(schema_version.to_string().as_bytes());
            buf.push(0);
        }
        BuildInput::Env { key } => {
            buf.extend_from_slice(b"env\0");
            buf.extend_from_slice(key.as_bytes());
            buf.push(0);
        }
    }

    buf
}

/// Hash a single build input.
pub fn hash_input(input: &BuildInput, cwd: &Path) -> HashResult<String> {
    match input {
        BuildInput::File { path } => {
            let full_path = if Path::new(path).is_absolute() {
                PathBuf::from(path)
            } else {
                cwd.join(path)
            };

            if full_path.exists() {
                hash_file(&full_path)
            } else {
                // Missing file - include marker in hash
                Ok(hash_string(&format!("missing:{}", normalize_path(&full_path))))
            }
        }
        BuildInput::Glob { pattern, root } => {
            let root_path = if Path::new(root).is_absolute() {
                PathBuf::from(root)
            } else {
                cwd.join(root)
            };

            hash_glob(pattern, &root_path, DEFAULT_GLOB_EXCLUSIONS)
        }
        BuildInput::Package { name, version } => {
            Ok(hash_string(&format!(
                "package:{}:{}",
                name,
                version.as_deref().unwrap_or("unknown")
            )))
        }
        BuildInput::Lockfile { path, .. } => {
            let full_path = if Path::new(path).is_absolute() {
                PathBuf::from(path)
            } else {
                cwd.join(path)
            };

            if full_path.exists() {
                hash_file(&full_path)
            } else {
                Ok(hash_string("lockfile:missing"))
            }
        }
        BuildInput::Env { key } => {
            let value = std::env::var(key).unwrap_or_default();
            Ok(hash_string(&format!("env:{}={}", key, value)))
        }
    }
}

/// Compute the hash for a build node.
///
/// The hash is computed from:
/// - Schema version
/// - Node kind
/// - Node label
/// - All input hashes
/// - Environment hash
/// - Script specification
/// - Dependencies
pub fn hash_node(node: &BuildNode, cwd: &Path) -> HashResult<String> {
    let mut hasher = Hasher::new();

    // Schema version
    hasher.update(b"schema:");
    hasher.update(super::graph::BUILD_GRAPH_SCHEMA_VERSION.to_string().as_bytes());
    hasher.update(b"\0");

    // Kind
    hasher.update(b"kind:");
    hasher.update(node.kind.as_str().as_bytes());
    hasher.update(b"\0");

    // Label
    hasher.update(b"label:");
    hasher.update(node.label.as_bytes());
    hasher.update(b"\0");

    // Inputs (sorted by canonical encoding)
    let mut input_hashes: Vec<(Vec<u8>, String)> = Vec::new();
    for input in &node.inputs {
        let encoded = encode_input(input);
        let hash = hash_input(input, cwd)?;
        input_hashes.push((encoded, hash));
    }
    // Sort by encoding for determinism
    input_hashes.sort_by(|a, b| a.0.cmp(&b.0));

    hasher.update(b"inputs:");
    for (encoded, hash) in &input_hashes {
        hasher.update(encoded);
        hasher.update(hash.as_bytes());
        hasher.update(b"\0");
    }

    // Environment
    hasher.update(b"env:");
    hasher.update(hash_env(&node.env_allowlist).as_bytes());
    hasher.update(b"\0");

    // Script
    if let Some(script) = &node.script {
        hasher.update(b"script:");
        hasher.update(script.name.as_bytes());
        hasher.update(b"\0");
        hasher.update(script.command.as_bytes());
        hasher.update(b"\0");
        hasher.update(if script.shell { b"shell" } else { b"noshell" });
        hasher.update(b"\0");
    }

    // Dependencies (sorted)
    let mut deps = node.deps.clone();
    deps.sort();
    hasher.update(b"deps:");
    for dep in &deps {
        hasher.update(dep.as_bytes());
        hasher.update(b"\0");
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Compute hashes for all nodes in a graph.
pub fn hash_graph(graph: &super::graph::BuildGraph) -> HashResult<BTreeMap<String, String>> {
    let cwd = Path::new(&graph.cwd);
    let mut hashes = BTreeMap::new();

    for node in &graph.nodes {
        let hash = hash_node(node, cwd)?;
        hashes.insert(node.id.clone(), hash);
    }

    Ok(hashes)
}
