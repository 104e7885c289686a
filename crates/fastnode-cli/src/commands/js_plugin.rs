//! JavaScript Plugin Host — bridges JS/TS plugins from config files to the Rust Plugin trait.
//!
//! Spawns a dedicated OS thread owning a V8 runtime (`fastnode_runtime::Runtime`).
//! The `JsPlugin` struct implements `Plugin` and communicates with the V8 thread
//! via `std::sync::mpsc` channels, serializing hook calls as JSON.
//!
//! ## Threading Model
//!
//! `Runtime` is `!Send` (uses `Rc<RefCell<...>>`), so it cannot be shared across threads.
//! Instead, we keep it on a single dedicated thread and send requests/responses over channels.
//!
//! ```text
//! Rust (any thread)              V8 Thread
//! ─────────────────              ─────────
//! JsPlugin::transform(code, id)
//!   → serialize to JSON
//!   → send PluginRequest          → recv request
//!   → block on response           → call JS: plugins[i].transform(code, id)
//!   ← deserialize result          ← send JSON response
//! ```

use fastnode_core::bundler::{
    HookResult, LoadResult, Plugin, PluginContext, PluginEnforce, PluginError, ResolveIdResult,
    TransformResult,
};
use std::path::Path;
use std::sync::{mpsc, Arc, Mutex};

/// Helper to construct a `PluginError`.
fn plugin_error(plugin: &str, message: impl Into<String>) -> PluginError {
    PluginError {
        plugin: plugin.to_string(),
        hook: "",
        message: message.into(),
    }
}

// ============================================================================
// Request / Response types
// ============================================================================

#[derive(Debug)]
pub enum PluginRequest {
    CallHook {
        plugin_idx: usize,
        hook: HookCall,
    },
    Shutdown,
}

#[derive(Debug)]
pub enum HookCall {
    ResolveId {
        source: String,
        importer: Option<String>,
    },
    Load {
        id: String,
    },
    Transform {
        code: String,
        id: String,
    },
    TransformIndexHtml {
        html: String,
    },
    BuildStart,
    BuildEnd,
}

#[derive(Debug)]
pub enum PluginResponse {
    ResolveId(Option<ResolveIdResult>),
    Load(Option<LoadResult>),
    Transform(Option<TransformResult>),
    TransformIndexHtml(Option<String>),
    Ok,
    Error(String),
}

// ============================================================================
// Plugin metadata (extracted from JS)
// ============================================================================

/// Metadata about a single JS plugin, extracted from the V8 runtime.
#[derive(Debug, Clone)]
pub struct JsPluginDef {
    pub name: String,
    pub enforce: Option<String>,
    pub has_resolve_id: bool,
    pub has_load: bool,
    pub has_transform: bool,
    pub has_transform_index_html: bool,
    pub has_build_start: bool,
    pub has_build_end: bool,
}

// ============================================================================
// JsPluginHost — owns the V8 thread
// ============================================================================

/// Hosts JS plugins on a dedicated V8 thread.
///
/// Provides a synchronous `call()` method that sends a request to the V8 thread
/// and blocks until the response arrives.
pub struct JsPluginHost {
    request_tx: mpsc::Sender<PluginRequest>,
    response_rx: Mutex<mpsc::Receiver<PluginResponse>>,
    plugin_defs: Vec<JsPluginDef>,
    _thread: Option<std::thread::JoinHandle<()>>,
}

impl JsPluginHost {
    /// Start the JS plugin host.
    ///
    /// Spawns a V8 thread, loads the config file as an ES module,
    /// extracts plugin metadata, and enters a request/response loop.
    pub fn start(config_path: &Path, cwd: &Path) -> Result<Self, String> {
        let config_path = config_path.to_path_buf();
        let cwd = cwd.to_path_buf();

        // Channels: main → V8 thread (requests), V8 thread → main (responses)
        let (req_tx, req_rx) = mpsc::channel::<PluginRequest>();
        let (resp_tx, resp_rx) = mpsc::channel::<PluginResponse>();

        // Oneshot for plugin metadata extraction
        let (meta_tx, meta_rx) = mpsc::channel::<Result<Vec<JsPluginDef>, String>>();

        let thread = std::thread::spawn(move || {
            // Create a single-threaded tokio runtime for async V8 operations
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to create tokio runtime for JS plugin host");

            rt.block_on(async {
                match run_v8_thread(&config_path, &cwd, meta_tx, req_rx, resp_tx).await {
                    Ok(()) => {}
                    Err(e) => {
                        eprintln!("  JS plugin host error: {}", e);
                    }
                }
            });
        });

        // Wait for plugin metadata from the V8 thread
        let plugin_defs = meta_rx
            .recv()
            .map_err(|_| "JS plugin host thread terminated before sending metadata".to_string())?
            .map_err(|e| format!("Failed to extract JS plugins: {}", e))?;

        Ok(Self {
            request_tx: req_tx,
            response_rx: Mutex::new(resp_rx),
            plugin_defs,
            _thread: Some(thread),
        })
    }

    /// Number of plugins loaded.
    pub fn plugin_count(&self) -> usize {
        self.plugin_defs.len()
    }

    /// Plugin definitions.
    pub fn plugin_defs(&self) -> &[JsPluginDef] {
        &self.plugin_defs
    }

    /// Send a request to the V8 thread and block on the response.
    pub fn call(&self, request: PluginRequest) -> Result<PluginResponse, PluginError> {
        self.request_tx
            .send(request)
            .map_err(|_| plugin_error("js-plugin-host", "V8 thread disconnected"))?;

        let rx = self.response_rx.lock().map_err(|_| {
            plugin_error("js-plugin-host", "Response channel lock poisoned")
        })?;

        rx.recv()
            .map_err(|_| plugin_error("js-plugin-host", "V8 thread disconnected"))
    }
}

impl Drop for JsPluginHost {
    fn drop(&mut self) {
        // Signal the V8 thread to shut down
        let _ = self.request_tx.send(PluginRequest::Shutdown);
        if let Some(thread) = self._thread.take() {
            let _ = thread.join();
        }
    }
}

// ============================================================================
// V8 thread main loop
// ============================================================================

/// Bootstrap JS injected before the config module.
///
/// Provides `__howthExtractPlugins()` to enumerate plugins and
/// `__howthCallHook(idx, hookName, argsJson)` to invoke hooks.
const BOOTSTRAP_JS: &str = r#"
globalThis.__howthPlugins = [];

globalThis.__howthExtractPlugins = () => {
  const config = globalThis.__howthConfigDefault;
  const plugins = Array.isArray(config?.plugins)
    ? config.plugins.flat(Infinity).filter(Boolean)
    : [];
  globalThis.__howthPlugins = plugins;
  return JSON.stringify(plugins.map((p, i) => ({
    name: p.name || `js-plugin-${i}`,
    enforce: p.enforce || null,
    has_resolveId: typeof p.resolveId === 'function',
    has_load: typeof p.load === 'function',
    has_transform: typeof p.transform === 'function',
    has_transformIndexHtml: typeof p.transformIndexHtml === 'function',
    has_buildStart: typeof p.buildStart === 'function',
    has_buildEnd: typeof p.buildEnd === 'function',
  })));
};

globalThis.__howthCallHook = (pluginIdx, hookName, argsJson) => {
  const plugin = globalThis.__howthPlugins[pluginIdx];
  if (!plugin || typeof plugin[hookName] !== 'function') return 'null';
  try {
    const args = argsJson ? JSON.parse(argsJson) : [];
    const result = plugin[hookName](...args);
    if (result === undefined || result === null) return 'null';
    if (typeof result === 'string') return JSON.stringify({ code: result });
    return JSON.stringify(result);
  } catch (err) {
    return JSON.stringify({ __error: err.message || String(err) });
  }
};
"#;

/// Run the V8 runtime loop on the dedicated thread.
async fn run_v8_thread(
    config_path: &Path,
    cwd: &Path,
    meta_tx: mpsc::Sender<Result<Vec<JsPluginDef>, String>>,
    req_rx: mpsc::Receiver<PluginRequest>,
    resp_tx: mpsc::Sender<PluginResponse>,
) -> Result<(), String> {
    use fastnode_runtime::{Runtime, RuntimeOptions, VirtualModuleMap};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    // Create virtual module map with a wrapper that imports the config and captures
    // the default export.
    let config_abs = std::fs::canonicalize(config_path)
        .map_err(|e| format!("Cannot resolve config path: {}", e))?;

    // On macOS, canonicalize may return /private/var/... paths. Convert file:// URL.
    let config_url = url::Url::from_file_path(&config_abs)
        .map_err(|_| format!("Invalid config path: {}", config_abs.display()))?;

    let wrapper_code = format!(
        "import config from '{}';\nglobalThis.__howthConfigDefault = config;\n",
        config_url.as_str()
    );

    let virtual_modules: VirtualModuleMap =
        Rc::new(RefCell::new(HashMap::new()));
    let wrapper_path = cwd.join("__howth_plugin_loader__.mjs");
    virtual_modules
        .borrow_mut()
        .insert(wrapper_path.to_string_lossy().to_string(), wrapper_code);

    let mut runtime = Runtime::new(RuntimeOptions {
        main_module: Some(wrapper_path.clone()),
        cwd: Some(cwd.to_path_buf()),
        virtual_modules: Some(virtual_modules),
        ..Default::default()
    })
    .map_err(|e| format!("Failed to create V8 runtime: {}", e))?;

    // Inject bootstrap JS
    runtime
        .execute_script(BOOTSTRAP_JS)
        .await
        .map_err(|e| format!("Failed to inject bootstrap JS: {}", e))?;

    // Load the config module (this executes the wrapper which imports the config)
    runtime
        .execute_module(&wrapper_path)
        .await
        .map_err(|e| format!("Failed to load config module: {}", e))?;

    // Run the event loop to complete any pending module loads
    runtime
        .run_event_loop()
        .await
        .map_err(|e| format!("Failed to run event loop: {}", e))?;

    // Extract plugin metadata
    let meta_json = runtime
        .eval_to_string("globalThis.__howthExtractPlugins()")
        .map_err(|e| format!("Failed to extract plugins: {}", e))?;

    let plugin_defs = parse_plugin_metadata(&meta_json)?;

    // Send metadata back to the main thread
    meta_tx
        .send(Ok(plugin_defs))
        .map_err(|_| "Main thread disconnected before receiving plugin metadata".to_string())?;

    // Enter the request/response loop
    loop {
        let request = match req_rx.recv() {
            Ok(req) => req,
            Err(_) => break, // Channel closed, main thread dropped
        };

        match request {
            PluginRequest::Shutdown => break,
            PluginRequest::CallHook { plugin_idx, hook } => {
                let response = execute_hook(&mut runtime, plugin_idx, &hook);
                if resp_tx.send(response).is_err() {
                    break; // Main thread disconnected
                }
            }
        }
    }

    Ok(())
}

/// Parse plugin metadata JSON into `JsPluginDef` structs.
fn parse_plugin_metadata(json: &str) -> Result<Vec<JsPluginDef>, String> {
    let arr: Vec<serde_json::Value> =
        serde_json::from_str(json).map_err(|e| format!("Invalid plugin metadata JSON: {}", e))?;

    Ok(arr
        .into_iter()
        .map(|v| JsPluginDef {
            name: v["name"].as_str().unwrap_or("unnamed").to_string(),
            enforce: v["enforce"].as_str().map(|s| s.to_string()),
            has_resolve_id: v["has_resolveId"].as_bool().unwrap_or(false),
            has_load: v["has_load"].as_bool().unwrap_or(false),
            has_transform: v["has_transform"].as_bool().unwrap_or(false),
            has_transform_index_html: v["has_transformIndexHtml"].as_bool().unwrap_or(false),
            has_build_start: v["has_buildStart"].as_bool().unwrap_or(false),
            has_build_end: v["has_buildEnd"].as_bool().unwrap_or(false),
        })
        .collect())
}

/// Execute a single hook call in the V8 runtime.
fn execute_hook(
    runtime: &mut fastnode_runtime::Runtime,
    plugin_idx: usize,
    hook: &HookCall,
) -> PluginResponse {
    let (hook_name, args_json) = match hook {
        HookCall::ResolveId { source, importer } => {
            let args = serde_json::json!([source, importer]);
            ("resolveId", args.to_string())
        }
        HookCall::Load { id } => {
            let args = serde_json::json!([id]);
            ("load", args.to_string())
        }
        HookCall::Transform { code, id } => {
            let args = serde_json::json!([code, id]);
            ("transform", args.to_string())
        }
        HookCall::TransformIndexHtml { html } => {
            let args = serde_json::json!([html]);
            ("transformIndexHtml", args.to_string())
        }
        HookCall::BuildStart => ("buildStart", "[]".to_string()),
        HookCall::BuildEnd => ("buildEnd", "[]".to_string()),
    };

    let escaped_args = args_json.replace('\\', "\\\\").replace('\'', "\\'");
    let js_code = format!(
        "globalThis.__howthCallHook({}, '{}', '{}')",
        plugin_idx, hook_name, escaped_args
    );

    let result_str = match runtime.eval_to_string(&js_code) {
        Ok(s) => s,
        Err(e) => return PluginResponse::Error(format!("V8 eval error: {}", e)),
    };

    // Parse the JSON response
    parse_hook_response(&result_str, hook)
}

/// Parse the JSON response from a hook call.
fn parse_hook_response(json_str: &str, hook: &HookCall) -> PluginResponse {
    if json_str == "null" || json_str.is_empty() {
        return match hook {
            HookCall::ResolveId { .. } => PluginResponse::ResolveId(None),
            HookCall::Load { .. } => PluginResponse::Load(None),
            HookCall::Transform { .. } => PluginResponse::Transform(None),
            HookCall::TransformIndexHtml { .. } => PluginResponse::TransformIndexHtml(None),
            HookCall::BuildStart | HookCall::BuildEnd => PluginResponse::Ok,
        };
    }

    let value: serde_json::Value = match serde_json::from_str(json_str) {
        Ok(v) => v,
        Err(e) => return PluginResponse::Error(format!("Invalid JSON from hook: {}", e)),
    };

    // Check for error
    if let Some(err) = value.get("__error").and_then(|v| v.as_str()) {
        return PluginResponse::Error(err.to_string());
    }

    match hook {
        HookCall::ResolveId { .. } => {
            if let Some(id) = value.get("id").and_then(|v| v.as_str()) {
                PluginResponse::ResolveId(Some(ResolveIdResult {
                    id: id.to_string(),
                    external: value
                        .get("external")
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false),
                }))
            } else {
                PluginResponse::ResolveId(None)
            }
        }
        HookCall::Load { .. } => {
            if let Some(code) = value.get("code").and_then(|v| v.as_str()) {
                PluginResponse::Load(Some(LoadResult {
                    code: code.to_string(),
                    map: value.get("map").and_then(|v| v.as_str()).map(|s| s.to_string()),
                }))
            } else {
                PluginResponse::Load(None)
            }
        }
        HookCall::Transform { .. } => {
            if let Some(code) = value.get("code").and_then(|v| v.as_str()) {
                PluginResponse::Transform(Some(TransformResult {
                    code: code.to_string(),
                    map: value.get("map").and_then(|v| v.as_str()).map(|s| s.to_string()),
                }))
            } else {
                PluginResponse::Transform(None)
            }
        }
        HookCall::TransformIndexHtml { .. } => {
            if let Some(html) = value.get("code").and_then(|v| v.as_str()) {
                PluginResponse::TransformIndexHtml(Some(html.to_string()))
            } else {
                PluginResponse::TransformIndexHtml(None)
            }
        }
        HookCall::BuildStart | HookCall::BuildEnd => PluginResponse::Ok,
    }
}

// ============================================================================
// JsPlugin — implements the Rust Plugin trait
// ============================================================================

/// A JS plugin that delegates hook calls to the V8 thread via `JsPluginHost`.
pub struct JsPlugin {
    name: String,
    enforce: PluginEnforce,
    plugin_idx: usize,
    host: Arc<JsPluginHost>,
    has_resolve_id: bool,
    has_load: bool,
    has_transform: bool,
    has_transform_index_html: bool,
    has_build_start: bool,
    has_build_end: bool,
}

impl JsPlugin {
    pub fn new(def: &JsPluginDef, plugin_idx: usize, host: Arc<JsPluginHost>) -> Self {
        let enforce = match def.enforce.as_deref() {
            Some("pre") => PluginEnforce::Pre,
            Some("post") => PluginEnforce::Post,
            _ => PluginEnforce::Normal,
        };

        Self {
            name: def.name.clone(),
            enforce,
            plugin_idx,
            host,
            has_resolve_id: def.has_resolve_id,
            has_load: def.has_load,
            has_transform: def.has_transform,
            has_transform_index_html: def.has_transform_index_html,
            has_build_start: def.has_build_start,
            has_build_end: def.has_build_end,
        }
    }
}

// Ensure JsPlugin is Send + Sync (required by Plugin trait)
const _: () = {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    fn _assert() {
        assert_send::<JsPlugin>();
        assert_sync::<JsPlugin>();
    }
};

impl Plugin for JsPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn enforce(&self) -> PluginEnforce {
        self.enforce
    }

    fn build_start(&self, _ctx: &PluginContext) -> HookResult<()> {
        if !self.has_build_start {
            return Ok(());
        }
        match self.host.call(PluginRequest::CallHook {
            plugin_idx: self.plugin_idx,
            hook: HookCall::BuildStart,
        })? {
            PluginResponse::Error(e) => Err(plugin_error(&self.name, e)),
            _ => Ok(()),
        }
    }

    fn resolve_id(
        &self,
        specifier: &str,
        importer: Option<&str>,
        _ctx: &PluginContext,
    ) -> HookResult<Option<ResolveIdResult>> {
        if !self.has_resolve_id {
            return Ok(None);
        }
        match self.host.call(PluginRequest::CallHook {
            plugin_idx: self.plugin_idx,
            hook: HookCall::ResolveId {
                source: specifier.to_string(),
                importer: importer.map(|s| s.to_string()),
            },
        })? {
            PluginResponse::ResolveId(result) => Ok(result),
            PluginResponse::Error(e) => Err(plugin_error(&self.name, e)),
            _ => Ok(None),
        }
    }

    fn load(&self, id: &str, _ctx: &PluginContext) -> HookResult<Option<LoadResult>> {
        if !self.has_load {
            return Ok(None);
        }
        match self.host.call(PluginRequest::CallHook {
            plugin_idx: self.plugin_idx,
            hook: HookCall::Load {
                id: id.to_string(),
            },
        })? {
            PluginResponse::Load(result) => Ok(result),
            PluginResponse::Error(e) => Err(plugin_error(&self.name, e)),
            _ => Ok(None),
        }
    }

    fn transform(
        &self,
        code: &str,
        id: &str,
        _ctx: &PluginContext,
    ) -> HookResult<Option<TransformResult>> {
        if !self.has_transform {
            return Ok(None);
        }
        match self.host.call(PluginRequest::CallHook {
            plugin_idx: self.plugin_idx,
            hook: HookCall::Transform {
                code: code.to_string(),
                id: id.to_string(),
            },
        })? {
            PluginResponse::Transform(result) => Ok(result),
            PluginResponse::Error(e) => Err(plugin_error(&self.name, e)),
            _ => Ok(None),
        }
    }

    fn transform_index_html(&self, html: &str) -> HookResult<Option<String>> {
        if !self.has_transform_index_html {
            return Ok(None);
        }
        match self.host.call(PluginRequest::CallHook {
            plugin_idx: self.plugin_idx,
            hook: HookCall::TransformIndexHtml {
                html: html.to_string(),
            },
        })? {
            PluginResponse::TransformIndexHtml(result) => Ok(result),
            PluginResponse::Error(e) => Err(plugin_error(&self.name, e)),
            _ => Ok(None),
        }
    }

    fn build_end(&self, _ctx: &PluginContext) -> HookResult<()> {
        if !self.has_build_end {
            return Ok(());
        }
        match self.host.call(PluginRequest::CallHook {
            plugin_idx: self.plugin_idx,
            hook: HookCall::BuildEnd,
        })? {
            PluginResponse::Error(e) => Err(plugin_error(&self.name, e)),
            _ => Ok(()),
        }
    }
}
