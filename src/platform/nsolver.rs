//! N-parameter challenge solver
//!
//! Stream URLs carry an `n` query parameter whose value must be transformed
//! by an obfuscated per-player function, or the origin throttles the
//! transfer. The solver locates that function in the player script, extracts
//! its complete declaration, and replays it inside an embedded JavaScript
//! isolate with no host capabilities.
//!
//! Solving is best-effort: any evaluation failure returns the input
//! unchanged and flips a degraded flag so later solves short-circuit.
//! Downloads are then throttled but still work.

use crate::error::RvrError;
use crate::utils::cache::new_sync_cache;
use deno_core::{FastString, JsRuntime, RuntimeOptions};
use moka::sync::Cache;
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Wall-clock budget for a single evaluation; pathological player scripts
/// must not stall the resolve.
const EVAL_BUDGET: Duration = Duration::from_secs(5);

/// Solved values are reused across formats of the same resolve
const SOLVED_CACHE_TTL: Duration = Duration::from_secs(600);

/// N-parameter solver bound to one player script
pub struct NSolver {
    func_code: Option<String>,
    degraded: AtomicBool,
    solved: Cache<String, String>,
}

impl NSolver {
    /// Build a solver from the player script.
    ///
    /// Never fails: if the function cannot be located the solver passes
    /// inputs through unchanged, since some streams carry no challenge.
    pub fn from_player_js(player_js: &str) -> Self {
        let func_code = match extract_n_function(player_js) {
            Ok(Some(body)) => {
                debug!("n function extracted ({} chars)", body.len());
                Some(format!("var nFunction = {};", body))
            }
            Ok(None) => {
                debug!("no n function in player script");
                None
            }
            Err(e) => {
                warn!("n function extraction failed: {}", e);
                None
            }
        };

        Self {
            func_code,
            degraded: AtomicBool::new(false),
            solved: new_sync_cache(SOLVED_CACHE_TTL),
        }
    }

    /// Whether a transform function was located in the player script
    pub fn has_function(&self) -> bool {
        self.func_code.is_some()
    }

    /// Whether a previous evaluation failed and the solver now passes
    /// inputs through
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Solve the challenge for one input.
    ///
    /// Returns the transformed value, or the input unchanged when no
    /// function was found, the solver is degraded, or evaluation fails.
    pub async fn solve(&self, n: &str) -> String {
        let Some(func_code) = &self.func_code else {
            return n.to_string();
        };
        if self.is_degraded() {
            return n.to_string();
        }
        if let Some(hit) = self.solved.get(n) {
            return hit;
        }

        let code = func_code.clone();
        let input = n.to_string();
        let evaluated = tokio::time::timeout(
            EVAL_BUDGET,
            tokio::task::spawn_blocking(move || evaluate_n_function(&code, &input)),
        )
        .await;

        match evaluated {
            Ok(Ok(Ok(solved))) if !solved.is_empty() => {
                self.solved.insert(n.to_string(), solved.clone());
                solved
            }
            Ok(Ok(Ok(_))) => {
                warn!("n function returned empty result, marking solver degraded");
                self.degraded.store(true, Ordering::Relaxed);
                n.to_string()
            }
            Ok(Ok(Err(e))) => {
                warn!("n function evaluation failed, marking solver degraded: {}", e);
                self.degraded.store(true, Ordering::Relaxed);
                n.to_string()
            }
            Ok(Err(join_err)) => {
                warn!("n solver task failed, marking solver degraded: {}", join_err);
                self.degraded.store(true, Ordering::Relaxed);
                n.to_string()
            }
            Err(_) => {
                warn!("n function evaluation exceeded budget, marking solver degraded");
                self.degraded.store(true, Ordering::Relaxed);
                n.to_string()
            }
        }
    }
}

/// Evaluate the wrapped declaration and call it with the input.
///
/// Runs in a fresh isolate per call: no globals survive between
/// evaluations, and the script has no network, filesystem, or timers.
fn evaluate_n_function(func_code: &str, input: &str) -> Result<String, RvrError> {
    let mut runtime = JsRuntime::new(RuntimeOptions::default());

    runtime
        .execute_script("<nfunc>", FastString::from(func_code.to_string()))
        .map_err(|e| RvrError::PlayerParseFailed(format!("n function load error: {:?}", e)))?;

    let call = format!("nFunction(\"{}\")", escape_js_string(input));
    let global = runtime
        .execute_script("<call>", FastString::from(call))
        .map_err(|e| RvrError::PlayerParseFailed(format!("n function call error: {:?}", e)))?;

    let scope = &mut runtime.handle_scope();
    let local = global.open(scope);
    Ok(local.to_rust_string_lossy(scope))
}

fn escape_js_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Locate the n transform function and return its complete declaration body,
/// `function(a){…}`, or `None` when the script has no challenge.
fn extract_n_function(player_js: &str) -> Result<Option<String>, RvrError> {
    // Probe patterns, in order: the modern usage site, a direct declaration
    // opening with a lookup table, and a declaration with nested blocks that
    // rejoins its argument.
    let name_patterns = [
        r#"\.get\("n"\)\)&&\(b=([a-zA-Z0-9$]+)(?:\[(\d+)\])?\([a-zA-Z0-9]\)"#,
        r"\b([a-zA-Z0-9$]+)\s*=\s*function\([a-zA-Z]\)\s*\{\s*var\s+[a-zA-Z]=\[[^\]]+\]",
        r#"(?:^|[^a-zA-Z0-9$])([a-zA-Z0-9$]+)\s*=\s*function\([a-z]\)\s*\{(?:[^}]+\}){2,}[^}]+return\s+[a-z]\.join\(""\)"#,
    ];

    let mut func_name = None;
    for pattern in name_patterns {
        let re = Regex::new(pattern)?;
        if let Some(captures) = re.captures(player_js) {
            if let Some(name) = captures.get(1) {
                func_name = Some(name.as_str().to_string());
                break;
            }
        }
    }

    let Some(func_name) = func_name else {
        return Ok(None);
    };

    debug!("n function located: {}", func_name);
    extract_function_body(player_js, &func_name).map(Some)
}

/// Extract a complete `function(…){…}` expression for the named function.
fn extract_function_body(player_js: &str, func_name: &str) -> Result<String, RvrError> {
    let escaped = regex::escape(func_name);

    // Regex first: handles bodies with at most one level of nested braces
    let patterns = [
        format!(
            r"(?:var\s+)?{}\s*=\s*(function\([^)]*\)\s*\{{[^}}]+(?:\{{[^}}]*\}}[^}}]*)*\}})",
            escaped
        ),
        format!(
            r"(function\s+{}\s*\([^)]*\)\s*\{{[^}}]+(?:\{{[^}}]*\}}[^}}]*)*\}})",
            escaped
        ),
    ];

    for pattern in &patterns {
        let re = Regex::new(pattern)?;
        if let Some(captures) = re.captures(player_js) {
            if let Some(body) = captures.get(1) {
                let body = body.as_str();
                if braces_balanced(body) {
                    return Ok(body.to_string());
                }
            }
        }
    }

    extract_with_brace_matching(player_js, func_name)
}

/// Brace-matching fallback for deeply nested bodies.
///
/// Counts opens and closes from the first `{` after the `function` keyword
/// and aborts when they never balance.
fn extract_with_brace_matching(player_js: &str, func_name: &str) -> Result<String, RvrError> {
    let escaped = regex::escape(func_name);
    let start_patterns = [
        format!(r"{}\s*=\s*function", escaped),
        format!(r"function\s+{}\s*\(", escaped),
    ];

    let mut func_start = None;
    for pattern in &start_patterns {
        let re = Regex::new(pattern)?;
        if let Some(m) = re.find(player_js) {
            // Anchor to the actual function keyword inside the match
            let offset = player_js[m.start()..]
                .find("function")
                .unwrap_or(0);
            func_start = Some(m.start() + offset);
            break;
        }
    }

    let Some(func_start) = func_start else {
        return Err(RvrError::PlayerParseFailed(format!(
            "n function {} not found",
            func_name
        )));
    };

    let Some(brace_offset) = player_js[func_start..].find('{') else {
        return Err(RvrError::PlayerParseFailed(format!(
            "opening brace not found for n function {}",
            func_name
        )));
    };

    let body_start = func_start + brace_offset + 1;
    let bytes = player_js.as_bytes();
    let mut depth = 1usize;
    let mut end = body_start;

    while depth > 0 && end < bytes.len() {
        match bytes[end] {
            b'{' => depth += 1,
            b'}' => depth -= 1,
            _ => {}
        }
        end += 1;
    }

    if depth != 0 {
        return Err(RvrError::PlayerParseFailed(format!(
            "unmatched braces in n function {}",
            func_name
        )));
    }

    Ok(player_js[func_start..end].to_string())
}

fn braces_balanced(s: &str) -> bool {
    let mut depth = 0i64;
    for b in s.bytes() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}
