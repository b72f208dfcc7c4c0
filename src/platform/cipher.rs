//! Signature cipher extraction and replay
//!
//! The player script ships a small actions object with four primitive array
//! operations (reverse, slice, splice, swap) and a transform function that
//! applies them to the split signature in a fixed order. Extraction recovers
//! that order as a list of [`SigOp`] tokens; replay is a pure function over
//! the token list.

use crate::error::RvrError;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

// JavaScript lexical fragments used to compose the extraction regexes
const JS_VAR: &str = r"[a-zA-Z_$][a-zA-Z_0-9$]*";
const JS_SINGLE_QUOTE: &str = r"'[^'\\]*(?:\\[\s\S][^'\\]*)*'";
const JS_DOUBLE_QUOTE: &str = r#""[^"\\]*(?:\\[\s\S][^"\\]*)*""#;

// Member bodies of the four primitives inside the actions object
const REVERSE_MEMBER: &str = r":function\(a\)\{(?:return )?a\.reverse\(\)\}";
const SLICE_MEMBER: &str = r":function\(a,b\)\{return a\.slice\(b\)\}";
const SPLICE_MEMBER: &str = r":function\(a,b\)\{a\.splice\(0,b\)\}";
const SWAP_MEMBER: &str =
    r":function\(a,b\)\{var c=a\[0\];a\[0\]=a\[b(?:%a\.length)?\];a\[b(?:%a\.length)?\]=c(?:;return a)?\}";

fn js_quote_str() -> String {
    format!("(?:{}|{})", JS_SINGLE_QUOTE, JS_DOUBLE_QUOTE)
}

fn js_key_str() -> String {
    format!("(?:{}|{})", JS_VAR, js_quote_str())
}

fn js_prop_str() -> String {
    format!(r"(?:\.{}|\[{}\])", JS_VAR, js_quote_str())
}

/// One elementary signature transformation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigOp {
    /// Reverse the character array
    Reverse,
    /// Drop the first N characters (array slice)
    Slice(usize),
    /// Drop the first N characters (in-place splice; same effect on a split
    /// array as the slice primitive)
    Splice(usize),
    /// Swap position 0 with position N mod length
    Swap(usize),
}

impl SigOp {
    fn apply(self, chars: &mut Vec<char>) {
        match self {
            SigOp::Reverse => chars.reverse(),
            SigOp::Slice(n) | SigOp::Splice(n) => {
                if n < chars.len() {
                    chars.drain(..n);
                }
            }
            SigOp::Swap(n) => {
                if !chars.is_empty() {
                    let idx = n % chars.len();
                    chars.swap(0, idx);
                }
            }
        }
    }
}

/// Replay an extracted token list over a raw signature.
///
/// Pure: same token list and input always produce the same output. An empty
/// token list returns the signature unchanged.
pub fn run_signature_ops(ops: &[SigOp], signature: &str) -> String {
    let mut chars: Vec<char> = signature.chars().collect();
    for op in ops {
        op.apply(&mut chars);
    }
    chars.into_iter().collect()
}

/// Extract the ordered signature token list from the player script.
///
/// Returns an empty list when neither the modern patterns nor the
/// alternative pattern locate a cipher; some streams carry no signature and
/// need no deciphering.
pub fn extract_signature_ops(player_js: &str) -> Result<Vec<SigOp>, RvrError> {
    let js_key = js_key_str();

    let actions_obj_re = Regex::new(&format!(
        r"var ({})=\{{((?:(?:{}{}|{}{}|{}{}|{}{}),?\r?\n?)+)\}};",
        JS_VAR,
        js_key,
        REVERSE_MEMBER,
        js_key,
        SLICE_MEMBER,
        js_key,
        SPLICE_MEMBER,
        js_key,
        SWAP_MEMBER,
    ))?;

    let actions_func_re = Regex::new(&format!(
        r#"function(?: {})?\(a\)\{{a=a\.split\((?:''|"")\);\s*((?:(?:a=)?{}{}\(a,\d+\);)+)return a\.join\((?:''|"")\)\}}"#,
        JS_VAR,
        JS_VAR,
        js_prop_str(),
    ))?;

    let (objects, functions) = match (
        actions_obj_re.captures(player_js),
        actions_func_re.captures(player_js),
    ) {
        (Some(o), Some(f)) => (o, f),
        _ => return extract_signature_ops_alt(player_js),
    };

    let obj_name = objects.get(1).map(|m| m.as_str()).unwrap_or_default();
    let obj_body = objects.get(2).map(|m| m.as_str()).unwrap_or_default();
    let func_body = functions.get(1).map(|m| m.as_str()).unwrap_or_default();

    // Learn which member name implements which primitive
    let mut key_ops: HashMap<String, fn(usize) -> SigOp> = HashMap::new();
    for (member, make) in [
        (REVERSE_MEMBER, (|_| SigOp::Reverse) as fn(usize) -> SigOp),
        (SLICE_MEMBER, SigOp::Slice as fn(usize) -> SigOp),
        (SPLICE_MEMBER, SigOp::Splice as fn(usize) -> SigOp),
        (SWAP_MEMBER, SigOp::Swap as fn(usize) -> SigOp),
    ] {
        let key_re = Regex::new(&format!("(?:^|,)({}){}", js_key, member))?;
        if let Some(captures) = key_re.captures(obj_body) {
            if let Some(key) = captures.get(1) {
                let key = key.as_str().trim_matches(|c| c == '\'' || c == '"');
                key_ops.insert(key.to_string(), make);
            }
        }
    }

    if key_ops.is_empty() {
        return extract_signature_ops_alt(player_js);
    }

    let keys_alt = format!(
        "({})",
        key_ops
            .keys()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|")
    );
    let tokenize_re = Regex::new(&format!(
        r#"(?:a=)?{}(?:\.{}|\[(?:'{}'|"{}")\])\(a,(\d+)\)"#,
        regex::escape(obj_name),
        keys_alt,
        keys_alt,
        keys_alt,
    ))?;

    let mut ops = Vec::new();
    for captures in tokenize_re.captures_iter(func_body) {
        let key = captures
            .get(1)
            .or_else(|| captures.get(2))
            .or_else(|| captures.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();

        // Malformed numeric operands skip the token
        let Some(arg) = captures.get(4).and_then(|m| m.as_str().parse::<usize>().ok()) else {
            continue;
        };

        if let Some(make) = key_ops.get(key) {
            ops.push(make(arg));
        }
    }

    debug!("extracted {} signature ops", ops.len());
    Ok(ops)
}

/// Alternative pattern probe for rotated player layouts.
///
/// Locating the callsite confirms a cipher exists but yields no token list,
/// so the result is empty either way; callers fall back to emitting the
/// signature unchanged.
fn extract_signature_ops_alt(player_js: &str) -> Result<Vec<SigOp>, RvrError> {
    let alt_re =
        Regex::new(r"\b[cs]\s*&&\s*[adf]\.set\([^,]+\s*,\s*encodeURIComponent\(([a-zA-Z0-9$]+)\(")?;

    match alt_re.captures(player_js) {
        Some(captures) => {
            debug!(
                "signature cipher present but unextractable (callsite {})",
                captures.get(1).map(|m| m.as_str()).unwrap_or("?")
            );
        }
        None => debug!("no signature cipher found in player script"),
    }

    Ok(Vec::new())
}

/// Extract the signature timestamp from the player script.
///
/// Must be a 5-digit integer; anything else yields 0.
pub fn extract_signature_timestamp(player_js: &str) -> u32 {
    let patterns = [
        r"(?:signatureTimestamp|sts)\s*:\s*(\d{5})",
        r#""STS"\s*:\s*(\d{5})"#,
    ];

    for pattern in patterns {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        if let Some(captures) = re.captures(player_js) {
            if let Some(sts) = captures.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) {
                return sts;
            }
        }
    }

    0
}
