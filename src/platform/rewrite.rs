//! Stream URL rewriting
//!
//! Every URL handed to the caller passes through here: signature
//! substitution, n-parameter substitution, and PO token attachment. Tokens
//! attach in one of two shapes fixed by URL role: stream and segment URLs
//! get a `pot` query parameter, manifest URLs get a trailing `/pot/<token>`
//! path element.

use crate::error::RvrError;
use crate::platform::player::PlayerSnapshot;
use crate::utils::url::{get_query_param, remove_query_params, set_query_param};
use tracing::debug;

/// Rewrite one stream URL.
///
/// Resolves the base URL from the direct `url` field or the
/// `signatureCipher` blob, solves the n-parameter when present, and attaches
/// the GVS token. Solver failures leave `n` unchanged; a missing `url` field
/// in the cipher is [`RvrError::CipherFailed`].
pub async fn rewrite_stream_url(
    snapshot: &PlayerSnapshot,
    raw_url: Option<&str>,
    signature_cipher: Option<&str>,
    gvs_token: Option<&str>,
) -> Result<String, RvrError> {
    let mut stream_url = match (raw_url, signature_cipher) {
        (Some(url), _) if !url.is_empty() => url.to_string(),
        (_, Some(cipher)) if !cipher.is_empty() => apply_signature_cipher(snapshot, cipher)?,
        _ => {
            return Err(RvrError::CipherFailed(
                "format carries neither url nor signatureCipher".to_string(),
            ))
        }
    };

    if let Some(n) = get_query_param(&stream_url, "n") {
        let solved = snapshot.solve_n(&n).await;
        if solved != n {
            debug!("n parameter rotated: {} -> {}", n, solved);
            stream_url = set_query_param(&stream_url, "n", &solved);
        }
    }

    if let Some(token) = gvs_token {
        stream_url = attach_token_to_stream_url(&stream_url, token);
    }

    Ok(stream_url)
}

/// Resolve a `signatureCipher` blob into a fetchable URL.
///
/// The blob is a URL-encoded query with fields `url`, `s`, and `sp`
/// (defaulting to `"sig"`). The deciphered signature is appended under the
/// `sp` name; `s` and `sp` never reach the emitted URL.
fn apply_signature_cipher(
    snapshot: &PlayerSnapshot,
    signature_cipher: &str,
) -> Result<String, RvrError> {
    let mut base_url = None;
    let mut signature = None;
    let mut sig_param = None;

    for (key, value) in url::form_urlencoded::parse(signature_cipher.as_bytes()) {
        match key.as_ref() {
            "url" => base_url = Some(value.into_owned()),
            "s" => signature = Some(value.into_owned()),
            "sp" => sig_param = Some(value.into_owned()),
            _ => {}
        }
    }

    let base_url = base_url
        .ok_or_else(|| RvrError::CipherFailed("signatureCipher has no url field".to_string()))?;

    let mut stream_url = remove_query_params(&base_url, &["s", "sp"]);

    if let Some(signature) = signature {
        let deciphered = snapshot.decipher_signature(&signature);
        let sp = sig_param.as_deref().unwrap_or("sig");
        stream_url = set_query_param(&stream_url, sp, &deciphered);
    }

    Ok(stream_url)
}

/// Attach a GVS token to a stream or segment URL: set the `pot` query
/// parameter, replacing any existing value
pub fn attach_token_to_stream_url(stream_url: &str, token: &str) -> String {
    if token.is_empty() {
        return stream_url.to_string();
    }
    set_query_param(stream_url, "pot", token)
}

/// Attach a GVS token to an HLS/DASH manifest URL: trim trailing slashes and
/// append `/pot/<token>`
pub fn attach_token_to_manifest_url(manifest_url: &str, token: &str) -> String {
    if token.is_empty() {
        return manifest_url.to_string();
    }
    format!("{}/pot/{}", manifest_url.trim_end_matches('/'), token)
}
