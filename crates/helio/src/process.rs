//! Response post-processing.
//!
//! The backend reports malformed-query failures as HTML error pages rather
//! than JSON, so select responses are sniffed before decoding. Successful
//! responses get highlighting fragments re-attached to their documents and
//! term enumerations reshaped from flat pair arrays into ordered maps.

use serde_json::{Map, Value, json};

use crate::error::BackendError;

/// Detects a backend HTML error page and extracts its message.
///
/// An error body starts (after leading whitespace) with an HTML tag
/// marker; the useful message sits inside the first `<pre>` block. This
/// sniffing is deliberately narrow and version-specific; callers never
/// see the raw body. Returns `None` for anything that is not an error
/// page.
pub fn sniff_backend_error(body: &str) -> Option<String> {
    let trimmed = body.trim_start();
    if !trimmed.starts_with("<h") {
        return None;
    }
    let message = match trimmed.split_once("<pre>") {
        Some((_, rest)) => rest.split("</pre>").next().unwrap_or(rest),
        None => trimmed,
    };
    Some(message.trim().to_string())
}

/// Extracts the `<title>` content from an HTML error body, if present.
///
/// Used by the update path, where failures carry the summary in the page
/// title. Matching is ASCII case-insensitive.
pub fn extract_title(body: &str) -> Option<String> {
    let lower = body.to_ascii_lowercase();
    let start = lower.find("<title>")? + "<title>".len();
    let end = lower[start..].find("</title>")? + start;
    Some(body[start..end].trim().to_string())
}

/// Decodes and post-processes a select response body.
///
/// Error pages become either a hard [`BackendError::Backend`] or, in soft
/// mode, a well-formed empty result annotated with the error message.
/// Successful bodies are JSON-decoded and have highlighting re-attached.
pub fn process_select_body(body: &str, soft_errors: bool) -> Result<Value, BackendError> {
    if let Some(message) = sniff_backend_error(body) {
        if soft_errors {
            return Ok(json!({
                "response": { "numfound": 0, "docs": [] },
                "error": message,
            }));
        }
        return Err(BackendError::Backend { message });
    }

    let mut result: Value =
        serde_json::from_str(body).map_err(|source| BackendError::Json { source })?;
    inject_highlighting(&mut result);
    Ok(result)
}

/// Moves highlighting fragments onto their documents.
///
/// Each entry of the top-level `highlighting` map is keyed by document id;
/// the fragment set is copied onto the matching document under
/// `_highlighting` and the top-level map is then removed.
fn inject_highlighting(result: &mut Value) {
    let Some(highlighting) = result
        .as_object_mut()
        .and_then(|obj| obj.remove("highlighting"))
    else {
        return;
    };
    let Some(highlights) = highlighting.as_object() else {
        return;
    };

    let docs = result
        .pointer_mut("/response/docs")
        .and_then(Value::as_array_mut);
    if let Some(docs) = docs {
        for doc in docs {
            let id = doc.get("id").and_then(Value::as_str).map(str::to_string);
            if let Some(id) = id
                && let Some(fragments) = highlights.get(&id)
                && let Some(doc) = doc.as_object_mut()
            {
                doc.insert("_highlighting".to_string(), fragments.clone());
            }
        }
    }
}

/// Reshapes the `terms` section of a term-enumeration response.
///
/// Each field's flat alternating term/count array becomes an ordered
/// term-to-count map. Fields that are not in the flat form are left
/// alone.
pub fn reshape_terms(result: &mut Value) {
    let Some(terms) = result.get_mut("terms").and_then(Value::as_object_mut) else {
        return;
    };
    for contents in terms.values_mut() {
        if let Some(flat) = contents.as_array() {
            let mut reshaped = Map::new();
            for pair in flat.chunks(2) {
                if let [term, count] = pair
                    && let Some(term) = term.as_str()
                {
                    reshaped.insert(term.to_string(), count.clone());
                }
            }
            *contents = Value::Object(reshaped);
        }
    }
}
