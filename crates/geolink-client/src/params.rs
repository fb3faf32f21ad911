//! Route and query-string composition.
//!
//! Every request to the service is a route relative to the active base URL
//! plus a flat parameter set. Values are JSON; objects and arrays travel as
//! JSON text, scalars as their plain text form, and null entries are dropped.

use serde_json::{Map, Value};

/// Parameter set for a single request
pub type QueryParams = Map<String, Value>;

/// Join route segments with `/`, skipping empty segments.
///
/// No leading or trailing slash is added.
pub fn compose_route<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Encode a parameter set as `name=value` pairs joined by `&`.
///
/// Null values are omitted entirely. Ordering follows the map's iteration order
/// and carries no meaning.
pub fn compose_query(params: &QueryParams) -> String {
    params
        .iter()
        .filter_map(|(name, value)| {
            param_text(value).map(|text| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(&text)
                )
            })
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Build an absolute GET URL: `base` + route + `?` + query.
///
/// `base` is expected to end with `/` (see [`normalize_base_url`]).
pub fn compose_full_url<S: AsRef<str>>(base: &str, segments: &[S], params: &QueryParams) -> String {
    let route = compose_route(segments);
    let query = compose_query(params);
    if query.is_empty() {
        format!("{base}{route}")
    } else {
        format!("{base}{route}?{query}")
    }
}

/// Append a trailing `/` to a base URL when it is missing.
pub fn normalize_base_url(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// Merge `extra` over `base`; entries in `extra` win.
pub fn merge_params(mut base: QueryParams, extra: QueryParams) -> QueryParams {
    base.extend(extra);
    base
}

fn param_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}
