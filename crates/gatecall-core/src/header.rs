//! Header helpers with multi-value (comma-joined) `add` semantics.
//!
//! [`http::HeaderMap`] already gives case-insensitive lookups; what the
//! response pipeline additionally needs is the distinction between
//! overwriting a header ([`set`]) and appending to one ([`add`], which folds
//! repeated values into a single comma-separated header line).

use http::header::{AsHeaderName, HeaderMap, HeaderName, HeaderValue};

/// Case-insensitive lookup, returning the value as a string slice.
pub fn get<K>(headers: &HeaderMap, name: K) -> Option<&str>
where
    K: AsHeaderName,
{
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Overwrite `name` unconditionally. Values that are not valid header text
/// are skipped with a debug log instead of failing the invocation.
pub fn set(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::debug!(header = %name, "skipping header with invalid value"),
    }
}

/// Append to `name`, comma-joining with any existing value.
pub fn add(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    let joined = match get(headers, &name) {
        Some(existing) if !existing.is_empty() => format!("{existing},{value}"),
        _ => value.to_string(),
    };
    match HeaderValue::from_str(&joined) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::debug!(header = %name, "skipping header with invalid value"),
    }
}
