//! Content negotiation for inbound event bodies.
//!
//! GET requests decode from the query string alone. Everything else is routed
//! by `Content-Type` — declared in the headers or, when absent, sniffed from
//! the leading body bytes — into either the URL-encoded form path or a raw
//! JSON decode. Form and query pairs are lifted into a JSON object first so a
//! single `Deserialize` target shape serves every encoding.

use aws_lambda_events::event::apigw::ApiGatewayProxyRequest;
use http::header::CONTENT_TYPE;
use http::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::GateError;
use crate::header;

/// Decode the inbound event into the handler's declared input shape.
pub fn decode_request<T>(request: &ApiGatewayProxyRequest) -> Result<T, GateError>
where
    T: DeserializeOwned,
{
    if request.http_method == Method::GET {
        let value = pairs_to_value(request.query_string_parameters.iter());
        return serde_json::from_value(value)
            .map_err(|err| GateError::decode(format!("invalid query string: {err}")));
    }

    let body = request.body.as_deref().unwrap_or("");
    let content_type = header::get(&request.headers, CONTENT_TYPE)
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| sniff_content_type(body.as_bytes()).to_string());

    if content_type.contains("form") {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(body)
            .map_err(|err| GateError::decode(format!("invalid form payload: {err}")))?;
        let value = pairs_to_value(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        serde_json::from_value(value)
            .map_err(|err| GateError::decode(format!("invalid form payload: {err}")))
    } else {
        serde_json::from_str(body)
            .map_err(|err| GateError::decode(format!("invalid JSON payload: {err}")))
    }
}

/// Group repeated keys and lift the pairs into a JSON object: a key seen once
/// becomes a string, a key seen more than once an ordered array of strings.
fn pairs_to_value<'a, I>(pairs: I) -> Value
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in pairs {
        match grouped.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => values.push(value.to_string()),
            None => grouped.push((key.to_string(), vec![value.to_string()])),
        }
    }

    let mut object = Map::new();
    for (key, mut values) in grouped {
        let value = match values.len() {
            1 => Value::String(values.swap_remove(0)),
            _ => Value::Array(values.into_iter().map(Value::String).collect()),
        };
        object.insert(key, value);
    }
    Value::Object(object)
}

/// Cheap stand-in for full MIME sniffing: the negotiator only needs to tell a
/// JSON-looking body from a URL-encoded one when no `Content-Type` arrived.
fn sniff_content_type(body: &[u8]) -> &'static str {
    let trimmed = body.trim_ascii_start();
    match trimmed.first().copied() {
        Some(b'{') | Some(b'[') | Some(b'"') => "application/json",
        Some(_) if looks_form_encoded(trimmed) => "application/x-www-form-urlencoded",
        _ => "text/plain; charset=utf-8",
    }
}

fn looks_form_encoded(body: &[u8]) -> bool {
    body.contains(&b'=')
        && body.iter().all(|&b| {
            b.is_ascii_alphanumeric()
                || matches!(b, b'=' | b'&' | b'%' | b'+' | b'-' | b'_' | b'.' | b'~' | b'*')
        })
}
