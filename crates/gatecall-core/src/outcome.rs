//! Normalisation of handler return values into the response event.

use aws_lambda_events::encodings::Body;
use aws_lambda_events::event::apigw::ApiGatewayProxyResponse;
use http::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::json;

use crate::error::GateError;
use crate::header;

const TEXT_CONTENT_TYPE: &str = "application/x-javascript;charset=utf-8";
const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// Normalised handler output, ready to be written into the response event.
#[derive(Debug)]
pub enum Payload {
    /// Leave the response untouched.
    Empty,
    /// Verbatim text body, no JSON envelope.
    Text(String),
    /// Structured value, wrapped in a `{"data": …}` envelope.
    Data(serde_json::Value),
}

impl Payload {
    pub(crate) fn write(self, response: &mut ApiGatewayProxyResponse) {
        match self {
            Payload::Empty => {}
            Payload::Text(text) => {
                header::set(&mut response.headers, CONTENT_TYPE, TEXT_CONTENT_TYPE);
                response.body = Some(Body::Text(text));
            }
            Payload::Data(value) => {
                header::set(&mut response.headers, CONTENT_TYPE, JSON_CONTENT_TYPE);
                response.body = Some(Body::Text(json!({ "data": value }).to_string()));
            }
        }
    }
}

/// Marks a serialisable value for the `{"data": …}` envelope.
///
/// The envelope is the default wire shape for structured results; strings
/// bypass it entirely and are sent verbatim.
pub struct Data<T>(pub T);

/// Convert a handler's return value into the invocation outcome.
pub trait IntoOutcome {
    fn into_outcome(self) -> Result<Payload, GateError>;
}

impl IntoOutcome for Payload {
    fn into_outcome(self) -> Result<Payload, GateError> {
        Ok(self)
    }
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<Payload, GateError> {
        Ok(Payload::Empty)
    }
}

impl IntoOutcome for String {
    fn into_outcome(self) -> Result<Payload, GateError> {
        Ok(Payload::Text(self))
    }
}

impl IntoOutcome for &'static str {
    fn into_outcome(self) -> Result<Payload, GateError> {
        Ok(Payload::Text(self.to_string()))
    }
}

impl IntoOutcome for serde_json::Value {
    fn into_outcome(self) -> Result<Payload, GateError> {
        Ok(Payload::Data(self))
    }
}

impl<T> IntoOutcome for Data<T>
where
    T: Serialize,
{
    fn into_outcome(self) -> Result<Payload, GateError> {
        serde_json::to_value(&self.0)
            .map(Payload::Data)
            .map_err(GateError::serialise)
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<GateError>,
{
    fn into_outcome(self) -> Result<Payload, GateError> {
        match self {
            Ok(value) => value.into_outcome(),
            Err(err) => Err(err.into()),
        }
    }
}
