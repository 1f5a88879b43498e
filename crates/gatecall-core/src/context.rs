use aws_lambda_events::event::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};
use http::HeaderMap;

/// Invocation-scoped state exposed to handlers and middleware.
///
/// Holds the inbound event, the response under construction, and the caller
/// source IP. One context is created per invocation and dropped when the
/// response event is emitted; the request is never mutated, only response
/// fields change as the chain runs.
pub struct InvocationContext {
    request: ApiGatewayProxyRequest,
    response: ApiGatewayProxyResponse,
    source_ip: String,
}

impl InvocationContext {
    pub fn new(request: ApiGatewayProxyRequest) -> Self {
        let source_ip = request
            .request_context
            .identity
            .source_ip
            .clone()
            .unwrap_or_default();
        let mut response = ApiGatewayProxyResponse::default();
        response.status_code = 200;
        response.headers = HeaderMap::new();
        response.is_base64_encoded = false;
        Self {
            request,
            response,
            source_ip,
        }
    }

    pub fn request(&self) -> &ApiGatewayProxyRequest {
        &self.request
    }

    pub fn response(&self) -> &ApiGatewayProxyResponse {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ApiGatewayProxyResponse {
        &mut self.response
    }

    /// Source IP of the caller, empty when the event carried none.
    pub fn source_ip(&self) -> &str {
        &self.source_ip
    }

    pub fn into_response(self) -> ApiGatewayProxyResponse {
        self.response
    }
}
