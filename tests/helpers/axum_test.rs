// ABOUTME: Axum HTTP testing utilities for integration tests
// ABOUTME: Drives routers with oneshot requests and parses SSE response bodies into frames

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use tower::ServiceExt;

/// Upper bound on reading a response body; coaching streams always terminate
const BODY_READ_TIMEOUT: Duration = Duration::from_secs(15);

/// Helper to build and execute HTTP requests against Axum routers
pub struct AxumTestRequest {
    method: Method,
    uri: String,
    headers: Vec<(String, String)>,
    body: Option<String>,
}

impl AxumTestRequest {
    fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_owned(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Create a new GET request
    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    /// Create a new POST request
    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    /// Create a new DELETE request
    #[allow(dead_code)]
    pub fn delete(uri: &str) -> Self {
        Self::new(Method::DELETE, uri)
    }

    /// Add a header to the request
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_owned(), value.to_owned()));
        self
    }

    /// Add JSON body to the request
    pub fn json<T: Serialize>(mut self, data: &T) -> Self {
        self.body = Some(serde_json::to_string(data).expect("Failed to serialize JSON"));
        self.headers.push((
            header::CONTENT_TYPE.as_str().to_owned(),
            "application/json".to_owned(),
        ));
        self
    }

    /// Add a raw body with an explicit content type
    #[allow(dead_code)]
    pub fn raw_body(mut self, content_type: &str, body: &str) -> Self {
        self.body = Some(body.to_owned());
        self.headers
            .push((header::CONTENT_TYPE.as_str().to_owned(), content_type.to_owned()));
        self
    }

    fn build(self) -> Request<Body> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);

        for (key, value) in self.headers {
            builder = builder.header(key, value);
        }

        builder
            .body(Body::from(self.body.unwrap_or_default()))
            .expect("Failed to build request")
    }

    /// Execute the request against an Axum router and read the whole body
    pub async fn send(self, app: Router) -> AxumTestResponse {
        let response = app
            .oneshot(self.build())
            .await
            .expect("Failed to execute request");

        AxumTestResponse::from_response(response).await
    }

    /// Execute the request and return the raw response without reading the body
    #[allow(dead_code)]
    pub async fn send_streaming(self, app: Router) -> axum::http::Response<Body> {
        app.oneshot(self.build())
            .await
            .expect("Failed to execute request")
    }
}

/// One parsed SSE frame: event name and JSON data
#[derive(Debug, Clone)]
pub struct SseFrame {
    /// `event:` field
    pub event: String,
    /// `data:` field parsed as JSON
    pub data: Value,
}

/// Parse an SSE body into frames, skipping keep-alive comments
pub fn parse_sse_frames(body: &str) -> Vec<SseFrame> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data = String::new();
            for line in block.lines() {
                if let Some(value) = line.strip_prefix("event:") {
                    event = Some(value.trim().to_owned());
                } else if let Some(value) = line.strip_prefix("data:") {
                    data.push_str(value.trim_start());
                }
            }
            let event = event?;
            let data = serde_json::from_str(&data).expect("SSE data is not JSON");
            Some(SseFrame { event, data })
        })
        .collect()
}

/// Wrapper around Axum HTTP response for testing
pub struct AxumTestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl AxumTestResponse {
    /// Create from response by eagerly reading the body
    async fn from_response(response: axum::http::Response<Body>) -> Self {
        use axum::body::to_bytes;
        let status = response.status();
        let headers = response.headers().clone();
        let body = tokio::time::timeout(BODY_READ_TIMEOUT, to_bytes(response.into_body(), usize::MAX))
            .await
            .expect("Response body did not terminate")
            .expect("Failed to read response body")
            .to_vec();
        Self {
            status,
            headers,
            body,
        }
    }

    /// Get the response status code as u16 for easy assertion
    pub const fn status(&self) -> u16 {
        self.status.as_u16()
    }

    /// Get the response status code as `StatusCode`
    #[allow(dead_code)]
    pub const fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Get a response header as a string
    #[allow(dead_code)]
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    }

    /// Get the response body as a JSON value
    pub fn json<T: serde::de::DeserializeOwned>(self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to deserialize JSON response")
    }

    /// Get the response body as a string
    pub fn text(self) -> String {
        String::from_utf8(self.body).expect("Failed to decode response as UTF-8")
    }

    /// Parse the body as an SSE stream
    #[allow(dead_code)]
    pub fn sse_frames(self) -> Vec<SseFrame> {
        parse_sse_frames(&self.text())
    }

    /// Assert that the status code matches
    #[allow(dead_code)]
    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.status, expected,
            "Expected status {}, got {}",
            expected, self.status
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    #[tokio::test]
    async fn test_axum_test_request_with_header() {
        let app = Router::new().route(
            "/test",
            get(|headers: HeaderMap| async move {
                headers
                    .get("x-custom")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("missing")
                    .to_owned()
            }),
        );
        let response = AxumTestRequest::get("/test")
            .header("x-custom", "test-value")
            .send(app)
            .await;
        assert_eq!(response.text(), "test-value");
    }

    #[test]
    fn test_parse_sse_frames_skips_comments() {
        let body = ":\n\nevent: chunk\ndata: {\"type\":\"chunk\",\"delta\":\"Hi\"}\n\n\
                    event: done\ndata: {\"type\":\"done\"}\n\n";
        let frames = parse_sse_frames(body);

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].event, "chunk");
        assert_eq!(frames[0].data["delta"], "Hi");
        assert_eq!(frames[1].event, "done");
    }
}
