// ABOUTME: Local OpenAI-compatible upstream for gateway and end-to-end streaming tests
// ABOUTME: Serves scripted SSE bodies or error statuses and reports when the client releases the body

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_stream::stream;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What the upstream does after the scripted chunks
#[derive(Debug, Clone, Copy)]
pub enum StreamEnd {
    /// Close the body normally
    Close,
    /// Keep the connection open, writing an SSE comment at this interval
    Ping(Duration),
    /// Keep the connection open without writing anything
    Silent,
}

/// Scripted upstream behavior
#[derive(Debug, Clone)]
pub enum UpstreamReply {
    /// Stream raw body pieces, pausing before each one
    Stream {
        /// `(pause, raw bytes)` pairs written in order
        pieces: Vec<(Duration, String)>,
        /// Behavior after the last piece
        end: StreamEnd,
    },
    /// Reply with a non-streaming status and body
    Status(u16, String),
}

impl UpstreamReply {
    /// Stream `deltas` as content frames followed by `[DONE]`
    pub fn completion(deltas: &[&str]) -> Self {
        let mut pieces: Vec<(Duration, String)> = deltas
            .iter()
            .map(|delta| (Duration::ZERO, content_frame(delta)))
            .collect();
        pieces.push((Duration::ZERO, stop_frame()));
        pieces.push((Duration::ZERO, "data: [DONE]\n\n".to_owned()));
        Self::Stream {
            pieces,
            end: StreamEnd::Close,
        }
    }

    /// Stream `deltas` and then hold the connection open
    pub fn endless(deltas: &[&str], end: StreamEnd) -> Self {
        Self::Stream {
            pieces: deltas
                .iter()
                .map(|delta| (Duration::ZERO, content_frame(delta)))
                .collect(),
            end,
        }
    }
}

/// `data:` line carrying one content delta
pub fn content_frame(delta: &str) -> String {
    let frame = json!({
        "id": "chatcmpl-test",
        "object": "chat.completion.chunk",
        "choices": [{"index": 0, "delta": {"content": delta}, "finish_reason": null}]
    });
    format!("data: {frame}\n\n")
}

/// `data:` line carrying the finish reason
pub fn stop_frame() -> String {
    let frame = json!({
        "id": "chatcmpl-test",
        "object": "chat.completion.chunk",
        "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]
    });
    format!("data: {frame}\n\n")
}

struct Shared {
    reply: UpstreamReply,
    requests: AtomicUsize,
    body_released: Arc<AtomicBool>,
    authorization: Mutex<Option<String>>,
    last_request: Mutex<Option<Value>>,
}

/// Sets the flag when the response body is dropped
struct ReleaseFlag(Arc<AtomicBool>);

impl Drop for ReleaseFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Running fake upstream
pub struct FakeUpstream {
    addr: SocketAddr,
    shared: Arc<Shared>,
    handle: JoinHandle<()>,
}

impl FakeUpstream {
    /// Start serving `reply` on an ephemeral local port
    pub async fn start(reply: UpstreamReply) -> Self {
        let shared = Arc::new(Shared {
            reply,
            requests: AtomicUsize::new(0),
            body_released: Arc::new(AtomicBool::new(false)),
            authorization: Mutex::new(None),
            last_request: Mutex::new(None),
        });

        let app = Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .with_state(shared.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake upstream");
        let addr = listener.local_addr().expect("Fake upstream has no address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            shared,
            handle,
        }
    }

    /// Base URL to configure as the provider endpoint
    pub fn endpoint(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Number of completion requests received
    pub fn requests(&self) -> usize {
        self.shared.requests.load(Ordering::SeqCst)
    }

    /// `Authorization` header of the last request
    pub fn authorization(&self) -> Option<String> {
        self.shared.authorization.lock().unwrap().clone()
    }

    /// JSON body of the last request
    pub fn last_request(&self) -> Option<Value> {
        self.shared.last_request.lock().unwrap().clone()
    }

    /// Whether the streamed body was dropped, either at completion or because
    /// the client went away
    pub fn body_released(&self) -> bool {
        self.shared.body_released.load(Ordering::SeqCst)
    }

    /// Poll until the body is released or `within` elapses
    pub async fn wait_for_release(&self, within: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + within;
        while tokio::time::Instant::now() < deadline {
            if self.body_released() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.body_released()
    }
}

impl Drop for FakeUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Endpoint with nothing listening: bind an ephemeral port, then release it
pub async fn refused_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind probe listener");
    let addr = listener.local_addr().expect("Probe listener has no address");
    drop(listener);
    format!("http://{addr}/v1")
}

async fn chat_completions(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Response {
    shared.requests.fetch_add(1, Ordering::SeqCst);
    *shared.authorization.lock().unwrap() = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    *shared.last_request.lock().unwrap() = Some(request);

    match shared.reply.clone() {
        UpstreamReply::Status(code, body) => {
            let status = StatusCode::from_u16(code).expect("Invalid scripted status");
            (status, body).into_response()
        }
        UpstreamReply::Stream { pieces, end } => {
            let flag = ReleaseFlag(shared.body_released.clone());
            let body = stream! {
                let _flag = flag;
                for (pause, piece) in pieces {
                    if !pause.is_zero() {
                        tokio::time::sleep(pause).await;
                    }
                    yield Ok::<Bytes, Infallible>(Bytes::from(piece));
                }
                match end {
                    StreamEnd::Close => {}
                    StreamEnd::Ping(interval) => loop {
                        tokio::time::sleep(interval).await;
                        yield Ok(Bytes::from_static(b": ping\n\n"));
                    },
                    StreamEnd::Silent => std::future::pending::<()>().await,
                }
            };
            (
                [(header::CONTENT_TYPE, "text/event-stream")],
                Body::from_stream(body),
            )
                .into_response()
        }
    }
}
