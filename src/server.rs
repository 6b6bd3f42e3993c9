//! HTTP routes exposing the chat service.

use std::convert::Infallible;
use std::future::Future;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::{self, Stream, StreamExt};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::sse_stream::DONE_SENTINEL;
use crate::{ChatCompletionChunkResponse, ChatCompletionRequest, ChatService, ChunkStream, Error};

/// Build the application router, with all routes under `/api`.
pub fn router(service: ChatService) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/chat/completions", post(create_chat_completion))
        .with_state(service);

    Router::new().nest("/api", api).layer(CorsLayer::permissive())
}

/// Serve the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, service: ChatService, shutdown: F) -> Result<(), Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Handle `POST /api/chat/completions`.
async fn create_chat_completion(
    State(service): State<ChatService>,
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return error_response(Error::invalid_input(rejection.body_text())),
    };

    if request.stream {
        match service.complete_stream(&request).await {
            Ok(chunks) => sse_response(chunks).into_response(),
            Err(e) => error_response(e),
        }
    } else {
        match service.complete(&request).await {
            Ok(response) => Json(response).into_response(),
            Err(e) => error_response(e),
        }
    }
}

/// Frame chunks as `data: <json>` events followed by `data: [DONE]`.
///
/// A failure mid-stream is sent as a single error event and ends the stream
/// without the `[DONE]` marker.
fn sse_response(chunks: ChunkStream) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = stream::unfold(Some(chunks), |state| async move {
        let mut chunks = state?;
        match chunks.next().await {
            Some(Ok(chunk)) => Some((chunk_event(&chunk), Some(chunks))),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "chat completion stream failed");
                Some((error_event(&e), None))
            }
            None => Some((Event::default().data(DONE_SENTINEL), None)),
        }
    });

    Sse::new(events.map(Ok))
}

fn chunk_event(chunk: &ChatCompletionChunkResponse) -> Event {
    match serde_json::to_string(chunk) {
        Ok(json) => Event::default().data(json),
        Err(e) => error_event(&Error::from(e)),
    }
}

fn error_event(error: &Error) -> Event {
    Event::default().data(error_body(error).to_string())
}

fn error_body(error: &Error) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "message": error.to_string(),
            "type": error.error_type(),
            "code": serde_json::Value::Null,
        }
    })
}

fn error_response(error: Error) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!(error = %error, "chat completion failed");
    } else {
        tracing::debug!(error = %error, "rejected chat completion request");
    }
    (status, Json(error_body(&error))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockProvider;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app() -> Router {
        let provider = MockProvider::new().with_stream_delay(Duration::ZERO);
        router(ChatService::new(Arc::new(provider)))
    }

    async fn post_json(body: &str) -> (StatusCode, String) {
        let request = Request::post("/api/chat/completions")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::get("/api/health").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_completion() {
        let (status, body) = post_json(
            r#"{"model":"mock","messages":[{"role":"user","content":"Hello"}],"stream":false}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["object"], "chat.completion");
        assert_eq!(json["model"], "mock");
        assert_eq!(json["choices"][0]["message"]["role"], "assistant");
        assert!(!json["choices"][0]["message"]["content"].as_str().unwrap().is_empty());
        assert_eq!(json["choices"][0]["finish_reason"], "stop");
    }

    #[tokio::test]
    async fn test_streaming_completion() {
        let (status, body) = post_json(
            r#"{"model":"mock","messages":[{"role":"user","content":"Hello"}],"stream":true}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.ends_with("data: [DONE]\n\n"));

        let payloads: Vec<&str> = body
            .split("\n\n")
            .filter(|frame| !frame.is_empty())
            .map(|frame| frame.strip_prefix("data: ").unwrap())
            .collect();
        let (done, chunks) = payloads.split_last().unwrap();
        assert_eq!(*done, "[DONE]");

        let terminal: serde_json::Value = serde_json::from_str(chunks.last().unwrap()).unwrap();
        assert_eq!(terminal["object"], "chat.completion.chunk");
        assert_eq!(terminal["choices"][0]["finish_reason"], "stop");
        assert_eq!(terminal["choices"][0]["delta"]["content"], "");

        for payload in &chunks[..chunks.len() - 1] {
            let chunk: serde_json::Value = serde_json::from_str(payload).unwrap();
            assert_eq!(chunk["id"], terminal["id"]);
            assert_eq!(chunk["choices"][0]["delta"]["role"], "assistant");
            assert!(chunk["choices"][0]["finish_reason"].is_null());
        }
    }

    #[tokio::test]
    async fn test_empty_messages_rejected() {
        let (status, body) = post_json(r#"{"model":"mock","messages":[]}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"]["type"], "invalid_request_error");
    }

    #[tokio::test]
    async fn test_malformed_body_rejected() {
        let (status, _) =
            post_json(r#"{"model":"mock","messages":[{"role":"user","content":"  "}]}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_json("not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_mid_stream_error_event() {
        let failing: ChunkStream = stream::iter(vec![Err(Error::backend("mock", "boom"))]).boxed();
        let response = sse_response(failing).into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(body.contains("upstream_error"));
        assert!(!body.contains("[DONE]"));
    }
}
