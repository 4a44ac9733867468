//! Client-facing SSE emitter.

use axum::http::{HeaderName, HeaderValue};
use axum::response::{
    IntoResponse, Response,
    sse::{Event, KeepAlive, Sse},
};
use futures::StreamExt;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Event pushed to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Token {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        tokens: Option<i64>,
    },
    Complete {
        content: String,
        tokens: i64,
    },
    Error {
        content: String,
    },
}

impl ClientEvent {
    /// SSE `event:` name. Errors get their own so clients can listen for them.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Error { .. } => "error",
            Self::Token { .. } | Self::Complete { .. } => "message",
        }
    }

    pub fn to_sse(&self) -> Result<Event, axum::Error> {
        Event::default().event(self.event_name()).json_data(self)
    }
}

/// The client went away; nothing more can be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientGone;

/// Sending half of a relay's event channel.
#[derive(Debug, Clone)]
pub struct Emitter {
    tx: mpsc::Sender<ClientEvent>,
}

/// Receiving half, drained by the response body.
pub type EventReceiver = mpsc::Receiver<ClientEvent>;

impl Emitter {
    /// Create a bounded emitter. A full channel holds the relay back rather
    /// than dropping events.
    pub fn channel(capacity: usize) -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queue one event. Fails once the receiver has been dropped.
    pub async fn send(&self, event: ClientEvent) -> Result<(), ClientGone> {
        self.tx.send(event).await.map_err(|_| ClientGone)
    }

    /// Resolves when the receiver is dropped.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Wrap a receiver as a streaming SSE response.
pub fn sse_response(rx: EventReceiver, keep_alive: Duration) -> Response {
    let stream = ReceiverStream::new(rx).map(|event| event.to_sse());
    let sse = Sse::new(stream).keep_alive(KeepAlive::new().interval(keep_alive));

    // Sse sets content type and cache control itself.
    (
        [(
            HeaderName::from_static("x-accel-buffering"),
            HeaderValue::from_static("no"),
        )],
        sse,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};

    #[test]
    fn test_wire_shape() {
        let token = ClientEvent::Token {
            content: "Hel".to_string(),
            tokens: None,
        };
        assert_eq!(
            serde_json::to_value(&token).unwrap(),
            serde_json::json!({"type": "token", "content": "Hel"})
        );
        assert_eq!(token.event_name(), "message");

        let complete = ClientEvent::Complete {
            content: "Hello".to_string(),
            tokens: 2,
        };
        assert_eq!(
            serde_json::to_value(&complete).unwrap(),
            serde_json::json!({"type": "complete", "content": "Hello", "tokens": 2})
        );

        let error = ClientEvent::Error {
            content: "boom".to_string(),
        };
        assert_eq!(error.event_name(), "error");
    }

    #[tokio::test]
    async fn test_send_fails_after_receiver_dropped() {
        let (emitter, rx) = Emitter::channel(4);
        assert!(!emitter.is_closed());
        drop(rx);

        emitter.closed().await;
        assert!(emitter.is_closed());
        let result = emitter
            .send(ClientEvent::Error {
                content: "late".to_string(),
            })
            .await;
        assert_eq!(result, Err(ClientGone));
    }

    #[tokio::test]
    async fn test_sse_response_renders_events_in_order() {
        let (emitter, rx) = Emitter::channel(4);
        emitter
            .send(ClientEvent::Token {
                content: "a".to_string(),
                tokens: None,
            })
            .await
            .unwrap();
        emitter
            .send(ClientEvent::Complete {
                content: "a".to_string(),
                tokens: 1,
            })
            .await
            .unwrap();
        drop(emitter);

        let response = sse_response(rx, Duration::from_secs(15));
        let headers = response.headers();
        assert_eq!(headers[CONTENT_TYPE], "text/event-stream");
        assert_eq!(headers[CACHE_CONTROL], "no-cache");
        assert_eq!(headers["x-accel-buffering"], "no");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        let token_at = text.find(r#""type":"token""#).unwrap();
        let complete_at = text.find(r#""type":"complete""#).unwrap();
        assert!(token_at < complete_at);
        assert!(text.contains("event: message"));
    }
}
