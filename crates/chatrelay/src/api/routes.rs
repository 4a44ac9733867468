//! API route definitions.

use axum::body::Body;
use axum::http::{HeaderValue, Method, Request, header};
use axum::{Router, middleware, routing::get};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::auth::auth_middleware;

use super::handlers;
use super::state::AppState;

/// Create the application router.
///
/// The streaming route sits outside the request timeout: generation length is
/// bounded by the backend, not by wall-clock policy.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(request_span)
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let auth_state = state.auth.clone();

    let chat_routes = Router::new()
        .route(
            "/chats",
            get(handlers::list_chats).post(handlers::create_chat),
        )
        .route(
            "/chats/{session_id}",
            get(handlers::get_chat).delete(handlers::archive_chat),
        )
        .route(
            "/chats/{session_id}/messages",
            get(handlers::list_chat_messages),
        )
        .layer(TimeoutLayer::new(state.request_timeout));

    let stream_routes =
        Router::new().route("/stream/chat/{session_id}", get(handlers::stream_chat));

    let protected_routes = Router::new()
        .merge(chat_routes)
        .merge(stream_routes)
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(state.clone());

    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .layer(TimeoutLayer::new(state.request_timeout))
        .with_state(state);

    Router::new()
        .nest("/api/v1", protected_routes)
        .merge(public_routes)
        .layer(cors)
        .layer(trace_layer)
}

/// Request span without the query string, which can carry `token` and the
/// prompt on the stream route.
fn request_span(request: &Request<Body>) -> tracing::Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        version = ?request.version(),
    )
}

/// Build the CORS layer based on configuration.
///
/// With no configured origins, dev mode allows common localhost origins and
/// production denies cross-origin requests.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    let allowed_origins = state.auth.allowed_origins();

    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    let headers = [
        header::AUTHORIZATION,
        header::CONTENT_TYPE,
        header::ACCEPT,
        header::ORIGIN,
        header::COOKIE,
        header::CACHE_CONTROL,
    ];

    let configured: Vec<&str> = if allowed_origins.is_empty() && state.auth.is_dev_mode() {
        tracing::warn!("CORS: No origins configured, using default localhost origins for dev mode");
        vec![
            "http://localhost:3000",
            "http://localhost:8080",
            "http://127.0.0.1:3000",
            "http://127.0.0.1:8080",
        ]
    } else {
        allowed_origins.iter().map(String::as_str).collect()
    };

    let origins: Vec<HeaderValue> = configured
        .into_iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("CORS: Invalid origin in config: {}", origin);
                None
            })
        })
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS: No usable origins, denying all cross-origin requests");
        return CorsLayer::new().allow_origin(AllowOrigin::exact(HeaderValue::from_static("null")));
    }

    tracing::info!("CORS: Allowing {} origin(s)", origins.len());
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Collects the recorded fields of every new span.
    #[derive(Clone, Default)]
    struct SpanFields(Arc<Mutex<Vec<String>>>);

    struct Collect<'a>(&'a mut Vec<String>);

    impl Visit for Collect<'_> {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            self.0.push(format!("{}={:?}", field.name(), value));
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for SpanFields {
        fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
            let mut fields = self.0.lock().unwrap();
            attrs.record(&mut Collect(&mut fields));
        }
    }

    #[test]
    fn test_request_span_omits_query_string() {
        let fields = SpanFields::default();
        let subscriber = tracing_subscriber::registry().with(fields.clone());

        tracing::subscriber::with_default(subscriber, || {
            let request = Request::builder()
                .uri("/api/v1/stream/chat/abc?message=secret%20plans&token=eyJhbGciOi")
                .body(Body::empty())
                .unwrap();
            let _span = request_span(&request);
        });

        let recorded = fields.0.lock().unwrap().join(" ");
        assert!(recorded.contains("/api/v1/stream/chat/abc"), "{recorded}");
        assert!(!recorded.contains("token"), "{recorded}");
        assert!(!recorded.contains("secret"), "{recorded}");
    }
}
