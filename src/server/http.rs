//! HTTP API
//!
//! | Method | Path                                   | Body              | Response            |
//! |--------|----------------------------------------|-------------------|---------------------|
//! | GET    | `/health`                              |                   | `{status}`          |
//! | POST   | `/enqueue-resource`, `/enqueue-video`  | `{url}`/`{path}`  | `{message}`         |
//! | POST   | `/negotiate-offer`, `/webrtc/offer`    | `{sdp, type}`     | `{sdp, type}`       |
//! | POST   | `/webrtc/answer`                       | ignored           | `{status}`          |
//! | GET    | `/sessions`                            |                   | `[SessionInfo]`     |
//! | DELETE | `/sessions/{id}`                       |                   | `{message}`         |
//!
//! Every failure is `{error}` with a status derived from [`ErrorKind`].

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::{Error, ErrorKind};
use crate::media::MediaResource;
use crate::session::{SessionId, SessionInfo};
use crate::streamer::Streamer;
use crate::transport::{RemoteOffer, SessionDescription};

/// Response header carrying the ID of a newly negotiated session
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Build the API router
pub fn router(streamer: Arc<Streamer>, cors_enabled: bool) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/enqueue-resource", post(enqueue))
        .route("/enqueue-video", post(enqueue))
        .route("/negotiate-offer", post(negotiate))
        .route("/webrtc/offer", post(negotiate))
        .route("/webrtc/answer", post(accept_answer))
        .route("/sessions", get(list_sessions))
        .route("/sessions/{id}", delete(close_session))
        .layer(TraceLayer::new_for_http())
        .with_state(streamer);

    if cors_enabled {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Error response
#[derive(Debug)]
pub struct ApiError(Error);

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::ResourceUnavailable
            | ErrorKind::NegotiationFailed
            | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match self.0.kind() {
            ErrorKind::Internal => {
                tracing::error!(error = %self.0, "Internal error");
                "Internal server error".to_string()
            }
            ErrorKind::ResourceUnavailable | ErrorKind::NegotiationFailed => {
                tracing::warn!(error = %self.0, "Request failed");
                self.0.to_string()
            }
            ErrorKind::InvalidInput | ErrorKind::NotFound => self.0.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Error::InvalidInput(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(Error::InvalidInput(rejection.body_text()))
    }
}

/// Body of an enqueue request; exactly one field must be set
#[derive(Debug, Default, Deserialize)]
pub struct EnqueueRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl EnqueueRequest {
    fn into_resource(self) -> Result<MediaResource, Error> {
        match (self.url, self.path) {
            (Some(url), None) => Ok(MediaResource::remote_stream(url)),
            (None, Some(path)) => Ok(MediaResource::local_file(path)),
            (Some(_), Some(_)) => Err(Error::InvalidInput(
                "provide either 'url' or 'path', not both".into(),
            )),
            (None, None) => Err(Error::InvalidInput("missing 'url' or 'path'".into())),
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn enqueue(
    State(streamer): State<Arc<Streamer>>,
    payload: Result<Json<EnqueueRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let resource = streamer.enqueue(request.into_resource()?).await?;

    Ok(Json(json!({
        "message": format!("Resource enqueued successfully: {}", resource.identifier())
    })))
}

async fn negotiate(
    State(streamer): State<Arc<Streamer>>,
    payload: Result<Json<RemoteOffer>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(offer) = payload?;
    let negotiated = streamer.handle_offer(&offer).await?;

    let answer: SessionDescription = negotiated.answer;
    Ok((
        [(SESSION_ID_HEADER, negotiated.id.to_string())],
        Json(answer),
    ))
}

/// Answers are produced server-side; a client-sent answer is acknowledged only
async fn accept_answer() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_sessions(State(streamer): State<Arc<Streamer>>) -> Json<Vec<SessionInfo>> {
    Json(streamer.list_sessions().await)
}

async fn close_session(
    State(streamer): State<Arc<Streamer>>,
    id: Result<Path<SessionId>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    streamer.close_session(id).await?;

    Ok(Json(json!({ "message": format!("Session {} closed", id) })))
}
