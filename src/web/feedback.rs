use crate::domain::BehaviorPayload;
use crate::error::EngineError;
use crate::feedback::FeedbackResult;
use crate::state::SharedState;
use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;

pub const MAX_BATCH: usize = 16;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchItem {
    Ok { ok: FeedbackResult },
    Err(ErrorBody),
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", post(create_feedback))
        .route("/batch", post(create_batch))
        .with_state(state)
}

type ErrorResponse = (StatusCode, Json<ErrorBody>);

/// Charges `cost` records against the caller's budget.
async fn charge(
    state: &SharedState,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: &HeaderMap,
    cost: usize,
) -> Result<(), ErrorResponse> {
    let client = state.limiter.client_key(headers, peer.map(|ConnectInfo(addr)| addr));
    if state.limiter.check_n(&client, cost).await {
        return Ok(());
    }
    tracing::warn!(client = %client, cost, "rate limit exceeded");
    Err((
        StatusCode::TOO_MANY_REQUESTS,
        Json(ErrorBody {
            error: "Too many feedback requests. Please try again later.".to_string(),
            field: None,
        }),
    ))
}

fn error_body(err: &EngineError) -> ErrorBody {
    ErrorBody {
        error: err.to_string(),
        field: err.field(),
    }
}

fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::InvalidRecord { .. } => StatusCode::BAD_REQUEST,
        EngineError::InternalClassification(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn create_feedback(
    State(state): State<SharedState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(payload): Json<BehaviorPayload>,
) -> Result<Json<FeedbackResult>, ErrorResponse> {
    charge(&state, peer, &headers, 1).await?;

    match state.engine.respond(payload).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            if matches!(e, EngineError::InternalClassification(_)) {
                tracing::error!("feedback classification failed: {}", e);
            }
            Err((status_for(&e), Json(error_body(&e))))
        }
    }
}

async fn create_batch(
    State(state): State<SharedState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(payloads): Json<Vec<BehaviorPayload>>,
) -> Result<Json<Vec<BatchItem>>, ErrorResponse> {
    if payloads.len() > MAX_BATCH {
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(ErrorBody {
                error: format!("at most {MAX_BATCH} records per batch"),
                field: None,
            }),
        ));
    }
    charge(&state, peer, &headers, payloads.len()).await?;

    let items = state
        .engine
        .respond_batch(payloads)
        .await
        .into_iter()
        .map(|outcome| match outcome {
            Ok(result) => BatchItem::Ok { ok: result },
            Err(e) => BatchItem::Err(error_body(&e)),
        })
        .collect();

    Ok(Json(items))
}
