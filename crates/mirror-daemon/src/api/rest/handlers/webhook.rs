//! Webhook handler

use crate::api::rest::state::AppState;
use crate::dispatch::{DispatchOutcome, WebhookEvent};
use crate::error::{ApiError, ApiResult};
use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

/// Webhook query parameters
#[derive(Debug, Default, Deserialize)]
pub struct WebhookQuery {
    pub token: Option<String>,
}

/// Receive a tracker event. The token is checked before the body is parsed.
pub async fn receive_webhook(
    State(state): State<AppState>,
    Query(query): Query<WebhookQuery>,
    body: Bytes,
) -> ApiResult<Json<DispatchOutcome>> {
    state.authorize(query.token.as_deref())?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid event body: {}", e)))?;

    let outcome = state.dispatcher.handle(event).await?;
    Ok(Json(outcome))
}
