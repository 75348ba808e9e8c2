//! Message handlers: buffering, direct delivery, flushing, split previews.

use super::{DeliverMessageRequest, EnqueueMessageRequest, SplitRequest, parse_recipient};
use crate::Result;
use crate::api::AppState;
use crate::types::{DeliveryReport, EnqueueOutcome, FlushOutcome, SplitOptions, SplitResult};
use axum::{
    Json,
    extract::{Path, State},
};
use std::time::Duration;

/// POST /messages - Buffer a reply for a recipient
#[utoipa::path(
    post,
    path = "/messages",
    tag = "messages",
    request_body = EnqueueMessageRequest,
    responses(
        (status = 200, description = "Message buffered (and possibly flushed)", body = crate::types::EnqueueOutcome),
        (status = 422, description = "Empty text or out-of-range options", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn enqueue_message(
    State(state): State<AppState>,
    Json(request): Json<EnqueueMessageRequest>,
) -> Result<Json<EnqueueOutcome>> {
    let recipient = parse_recipient(&request.recipient)?;
    let outcome = state
        .coordinator
        .enqueue(&recipient, &request.text, request.options)
        .await?;
    Ok(Json(outcome))
}

/// POST /messages/direct - Chunk and deliver a reply without buffering
#[utoipa::path(
    post,
    path = "/messages/direct",
    tag = "messages",
    request_body = DeliverMessageRequest,
    responses(
        (status = 200, description = "Delivery attempted; see report for per-chunk results", body = crate::types::DeliveryReport),
        (status = 422, description = "Empty text or recipient", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn deliver_message(
    State(state): State<AppState>,
    Json(request): Json<DeliverMessageRequest>,
) -> Result<Json<DeliveryReport>> {
    let recipient = parse_recipient(&request.recipient)?;
    let report = state
        .coordinator
        .deliver_now(&recipient, &request.text)
        .await?;
    Ok(Json(report))
}

/// POST /recipients/:id/flush - Flush a recipient's buffer now
#[utoipa::path(
    post,
    path = "/recipients/{id}/flush",
    tag = "messages",
    params(
        ("id" = String, Path, description = "Recipient identifier")
    ),
    responses(
        (status = 200, description = "Flush result (no-op for an empty buffer)", body = crate::types::FlushOutcome),
        (status = 422, description = "Empty recipient", body = crate::error::ApiError)
    )
)]
pub async fn flush_recipient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FlushOutcome>> {
    let recipient = parse_recipient(&id)?;
    Ok(Json(state.coordinator.force_flush(&recipient).await))
}

/// POST /split - Preview how a text would be chunked
#[utoipa::path(
    post,
    path = "/split",
    tag = "messages",
    request_body = SplitRequest,
    responses(
        (status = 200, description = "Chunks and statistics", body = crate::types::SplitResult),
        (status = 422, description = "Empty text or invalid delay range", body = crate::error::ApiError)
    )
)]
pub async fn split_text(
    State(state): State<AppState>,
    Json(request): Json<SplitRequest>,
) -> Result<Json<SplitResult>> {
    if !request.has_overrides() {
        return Ok(Json(state.coordinator.split(&request.text, None)?));
    }

    let defaults = SplitOptions::from(&state.config.chunking);
    let options = SplitOptions {
        max_chars: request.max_chars.unwrap_or(defaults.max_chars),
        prefer_boundaries: request
            .prefer_boundaries
            .unwrap_or(defaults.prefer_boundaries),
        min_delay: request
            .min_delay_ms
            .map_or(defaults.min_delay, Duration::from_millis),
        max_delay: request
            .max_delay_ms
            .map_or(defaults.max_delay, Duration::from_millis),
    };
    Ok(Json(state.coordinator.split(&request.text, Some(&options))?))
}
