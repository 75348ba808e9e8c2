//! Buffer status handlers.

use super::parse_recipient;
use crate::Result;
use crate::api::AppState;
use crate::buffer::RecipientBuffer;
use crate::types::BufferStatus;
use axum::{
    Json,
    extract::{Path, State},
};

/// GET /buffers - Status of every recipient buffer
#[utoipa::path(
    get,
    path = "/buffers",
    tag = "buffers",
    responses(
        (status = 200, description = "Buffer snapshots sorted by recipient", body = Vec<crate::types::BufferStatus>)
    )
)]
pub async fn list_buffers(State(state): State<AppState>) -> Json<Vec<BufferStatus>> {
    Json(state.coordinator.status(None).await)
}

/// GET /buffers/:id - Status of one recipient buffer
///
/// Unknown recipients report an empty buffer rather than 404.
#[utoipa::path(
    get,
    path = "/buffers/{id}",
    tag = "buffers",
    params(
        ("id" = String, Path, description = "Recipient identifier")
    ),
    responses(
        (status = 200, description = "Buffer snapshot", body = crate::types::BufferStatus),
        (status = 422, description = "Empty recipient", body = crate::error::ApiError)
    )
)]
pub async fn get_buffer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BufferStatus>> {
    let recipient = parse_recipient(&id)?;
    let snapshot = state
        .coordinator
        .status(Some(&recipient))
        .await
        .into_iter()
        .next()
        .unwrap_or_else(|| RecipientBuffer::new(recipient).status());
    Ok(Json(snapshot))
}
