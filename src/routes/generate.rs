use crate::{
    dto::generate_dto::{GenerateBatchPayload, GenerateItemPayload, SuggestPayload},
    error::{Error, Result},
    services::generation_service::GenerationOptions,
    AppState,
};
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

fn check_passage_size(passage: &str) -> Result<()> {
    let limit = crate::config::get_config().max_passage_chars;
    if passage.chars().count() > limit {
        return Err(Error::BadRequest(format!(
            "Passage exceeds the {} character limit",
            limit
        )));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/items/generate",
    request_body = GenerateItemPayload,
    responses(
        (status = 200, description = "Generation envelope; check the ok flag", body = Json<serde_json::Value>),
        (status = 400, description = "Invalid request payload"),
        (status = 404, description = "Unknown item type"),
    ),
)]
#[axum::debug_handler]
pub async fn generate_item(
    State(state): State<AppState>,
    Json(payload): Json<GenerateItemPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    check_passage_size(&payload.passage)?;

    let opts = GenerationOptions {
        difficulty: payload.difficulty,
        seed: payload.seed,
    };
    let envelope = state
        .generation_service
        .generate_one(&payload.passage, &payload.item_type, &opts)
        .await?;
    Ok(Json(envelope))
}

#[utoipa::path(
    post,
    path = "/api/items/generate-batch",
    request_body = GenerateBatchPayload,
    responses(
        (status = 200, description = "Envelopes for every (type, replica) pair in request order", body = Json<serde_json::Value>),
        (status = 400, description = "Invalid request payload"),
        (status = 404, description = "Unknown item type"),
    ),
)]
#[axum::debug_handler]
pub async fn generate_batch(
    State(state): State<AppState>,
    Json(payload): Json<GenerateBatchPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    check_passage_size(&payload.passage)?;

    let config = crate::config::get_config();
    let n_per_type = payload
        .n_per_type
        .unwrap_or(1)
        .clamp(1, config.max_items_per_type);

    let request_id = Uuid::new_v4();
    tracing::info!(
        %request_id,
        item_types = ?payload.item_types,
        n_per_type,
        "batch generation started"
    );

    let opts = GenerationOptions {
        difficulty: payload.difficulty,
        seed: payload.seed,
    };
    let envelopes = state
        .generation_service
        .generate_many(&payload.passage, &payload.item_types, n_per_type, &opts)
        .await?;

    let ok = envelopes.iter().all(|e| e.ok);
    let succeeded = envelopes.iter().filter(|e| e.ok).count();
    tracing::info!(%request_id, succeeded, total = envelopes.len(), "batch generation finished");

    Ok(Json(json!({
        "ok": ok,
        "request_id": request_id,
        "items": envelopes,
    })))
}

#[axum::debug_handler]
pub async fn suggest_types(
    State(state): State<AppState>,
    Json(payload): Json<SuggestPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    check_passage_size(&payload.passage)?;

    let top_k = payload.top_k.unwrap_or(3).max(1);
    let (candidates, top) = state.suggest_service.suggest(&payload.passage, top_k);

    Ok(Json(json!({
        "ok": true,
        "candidates": candidates,
        "top": top,
    })))
}
