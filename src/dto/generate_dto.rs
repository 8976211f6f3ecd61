use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct GenerateItemPayload {
    #[validate(length(min = 40, message = "Passage is too short to build an item from"))]
    pub passage: String,
    #[validate(length(min = 1, message = "Item type cannot be empty"))]
    pub item_type: String,
    pub difficulty: Option<String>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct GenerateBatchPayload {
    #[validate(length(min = 40, message = "Passage is too short to build an item from"))]
    pub passage: String,
    #[validate(length(min = 1, message = "At least one item type is required"))]
    pub item_types: Vec<String>,
    pub n_per_type: Option<usize>,
    pub difficulty: Option<String>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SuggestPayload {
    #[validate(length(min = 1, message = "Passage cannot be empty"))]
    pub passage: String,
    pub top_k: Option<usize>,
}
