pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    generation_service::{GenerationService, GenerationSettings},
    llm_service::{CompletionClient, OpenAiClient},
    spec_service::SpecRegistry,
    suggest_service::SuggestService,
};
use reqwest::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SpecRegistry>,
    pub generation_service: GenerationService,
    pub suggest_service: SuggestService,
}

impl AppState {
    pub fn new() -> Self {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap();
        let llm = Arc::new(OpenAiClient::new(
            config.openai_api_key.clone(),
            http_client,
        ));
        Self::with_client(llm)
    }

    /// Wires the services around any completion backend; tests inject a
    /// scripted client here instead of the OpenAI one.
    pub fn with_client(llm: Arc<dyn CompletionClient>) -> Self {
        let config = crate::config::get_config();
        let registry = Arc::new(SpecRegistry::with_catalog());
        let generation_service = GenerationService::new(
            llm,
            registry.clone(),
            GenerationSettings::from_config(config),
        );
        let suggest_service = SuggestService::new(registry.clone());

        Self {
            registry,
            generation_service,
            suggest_service,
        }
    }
}
