pub mod generation_service;
pub mod llm_service;
pub mod prompt_service;
pub mod spec_service;
pub mod suggest_service;
pub mod validation_service;
