use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub openai_api_key: String,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub generation_max_attempts: u32,
    pub generation_timeout_secs: u64,
    pub generation_concurrency: usize,
    pub max_items_per_type: usize,
    pub max_passage_chars: usize,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            openai_api_key: get_env("OPENAI_API_KEY")?,
            llm_model: get_env_or("LLM_MODEL", "gpt-4o"),
            llm_temperature: get_env_parse_or("LLM_TEMPERATURE", 0.7)?,
            llm_max_tokens: get_env_parse_or("LLM_MAX_TOKENS", 2048)?,
            generation_max_attempts: get_env_parse_or("GENERATION_MAX_ATTEMPTS", 3)?,
            generation_timeout_secs: get_env_parse_or("GENERATION_TIMEOUT_SECS", 45)?,
            generation_concurrency: get_env_parse_or("GENERATION_CONCURRENCY", 4)?,
            max_items_per_type: get_env_parse_or("MAX_ITEMS_PER_TYPE", 5)?,
            max_passage_chars: get_env_parse_or("MAX_PASSAGE_CHARS", 8000)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
