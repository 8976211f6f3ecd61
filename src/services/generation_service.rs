use crate::config::Config;
use crate::error::Result;
use crate::models::item::{ExamItem, FailureKind, GenerationEnvelope};
use crate::models::spec::ItemSpec;
use crate::services::llm_service::{CompletionClient, CompletionConfig};
use crate::services::prompt_service::{self, RepairReason};
use crate::services::spec_service::SpecRegistry;
use crate::services::validation_service::{self, ValidationResult};
use crate::utils::{fidelity, json};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub concurrency: usize,
}

impl GenerationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.llm_model.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
            max_attempts: config.generation_max_attempts.max(1),
            attempt_timeout: Duration::from_secs(config.generation_timeout_secs),
            concurrency: config.generation_concurrency.max(1),
        }
    }
}

/// Advisory hints threaded into the prompt and completion config; neither
/// affects what counts as a valid item.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub difficulty: Option<String>,
    pub seed: Option<u64>,
}

#[derive(Clone)]
pub struct GenerationService {
    llm: Arc<dyn CompletionClient>,
    registry: Arc<SpecRegistry>,
    settings: GenerationSettings,
}

impl GenerationService {
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        registry: Arc<SpecRegistry>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            llm,
            registry,
            settings,
        }
    }

    /// Runs the attempt/validate/repair loop for one (passage, item type)
    /// pair. Expected failures (fabricated passage, bad JSON, schema errors,
    /// transport trouble) are absorbed into an `ok:false` envelope; only an
    /// unknown type key or a broken prompt template surface as `Err`.
    pub async fn generate_one(
        &self,
        passage: &str,
        type_key: &str,
        opts: &GenerationOptions,
    ) -> Result<GenerationEnvelope> {
        let spec = self.registry.get(type_key)?;
        let (system_prompt, initial_prompt) =
            prompt_service::build_initial_prompt(spec, passage, opts.difficulty.as_deref())?;
        let completion_config = CompletionConfig {
            model: self.settings.model.clone(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            seed: opts.seed,
        };

        let mut user_prompt = initial_prompt;
        let mut last_failure = (
            FailureKind::Internal,
            "no generation attempts were made".to_string(),
        );

        for attempt in 1..=self.settings.max_attempts {
            let call = self
                .llm
                .complete(&system_prompt, &user_prompt, &completion_config);
            let response = match tokio::time::timeout(self.settings.attempt_timeout, call).await {
                Err(_) => {
                    tracing::warn!(type_key, attempt, "generation attempt timed out");
                    last_failure = (
                        FailureKind::Transport,
                        format!("attempt timed out after {:?}", self.settings.attempt_timeout),
                    );
                    // Nothing to repair; the same prompt is retried.
                    continue;
                }
                Ok(Err(e)) => {
                    tracing::warn!(type_key, attempt, error = %e, "generation transport failure");
                    last_failure = (FailureKind::Transport, e.to_string());
                    continue;
                }
                Ok(Ok(text)) => text,
            };

            if fidelity::looks_fabricated(&response) {
                tracing::warn!(type_key, attempt, "response reads like an invented passage");
                last_failure = (
                    FailureKind::Fidelity,
                    "response ignored the supplied passage".to_string(),
                );
                user_prompt =
                    prompt_service::build_repair_prompt(spec, passage, &RepairReason::FabricatedPassage);
                continue;
            }

            let candidate = match json::extract_json_object(&response) {
                Ok(value) => value,
                Err(message) => {
                    tracing::warn!(type_key, attempt, %message, "response failed JSON parsing");
                    last_failure = (FailureKind::Parse, message.clone());
                    user_prompt = prompt_service::build_repair_prompt(
                        spec,
                        passage,
                        &RepairReason::InvalidJson(message),
                    );
                    continue;
                }
            };

            match validation_service::validate(spec, passage, &candidate) {
                ValidationResult::Valid(mut item) => {
                    shuffle_options(spec, &mut item, opts.seed);
                    tracing::info!(type_key, attempt, "item generated");
                    return Ok(GenerationEnvelope::success(type_key, item, attempt));
                }
                ValidationResult::Invalid(errors) => {
                    tracing::warn!(type_key, attempt, ?errors, "schema validation failed");
                    last_failure = (
                        FailureKind::Schema,
                        errors
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join("; "),
                    );
                    user_prompt = prompt_service::build_repair_prompt(
                        spec,
                        passage,
                        &RepairReason::FieldErrors(errors),
                    );
                    continue;
                }
            }
        }

        let (kind, message) = last_failure;
        Ok(GenerationEnvelope::failure(
            type_key,
            self.settings.max_attempts,
            kind,
            message,
        ))
    }

    /// Fans `generate_one` out over every (type, replica) pair. Unknown type
    /// keys fail the whole request before dispatch; afterwards each pair
    /// succeeds or fails on its own and the result order is request order
    /// (types as given, replicas ascending), not completion order.
    pub async fn generate_many(
        &self,
        passage: &str,
        requested_types: &[String],
        n_per_type: usize,
        opts: &GenerationOptions,
    ) -> Result<Vec<GenerationEnvelope>> {
        for type_key in requested_types {
            self.registry.get(type_key)?;
        }

        let total = requested_types.len() * n_per_type;
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency));
        let mut tasks: JoinSet<(usize, GenerationEnvelope)> = JoinSet::new();

        for (type_index, type_key) in requested_types.iter().enumerate() {
            for replica in 0..n_per_type {
                let index = type_index * n_per_type + replica;
                let service = self.clone();
                let semaphore = semaphore.clone();
                let passage = passage.to_string();
                let type_key = type_key.clone();
                let mut opts = opts.clone();
                // A fixed seed still has to produce distinct replicas.
                opts.seed = opts.seed.map(|s| s.wrapping_add(index as u64));

                tasks.spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    let envelope = match service.generate_one(&passage, &type_key, &opts).await {
                        Ok(envelope) => envelope,
                        Err(e) => GenerationEnvelope::failure(
                            &type_key,
                            0,
                            FailureKind::Internal,
                            e.to_string(),
                        ),
                    };
                    (index, envelope)
                });
            }
        }

        let mut slots: Vec<Option<GenerationEnvelope>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, envelope)) => slots[index] = Some(envelope),
                Err(e) => tracing::error!(error = %e, "generation task aborted"),
            }
        }

        Ok(slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    GenerationEnvelope::failure(
                        &requested_types[index / n_per_type],
                        0,
                        FailureKind::Internal,
                        "generation task aborted",
                    )
                })
            })
            .collect())
    }
}

/// Reorders options so the correct position varies between items, remapping
/// the answer. Skipped for kinds whose options name passage positions.
fn shuffle_options(spec: &ItemSpec, item: &mut ExamItem, seed: Option<u64>) {
    if spec.kind.options_positional() {
        return;
    }
    let Ok(position) = item.correct_answer.parse::<usize>() else {
        return;
    };
    if position < 1 || position > item.options.len() {
        return;
    }
    let correct_text = item.options[position - 1].clone();

    let mut rng: StdRng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    item.options.shuffle(&mut rng);

    if let Some(new_index) = item.options.iter().position(|o| o == &correct_text) {
        item.correct_answer = (new_index + 1).to_string();
    }
}
