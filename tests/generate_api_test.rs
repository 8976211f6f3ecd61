use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use examgen_backend::services::llm_service::{CompletionClient, CompletionConfig, LlmError};
use examgen_backend::{routes, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

const PASSAGE: &str = "Urban gardens have quietly changed how neighborhoods relate to food. \
    What began as a handful of vacant lots planted with vegetables has grown into a network \
    of shared spaces where residents trade seedlings, recipes, and time.";

const LETTER: &str = "Dear Ms. Carver, I am writing on behalf of the Riverside Library to ask \
    whether the community hall could host our annual used-book sale this autumn. The sale has \
    outgrown our reading room. Sincerely, Dana Whitfield";

/// Completion backend scripted by a closure over the user prompt.
struct ScriptedClient(Box<dyn Fn(&str) -> Result<String, LlmError> + Send + Sync>);

impl ScriptedClient {
    fn new(f: impl Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self(Box::new(f)))
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _config: &CompletionConfig,
    ) -> Result<String, LlmError> {
        (self.0)(user_prompt)
    }
}

fn gist_response() -> String {
    json!({
        "question": "다음 글의 요지로 가장 적절한 것은?",
        "options": ["도시 텃밭은 공동체를 변화시켰다.", "채소 가격이 올랐다.", "정원은 유지비가 많이 든다.", "도시는 녹지가 부족하다.", "농업 기술이 발전했다."],
        "correct_answer": "1",
        "explanation": "The passage describes gardens reshaping neighborhood life."
    })
    .to_string()
}

fn setup_app(client: Arc<dyn CompletionClient>) -> Router {
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("OPENAI_API_KEY", "sk-test");
    env::set_var("GENERATION_MAX_ATTEMPTS", "2");
    env::set_var("GENERATION_TIMEOUT_SECS", "5");
    let _ = examgen_backend::config::init_config();

    let state = AppState::with_client(client);
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/items/generate", post(routes::generate::generate_item))
        .route(
            "/api/items/generate-batch",
            post(routes::generate::generate_batch),
        )
        .route("/api/items/suggest", post(routes::generate::suggest_types))
        .with_state(state)
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_reports_the_registry() {
    let app = setup_app(ScriptedClient::new(|_| Ok(gist_response())));
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["registered_item_types"], 8);
}

#[tokio::test]
async fn generate_returns_a_success_envelope() {
    let app = setup_app(ScriptedClient::new(|_| Ok(gist_response())));
    let (status, body) = post_json(
        app,
        "/api/items/generate",
        json!({ "passage": PASSAGE, "item_type": "RC22" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["item_type"], "RC22");
    assert_eq!(body["attempts_used"], 1);
    let item = &body["item"];
    assert_eq!(item["options"].as_array().unwrap().len(), 5);
    let answer: usize = item["correct_answer"].as_str().unwrap().parse().unwrap();
    assert!((1..=5).contains(&answer));
}

#[tokio::test]
async fn unknown_item_type_is_a_404() {
    let app = setup_app(ScriptedClient::new(|_| Ok(gist_response())));
    let (status, body) = post_json(
        app,
        "/api/items/generate",
        json!({ "passage": PASSAGE, "item_type": "RC99" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("RC99"));
}

#[tokio::test]
async fn short_passages_fail_payload_validation() {
    let app = setup_app(ScriptedClient::new(|_| Ok(gist_response())));
    let (status, _) = post_json(
        app,
        "/api/items/generate",
        json!({ "passage": "Too short.", "item_type": "RC22" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn batch_degrades_failures_into_ordered_envelopes() {
    // Provider failures never abort siblings; every pair still reports.
    let app = setup_app(ScriptedClient::new(|_| {
        Err(LlmError::Provider {
            status: 503,
            body: "upstream unavailable".to_string(),
        })
    }));
    let (status, body) = post_json(
        app,
        "/api/items/generate-batch",
        json!({ "passage": PASSAGE, "item_types": ["RC22", "RC31"], "n_per_type": 2 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], false);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 4);
    let order: Vec<&str> = items
        .iter()
        .map(|e| e["item_type"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec!["RC22", "RC22", "RC31", "RC31"]);
    for envelope in items {
        assert_eq!(envelope["ok"], false);
        assert_eq!(envelope["attempts_used"], 2);
        assert_eq!(envelope["error"]["kind"], "transport");
    }
}

#[tokio::test]
async fn suggest_ranks_letters_as_purpose_items() {
    let app = setup_app(ScriptedClient::new(|_| Ok(gist_response())));
    let (status, body) = post_json(
        app,
        "/api/items/suggest",
        json!({ "passage": LETTER, "top_k": 3 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    let candidates = body["candidates"].as_array().unwrap();
    assert_eq!(candidates.len(), 8);
    let top = body["top"].as_array().unwrap();
    assert_eq!(top.len(), 3);
    assert_eq!(top[0], "RC18");
    for candidate in candidates {
        assert!(candidate["fit_score"].is_number());
        assert!(candidate["reason"].is_string());
        assert!(candidate["prep_hint"].is_string());
    }
}
