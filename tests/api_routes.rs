use std::sync::Arc;
use std::time::Duration;

use actix_web::{http::StatusCode, test, web, App};
use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use osint_terminal::api::routes;
use osint_terminal::concierge::Bridge;
use osint_terminal::config::{AppConfig, DatabaseConfig, Settings};
use osint_terminal::db::{
    get_connection, Conversation, DuckDbStore, NewVisitor, NoopStore, StoreError, Visitor, VisitorStore,
};
use osint_terminal::llm::{
    models::{ChatOptions, ChatResponse, Message},
    LlmError, LlmProvider, ProviderKind,
};
use osint_terminal::state::{AppState, Capabilities};

const VISITOR: &str = "11111111-1111-1111-1111-111111111111";

struct EchoProvider;

#[async_trait]
impl LlmProvider for EchoProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn chat(&self, messages: &[Message], _options: ChatOptions) -> Result<ChatResponse, LlmError> {
        Ok(ChatResponse {
            content: format!("echo: {}", messages[0].content),
            model: "echo".to_string(),
        })
    }
}

struct DownProvider;

#[async_trait]
impl LlmProvider for DownProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn chat(&self, _messages: &[Message], _options: ChatOptions) -> Result<ChatResponse, LlmError> {
        Err(LlmError::Network("connection refused".to_string()))
    }
}

/// A persistent store whose every call fails.
struct BrokenStore;

#[async_trait]
impl VisitorStore for BrokenStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn upsert_visitor(&self, _visitor: NewVisitor) -> Result<(), StoreError> {
        Err(StoreError::Poisoned)
    }

    async fn get_visitor(&self, _id: Uuid) -> Result<Option<Visitor>, StoreError> {
        Err(StoreError::Poisoned)
    }

    async fn list_visitors(&self, _limit: usize) -> Result<Vec<Visitor>, StoreError> {
        Err(StoreError::Poisoned)
    }

    async fn insert_conversation(&self, _visitor_id: Uuid, _prompt: &str, _answer: &str) -> Result<(), StoreError> {
        Err(StoreError::Poisoned)
    }

    async fn recent_conversations(&self, _visitor_id: Uuid, _limit: usize) -> Result<Vec<Conversation>, StoreError> {
        Err(StoreError::Poisoned)
    }
}

fn memory_store() -> Arc<dyn VisitorStore> {
    let config = DatabaseConfig {
        path: ":memory:".to_string(),
    };
    Arc::new(DuckDbStore::new(get_connection(&config).unwrap()))
}

fn app_state(store: Arc<dyn VisitorStore>, bridge: Bridge, policy: &str) -> web::Data<AppState> {
    let config = AppConfig::from_settings(Settings {
        error_policy: Some(policy.to_string()),
        ..Default::default()
    })
    .unwrap();
    web::Data::from(AppState::with_capabilities(config, Capabilities { store, bridge }))
}

fn berlin_report() -> Value {
    json!({
        "visitor_id": VISITOR,
        "fpHash": "abc",
        "geo": {"city": "Berlin", "country": "Germany", "lat": 52.5, "lon": 13.4},
        "userAgent": "test"
    })
}

#[actix_web::test]
async fn health_reports_ok() {
    let state = app_state(Arc::new(NoopStore), Bridge::Unconfigured(ProviderKind::OpenAi), "graceful");
    let app = test::init_service(App::new().app_data(state).configure(routes::configure)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body, json!({"status": "OK", "message": "OSINT Terminal is running!"}));
}

#[actix_web::test]
async fn terminal_page_and_script_are_served() {
    let state = app_state(Arc::new(NoopStore), Bridge::Unconfigured(ProviderKind::OpenAi), "graceful");
    let app = test::init_service(App::new().app_data(state).configure(routes::configure)).await;

    let page = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert!(String::from_utf8_lossy(&page).contains("/terminal.js"));

    let resp = test::call_service(&app, test::TestRequest::get().uri("/terminal.js").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn session_is_stored_and_looked_up() {
    let store = memory_store();
    let state = app_state(store.clone(), Bridge::Unconfigured(ProviderKind::OpenAi), "graceful");
    let app = test::init_service(App::new().app_data(state).configure(routes::configure)).await;

    let req = test::TestRequest::post()
        .uri("/session")
        .set_json(berlin_report())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"success": true}));

    let id: Uuid = VISITOR.parse().unwrap();
    let visitor = store.get_visitor(id).await.unwrap().unwrap();
    assert_eq!(visitor.city, "Berlin");
    assert_eq!(visitor.ip, "unknown");
}

#[actix_web::test]
async fn repeated_session_keeps_first_seen() {
    let store = memory_store();
    let state = app_state(store.clone(), Bridge::Unconfigured(ProviderKind::OpenAi), "graceful");
    let app = test::init_service(App::new().app_data(state).configure(routes::configure)).await;
    let id: Uuid = VISITOR.parse().unwrap();

    let req = test::TestRequest::post()
        .uri("/session")
        .set_json(berlin_report())
        .to_request();
    test::call_service(&app, req).await;
    let first = store.get_visitor(id).await.unwrap().unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;

    let mut moved = berlin_report();
    moved["geo"]["city"] = json!("Munich");
    let req = test::TestRequest::post().uri("/session").set_json(moved).to_request();
    test::call_service(&app, req).await;
    let second = store.get_visitor(id).await.unwrap().unwrap();

    assert_eq!(second.first_seen, first.first_seen);
    assert!(second.last_seen > first.last_seen);
    assert_eq!(second.city, "Munich");
    assert_eq!(second.country, "Germany");
}

#[actix_web::test]
async fn session_without_database_says_so() {
    let state = app_state(Arc::new(NoopStore), Bridge::Unconfigured(ProviderKind::OpenAi), "strict");
    let app = test::init_service(App::new().app_data(state).configure(routes::configure)).await;

    let req = test::TestRequest::post()
        .uri("/session")
        .set_json(berlin_report())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body, json!({"success": true, "message": "No database configured"}));
}

#[actix_web::test]
async fn session_store_failure_follows_policy() {
    let state = app_state(Arc::new(BrokenStore), Bridge::Unconfigured(ProviderKind::OpenAi), "graceful");
    let app = test::init_service(App::new().app_data(state).configure(routes::configure)).await;
    let req = test::TestRequest::post()
        .uri("/session")
        .set_json(berlin_report())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"success": true}));

    let state = app_state(Arc::new(BrokenStore), Bridge::Unconfigured(ProviderKind::OpenAi), "strict");
    let app = test::init_service(App::new().app_data(state).configure(routes::configure)).await;
    let req = test::TestRequest::post()
        .uri("/session")
        .set_json(berlin_report())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"error": "Failed to record session"}));
}

#[actix_web::test]
async fn query_without_key_returns_instructions() {
    let state = app_state(memory_store(), Bridge::Unconfigured(ProviderKind::OpenAi), "strict");
    let app = test::init_service(App::new().app_data(state).configure(routes::configure)).await;

    let req = test::TestRequest::post()
        .uri("/query")
        .set_json(json!({"visitor_id": VISITOR, "prompt": "what is OSINT"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(
        body,
        json!({"answer": "SYSTEM: OpenAI API key not configured. Add OPENAI_API_KEY to Railway environment variables."})
    );
}

#[actix_web::test]
async fn query_answer_is_recorded() {
    let store = memory_store();
    let state = app_state(store.clone(), Bridge::Live(Arc::new(EchoProvider)), "graceful");
    let app = test::init_service(App::new().app_data(state).configure(routes::configure)).await;
    let id: Uuid = VISITOR.parse().unwrap();

    let req = test::TestRequest::post()
        .uri("/session")
        .set_json(berlin_report())
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/query")
        .set_json(json!({"visitor_id": VISITOR, "prompt": "what is OSINT"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"answer": "echo: what is OSINT"}));

    let history = store.recent_conversations(id, 5).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].answer, "echo: what is OSINT");
}

#[actix_web::test]
async fn llm_failure_follows_policy() {
    let state = app_state(memory_store(), Bridge::Live(Arc::new(DownProvider)), "graceful");
    let app = test::init_service(App::new().app_data(state).configure(routes::configure)).await;
    let req = test::TestRequest::post()
        .uri("/query")
        .set_json(json!({"visitor_id": VISITOR, "prompt": "hello"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        body["answer"],
        "ERROR: Network Error: connection refused. Check your OpenAI API key."
    );

    let store = memory_store();
    store
        .upsert_visitor(NewVisitor::unknown(VISITOR.parse().unwrap()))
        .await
        .unwrap();
    let state = app_state(store, Bridge::Live(Arc::new(DownProvider)), "strict");
    let app = test::init_service(App::new().app_data(state).configure(routes::configure)).await;
    let req = test::TestRequest::post()
        .uri("/query")
        .set_json(json!({"visitor_id": VISITOR, "prompt": "hello"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"error": "Failed to process query"}));
}

#[actix_web::test]
async fn strict_query_for_unknown_visitor_is_not_found() {
    let state = app_state(memory_store(), Bridge::Live(Arc::new(EchoProvider)), "strict");
    let app = test::init_service(App::new().app_data(state).configure(routes::configure)).await;

    let req = test::TestRequest::post()
        .uri("/query")
        .set_json(json!({"visitor_id": Uuid::new_v4(), "prompt": "hello"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn malformed_bodies_are_bad_requests() {
    let state = app_state(Arc::new(NoopStore), Bridge::Unconfigured(ProviderKind::OpenAi), "graceful");
    let app = test::init_service(App::new().app_data(state).configure(routes::configure)).await;

    let req = test::TestRequest::post()
        .uri("/query")
        .set_json(json!({"visitor_id": "not-a-uuid", "prompt": "hello"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("Malformed payload"));
}
