use async_trait::async_trait;
use axum::{body::Body, Router};
use mongodb::Database;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::{
    config::Config,
    db::init_db,
    errors::AppError,
    models::user::{ProfileInput, Role},
    routes,
    services::{
        llm::LanguageModel,
        notification_service::NotificationService,
        search::{SearchError, SearchHit, WebSearch},
        speech::{SpeechToText, TextToSpeech},
        user_service::{NewUser, UserService},
        AiClients,
    },
    utils::generate_jwt,
};

pub const TEST_SECRET: &str = "test_secret";

/// Answers by prompt kind and records every prompt it saw.
#[derive(Default)]
pub struct FakeLanguageModel {
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
    pub modules: usize,
    pub revision: Option<String>,
}

impl FakeLanguageModel {
    pub fn with_modules(modules: usize) -> Self {
        FakeLanguageModel { modules, ..Default::default() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn outline_reply(modules: usize) -> String {
    let entries: Vec<Value> = (1..=modules)
        .map(|i| {
            serde_json::json!({
                "title": format!("Module {i}"),
                "objective": format!("Objective {i}"),
                "subtopics": [format!("Topic {i}.1"), format!("Topic {i}.2"), format!("Topic {i}.3")]
            })
        })
        .collect();
    format!("```json\n{}\n```", Value::Array(entries))
}

/// Python-literal style, the way the model sometimes answers.
pub fn evaluation_reply() -> String {
    let mut body = String::from("{");
    for i in 1..=5 {
        body.push_str(&format!(
            "'question{i}': {{'question': 'Q{i}?', 'option A': 'a', 'option B': 'b', \
             'option C': 'c', 'option D': 'd', 'correct option': 'B'}},"
        ));
    }
    body.push('}');
    body
}

#[async_trait]
impl LanguageModel for FakeLanguageModel {
    async fn complete(&self, prompt: &str) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if prompt.starts_with("Break down the topic") {
            Ok(outline_reply(self.modules))
        } else if prompt.contains("multiple-choice questions") {
            Ok(evaluation_reply())
        } else if prompt.contains("modify the roadmap") {
            self.revision
                .clone()
                .ok_or_else(|| AppError::LanguageModel("no revision scripted".to_string()))
        } else {
            Ok("What is ownership in Rust?".to_string())
        }
    }
}

/// Fixed hits for every query, or a fixed failure.
pub struct FakeSearch {
    pub hits: Vec<SearchHit>,
    pub fail_with: Option<u16>,
}

impl FakeSearch {
    pub fn hits() -> Self {
        let hit = |title: &str, link: &str| SearchHit { title: title.to_string(), link: link.to_string() };
        FakeSearch {
            hits: vec![
                hit("Rust in 100 seconds", "https://www.youtube.com/watch?v=5C_HPTJg5ek"),
                hit("Programming in Rust", "https://www.coursera.org/learn/rust"),
                hit("The Book", "https://doc.rust-lang.org/book/"),
                hit("Rust by Example", "https://doc.rust-lang.org/rust-by-example/"),
            ],
            fail_with: None,
        }
    }

    pub fn failing(status: u16) -> Self {
        FakeSearch { hits: vec![], fail_with: Some(status) }
    }
}

#[async_trait]
impl WebSearch for FakeSearch {
    async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, SearchError> {
        match self.fail_with {
            Some(code) => Err(SearchError::Status(code)),
            None => Ok(self.hits.clone()),
        }
    }
}

pub struct FakeSpeech;

#[async_trait]
impl SpeechToText for FakeSpeech {
    async fn transcribe(&self, _audio: Vec<u8>) -> Result<String, AppError> {
        Ok("I am learning Rust".to_string())
    }
}

#[async_trait]
impl TextToSpeech for FakeSpeech {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, AppError> {
        Err(AppError::Speech("no voice in tests".to_string()))
    }
}

/// Transcription that always fails, as when the upload is rejected.
pub struct FailingSpeech;

#[async_trait]
impl SpeechToText for FailingSpeech {
    async fn transcribe(&self, _audio: Vec<u8>) -> Result<String, AppError> {
        Err(AppError::Speech("transcription failed".to_string()))
    }
}

pub fn fake_clients(llm: Arc<FakeLanguageModel>, search: FakeSearch) -> AiClients {
    AiClients {
        llm,
        search: Arc::new(search),
        stt: Arc::new(FakeSpeech),
        tts: Arc::new(FakeSpeech),
    }
}

pub fn test_config(mongodb_uri: String) -> Config {
    Config {
        mongodb_uri,
        database_name: "mentormatch_test".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        port: 8001,
        gemini_api_key: String::new(),
        gemini_model: "test".to_string(),
        serper_api_key: String::new(),
        assemblyai_api_key: String::new(),
        tts_api_key: String::new(),
        audio_dir: std::env::temp_dir().to_string_lossy().into_owned(),
        cookie_secure: false,
    }
}

pub struct TestContext {
    pub app: Router,
    pub db: Arc<Database>,
    pub users: UserService,
}

pub struct TestUser {
    pub id: String,
    pub token: String,
}

/// Router over a client that never connects; fine for requests rejected before any query.
pub async fn offline_app() -> Router {
    let config = test_config("mongodb://127.0.0.1:1".to_string());
    let db = Arc::new(
        init_db(&config.mongodb_uri, &config.database_name)
            .await
            .expect("client should build without a server"),
    );
    let clients = fake_clients(Arc::new(FakeLanguageModel::with_modules(6)), FakeSearch::hits());
    routes::init_routes(db, Arc::new(config), clients)
}

/// Needs a live MongoDB at `MONGODB_TEST_URI`; every collection is dropped first.
pub async fn setup() -> TestContext {
    dotenv::dotenv().ok();
    let uri = std::env::var("MONGODB_TEST_URI").expect("MONGODB_TEST_URI must be set for tests");
    let config = test_config(uri);

    let db = Arc::new(
        init_db(&config.mongodb_uri, &config.database_name)
            .await
            .expect("Failed to connect to test database"),
    );
    for collection in ["users", "roadmaps", "messages", "meetings", "notifications"] {
        db.collection::<bson::Document>(collection)
            .drop()
            .await
            .unwrap_or_else(|e| panic!("Failed to drop collection {collection}: {e}"));
    }
    crate::db::ensure_indexes(&db).await.expect("Failed to create indexes");

    let clients = fake_clients(Arc::new(FakeLanguageModel::with_modules(6)), FakeSearch::hits());
    let app = routes::init_routes(db.clone(), Arc::new(config), clients);
    let users = UserService::new(db.clone(), Arc::new(NotificationService::new(db.clone())));

    TestContext { app, db, users }
}

/// Registers a user through the service and returns its id and a valid JWT.
pub async fn create_test_user(users: &UserService, role: Role, username: &str) -> TestUser {
    let user = users
        .register(NewUser {
            name: username.to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "password123".to_string(),
            role,
            profile: ProfileInput::default(),
        })
        .await
        .expect("Failed to register test user");

    let id = user.id.expect("registered user has an id").to_hex();
    let token = generate_jwt(&id, &user.email, &user.username, role, TEST_SECRET).expect("token");
    TestUser { id, token }
}

pub fn json_body(json: &Value) -> Body {
    Body::from(json.to_string())
}
