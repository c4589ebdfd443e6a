use reqwest::Client;
use std::sync::Arc;

use crate::config::Config;

pub mod assessment_service;
pub mod chat_service;
pub mod dashboard_service;
pub mod interview_service;
pub mod llm;
pub mod llm_json;
pub mod meeting_service;
pub mod notification_service;
pub mod roadmap_builder;
pub mod roadmap_service;
pub mod search;
pub mod speech;
pub mod user_service;

use llm::{GeminiClient, LanguageModel};
use search::{SerperClient, WebSearch};
use speech::{AssemblyAiClient, GoogleTtsClient, SpeechToText, TextToSpeech};

/// External AI collaborators, handed to the services that need them.
#[derive(Clone)]
pub struct AiClients {
    pub llm: Arc<dyn LanguageModel>,
    pub search: Arc<dyn WebSearch>,
    pub stt: Arc<dyn SpeechToText>,
    pub tts: Arc<dyn TextToSpeech>,
}

impl AiClients {
    pub fn from_config(config: &Config) -> Self {
        let http = Client::new();
        AiClients {
            llm: Arc::new(GeminiClient::new(
                http.clone(),
                config.gemini_api_key.clone(),
                config.gemini_model.clone(),
            )),
            search: Arc::new(SerperClient::new(http.clone(), config.serper_api_key.clone())),
            stt: Arc::new(AssemblyAiClient::new(http.clone(), config.assemblyai_api_key.clone())),
            tts: Arc::new(GoogleTtsClient::new(http, config.tts_api_key.clone())),
        }
    }
}
