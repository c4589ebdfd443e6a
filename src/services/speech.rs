//! Speech collaborators for the interview loop.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::errors::AppError;

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, AppError>;
}

#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Returns MP3 bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AppError>;
}

const ASSEMBLYAI_BASE: &str = "https://api.assemblyai.com/v2";
const POLL_INTERVAL: Duration = Duration::from_secs(1);
const MAX_POLLS: usize = 120;

pub struct AssemblyAiClient {
    client: Client,
    api_key: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Deserialize)]
struct TranscriptResponse {
    id: String,
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl AssemblyAiClient {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AppError> {
        let response = request
            .header("authorization", &self.api_key)
            .send()
            .await
            .map_err(|e| AppError::Speech(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Speech(format!("transcription service returned {status}: {detail}")));
        }
        response.json().await.map_err(|e| AppError::Speech(e.to_string()))
    }
}

#[async_trait]
impl SpeechToText for AssemblyAiClient {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, AppError> {
        let upload: UploadResponse = self
            .send_json(self.client.post(format!("{ASSEMBLYAI_BASE}/upload")).body(audio))
            .await?;

        let mut transcript: TranscriptResponse = self
            .send_json(
                self.client
                    .post(format!("{ASSEMBLYAI_BASE}/transcript"))
                    .json(&json!({ "audio_url": upload.upload_url })),
            )
            .await?;

        for _ in 0..MAX_POLLS {
            match transcript.status.as_str() {
                "completed" => return Ok(transcript.text.unwrap_or_default()),
                "error" => {
                    return Err(AppError::Speech(
                        transcript.error.unwrap_or_else(|| "transcription failed".to_string()),
                    ))
                }
                _ => {}
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            transcript = self
                .send_json(self.client.get(format!("{ASSEMBLYAI_BASE}/transcript/{}", transcript.id)))
                .await?;
        }
        Err(AppError::Speech("transcription timed out".to_string()))
    }
}

/// Google Cloud Text-to-Speech, English neutral voice, MP3 output.
pub struct GoogleTtsClient {
    client: Client,
    api_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

impl GoogleTtsClient {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl TextToSpeech for GoogleTtsClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AppError> {
        let body = json!({
            "input": { "text": text },
            "voice": { "languageCode": "en-US", "ssmlGender": "NEUTRAL" },
            "audioConfig": { "audioEncoding": "MP3" }
        });
        let response = self
            .client
            .post("https://texttospeech.googleapis.com/v1/text:synthesize")
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Speech(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Speech(format!("speech synthesis returned {status}: {detail}")));
        }

        let parsed: SynthesizeResponse =
            response.json().await.map_err(|e| AppError::Speech(e.to_string()))?;
        STANDARD
            .decode(parsed.audio_content)
            .map_err(|e| AppError::Speech(format!("invalid audio payload: {e}")))
    }
}
