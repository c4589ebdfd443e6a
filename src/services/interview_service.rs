//! Mock-interview driver.
//!
//! Stateless per call: the client sends the conversation so far, the server answers
//! with the next question. An empty history gets the fixed greeting without asking
//! the model; five or more questions in the history get the fixed closing message.

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::models::notification::NotificationKind;
use crate::models::roadmap::InterviewSlot;
use crate::models::user::Role;
use crate::services::llm::LanguageModel;
use crate::services::roadmap_service::RoadmapService;
use crate::services::AiClients;
use crate::utils::Claims;

pub const GREETING: &str = "Hello! I'm your AI interviewer. Could you introduce yourself?";
pub const CLOSING: &str = "Thank you for taking this interview. You will receive feedback from your mentor soon.";
pub const MAX_QUESTIONS: usize = 5;
pub const AUDIO_FILE: &str = "ai-speech.mp3";
const QUESTION_MARKER: &str = "\"question\":";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct Exchange {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct InterviewTurn {
    pub transcript: Option<String>,
    pub next_question: String,
    /// `None` when speech synthesis failed; the question text is still usable.
    pub audio_path: Option<String>,
    pub finished: bool,
}

#[derive(Debug, PartialEq)]
pub enum NextStep {
    Greeting,
    Closing,
    Ask(String),
}

/// One compact JSON object per line, so every exchange carries exactly one question marker.
pub fn render_history(history: &[Exchange]) -> String {
    history
        .iter()
        .filter_map(|e| serde_json::to_string(e).ok())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn question_count(rendered: &str) -> usize {
    rendered.matches(QUESTION_MARKER).count()
}

pub fn interview_prompt(instructions: &str, rendered_history: &str, goal: &str) -> String {
    format!(
        "You are a professional AI interviewer.\n\
         Instructions: {instructions}\n\n\
         Your job is to ask questions, one at a time, and guide the conversation naturally.\n\
         You must:\n\
         - Ask follow-up questions based on user's last answer if possible.\n\
         - If nothing to follow up on, cover the next topic from the list.\n\
         - End the interview politely after about 4-5 questions.\n\n\
         Goal of the mentee giving the interview is to learn: {goal}.\n\
         Here's the conversation so far:\n\
         {rendered_history}\n\
         What would be your next question?"
    )
}

pub fn plan(history: &[Exchange], instructions: &str, goal: &str) -> NextStep {
    if history.is_empty() {
        return NextStep::Greeting;
    }
    let rendered = render_history(history);
    if question_count(&rendered) >= MAX_QUESTIONS {
        return NextStep::Closing;
    }
    NextStep::Ask(interview_prompt(instructions, &rendered, goal))
}

/// Attaches a transcribed answer: it fills the open question, answers the greeting
/// on the first turn, or extends the last answer.
pub fn record_answer(history: &mut Vec<Exchange>, transcript: &str) {
    if history.is_empty() {
        history.push(Exchange { question: GREETING.to_string(), answer: Some(transcript.to_string()) });
        return;
    }
    let Some(last) = history.last_mut() else { return };
    match &mut last.answer {
        Some(answer) if !answer.trim().is_empty() => {
            answer.push(' ');
            answer.push_str(transcript);
        }
        _ => last.answer = Some(transcript.to_string()),
    }
}

/// Next question and whether the interview is over. Only `Ask` reaches the model.
pub async fn next_question(
    llm: &dyn LanguageModel,
    history: &[Exchange],
    instructions: &str,
    goal: &str,
) -> Result<(String, bool), AppError> {
    match plan(history, instructions, goal) {
        NextStep::Greeting => Ok((GREETING.to_string(), false)),
        NextStep::Closing => Ok((CLOSING.to_string(), true)),
        NextStep::Ask(prompt) => Ok((llm.complete(&prompt).await?.trim().to_string(), false)),
    }
}

/// Speech and model side of a turn. Touches no storage.
pub struct Interviewer {
    clients: AiClients,
    audio_dir: PathBuf,
}

impl Interviewer {
    pub fn new(clients: AiClients, audio_dir: impl Into<PathBuf>) -> Self {
        Self { clients, audio_dir: audio_dir.into() }
    }

    async fn speak(&self, text: &str) -> Option<String> {
        let audio = match self.clients.tts.synthesize(text).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::warn!(error = %e, "speech synthesis failed");
                return None;
            }
        };
        match tokio::fs::write(self.audio_dir.join(AUDIO_FILE), audio).await {
            Ok(()) => Some(format!("/{AUDIO_FILE}")),
            Err(e) => {
                tracing::warn!(error = %e, "failed to write interview audio");
                None
            }
        }
    }

    /// Transcribes the answer into the history, then picks and voices the next question.
    /// A failed transcription ends the turn before the model is asked anything.
    pub async fn respond(
        &self,
        mut history: Vec<Exchange>,
        audio: Option<Vec<u8>>,
        instructions: &str,
        goal: &str,
    ) -> Result<InterviewTurn, AppError> {
        let transcript = match audio.filter(|bytes| !bytes.is_empty()) {
            Some(bytes) => Some(self.clients.stt.transcribe(bytes).await?),
            None => None,
        };
        if let Some(text) = transcript.as_deref().filter(|t| !t.trim().is_empty()) {
            record_answer(&mut history, text);
        }

        let (next_question, finished) = next_question(self.clients.llm.as_ref(), &history, instructions, goal).await?;
        let audio_path = self.speak(&next_question).await;
        Ok(InterviewTurn { transcript, next_question, audio_path, finished })
    }
}

pub struct InterviewService {
    roadmaps: Arc<RoadmapService>,
    interviewer: Interviewer,
}

impl InterviewService {
    pub fn new(roadmaps: Arc<RoadmapService>, clients: AiClients, audio_dir: impl Into<PathBuf>) -> Self {
        Self { roadmaps, interviewer: Interviewer::new(clients, audio_dir) }
    }

    pub async fn take_turn(
        &self,
        caller: &Claims,
        roadmap_id: ObjectId,
        slot: InterviewSlot,
        history: Vec<Exchange>,
        audio: Option<Vec<u8>>,
    ) -> Result<InterviewTurn, AppError> {
        caller.require_role(Role::Mentee)?;
        let (roadmap, theme) = self.roadmaps.interview_context(caller, roadmap_id, slot).await?;
        let turn = self.interviewer.respond(history, audio, &theme, &roadmap.goal).await?;

        if turn.finished {
            tracing::info!(roadmap = %roadmap_id, interview = slot.number(), "interview completed");
            self.roadmaps
                .notify_counterpart(
                    caller,
                    &roadmap,
                    NotificationKind::InterviewCompleted,
                    &format!("finished interview {}", slot.number()),
                )
                .await;
        }
        Ok(turn)
    }
}
