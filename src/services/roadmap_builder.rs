use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::AppError;
use crate::models::roadmap::{Evaluation, Module, Question, Roadmap, RoadmapDraft, Subtopic, QUESTIONS_PER_MODULE};
use crate::services::llm::LanguageModel;
use crate::services::llm_json::{self, Shape};
use crate::services::search::{find_resources, WebSearch};
use crate::services::AiClients;

/// Module skeleton as the model proposes it, before resources and questions are attached.
#[derive(Debug, Deserialize)]
pub struct ModuleOutline {
    pub title: String,
    #[serde(default)]
    pub objective: String,
    pub subtopics: Vec<SubtopicName>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SubtopicName {
    Plain(String),
    Titled { title: String },
}

impl SubtopicName {
    pub fn into_title(self) -> String {
        match self {
            SubtopicName::Plain(title) | SubtopicName::Titled { title } => title,
        }
    }
}

pub fn module_prompt(goal: &str) -> String {
    format!(
        r#"Break down the topic '{goal}' into 6-8 modules. Each module should contain:
- "title": Title of the module
- "objective": A short objective
- "subtopics": A list of 3-5 fine-grained subtopics (e.g., concepts or tasks)

Respond ONLY with a valid JSON list:
[
  {{
    "title": "<module title>",
    "objective": "<brief objective>",
    "subtopics": ["<subtopic1>", "<subtopic2>", ...]
  }}
]"#
    )
}

pub fn evaluation_prompt(subtopics: &[String]) -> String {
    let subtopic_list = subtopics.join(", ");
    format!(
        r#"You're an educational AI assistant. Create 5 multiple-choice questions to evaluate understanding of the following subtopics: {subtopic_list}. Ensure that you have both medium and hard questions.
Format your response as valid JSON:

{{
  "question1": {{
    "question": "...",
    "option A": "...",
    "option B": "...",
    "option C": "...",
    "option D": "...",
    "correct option": "A/B/C/D"
  }},
  "question2": {{ ... }},
  "question3": {{ ... }},
  "question4": {{ ... }},
  "question5": {{ ... }}
}}"#
    )
}

pub fn revision_prompt(roadmap_json: &str, instruction: &str) -> String {
    format!(
        "You are an educational AI assistant. Follow the instructions given and modify the roadmap given below accordingly.\n\
         Respond ONLY with a valid JSON object of the roadmap in the exact same format as it was given.\n\n\
         Instructions: {instruction}\n\
         Roadmap: {roadmap_json}"
    )
}

/// Orders the `questionN` entries by key and requires exactly five of them.
pub fn parse_evaluation(reply: &str) -> Result<Evaluation, AppError> {
    let keyed: BTreeMap<String, Question> = llm_json::parse(reply, Shape::Object)?;
    let questions: Vec<Question> = keyed.into_values().collect();
    let count = questions.len();
    <[Question; QUESTIONS_PER_MODULE]>::try_from(questions)
        .map(Evaluation)
        .map_err(|_| {
            AppError::ModelOutput(format!(
                "expected {QUESTIONS_PER_MODULE} assessment questions, got {count}"
            ))
        })
}

pub struct RoadmapBuilder {
    llm: Arc<dyn LanguageModel>,
    search: Arc<dyn WebSearch>,
}

impl RoadmapBuilder {
    pub fn new(clients: &AiClients) -> Self {
        Self { llm: clients.llm.clone(), search: clients.search.clone() }
    }

    pub async fn outline(&self, goal: &str) -> Result<Vec<ModuleOutline>, AppError> {
        let reply = self.llm.complete(&module_prompt(goal)).await?;
        let outline: Vec<ModuleOutline> = llm_json::parse(&reply, Shape::List)?;
        if outline.is_empty() {
            return Err(AppError::ModelOutput("model proposed no modules".to_string()));
        }
        Ok(outline)
    }

    pub async fn evaluation(&self, subtopics: &[String]) -> Result<Evaluation, AppError> {
        let reply = self.llm.complete(&evaluation_prompt(subtopics)).await?;
        parse_evaluation(&reply)
    }

    /// Goal text (or a whole conversation) in, fully enriched modules out. Calls are
    /// serial: one search per subtopic, one assessment per module.
    pub async fn synthesize(&self, goal: &str) -> Result<Vec<Module>, AppError> {
        let outline = self.outline(goal).await?;
        let mut modules = Vec::with_capacity(outline.len());

        for entry in outline {
            let titles: Vec<String> = entry.subtopics.into_iter().map(SubtopicName::into_title).collect();

            let mut subtopics = Vec::with_capacity(titles.len());
            for title in &titles {
                let resources = find_resources(self.search.as_ref(), title, goal).await?;
                subtopics.push(Subtopic { title: title.clone(), resources });
            }

            let evaluation = self.evaluation(&titles).await?;
            modules.push(Module::new(entry.title, entry.objective, subtopics, evaluation));
        }

        tracing::info!(modules = modules.len(), "roadmap synthesized");
        Ok(modules)
    }

    /// Asks the model to rewrite the roadmap content. Identity fields never leave the
    /// server, so the caller re-attaches them.
    pub async fn revise(&self, roadmap: &Roadmap, instruction: &str) -> Result<RoadmapDraft, AppError> {
        let current = serde_json::to_string_pretty(&roadmap.draft())
            .map_err(|e| AppError::Internal(format!("failed to encode roadmap: {e}")))?;
        let reply = self.llm.complete(&revision_prompt(&current, instruction)).await?;
        let draft: RoadmapDraft = llm_json::parse(&reply, Shape::Object)?;
        if draft.modules.is_empty() {
            return Err(AppError::ModelOutput("revised roadmap has no modules".to_string()));
        }
        Ok(draft)
    }
}
