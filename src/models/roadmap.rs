use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::models::{dates, ids};

pub const QUESTIONS_PER_MODULE: usize = 5;

/// Stored roadmap, one per mentee. Legacy spellings (`menteeId`, hex-string ids)
/// are folded into this shape when the document is read.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Roadmap {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(alias = "menteeId", deserialize_with = "ids::object_id")]
    pub mentee_id: ObjectId,
    #[serde(default, alias = "mentorId", deserialize_with = "ids::optional_object_id")]
    pub mentor_id: Option<ObjectId>,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub status: RoadmapStatus,
    #[serde(rename = "durationWeeks", alias = "duration_weeks", default = "default_duration")]
    pub duration_weeks: i32,
    #[serde(rename = "approvalStatus", default)]
    pub approval_status: ApprovalStatus,
    #[serde(rename = "interviewTrigger", default)]
    pub interview_trigger: InterviewTrigger,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_theme_1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_theme_2: Option<String>,
    #[serde(default)]
    pub feedback: Feedback,
    /// Bumped on every write that rewrites modules; replacements are conditional on it.
    #[serde(default)]
    pub version: i64,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

fn default_duration() -> i32 {
    8
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, ToSchema)]
pub enum RoadmapStatus {
    #[default]
    #[serde(rename = "in-progress", alias = "active")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "cancelled")]
    Cancelled,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalState {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, ToSchema)]
pub struct ApprovalStatus {
    #[serde(rename = "mentorId", default, skip_serializing_if = "Option::is_none")]
    pub mentor_id: Option<String>,
    #[serde(default)]
    pub status: ApprovalState,
    #[serde(default)]
    pub comments: String,
}

/// Descriptive only; nothing schedules interviews from it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct InterviewTrigger {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "triggerPoint")]
    pub trigger_point: String,
}

impl Default for InterviewTrigger {
    fn default() -> Self {
        InterviewTrigger {
            kind: "progress_based".to_string(),
            trigger_point: "50%".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct Module {
    pub title: String,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub subtopics: Vec<Subtopic>,
    #[schema(value_type = Vec<Question>)]
    pub evaluation: Evaluation,
    #[serde(default)]
    pub assessment_scores: HashMap<String, i32>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, with = "dates::optional", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_id: Option<String>,
    #[serde(default)]
    pub interview_completed: bool,
    #[serde(default, with = "dates::optional", skip_serializing_if = "Option::is_none")]
    pub interview_completed_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct Subtopic {
    pub title: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Youtube,
    Coursera,
    Other,
}

impl ResourceType {
    /// Substring match on the URL, youtube before coursera.
    pub fn classify(url: &str) -> Self {
        if url.contains("youtube.com") {
            ResourceType::Youtube
        } else if url.contains("coursera.org") {
            ResourceType::Coursera
        } else {
            ResourceType::Other
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub completed: bool,
}

/// A module's assessment: always exactly five questions, in order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct Evaluation(pub [Question; QUESTIONS_PER_MODULE]);

impl Evaluation {
    pub fn questions(&self) -> &[Question] {
        &self.0
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct Question {
    pub question: String,
    #[serde(rename = "option A")]
    pub option_a: String,
    #[serde(rename = "option B")]
    pub option_b: String,
    #[serde(rename = "option C")]
    pub option_c: String,
    #[serde(rename = "option D")]
    pub option_d: String,
    #[serde(rename = "correct option")]
    #[schema(value_type = String)]
    pub correct_option: OptionLetter,
}

impl Question {
    pub fn options(&self) -> QuestionOptions {
        QuestionOptions {
            a: self.option_a.clone(),
            b: self.option_b.clone(),
            c: self.option_c.clone(),
            d: self.option_d.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ToSchema)]
pub enum OptionLetter {
    A,
    B,
    C,
    D,
}

impl FromStr for OptionLetter {
    type Err = String;

    /// Accepts `B`, `b`, `option B`, `B)` and similar spellings.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let lowered = trimmed.to_ascii_lowercase();
        let rest = lowered.strip_prefix("option").unwrap_or(&lowered).trim_start();
        let mut chars = rest.chars();
        let letter = chars.next();
        let tail_ok = chars.all(|c| matches!(c, ')' | '.' | ':' | ' '));
        match (letter, tail_ok) {
            (Some('a'), true) => Ok(OptionLetter::A),
            (Some('b'), true) => Ok(OptionLetter::B),
            (Some('c'), true) => Ok(OptionLetter::C),
            (Some('d'), true) => Ok(OptionLetter::D),
            _ => Err(format!("'{trimmed}' is not one of A, B, C, D")),
        }
    }
}

impl fmt::Display for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            OptionLetter::A => "A",
            OptionLetter::B => "B",
            OptionLetter::C => "C",
            OptionLetter::D => "D",
        };
        f.write_str(letter)
    }
}

impl Serialize for OptionLetter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OptionLetter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct QuestionOptions {
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
    #[serde(rename = "C")]
    pub c: String,
    #[serde(rename = "D")]
    pub d: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, ToSchema)]
pub struct Feedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentee_to_mentor: Option<FeedbackEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentor_to_mentee: Option<FeedbackEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_1: Option<FeedbackEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_2: Option<FeedbackEntry>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct FeedbackEntry {
    pub rating: i32,
    pub text: String,
    #[serde(with = "dates::required")]
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackDirection {
    MenteeToMentor,
    MentorToMentee,
    #[serde(rename = "interview_1")]
    Interview1,
    #[serde(rename = "interview_2")]
    Interview2,
}

impl FeedbackDirection {
    pub fn field(&self) -> &'static str {
        match self {
            FeedbackDirection::MenteeToMentor => "mentee_to_mentor",
            FeedbackDirection::MentorToMentee => "mentor_to_mentee",
            FeedbackDirection::Interview1 => "interview_1",
            FeedbackDirection::Interview2 => "interview_2",
        }
    }
}

/// Which of the two interview slots a request targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterviewSlot {
    First,
    Second,
}

impl InterviewSlot {
    pub fn from_number(n: i64) -> Result<Self, AppError> {
        match n {
            1 => Ok(InterviewSlot::First),
            2 => Ok(InterviewSlot::Second),
            _ => Err(AppError::BadRequest("interview_num must be 1 or 2".to_string())),
        }
    }

    pub fn theme_field(&self) -> &'static str {
        match self {
            InterviewSlot::First => "interview_theme_1",
            InterviewSlot::Second => "interview_theme_2",
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            InterviewSlot::First => 1,
            InterviewSlot::Second => 2,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, ToSchema)]
pub struct Progress {
    pub completed_resources: usize,
    pub total_resources: usize,
    pub percent: u32,
}

impl Progress {
    pub fn from_counts(completed: usize, total: usize) -> Self {
        let percent = if total == 0 { 0 } else { (completed * 100 / total) as u32 };
        Progress { completed_resources: completed, total_resources: total, percent }
    }
}

/// The part of a roadmap the language model is allowed to rewrite.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RoadmapDraft {
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub status: RoadmapStatus,
    #[serde(rename = "durationWeeks", alias = "duration_weeks", default = "default_duration")]
    pub duration_weeks: i32,
    #[serde(rename = "approvalStatus", default)]
    pub approval_status: ApprovalStatus,
    #[serde(rename = "interviewTrigger", default)]
    pub interview_trigger: InterviewTrigger,
    pub modules: Vec<Module>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_theme_1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_theme_2: Option<String>,
    #[serde(default)]
    pub feedback: Feedback,
}

impl Roadmap {
    pub fn new(
        mentee_id: ObjectId,
        mentor_id: Option<ObjectId>,
        goal: String,
        modules: Vec<Module>,
        now: DateTime<Utc>,
    ) -> Self {
        Roadmap {
            id: None,
            mentee_id,
            mentor_id,
            goal,
            status: RoadmapStatus::InProgress,
            duration_weeks: default_duration(),
            approval_status: ApprovalStatus {
                mentor_id: mentor_id.map(|oid| oid.to_hex()),
                status: ApprovalState::Pending,
                comments: String::new(),
            },
            interview_trigger: InterviewTrigger::default(),
            modules,
            interview_theme_1: None,
            interview_theme_2: None,
            feedback: Feedback::default(),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_participant(&self, user_id: &ObjectId) -> bool {
        &self.mentee_id == user_id || self.mentor_id.as_ref() == Some(user_id)
    }

    pub fn module(&self, index: usize) -> Result<&Module, AppError> {
        self.modules
            .get(index)
            .ok_or_else(|| AppError::NotFound("Module not found".to_string()))
    }

    pub fn module_mut(&mut self, index: usize) -> Result<&mut Module, AppError> {
        self.modules
            .get_mut(index)
            .ok_or_else(|| AppError::NotFound("Module not found".to_string()))
    }

    pub fn theme(&self, slot: InterviewSlot) -> Option<&str> {
        match slot {
            InterviewSlot::First => self.interview_theme_1.as_deref(),
            InterviewSlot::Second => self.interview_theme_2.as_deref(),
        }
    }

    /// Completed vs total resources across every module; derived on read, never stored.
    pub fn progress(&self) -> Progress {
        let (completed, total) = self
            .modules
            .iter()
            .flat_map(|m| m.subtopics.iter())
            .flat_map(|s| s.resources.iter())
            .fold((0, 0), |(done, all), r| (done + usize::from(r.completed), all + 1));
        Progress::from_counts(completed, total)
    }

    pub fn draft(&self) -> RoadmapDraft {
        RoadmapDraft {
            goal: self.goal.clone(),
            status: self.status,
            duration_weeks: self.duration_weeks,
            approval_status: self.approval_status.clone(),
            interview_trigger: self.interview_trigger.clone(),
            modules: self.modules.clone(),
            interview_theme_1: self.interview_theme_1.clone(),
            interview_theme_2: self.interview_theme_2.clone(),
            feedback: self.feedback.clone(),
        }
    }

    /// Builds the replacement document for a revision: content from the draft,
    /// identity and `created_at` from `self`, a fresh `updated_at` and the next version.
    pub fn revised(&self, draft: RoadmapDraft, now: DateTime<Utc>) -> Roadmap {
        let mut approval_status = draft.approval_status;
        approval_status.mentor_id = self.approval_status.mentor_id.clone();

        // Best scores never go down, even if the model rewrote or dropped them.
        let mut modules = draft.modules;
        for module in &mut modules {
            if let Some(old) = self.modules.iter().find(|m| m.title == module.title) {
                for (user, score) in &old.assessment_scores {
                    let best = module.assessment_scores.entry(user.clone()).or_insert(*score);
                    *best = (*best).max(*score);
                }
            }
        }

        Roadmap {
            id: self.id,
            mentee_id: self.mentee_id,
            mentor_id: self.mentor_id,
            goal: draft.goal,
            status: draft.status,
            duration_weeks: draft.duration_weeks,
            approval_status,
            interview_trigger: draft.interview_trigger,
            modules,
            interview_theme_1: draft.interview_theme_1,
            interview_theme_2: draft.interview_theme_2,
            feedback: draft.feedback,
            version: self.version + 1,
            created_at: self.created_at,
            updated_at: now.max(self.updated_at + chrono::Duration::milliseconds(1)),
        }
    }
}

impl Module {
    pub fn new(title: String, objective: String, subtopics: Vec<Subtopic>, evaluation: Evaluation) -> Self {
        Module {
            title,
            objective,
            subtopics,
            evaluation,
            assessment_scores: HashMap::new(),
            completed: false,
            completed_at: None,
            interview_id: None,
            interview_completed: false,
            interview_completed_at: None,
        }
    }

    /// Flips one resource; returns its new state.
    pub fn toggle_resource(&mut self, subtopic: usize, resource: usize) -> Result<bool, AppError> {
        let target = self
            .subtopics
            .get_mut(subtopic)
            .and_then(|s| s.resources.get_mut(resource))
            .ok_or_else(|| AppError::NotFound("Resource not found".to_string()))?;
        target.completed = !target.completed;
        Ok(target.completed)
    }

    /// Marks every resource of the named subtopics complete. Returns whether anything changed.
    pub fn complete_subtopics(&mut self, titles: &[String]) -> bool {
        let mut updated = false;
        for subtopic in self.subtopics.iter_mut().filter(|s| titles.contains(&s.title)) {
            for resource in subtopic.resources.iter_mut().filter(|r| !r.completed) {
                resource.completed = true;
                updated = true;
            }
        }
        updated
    }

    /// Marks the named resources complete. Returns whether anything changed.
    pub fn complete_resources(&mut self, titles: &[String]) -> bool {
        let mut updated = false;
        for resource in self
            .subtopics
            .iter_mut()
            .flat_map(|s| s.resources.iter_mut())
            .filter(|r| !r.completed && titles.contains(&r.title))
        {
            resource.completed = true;
            updated = true;
        }
        updated
    }

    pub fn mark_completed(&mut self, now: DateTime<Utc>) -> bool {
        if self.completed {
            return false;
        }
        self.completed = true;
        self.completed_at = Some(now);
        true
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AssessmentQuestion {
    pub number: usize,
    pub question: String,
    pub options: QuestionOptions,
    /// Present only for mentors.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub correct_option: Option<OptionLetter>,
}

impl AssessmentQuestion {
    pub fn list(evaluation: &Evaluation, with_answers: bool) -> Vec<AssessmentQuestion> {
        evaluation
            .questions()
            .iter()
            .enumerate()
            .map(|(i, q)| AssessmentQuestion {
                number: i + 1,
                question: q.question.clone(),
                options: q.options(),
                correct_option: with_answers.then_some(q.correct_option),
            })
            .collect()
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct FeedbackEntryResponse {
    pub rating: i32,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl From<FeedbackEntry> for FeedbackEntryResponse {
    fn from(entry: FeedbackEntry) -> Self {
        FeedbackEntryResponse { rating: entry.rating, text: entry.text, created_at: entry.created_at }
    }
}

#[derive(Serialize, ToSchema, Default)]
pub struct FeedbackResponse {
    pub mentee_to_mentor: Option<FeedbackEntryResponse>,
    pub mentor_to_mentee: Option<FeedbackEntryResponse>,
    pub interview_1: Option<FeedbackEntryResponse>,
    pub interview_2: Option<FeedbackEntryResponse>,
}

impl From<Feedback> for FeedbackResponse {
    fn from(feedback: Feedback) -> Self {
        FeedbackResponse {
            mentee_to_mentor: feedback.mentee_to_mentor.map(Into::into),
            mentor_to_mentee: feedback.mentor_to_mentee.map(Into::into),
            interview_1: feedback.interview_1.map(Into::into),
            interview_2: feedback.interview_2.map(Into::into),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ModuleResponse {
    pub index: usize,
    pub title: String,
    pub objective: String,
    pub subtopics: Vec<Subtopic>,
    pub assessment: Vec<AssessmentQuestion>,
    pub best_score: Option<i32>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct RoadmapResponse {
    pub id: String,
    pub mentee_id: String,
    pub mentor_id: Option<String>,
    pub goal: String,
    pub status: RoadmapStatus,
    pub duration_weeks: i32,
    pub approval_status: ApprovalStatus,
    pub interview_trigger: InterviewTrigger,
    pub modules: Vec<ModuleResponse>,
    pub interview_theme_1: Option<String>,
    pub interview_theme_2: Option<String>,
    pub feedback: FeedbackResponse,
    pub progress: Progress,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoadmapResponse {
    /// Best scores shown are the mentee's; answer keys only reach mentors.
    pub fn build(roadmap: Roadmap, with_answers: bool) -> Self {
        let progress = roadmap.progress();
        let mentee = roadmap.mentee_id.to_hex();
        let modules = roadmap
            .modules
            .into_iter()
            .enumerate()
            .map(|(index, m)| ModuleResponse {
                index,
                assessment: AssessmentQuestion::list(&m.evaluation, with_answers),
                best_score: m.assessment_scores.get(&mentee).copied(),
                title: m.title,
                objective: m.objective,
                subtopics: m.subtopics,
                completed: m.completed,
                completed_at: m.completed_at,
            })
            .collect();
        RoadmapResponse {
            id: roadmap.id.map(|oid| oid.to_hex()).unwrap_or_default(),
            mentee_id: roadmap.mentee_id.to_hex(),
            mentor_id: roadmap.mentor_id.map(|oid| oid.to_hex()),
            goal: roadmap.goal,
            status: roadmap.status,
            duration_weeks: roadmap.duration_weeks,
            approval_status: roadmap.approval_status,
            interview_trigger: roadmap.interview_trigger,
            modules,
            interview_theme_1: roadmap.interview_theme_1,
            interview_theme_2: roadmap.interview_theme_2,
            feedback: roadmap.feedback.into(),
            progress,
            version: roadmap.version,
            created_at: roadmap.created_at,
            updated_at: roadmap.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(n: usize) -> Question {
        Question {
            question: format!("Question {n}?"),
            option_a: "a".to_string(),
            option_b: "b".to_string(),
            option_c: "c".to_string(),
            option_d: "d".to_string(),
            correct_option: OptionLetter::B,
        }
    }

    fn evaluation() -> Evaluation {
        Evaluation([question(1), question(2), question(3), question(4), question(5)])
    }

    fn resource(title: &str, completed: bool) -> Resource {
        Resource {
            kind: ResourceType::Other,
            title: title.to_string(),
            url: format!("https://example.org/{title}"),
            completed,
        }
    }

    fn module(title: &str, resources: Vec<Resource>) -> Module {
        let subtopics = vec![Subtopic { title: format!("{title} basics"), resources }];
        Module::new(title.to_string(), String::new(), subtopics, evaluation())
    }

    fn roadmap(modules: Vec<Module>) -> Roadmap {
        Roadmap::new(ObjectId::new(), Some(ObjectId::new()), "Learn Rust".to_string(), modules, Utc::now())
    }

    #[test]
    fn progress_is_floored_and_zero_without_resources() {
        assert_eq!(roadmap(vec![]).progress().percent, 0);

        let r = roadmap(vec![module(
            "Ownership",
            vec![resource("one", true), resource("two", false), resource("three", false)],
        )]);
        let progress = r.progress();
        assert_eq!(progress.completed_resources, 1);
        assert_eq!(progress.total_resources, 3);
        assert_eq!(progress.percent, 33);
    }

    #[test]
    fn classify_prefers_youtube() {
        assert_eq!(ResourceType::classify("https://www.youtube.com/watch?v=x"), ResourceType::Youtube);
        assert_eq!(ResourceType::classify("https://www.coursera.org/learn/rust"), ResourceType::Coursera);
        assert_eq!(
            ResourceType::classify("https://www.youtube.com/redirect?q=coursera.org"),
            ResourceType::Youtube
        );
        assert_eq!(ResourceType::classify("https://doc.rust-lang.org/book"), ResourceType::Other);
    }

    #[test]
    fn option_letters_parse_loosely() {
        assert_eq!("B".parse::<OptionLetter>(), Ok(OptionLetter::B));
        assert_eq!(" option c ".parse::<OptionLetter>(), Ok(OptionLetter::C));
        assert_eq!("d)".parse::<OptionLetter>(), Ok(OptionLetter::D));
        assert!("E".parse::<OptionLetter>().is_err());
        assert!("".parse::<OptionLetter>().is_err());
        assert!("banana".parse::<OptionLetter>().is_err());
    }

    #[test]
    fn evaluation_needs_exactly_five_questions() {
        let five = serde_json::to_value(evaluation()).unwrap();
        assert!(serde_json::from_value::<Evaluation>(five.clone()).is_ok());

        let mut four = five;
        four.as_array_mut().unwrap().pop();
        assert!(serde_json::from_value::<Evaluation>(four).is_err());
    }

    #[test]
    fn toggle_flips_and_rejects_bad_indices() {
        let mut m = module("Traits", vec![resource("one", false)]);
        assert!(m.toggle_resource(0, 0).unwrap());
        assert!(!m.toggle_resource(0, 0).unwrap());
        assert!(matches!(m.toggle_resource(0, 1), Err(AppError::NotFound(_))));
        assert!(matches!(m.toggle_resource(3, 0), Err(AppError::NotFound(_))));
    }

    #[test]
    fn completing_twice_changes_nothing() {
        let mut m = module("Traits", vec![resource("one", false), resource("two", false)]);
        let titles = vec!["Traits basics".to_string()];
        assert!(m.complete_subtopics(&titles));
        assert!(!m.complete_subtopics(&titles));

        let mut m = module("Lifetimes", vec![resource("one", false), resource("two", false)]);
        assert!(m.complete_resources(&["two".to_string()]));
        assert!(!m.complete_resources(&["two".to_string(), "missing".to_string()]));
        assert!(!m.subtopics[0].resources[0].completed);
    }

    #[test]
    fn revision_keeps_identity_and_moves_time_forward() {
        let mut original = roadmap(vec![module("Ownership", vec![])]);
        original.id = Some(ObjectId::new());
        original.modules[0].assessment_scores.insert(original.mentee_id.to_hex(), 90);

        let mut draft = original.draft();
        draft.goal = "Learn async Rust".to_string();
        draft.modules[0].assessment_scores.insert(original.mentee_id.to_hex(), 40);
        draft.modules.push(module("Async", vec![]));

        let revised = original.revised(draft, original.updated_at);
        assert_eq!(revised.id, original.id);
        assert_eq!(revised.mentee_id, original.mentee_id);
        assert_eq!(revised.created_at, original.created_at);
        assert!(revised.updated_at > original.updated_at);
        assert_eq!(revised.version, original.version + 1);
        assert_eq!(revised.goal, "Learn async Rust");
        assert_eq!(revised.modules.len(), 2);
        assert_eq!(revised.modules[0].assessment_scores[&original.mentee_id.to_hex()], 90);
    }

    #[test]
    fn legacy_documents_read_into_current_shape() {
        let mentee = ObjectId::new();
        let raw = bson::doc! {
            "menteeId": mentee.to_hex(),
            "goal": "Learn Go",
            "status": "active",
            "modules": [],
            "created_at": bson::DateTime::now(),
            "updated_at": bson::DateTime::now(),
        };
        let r: Roadmap = bson::from_document(raw).unwrap();
        assert_eq!(r.mentee_id, mentee);
        assert_eq!(r.status, RoadmapStatus::InProgress);
        assert_eq!(r.version, 0);
        assert_eq!(r.duration_weeks, 8);
    }

    #[test]
    fn completion_times_are_stored_as_datetimes() {
        let mut r = roadmap(vec![module("Ownership", vec![])]);
        r.modules[0].mark_completed(Utc::now());
        let stored = bson::to_document(&r).unwrap();
        let module = stored.get_array("modules").unwrap()[0].as_document().unwrap();
        assert!(matches!(module.get("completed_at"), Some(bson::Bson::DateTime(_))));
        assert!(!module.contains_key("interview_completed_at"));
    }

    #[test]
    fn answer_keys_only_with_answers() {
        let mut r = roadmap(vec![module("Ownership", vec![])]);
        r.modules[0].assessment_scores.insert(r.mentee_id.to_hex(), 60);
        r.modules[0].assessment_scores.insert(ObjectId::new().to_hex(), 100);

        let hidden = RoadmapResponse::build(r.clone(), false);
        assert!(hidden.modules[0].assessment.iter().all(|q| q.correct_option.is_none()));
        assert_eq!(hidden.modules[0].best_score, Some(60));

        let shown = RoadmapResponse::build(r, true);
        assert_eq!(shown.modules[0].assessment[0].correct_option, Some(OptionLetter::B));
    }
}
