use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::models::roadmap::{AssessmentQuestion, Evaluation, OptionLetter, QUESTIONS_PER_MODULE};
use crate::models::user::Role;
use crate::services::roadmap_service::RoadmapService;
use crate::utils::Claims;

pub const PASS_MARK: i32 = 80;

#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq)]
pub struct Grade {
    pub score: i32,
    pub correct_count: usize,
    pub total_questions: usize,
    pub passed: bool,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct SubmissionResult {
    pub score: i32,
    pub best_score: i32,
    pub passed: bool,
    pub correct_count: usize,
    pub total_questions: usize,
}

#[derive(Serialize, ToSchema)]
pub struct AssessmentView {
    pub module_index: usize,
    pub module_title: String,
    pub questions: Vec<AssessmentQuestion>,
    pub best_score: Option<i32>,
}

/// Compares answers with the key in question order. The answer count must match exactly;
/// an answer that is not a recognizable letter counts as wrong.
pub fn grade(evaluation: &Evaluation, answers: &[String]) -> Result<Grade, AppError> {
    let questions = evaluation.questions();
    if answers.len() != questions.len() {
        return Err(AppError::BadRequest(format!(
            "Expected {} answers, got {}",
            QUESTIONS_PER_MODULE,
            answers.len()
        )));
    }

    let correct_count = questions
        .iter()
        .zip(answers)
        .filter(|(q, a)| a.parse::<OptionLetter>().ok() == Some(q.correct_option))
        .count();
    let total = questions.len();
    // Integer round-half-up of 100 * correct / total.
    let score = ((200 * correct_count + total) / (2 * total)) as i32;

    Ok(Grade { score, correct_count, total_questions: total, passed: score >= PASS_MARK })
}

pub struct AssessmentService {
    roadmaps: Arc<RoadmapService>,
}

impl AssessmentService {
    pub fn new(roadmaps: Arc<RoadmapService>) -> Self {
        Self { roadmaps }
    }

    /// Mentors get the answer key; mentees never do.
    pub async fn get_assessment(&self, caller: &Claims, id: ObjectId, index: usize) -> Result<AssessmentView, AppError> {
        let roadmap = self.roadmaps.get_for(caller, id).await?;
        let module = roadmap.module(index)?;
        Ok(AssessmentView {
            module_index: index,
            module_title: module.title.clone(),
            questions: AssessmentQuestion::list(&module.evaluation, caller.role == Role::Mentor),
            best_score: module.assessment_scores.get(&caller.user_id).copied(),
        })
    }

    pub async fn submit(&self, caller: &Claims, id: ObjectId, index: usize, answers: &[String]) -> Result<SubmissionResult, AppError> {
        caller.require_role(Role::Mentee)?;
        let roadmap = self.roadmaps.get_for(caller, id).await?;
        let grade = grade(&roadmap.module(index)?.evaluation, answers)?;
        let best_score = self
            .roadmaps
            .record_best_score(id, index, &caller.user_id, grade.score)
            .await?;

        tracing::info!(roadmap = %id, module = index, score = grade.score, best_score, "assessment submitted");
        Ok(SubmissionResult {
            score: grade.score,
            best_score,
            passed: grade.passed,
            correct_count: grade.correct_count,
            total_questions: grade.total_questions,
        })
    }
}
