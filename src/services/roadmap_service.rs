use bson::{doc, oid::ObjectId, Document};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{options::ReturnDocument, Collection, Database};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::models::notification::{Notification, NotificationKind};
use crate::models::roadmap::{
    ApprovalState, FeedbackDirection, FeedbackEntry, InterviewSlot, Module, Progress, Roadmap, RoadmapStatus,
};
use crate::models::user::{Role, User};
use crate::services::notification_service::NotificationService;
use crate::services::roadmap_builder::RoadmapBuilder;
use crate::services::user_service::UserService;
use crate::utils::Claims;

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct GenerateOutcome {
    pub message: String,
    pub roadmap_id: String,
    pub created: bool,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ProgressUpdate {
    pub updated: bool,
    pub progress: Progress,
}

/// Filter for a conditional write against the version the caller read. Documents
/// written before versioning existed have no `version` field and count as 0.
pub fn version_filter(id: ObjectId, version: i64) -> Document {
    if version == 0 {
        doc! { "_id": id, "$or": [ { "version": 0_i64 }, { "version": { "$exists": false } } ] }
    } else {
        doc! { "_id": id, "version": version }
    }
}

/// Every partial write bumps the version, so a versioned replace that read before it
/// fails instead of overwriting it.
fn versioned_set(mut fields: Document) -> Document {
    fields.insert("updated_at", bson::DateTime::now());
    doc! { "$set": fields, "$inc": { "version": 1_i64 } }
}

/// Progress fields of one module. Assessment scores are left to `best_score_update`.
pub fn module_progress_update(index: usize, module: &Module) -> Result<Document, AppError> {
    let completed_at = module.completed_at.map(bson::DateTime::from_chrono);
    Ok(versioned_set(doc! {
        format!("modules.{index}.subtopics"): bson::to_bson(&module.subtopics)?,
        format!("modules.{index}.completed"): module.completed,
        format!("modules.{index}.completed_at"): completed_at,
    }))
}

pub fn best_score_update(index: usize, user_id: &str, score: i32) -> Document {
    doc! {
        "$max": { format!("modules.{index}.assessment_scores.{user_id}"): score },
        "$inc": { "version": 1_i64 },
    }
}

pub struct RoadmapService {
    collection: Collection<Roadmap>,
    users: Arc<UserService>,
    notifications: Arc<NotificationService>,
    builder: RoadmapBuilder,
}

impl RoadmapService {
    pub fn new(
        db: Arc<Database>,
        users: Arc<UserService>,
        notifications: Arc<NotificationService>,
        builder: RoadmapBuilder,
    ) -> Self {
        Self { collection: db.collection("roadmaps"), users, notifications, builder }
    }

    pub async fn get(&self, id: ObjectId) -> Result<Roadmap, AppError> {
        self.collection
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| AppError::NotFound("Roadmap not found".to_string()))
    }

    /// Mentee owner, the assigned mentor, or any mentor linked to the mentee.
    pub async fn authorize(&self, caller: &Claims, roadmap: &Roadmap) -> Result<(), AppError> {
        let caller_id = caller.object_id()?;
        if roadmap.is_participant(&caller_id) {
            return Ok(());
        }
        if caller.role == Role::Mentor && self.users.is_linked(caller_id, roadmap.mentee_id).await? {
            return Ok(());
        }
        Err(AppError::Forbidden("You do not have access to this roadmap".to_string()))
    }

    pub async fn get_for(&self, caller: &Claims, id: ObjectId) -> Result<Roadmap, AppError> {
        let roadmap = self.get(id).await?;
        self.authorize(caller, &roadmap).await?;
        Ok(roadmap)
    }

    async fn get_owned(&self, caller: &Claims, id: ObjectId) -> Result<Roadmap, AppError> {
        caller.require_role(Role::Mentee)?;
        let roadmap = self.get(id).await?;
        if roadmap.mentee_id != caller.object_id()? {
            return Err(AppError::Forbidden("Only the roadmap owner can do this".to_string()));
        }
        Ok(roadmap)
    }

    async fn get_mentored(&self, caller: &Claims, id: ObjectId) -> Result<Roadmap, AppError> {
        caller.require_role(Role::Mentor)?;
        self.get_for(caller, id).await
    }

    pub async fn list_for(&self, caller: &Claims) -> Result<Vec<Roadmap>, AppError> {
        let caller_id = caller.object_id()?;
        let filter = match caller.role {
            Role::Mentee => doc! { "mentee_id": caller_id },
            Role::Mentor => {
                let mentor = self.users.get_user(caller_id).await?;
                doc! { "$or": [ { "mentor_id": caller_id }, { "mentee_id": { "$in": mentor.mentees } } ] }
            }
        };
        let cursor = self.collection.find(filter).sort(doc! { "created_at": -1 }).await?;
        Ok(cursor.try_collect().await?)
    }

    /// First call for a mentee synthesizes and stores a roadmap; later calls revise it,
    /// using the conversation as the edit instruction.
    pub async fn generate(&self, caller: &Claims, mentee_id: ObjectId, conversation: &str) -> Result<GenerateOutcome, AppError> {
        if conversation.trim().is_empty() {
            return Err(AppError::BadRequest("conversation is required".to_string()));
        }
        let caller_id = caller.object_id()?;
        let mentee = self.users.get_with_role(mentee_id, Role::Mentee).await?;
        let allowed = caller_id == mentee_id || (caller.role == Role::Mentor && mentee.mentors.contains(&caller_id));
        if !allowed {
            return Err(AppError::Forbidden("Only the mentee or their mentor can build this roadmap".to_string()));
        }

        let existing = match mentee.roadmap_id {
            Some(id) => self.collection.find_one(doc! { "_id": id }).await?,
            None => None,
        };

        match existing {
            Some(roadmap) => {
                let revised = self.revise(roadmap, conversation).await?;
                let roadmap_id = revised.id.map(|oid| oid.to_hex()).unwrap_or_default();
                self.notify_counterpart(caller, &revised, NotificationKind::RoadmapUpdated, "updated the roadmap")
                    .await;
                Ok(GenerateOutcome { message: "Roadmap updated".to_string(), roadmap_id, created: false })
            }
            None => {
                let created = self.create(caller, &mentee, conversation).await?;
                let roadmap_id = created.id.map(|oid| oid.to_hex()).unwrap_or_default();
                self.notify_counterpart(caller, &created, NotificationKind::RoadmapCreated, "created a roadmap")
                    .await;
                Ok(GenerateOutcome { message: "Roadmap created".to_string(), roadmap_id, created: true })
            }
        }
    }

    async fn create(&self, caller: &Claims, mentee: &User, goal: &str) -> Result<Roadmap, AppError> {
        let mentee_id = mentee.id.ok_or_else(|| AppError::Internal("mentee without id".to_string()))?;
        let mentor_id = match caller.role {
            Role::Mentor => Some(caller.object_id()?),
            Role::Mentee => mentee.mentors.first().copied(),
        };

        let modules = self.builder.synthesize(goal).await?;
        let mut roadmap = Roadmap::new(mentee_id, mentor_id, goal.trim().to_string(), modules, Utc::now());
        let result = self.collection.insert_one(&roadmap).await?;
        let id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::Internal("roadmap insert returned no id".to_string()))?;
        roadmap.id = Some(id);

        self.users.set_roadmap_id(mentee_id, id).await?;
        tracing::info!(roadmap = %id, mentee = %mentee_id, modules = roadmap.modules.len(), "roadmap created");
        Ok(roadmap)
    }

    /// Full-document replacement guarded by the version that was read.
    pub async fn revise(&self, current: Roadmap, instruction: &str) -> Result<Roadmap, AppError> {
        let id = current.id.ok_or_else(|| AppError::Internal("roadmap without id".to_string()))?;
        let draft = self.builder.revise(&current, instruction).await?;
        let replacement = current.revised(draft, Utc::now());

        let result = self
            .collection
            .replace_one(version_filter(id, current.version), &replacement)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::Conflict("Roadmap was modified concurrently; reload and retry".to_string()));
        }
        tracing::info!(roadmap = %id, version = replacement.version, "roadmap revised");
        Ok(replacement)
    }

    pub async fn set_status(&self, caller: &Claims, id: ObjectId, status: RoadmapStatus) -> Result<Roadmap, AppError> {
        let roadmap = self.get_mentored(caller, id).await?;
        let status_bson = bson::to_bson(&status)?;
        self.collection
            .update_one(doc! { "_id": id }, versioned_set(doc! { "status": status_bson }))
            .await?;
        Ok(Roadmap { status, version: roadmap.version + 1, ..roadmap })
    }

    pub async fn set_approval(
        &self,
        caller: &Claims,
        id: ObjectId,
        state: ApprovalState,
        comments: String,
    ) -> Result<Roadmap, AppError> {
        let mut roadmap = self.get_mentored(caller, id).await?;
        roadmap.approval_status.mentor_id = Some(caller.user_id.clone());
        roadmap.approval_status.status = state;
        roadmap.approval_status.comments = comments;

        let approval = bson::to_bson(&roadmap.approval_status)?;
        self.collection
            .update_one(doc! { "_id": id }, versioned_set(doc! { "approvalStatus": approval }))
            .await?;
        roadmap.version += 1;
        Ok(roadmap)
    }

    /// Applies `change` to one module and persists its progress fields, conditional on the
    /// version read. `change` reports whether anything actually changed.
    async fn update_module<F>(&self, caller: &Claims, id: ObjectId, index: usize, change: F) -> Result<(Roadmap, bool), AppError>
    where
        F: FnOnce(&mut Module) -> Result<bool, AppError>,
    {
        let mut roadmap = self.get_owned(caller, id).await?;
        let updated = change(roadmap.module_mut(index)?)?;
        if !updated {
            return Ok((roadmap, false));
        }

        let update = module_progress_update(index, roadmap.module(index)?)?;
        let result = self
            .collection
            .update_one(version_filter(id, roadmap.version), update)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::Conflict("Roadmap was modified concurrently; reload and retry".to_string()));
        }
        roadmap.version += 1;
        Ok((roadmap, true))
    }

    pub async fn toggle_resource(
        &self,
        caller: &Claims,
        id: ObjectId,
        index: usize,
        subtopic: usize,
        resource: usize,
    ) -> Result<ProgressUpdate, AppError> {
        let (roadmap, updated) = self
            .update_module(caller, id, index, |m| m.toggle_resource(subtopic, resource).map(|_| true))
            .await?;
        Ok(ProgressUpdate { updated, progress: roadmap.progress() })
    }

    pub async fn complete_subtopics(&self, caller: &Claims, id: ObjectId, index: usize, titles: Vec<String>) -> Result<ProgressUpdate, AppError> {
        if titles.is_empty() {
            return Err(AppError::BadRequest("completed_subtopics must not be empty".to_string()));
        }
        let (roadmap, updated) = self
            .update_module(caller, id, index, |m| Ok(m.complete_subtopics(&titles)))
            .await?;
        Ok(ProgressUpdate { updated, progress: roadmap.progress() })
    }

    pub async fn complete_resources(&self, caller: &Claims, id: ObjectId, index: usize, titles: Vec<String>) -> Result<ProgressUpdate, AppError> {
        if titles.is_empty() {
            return Err(AppError::BadRequest("completed_resources must not be empty".to_string()));
        }
        let (roadmap, updated) = self
            .update_module(caller, id, index, |m| Ok(m.complete_resources(&titles)))
            .await?;
        Ok(ProgressUpdate { updated, progress: roadmap.progress() })
    }

    pub async fn complete_module(&self, caller: &Claims, id: ObjectId, index: usize) -> Result<ProgressUpdate, AppError> {
        let now = Utc::now();
        let (roadmap, updated) = self
            .update_module(caller, id, index, |m| Ok(m.mark_completed(now)))
            .await?;
        if updated {
            let title = roadmap.module(index).map(|m| m.title.clone()).unwrap_or_default();
            self.notify_counterpart(
                caller,
                &roadmap,
                NotificationKind::ModuleCompleted,
                &format!("completed the module \"{title}\""),
            )
            .await;
        }
        Ok(ProgressUpdate { updated, progress: roadmap.progress() })
    }

    /// Atomically keeps the higher of the stored and the new score; returns the stored best.
    pub async fn record_best_score(&self, id: ObjectId, index: usize, user_id: &str, score: i32) -> Result<i32, AppError> {
        let updated = self
            .collection
            .find_one_and_update(
                doc! { "_id": id, format!("modules.{index}"): { "$exists": true } },
                best_score_update(index, user_id, score),
            )
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| AppError::NotFound("Roadmap or module not found".to_string()))?;

        Ok(updated
            .module(index)?
            .assessment_scores
            .get(user_id)
            .copied()
            .unwrap_or(score))
    }

    pub async fn set_feedback(
        &self,
        caller: &Claims,
        id: ObjectId,
        direction: FeedbackDirection,
        rating: i32,
        text: String,
    ) -> Result<FeedbackEntry, AppError> {
        if !(1..=5).contains(&rating) {
            return Err(AppError::BadRequest("rating must be between 1 and 5".to_string()));
        }
        let required = match direction {
            FeedbackDirection::MenteeToMentor => Role::Mentee,
            FeedbackDirection::MentorToMentee | FeedbackDirection::Interview1 | FeedbackDirection::Interview2 => Role::Mentor,
        };
        caller.require_role(required)?;
        let roadmap = self.get_for(caller, id).await?;

        let entry = FeedbackEntry { rating, text: text.trim().to_string(), created_at: Utc::now() };
        let stored = bson::to_bson(&entry)?;
        self.collection
            .update_one(
                doc! { "_id": id },
                versioned_set(doc! { format!("feedback.{}", direction.field()): stored }),
            )
            .await?;

        self.notify_counterpart(caller, &roadmap, NotificationKind::FeedbackReceived, "left you feedback")
            .await;
        Ok(entry)
    }

    pub async fn set_theme(&self, caller: &Claims, id: ObjectId, slot: InterviewSlot, context: &str) -> Result<(), AppError> {
        if context.trim().is_empty() {
            return Err(AppError::BadRequest("context is required".to_string()));
        }
        self.get_mentored(caller, id).await?;
        self.collection
            .update_one(doc! { "_id": id }, versioned_set(doc! { slot.theme_field(): context.trim() }))
            .await?;
        Ok(())
    }

    /// Theme and goal for one interview slot; an unset theme is a 404.
    pub async fn interview_context(&self, caller: &Claims, id: ObjectId, slot: InterviewSlot) -> Result<(Roadmap, String), AppError> {
        let roadmap = self.get_for(caller, id).await?;
        let theme = roadmap
            .theme(slot)
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::NotFound(format!("Interview {} has no theme yet", slot.number())))?;
        Ok((roadmap, theme))
    }

    /// Notifies the other side of the roadmap, when there is one.
    pub async fn notify_counterpart(&self, caller: &Claims, roadmap: &Roadmap, kind: NotificationKind, action: &str) {
        let Ok(caller_id) = caller.object_id() else { return };
        let recipient = if caller_id == roadmap.mentee_id { roadmap.mentor_id } else { Some(roadmap.mentee_id) };
        let Some(recipient) = recipient else { return };

        let mut notification = Notification::new(kind, caller_id, &caller.username, recipient, format!("{} {action}", caller.username));
        if let Some(id) = roadmap.id {
            notification = notification.about(id.to_hex());
        }
        self.notifications.send(notification).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::roadmap::{Evaluation, OptionLetter, Question};

    #[test]
    fn versioned_filter_pins_the_read_version() {
        let id = ObjectId::new();
        assert_eq!(version_filter(id, 3), doc! { "_id": id, "version": 3_i64 });
    }

    #[test]
    fn legacy_documents_match_version_zero() {
        let id = ObjectId::new();
        let filter = version_filter(id, 0);
        assert!(filter.get_array("$or").is_ok());
    }

    fn bumps_version(update: &Document) -> bool {
        update.get_document("$inc").is_ok_and(|inc| matches!(inc.get_i64("version"), Ok(1)))
    }

    #[test]
    fn best_score_writes_bump_the_version() {
        let update = best_score_update(2, "u1", 90);
        let max = update.get_document("$max").unwrap();
        assert_eq!(max.get_i32("modules.2.assessment_scores.u1").unwrap(), 90);
        assert!(bumps_version(&update));
    }

    #[test]
    fn progress_writes_leave_scores_alone() {
        let question = |n: usize| Question {
            question: format!("Q{n}?"),
            option_a: "a".to_string(),
            option_b: "b".to_string(),
            option_c: "c".to_string(),
            option_d: "d".to_string(),
            correct_option: OptionLetter::A,
        };
        let evaluation = Evaluation([question(1), question(2), question(3), question(4), question(5)]);
        let mut module = Module::new("Ownership".to_string(), String::new(), vec![], evaluation);
        module.assessment_scores.insert("u1".to_string(), 60);
        let update = module_progress_update(0, &module).unwrap();
        let set = update.get_document("$set").unwrap();
        assert!(set.contains_key("modules.0.subtopics"));
        assert!(set.contains_key("modules.0.completed"));
        assert!(set.keys().all(|k| !k.contains("assessment_scores")));
        assert!(!set.contains_key("modules.0"));
        assert!(bumps_version(&update));
    }

    #[test]
    fn partial_writes_carry_a_timestamp_and_bump() {
        let update = versioned_set(doc! { "interview_theme_1": "Traits" });
        assert!(update.get_document("$set").unwrap().contains_key("updated_at"));
        assert!(bumps_version(&update));
    }
}
