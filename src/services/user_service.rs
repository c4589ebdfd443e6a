use bson::{doc, oid::ObjectId};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{Collection, Database};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, LazyLock};
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::models::notification::{Notification, NotificationKind, RequestStatus};
use crate::models::user::{Authentication, Profile, ProfileInput, Role, User, UserResponse};
use crate::services::llm::LanguageModel;
use crate::services::notification_service::NotificationService;
use crate::utils::{hash_password, verify_password, Claims};

#[derive(Serialize, ToSchema, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: Option<String>,
    pub user: Option<UserResponse>,
}

pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub profile: ProfileInput,
}

#[derive(Serialize, ToSchema)]
pub struct MentorMatch {
    pub mentor: UserResponse,
    pub reason: String,
}

pub struct UserService {
    collection: Collection<User>,
    notifications: Arc<NotificationService>,
}

impl UserService {
    pub fn new(db: Arc<Database>, notifications: Arc<NotificationService>) -> Self {
        Self { collection: db.collection("users"), notifications }
    }

    pub async fn register(&self, new_user: NewUser) -> Result<User, AppError> {
        let email = new_user.email.trim().to_lowercase();
        let username = new_user.username.trim().to_string();
        if new_user.name.trim().is_empty() || username.is_empty() || new_user.password.is_empty() {
            return Err(AppError::BadRequest("name, username and password are required".to_string()));
        }
        if !email.contains('@') {
            return Err(AppError::BadRequest("A valid email is required".to_string()));
        }

        if self.collection.find_one(doc! { "email": &email }).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        if self.collection.find_one(doc! { "username": &username }).await?.is_some() {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let hashed = hash_password(&new_user.password)?;
        let now = Utc::now();
        let mut user = User {
            id: None,
            name: new_user.name.trim().to_string(),
            username,
            email,
            role: new_user.role,
            profile: Profile::from_input(new_user.role, new_user.profile),
            authentication: Authentication { password: hashed.hash, salt: hashed.salt },
            mentors: vec![],
            mentees: vec![],
            roadmap_id: None,
            created_at: now,
            updated_at: now,
        };

        let result = self.collection.insert_one(&user).await?;
        user.id = result.inserted_id.as_object_id();
        tracing::info!(username = %user.username, role = user.role.as_str(), "user registered");
        Ok(user)
    }

    /// Unknown email, wrong password and wrong role all fail the same way.
    pub async fn login(&self, email: &str, password: &str, role: Role) -> Result<User, AppError> {
        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());
        let user = self
            .collection
            .find_one(doc! { "email": email.trim().to_lowercase() })
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(password, &user.authentication.password, &user.authentication.salt) {
            return Err(invalid());
        }
        if user.role != role {
            return Err(AppError::Unauthorized(format!("This account is not registered as a {}", role.as_str())));
        }
        Ok(user)
    }

    pub async fn get_user(&self, id: ObjectId) -> Result<User, AppError> {
        self.collection
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Like `get_user`, but the user must hold `role`; otherwise it reads as not found.
    pub async fn get_with_role(&self, id: ObjectId, role: Role) -> Result<User, AppError> {
        self.collection
            .find_one(doc! { "_id": id, "role": role.as_str() })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{role} not found")))
    }

    pub async fn update_profile(&self, id: ObjectId, name: Option<String>, input: ProfileInput) -> Result<User, AppError> {
        let mut user = self.get_user(id).await?;
        if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
            user.name = name.trim().to_string();
        }
        user.profile.apply(input);

        let profile = bson::to_bson(&user.profile)?;
        self.collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "name": &user.name,
                    "profile": profile,
                    "updated_at": bson::DateTime::now(),
                } },
            )
            .await?;
        Ok(user)
    }

    pub async fn list_by_role(&self, role: Role) -> Result<Vec<User>, AppError> {
        let cursor = self.collection.find(doc! { "role": role.as_str() }).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn list_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<User>, AppError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let cursor = self.collection.find(doc! { "_id": { "$in": ids.to_vec() } }).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn mentees_of(&self, mentor_id: ObjectId) -> Result<Vec<User>, AppError> {
        let mentor = self.get_with_role(mentor_id, Role::Mentor).await?;
        self.list_by_ids(&mentor.mentees).await
    }

    /// The first mentor the mentee is linked to.
    pub async fn my_mentor(&self, mentee_id: ObjectId) -> Result<User, AppError> {
        let mentee = self.get_with_role(mentee_id, Role::Mentee).await?;
        let mentor_id = mentee
            .mentors
            .first()
            .copied()
            .ok_or_else(|| AppError::NotFound("No mentor connected yet".to_string()))?;
        self.get_user(mentor_id).await
    }

    pub async fn is_linked(&self, mentor_id: ObjectId, mentee_id: ObjectId) -> Result<bool, AppError> {
        let found = self
            .collection
            .find_one(doc! { "_id": mentee_id, "mentors": mentor_id })
            .await?;
        Ok(found.is_some())
    }

    pub async fn link(&self, mentor_id: ObjectId, mentee_id: ObjectId) -> Result<(), AppError> {
        let now = bson::DateTime::now();
        self.collection
            .update_one(
                doc! { "_id": mentor_id },
                doc! { "$addToSet": { "mentees": mentee_id }, "$set": { "updated_at": now } },
            )
            .await?;
        self.collection
            .update_one(
                doc! { "_id": mentee_id },
                doc! { "$addToSet": { "mentors": mentor_id }, "$set": { "updated_at": now } },
            )
            .await?;
        Ok(())
    }

    pub async fn set_roadmap_id(&self, mentee_id: ObjectId, roadmap_id: ObjectId) -> Result<(), AppError> {
        self.collection
            .update_one(
                doc! { "_id": mentee_id },
                doc! { "$set": { "roadmap_id": roadmap_id, "updated_at": bson::DateTime::now() } },
            )
            .await?;
        Ok(())
    }

    /// Sends a `connection_request` to a user of the opposite role. Returns the request id.
    pub async fn request_connection(&self, from: &Claims, target_id: ObjectId) -> Result<ObjectId, AppError> {
        let from_id = from.object_id()?;
        let wanted = match from.role {
            Role::Mentee => Role::Mentor,
            Role::Mentor => Role::Mentee,
        };
        let target = self.get_with_role(target_id, wanted).await?;

        let (mentor_id, mentee_id) = match from.role {
            Role::Mentee => (target_id, from_id),
            Role::Mentor => (from_id, target_id),
        };
        if self.is_linked(mentor_id, mentee_id).await? {
            return Err(AppError::Conflict("Already connected".to_string()));
        }

        let request = Notification::new(
            NotificationKind::ConnectionRequest,
            from_id,
            &from.username,
            target_id,
            format!("{} wants to connect with you", from.username),
        );
        let id = self.notifications.insert(request).await?;
        tracing::info!(from = %from.username, to = %target.username, "connection requested");
        Ok(id)
    }

    /// Accepts or rejects a pending request; only its recipient may answer.
    pub async fn respond_connection(&self, responder: &Claims, request_id: ObjectId, accept: bool) -> Result<(), AppError> {
        let responder_id = responder.object_id()?;
        let request = self.notifications.get(request_id).await?;
        if request.kind != NotificationKind::ConnectionRequest {
            return Err(AppError::BadRequest("Not a connection request".to_string()));
        }
        if request.to_user_id != responder_id {
            return Err(AppError::Forbidden("Only the recipient can answer this request".to_string()));
        }
        if request.status != Some(RequestStatus::Pending) {
            return Err(AppError::Conflict("Request already answered".to_string()));
        }

        if !accept {
            return self.notifications.set_request_status(request_id, RequestStatus::Rejected).await;
        }

        let (mentor_id, mentee_id) = match responder.role {
            Role::Mentor => (responder_id, request.from_user_id),
            Role::Mentee => (request.from_user_id, responder_id),
        };
        self.link(mentor_id, mentee_id).await?;
        self.notifications.set_request_status(request_id, RequestStatus::Accepted).await?;
        self.notifications
            .send(Notification::new(
                NotificationKind::ConnectionAccepted,
                responder_id,
                &responder.username,
                request.from_user_id,
                format!("{} accepted your connection request", responder.username),
            ))
            .await;
        Ok(())
    }

    /// Asks the model to pick the best mentor for the mentee's goals.
    pub async fn match_mentor(&self, mentee_id: ObjectId, llm: &dyn LanguageModel) -> Result<MentorMatch, AppError> {
        let mentee = self.get_with_role(mentee_id, Role::Mentee).await?;
        let Profile::Mentee(profile) = &mentee.profile else {
            return Err(AppError::BadRequest("Mentee profile required".to_string()));
        };
        if profile.goals.is_empty() {
            return Err(AppError::BadRequest("Add learning goals to your profile first".to_string()));
        }

        let mentors = self.list_by_role(Role::Mentor).await?;
        if mentors.is_empty() {
            return Err(AppError::NotFound("No suitable mentor found".to_string()));
        }

        let reply = llm.complete(&match_prompt(&profile.goals, &profile.experience_level, &mentors)).await?;
        let (mentor_id, reason) =
            parse_match(&reply)?.ok_or_else(|| AppError::NotFound("No suitable mentor found".to_string()))?;

        let mentor = mentors
            .into_iter()
            .find(|m| m.id == Some(mentor_id))
            .ok_or_else(|| AppError::NotFound("No suitable mentor found".to_string()))?;
        Ok(MentorMatch { mentor: UserResponse::public(mentor), reason })
    }
}

pub fn match_prompt(goals: &[String], experience_level: &str, mentors: &[User]) -> String {
    let profiles: Vec<_> = mentors
        .iter()
        .map(|m| {
            let (skills, experience, style, languages, bio) = match &m.profile {
                Profile::Mentor(p) => (
                    p.skills.clone(),
                    p.experience.clone(),
                    p.mentoring_style.clone(),
                    p.languages.clone(),
                    p.bio.clone(),
                ),
                Profile::Mentee(_) => Default::default(),
            };
            json!({
                "id": m.id.map(|oid| oid.to_hex()).unwrap_or_default(),
                "name": m.name,
                "skills": skills,
                "experience": experience,
                "mentoring_style": style,
                "languages": languages,
                "bio": bio,
            })
        })
        .collect();
    let listing = serde_json::to_string_pretty(&profiles).unwrap_or_default();

    format!(
        "You are an intelligent mentor-matching assistant.\n\n\
         Given this mentee's skills and experience:\n\
         Skills: {}\n\
         Experience Level: {experience_level}\n\n\
         And the following list of mentors:\n\
         {listing}\n\n\
         Choose the best match. Respond in this format exactly:\n\
         MENTOR_ID: <mentor_id>\nREASON: <brief reason why they are a good match>",
        goals.join(", ")
    )
}

/// `MENTOR_ID: <24 hex>` followed by `REASON: <text>`; `None` when the reply has neither.
pub fn parse_match(reply: &str) -> Result<Option<(ObjectId, String)>, AppError> {
    static MATCH_REPLY: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)MENTOR_ID:\s*([a-fA-F0-9]{24})\s*REASON:\s*(.+)").expect("valid regex")
    });
    let Some(caps) = MATCH_REPLY.captures(reply) else {
        tracing::warn!("mentor match reply did not follow the expected format");
        return Ok(None);
    };
    let id = ObjectId::parse_str(&caps[1])?;
    Ok(Some((id, caps[2].trim().to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_reply_is_parsed() {
        let reply = "MENTOR_ID: 64b7f0c2a1b2c3d4e5f60718\nREASON: Strong SQL background.\nAlso teaches indexing.";
        let (id, reason) = parse_match(reply).unwrap().unwrap();
        assert_eq!(id.to_hex(), "64b7f0c2a1b2c3d4e5f60718");
        assert_eq!(reason, "Strong SQL background.\nAlso teaches indexing.");
    }

    #[test]
    fn free_text_reply_is_no_match() {
        assert!(parse_match("I think Ana would be great.").unwrap().is_none());
    }
}
