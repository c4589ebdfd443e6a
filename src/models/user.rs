use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    pub profile: Profile,
    pub mentors: Vec<String>,
    pub mentees: Vec<String>,
    pub roadmap_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    /// Directory view: same shape without the email address.
    pub fn public(user: User) -> Self {
        let mut response = UserResponse::from(user);
        response.email = None;
        response
    }
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        UserResponse {
            id: u.id.map(|oid| oid.to_hex()).unwrap_or_default(),
            name: u.name,
            username: u.username,
            email: Some(u.email),
            role: u.role,
            profile: u.profile,
            mentors: u.mentors.iter().map(|o| o.to_hex()).collect(),
            mentees: u.mentees.iter().map(|o| o.to_hex()).collect(),
            roadmap_id: u.roadmap_id.map(|oid| oid.to_hex()),
            created_at: u.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub profile: Profile,
    pub authentication: Authentication,
    #[serde(default)]
    pub mentors: Vec<ObjectId>,
    #[serde(default)]
    pub mentees: Vec<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roadmap_id: Option<ObjectId>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Authentication {
    pub password: String,
    pub salt: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Mentor,
    Mentee,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "mentor" => Some(Role::Mentor),
            "mentee" => Some(Role::Mentee),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Mentor => "mentor",
            Role::Mentee => "mentee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Mentor => write!(f, "Mentor"),
            Role::Mentee => write!(f, "Mentee"),
        }
    }
}

/// Role-shaped profile; the variant always agrees with `User::role`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Profile {
    Mentor(MentorProfile),
    Mentee(MenteeProfile),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct MentorProfile {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub mentoring_style: String,
    #[serde(default)]
    pub availability: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub profile_picture: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct MenteeProfile {
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub learning_style: String,
    #[serde(default)]
    pub availability: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub profile_picture: String,
    #[serde(default = "default_experience_level")]
    pub experience_level: String,
}

fn default_experience_level() -> String {
    "beginner".to_string()
}

impl Default for MenteeProfile {
    fn default() -> Self {
        MenteeProfile {
            goals: vec![],
            learning_style: String::new(),
            availability: vec![],
            languages: vec![],
            bio: String::new(),
            profile_picture: String::new(),
            experience_level: default_experience_level(),
        }
    }
}

/// Loose profile payload accepted on registration and profile updates.
/// Fields that do not belong to the user's role are ignored.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProfileInput {
    pub skills: Option<Vec<String>>,
    pub experience: Option<String>,
    pub mentoring_style: Option<String>,
    pub goals: Option<Vec<String>>,
    pub learning_style: Option<String>,
    pub experience_level: Option<String>,
    pub availability: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

impl Profile {
    pub fn empty(role: Role) -> Self {
        match role {
            Role::Mentor => Profile::Mentor(MentorProfile::default()),
            Role::Mentee => Profile::Mentee(MenteeProfile::default()),
        }
    }

    pub fn from_input(role: Role, input: ProfileInput) -> Self {
        let mut profile = Profile::empty(role);
        profile.apply(input);
        profile
    }

    /// Overwrites every field present in `input`.
    pub fn apply(&mut self, input: ProfileInput) {
        match self {
            Profile::Mentor(p) => {
                if let Some(v) = input.skills { p.skills = v; }
                if let Some(v) = input.experience { p.experience = v; }
                if let Some(v) = input.mentoring_style { p.mentoring_style = v; }
                if let Some(v) = input.availability { p.availability = v; }
                if let Some(v) = input.languages { p.languages = v; }
                if let Some(v) = input.bio { p.bio = v; }
                if let Some(v) = input.profile_picture { p.profile_picture = v; }
            }
            Profile::Mentee(p) => {
                if let Some(v) = input.goals { p.goals = v; }
                if let Some(v) = input.learning_style { p.learning_style = v; }
                if let Some(v) = input.experience_level { p.experience_level = v; }
                if let Some(v) = input.availability { p.availability = v; }
                if let Some(v) = input.languages { p.languages = v; }
                if let Some(v) = input.bio { p.bio = v; }
                if let Some(v) = input.profile_picture { p.profile_picture = v; }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mentee_defaults_to_beginner() {
        match Profile::empty(Role::Mentee) {
            Profile::Mentee(p) => assert_eq!(p.experience_level, "beginner"),
            Profile::Mentor(_) => panic!("expected mentee profile"),
        }
    }

    #[test]
    fn foreign_fields_are_ignored() {
        let input = ProfileInput {
            skills: Some(vec!["rust".into()]),
            goals: Some(vec!["sql".into()]),
            bio: Some("hi".into()),
            ..Default::default()
        };
        let Profile::Mentee(p) = Profile::from_input(Role::Mentee, input) else {
            panic!("expected mentee profile");
        };
        assert_eq!(p.goals, vec!["sql".to_string()]);
        assert_eq!(p.bio, "hi");
    }

    #[test]
    fn profile_is_tagged_by_kind() {
        let json = serde_json::to_value(Profile::empty(Role::Mentor)).unwrap();
        assert_eq!(json["kind"], "mentor");
    }
}
