use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::models::roadmap::{Progress, Roadmap};
use crate::models::user::{Role, UserResponse};
use crate::services::roadmap_service::RoadmapService;
use crate::services::user_service::UserService;
use crate::utils::Claims;

#[derive(Serialize, ToSchema)]
pub struct RoadmapSummary {
    pub roadmap_id: String,
    pub mentee_id: String,
    pub goal: String,
    pub progress: Progress,
    pub modules_completed: usize,
    pub total_modules: usize,
}

impl From<&Roadmap> for RoadmapSummary {
    fn from(r: &Roadmap) -> Self {
        RoadmapSummary {
            roadmap_id: r.id.map(|oid| oid.to_hex()).unwrap_or_default(),
            mentee_id: r.mentee_id.to_hex(),
            goal: r.goal.clone(),
            progress: r.progress(),
            modules_completed: r.modules.iter().filter(|m| m.completed).count(),
            total_modules: r.modules.len(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct Dashboard {
    pub user: UserResponse,
    /// Mentee only; absent until a roadmap has been generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roadmap: Option<RoadmapSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mentee_count: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mentored_roadmaps: Vec<RoadmapSummary>,
}

pub struct DashboardService {
    users: Arc<UserService>,
    roadmaps: Arc<RoadmapService>,
}

impl DashboardService {
    pub fn new(users: Arc<UserService>, roadmaps: Arc<RoadmapService>) -> Self {
        Self { users, roadmaps }
    }

    pub async fn for_user(&self, caller: &Claims) -> Result<Dashboard, AppError> {
        let user = self.users.get_user(caller.object_id()?).await?;
        match user.role {
            Role::Mentee => {
                let roadmap = match user.roadmap_id {
                    Some(id) => match self.roadmaps.get(id).await {
                        Ok(r) => Some(RoadmapSummary::from(&r)),
                        Err(AppError::NotFound(_)) => None,
                        Err(e) => return Err(e),
                    },
                    None => None,
                };
                Ok(Dashboard { user: user.into(), roadmap, mentee_count: None, mentored_roadmaps: vec![] })
            }
            Role::Mentor => {
                let mentee_count = user.mentees.len();
                let mentored_roadmaps = self.roadmaps.list_for(caller).await?.iter().map(RoadmapSummary::from).collect();
                Ok(Dashboard { user: user.into(), roadmap: None, mentee_count: Some(mentee_count), mentored_roadmaps })
            }
        }
    }
}
