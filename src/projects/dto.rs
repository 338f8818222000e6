use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::cache::Source;
use crate::projects::repo::{Project, ProjectStatus};

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub deadline: Option<OffsetDateTime>,
    pub priority: Option<String>,
    pub client_name: Option<String>,
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub deadline: Option<OffsetDateTime>,
    pub priority: Option<String>,
    pub client_name: Option<String>,
    pub status: Option<ProjectStatus>,
}

/// List responses carry where the data came from.
#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub source: Source,
    pub projects: Vec<Project>,
}
