use serde::{Deserialize, Serialize};

use crate::cache::Source;
use crate::tasks::repo::{Task, TaskStatus};

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub name: Option<String>,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub source: Source,
    pub tasks: Vec<Task>,
}
