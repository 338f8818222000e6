use std::sync::Mutex;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::Serialize;
use tracing::{debug, warn};

pub const PROJECT_EVENTS_CHANNEL: &str = "project-events";
pub const TASK_EVENTS_CHANNEL: &str = "project-task-events";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectEvent {
    Created,
    Updated,
    Deleted,
}

impl ProjectEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectEvent::Created => "CREATED",
            ProjectEvent::Updated => "UPDATED",
            ProjectEvent::Deleted => "DELETED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    Created,
    Updated,
    Archived,
}

impl TaskEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskEvent::Created => "CREATED",
            TaskEvent::Updated => "UPDATED",
            TaskEvent::Archived => "ARCHIVED",
        }
    }
}

/// Append-only sink for domain events. One channel per resource family;
/// entries carry the event kind and the JSON-serialized record.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, channel: &str, kind: &str, payload: &str) -> anyhow::Result<()>;
}

/// Publishes events to Redis streams (`XADD <channel> * key <kind> value <json>`).
pub struct RedisEventSink {
    conn: ConnectionManager,
}

impl RedisEventSink {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl EventSink for RedisEventSink {
    async fn publish(&self, channel: &str, kind: &str, payload: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("XADD")
            .arg(channel)
            .arg("*")
            .arg("key")
            .arg(kind)
            .arg("value")
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

/// Captures published events instead of sending them. Used by
/// `AppState::fake()` and tests.
#[derive(Default)]
pub struct RecordingEventSink {
    pub published: Mutex<Vec<(String, String, String)>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<(String, String, String)> {
        std::mem::take(&mut self.published.lock().expect("events lock"))
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn publish(&self, channel: &str, kind: &str, payload: &str) -> anyhow::Result<()> {
        self.published.lock().expect("events lock").push((
            channel.to_string(),
            kind.to_string(),
            payload.to_string(),
        ));
        Ok(())
    }
}

/// Fire-and-forget: the persistence change is already committed, so a
/// publish failure is logged and swallowed, never rolled back or surfaced.
pub async fn emit_project_event<T: Serialize>(sink: &dyn EventSink, kind: ProjectEvent, record: &T) {
    emit(sink, PROJECT_EVENTS_CHANNEL, kind.as_str(), record).await;
}

pub async fn emit_task_event<T: Serialize>(sink: &dyn EventSink, kind: TaskEvent, record: &T) {
    emit(sink, TASK_EVENTS_CHANNEL, kind.as_str(), record).await;
}

async fn emit<T: Serialize>(sink: &dyn EventSink, channel: &str, kind: &str, record: &T) {
    let payload = match serde_json::to_string(record) {
        Ok(p) => p,
        Err(e) => {
            warn!(%channel, %kind, error = %e, "event payload serialize failed");
            return;
        }
    };
    match sink.publish(channel, kind, &payload).await {
        Ok(()) => debug!(%channel, %kind, "event published"),
        Err(e) => warn!(%channel, %kind, error = %e, "event publish failed"),
    }
}
