use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A task as reported by an external tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalTask {
    /// The tracker's own identifier, when it has one.
    pub external_id: Option<String>,
    pub title: String,
    pub due_at: Option<DateTime<Utc>>,
}

/// A third-party task tracker that can report overdue work.
///
/// Sources are stateless between calls. A failure here is never fatal to
/// the caller: sync treats it as "nothing overdue" and carries on.
#[async_trait]
pub trait ExternalTaskSource: Send + Sync {
    /// Unique identifier (e.g. "notion").
    fn name(&self) -> &str;

    /// Open tasks whose due date is before `now`.
    async fn list_overdue(&self, now: DateTime<Utc>) -> Result<Vec<ExternalTask>>;
}
