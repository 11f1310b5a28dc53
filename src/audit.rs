//! Append-only audit log of security-relevant actions.
//!
//! The resolver and the session engine record here as a side effect and
//! never read back. A failed audit write is logged and swallowed so it
//! cannot fail the operation it describes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::assessment::JsonMap;
use crate::clock::Clock;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CompanySignup,
    AdminLogin,
    CandidateLogin,
    CompanyLogin,
    Logout,
    AssessmentProvisioned,
    AssessmentStarted,
    ItemStarted,
    ItemSubmitted,
    AssessmentCompleted,
    AssessmentExpired,
}

#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: AuditAction,
    pub target_type: &'static str,
    pub target_id: Uuid,
    pub payload: JsonMap,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl AuditRecorder {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Best effort: append failures are logged, not propagated.
    pub async fn record(
        &self,
        actor_id: Uuid,
        action: AuditAction,
        target_type: &'static str,
        target_id: Uuid,
        payload: JsonMap,
    ) {
        let record = AuditRecord {
            id: Uuid::new_v4(),
            actor_id,
            action,
            target_type,
            target_id,
            payload,
            created_at: self.clock.now(),
        };
        if let Err(err) = self.store.append_audit(record).await {
            warn!("Failed to append audit record: {err}");
        }
    }
}
