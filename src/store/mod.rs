//! Persistent-store collaborator interface.
//!
//! The relational engine lives outside this crate; the core only needs
//! the operations below. Implementations must enforce email/username
//! uniqueness, provide compare-and-set row updates for assessments and
//! items, and hand out a per-assessment lock so multi-row transitions
//! can be serialized (see [`SessionEngine`](crate::assessment::engine)).

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::audit::AuditRecord;
use crate::error::StoreError;
use crate::identity::{AdminUser, Company, Principal, User};
use crate::assessment::{Assessment, AssessmentItem, Game, JobRole};

pub use memory::MemoryStore;

#[async_trait]
pub trait Store: Send + Sync {
    // Identity collections. Lookups are case-sensitive exact match.
    async fn admin_user_by_email(&self, email: &str) -> Result<Option<AdminUser>, StoreError>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn company_by_email(&self, email: &str) -> Result<Option<Company>, StoreError>;
    async fn company_by_id(&self, id: Uuid) -> Result<Option<Company>, StoreError>;
    async fn insert_admin_user(&self, admin: AdminUser) -> Result<(), StoreError>;
    async fn insert_user(&self, user: User) -> Result<(), StoreError>;
    async fn insert_company(&self, company: Company) -> Result<(), StoreError>;
    async fn record_last_login(
        &self,
        principal: &Principal,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    // Game catalog and job roles.
    async fn insert_game(&self, game: Game) -> Result<(), StoreError>;
    async fn game_by_id(&self, id: Uuid) -> Result<Option<Game>, StoreError>;
    async fn insert_job_role(&self, role: JobRole) -> Result<(), StoreError>;
    async fn job_role_by_id(&self, id: Uuid) -> Result<Option<JobRole>, StoreError>;

    // Assessments and their items. Updates are compare-and-set on the
    // row's `version`; a stale version yields `StoreError::VersionConflict`.
    async fn insert_assessment(&self, assessment: Assessment) -> Result<(), StoreError>;
    async fn assessment(&self, id: Uuid) -> Result<Option<Assessment>, StoreError>;
    async fn update_assessment(&self, assessment: &Assessment) -> Result<(), StoreError>;
    async fn insert_item(&self, item: AssessmentItem) -> Result<(), StoreError>;
    async fn item(&self, id: Uuid) -> Result<Option<AssessmentItem>, StoreError>;
    async fn items_for_assessment(
        &self,
        assessment_id: Uuid,
    ) -> Result<Vec<AssessmentItem>, StoreError>;
    async fn update_item(&self, item: &AssessmentItem) -> Result<(), StoreError>;

    /// Row-level lock for one assessment; held across the read-check-write
    /// window of multi-row transitions.
    async fn lock_assessment(&self, id: Uuid) -> Result<OwnedMutexGuard<()>, StoreError>;

    // Revocation registry. Insert is idempotent.
    async fn insert_revocation(
        &self,
        jti: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    async fn is_jti_revoked(&self, jti: Uuid) -> Result<bool, StoreError>;
    /// Drop entries whose token expiry has passed; returns how many.
    async fn purge_expired_revocations(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    // Append-only audit log; never read by the core.
    async fn append_audit(&self, record: AuditRecord) -> Result<(), StoreError>;
}
