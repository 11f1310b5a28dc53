//! In-memory [`Store`] used by tests and single-process embeddings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::audit::AuditRecord;
use crate::error::StoreError;
use crate::identity::{AdminUser, Company, Principal, User};
use crate::assessment::{Assessment, AssessmentItem, Game, JobRole};

use super::Store;

#[derive(Default)]
struct Inner {
    admin_users: HashMap<Uuid, AdminUser>,
    users: HashMap<Uuid, User>,
    companies: HashMap<Uuid, Company>,
    games: HashMap<Uuid, Game>,
    job_roles: HashMap<Uuid, JobRole>,
    assessments: HashMap<Uuid, Assessment>,
    items: HashMap<Uuid, AssessmentItem>,
    revocations: HashMap<Uuid, DateTime<Utc>>,
    audit_log: Vec<AuditRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    // One lock per assessment; created lazily on first use.
    row_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Test-only visibility into the append-only log; the core itself
    /// never reads audit records.
    pub async fn audit_log(&self) -> Vec<AuditRecord> {
        self.inner.read().await.audit_log.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn admin_user_by_email(&self, email: &str) -> Result<Option<AdminUser>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .admin_users
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn company_by_email(&self, email: &str) -> Result<Option<Company>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .companies
            .values()
            .find(|c| c.email == email)
            .cloned())
    }

    async fn company_by_id(&self, id: Uuid) -> Result<Option<Company>, StoreError> {
        Ok(self.inner.read().await.companies.get(&id).cloned())
    }

    async fn insert_admin_user(&self, admin: AdminUser) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.admin_users.values().any(|a| a.email == admin.email) {
            return Err(StoreError::Duplicate("admin_users.email"));
        }
        inner.admin_users.insert(admin.id, admin);
        Ok(())
    }

    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("users.email"));
        }
        if inner.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate("users.username"));
        }
        inner.users.insert(user.id, user);
        Ok(())
    }

    async fn insert_company(&self, company: Company) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.companies.values().any(|c| c.email == company.email) {
            return Err(StoreError::Duplicate("companies.email"));
        }
        inner.companies.insert(company.id, company);
        Ok(())
    }

    async fn record_last_login(
        &self,
        principal: &Principal,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match principal {
            Principal::AdminUser(admin) => {
                if let Some(row) = inner.admin_users.get_mut(&admin.id) {
                    row.last_login_at = Some(at);
                }
            }
            Principal::User(user) => {
                if let Some(row) = inner.users.get_mut(&user.id) {
                    row.last_login_at = Some(at);
                }
            }
            Principal::Company(company) => {
                if let Some(row) = inner.companies.get_mut(&company.id) {
                    row.last_login_at = Some(at);
                }
            }
        }
        Ok(())
    }

    async fn insert_game(&self, game: Game) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.games.values().any(|g| g.code == game.code) {
            return Err(StoreError::Duplicate("games.code"));
        }
        inner.games.insert(game.id, game);
        Ok(())
    }

    async fn game_by_id(&self, id: Uuid) -> Result<Option<Game>, StoreError> {
        Ok(self.inner.read().await.games.get(&id).cloned())
    }

    async fn insert_job_role(&self, role: JobRole) -> Result<(), StoreError> {
        self.inner.write().await.job_roles.insert(role.id, role);
        Ok(())
    }

    async fn job_role_by_id(&self, id: Uuid) -> Result<Option<JobRole>, StoreError> {
        Ok(self.inner.read().await.job_roles.get(&id).cloned())
    }

    async fn insert_assessment(&self, assessment: Assessment) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .assessments
            .insert(assessment.id, assessment);
        Ok(())
    }

    async fn assessment(&self, id: Uuid) -> Result<Option<Assessment>, StoreError> {
        Ok(self.inner.read().await.assessments.get(&id).cloned())
    }

    async fn update_assessment(&self, assessment: &Assessment) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let Some(row) = inner.assessments.get_mut(&assessment.id) else {
            return Err(StoreError::VersionConflict);
        };
        if row.version != assessment.version {
            return Err(StoreError::VersionConflict);
        }
        let mut next = assessment.clone();
        next.version += 1;
        *row = next;
        Ok(())
    }

    async fn insert_item(&self, item: AssessmentItem) -> Result<(), StoreError> {
        self.inner.write().await.items.insert(item.id, item);
        Ok(())
    }

    async fn item(&self, id: Uuid) -> Result<Option<AssessmentItem>, StoreError> {
        Ok(self.inner.read().await.items.get(&id).cloned())
    }

    async fn items_for_assessment(
        &self,
        assessment_id: Uuid,
    ) -> Result<Vec<AssessmentItem>, StoreError> {
        let inner = self.inner.read().await;
        let mut items: Vec<AssessmentItem> = inner
            .items
            .values()
            .filter(|i| i.assessment_id == assessment_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.order_index);
        Ok(items)
    }

    async fn update_item(&self, item: &AssessmentItem) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let Some(row) = inner.items.get_mut(&item.id) else {
            return Err(StoreError::VersionConflict);
        };
        if row.version != item.version {
            return Err(StoreError::VersionConflict);
        }
        let mut next = item.clone();
        next.version += 1;
        *row = next;
        Ok(())
    }

    async fn lock_assessment(&self, id: Uuid) -> Result<OwnedMutexGuard<()>, StoreError> {
        let lock = {
            let mut locks = self.row_locks.lock().await;
            Arc::clone(locks.entry(id).or_default())
        };
        Ok(lock.lock_owned().await)
    }

    async fn insert_revocation(
        &self,
        jti: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        // Revoking twice is a no-op; the first expiry wins.
        self.inner
            .write()
            .await
            .revocations
            .entry(jti)
            .or_insert(expires_at);
        Ok(())
    }

    async fn is_jti_revoked(&self, jti: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.read().await.revocations.contains_key(&jti))
    }

    async fn purge_expired_revocations(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.revocations.len();
        inner.revocations.retain(|_, expires_at| *expires_at > now);
        Ok((before - inner.revocations.len()) as u64)
    }

    async fn append_audit(&self, record: AuditRecord) -> Result<(), StoreError> {
        self.inner.write().await.audit_log.push(record);
        Ok(())
    }
}
