//! Unified login, token validation, and logout.
//!
//! One login request is resolved against three disjoint identity
//! collections in a fixed precedence order: company admins, then platform
//! users (by email, then by username), then direct company accounts. The
//! precedence is a deliberate design choice, not incidental.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::audit::{AuditAction, AuditRecorder};
use crate::clock::Clock;
use crate::config::PlatformConfig;
use crate::error::{Error, Result, StoreError, UnauthorizedReason};
use crate::identity::{AdminUser, Company, Principal, Role};
use crate::store::Store;

use super::password::PasswordVerifier;
use super::revocation;
use super::token::TokenIssuer;
use super::types::{AuthenticatedPrincipal, CompanySignupRequest, PrincipalView, Session};

/// One step of the login precedence chain. Each strategy either finds a
/// principal in its collection or reports absence; password verification
/// stays with the resolver.
#[async_trait]
trait IdentityLookup: Send + Sync {
    async fn find(&self, store: &dyn Store, identifier: &str)
        -> std::result::Result<Option<Principal>, StoreError>;
}

struct AdminUserLookup;

#[async_trait]
impl IdentityLookup for AdminUserLookup {
    async fn find(
        &self,
        store: &dyn Store,
        identifier: &str,
    ) -> std::result::Result<Option<Principal>, StoreError> {
        Ok(store
            .admin_user_by_email(identifier)
            .await?
            .map(Principal::AdminUser))
    }
}

/// Platform users may type their username into an email-shaped field;
/// fall back to a username lookup when the email misses.
struct UserLookup;

#[async_trait]
impl IdentityLookup for UserLookup {
    async fn find(
        &self,
        store: &dyn Store,
        identifier: &str,
    ) -> std::result::Result<Option<Principal>, StoreError> {
        if let Some(user) = store.user_by_email(identifier).await? {
            return Ok(Some(Principal::User(user)));
        }
        Ok(store
            .user_by_username(identifier)
            .await?
            .map(Principal::User))
    }
}

struct CompanyLookup;

#[async_trait]
impl IdentityLookup for CompanyLookup {
    async fn find(
        &self,
        store: &dyn Store,
        identifier: &str,
    ) -> std::result::Result<Option<Principal>, StoreError> {
        Ok(store
            .company_by_email(identifier)
            .await?
            .map(Principal::Company))
    }
}

pub struct AuthResolver {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    verifier: PasswordVerifier,
    issuer: TokenIssuer,
    audit: AuditRecorder,
    access_token_ttl_seconds: i64,
    lookups: Vec<Box<dyn IdentityLookup>>,
}

impl AuthResolver {
    #[must_use]
    pub fn new(config: &PlatformConfig, store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            issuer: TokenIssuer::new(config, Arc::clone(&clock)),
            audit: AuditRecorder::new(Arc::clone(&store), Arc::clone(&clock)),
            verifier: PasswordVerifier::new(),
            access_token_ttl_seconds: config.access_token_ttl_seconds(),
            lookups: vec![
                Box::new(AdminUserLookup),
                Box::new(UserLookup),
                Box::new(CompanyLookup),
            ],
            store,
            clock,
        }
    }

    #[must_use]
    pub fn token_issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Resolve `identifier` + `password` to a session, folding over the
    /// precedence chain and stopping at the first match that verifies.
    ///
    /// A matched identity with a wrong password or inactive flag still
    /// falls through to the next collection rather than failing hard.
    /// Every failure collapses to `bad_credentials` so
    /// callers cannot probe which collection matched.
    ///
    /// # Errors
    ///
    /// `Unauthorized { bad_credentials }` when no collection yields an
    /// active, verified principal; `Unavailable` on store failure.
    #[instrument(skip_all)]
    pub async fn login(&self, identifier: &str, password: &str) -> Result<Session> {
        for lookup in &self.lookups {
            let Some(principal) = lookup.find(self.store.as_ref(), identifier).await? else {
                continue;
            };
            if !self.verifier.verify(password, principal.password_hash()) {
                continue;
            }
            if !principal.is_active() {
                continue;
            }
            return self.establish_session(principal).await;
        }
        Err(Error::unauthorized(UnauthorizedReason::BadCredentials))
    }

    /// Validate a bearer token and resolve it back to a live principal.
    ///
    /// Order matters: signature/expiry first, then the revocation
    /// registry, then principal resolution and the active check.
    ///
    /// # Errors
    ///
    /// `Unauthorized` with `malformed_token`, `invalidated`, `inactive`,
    /// or `bad_credentials` (unknown subject), respectively.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedPrincipal> {
        let claims = self.issuer.verify(token)?;

        if revocation::is_revoked(self.store.as_ref(), claims.jti).await? {
            return Err(Error::unauthorized(UnauthorizedReason::Invalidated));
        }

        let principal = self
            .resolve_subject(&claims.sub, claims.role)
            .await?
            .ok_or_else(|| Error::unauthorized(UnauthorizedReason::BadCredentials))?;

        if !principal.is_active() {
            return Err(Error::unauthorized(UnauthorizedReason::Inactive));
        }

        let token_expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .ok_or_else(|| Error::unauthorized(UnauthorizedReason::MalformedToken))?;

        Ok(AuthenticatedPrincipal {
            principal,
            role: claims.role,
            jti: claims.jti,
            token_expires_at,
        })
    }

    /// Revoke one token by jti. Idempotent: revoking twice is a no-op.
    pub async fn logout(
        &self,
        actor_id: Uuid,
        jti: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        revocation::revoke(self.store.as_ref(), jti, expires_at).await?;
        self.audit
            .record(
                actor_id,
                AuditAction::Logout,
                "TOKEN",
                actor_id,
                serde_json::Map::new(),
            )
            .await;
        Ok(())
    }

    /// Register a company and its first admin account (same credential),
    /// then hand back a logged-in session for the admin.
    ///
    /// # Errors
    ///
    /// `Validation` on a malformed email or empty password;
    /// `Conflict { duplicate_email }` when the email exists in either the
    /// company or the admin collection.
    #[instrument(skip_all)]
    pub async fn signup_company(&self, request: CompanySignupRequest) -> Result<Session> {
        let email = request.email.trim();
        if !valid_email(email) {
            return Err(Error::Validation { field: "email" });
        }
        if request.password.is_empty() {
            return Err(Error::Validation { field: "password" });
        }

        // Both collections must be free; the store's unique index is the
        // backstop for races.
        if self.store.company_by_email(email).await?.is_some()
            || self.store.admin_user_by_email(email).await?.is_some()
        {
            return Err(Error::Conflict {
                reason: crate::error::ConflictReason::DuplicateEmail,
            });
        }

        let password_hash = self.verifier.hash(&request.password).map_err(Error::Unavailable)?;
        let now = self.clock.now();

        let company = Company {
            id: Uuid::new_v4(),
            name: request.company_name.clone(),
            email: email.to_string(),
            domain: request.domain.clone(),
            subscription_plan: "FREE".to_string(),
            is_verified: false,
            password_hash: password_hash.clone(),
            last_login_at: None,
            created_at: now,
        };
        let admin = AdminUser {
            id: Uuid::new_v4(),
            company_id: company.id,
            email: email.to_string(),
            full_name: request.admin_full_name.clone(),
            password_hash,
            is_active: true,
            last_login_at: None,
            created_at: now,
        };

        self.store.insert_company(company.clone()).await?;
        self.store.insert_admin_user(admin.clone()).await?;

        let mut payload = serde_json::Map::new();
        payload.insert("company_name".to_string(), request.company_name.into());
        payload.insert("admin_email".to_string(), email.to_string().into());
        self.audit
            .record(
                admin.id,
                AuditAction::CompanySignup,
                "COMPANY",
                company.id,
                payload,
            )
            .await;

        info!(company = %company.id, "company registered");
        self.establish_session(Principal::AdminUser(admin)).await
    }

    async fn establish_session(&self, principal: Principal) -> Result<Session> {
        let now = self.clock.now();
        if let Err(err) = self.store.record_last_login(&principal, now).await {
            // Last-login is informational; a stale value must not block login.
            warn!("Failed to record last login: {err}");
        }

        let action = match &principal {
            Principal::AdminUser(_) => AuditAction::AdminLogin,
            Principal::User(_) => AuditAction::CandidateLogin,
            Principal::Company(_) => AuditAction::CompanyLogin,
        };
        let mut payload = serde_json::Map::new();
        payload.insert("email".to_string(), principal.email().into());
        self.audit
            .record(
                principal.id(),
                action,
                principal_target_type(&principal),
                principal.id(),
                payload,
            )
            .await;

        let issued = self.issuer.issue(
            principal.email(),
            principal.role(),
            principal.company_id(),
            Some(self.access_token_ttl_seconds),
        )?;

        let company_name = self.company_name_for(&principal).await?;
        Ok(Session {
            access_token: issued.token,
            token_type: "bearer",
            expires_at: issued.expires_at,
            principal: PrincipalView::from_principal(&principal, company_name),
        })
    }

    /// ADMIN claims accept an admin user, a user carrying the ADMIN role,
    /// or a direct company account, in that order; CANDIDATE claims only
    /// resolve platform users.
    async fn resolve_subject(&self, subject: &str, role: Role) -> Result<Option<Principal>> {
        match role {
            Role::Admin => {
                if let Some(admin) = self.store.admin_user_by_email(subject).await? {
                    return Ok(Some(Principal::AdminUser(admin)));
                }
                if let Some(user) = self.store.user_by_email(subject).await? {
                    if user.role == Role::Admin {
                        return Ok(Some(Principal::User(user)));
                    }
                }
                Ok(self
                    .store
                    .company_by_email(subject)
                    .await?
                    .map(Principal::Company))
            }
            Role::Candidate => Ok(self
                .store
                .user_by_email(subject)
                .await?
                .map(Principal::User)),
        }
    }

    async fn company_name_for(&self, principal: &Principal) -> Result<Option<String>> {
        match principal {
            Principal::AdminUser(admin) => Ok(self
                .store
                .company_by_id(admin.company_id)
                .await?
                .map(|c| c.name)),
            Principal::Company(company) => Ok(Some(company.name.clone())),
            Principal::User(_) => Ok(None),
        }
    }
}

fn principal_target_type(principal: &Principal) -> &'static str {
    match principal {
        Principal::AdminUser(_) => "ADMIN_USER",
        Principal::User(_) => "USER",
        Principal::Company(_) => "COMPANY",
    }
}

fn valid_email(email: &str) -> bool {
    // Shape check only; lookups elsewhere stay case-sensitive exact match.
    static PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
    Regex::new(PATTERN).map(|re| re.is_match(email)).unwrap_or(false)
}
