//! Identity model: the three principal collections and a common facade.
//!
//! Three disjoint collections can authenticate: company admin accounts
//! (`AdminUser`), platform users (`User`, either platform admins or
//! candidates), and direct company accounts (`Company`). They share one
//! token format, so downstream code works with [`Principal`] rather than
//! the concrete row type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "CANDIDATE")]
    Candidate,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Candidate => "CANDIDATE",
        }
    }
}

/// Admin account scoped to one company.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: Uuid,
    pub company_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Platform user: a candidate, or a platform administrator when
/// `role` is [`Role::Admin`]. Unlike the other collections, users may
/// also log in by username.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Direct company account. Authenticates with role ADMIN and its own id
/// as the company linkage.
#[derive(Debug, Clone)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub domain: Option<String>,
    pub subscription_plan: String,
    pub is_verified: bool,
    pub password_hash: String,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Any authenticated identity, resolved from one of the three collections.
#[derive(Debug, Clone)]
pub enum Principal {
    AdminUser(AdminUser),
    User(User),
    Company(Company),
}

impl Principal {
    #[must_use]
    pub fn id(&self) -> Uuid {
        match self {
            Self::AdminUser(admin) => admin.id,
            Self::User(user) => user.id,
            Self::Company(company) => company.id,
        }
    }

    #[must_use]
    pub fn email(&self) -> &str {
        match self {
            Self::AdminUser(admin) => &admin.email,
            Self::User(user) => &user.email,
            Self::Company(company) => &company.email,
        }
    }

    /// Effective role for authorization. Admin users and direct company
    /// accounts are always ADMIN; platform users carry their own role.
    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Self::AdminUser(_) | Self::Company(_) => Role::Admin,
            Self::User(user) => user.role,
        }
    }

    /// Company/tenant linkage carried into token claims, when any.
    #[must_use]
    pub fn company_id(&self) -> Option<Uuid> {
        match self {
            Self::AdminUser(admin) => Some(admin.company_id),
            Self::User(_) => None,
            Self::Company(company) => Some(company.id),
        }
    }

    /// Companies have no deactivation flag in the current model; they
    /// count as active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        match self {
            Self::AdminUser(admin) => admin.is_active,
            Self::User(user) => user.is_active,
            Self::Company(_) => true,
        }
    }

    #[must_use]
    pub fn password_hash(&self) -> &str {
        match self {
            Self::AdminUser(admin) => &admin.password_hash,
            Self::User(user) => &user.password_hash,
            Self::Company(company) => &company.password_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AdminUser, Company, Principal, Role, User};
    use chrono::Utc;
    use uuid::Uuid;

    fn admin_user(email: &str, company_id: Uuid) -> AdminUser {
        AdminUser {
            id: Uuid::new_v4(),
            company_id,
            email: email.to_string(),
            full_name: "Admin".to_string(),
            password_hash: String::new(),
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn principal_roles_and_linkage() {
        let company_id = Uuid::new_v4();
        let principal = Principal::AdminUser(admin_user("a@corp.test", company_id));
        assert_eq!(principal.role(), Role::Admin);
        assert_eq!(principal.company_id(), Some(company_id));
        assert!(principal.is_active());

        let candidate = Principal::User(User {
            id: Uuid::new_v4(),
            username: "cand".to_string(),
            email: "cand@test".to_string(),
            full_name: None,
            password_hash: String::new(),
            role: Role::Candidate,
            is_active: false,
            last_login_at: None,
            created_at: Utc::now(),
        });
        assert_eq!(candidate.role(), Role::Candidate);
        assert_eq!(candidate.company_id(), None);
        assert!(!candidate.is_active());

        let company = Principal::Company(Company {
            id: company_id,
            name: "Corp".to_string(),
            email: "corp@test".to_string(),
            domain: None,
            subscription_plan: "FREE".to_string(),
            is_verified: false,
            password_hash: String::new(),
            last_login_at: None,
            created_at: Utc::now(),
        });
        assert_eq!(company.role(), Role::Admin);
        assert_eq!(company.company_id(), Some(company_id));
        assert!(company.is_active());
    }

    #[test]
    fn role_serde_tags() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        let role: Role = serde_json::from_str("\"CANDIDATE\"").unwrap();
        assert_eq!(role, Role::Candidate);
    }
}
