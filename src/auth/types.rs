//! Request/response types for the auth flows.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::{Principal, Role};

/// Principal view returned to clients after login or token validation.
/// Admin and company accounts use their email as the displayed username.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

impl PrincipalView {
    #[must_use]
    pub fn from_principal(principal: &Principal, company_name: Option<String>) -> Self {
        let username = match principal {
            Principal::User(user) => user.username.clone(),
            _ => principal.email().to_string(),
        };
        let full_name = match principal {
            Principal::AdminUser(admin) => Some(admin.full_name.clone()),
            Principal::User(user) => user.full_name.clone(),
            Principal::Company(company) => Some(company.name.clone()),
        };
        Self {
            id: principal.id(),
            username,
            email: principal.email().to_string(),
            full_name,
            role: principal.role(),
            company_id: principal.company_id(),
            company_name,
        }
    }
}

/// Successful login result handed back to the routing layer.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub principal: PrincipalView,
}

/// Company registration: creates the company account and its first admin.
#[derive(Debug, Clone, Deserialize)]
pub struct CompanySignupRequest {
    pub company_name: String,
    pub admin_full_name: String,
    pub email: String,
    pub password: String,
    pub domain: Option<String>,
}

/// A verified token resolved back to a live principal.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal {
    pub principal: Principal,
    pub role: Role,
    pub jti: Uuid,
    pub token_expires_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::PrincipalView;
    use crate::identity::{Principal, Role, User};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn user_view_uses_username_not_email() {
        let principal = Principal::User(User {
            id: Uuid::new_v4(),
            username: "jdoe".to_string(),
            email: "jdoe@test".to_string(),
            full_name: Some("J. Doe".to_string()),
            password_hash: String::new(),
            role: Role::Candidate,
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
        });
        let view = PrincipalView::from_principal(&principal, None);
        assert_eq!(view.username, "jdoe");
        assert_eq!(view.role, Role::Candidate);
        assert!(view.company_id.is_none());

        let rendered = serde_json::to_value(&view).unwrap();
        assert!(rendered.get("company_id").is_none());
        assert_eq!(rendered["role"], "CANDIDATE");
    }
}
