//! Bearer token issuer: HS256-signed claims with a per-token jti.

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::PlatformConfig;
use crate::error::{Error, Result, UnauthorizedReason};
use crate::identity::Role;

/// Claims carried by every token, whichever collection the subject
/// resolved from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Principal email.
    pub sub: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: Uuid,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    default_ttl_seconds: i64,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(config: &PlatformConfig, clock: Arc<dyn Clock>) -> Self {
        let secret = config.signing_secret().expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            default_ttl_seconds: config.token_ttl_seconds(),
            clock,
        }
    }

    /// Sign a token for `subject`. A fresh jti is generated per call and
    /// never reused. Without an explicit `ttl_seconds` the issuer default
    /// applies; login flows pass the configured access-token TTL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unavailable`] if claim encoding fails.
    pub fn issue(
        &self,
        subject: &str,
        role: Role,
        company_id: Option<Uuid>,
        ttl_seconds: Option<i64>,
    ) -> Result<IssuedToken> {
        let now = self.clock.now();
        let ttl = ttl_seconds.unwrap_or(self.default_ttl_seconds);
        let expires_at = now + Duration::seconds(ttl);
        let jti = Uuid::new_v4();

        let claims = TokenClaims {
            sub: subject.to_string(),
            role,
            company_id,
            jti,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| Error::Unavailable(anyhow::anyhow!("failed to sign token: {err}")))?;

        Ok(IssuedToken {
            token,
            jti,
            expires_at,
        })
    }

    /// Decode and verify a token: signature, structure, and expiry against
    /// the injected clock. Does NOT consult the revocation registry; that
    /// is the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized { malformed_token }` on signature mismatch,
    /// expiry, or malformed structure.
    pub fn verify(&self, token: &str) -> Result<TokenClaims> {
        // Expiry is checked against the injected clock below, not the
        // library's view of system time.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| Error::unauthorized(UnauthorizedReason::MalformedToken))?;

        if data.claims.exp <= self.clock.now().timestamp() {
            return Err(Error::unauthorized(UnauthorizedReason::MalformedToken));
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::TokenIssuer;
    use crate::clock::ManualClock;
    use crate::config::PlatformConfig;
    use crate::error::{Error, UnauthorizedReason};
    use crate::identity::Role;
    use chrono::{Duration, TimeZone, Utc};
    use secrecy::SecretString;
    use std::sync::Arc;
    use uuid::Uuid;

    fn issuer(clock: Arc<ManualClock>) -> TokenIssuer {
        let config = PlatformConfig::new(SecretString::from("unit-test-secret"));
        TokenIssuer::new(&config, clock)
    }

    #[test]
    fn issue_then_verify_round_trips_claims() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        ));
        let issuer = issuer(Arc::clone(&clock));
        let company_id = Some(Uuid::new_v4());

        let issued = issuer
            .issue("admin@corp.test", Role::Admin, company_id, None)
            .unwrap();
        let claims = issuer.verify(&issued.token).unwrap();

        assert_eq!(claims.sub, "admin@corp.test");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.company_id, company_id);
        assert_eq!(claims.jti, issued.jti);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
        // Default TTL is 15 minutes.
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn jti_is_fresh_per_call() {
        let issuer = issuer(Arc::new(ManualClock::default()));
        let a = issuer.issue("x@test", Role::Candidate, None, None).unwrap();
        let b = issuer.issue("x@test", Role::Candidate, None, None).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn expired_token_is_rejected() {
        let clock = Arc::new(ManualClock::default());
        let issuer = issuer(Arc::clone(&clock));
        let issued = issuer
            .issue("x@test", Role::Candidate, None, Some(60))
            .unwrap();

        clock.advance(Duration::seconds(61));
        let err = issuer.verify(&issued.token).unwrap_err();
        assert!(matches!(
            err,
            Error::Unauthorized {
                reason: UnauthorizedReason::MalformedToken
            }
        ));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let issuer = issuer(Arc::new(ManualClock::default()));
        let issued = issuer.issue("x@test", Role::Candidate, None, None).unwrap();

        let mut tampered = issued.token.clone();
        tampered.pop();
        assert!(issuer.verify(&tampered).is_err());
        assert!(issuer.verify("not.a.jwt").is_err());

        // Token signed with a different secret fails too.
        let other_config = PlatformConfig::new(SecretString::from("other-secret"));
        let other = TokenIssuer::new(&other_config, Arc::new(ManualClock::default()));
        assert!(other.verify(&issued.token).is_err());
    }
}
