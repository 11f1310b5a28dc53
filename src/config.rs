//! Platform configuration: token TTLs, signing secret, assessment time budget.

use secrecy::SecretString;

const DEFAULT_TOKEN_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 30 * 60;
const DEFAULT_ASSESSMENT_BUDGET_SECONDS: i64 = 60 * 60;

/// Process-wide configuration handed to the auth resolver and the
/// assessment session engine at construction. The signing secret is
/// explicit here rather than ambient state so tests can supply their own.
#[derive(Clone)]
pub struct PlatformConfig {
    signing_secret: SecretString,
    token_ttl_seconds: i64,
    access_token_ttl_seconds: i64,
    assessment_budget_seconds: i64,
}

impl PlatformConfig {
    #[must_use]
    pub fn new(signing_secret: SecretString) -> Self {
        Self {
            signing_secret,
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            assessment_budget_seconds: DEFAULT_ASSESSMENT_BUDGET_SECONDS,
        }
    }

    /// TTL used when a caller issues a token without an explicit lifetime.
    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    /// TTL used by the login flows.
    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_token_ttl_seconds = seconds;
        self
    }

    /// Overall wall-clock budget for one assessment, from start to expiry.
    #[must_use]
    pub fn with_assessment_budget_seconds(mut self, seconds: i64) -> Self {
        self.assessment_budget_seconds = seconds;
        self
    }

    #[must_use]
    pub fn signing_secret(&self) -> &SecretString {
        &self.signing_secret
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    #[must_use]
    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    #[must_use]
    pub fn assessment_budget_seconds(&self) -> i64 {
        self.assessment_budget_seconds
    }
}

impl std::fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the signing secret.
        f.debug_struct("PlatformConfig")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("assessment_budget_seconds", &self.assessment_budget_seconds)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::PlatformConfig;
    use secrecy::SecretString;

    #[test]
    fn defaults_and_overrides() {
        let config = PlatformConfig::new(SecretString::from("test-secret"));
        assert_eq!(config.token_ttl_seconds(), super::DEFAULT_TOKEN_TTL_SECONDS);
        assert_eq!(
            config.access_token_ttl_seconds(),
            super::DEFAULT_ACCESS_TOKEN_TTL_SECONDS
        );
        assert_eq!(
            config.assessment_budget_seconds(),
            super::DEFAULT_ASSESSMENT_BUDGET_SECONDS
        );

        let config = config
            .with_token_ttl_seconds(60)
            .with_access_token_ttl_seconds(120)
            .with_assessment_budget_seconds(300);
        assert_eq!(config.token_ttl_seconds(), 60);
        assert_eq!(config.access_token_ttl_seconds(), 120);
        assert_eq!(config.assessment_budget_seconds(), 300);
    }

    #[test]
    fn debug_hides_secret() {
        let config = PlatformConfig::new(SecretString::from("do-not-print"));
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("do-not-print"));
    }
}
