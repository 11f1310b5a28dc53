//! Authentication: credential verification, token issuance, revocation,
//! and the unified login resolver.

pub mod password;
pub mod resolver;
pub mod revocation;
pub mod token;
pub mod types;

pub use password::PasswordVerifier;
pub use resolver::AuthResolver;
pub use token::{IssuedToken, TokenClaims, TokenIssuer};
pub use types::{AuthenticatedPrincipal, CompanySignupRequest, PrincipalView, Session};
