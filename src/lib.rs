//! # Calibra (Assessment Platform Core)
//!
//! `calibra` is the core of a multi-tenant assessment platform. Three
//! classes of principal (company admins, platform users, and direct
//! company accounts) authenticate through one unified login flow and
//! share one bearer-token format with per-token
//! (jti) revocation. Assessments run as a server-authoritative timed
//! state machine: ordered items, server-stamped deadlines, late-flagged
//! submissions, and forced expiry.
//!
//! ## Collaborators
//!
//! The HTTP surface, the relational engine, and scheduling live outside
//! this crate. The core talks to them through seams:
//!
//! - [`store::Store`]: persistence for all collections, with per-row
//!   compare-and-set and a per-assessment lock. [`store::MemoryStore`]
//!   ships for tests and single-process embeddings.
//! - [`assessment::GameScorer`]: pluggable per-game scoring.
//! - [`clock::Clock`]: injected time, so tests control deadlines.
//!
//! ## Entry points
//!
//! [`auth::AuthResolver`] for `login` / `authenticate` / `logout` /
//! `signup_company`; [`assessment::SessionEngine`] for `provision`,
//! `start_assessment`, `start_item`, `submit_item`,
//! `complete_assessment_if_done`, and `expire_overdue`.

pub mod assessment;
pub mod audit;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod store;

pub use assessment::SessionEngine;
pub use auth::AuthResolver;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::PlatformConfig;
pub use error::{ConflictReason, Error, Result, StoreError, UnauthorizedReason};
pub use identity::{Principal, Role};
pub use store::{MemoryStore, Store};
