//! Pure domain logic for the LingoChat progress service.
//!
//! Everything in this crate is I/O-free: proficiency-level normalization,
//! login-streak arithmetic, gem accounting, and onboarding-profile
//! reconciliation. Persistence lives in `lingochat-store`, orchestration and
//! HTTP in `lingochat-api`.

pub mod error;
pub mod gems;
pub mod level;
pub mod profile;
pub mod streak;
pub mod types;
