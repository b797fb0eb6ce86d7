//! HTTP handlers, grouped by resource.

pub mod gems;
pub mod health;
pub mod onboarding;
pub mod session;
