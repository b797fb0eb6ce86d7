//! HTTP surface and orchestration for the LingoChat progress service.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod service;
pub mod state;
