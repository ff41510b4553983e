//! HTTP handlers for the SecureGenie service.

pub mod fallback;
pub mod generation;
pub mod health;
