//! Tailor onboarding — multi-step registration wizard core.

pub mod api;
pub mod config;
pub mod error;
pub mod onboarding;
