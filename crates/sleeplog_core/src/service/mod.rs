//! Use-case services over the repositories.
//!
//! # Responsibility
//! - Orchestrate repository calls into profile and session use-cases.
//! - Keep callers (CLI, UI bindings) away from storage keys.

pub mod profile_service;
pub mod session_service;
