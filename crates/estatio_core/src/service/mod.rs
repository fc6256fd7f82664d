//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep the CLI and fixtures decoupled from storage details.

pub mod order_service;
pub mod party_service;
