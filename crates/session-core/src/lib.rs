//! # session-core
//!
//! Core types, document payloads, and error types for the session service.
//!
//! This crate provides the foundational types shared across all session crates:
//! - `SessionRecord` and the `SessionData` tagged union keyed by session type
//! - The virtual study payload with its owner-derived user set and merge rule
//! - Update operation enums
//! - Field paths for query-by-field lookups
//! - Cross-cutting error types

pub mod entities;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod query;
