//! Persisted session types for the backup harvester.
//!
//! This crate contains the serde-serializable shapes written to and read
//! from the session file. They mirror the cookie layout of a Playwright
//! storage-state document, so a session file is also a valid storage state
//! with no origins.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * Opaque to the orchestration core: records are carried, never edited
//!
//! Browser adapters convert them to and from their own cookie types.

pub mod cookie;
pub mod token;

pub use cookie::*;
pub use token::*;
