//! Core types and trait definitions for FibreFlow.
//!
//! This crate is deliberately free of HTTP and database dependencies. It holds
//! the domain model, validation, the store traits, and the pure business
//! rules (RAG scoring, supplier ranking, import normalisation).

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod analytics;
pub mod audit;
pub mod client;
pub mod contractor;
pub mod error;
pub mod import;
pub mod procurement;
pub mod project;
pub mod rag;
pub mod record;
pub mod sow;
pub mod staff;
pub mod store;
pub mod supplier;
pub mod validate;

pub use error::{Error, Result};
