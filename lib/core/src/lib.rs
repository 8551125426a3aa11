//! Core types shared across the flowsmith crates.
//!
//! This crate provides the strongly-typed ids and the rootcause-based
//! `Result` alias used by every layer of the generation pipeline.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{GenerationId, NodeId};
