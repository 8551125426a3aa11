//! Workflow generation for flowsmith.
//!
//! Given a free-text description, a trigger kind and a complexity tier,
//! this crate always produces a structurally valid workflow:
//!
//! - **Requests**: wire types, fingerprints and the HTTP-facing result
//! - **Templates**: keyword-selected sub-graphs sized to the tier
//! - **Parsing**: tolerant extraction of drafts from model output
//! - **Orchestration**: AI first, templates on failure, a minimal
//!   single-trigger workflow as the last resort
//! - **Caching**: fingerprint-keyed results with single-flight computation

pub mod cache;
pub mod error;
pub mod orchestrator;
pub mod parse;
pub mod request;
pub mod template;
pub mod topic;

pub use cache::{MemoryCache, SingleFlight, WorkflowCache};
pub use error::GenerationError;
pub use orchestrator::{
    GenerationOrchestrator, GenerationReport, GenerationRun, OrchestratorConfig, Stage,
};
pub use parse::parse_ai_response;
pub use request::{
    ComplexityTier, Fingerprint, GenerationRequest, GenerationResult, TriggerKind, filename_for,
};
pub use template::{TemplateDescriptor, TemplateGenerator};
pub use topic::Topic;
