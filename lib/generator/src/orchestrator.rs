//! Generation orchestrator.
//!
//! Turns a [`GenerationRequest`] into a workflow that always validates.
//! Each run walks a small state machine:
//!
//! ```text
//! AwaitAi → ParseAi → Repair → Validate → Accept
//!    │         │
//!    └─────────┴→ TemplateFallback → Repair → Validate → Accept
//!
//! Validate failing after a second repair round → MinimalFallback
//! ```
//!
//! `Accept` and `MinimalFallback` are the only exits; the orchestrator
//! never returns an error. Failures are recorded as diagnostics on the
//! returned report and in the workflow's `meta`.
//!
//! Runs share nothing mutable except the optional cache, which is guarded
//! by a [`SingleFlight`] so that one fingerprint is computed at most once
//! at a time.

use crate::cache::{SingleFlight, WorkflowCache};
use crate::error::GenerationError;
use crate::parse::parse_ai_response;
use crate::request::{GenerationRequest, GenerationResult};
use crate::template::{TemplateDescriptor, TemplateGenerator};
use chrono::Utc;
use flowsmith_ai::{LlmBackend, LlmRequest, PromptTemplate};
use flowsmith_core::GenerationId;
use flowsmith_workflow::{
    AutoRepairEngine, Diagnostic, DiagnosticKind, GenerationSource, Meta, NodeTypeRegistry,
    StructuralValidator, ValidationReport, Workflow,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Repair/validate rounds before a draft is given up on.
const REPAIR_ROUNDS: usize = 2;

/// A state the orchestrator passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CacheHit,
    AwaitAi,
    ParseAi,
    TemplateFallback,
    Repair,
    Validate,
    Accept,
    MinimalFallback,
}

/// Orchestrator tuning.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on one AI call.
    pub ai_timeout: Duration,
    /// Retry an AI draft that fails validation through the templates
    /// instead of degrading straight to the minimal workflow.
    pub template_on_invalid_ai: bool,
    /// Written to `meta.generator`.
    pub generator: String,
    /// Lifetime of cached results.
    pub cache_ttl: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            ai_timeout: Duration::from_secs(30),
            template_on_invalid_ai: false,
            generator: concat!("flowsmith/", env!("CARGO_PKG_VERSION")).to_string(),
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

/// What happened during a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub id: GenerationId,
    pub stages: Vec<Stage>,
    pub source: GenerationSource,
    pub applied_fixes: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    /// Validation of the returned workflow.
    pub validation: ValidationReport,
    pub cached: bool,
}

impl GenerationReport {
    #[must_use]
    pub fn has_diagnostic(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }
}

/// A returned workflow and its report.
#[derive(Debug, Clone)]
pub struct GenerationRun {
    pub workflow: Workflow,
    pub report: GenerationReport,
}

impl GenerationRun {
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.workflow.is_degraded()
    }
}

#[derive(Debug, Default)]
struct Trail {
    stages: Vec<Stage>,
    applied_fixes: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl Trail {
    fn enter(&mut self, stage: Stage) {
        debug!(?stage, "entering stage");
        self.stages.push(stage);
    }

    fn into_report(
        self,
        id: GenerationId,
        source: GenerationSource,
        validation: ValidationReport,
    ) -> GenerationReport {
        GenerationReport {
            id,
            stages: self.stages,
            source,
            applied_fixes: self.applied_fixes,
            diagnostics: self.diagnostics,
            validation,
            cached: false,
        }
    }
}

/// Coordinates the AI backend, templates, repair and validation.
pub struct GenerationOrchestrator {
    registry: Arc<NodeTypeRegistry>,
    backend: Arc<dyn LlmBackend>,
    prompt: PromptTemplate,
    templates: TemplateGenerator,
    repair: AutoRepairEngine,
    validator: StructuralValidator,
    cache: Option<Arc<dyn WorkflowCache>>,
    flights: SingleFlight,
    config: OrchestratorConfig,
}

impl GenerationOrchestrator {
    #[must_use]
    pub fn new(registry: Arc<NodeTypeRegistry>, backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            prompt: PromptTemplate::workflow_generation(),
            templates: TemplateGenerator::new(Arc::clone(&registry)),
            repair: AutoRepairEngine::new(Arc::clone(&registry)),
            validator: StructuralValidator::new(Arc::clone(&registry)),
            registry,
            backend,
            cache: None,
            flights: SingleFlight::new(),
            config: OrchestratorConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn WorkflowCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<NodeTypeRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn validator(&self) -> &StructuralValidator {
        &self.validator
    }

    #[must_use]
    pub fn repair_engine(&self) -> &AutoRepairEngine {
        &self.repair
    }

    /// Answers a request the way the HTTP layer reports it: a blank
    /// description asks for prompt help, anything else generates.
    pub async fn respond(&self, request: &GenerationRequest) -> GenerationResult {
        if request.needs_prompt_help() {
            return GenerationResult::prompt_help();
        }
        GenerationResult::generated(self.run(request).await.workflow)
    }

    /// Produces a structurally valid workflow for the request.
    #[instrument(
        skip_all,
        fields(trigger = %request.trigger_type, complexity = %request.complexity)
    )]
    pub async fn run(&self, request: &GenerationRequest) -> GenerationRun {
        let Some(cache) = &self.cache else {
            return self.compute(request).await;
        };

        let fingerprint = request.fingerprint();
        let _flight = self.flights.acquire(&fingerprint).await;
        if let Some(workflow) = cache.get(&fingerprint).await {
            debug!(%fingerprint, "cache hit");
            return self.cached_run(workflow);
        }

        let run = self.compute(request).await;
        if run.report.source != GenerationSource::Minimal {
            cache
                .set(&fingerprint, run.workflow.clone(), self.config.cache_ttl)
                .await;
        }
        run
    }

    fn cached_run(&self, workflow: Workflow) -> GenerationRun {
        let source = workflow
            .meta
            .as_ref()
            .and_then(|meta| meta.source)
            .unwrap_or(GenerationSource::Template);
        let mut trail = Trail::default();
        trail.enter(Stage::CacheHit);
        let validation = self.validator.validate(&workflow);
        let mut report = trail.into_report(GenerationId::new(), source, validation);
        report.cached = true;
        GenerationRun { workflow, report }
    }

    async fn compute(&self, request: &GenerationRequest) -> GenerationRun {
        let id = GenerationId::new();
        let mut trail = Trail::default();

        match self.draft_from_ai(request, &mut trail).await {
            Ok(draft) => match self.repair_and_validate(draft, &mut trail) {
                Ok((workflow, validation)) => {
                    let source = GenerationSource::Ai;
                    return self.accept(id, request, workflow, validation, source, trail);
                }
                Err(validation) => {
                    warn!(
                        generation = %id,
                        errors = validation.errors.len(),
                        "AI draft failed validation"
                    );
                    trail.diagnostics.extend(validation.errors);
                    if !self.config.template_on_invalid_ai {
                        return self.degrade(id, request, trail);
                    }
                }
            },
            Err(err) => {
                warn!(
                    generation = %id,
                    error = %err,
                    "AI draft unavailable, falling back to templates"
                );
                trail
                    .diagnostics
                    .push(Diagnostic::new(DiagnosticKind::AiCollaborator, err.to_string()));
            }
        }

        trail.enter(Stage::TemplateFallback);
        let draft = self.templates.generate(&TemplateDescriptor::from(request));
        match self.repair_and_validate(draft, &mut trail) {
            Ok((workflow, validation)) => {
                let source = GenerationSource::Template;
                self.accept(id, request, workflow, validation, source, trail)
            }
            Err(validation) => {
                trail.diagnostics.extend(validation.errors);
                self.degrade(id, request, trail)
            }
        }
    }

    async fn draft_from_ai(
        &self,
        request: &GenerationRequest,
        trail: &mut Trail,
    ) -> Result<Workflow, GenerationError> {
        trail.enter(Stage::AwaitAi);
        if request.needs_prompt_help() {
            return Err(GenerationError::EmptyDescription);
        }

        let llm_request = self.llm_request(request)?;
        let response =
            match tokio::time::timeout(self.config.ai_timeout, self.backend.generate(&llm_request))
                .await
            {
                Ok(response) => response?,
                Err(_) => {
                    return Err(GenerationError::Timeout {
                        after: self.config.ai_timeout,
                    });
                }
            };
        debug!(
            model = %response.model,
            tokens = response.usage.total(),
            "AI draft received"
        );

        trail.enter(Stage::ParseAi);
        parse_ai_response(&response.content)
    }

    fn llm_request(&self, request: &GenerationRequest) -> Result<LlmRequest, GenerationError> {
        let values: HashMap<&str, String> = HashMap::from([
            ("description", request.description.trim().to_string()),
            ("trigger_type", request.trigger_type.as_str().to_string()),
            ("complexity", request.complexity.as_str().to_string()),
            ("node_band", request.complexity.band_label().to_string()),
            ("node_types", self.node_catalog()),
        ]);
        let prompt = self.prompt.render(&values)?;
        Ok(LlmRequest::from(prompt).with_json_output())
    }

    /// One line per registered type, for the prompt.
    fn node_catalog(&self) -> String {
        self.registry
            .specs()
            .into_iter()
            .map(|spec| {
                let versions: Vec<String> = spec
                    .supported_versions
                    .iter()
                    .map(|v| format!("v{v}"))
                    .collect();
                let required = if spec.required_params.is_empty() {
                    "nothing".to_string()
                } else {
                    spec.required_params
                        .iter()
                        .map(String::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                let trigger = if spec.is_trigger_kind { ", trigger" } else { "" };
                format!(
                    "- {} ({}{trigger}) requires: {required}",
                    spec.type_id,
                    versions.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn repair_and_validate(
        &self,
        mut workflow: Workflow,
        trail: &mut Trail,
    ) -> Result<(Workflow, ValidationReport), ValidationReport> {
        let mut validation = ValidationReport::new();
        for _ in 0..REPAIR_ROUNDS {
            trail.enter(Stage::Repair);
            trail
                .applied_fixes
                .extend(self.repair.repair_in_place(&mut workflow));
            trail.enter(Stage::Validate);
            validation = self.validator.validate(&workflow);
            if validation.is_valid() {
                return Ok((workflow, validation));
            }
        }
        Err(validation)
    }

    fn accept(
        &self,
        id: GenerationId,
        request: &GenerationRequest,
        mut workflow: Workflow,
        validation: ValidationReport,
        source: GenerationSource,
        mut trail: Trail,
    ) -> GenerationRun {
        trail.enter(Stage::Accept);
        self.stamp(&mut workflow, request, source, &trail);
        info!(
            generation = %id,
            ?source,
            nodes = workflow.node_count(),
            fixes = trail.applied_fixes.len(),
            "workflow accepted"
        );
        GenerationRun {
            workflow,
            report: trail.into_report(id, source, validation),
        }
    }

    fn degrade(
        &self,
        id: GenerationId,
        request: &GenerationRequest,
        mut trail: Trail,
    ) -> GenerationRun {
        trail.enter(Stage::MinimalFallback);
        let mut workflow = self
            .templates
            .minimal(request.trigger_type, &request.description);
        let validation = self.validator.validate(&workflow);
        self.stamp(&mut workflow, request, GenerationSource::Minimal, &trail);
        warn!(
            generation = %id,
            diagnostics = trail.diagnostics.len(),
            "degraded to minimal workflow"
        );
        GenerationRun {
            workflow,
            report: trail.into_report(id, GenerationSource::Minimal, validation),
        }
    }

    fn stamp(
        &self,
        workflow: &mut Workflow,
        request: &GenerationRequest,
        source: GenerationSource,
        trail: &Trail,
    ) {
        workflow.active = Some(false);
        let meta = workflow.meta.get_or_insert_with(Meta::default);
        meta.generator = Some(self.config.generator.clone());
        meta.generated_at = Some(Utc::now());
        meta.request = serde_json::to_value(request).ok();
        meta.source = Some(source);
        meta.degraded = (source == GenerationSource::Minimal).then_some(true);
        meta.applied_fixes = trail.applied_fixes.clone();
        meta.diagnostics = trail.diagnostics.iter().map(ToString::to_string).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::request::{ComplexityTier, TriggerKind};
    use async_trait::async_trait;
    use flowsmith_ai::{LlmError, LlmProvider, LlmResponse, TokenUsage};
    use flowsmith_workflow::ConnectionGraph;
    use flowsmith_workflow::registry::types;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend with a scripted answer that records what it was asked.
    struct ScriptedBackend {
        answer: Result<String, LlmError>,
        delay: Option<Duration>,
        calls: AtomicUsize,
        requests: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedBackend {
        fn answering(content: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(content.to_string()),
                delay: None,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                answer: Err(LlmError::Unreachable {
                    reason: "connection refused".to_string(),
                }),
                delay: None,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn stalling(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok("{}".to_string()),
                delay: Some(delay),
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests
                .lock()
                .expect("requests lock")
                .push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.answer.clone().map(|content| LlmResponse {
                content,
                usage: TokenUsage::default(),
                model: "scripted".to_string(),
            })
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::Disabled
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    /// A usable draft with the gaps models typically leave.
    const AI_DRAFT: &str = r#"Here you go:
```json
{
  "name": "Post signups to Slack",
  "active": true,
  "nodes": [
    { "name": "Start", "type": "n8n-nodes-base.manualTrigger" },
    { "name": "Post", "type": "n8n-nodes-base.slack", "typeVersion": 2,
      "parameters": { "text": "=New signup: {{ $json.email }}" } }
  ],
  "connections": { "Start": { "main": [[{ "node": "Post", "type": "main", "index": 0 }]] } }
}
```"#;

    const UNKNOWN_TYPE_DRAFT: &str = r#"{
  "name": "Teleport",
  "nodes": [
    { "name": "Start", "type": "n8n-nodes-base.manualTrigger" },
    { "name": "Beam", "type": "n8n-nodes-base.teleport" }
  ],
  "connections": { "Start": { "main": [[{ "node": "Beam", "type": "main", "index": 0 }]] } }
}"#;

    /// Reachable chain plus a two-node loop no trigger leads into.
    const DETACHED_LOOP_DRAFT: &str = r#"{
  "name": "Signups with a loop",
  "nodes": [
    { "name": "Start", "type": "n8n-nodes-base.manualTrigger" },
    { "name": "Post", "type": "n8n-nodes-base.slack", "typeVersion": 2,
      "parameters": { "text": "=New signup: {{ $json.email }}" } },
    { "name": "Ping", "type": "n8n-nodes-base.noOp" },
    { "name": "Pong", "type": "n8n-nodes-base.noOp" }
  ],
  "connections": {
    "Start": { "main": [[{ "node": "Post", "type": "main", "index": 0 }]] },
    "Ping": { "main": [[{ "node": "Pong", "type": "main", "index": 0 }]] },
    "Pong": { "main": [[{ "node": "Ping", "type": "main", "index": 0 }]] }
  }
}"#;

    fn orchestrator(backend: Arc<ScriptedBackend>) -> GenerationOrchestrator {
        GenerationOrchestrator::new(Arc::new(NodeTypeRegistry::builtin()), backend)
    }

    fn slack_summary() -> GenerationRequest {
        GenerationRequest::new(
            "send a daily slack summary",
            TriggerKind::Schedule,
            ComplexityTier::Medium,
        )
    }

    fn trigger_count(workflow: &Workflow, registry: &NodeTypeRegistry) -> usize {
        workflow
            .nodes()
            .iter()
            .filter(|node| node.type_id().is_some_and(|t| registry.is_trigger(t)))
            .count()
    }

    #[tokio::test]
    async fn failing_ai_uses_templates() {
        let orchestrator = orchestrator(ScriptedBackend::failing());
        let run = orchestrator.run(&slack_summary()).await;

        assert_eq!(run.report.source, GenerationSource::Template);
        assert!((4..=6).contains(&run.workflow.node_count()));
        let schedules = run
            .workflow
            .nodes()
            .iter()
            .filter(|node| node.type_id() == Some(types::SCHEDULE_TRIGGER))
            .count();
        assert_eq!(schedules, 1);
        assert_eq!(trigger_count(&run.workflow, orchestrator.registry()), 1);

        let meta = run.workflow.meta.as_ref().expect("meta");
        assert_eq!(meta.degraded, None);
        assert_eq!(meta.source, Some(GenerationSource::Template));
        assert!(meta.diagnostics[0].starts_with("AICollaboratorError"));
        assert!(run.report.validation.is_valid());
        assert!(run.report.stages.contains(&Stage::TemplateFallback));
        assert!(!run.report.stages.contains(&Stage::MinimalFallback));
    }

    #[tokio::test]
    async fn invalid_json_falls_back_to_templates() {
        let backend = ScriptedBackend::answering("{\"name\": \"oops\", \"nodes\": [}");
        let orchestrator = orchestrator(backend);
        let run = orchestrator.run(&slack_summary()).await;

        assert_eq!(
            run.report.stages,
            vec![
                Stage::AwaitAi,
                Stage::ParseAi,
                Stage::TemplateFallback,
                Stage::Repair,
                Stage::Validate,
                Stage::Accept,
            ]
        );
        assert_eq!(run.report.source, GenerationSource::Template);
        assert!(!run.is_degraded());
    }

    #[tokio::test]
    async fn prose_only_answer_is_an_ai_failure() {
        let backend = ScriptedBackend::answering("I'm sorry, I can't build that.");
        let orchestrator = orchestrator(backend);
        let run = orchestrator.run(&slack_summary()).await;

        assert_eq!(run.report.source, GenerationSource::Template);
        assert!(
            run.report
                .diagnostics
                .iter()
                .any(|d| d.kind == DiagnosticKind::AiCollaborator)
        );
    }

    #[tokio::test]
    async fn usable_ai_draft_is_repaired_and_accepted() {
        let backend = ScriptedBackend::answering(AI_DRAFT);
        let orchestrator = orchestrator(Arc::clone(&backend));
        let request = GenerationRequest::new(
            "post new signups to slack",
            TriggerKind::Manual,
            ComplexityTier::Simple,
        );
        let run = orchestrator.run(&request).await;

        assert_eq!(backend.calls(), 1);
        assert_eq!(run.report.source, GenerationSource::Ai);
        assert_eq!(
            run.report.stages,
            vec![
                Stage::AwaitAi,
                Stage::ParseAi,
                Stage::Repair,
                Stage::Validate,
                Stage::Accept,
            ]
        );
        assert!(run.report.validation.is_valid());
        assert!(!run.report.applied_fixes.is_empty());
        assert_eq!(run.workflow.name(), Some("Post signups to Slack"));
        assert_eq!(run.workflow.active, Some(false));

        let meta = run.workflow.meta.as_ref().expect("meta");
        assert_eq!(meta.source, Some(GenerationSource::Ai));
        assert_eq!(meta.applied_fixes, run.report.applied_fixes);
        assert!(meta.generator.as_deref().is_some_and(|g| g.starts_with("flowsmith/")));
        assert!(meta.generated_at.is_some());
        assert_eq!(
            meta.request.as_ref().and_then(|r| r.get("triggerType")),
            Some(&json!("manual"))
        );
    }

    #[tokio::test]
    async fn prompt_describes_request_and_catalog() {
        let backend = ScriptedBackend::failing();
        let orchestrator = orchestrator(Arc::clone(&backend));
        orchestrator.run(&slack_summary()).await;

        let requests = backend.requests.lock().expect("requests lock");
        let request = requests.first().expect("one call");
        assert!(request.json_output);
        assert!(request.system.is_some());
        assert!(request.prompt.contains("Description: send a daily slack summary"));
        assert!(request.prompt.contains("Trigger: schedule"));
        assert!(request.prompt.contains("(4-6 nodes)"));
        assert!(request.prompt.contains("- n8n-nodes-base.slack (v1, v2) requires: text"));
        assert!(
            request
                .prompt
                .contains("- n8n-nodes-base.manualTrigger (v1, trigger) requires: nothing")
        );
    }

    #[tokio::test]
    async fn detached_loop_in_ai_draft_is_accepted_with_warnings() {
        let orchestrator = orchestrator(ScriptedBackend::answering(DETACHED_LOOP_DRAFT));
        let request = GenerationRequest::new(
            "post new signups to slack",
            TriggerKind::Manual,
            ComplexityTier::Simple,
        );
        let run = orchestrator.run(&request).await;

        assert_eq!(run.report.source, GenerationSource::Ai);
        assert!(!run.is_degraded());
        assert_eq!(run.workflow.node_count(), 4);
        assert!(run.report.validation.is_valid());
        let warned: Vec<_> = run
            .report
            .validation
            .warnings
            .iter()
            .filter(|d| d.kind == DiagnosticKind::UnreachableNode)
            .filter_map(|d| d.node.as_deref())
            .collect();
        assert_eq!(warned.len(), 2);
        assert!(warned.contains(&"Ping") && warned.contains(&"Pong"));

        let meta = run.workflow.meta.as_ref().expect("meta");
        assert_eq!(meta.source, Some(GenerationSource::Ai));
        assert_eq!(meta.degraded, None);
    }

    #[tokio::test]
    async fn invalid_ai_draft_degrades_by_default() {
        let orchestrator = orchestrator(ScriptedBackend::answering(UNKNOWN_TYPE_DRAFT));
        let request = GenerationRequest::new(
            "beam records somewhere",
            TriggerKind::Webhook,
            ComplexityTier::Simple,
        );
        let run = orchestrator.run(&request).await;

        assert!(run.is_degraded());
        assert_eq!(run.report.source, GenerationSource::Minimal);
        assert_eq!(run.report.stages.last(), Some(&Stage::MinimalFallback));
        assert_eq!(
            run.report
                .stages
                .iter()
                .filter(|stage| **stage == Stage::Repair)
                .count(),
            REPAIR_ROUNDS
        );
        assert_eq!(run.workflow.node_count(), 1);
        assert_eq!(run.workflow.nodes()[0].type_id(), Some(types::WEBHOOK));
        assert!(run.report.validation.is_valid());

        let meta = run.workflow.meta.as_ref().expect("meta");
        assert_eq!(meta.degraded, Some(true));
        assert!(
            meta.diagnostics
                .iter()
                .any(|d| d.starts_with("UnknownNodeTypeError [Beam]"))
        );
    }

    #[tokio::test]
    async fn invalid_ai_draft_can_retry_templates() {
        let orchestrator = orchestrator(ScriptedBackend::answering(UNKNOWN_TYPE_DRAFT))
            .with_config(OrchestratorConfig {
                template_on_invalid_ai: true,
                ..OrchestratorConfig::default()
            });
        let run = orchestrator.run(&slack_summary()).await;

        assert_eq!(run.report.source, GenerationSource::Template);
        assert!(!run.is_degraded());
        assert!(run.report.has_diagnostic(DiagnosticKind::UnknownNodeType));
    }

    #[tokio::test]
    async fn slow_ai_times_out_into_templates() {
        let orchestrator = orchestrator(ScriptedBackend::stalling(Duration::from_secs(5)))
            .with_config(OrchestratorConfig {
                ai_timeout: Duration::from_millis(20),
                ..OrchestratorConfig::default()
            });
        let run = orchestrator.run(&slack_summary()).await;

        assert_eq!(run.report.source, GenerationSource::Template);
        assert!(
            run.report
                .diagnostics
                .iter()
                .any(|d| d.message.contains("timed out"))
        );
        assert!(!run.report.stages.contains(&Stage::ParseAi));
    }

    #[tokio::test]
    async fn empty_description_is_still_total() {
        let backend = ScriptedBackend::failing();
        let orchestrator = orchestrator(Arc::clone(&backend));
        let request = GenerationRequest::new("  ", TriggerKind::Manual, ComplexityTier::Simple);

        let run = orchestrator.run(&request).await;
        assert_eq!(backend.calls(), 0);
        assert_eq!(run.report.source, GenerationSource::Template);
        assert!(run.report.validation.is_valid());

        let result = orchestrator.respond(&request).await;
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn respond_wraps_generated_workflow() {
        let orchestrator = orchestrator(ScriptedBackend::failing());
        let result = orchestrator.respond(&slack_summary()).await;

        let value = serde_json::to_value(&result).expect("serialize");
        assert_eq!(value["success"], true);
        assert_eq!(value["filename"], "send-a-daily-slack-summary.json");
    }

    #[tokio::test]
    async fn every_request_shape_yields_a_reachable_valid_workflow() {
        let orchestrator = orchestrator(ScriptedBackend::failing());
        let registry = Arc::clone(orchestrator.registry());

        for trigger in TriggerKind::ALL {
            for tier in ComplexityTier::ALL {
                for description in ["", "add leads to hubspot", "weekly csv export", "???"] {
                    let request = GenerationRequest::new(description, trigger, tier);
                    let run = orchestrator.run(&request).await;

                    assert!(
                        run.report.validation.is_valid(),
                        "{request:?}: {:?}",
                        run.report.validation.to_lines()
                    );
                    assert!(!run.is_degraded());

                    let triggers: Vec<&str> = run
                        .workflow
                        .nodes()
                        .iter()
                        .filter(|n| n.type_id().is_some_and(|t| registry.is_trigger(t)))
                        .filter_map(|n| n.name())
                        .collect();
                    let graph = ConnectionGraph::build(&run.workflow);
                    let reached = graph.reachable_from(triggers.iter().copied());
                    assert_eq!(reached.len(), run.workflow.node_count(), "{request:?}");
                }
            }
        }
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_computation() {
        let backend = ScriptedBackend::answering(AI_DRAFT);
        let orchestrator =
            orchestrator(Arc::clone(&backend)).with_cache(Arc::new(MemoryCache::new()));
        let request = GenerationRequest::new(
            "post new signups to slack",
            TriggerKind::Manual,
            ComplexityTier::Simple,
        );

        let runs = futures::future::join_all((0..8).map(|_| orchestrator.run(&request))).await;

        assert_eq!(backend.calls(), 1);
        assert_eq!(runs.iter().filter(|run| run.report.cached).count(), 7);
        for run in &runs {
            assert_eq!(run.workflow.name(), Some("Post signups to Slack"));
            assert_eq!(run.report.source, GenerationSource::Ai);
        }
    }

    #[tokio::test]
    async fn degraded_results_are_not_cached() {
        let backend = ScriptedBackend::answering(UNKNOWN_TYPE_DRAFT);
        let orchestrator =
            orchestrator(Arc::clone(&backend)).with_cache(Arc::new(MemoryCache::new()));
        let request =
            GenerationRequest::new("beam it", TriggerKind::Manual, ComplexityTier::Simple);

        assert!(orchestrator.run(&request).await.is_degraded());
        assert!(orchestrator.run(&request).await.is_degraded());
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn independent_requests_run_in_parallel() {
        let orchestrator = Arc::new(orchestrator(ScriptedBackend::failing()));
        let handles: Vec<_> = ["add leads to hubspot", "send a slack alert", "sync a sheet"]
            .into_iter()
            .map(|description| {
                let orchestrator = Arc::clone(&orchestrator);
                tokio::spawn(async move {
                    let request = GenerationRequest::new(
                        description,
                        TriggerKind::Webhook,
                        ComplexityTier::Complex,
                    );
                    orchestrator.run(&request).await
                })
            })
            .collect();

        for handle in handles {
            let run = handle.await.expect("task");
            assert!(run.report.validation.is_valid());
            assert!(run.workflow.node_count() >= 7);
        }
    }
}
