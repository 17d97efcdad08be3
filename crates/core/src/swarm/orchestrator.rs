//! # Swarm Orchestrator
//!
//! Runs the four-stage bid pipeline for one project: Historian ingestion,
//! Gatekeeper go/no-go, Architect drafting, Auditor compliance. Every
//! observable step flows through the [`RunReporter`]; the caller owns the
//! receiving ends and never gets a value back directly.
//!
//! ## Pipeline Flow
//!
//! ```text
//! RFP + strategy → Historian → Gatekeeper ──go──→ Architect → Auditor
//!                                  │
//!                                no-go → halt (status: failed)
//! ```

use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;
use tokio::time::{sleep, Duration};

use crate::genai::TextGenerator;
use crate::project::{Agent, LogKind, ProjectPatch, ProjectStatus, Verdict};
use crate::store::DocumentStore;

use super::fallback;
use super::pipeline::Pipeline;
use super::prompts;
use super::reporter::{RunChannels, RunReporter};

/// Whether a run may reach the generation service and the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Real generation calls, store mirroring enabled
    Connected,
    /// Deterministic local fallbacks only
    Disconnected,
}

/// Policy for a Gatekeeper whose automated risk analysis is unavailable
/// (transport failure or malformed structured output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackVerdict {
    /// Treat the bid as viable and continue (launch behavior)
    #[default]
    FailOpen,
    /// Reject the bid rather than draft without risk analysis
    FailClosed,
}

/// Artificial stage delays, the "thinking" cadence of the terminal view.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    enabled: bool,
}

impl Pacing {
    /// Launch cadence: the delays the terminal view was tuned around.
    pub fn theatrical() -> Self {
        Self { enabled: true }
    }

    /// No delays; tests and CLI runs.
    pub fn instant() -> Self {
        Self { enabled: false }
    }

    async fn pause(&self, millis: u64) {
        if self.enabled {
            sleep(Duration::from_millis(millis)).await;
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::theatrical()
    }
}

/// Configuration for the orchestrator
#[derive(Debug, Clone, Copy, Default)]
pub struct SwarmConfig {
    pub fallback_verdict: FallbackVerdict,
    pub pacing: Pacing,
}

/// Input for one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Target project record (remote id when one exists, else local)
    pub project_id: String,
    pub rfp_text: String,
    /// User strategy / win themes
    pub strategy: Option<String>,
    pub mode: RunMode,
}

/// How a run ended. All detail already went through the channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Draft produced, compliance confirmed
    Completed,
    /// Gatekeeper ruled no-go
    Rejected,
    /// A stage failed with an unhandled error
    Faulted,
}

/// The swarm orchestrator
pub struct Orchestrator {
    config: SwarmConfig,
    generator: Option<Arc<dyn TextGenerator>>,
    store: Option<Arc<dyn DocumentStore>>,
}

/// Gatekeeper decision, resolved before any log mentions it.
#[derive(Debug, Clone)]
struct GateDecision {
    verdict: Verdict,
    reason: String,
}

/// Tri-state result of the automated risk check. `Unavailable` is resolved
/// by [`FallbackVerdict`] in exactly one place, never by a lingering default.
enum GateCheck {
    Decided(GateDecision),
    Unavailable(anyhow::Error),
}

/// Structured output the Gatekeeper prompt requests.
#[derive(Debug, Deserialize)]
struct RawDecision {
    verdict: String,
    #[serde(default)]
    reason: Option<String>,
}

impl Orchestrator {
    pub fn new(config: SwarmConfig) -> Self {
        Self {
            config,
            generator: None,
            store: None,
        }
    }

    /// Attach a generation client for connected runs.
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Attach a remote store mirror for connected runs.
    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Run the pipeline to completion or early termination.
    ///
    /// Fire-and-forget from the caller's perspective: spawn this and watch
    /// the channels. Every failure is absorbed here; the final status patch
    /// always arrives.
    #[tracing::instrument(skip(self, channels), fields(project = %request.project_id))]
    pub async fn run(&self, request: RunRequest, channels: RunChannels) -> RunOutcome {
        let mirror = match request.mode {
            RunMode::Connected => self.store.clone(),
            RunMode::Disconnected => None,
        };
        let reporter = RunReporter::new(&request.project_id, channels, mirror);

        match self.run_stages(&request, &reporter).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "pipeline run faulted");
                reporter
                    .log(Agent::System, LogKind::Error, format!("Critical Error: {e}"))
                    .await;
                reporter
                    .update(ProjectPatch::status(ProjectStatus::Failed))
                    .await;
                RunOutcome::Faulted
            }
        }
    }

    async fn run_stages(
        &self,
        request: &RunRequest,
        reporter: &RunReporter,
    ) -> Result<RunOutcome> {
        let pacing = self.config.pacing;
        let strategy = request
            .strategy
            .as_deref()
            .filter(|s| !s.trim().is_empty());
        // A connected run without a configured client degrades to the
        // deterministic path rather than failing.
        let generator = match request.mode {
            RunMode::Connected => self.generator.clone(),
            RunMode::Disconnected => None,
        };
        let mut pipeline = Pipeline::new();
        reporter.stage(pipeline.stage).await;

        // --- 1. The Historian (Ingestion) ---
        reporter
            .log(
                Agent::System,
                LogKind::Info,
                "Initializing Agent Swarm (v2.2)...",
            )
            .await;
        pacing.pause(800).await;

        reporter
            .log(Agent::Historian, LogKind::Info, "Ingesting RFP content...")
            .await;
        pacing.pause(1500).await;

        if let Some(s) = strategy {
            reporter
                .log(
                    Agent::Historian,
                    LogKind::Info,
                    format!(
                        "Applying Strategic Filter: \"{}...\"",
                        prompts::excerpt(s, prompts::STRATEGY_PREVIEW)
                    ),
                )
                .await;
        }

        let context = match &generator {
            Some(generator) => {
                let prompt = prompts::historian(&request.rfp_text, strategy.unwrap_or(""));
                match generator.generate(&prompt, false).await {
                    Ok(text) => {
                        reporter
                            .log(
                                Agent::Historian,
                                LogKind::Success,
                                "Context extracted using Gemini 2.5 Flash.",
                            )
                            .await;
                        text
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "historian generation failed");
                        reporter
                            .log(
                                Agent::Historian,
                                LogKind::Warning,
                                "API Error. Switching to heuristic analysis.",
                            )
                            .await;
                        fallback::DEGRADED_CONTEXT.to_string()
                    }
                }
            }
            None => {
                pacing.pause(1000).await;
                reporter
                    .log(
                        Agent::Historian,
                        LogKind::Success,
                        format!(
                            "Simulation: Extracted metadata. {}",
                            fallback::SIMULATED_CONTEXT
                        ),
                    )
                    .await;
                if let Some(s) = strategy {
                    pacing.pause(800).await;
                    reporter
                        .log(
                            Agent::Historian,
                            LogKind::Success,
                            format!(
                                "Cross-referencing requirements with Strategy: Found 3 matches for '{s}'."
                            ),
                        )
                        .await;
                }
                fallback::SIMULATED_CONTEXT.to_string()
            }
        };
        pipeline.advance();
        reporter.stage(pipeline.stage).await;

        // --- 2. The Gatekeeper (Go/No-Go) ---
        reporter
            .log(
                Agent::Gatekeeper,
                LogKind::Info,
                "Scanning for \"Deal Breakers\" and Contractual Red Flags...",
            )
            .await;
        pacing.pause(2000).await;

        let decision = match &generator {
            Some(generator) => {
                match automated_risk_check(generator.as_ref(), &request.rfp_text, strategy).await {
                    GateCheck::Decided(decision) => decision,
                    GateCheck::Unavailable(e) => {
                        tracing::warn!(error = %e, "risk analysis unavailable, applying fallback policy");
                        match self.config.fallback_verdict {
                            FallbackVerdict::FailOpen => GateDecision {
                                verdict: Verdict::Go,
                                reason: fallback::DEFAULT_GO_REASON.to_string(),
                            },
                            FallbackVerdict::FailClosed => GateDecision {
                                verdict: Verdict::NoGo,
                                reason: fallback::ANALYSIS_UNAVAILABLE_REASON.to_string(),
                            },
                        }
                    }
                }
            }
            None => self.simulated_risk_check(request, strategy, reporter).await,
        };

        let go = decision.verdict == Verdict::Go;
        reporter
            .log(
                Agent::Gatekeeper,
                if go { LogKind::Success } else { LogKind::Error },
                format!(
                    "VERDICT: {}. Reason: {}",
                    if go { "GO" } else { "NO-GO" },
                    decision.reason
                ),
            )
            .await;
        reporter.update(ProjectPatch::verdict(decision.verdict)).await;

        if !go {
            reporter
                .log(
                    Agent::System,
                    LogKind::Warning,
                    "Process halted by Gatekeeper.",
                )
                .await;
            reporter
                .update(ProjectPatch::status(ProjectStatus::Failed))
                .await;
            pipeline.halt();
            reporter.stage(pipeline.stage).await;
            return Ok(RunOutcome::Rejected);
        }
        pipeline.advance();
        reporter.stage(pipeline.stage).await;

        // --- 3. The Architect (Drafting) ---
        reporter
            .log(
                Agent::Architect,
                LogKind::Info,
                "Drafting Executive Summary. Prioritizing User Win Themes...",
            )
            .await;
        pacing.pause(2500).await;

        let draft = match &generator {
            // A drafting failure has no fallback: it escapes to the
            // top-level guard and fails the run.
            Some(generator) => {
                let prompt =
                    prompts::architect(&request.rfp_text, &context, strategy.unwrap_or(""));
                generator.generate(&prompt, false).await?
            }
            None => fallback::draft_template(strategy),
        };

        reporter
            .log(
                Agent::Architect,
                LogKind::Success,
                "Draft generation complete. Win Themes embedded.",
            )
            .await;
        // Surfaces the draft as soon as it exists; the Auditor only confirms.
        reporter.update(ProjectPatch::draft_ready(draft)).await;
        pipeline.advance();
        reporter.stage(pipeline.stage).await;

        // --- 4. The Auditor (Compliance) ---
        reporter
            .log(
                Agent::Auditor,
                LogKind::Info,
                "Running final compliance scan against 45 rules...",
            )
            .await;
        pacing.pause(1500).await;
        reporter
            .log(
                Agent::Auditor,
                LogKind::Success,
                "Compliance Pass. Formatting verified.",
            )
            .await;

        reporter
            .log(Agent::System, LogKind::Success, "Bid Package Ready.")
            .await;
        pipeline.advance();
        reporter.stage(pipeline.stage).await;

        Ok(RunOutcome::Completed)
    }

    /// Deterministic risk check with illustrative constraint logs.
    async fn simulated_risk_check(
        &self,
        request: &RunRequest,
        strategy: Option<&str>,
        reporter: &RunReporter,
    ) -> GateDecision {
        if request
            .rfp_text
            .to_lowercase()
            .contains(fallback::FORBIDDEN_KEYWORD)
        {
            return GateDecision {
                verdict: Verdict::NoGo,
                reason: fallback::FORBIDDEN_KEYWORD_REASON.to_string(),
            };
        }

        reporter
            .log(
                Agent::Gatekeeper,
                LogKind::Success,
                "Budget Analysis: >$100k projected value.",
            )
            .await;
        self.config.pacing.pause(800).await;
        reporter
            .log(
                Agent::Gatekeeper,
                LogKind::Success,
                "Tech Stack Check: Python/React compatible.",
            )
            .await;
        if strategy.is_some() {
            reporter
                .log(
                    Agent::Gatekeeper,
                    LogKind::Success,
                    "Strategy Alignment Check: 95% Match.",
                )
                .await;
        }

        GateDecision {
            verdict: Verdict::Go,
            reason: fallback::DEFAULT_GO_REASON.to_string(),
        }
    }
}

/// One structured generation call, parsed into a decision. Any transport or
/// parse failure surfaces as `Unavailable` for the policy to resolve.
async fn automated_risk_check(
    generator: &dyn TextGenerator,
    rfp_text: &str,
    strategy: Option<&str>,
) -> GateCheck {
    let prompt = prompts::gatekeeper(rfp_text, strategy.unwrap_or(""));
    let raw = match generator.generate(&prompt, true).await {
        Ok(raw) => raw,
        Err(e) => return GateCheck::Unavailable(e.into()),
    };

    let parsed: RawDecision = match serde_json::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(e) => return GateCheck::Unavailable(e.into()),
    };

    GateCheck::Decided(GateDecision {
        verdict: if parsed.verdict == "go" {
            Verdict::Go
        } else {
            Verdict::NoGo
        },
        reason: parsed
            .reason
            .unwrap_or_else(|| fallback::DEFAULT_GO_REASON.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::GenAiError;
    use crate::swarm::pipeline::Stage;
    use crate::project::{LogEntry, Project};
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const SAMPLE_RFP: &str = "RFP for Enterprise Logistics System. \
        Client: Global Freight Corp. Budget: $150,000. Timeline: 6 months. \
        Requirements: Must use Python, Cloud-Native architecture. \
        No on-premise solutions. Security: ISO 27001 required.";

    struct ScriptedGenerator {
        responses: Mutex<VecDeque<Result<String, GenAiError>>>,
    }

    impl ScriptedGenerator {
        fn new(responses: Vec<Result<String, GenAiError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, _prompt: &str, _structured: bool) -> Result<String, GenAiError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(GenAiError::Empty))
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl crate::store::DocumentStore for BrokenStore {
        async fn create(&self, _project: &Project) -> Result<String, StoreError> {
            Err(StoreError::Rejected("offline".into()))
        }
        async fn update(&self, id: &str, _patch: &ProjectPatch) -> Result<(), StoreError> {
            Err(StoreError::NotFound(id.to_string()))
        }
        async fn append_log(&self, id: &str, _entry: &LogEntry) -> Result<(), StoreError> {
            Err(StoreError::NotFound(id.to_string()))
        }
        async fn get(&self, id: &str) -> Result<Project, StoreError> {
            Err(StoreError::NotFound(id.to_string()))
        }
        async fn list(&self, _o: &str, _l: usize) -> Result<Vec<Project>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn instant_config() -> SwarmConfig {
        SwarmConfig {
            fallback_verdict: FallbackVerdict::FailOpen,
            pacing: Pacing::instant(),
        }
    }

    async fn run_collect(
        orchestrator: Orchestrator,
        rfp: &str,
        strategy: Option<&str>,
        mode: RunMode,
    ) -> (RunOutcome, Vec<LogEntry>, Vec<ProjectPatch>, Vec<Stage>) {
        let (channels, mut receivers) = RunChannels::new();
        let request = RunRequest {
            project_id: "p-1".to_string(),
            rfp_text: rfp.to_string(),
            strategy: strategy.map(str::to_string),
            mode,
        };
        let outcome = orchestrator.run(request, channels).await;

        let mut logs = Vec::new();
        while let Ok(entry) = receivers.log_rx.try_recv() {
            logs.push(entry);
        }
        let mut patches = Vec::new();
        while let Ok(patch) = receivers.patch_rx.try_recv() {
            patches.push(patch);
        }
        let mut stages = Vec::new();
        while let Ok(stage) = receivers.stage_rx.try_recv() {
            stages.push(stage);
        }
        (outcome, logs, patches, stages)
    }

    fn verdict_logs(logs: &[LogEntry]) -> Vec<&LogEntry> {
        logs.iter().filter(|l| l.message.contains("VERDICT")).collect()
    }

    #[tokio::test]
    async fn test_disconnected_go_run_completes() {
        let orchestrator = Orchestrator::new(instant_config());
        let (outcome, logs, patches, _stages) =
            run_collect(orchestrator, SAMPLE_RFP, None, RunMode::Disconnected).await;

        assert_eq!(outcome, RunOutcome::Completed);

        let verdicts = verdict_logs(&logs);
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].kind, LogKind::Success);
        assert!(verdicts[0].message.contains("GO"));

        assert_eq!(patches.len(), 2);
        assert_eq!(patches[0], ProjectPatch::verdict(Verdict::Go));
        assert_eq!(patches[1].status, Some(ProjectStatus::Completed));
        let draft = patches[1].draft.as_deref().unwrap();
        assert!(draft.contains("We leverage our proprietary autonomous engine."));

        assert!(logs.iter().any(|l| l.message == "Bid Package Ready."));
    }

    #[tokio::test]
    async fn test_mainframe_forces_no_go() {
        let orchestrator = Orchestrator::new(instant_config());
        let (outcome, logs, patches, _stages) = run_collect(
            orchestrator,
            "Mainframe integration required",
            None,
            RunMode::Disconnected,
        )
        .await;

        assert_eq!(outcome, RunOutcome::Rejected);

        let gatekeeper_errors: Vec<_> = logs
            .iter()
            .filter(|l| l.agent == Agent::Gatekeeper && l.kind == LogKind::Error)
            .collect();
        assert_eq!(gatekeeper_errors.len(), 1);
        assert!(gatekeeper_errors[0].message.contains("NO-GO"));

        let system_warnings: Vec<_> = logs
            .iter()
            .filter(|l| l.agent == Agent::System && l.kind == LogKind::Warning)
            .collect();
        assert_eq!(system_warnings.len(), 1);

        assert!(!logs.iter().any(|l| l.agent == Agent::Architect));
        assert!(!logs.iter().any(|l| l.agent == Agent::Auditor));

        assert_eq!(patches.len(), 2);
        assert_eq!(patches[0], ProjectPatch::verdict(Verdict::NoGo));
        assert_eq!(patches[1], ProjectPatch::status(ProjectStatus::Failed));
        assert!(patches.iter().all(|p| p.draft.is_none()));
    }

    #[tokio::test]
    async fn test_stage_stream_tracks_full_run() {
        let orchestrator = Orchestrator::new(instant_config());
        let (_outcome, _logs, _patches, stages) =
            run_collect(orchestrator, SAMPLE_RFP, None, RunMode::Disconnected).await;

        assert_eq!(
            stages,
            vec![
                Stage::Historian,
                Stage::Gatekeeper,
                Stage::Architect,
                Stage::Auditor,
                Stage::Complete,
            ]
        );
    }

    #[tokio::test]
    async fn test_stage_stream_halts_on_no_go() {
        let orchestrator = Orchestrator::new(instant_config());
        let (_outcome, _logs, _patches, stages) = run_collect(
            orchestrator,
            "Mainframe integration required",
            None,
            RunMode::Disconnected,
        )
        .await;

        assert_eq!(
            stages,
            vec![Stage::Historian, Stage::Gatekeeper, Stage::Halted]
        );
    }

    #[tokio::test]
    async fn test_forbidden_keyword_is_case_insensitive() {
        let orchestrator = Orchestrator::new(instant_config());
        let (outcome, _logs, patches, _stages) = run_collect(
            orchestrator,
            "Requires MAINFRAME expertise",
            None,
            RunMode::Disconnected,
        )
        .await;
        assert_eq!(outcome, RunOutcome::Rejected);
        assert_eq!(patches[0].verdict, Some(Verdict::NoGo));
    }

    #[tokio::test]
    async fn test_log_ids_strictly_increase() {
        let orchestrator = Orchestrator::new(instant_config());
        let (_outcome, logs, _patches, _stages) = run_collect(
            orchestrator,
            SAMPLE_RFP,
            Some("cloud-native delivery"),
            RunMode::Disconnected,
        )
        .await;

        assert!(logs.len() >= 8);
        for pair in logs.windows(2) {
            assert!(pair[1].id > pair[0].id, "log ids must be monotonic");
        }
    }

    #[tokio::test]
    async fn test_strategy_drives_filter_logs_and_draft_clause() {
        let orchestrator = Orchestrator::new(instant_config());
        let (_outcome, logs, patches, _stages) = run_collect(
            orchestrator,
            SAMPLE_RFP,
            Some("zero-downtime migrations"),
            RunMode::Disconnected,
        )
        .await;

        assert!(logs
            .iter()
            .any(|l| l.message.starts_with("Applying Strategic Filter")));
        assert!(logs
            .iter()
            .any(|l| l.message.contains("Found 3 matches for 'zero-downtime migrations'")));
        assert!(logs
            .iter()
            .any(|l| l.message == "Strategy Alignment Check: 95% Match."));

        let draft = patches[1].draft.as_deref().unwrap();
        assert!(draft.contains("zero-downtime migrations"));
    }

    #[tokio::test]
    async fn test_broken_store_never_changes_outcome_or_local_stream() {
        // Connected without a generator degrades to the deterministic path,
        // so both runs differ only in their mirror.
        let healthy = Orchestrator::new(instant_config()).with_store(Arc::new(MemoryStore::new()));
        let broken = Orchestrator::new(instant_config()).with_store(Arc::new(BrokenStore));

        let (outcome_h, logs_h, patches_h, _stages_h) =
            run_collect(healthy, SAMPLE_RFP, None, RunMode::Connected).await;
        let (outcome_b, logs_b, patches_b, _stages_b) =
            run_collect(broken, SAMPLE_RFP, None, RunMode::Connected).await;

        assert_eq!(outcome_h, RunOutcome::Completed);
        assert_eq!(outcome_b, RunOutcome::Completed);
        assert_eq!(patches_h, patches_b);

        let shape = |logs: &[LogEntry]| -> Vec<(Agent, LogKind, String)> {
            logs.iter()
                .map(|l| (l.agent, l.kind, l.message.clone()))
                .collect()
        };
        assert_eq!(shape(&logs_h), shape(&logs_b));
    }

    #[tokio::test]
    async fn test_connected_run_mirrors_to_store() {
        let store = Arc::new(MemoryStore::new());
        let id = store
            .create(&Project::new("tmp", "user-1", "t", SAMPLE_RFP, None))
            .await
            .unwrap();

        let orchestrator = Orchestrator::new(instant_config()).with_store(store.clone());
        let (channels, _receivers) = RunChannels::new();
        let outcome = orchestrator
            .run(
                RunRequest {
                    project_id: id.clone(),
                    rfp_text: SAMPLE_RFP.to_string(),
                    strategy: None,
                    mode: RunMode::Connected,
                },
                channels,
            )
            .await;

        assert_eq!(outcome, RunOutcome::Completed);
        let mirrored = store.get(&id).await.unwrap();
        assert_eq!(mirrored.status, ProjectStatus::Completed);
        assert_eq!(mirrored.verdict, Verdict::Go);
        assert!(!mirrored.draft.is_empty());
        assert!(!mirrored.logs.is_empty());
    }

    #[tokio::test]
    async fn test_historian_failure_degrades_with_warning() {
        let generator = ScriptedGenerator::new(vec![
            Err(GenAiError::Quota),
            Ok(r#"{"verdict":"go","reason":"Budget fits."}"#.to_string()),
            Ok("GENERATED DRAFT".to_string()),
        ]);
        let orchestrator = Orchestrator::new(instant_config()).with_generator(generator);
        let (outcome, logs, patches, _stages) =
            run_collect(orchestrator, SAMPLE_RFP, None, RunMode::Connected).await;

        assert_eq!(outcome, RunOutcome::Completed);
        assert!(logs
            .iter()
            .any(|l| l.kind == LogKind::Warning
                && l.message == "API Error. Switching to heuristic analysis."));
        assert_eq!(patches[1].draft.as_deref(), Some("GENERATED DRAFT"));
    }

    #[tokio::test]
    async fn test_malformed_gate_output_fails_open_by_default() {
        let generator = ScriptedGenerator::new(vec![
            Ok("historian context".to_string()),
            Ok("not json at all".to_string()),
            Ok("GENERATED DRAFT".to_string()),
        ]);
        let orchestrator = Orchestrator::new(instant_config()).with_generator(generator);
        let (outcome, logs, patches, _stages) =
            run_collect(orchestrator, SAMPLE_RFP, None, RunMode::Connected).await;

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(patches[0].verdict, Some(Verdict::Go));
        let verdicts = verdict_logs(&logs);
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].kind, LogKind::Success);
    }

    #[tokio::test]
    async fn test_fail_closed_policy_rejects_on_gate_failure() {
        let generator = ScriptedGenerator::new(vec![
            Ok("historian context".to_string()),
            Err(GenAiError::Quota),
        ]);
        let config = SwarmConfig {
            fallback_verdict: FallbackVerdict::FailClosed,
            pacing: Pacing::instant(),
        };
        let orchestrator = Orchestrator::new(config).with_generator(generator);
        let (outcome, logs, patches, _stages) =
            run_collect(orchestrator, SAMPLE_RFP, None, RunMode::Connected).await;

        assert_eq!(outcome, RunOutcome::Rejected);
        assert_eq!(patches[0].verdict, Some(Verdict::NoGo));
        assert_eq!(patches[1].status, Some(ProjectStatus::Failed));
        let verdicts = verdict_logs(&logs);
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].kind, LogKind::Error);
        assert!(verdicts[0]
            .message
            .contains("Automated risk analysis unavailable."));
    }

    #[tokio::test]
    async fn test_architect_failure_faults_the_run() {
        let generator = ScriptedGenerator::new(vec![
            Ok("historian context".to_string()),
            Ok(r#"{"verdict":"go","reason":"fine"}"#.to_string()),
            Err(GenAiError::Quota),
        ]);
        let orchestrator = Orchestrator::new(instant_config()).with_generator(generator);
        let (outcome, logs, patches, _stages) =
            run_collect(orchestrator, SAMPLE_RFP, None, RunMode::Connected).await;

        assert_eq!(outcome, RunOutcome::Faulted);
        let last = logs.last().unwrap();
        assert_eq!(last.agent, Agent::System);
        assert_eq!(last.kind, LogKind::Error);
        assert!(last.message.starts_with("Critical Error:"));
        assert_eq!(patches.last().unwrap().status, Some(ProjectStatus::Failed));
    }

    #[tokio::test]
    async fn test_unknown_verdict_string_reads_as_no_go() {
        let generator = ScriptedGenerator::new(vec![
            Ok("historian context".to_string()),
            Ok(r#"{"verdict":"maybe","reason":"uncertain scope"}"#.to_string()),
        ]);
        let orchestrator = Orchestrator::new(instant_config()).with_generator(generator);
        let (outcome, _logs, patches, _stages) =
            run_collect(orchestrator, SAMPLE_RFP, None, RunMode::Connected).await;

        assert_eq!(outcome, RunOutcome::Rejected);
        assert_eq!(patches[0].verdict, Some(Verdict::NoGo));
    }

    #[tokio::test]
    async fn test_disconnected_never_touches_generator_or_store() {
        // A generator scripted to fail immediately proves it is not called.
        let generator = ScriptedGenerator::new(vec![]);
        let orchestrator = Orchestrator::new(instant_config())
            .with_generator(generator)
            .with_store(Arc::new(BrokenStore));
        let (outcome, _logs, patches, _stages) =
            run_collect(orchestrator, SAMPLE_RFP, None, RunMode::Disconnected).await;

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(patches.last().unwrap().status, Some(ProjectStatus::Completed));
    }
}
