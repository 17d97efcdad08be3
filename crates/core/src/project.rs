//! # Project State
//!
//! Domain records for one proposal run: the project document, its
//! append-only log stream, and the partial-update type the pipeline
//! emits as it progresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Technical lifecycle of a project record.
///
/// Transitions only move forward: `Analyzing` is the starting state and
/// `Completed`/`Failed` are sticky. `Failed` covers both a Gatekeeper
/// rejection and a critical pipeline fault; the business outcome lives in
/// [`Verdict`] so the two can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Pipeline is running
    Analyzing,
    /// Draft produced (set as soon as the draft exists, before the Auditor)
    Completed,
    /// Halted by the Gatekeeper or by a critical error
    Failed,
}

impl ProjectStatus {
    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Failed)
    }
}

/// The Gatekeeper's go/no-go decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    /// Gatekeeper has not ruled yet
    #[default]
    Pending,
    /// Bid is worth pursuing
    Go,
    /// Bid rejected
    NoGo,
}

/// Severity/kind tag on a log entry, used by the terminal view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Info,
    Success,
    Warning,
    Error,
    Code,
}

/// Closed set of agent labels that can author log entries.
///
/// Serialized as the display labels the terminal shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Agent {
    System,
    #[serde(rename = "The Historian")]
    Historian,
    #[serde(rename = "The Gatekeeper")]
    Gatekeeper,
    #[serde(rename = "The Architect")]
    Architect,
    #[serde(rename = "The Auditor")]
    Auditor,
    #[serde(rename = "The Quant")]
    Quant,
}

impl Agent {
    pub fn label(&self) -> &'static str {
        match self {
            Agent::System => "System",
            Agent::Historian => "The Historian",
            Agent::Gatekeeper => "The Gatekeeper",
            Agent::Architect => "The Architect",
            Agent::Auditor => "The Auditor",
            Agent::Quant => "The Quant",
        }
    }
}

/// One line in a run's terminal stream.
///
/// Entries are append-only: ids are monotonic within a run and no entry is
/// ever mutated or removed after emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Monotonic id within the run
    pub id: u64,
    pub agent: Agent,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub kind: LogKind,
}

/// The persisted record representing one run's input, status, and outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Remote store id, or a locally generated placeholder until one exists
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub rfp_text: String,
    /// User strategy / win themes; absent when the field was left blank
    #[serde(default)]
    pub strategy: Option<String>,
    pub status: ProjectStatus,
    pub verdict: Verdict,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub draft: String,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Create a fresh record at the start of a run.
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        title: impl Into<String>,
        rfp_text: impl Into<String>,
        strategy: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            title: title.into(),
            rfp_text: rfp_text.into(),
            strategy: strategy.filter(|s| !s.trim().is_empty()),
            status: ProjectStatus::Analyzing,
            verdict: Verdict::Pending,
            logs: Vec::new(),
            draft: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Apply a partial update from the pipeline.
    ///
    /// Status writes are ignored once a terminal status is reached, so a
    /// late patch can never move a project backward to `Analyzing` or flip
    /// `Failed` into `Completed`.
    pub fn apply(&mut self, patch: &ProjectPatch) {
        if let Some(verdict) = patch.verdict {
            self.verdict = verdict;
        }
        if let Some(draft) = &patch.draft {
            self.draft = draft.clone();
        }
        if let Some(status) = patch.status {
            if !self.status.is_terminal() {
                self.status = status;
            }
        }
    }

    /// Append a log entry, preserving emission order.
    pub fn push_log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
    }
}

/// Partial project update emitted by the pipeline and mirrored to the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<String>,
}

impl ProjectPatch {
    pub fn verdict(verdict: Verdict) -> Self {
        Self {
            verdict: Some(verdict),
            ..Self::default()
        }
    }

    pub fn status(status: ProjectStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// The Architect's single patch: draft plus the completed status.
    pub fn draft_ready(draft: impl Into<String>) -> Self {
        Self {
            draft: Some(draft.into()),
            status: Some(ProjectStatus::Completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.verdict.is_none() && self.status.is_none() && self.draft.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Project {
        Project::new("p-1", "user-1", "RFP Analysis", "Some RFP text", None)
    }

    #[test]
    fn test_new_project_starts_analyzing_and_pending() {
        let p = project();
        assert_eq!(p.status, ProjectStatus::Analyzing);
        assert_eq!(p.verdict, Verdict::Pending);
        assert!(p.logs.is_empty());
        assert!(p.draft.is_empty());
    }

    #[test]
    fn test_blank_strategy_normalizes_to_none() {
        let p = Project::new("p-1", "u", "t", "rfp", Some("   ".to_string()));
        assert_eq!(p.strategy, None);
    }

    #[test]
    fn test_apply_sets_verdict_and_draft() {
        let mut p = project();
        p.apply(&ProjectPatch::verdict(Verdict::Go));
        p.apply(&ProjectPatch::draft_ready("EXECUTIVE SUMMARY"));
        assert_eq!(p.verdict, Verdict::Go);
        assert_eq!(p.draft, "EXECUTIVE SUMMARY");
        assert_eq!(p.status, ProjectStatus::Completed);
    }

    #[test]
    fn test_terminal_status_is_sticky() {
        let mut p = project();
        p.apply(&ProjectPatch::status(ProjectStatus::Failed));
        p.apply(&ProjectPatch::status(ProjectStatus::Completed));
        assert_eq!(p.status, ProjectStatus::Failed);

        p.apply(&ProjectPatch::status(ProjectStatus::Analyzing));
        assert_eq!(p.status, ProjectStatus::Failed);
    }

    #[test]
    fn test_verdict_serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&Verdict::NoGo).unwrap(), "\"no-go\"");
        assert_eq!(serde_json::to_string(&Verdict::Go).unwrap(), "\"go\"");
        assert_eq!(
            serde_json::to_string(&Verdict::Pending).unwrap(),
            "\"pending\""
        );
    }

    #[test]
    fn test_agent_serializes_display_label() {
        let json = serde_json::to_string(&Agent::Historian).unwrap();
        assert_eq!(json, "\"The Historian\"");
        assert_eq!(Agent::Gatekeeper.label(), "The Gatekeeper");
    }

    #[test]
    fn test_patch_skips_absent_fields() {
        let json = serde_json::to_string(&ProjectPatch::verdict(Verdict::Go)).unwrap();
        assert!(json.contains("verdict"));
        assert!(!json.contains("status"));
        assert!(!json.contains("draft"));
    }
}
