//! # Pipeline Stages
//!
//! State machine for the four-stage bid pipeline.

use serde::{Deserialize, Serialize};

use crate::project::Agent;

/// Stage of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Ingesting the RFP and extracting context
    Historian,
    /// Go/no-go risk analysis
    Gatekeeper,
    /// Drafting the executive summary
    Architect,
    /// Final compliance confirmation
    Auditor,
    /// Pipeline finished
    Complete,
    /// Halted by the Gatekeeper or a critical error
    Halted,
}

impl Stage {
    /// Agent label for the stage, where one exists.
    pub fn agent(&self) -> Option<Agent> {
        match self {
            Stage::Historian => Some(Agent::Historian),
            Stage::Gatekeeper => Some(Agent::Gatekeeper),
            Stage::Architect => Some(Agent::Architect),
            Stage::Auditor => Some(Agent::Auditor),
            Stage::Complete | Stage::Halted => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Complete | Stage::Halted)
    }

    /// 1-based position in the pipeline; `Complete` counts past the end,
    /// `Halted` as 0.
    pub fn number(&self) -> u8 {
        match self {
            Stage::Historian => 1,
            Stage::Gatekeeper => 2,
            Stage::Architect => 3,
            Stage::Auditor => 4,
            Stage::Complete => 5,
            Stage::Halted => 0,
        }
    }
}

/// Per-run pipeline position.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub stage: Stage,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            stage: Stage::Historian,
        }
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the next stage. Terminal stages are absorbing.
    pub fn advance(&mut self) {
        self.stage = match self.stage {
            Stage::Historian => Stage::Gatekeeper,
            Stage::Gatekeeper => Stage::Architect,
            Stage::Architect => Stage::Auditor,
            Stage::Auditor => Stage::Complete,
            Stage::Complete => Stage::Complete,
            Stage::Halted => Stage::Halted,
        };
    }

    /// Halt the pipeline (Gatekeeper no-go or critical error).
    pub fn halt(&mut self) {
        self.stage = Stage::Halted;
    }

    pub fn is_complete(&self) -> bool {
        self.stage.is_terminal()
    }

    pub fn is_success(&self) -> bool {
        self.stage == Stage::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_advance() {
        let mut pipeline = Pipeline::new();
        assert_eq!(pipeline.stage, Stage::Historian);

        pipeline.advance();
        assert_eq!(pipeline.stage, Stage::Gatekeeper);

        pipeline.advance();
        pipeline.advance();
        pipeline.advance();
        assert_eq!(pipeline.stage, Stage::Complete);
        assert!(pipeline.is_success());

        pipeline.advance();
        assert_eq!(pipeline.stage, Stage::Complete);
    }

    #[test]
    fn test_halt_is_absorbing() {
        let mut pipeline = Pipeline::new();
        pipeline.advance();
        pipeline.halt();
        assert_eq!(pipeline.stage, Stage::Halted);
        assert!(pipeline.is_complete());
        assert!(!pipeline.is_success());

        pipeline.advance();
        assert_eq!(pipeline.stage, Stage::Halted);
    }

    #[test]
    fn test_stage_agents() {
        assert_eq!(Stage::Gatekeeper.agent(), Some(Agent::Gatekeeper));
        assert_eq!(Stage::Complete.agent(), None);
    }

    #[test]
    fn test_stage_numbers_follow_pipeline_order() {
        let mut pipeline = Pipeline::new();
        let mut last = 0;
        while !pipeline.is_complete() {
            assert_eq!(pipeline.stage.number(), last + 1);
            last = pipeline.stage.number();
            pipeline.advance();
        }
        assert_eq!(Stage::Complete.number(), 5);
        assert_eq!(Stage::Halted.number(), 0);
    }
}
