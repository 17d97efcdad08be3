//! # Agent Swarm
//!
//! The four-stage bid pipeline and its supporting pieces:
//!
//! - [`orchestrator`] drives one run end to end
//! - [`pipeline`] tracks stage position
//! - [`prompts`] holds the bundled prompt templates and builders
//! - [`fallback`] holds the deterministic disconnected-mode texts
//! - [`reporter`] is the single write path for logs and patches

pub mod fallback;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod reporter;

pub use orchestrator::{
    FallbackVerdict, Orchestrator, Pacing, RunMode, RunOutcome, RunRequest, SwarmConfig,
};
pub use pipeline::{Pipeline, Stage};
pub use reporter::{RunChannels, RunReceivers, RunReporter};
