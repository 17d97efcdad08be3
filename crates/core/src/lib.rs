//! # BidPilot Core
//!
//! The "Brain" of BidPilot - pipeline orchestration, generation client,
//! and project state for autonomous proposal drafting.
//!
//! ## Architecture
//!
//! - `project` - Domain records (Project, LogEntry, verdict/status enums)
//! - `genai/` - Text generation port and the Gemini REST client
//! - `store/` - Document store port, Firestore REST client, in-memory store
//! - `swarm/` - The four-stage agent pipeline and run reporting
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bidpilot_core::swarm::{Orchestrator, RunChannels, RunMode, RunRequest, SwarmConfig};
//!
//! let orchestrator = Orchestrator::new(SwarmConfig::default());
//! let outcome = orchestrator.run(request, channels).await;
//! ```

pub mod genai;
pub mod project;
pub mod store;
pub mod swarm;
