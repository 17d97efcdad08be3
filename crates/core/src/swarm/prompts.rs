//! Prompt templates bundled at compile time, plus the builders that splice
//! run input into them. RFP text is truncated to a fixed prefix per stage so
//! a pasted 200-page document cannot blow the context window.

/// The Historian - RFP ingestion and context extraction
pub const HISTORIAN: &str = include_str!("defaults/historian.md");

/// The Gatekeeper - go/no-go risk analysis (structured JSON output)
pub const GATEKEEPER: &str = include_str!("defaults/gatekeeper.md");

/// The Architect - executive summary drafting
pub const ARCHITECT: &str = include_str!("defaults/architect.md");

/// RFP prefix the Historian reads.
pub const HISTORIAN_RFP_PREFIX: usize = 5000;
/// RFP prefix the Gatekeeper and Architect read.
pub const ANALYSIS_RFP_PREFIX: usize = 2000;
/// Strategy preview length used in log messages.
pub const STRATEGY_PREVIEW: usize = 50;

/// First `max` characters of `text`, respecting char boundaries.
pub fn excerpt(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn historian(rfp_text: &str, strategy: &str) -> String {
    format!(
        "{HISTORIAN}\nThe user wants to focus on: \"{strategy}\".\n\nText: {}",
        excerpt(rfp_text, HISTORIAN_RFP_PREFIX)
    )
}

pub fn gatekeeper(rfp_text: &str, strategy: &str) -> String {
    format!(
        "{GATEKEEPER}\nUSER STRATEGY/CONSTRAINTS: {strategy}\n\nRFP: {}",
        excerpt(rfp_text, ANALYSIS_RFP_PREFIX)
    )
}

pub fn architect(rfp_text: &str, context: &str, strategy: &str) -> String {
    format!(
        "{ARCHITECT}\nRFP Context: {context}\n\nUser strategy points: \"{strategy}\"\n\nRaw RFP: {}",
        excerpt(rfp_text, ANALYSIS_RFP_PREFIX)
    )
}
