//! Deterministic fallbacks used when no generation client is available
//! (disconnected runs) or when a generation call fails mid-run. These are
//! fixed texts, not heuristics: disconnected runs must be reproducible.

/// Context string the Historian synthesizes without a generation client.
pub const SIMULATED_CONTEXT: &str =
    "Detected Logistics RFP. Client: Govt Dept of Transport. Due: Nov 2025.";

/// Context string used when a connected Historian call fails.
pub const DEGRADED_CONTEXT: &str =
    "Client: Unknown (Extracted via Fallback). Requirements: Standard Proposal.";

/// Reason attached to a fail-open verdict when risk analysis never ran.
pub const DEFAULT_GO_REASON: &str = "All constraints met.";

/// Reason attached to a fail-closed verdict when risk analysis is unavailable.
pub const ANALYSIS_UNAVAILABLE_REASON: &str = "Automated risk analysis unavailable.";

/// Keyword that sinks a bid in the deterministic Gatekeeper check.
pub const FORBIDDEN_KEYWORD: &str = "mainframe";

/// Reason attached to a deterministic no-go.
pub const FORBIDDEN_KEYWORD_REASON: &str = "Detected forbidden keyword: 'Mainframe'";

/// Deterministic executive summary, with the strategy woven in when present.
pub fn draft_template(strategy: Option<&str>) -> String {
    let strategy_blurb = match strategy {
        Some(s) if !s.is_empty() => format!(
            "Specifically, we address your focus on \"{s}\" by leveraging our proprietary engine."
        ),
        _ => "We leverage our proprietary autonomous engine.".to_string(),
    };

    format!(
        "EXECUTIVE SUMMARY\n\n\
         BidPilot Solutions is pleased to submit this proposal for the [Project Name].\n\n\
         Based on our analysis of your requirements, we understand that [Client Name] is \
         looking for a partner who can deliver reliability and innovation. {strategy_blurb}\n\n\
         KEY WIN THEMES:\n\
         1. Efficiency: Our solution reduces overhead by 40%.\n\
         2. Compliance: Fully compliant with all stated RFP security mandates.\n\n\
         We look forward to the opportunity to partner with you."
    )
}
