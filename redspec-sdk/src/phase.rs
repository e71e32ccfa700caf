//! Pipeline phases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the five ordered stages of a pipeline run.
///
/// Declaration order is pipeline order, so `Ord` can be used to reason about
/// which phases may depend on which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    ContextGathering,
    PrdGeneration,
    TechnicalAnalysis,
    DesignTracking,
    ValidationIntegration,
}

impl Phase {
    /// All phases in execution order
    pub const ALL: [Phase; 5] = [
        Phase::ContextGathering,
        Phase::PrdGeneration,
        Phase::TechnicalAnalysis,
        Phase::DesignTracking,
        Phase::ValidationIntegration,
    ];

    /// 1-based position in the pipeline
    pub fn number(self) -> usize {
        match self {
            Phase::ContextGathering => 1,
            Phase::PrdGeneration => 2,
            Phase::TechnicalAnalysis => 3,
            Phase::DesignTracking => 4,
            Phase::ValidationIntegration => 5,
        }
    }

    /// Human-readable title used in progress messages
    pub fn title(self) -> &'static str {
        match self {
            Phase::ContextGathering => "Context Gathering",
            Phase::PrdGeneration => "PRD Generation",
            Phase::TechnicalAnalysis => "Technical Analysis",
            Phase::DesignTracking => "Design & Tracking",
            Phase::ValidationIntegration => "Validation & Integration",
        }
    }

    /// Snake-case tag, identical to the serialized form
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::ContextGathering => "context_gathering",
            Phase::PrdGeneration => "prd_generation",
            Phase::TechnicalAnalysis => "technical_analysis",
            Phase::DesignTracking => "design_tracking",
            Phase::ValidationIntegration => "validation_integration",
        }
    }

    /// Run percentage reported when this phase begins
    pub fn start_percent(self) -> u8 {
        match self {
            Phase::ContextGathering => 10,
            Phase::PrdGeneration => 30,
            Phase::TechnicalAnalysis => 50,
            Phase::DesignTracking => 70,
            Phase::ValidationIntegration => 85,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPhase(pub String);

impl fmt::Display for UnknownPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown phase '{}' (expected 1-5 or one of: {})",
            self.0,
            Phase::ALL.map(Phase::as_str).join(", ")
        )
    }
}

impl std::error::Error for UnknownPhase {}

impl FromStr for Phase {
    type Err = UnknownPhase;

    /// Accepts the snake-case tag or the phase number
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Phase::ALL
            .into_iter()
            .find(|phase| {
                phase.as_str().eq_ignore_ascii_case(needle) || phase.number().to_string() == needle
            })
            .ok_or_else(|| UnknownPhase(s.to_string()))
    }
}
