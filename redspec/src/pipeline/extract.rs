//! Best-effort numeric extraction from agent prose
//!
//! A miss is `None`, never an error. Callers must not treat absence as zero.

use regex::Regex;
use std::sync::OnceLock;

static STORY_POINT_TOTAL: OnceLock<Regex> = OnceLock::new();
static VALIDATION_SCORE: OnceLock<Regex> = OnceLock::new();

pub trait ScalarExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Option<u32>;
}

/// First capture group of a regex, parsed as an integer
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    regex: Regex,
    max: Option<u32>,
}

impl PatternExtractor {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            max: None,
        })
    }

    /// Reject values above `max`
    pub fn with_max(mut self, max: u32) -> Self {
        self.max = Some(max);
        self
    }
}

impl ScalarExtractor for PatternExtractor {
    fn extract(&self, text: &str) -> Option<u32> {
        let value = self
            .regex
            .captures(text)?
            .get(1)?
            .as_str()
            .parse::<u32>()
            .ok()?;
        match self.max {
            Some(max) if value > max => None,
            _ => Some(value),
        }
    }
}

/// Number following the word "Total" in a story-point estimate
pub fn story_point_total() -> PatternExtractor {
    PatternExtractor {
        regex: STORY_POINT_TOTAL
            .get_or_init(|| Regex::new(r"Total.*?(\d+)").expect("Invalid regex pattern"))
            .clone(),
        max: None,
    }
}

/// Number following "Score" in a validation report, 0-100
pub fn validation_score() -> PatternExtractor {
    PatternExtractor {
        regex: VALIDATION_SCORE
            .get_or_init(|| Regex::new(r"Score:?\s*(\d+)").expect("Invalid regex pattern"))
            .clone(),
        max: Some(100),
    }
}
