use crate::report::Phase;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Invalid regex in pattern '{name}': {source}")]
    InvalidRegex {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Pattern '{0}' is already registered")]
    DuplicateName(String),

    #[error("Unknown confidence level: {0}. Valid options: high, medium, low")]
    UnknownConfidence(String),
}

/// Ranked confidence tag attached to every pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn rank(&self) -> u8 {
        match self {
            Confidence::Low => 1,
            Confidence::Medium => 2,
            Confidence::High => 3,
        }
    }

    /// Score added to every pattern that survives filtering
    pub fn bonus(&self) -> u32 {
        match self {
            Confidence::Low => 1,
            Confidence::Medium => 3,
            Confidence::High => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl PartialOrd for Confidence {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Confidence {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Confidence {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Confidence::High),
            "medium" => Ok(Confidence::Medium),
            "low" => Ok(Confidence::Low),
            _ => Err(PatternError::UnknownConfidence(s.to_string())),
        }
    }
}

/// Named failure signature
///
/// A pattern matches when its regex (if any) matches the output and, for substring-only
/// patterns, every required substring is present. A pattern with neither acts as a
/// catch-all for any non-blank output.
#[derive(Debug, Clone)]
pub struct ErrorPattern {
    pub name: String,
    pub regex: Option<Regex>,
    /// Stored lowercased; compared against the lowercased output
    pub substrings: Vec<String>,
    pub service: Option<String>,
    pub phase: Option<Phase>,
    pub hint: String,
    pub suggestion: String,
    pub confidence: Confidence,
}

impl ErrorPattern {
    pub fn new(
        name: impl Into<String>,
        hint: impl Into<String>,
        suggestion: impl Into<String>,
        confidence: Confidence,
    ) -> Self {
        Self {
            name: name.into(),
            regex: None,
            substrings: Vec::new(),
            service: None,
            phase: None,
            hint: hint.into(),
            suggestion: suggestion.into(),
            confidence,
        }
    }

    pub fn with_regex(mut self, expression: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(expression).map_err(|source| PatternError::InvalidRegex {
            name: self.name.clone(),
            source,
        })?;
        self.regex = Some(regex);
        Ok(self)
    }

    pub fn with_substrings<I, S>(mut self, substrings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.substrings = substrings
            .into_iter()
            .map(|s| s.as_ref().to_lowercase())
            .collect();
        self
    }

    pub fn for_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn for_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn is_catch_all(&self) -> bool {
        self.regex.is_none() && self.substrings.is_empty()
    }

    /// Whether the service/phase filters admit this input
    pub fn applies_to(&self, service: &str, phase: Phase) -> bool {
        if let Some(ref wanted) = self.service {
            if wanted != service {
                return false;
            }
        }
        if let Some(wanted) = self.phase {
            if wanted != phase {
                return false;
            }
        }
        true
    }

    /// Scores raw output `raw` and its lowercase form `lower`; zero means no match
    pub fn score(&self, raw: &str, lower: &str) -> u32 {
        let mut score = 0;

        if let Some(ref regex) = self.regex {
            if regex.is_match(raw) {
                score += 10;
            } else if regex.is_match(lower) {
                score += 8;
            } else {
                return 0;
            }
        }

        if !self.substrings.is_empty() {
            let all_present = self.substrings.iter().all(|s| lower.contains(s.as_str()));
            if all_present {
                score += 2 * self.substrings.len() as u32;
            } else if self.regex.is_none() {
                return 0;
            }
        }

        score + self.confidence.bonus()
    }

    pub fn diagnosis(&self) -> Diagnosis {
        Diagnosis {
            pattern: self.name.clone(),
            matched: true,
            hint: self.hint.clone(),
            suggestion: self.suggestion.clone(),
            confidence: self.confidence,
        }
    }
}

/// Hint produced by a successful match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub pattern: String,
    pub matched: bool,
    pub hint: String,
    pub suggestion: String,
    pub confidence: Confidence,
}
