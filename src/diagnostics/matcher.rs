use super::catalog;
use super::pattern::{Diagnosis, ErrorPattern, PatternError};
use crate::report::Phase;
use std::collections::HashSet;
use tracing::debug;

/// Immutable pattern catalog plus the scoring algorithm
///
/// Built once through [`PatternMatcherBuilder`] and shared read-only afterwards. Patterns
/// keep their registration order; on equal scores the earlier-registered pattern wins, and
/// [`diagnose_all`](Self::diagnose_all) keeps registration order among equal confidences.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    patterns: Vec<ErrorPattern>,
}

impl PatternMatcher {
    pub fn builder() -> PatternMatcherBuilder {
        PatternMatcherBuilder::new()
    }

    /// Matcher loaded with the built-in catalog only
    pub fn with_builtin_catalog() -> Result<Self, PatternError> {
        Ok(Self::builder().with_builtin_catalog()?.build())
    }

    pub fn patterns(&self) -> &[ErrorPattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    fn scored<'a>(
        &'a self,
        output: &str,
        service: &'a str,
        phase: Phase,
    ) -> Option<impl Iterator<Item = (&'a ErrorPattern, u32)> + 'a> {
        if output.trim().is_empty() {
            return None;
        }
        let raw = output.to_string();
        let lower = output.to_lowercase();

        Some(
            self.patterns
                .iter()
                .filter(move |p| p.applies_to(service, phase))
                .map(move |p| (p, p.score(&raw, &lower)))
                .filter(|(_, score)| *score > 0),
        )
    }

    /// Best single diagnosis for the output, if any pattern matches
    pub fn diagnose(&self, output: &str, service: &str, phase: Phase) -> Option<Diagnosis> {
        let mut best: Option<(&ErrorPattern, u32)> = None;
        for (pattern, score) in self.scored(output, service, phase)? {
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((pattern, score)),
            }
        }

        let (pattern, score) = best?;
        debug!(pattern = %pattern.name, score, service, %phase, "Matched diagnostic pattern");
        Some(pattern.diagnosis())
    }

    /// Every matching diagnosis, highest confidence first
    pub fn diagnose_all(&self, output: &str, service: &str, phase: Phase) -> Vec<Diagnosis> {
        let mut diagnoses: Vec<Diagnosis> = match self.scored(output, service, phase) {
            Some(scored) => scored.map(|(p, _)| p.diagnosis()).collect(),
            None => return Vec::new(),
        };
        // sort_by is stable, so equal confidences keep registration order
        diagnoses.sort_by(|a, b| b.confidence.cmp(&a.confidence));
        diagnoses
    }

    /// Score of a single named pattern, zero when filtered out or unmatched
    pub fn score(&self, name: &str, output: &str, service: &str, phase: Phase) -> u32 {
        self.scored(output, service, phase)
            .and_then(|mut scored| scored.find(|(p, _)| p.name == name))
            .map(|(_, score)| score)
            .unwrap_or(0)
    }
}

/// Assembles a [`PatternMatcher`] during setup
#[derive(Debug, Default)]
pub struct PatternMatcherBuilder {
    patterns: Vec<ErrorPattern>,
    names: HashSet<String>,
}

impl PatternMatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_catalog(mut self) -> Result<Self, PatternError> {
        for pattern in catalog::builtin_patterns()? {
            self = self.add_pattern(pattern)?;
        }
        Ok(self)
    }

    pub fn add_pattern(mut self, pattern: ErrorPattern) -> Result<Self, PatternError> {
        if !self.names.insert(pattern.name.clone()) {
            return Err(PatternError::DuplicateName(pattern.name));
        }
        self.patterns.push(pattern);
        Ok(self)
    }

    pub fn build(self) -> PatternMatcher {
        debug!(patterns = self.patterns.len(), "Pattern matcher assembled");
        PatternMatcher {
            patterns: self.patterns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Confidence;

    fn pattern(name: &str, confidence: Confidence) -> ErrorPattern {
        ErrorPattern::new(name, format!("{name} hint"), format!("{name} fix"), confidence)
    }

    #[test]
    fn test_blank_output_never_matches() {
        let matcher = PatternMatcher::builder()
            .add_pattern(pattern("any", Confidence::High))
            .unwrap()
            .build();
        assert!(matcher.diagnose("", "core", Phase::Build).is_none());
        assert!(matcher.diagnose("  \n\t", "core", Phase::Build).is_none());
        assert!(matcher.diagnose_all(" ", "core", Phase::Build).is_empty());
    }

    #[test]
    fn test_higher_confidence_wins() {
        let matcher = PatternMatcher::builder()
            .add_pattern(pattern("low", Confidence::Low).with_regex("boom").unwrap())
            .unwrap()
            .add_pattern(pattern("high", Confidence::High).with_regex("boom").unwrap())
            .unwrap()
            .build();
        let diagnosis = matcher.diagnose("boom", "core", Phase::Build).unwrap();
        assert_eq!(diagnosis.pattern, "high");
        assert_eq!(diagnosis.confidence, Confidence::High);
        assert!(diagnosis.matched);
    }

    #[test]
    fn test_first_registered_wins_ties() {
        let matcher = PatternMatcher::builder()
            .add_pattern(pattern("first", Confidence::Medium).with_regex("boom").unwrap())
            .unwrap()
            .add_pattern(pattern("second", Confidence::Medium).with_regex("boom").unwrap())
            .unwrap()
            .build();
        assert_eq!(
            matcher.diagnose("boom", "core", Phase::Build).unwrap().pattern,
            "first"
        );
    }

    #[test]
    fn test_diagnose_all_is_stable_by_confidence() {
        let matcher = PatternMatcher::builder()
            .add_pattern(pattern("e1", Confidence::Medium).with_substrings(["boom"]))
            .unwrap()
            .add_pattern(pattern("low", Confidence::Low).with_substrings(["boom"]))
            .unwrap()
            .add_pattern(pattern("e2", Confidence::Medium).with_substrings(["boom"]))
            .unwrap()
            .add_pattern(pattern("high", Confidence::High).with_substrings(["boom"]))
            .unwrap()
            .build();
        let names: Vec<_> = matcher
            .diagnose_all("BOOM", "core", Phase::Build)
            .into_iter()
            .map(|d| d.pattern)
            .collect();
        assert_eq!(names, vec!["high", "e1", "e2", "low"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = PatternMatcher::builder()
            .add_pattern(pattern("dup", Confidence::Low))
            .unwrap()
            .add_pattern(pattern("dup", Confidence::High));
        assert!(matches!(result, Err(PatternError::DuplicateName(name)) if name == "dup"));
    }

    #[test]
    fn test_score_respects_filters() {
        let matcher = PatternMatcher::builder()
            .add_pattern(
                pattern("gw", Confidence::High)
                    .with_regex("boom")
                    .unwrap()
                    .for_service("gateway"),
            )
            .unwrap()
            .build();
        assert_eq!(matcher.score("gw", "boom", "gateway", Phase::Build), 15);
        assert_eq!(matcher.score("gw", "boom", "core", Phase::Build), 0);
    }

    #[test]
    fn test_builtin_catalog_loads() {
        let matcher = PatternMatcher::with_builtin_catalog().unwrap();
        assert!(!matcher.is_empty());
    }
}
