use crate::errors::GenerationError;
use crate::wire::{Idea, Variant, KEYWORD_COUNT, MANDATORY_KEYWORDS, TITLE_SUFFIX};

/// Turns raw model text into ideas.
///
/// Only the structure is checked. Counts, suffix split and keyword
/// cardinality are requests to the model and are not enforced here; see
/// [`conformance_report`].
pub fn parse_ideas(raw: &str) -> Result<Vec<Idea>, GenerationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(GenerationError::Empty);
    }

    let ideas: Vec<Idea> =
        serde_json::from_str(text).map_err(|e| GenerationError::Malformed(e.to_string()))?;

    if let Some((i, _)) = ideas
        .iter()
        .enumerate()
        .find(|(_, idea)| idea.object.trim().is_empty() || idea.prompt.trim().is_empty())
    {
        return Err(GenerationError::Malformed(format!(
            "idea {} has an empty object or prompt",
            i + 1
        )));
    }

    Ok(ideas)
}

/// Advisory deviations between a batch and what the variant asked for.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Conformance {
    pub expected_count: usize,
    pub actual_count: usize,
    pub with_suffix: usize,
    /// Ideas whose keyword list is not exactly the requested length.
    pub wrong_keyword_count: usize,
    /// Ideas missing `png` or `transparent background`.
    pub missing_mandatory: usize,
}

impl Conformance {
    pub fn is_clean(&self) -> bool {
        self.warnings().is_empty()
    }

    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.actual_count != self.expected_count {
            out.push(format!(
                "asked for {} ideas, got {}",
                self.expected_count, self.actual_count
            ));
        }
        let half = self.expected_count / 2;
        if self.actual_count == self.expected_count && self.with_suffix != half {
            out.push(format!(
                "{} titles carry the suffix, expected {}",
                self.with_suffix, half
            ));
        }
        if self.wrong_keyword_count > 0 {
            out.push(format!(
                "{} ideas do not have {} keywords",
                self.wrong_keyword_count, KEYWORD_COUNT
            ));
        }
        if self.missing_mandatory > 0 {
            out.push(format!(
                "{} ideas miss a mandatory keyword",
                self.missing_mandatory
            ));
        }
        out
    }
}

/// Measures a parsed batch against the variant's constraints. Never rejects.
pub fn conformance_report(ideas: &[Idea], variant: Variant) -> Conformance {
    let mut report = Conformance {
        expected_count: variant.idea_count(),
        actual_count: ideas.len(),
        with_suffix: ideas
            .iter()
            .filter(|i| i.object.trim_end().ends_with(TITLE_SUFFIX))
            .count(),
        ..Default::default()
    };

    if variant.wants_keywords() {
        for idea in ideas {
            if idea.keywords.len() != KEYWORD_COUNT {
                report.wrong_keyword_count += 1;
            }
            let has_all = MANDATORY_KEYWORDS.iter().all(|m| {
                idea.keywords
                    .iter()
                    .any(|k| k.trim().eq_ignore_ascii_case(m))
            });
            if !has_all {
                report.missing_mandatory += 1;
            }
        }
    }

    report
}
