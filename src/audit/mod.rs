//! Content audit module.
//!
//! Evaluates the persisted sections of a page against the six content-audit
//! gates, derives an unclamped priority score with a structured fix list,
//! and decides whether a product line is already healthy enough to skip.

pub mod engine;

pub use engine::ContentAuditEngine;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::gate::GateResult;

/// One persisted content section, as projected from storage.
///
/// Absence of a record for a required section type means "missing", not an
/// error; nullable fields simply degrade the gates that need them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentSectionRecord {
    /// Section-type code (e.g. "S1", "S4_DEPOSE")
    pub section_type: String,
    /// Last computed quality score, if the section has been scored
    #[serde(default)]
    pub score: Option<f64>,
    /// Persisted content length in characters
    #[serde(default)]
    pub content_length: Option<usize>,
    /// Raw HTML content
    #[serde(default)]
    pub content: Option<String>,
    /// Source/citation text backing the section
    #[serde(default)]
    pub sources: Option<String>,
}

impl ContentSectionRecord {
    /// Effective content length: the persisted length, or the character
    /// count of the raw content when no length was recorded.
    pub fn effective_length(&self) -> Option<usize> {
        self.content_length
            .or_else(|| self.content.as_ref().map(|c| c.chars().count()))
    }
}

/// The kind of problem a fix addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixIssue {
    /// Required section absent
    Missing,
    /// Section scored below the improvement threshold
    LowScore,
    /// Generic phrasing above the section's tolerance
    WeakPhrases,
    /// No source/citation text
    NoSources,
    /// Content length below the thin-content floor
    ThinContent,
}

/// Whether a fix creates a section or improves an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixKind {
    Create,
    Improve,
}

/// One remediation item produced by the audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityFix {
    /// Section-type code the fix targets
    pub section: String,
    /// Problem kind
    pub issue: FixIssue,
    /// The section's current score, when one is recorded
    #[serde(default)]
    pub current_score: Option<f64>,
    /// Creation vs. improvement
    pub fix_kind: FixKind,
}

/// The full audit verdict for one page.
///
/// Produced fresh on every audit; intended for JSON-blob storage, never
/// incrementally mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    /// Version label of the rubric the page was audited against
    pub rubric_version: String,
    /// Unclamped priority score; higher means more remediation needed
    pub priority_score: u32,
    /// All remediation items, in gate order
    pub fixes: Vec<PriorityFix>,
    /// Required sections to create (from the missing-section gate)
    pub sections_to_create: Vec<String>,
    /// Sections to improve: low-score, weak-phrase and thin-content targets,
    /// deduplicated; source gaps are tracked but excluded
    pub sections_to_improve: Vec<String>,
    /// Recorded score per scored section
    pub section_scores: BTreeMap<String, f64>,
    /// Generic-phrase ratio per section with content
    pub generic_ratios: BTreeMap<String, f64>,
    /// Effective content length per measurable section
    pub content_lengths: BTreeMap<String, usize>,
    /// Required-section coverage in [0, 1]
    pub coverage: f64,
    /// Mean score across present sections (unscored sections count as 0)
    pub avg_score: f64,
    /// One-line summary embedding the headline numbers
    pub summary: String,
    /// One result per audit gate, keyed by gate id
    pub gates: BTreeMap<String, GateResult>,
}

impl AuditReport {
    /// Whether the audit found nothing to create or improve.
    pub fn is_healthy(&self) -> bool {
        self.priority_score == 0
    }

    /// Fixes of one issue kind.
    pub fn fixes_for(&self, issue: FixIssue) -> Vec<&PriorityFix> {
        self.fixes.iter().filter(|f| f.issue == issue).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_length_prefers_recorded() {
        let record = ContentSectionRecord {
            section_type: "S1".to_string(),
            content_length: Some(1200),
            content: Some("<p>court</p>".to_string()),
            ..Default::default()
        };
        assert_eq!(record.effective_length(), Some(1200));
    }

    #[test]
    fn test_effective_length_falls_back_to_content() {
        let record = ContentSectionRecord {
            section_type: "S1".to_string(),
            content: Some("abcdef".to_string()),
            ..Default::default()
        };
        assert_eq!(record.effective_length(), Some(6));
    }

    #[test]
    fn test_effective_length_none_when_unmeasurable() {
        let record = ContentSectionRecord {
            section_type: "S1".to_string(),
            ..Default::default()
        };
        assert_eq!(record.effective_length(), None);
    }

    #[test]
    fn test_fix_issue_serialization() {
        assert_eq!(
            serde_json::to_string(&FixIssue::ThinContent).unwrap(),
            "\"thin_content\""
        );
        assert_eq!(serde_json::to_string(&FixKind::Create).unwrap(), "\"create\"");
    }
}
