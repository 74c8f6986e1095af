//! Gate checking for keyword plans.
//!
//! [`PlanGateEngine`] evaluates a [`KeywordPlanRecord`] against the seven
//! plan gates and aggregates a 0-100 quality score plus three auxiliary
//! ratios. The engine is a pure function of the record and the injected
//! rubric catalog; a failing report never aborts anything by itself, the
//! caller decides whether to block the publish.

use crate::gate::{GateResult, GateStatus};
use crate::plan::record::{KeywordPlanRecord, MediaKind, SearchIntent};
use crate::rubric::RubricCatalog;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// The aggregated verdict for one keyword plan.
///
/// Plain and JSON-serializable; callers persist it verbatim alongside the
/// plan record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordPlanGateReport {
    /// Version label of the rubric the plan was scored against
    pub rubric_version: String,
    /// One result per gate, keyed by gate id
    pub gate_report: BTreeMap<String, GateResult>,
    /// 0-100 aggregate; each fail subtracts the gate penalty, each warn half
    pub quality_score: u32,
    /// Fraction of comparable section pairs violating the overlap tolerance
    pub duplication_score: f64,
    /// Fraction of the forbidden-term vocabulary present in the section plans
    pub pricing_risk_score: f64,
    /// Fraction of sections that carry any include-terms
    pub coverage_score: f64,
}

impl KeywordPlanGateReport {
    /// Whether any gate failed.
    pub fn has_failures(&self) -> bool {
        self.gate_report.values().any(|r| r.is_fail())
    }

    /// Ids of failing gates, in id order.
    pub fn failed_gates(&self) -> Vec<&str> {
        self.gate_report
            .values()
            .filter(|r| r.is_fail())
            .map(|r| r.gate.as_str())
            .collect()
    }
}

/// Evaluates keyword plans against the rubric's seven plan gates.
pub struct PlanGateEngine {
    catalog: RubricCatalog,
}

impl PlanGateEngine {
    /// Create an engine bound to a rubric catalog.
    pub fn new(catalog: RubricCatalog) -> Self {
        Self { catalog }
    }

    /// The rubric this engine scores against.
    pub fn catalog(&self) -> &RubricCatalog {
        &self.catalog
    }

    /// Run all seven gates and aggregate the report.
    pub fn evaluate(&self, plan: &KeywordPlanRecord) -> KeywordPlanGateReport {
        let results = vec![
            self.check_intent_alignment(plan),
            self.check_boundary_respect(plan),
            self.check_cluster_coverage(plan),
            self.check_section_overlap(plan),
            self.check_faq_dedup(plan),
            self.check_anchor_validity(plan),
            self.check_media_budget(plan),
        ];

        let mut quality_score: u32 = 100;
        for result in &results {
            let penalty = self.catalog.gate_penalty(&result.gate);
            match result.status {
                GateStatus::Fail => quality_score = quality_score.saturating_sub(penalty),
                GateStatus::Warn => quality_score = quality_score.saturating_sub(penalty / 2),
                GateStatus::Pass => {}
            }
        }

        let report = KeywordPlanGateReport {
            rubric_version: self.catalog.version.clone(),
            gate_report: results.into_iter().map(|r| (r.gate.clone(), r)).collect(),
            quality_score,
            duplication_score: self.duplication_score(plan),
            pricing_risk_score: self.pricing_risk_score(plan),
            coverage_score: self.term_coverage_score(plan),
        };
        debug!(
            page_id = %plan.page_id,
            quality_score = report.quality_score,
            "keyword plan evaluated"
        );
        report
    }

    /// G1: the primary intent must be present and in the allowed set.
    pub fn check_intent_alignment(&self, plan: &KeywordPlanRecord) -> GateResult {
        match plan.primary_intent.as_deref().map(str::trim) {
            None | Some("") => GateResult::fail("G1", "Primary search intent is missing"),
            Some(raw) => match raw.parse::<SearchIntent>() {
                Ok(intent) => {
                    GateResult::pass("G1", format!("Primary intent '{intent}' is allowed"))
                }
                Err(()) => GateResult::fail(
                    "G1",
                    format!("Primary intent '{raw}' is not in the allowed set"),
                ),
            },
        }
    }

    /// G2: headings and boundaries must not mention pricing terms.
    pub fn check_boundary_respect(&self, plan: &KeywordPlanRecord) -> GateResult {
        let mut haystacks = plan.heading_plan.flatten_strings();
        haystacks.push(serde_json::to_string(&plan.boundaries).unwrap_or_default());

        let mut violations = Vec::new();
        for text in &haystacks {
            let lower = text.to_lowercase();
            for term in self.catalog.forbidden_pricing_terms() {
                if lower.contains(&term.to_lowercase()) {
                    violations.push(format!("'{}' in \"{}\"", term, truncate(text, 60)));
                }
            }
        }

        if violations.is_empty() {
            GateResult::pass("G2", "No forbidden pricing terms in headings or boundaries")
        } else {
            let examples: Vec<&str> = violations.iter().take(3).map(String::as_str).collect();
            GateResult::fail(
                "G2",
                format!(
                    "{} pricing-term violation(s): {}",
                    violations.len(),
                    examples.join("; ")
                ),
            )
        }
    }

    /// G3: enough head queries must be mapped to a section target.
    pub fn check_cluster_coverage(&self, plan: &KeywordPlanRecord) -> GateResult {
        let total_heads: usize = plan
            .query_clusters
            .iter()
            .map(|c| c.head_queries.len())
            .sum();
        if plan.query_clusters.is_empty() || total_heads == 0 {
            return GateResult::warn("G3", "No query clusters or head queries to measure");
        }

        let mapped_heads: usize = plan
            .query_clusters
            .iter()
            .filter(|c| c.section_target.as_deref().is_some_and(|t| !t.is_empty()))
            .map(|c| c.head_queries.len())
            .sum();
        let coverage = mapped_heads as f64 / total_heads as f64;
        let minimum = self.catalog.thresholds.min_cluster_coverage;

        if coverage < minimum {
            GateResult::fail(
                "G3",
                format!(
                    "Cluster coverage {coverage:.2} is below the {minimum:.2} minimum \
                     ({mapped_heads}/{total_heads} head queries mapped)"
                ),
            )
        } else {
            GateResult::pass(
                "G3",
                format!("{mapped_heads}/{total_heads} head queries mapped to sections"),
            )
        }
    }

    /// G4: include-term sets of different sections must not overlap too much.
    pub fn check_section_overlap(&self, plan: &KeywordPlanRecord) -> GateResult {
        let (violations, total_pairs) = self.overlap_violations(plan);

        if total_pairs == 0 {
            return GateResult::pass("G4", "Fewer than two sections with include-terms");
        }
        if violations.is_empty() {
            return GateResult::pass(
                "G4",
                format!("No term overlap above tolerance across {total_pairs} pair(s)"),
            );
        }

        let aggregate = violations.len() as f64 / total_pairs as f64;
        let threshold = self.catalog.thresholds.max_term_overlap;
        let detail = violations
            .iter()
            .take(3)
            .map(|(a, b, ratio)| format!("{a}<->{b} at {ratio:.2}"))
            .collect::<Vec<_>>()
            .join("; ");
        let message = format!(
            "{} of {} section pair(s) overlap above {:.2}: {}",
            violations.len(),
            total_pairs,
            threshold,
            detail
        );

        if aggregate > threshold {
            GateResult::fail("G4", message)
        } else {
            GateResult::warn("G4", message)
        }
    }

    /// G5: section FAQ questions must not duplicate PAA questions.
    pub fn check_faq_dedup(&self, plan: &KeywordPlanRecord) -> GateResult {
        let paa: HashSet<String> = plan
            .query_clusters
            .iter()
            .flat_map(|c| c.paa_questions.iter())
            .map(|q| normalize_question(q))
            .filter(|q| !q.is_empty())
            .collect();
        if paa.is_empty() {
            return GateResult::pass("G5", "No People Also Ask questions to compare against");
        }

        let mut duplicates = Vec::new();
        for (code, section_plan) in &plan.section_plans {
            for question in &section_plan.faq_questions {
                if paa.contains(&normalize_question(question)) {
                    duplicates.push(format!("{code}: \"{}\"", truncate(question, 60)));
                }
            }
        }

        match duplicates.len() {
            0 => GateResult::pass("G5", "No FAQ question duplicates a PAA question"),
            1..=2 => GateResult::warn(
                "G5",
                format!("{} FAQ/PAA duplicate(s): {}", duplicates.len(), duplicates.join("; ")),
            ),
            n => GateResult::fail(
                "G5",
                format!(
                    "{n} FAQ/PAA duplicates: {}",
                    duplicates
                        .iter()
                        .take(3)
                        .map(String::as_str)
                        .collect::<Vec<_>>()
                        .join("; ")
                ),
            ),
        }
    }

    /// G6: recommended anchors must use an allowed path prefix.
    pub fn check_anchor_validity(&self, plan: &KeywordPlanRecord) -> GateResult {
        let anchors = &plan.seo_brief.recommended_anchors;
        if anchors.is_empty() {
            return GateResult::pass("G6", "No anchors recommended");
        }

        let invalid: Vec<&String> = anchors
            .iter()
            .filter(|anchor| {
                !self
                    .catalog
                    .allowed_anchor_prefixes()
                    .iter()
                    .any(|prefix| anchor.starts_with(prefix.as_str()))
            })
            .collect();

        if invalid.is_empty() {
            GateResult::pass(
                "G6",
                format!("All {} recommended anchor(s) use allowed prefixes", anchors.len()),
            )
        } else {
            let shown = invalid
                .iter()
                .take(3)
                .map(|a| truncate(a, 60))
                .collect::<Vec<_>>()
                .join(", ");
            GateResult::fail(
                "G6",
                format!("{} anchor(s) outside allowed prefixes: {shown}", invalid.len()),
            )
        }
    }

    /// G7: summed image budget must stay within the configured maximum.
    pub fn check_media_budget(&self, plan: &KeywordPlanRecord) -> GateResult {
        let mut image_cost: u32 = 0;
        let mut mispriced = Vec::new();
        for (code, section_plan) in &plan.section_plans {
            for slot in &section_plan.media_slots {
                if slot.kind == MediaKind::Image {
                    image_cost += slot.budget_cost;
                } else if slot.kind.budget_exempt() && slot.budget_cost > 0 {
                    mispriced.push(format!("{code} carries a zero-cost slot costing {}", slot.budget_cost));
                }
            }
        }

        let max_budget = self.catalog.thresholds.max_image_budget;
        if image_cost > max_budget {
            let mut message =
                format!("Image budget {image_cost} exceeds the maximum of {max_budget}");
            if !mispriced.is_empty() {
                message.push_str(&format!("; {} mispriced zero-cost slot(s)", mispriced.len()));
            }
            GateResult::fail("G7", message)
        } else if !mispriced.is_empty() {
            GateResult::warn(
                "G7",
                format!("{} mispriced zero-cost slot(s): {}", mispriced.len(), mispriced.join("; ")),
            )
        } else {
            GateResult::pass(
                "G7",
                format!("Image budget {image_cost} within the maximum of {max_budget}"),
            )
        }
    }

    /// Fraction of comparable section pairs whose include-term overlap
    /// exceeds the tolerance. Reuses the G4 pair logic across all sections.
    pub fn duplication_score(&self, plan: &KeywordPlanRecord) -> f64 {
        let (violations, total_pairs) = self.overlap_violations(plan);
        if total_pairs == 0 {
            return 0.0;
        }
        violations.len() as f64 / total_pairs as f64
    }

    /// Fraction of the forbidden-term vocabulary that appears anywhere in the
    /// serialized section-term plans.
    ///
    /// The denominator is the full forbidden-term list length, so the score
    /// is bounded by vocabulary size rather than occurrence density;
    /// downstream tolerances are tuned against exactly this.
    pub fn pricing_risk_score(&self, plan: &KeywordPlanRecord) -> f64 {
        let terms = self.catalog.forbidden_pricing_terms();
        if terms.is_empty() {
            return 0.0;
        }
        let blob = serde_json::to_string(&plan.section_plans)
            .unwrap_or_default()
            .to_lowercase();
        let hits = terms
            .iter()
            .filter(|term| blob.contains(&term.to_lowercase()))
            .count();
        hits as f64 / terms.len() as f64
    }

    /// Fraction of planned sections that carry any include-terms.
    pub fn term_coverage_score(&self, plan: &KeywordPlanRecord) -> f64 {
        if plan.section_plans.is_empty() {
            return 0.0;
        }
        let covered = plan
            .section_plans
            .values()
            .filter(|p| !p.include_terms.is_empty())
            .count();
        covered as f64 / plan.section_plans.len() as f64
    }

    /// Pairwise overlap violations among sections with include-terms.
    ///
    /// Returns the violating pairs and the total number of comparable pairs.
    fn overlap_violations(&self, plan: &KeywordPlanRecord) -> (Vec<(String, String, f64)>, usize) {
        let term_sets: Vec<(&String, HashSet<String>)> = plan
            .section_plans
            .iter()
            .filter(|(_, p)| !p.include_terms.is_empty())
            .map(|(code, p)| {
                let set: HashSet<String> = p
                    .include_terms
                    .iter()
                    .map(|t| t.trim().to_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect();
                (code, set)
            })
            .collect();

        let threshold = self.catalog.thresholds.max_term_overlap;
        let mut violations = Vec::new();
        let mut total_pairs = 0usize;
        for i in 0..term_sets.len() {
            for j in (i + 1)..term_sets.len() {
                let (code_a, set_a) = &term_sets[i];
                let (code_b, set_b) = &term_sets[j];
                if set_a.is_empty() || set_b.is_empty() {
                    continue;
                }
                total_pairs += 1;
                let ratio = overlap_ratio(set_a, set_b);
                if ratio > threshold {
                    violations.push(((*code_a).clone(), (*code_b).clone(), ratio));
                }
            }
        }
        (violations, total_pairs)
    }
}

/// Overlap ratio of two non-empty term sets: |intersection| / min(|A|, |B|).
fn overlap_ratio(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let smaller = a.len().min(b.len());
    intersection as f64 / smaller as f64
}

/// Strip `?!.`, collapse whitespace, lower-case.
fn normalize_question(question: &str) -> String {
    let cleaned: String = question
        .chars()
        .filter(|c| !matches!(c, '?' | '!' | '.'))
        .collect();
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}…")
    }
}
