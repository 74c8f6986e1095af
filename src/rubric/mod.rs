//! Rubric catalog: the versioned configuration both engines score against.
//!
//! A [`RubricCatalog`] bundles the pack definitions (which sections a quality
//! tier requires), per-section quality criteria, the generic-phrase and
//! forbidden-pricing-term sets, gate penalty weights and the numeric
//! thresholds used by the scorers. It is constructed once (either from the
//! compiled-in defaults or from a TOML file) and injected into the engines;
//! the engines never mutate it.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// A quality tier selecting one pack definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PackTier {
    /// Baseline content bar for regular product lines
    #[default]
    Standard,
    /// Extended bar with full removal/refit procedures
    Pro,
    /// Strictest bar, adds expert and trust sections
    Eeat,
}

impl PackTier {
    /// Stable lowercase key for this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            PackTier::Standard => "standard",
            PackTier::Pro => "pro",
            PackTier::Eeat => "eeat",
        }
    }
}

impl std::fmt::Display for PackTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PackTier {
    type Err = RubricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(PackTier::Standard),
            "pro" => Ok(PackTier::Pro),
            "eeat" => Ok(PackTier::Eeat),
            other => Err(RubricError::UnknownTier(other.to_string())),
        }
    }
}

/// Section requirements for one quality tier.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackDefinition {
    /// Section-type codes that must be present, in page order
    #[serde(default)]
    pub required_sections: Vec<String>,
    /// Section-type codes that may be present
    #[serde(default)]
    pub optional_sections: Vec<String>,
    /// Minimum acceptable score for a single section
    #[serde(default)]
    pub min_section_score: f64,
    /// Minimum acceptable aggregate score for the page
    #[serde(default)]
    pub min_aggregate_score: f64,
    /// Minimum number of FAQ questions the page must answer
    #[serde(default)]
    pub min_faq_questions: usize,
}

/// The three pack definitions, one per tier.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackSet {
    #[serde(default)]
    pub standard: PackDefinition,
    #[serde(default)]
    pub pro: PackDefinition,
    #[serde(default)]
    pub eeat: PackDefinition,
}

impl PackSet {
    /// Look up the pack for a tier. Total: all three tiers always exist.
    pub fn get(&self, tier: PackTier) -> &PackDefinition {
        match tier {
            PackTier::Standard => &self.standard,
            PackTier::Pro => &self.pro,
            PackTier::Eeat => &self.eeat,
        }
    }
}

/// Quality criteria for one section-type code.
#[derive(Debug, Clone, Deserialize)]
pub struct SectionQualityCriteria {
    /// Minimum content length in characters
    pub min_length: usize,
    /// Minimum word count
    pub min_word_count: usize,
    /// Whether numeric content (torque values, intervals, counts) is mandatory
    #[serde(default)]
    pub require_numeric: bool,
    /// Whether list markup is mandatory
    #[serde(default)]
    pub require_list: bool,
    /// Minimum list-item count when lists are mandatory
    #[serde(default)]
    pub min_list_items: usize,
    /// Penalty weight applied when generic phrasing exceeds the tolerance
    #[serde(default = "default_generic_penalty")]
    pub generic_penalty_weight: f64,
    /// Maximum tolerated generic-phrase ratio
    #[serde(default = "default_max_generic_ratio")]
    pub max_generic_ratio: f64,
}

fn default_generic_penalty() -> f64 {
    1.0
}

fn default_max_generic_ratio() -> f64 {
    0.15
}

/// Penalty (in quality-score points) charged per failing plan gate.
///
/// A `warn` charges half the penalty, floored.
#[derive(Debug, Clone, Deserialize)]
pub struct GateWeights {
    /// G1 intent alignment
    #[serde(default = "d30")]
    pub intent_alignment: u32,
    /// G2 boundary respect
    #[serde(default = "d25")]
    pub boundary_respect: u32,
    /// G3 cluster coverage
    #[serde(default = "d15")]
    pub cluster_coverage: u32,
    /// G4 section overlap
    #[serde(default = "d15")]
    pub section_overlap: u32,
    /// G5 FAQ/PAA dedup
    #[serde(default = "d10")]
    pub faq_dedup: u32,
    /// G6 anchor validity
    #[serde(default = "d10")]
    pub anchor_validity: u32,
    /// G7 media budget
    #[serde(default = "d10")]
    pub media_budget: u32,
}

impl Default for GateWeights {
    fn default() -> Self {
        Self {
            intent_alignment: 30,
            boundary_respect: 25,
            cluster_coverage: 15,
            section_overlap: 15,
            faq_dedup: 10,
            anchor_validity: 10,
            media_budget: 10,
        }
    }
}

fn d30() -> u32 {
    30
}
fn d25() -> u32 {
    25
}
fn d15() -> u32 {
    15
}
fn d10() -> u32 {
    10
}

/// Weight each fix kind contributes to the (unclamped) audit priority score.
#[derive(Debug, Clone, Deserialize)]
pub struct PriorityWeights {
    #[serde(default = "d30")]
    pub missing: u32,
    #[serde(default = "d20")]
    pub low_score: u32,
    #[serde(default = "d10")]
    pub weak_phrases: u32,
    #[serde(default = "d5")]
    pub no_sources: u32,
    #[serde(default = "d15")]
    pub thin_content: u32,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            missing: 30,
            low_score: 20,
            weak_phrases: 10,
            no_sources: 5,
            thin_content: 15,
        }
    }
}

fn d20() -> u32 {
    20
}
fn d5() -> u32 {
    5
}

/// Numeric thresholds shared by the scorers.
#[derive(Debug, Clone, Deserialize)]
pub struct Thresholds {
    /// G3: minimum mapped-head-query coverage
    #[serde(default = "default_min_cluster_coverage")]
    pub min_cluster_coverage: f64,
    /// G4: maximum tolerated include-term overlap between two sections
    #[serde(default = "default_max_term_overlap")]
    pub max_term_overlap: f64,
    /// G7: maximum summed budget cost of image slots
    #[serde(default = "default_max_image_budget")]
    pub max_image_budget: u32,
    /// GA2: sections scoring below this are queued for improvement
    #[serde(default = "default_improve_score")]
    pub improve_score_threshold: f64,
    /// Skip decision: every scored required section must reach this
    #[serde(default = "default_healthy_score")]
    pub healthy_score_threshold: f64,
    /// Skip decision: fraction of required sections that must carry a score
    #[serde(default = "default_skip_coverage")]
    pub min_score_coverage_for_skip: f64,
    /// GA6: a section is thin below this fraction of its minimum length
    #[serde(default = "default_thin_ratio")]
    pub thin_content_ratio: f64,
    /// Dedup extraction discards fragments shorter than this many characters
    #[serde(default = "default_min_dedup_len")]
    pub min_dedup_paragraph_len: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_cluster_coverage: 0.7,
            max_term_overlap: 0.15,
            max_image_budget: 2,
            improve_score_threshold: 70.0,
            healthy_score_threshold: 85.0,
            min_score_coverage_for_skip: 0.9,
            thin_content_ratio: 0.5,
            min_dedup_paragraph_len: 40,
        }
    }
}

fn default_min_cluster_coverage() -> f64 {
    0.7
}
fn default_max_term_overlap() -> f64 {
    0.15
}
fn default_max_image_budget() -> u32 {
    2
}
fn default_improve_score() -> f64 {
    70.0
}
fn default_healthy_score() -> f64 {
    85.0
}
fn default_skip_coverage() -> f64 {
    0.9
}
fn default_thin_ratio() -> f64 {
    0.5
}
fn default_min_dedup_len() -> usize {
    40
}

/// Errors that can occur when loading or validating a rubric catalog.
#[derive(Debug, Error)]
pub enum RubricError {
    /// The rubric file was not found.
    #[error("rubric file not found: {0}")]
    FileNotFound(String),

    /// The rubric file could not be parsed.
    #[error("failed to parse rubric: {0}")]
    ParseError(#[from] ConfigError),

    /// The rubric file path is invalid.
    #[error("invalid rubric path: {0}")]
    InvalidPath(String),

    /// The catalog content is inconsistent.
    #[error("invalid rubric: {0}")]
    Invalid(String),

    /// An unknown tier key was supplied.
    #[error("unknown pack tier: {0}")]
    UnknownTier(String),
}

/// The complete, versioned rubric configuration.
///
/// Fields absent from a loaded file fall back to the builtin values, so a
/// rubric override only has to spell out what it changes.
#[derive(Debug, Clone, Deserialize)]
pub struct RubricCatalog {
    /// Version label of this rubric, recorded so persisted reports can be
    /// traced back to the rubric they were scored against
    #[serde(default = "default_version")]
    pub version: String,
    /// Pack definitions per tier
    #[serde(default = "default_packs")]
    pub packs: PackSet,
    /// Per-section-type quality criteria
    #[serde(default = "default_sections")]
    pub sections: HashMap<String, SectionQualityCriteria>,
    /// Locale-specific boilerplate phrases, matched case-insensitively
    #[serde(default = "default_generic_phrases")]
    pub generic_phrases: Vec<String>,
    /// Pricing terms that must not appear in headings or boundaries
    #[serde(default = "default_forbidden_terms")]
    pub forbidden_pricing_terms: Vec<String>,
    /// Path prefixes an internal anchor is allowed to start with
    #[serde(default = "default_anchor_prefixes")]
    pub allowed_anchor_prefixes: Vec<String>,
    /// Plan-gate penalty weights
    #[serde(default)]
    pub gate_weights: GateWeights,
    /// Audit priority-fix weights
    #[serde(default)]
    pub priority_weights: PriorityWeights,
    /// Shared numeric thresholds
    #[serde(default)]
    pub thresholds: Thresholds,
}

fn default_version() -> String {
    "builtin".to_string()
}

impl Default for RubricCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RubricCatalog {
    /// The compiled-in default catalog.
    ///
    /// Covers the 12 known section-type codes and the three packs. Serves as
    /// the baseline a TOML rubric overrides.
    pub fn builtin() -> Self {
        Self {
            version: default_version(),
            packs: default_packs(),
            sections: default_sections(),
            generic_phrases: default_generic_phrases(),
            forbidden_pricing_terms: default_forbidden_terms(),
            allowed_anchor_prefixes: default_anchor_prefixes(),
            gate_weights: GateWeights::default(),
            priority_weights: PriorityWeights::default(),
            thresholds: Thresholds::default(),
        }
    }

    /// Load a rubric catalog from a TOML file.
    ///
    /// Values absent from the file fall back to the serde defaults above.
    /// Environment variables with the `CONTENTGATE` prefix override file
    /// values, using `__` as the nesting separator
    /// (e.g. `CONTENTGATE__THRESHOLDS__MAX_TERM_OVERLAP=0.2`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, cannot be parsed, or
    /// fails [`RubricCatalog::validate`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RubricError> {
        let path = path.as_ref();

        let path_str = path
            .to_str()
            .ok_or_else(|| RubricError::InvalidPath(format!("{:?}", path)))?;

        if !path.exists() {
            return Err(RubricError::FileNotFound(path_str.to_string()));
        }

        let config = Config::builder()
            .add_source(File::with_name(path_str))
            .add_source(
                Environment::with_prefix("CONTENTGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let catalog: RubricCatalog = config.try_deserialize()?;
        catalog.validate()?;

        Ok(catalog)
    }

    /// Check the catalog for degenerate values that would make gates vacuous.
    pub fn validate(&self) -> Result<(), RubricError> {
        for tier in [PackTier::Standard, PackTier::Pro, PackTier::Eeat] {
            let pack = self.packs.get(tier);
            if pack.required_sections.is_empty() {
                return Err(RubricError::Invalid(format!(
                    "pack '{tier}' has no required sections"
                )));
            }
        }

        let t = &self.thresholds;
        for (name, value) in [
            ("min_cluster_coverage", t.min_cluster_coverage),
            ("max_term_overlap", t.max_term_overlap),
            ("min_score_coverage_for_skip", t.min_score_coverage_for_skip),
            ("thin_content_ratio", t.thin_content_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(RubricError::Invalid(format!(
                    "threshold '{name}' must be within [0, 1], got {value}"
                )));
            }
        }

        if self.thresholds.healthy_score_threshold < self.thresholds.improve_score_threshold {
            return Err(RubricError::Invalid(
                "healthy_score_threshold is below improve_score_threshold".to_string(),
            ));
        }

        Ok(())
    }

    /// Look up the pack definition for a tier. Total over all tiers.
    pub fn pack(&self, tier: PackTier) -> &PackDefinition {
        self.packs.get(tier)
    }

    /// Look up the quality criteria for a section-type code.
    ///
    /// Unknown codes return `None`; scorers skip them rather than erroring.
    pub fn section_criteria(&self, code: &str) -> Option<&SectionQualityCriteria> {
        self.sections.get(code)
    }

    /// The generic-phrase pattern set.
    pub fn generic_phrases(&self) -> &[String] {
        &self.generic_phrases
    }

    /// The forbidden pricing-term list.
    pub fn forbidden_pricing_terms(&self) -> &[String] {
        &self.forbidden_pricing_terms
    }

    /// The allowed internal-anchor path prefixes.
    pub fn allowed_anchor_prefixes(&self) -> &[String] {
        &self.allowed_anchor_prefixes
    }

    /// Penalty charged when the given plan gate fails.
    ///
    /// Unknown gate ids carry no penalty.
    pub fn gate_penalty(&self, gate: &str) -> u32 {
        let w = &self.gate_weights;
        match gate {
            "G1" => w.intent_alignment,
            "G2" => w.boundary_respect,
            "G3" => w.cluster_coverage,
            "G4" => w.section_overlap,
            "G5" => w.faq_dedup,
            "G6" => w.anchor_validity,
            "G7" => w.media_budget,
            _ => 0,
        }
    }
}

fn default_packs() -> PackSet {
    PackSet {
        standard: PackDefinition {
            required_sections: codes(&["S1", "S2", "S3", "S4_DEPOSE", "S5", "S6", "S8"]),
            optional_sections: codes(&["S7", "S_GARAGE"]),
            min_section_score: 60.0,
            min_aggregate_score: 70.0,
            min_faq_questions: 3,
        },
        pro: PackDefinition {
            required_sections: codes(&[
                "S1", "S2", "S3", "S4_DEPOSE", "S4_POSE", "S5", "S6", "S8",
            ]),
            optional_sections: codes(&["S7", "S_COMPARATIF", "S_GARAGE"]),
            min_section_score: 70.0,
            min_aggregate_score: 75.0,
            min_faq_questions: 4,
        },
        eeat: PackDefinition {
            required_sections: codes(&[
                "S1", "S2", "S3", "S4_DEPOSE", "S5", "S6", "S8", "S_EXPERT", "S_GARAGE",
            ]),
            optional_sections: codes(&["S4_POSE", "S7", "S_COMPARATIF"]),
            min_section_score: 75.0,
            min_aggregate_score: 80.0,
            min_faq_questions: 5,
        },
    }
}

fn default_sections() -> HashMap<String, SectionQualityCriteria> {
    let mut sections = HashMap::new();
    sections.insert("S1".to_string(), criteria(800, 120, false, false, 0));
    sections.insert("S2".to_string(), criteria(900, 140, false, true, 3));
    sections.insert("S3".to_string(), criteria(900, 140, false, true, 3));
    sections.insert("S4_DEPOSE".to_string(), criteria(1200, 180, true, true, 5));
    sections.insert("S4_POSE".to_string(), criteria(1200, 180, true, true, 5));
    sections.insert("S5".to_string(), criteria(600, 90, false, true, 4));
    sections.insert("S6".to_string(), criteria(700, 110, true, false, 0));
    sections.insert("S7".to_string(), criteria(800, 120, false, false, 0));
    sections.insert("S8".to_string(), criteria(1000, 150, false, false, 0));
    sections.insert("S_COMPARATIF".to_string(), criteria(700, 100, true, true, 3));
    sections.insert("S_EXPERT".to_string(), criteria(800, 120, false, false, 0));
    sections.insert("S_GARAGE".to_string(), criteria(500, 80, false, false, 0));
    sections
}

fn default_generic_phrases() -> Vec<String> {
    codes(&[
        "il est important de",
        "il est essentiel de",
        "n'hésitez pas à",
        "comme vous le savez",
        "de nos jours",
        "il convient de",
        "dans cet article",
        "en conclusion",
        "pour résumer",
        "vous l'aurez compris",
        "cela va sans dire",
        "faire appel à un professionnel",
    ])
}

fn default_forbidden_terms() -> Vec<String> {
    codes(&[
        "prix",
        "tarif",
        "coût",
        "cout",
        "euro",
        "€",
        "pas cher",
        "promotion",
        "promo",
        "remise",
        "devis",
        "gratuit",
    ])
}

fn default_anchor_prefixes() -> Vec<String> {
    codes(&["/pieces/", "/gamme/", "/blog/", "/guides/"])
}

fn criteria(
    min_length: usize,
    min_word_count: usize,
    require_numeric: bool,
    require_list: bool,
    min_list_items: usize,
) -> SectionQualityCriteria {
    SectionQualityCriteria {
        min_length,
        min_word_count,
        require_numeric,
        require_list,
        min_list_items,
        generic_penalty_weight: default_generic_penalty(),
        max_generic_ratio: default_max_generic_ratio(),
    }
}

fn codes(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_has_twelve_section_codes() {
        let catalog = RubricCatalog::builtin();
        assert_eq!(catalog.sections.len(), 12);
        assert!(catalog.section_criteria("S4_DEPOSE").is_some());
        assert!(catalog.section_criteria("S_GARAGE").is_some());
        assert!(catalog.section_criteria("S99").is_none());
    }

    #[test]
    fn test_builtin_pack_shapes() {
        let catalog = RubricCatalog::builtin();
        assert_eq!(catalog.pack(PackTier::Standard).required_sections.len(), 7);
        assert_eq!(catalog.pack(PackTier::Pro).required_sections.len(), 8);
        assert_eq!(catalog.pack(PackTier::Eeat).required_sections.len(), 9);
        assert_eq!(catalog.pack(PackTier::Eeat).min_faq_questions, 5);
    }

    #[test]
    fn test_builtin_validates() {
        assert!(RubricCatalog::builtin().validate().is_ok());
    }

    #[test]
    fn test_gate_penalty_lookup() {
        let catalog = RubricCatalog::builtin();
        assert_eq!(catalog.gate_penalty("G1"), 30);
        assert_eq!(catalog.gate_penalty("G2"), 25);
        assert_eq!(catalog.gate_penalty("G7"), 10);
        assert_eq!(catalog.gate_penalty("G99"), 0);
    }

    #[test]
    fn test_tier_parse_and_display() {
        assert_eq!("eeat".parse::<PackTier>().unwrap(), PackTier::Eeat);
        assert_eq!(" Pro ".parse::<PackTier>().unwrap(), PackTier::Pro);
        assert!("gold".parse::<PackTier>().is_err());
        assert_eq!(PackTier::Standard.to_string(), "standard");
    }

    #[test]
    fn test_deserialize_partial_toml_uses_defaults() {
        let toml_str = r#"
            version = "2024-q3"

            [packs.standard]
            required_sections = ["S1", "S2"]
            min_section_score = 55.0

            [packs.pro]
            required_sections = ["S1", "S2", "S3"]

            [packs.eeat]
            required_sections = ["S1", "S2", "S3", "S8"]

            [thresholds]
            max_term_overlap = 0.25
        "#;

        let catalog: RubricCatalog = toml::from_str(toml_str).unwrap();
        assert_eq!(catalog.version, "2024-q3");
        assert_eq!(catalog.pack(PackTier::Standard).required_sections.len(), 2);
        assert_eq!(catalog.pack(PackTier::Standard).min_section_score, 55.0);
        assert_eq!(catalog.thresholds.max_term_overlap, 0.25);
        // Untouched thresholds keep their defaults
        assert_eq!(catalog.thresholds.min_cluster_coverage, 0.7);
        assert_eq!(catalog.gate_weights.intent_alignment, 30);
    }

    #[test]
    fn test_omitted_tables_fall_back_to_builtin() {
        let catalog: RubricCatalog = toml::from_str("version = \"slim\"").unwrap();
        assert_eq!(catalog.sections.len(), 12);
        assert!(!catalog.generic_phrases.is_empty());
        assert!(!catalog.forbidden_pricing_terms.is_empty());
        assert!(!catalog.allowed_anchor_prefixes.is_empty());
        assert_eq!(catalog.pack(PackTier::Standard).required_sections.len(), 7);
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn test_load_file_not_found() {
        let result = RubricCatalog::load("nonexistent/rubric.toml");
        assert!(matches!(result, Err(RubricError::FileNotFound(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        write!(
            file,
            r#"
            version = "test-1"

            [packs.standard]
            required_sections = ["S1"]

            [packs.pro]
            required_sections = ["S1", "S2"]

            [packs.eeat]
            required_sections = ["S1", "S2", "S3"]
            "#
        )
        .unwrap();

        let catalog = RubricCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.version, "test-1");
        assert_eq!(catalog.pack(PackTier::Eeat).required_sections.len(), 3);
    }

    #[test]
    fn test_validate_rejects_empty_required() {
        let mut catalog = RubricCatalog::builtin();
        catalog.packs.pro.required_sections.clear();
        let err = catalog.validate().unwrap_err();
        assert!(err.to_string().contains("pro"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_ratio() {
        let mut catalog = RubricCatalog::builtin();
        catalog.thresholds.max_term_overlap = 1.5;
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_score_thresholds() {
        let mut catalog = RubricCatalog::builtin();
        catalog.thresholds.healthy_score_threshold = 50.0;
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_error_display() {
        let err = RubricError::FileNotFound("rubric.toml".to_string());
        assert_eq!(err.to_string(), "rubric file not found: rubric.toml");
    }
}
