//! Input record types for the keyword-plan gate engine.
//!
//! A [`KeywordPlanRecord`] is a JSON-shaped row projection produced by an
//! upstream planning agent. The engine reads it once and never mutates it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One node of the heading plan.
///
/// The plan arrives as heterogeneous nested JSON: a heading string, an array
/// of sub-plans, or an object mapping slot names to sub-plans. Modeled as a
/// closed recursive variant so traversal is exhaustive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeadingNode {
    /// A single heading string
    Leaf(String),
    /// An ordered list of sub-plans
    List(Vec<HeadingNode>),
    /// Named sub-plans
    Map(BTreeMap<String, HeadingNode>),
}

impl Default for HeadingNode {
    fn default() -> Self {
        HeadingNode::List(Vec::new())
    }
}

impl HeadingNode {
    /// Collect every heading string in the tree, depth-first.
    pub fn flatten_strings(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into(&self, out: &mut Vec<String>) {
        match self {
            HeadingNode::Leaf(text) => out.push(text.clone()),
            HeadingNode::List(items) => {
                for item in items {
                    item.collect_into(out);
                }
            }
            HeadingNode::Map(entries) => {
                for value in entries.values() {
                    value.collect_into(out);
                }
            }
        }
    }
}

/// The search intents a plan is allowed to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchIntent {
    Informational,
    HowTo,
    Diagnostic,
    Comparison,
}

impl std::fmt::Display for SearchIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SearchIntent::Informational => "informational",
            SearchIntent::HowTo => "how-to",
            SearchIntent::Diagnostic => "diagnostic",
            SearchIntent::Comparison => "comparison",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SearchIntent {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "informational" => Ok(SearchIntent::Informational),
            "how-to" => Ok(SearchIntent::HowTo),
            "diagnostic" => Ok(SearchIntent::Diagnostic),
            "comparison" => Ok(SearchIntent::Comparison),
            _ => Err(()),
        }
    }
}

/// A group of head queries with its "People Also Ask" questions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryCluster {
    /// Cluster label
    #[serde(default)]
    pub name: String,
    /// Primary search terms grouped under this cluster
    #[serde(default)]
    pub head_queries: Vec<String>,
    /// Section-type code this cluster is mapped to, if assigned
    #[serde(default)]
    pub section_target: Option<String>,
    /// Associated "People Also Ask" questions
    #[serde(default)]
    pub paa_questions: Vec<String>,
}

/// Kind of a planned media slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Counts against the image budget
    Image,
    Video,
    /// Declared zero-cost
    Table,
    /// Declared zero-cost
    Diagram,
}

impl MediaKind {
    /// Whether this kind is declared zero-cost and must not carry a budget.
    pub fn budget_exempt(&self) -> bool {
        matches!(self, MediaKind::Table | MediaKind::Diagram)
    }
}

/// A planned media slot within a section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSlot {
    /// Media kind
    pub kind: MediaKind,
    /// Cost charged against the page media budget
    #[serde(default)]
    pub budget_cost: u32,
}

/// Term planning for one section of the page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionTermPlan {
    /// Terms the section content must include
    #[serde(default)]
    pub include_terms: Vec<String>,
    /// FAQ questions the section plans to answer
    #[serde(default)]
    pub faq_questions: Vec<String>,
    /// Internal link anchors the section plans to use
    #[serde(default)]
    pub link_anchors: Vec<String>,
    /// Planned media slots
    #[serde(default)]
    pub media_slots: Vec<MediaSlot>,
}

/// Meta and anchor recommendations attached to the plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeoBrief {
    #[serde(default)]
    pub meta_title: String,
    #[serde(default)]
    pub meta_description: String,
    /// Recommended internal anchors, validated by gate G6
    #[serde(default)]
    pub recommended_anchors: Vec<String>,
}

/// A complete keyword plan for one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordPlanRecord {
    /// Identifier of the page the plan targets
    #[serde(default)]
    pub page_id: String,
    /// Primary search intent; free-form here, validated by gate G1
    #[serde(default)]
    pub primary_intent: Option<String>,
    /// Secondary intents, not gated
    #[serde(default)]
    pub secondary_intents: Vec<String>,
    /// Free-form business-rule text, scanned by gate G2
    #[serde(default)]
    pub boundaries: serde_json::Value,
    /// Nested heading plan
    #[serde(default)]
    pub heading_plan: HeadingNode,
    /// Query clusters with their PAA questions
    #[serde(default)]
    pub query_clusters: Vec<QueryCluster>,
    /// Per-section term plans, keyed by section-type code
    #[serde(default)]
    pub section_plans: BTreeMap<String, SectionTermPlan>,
    /// Meta and anchor recommendations
    #[serde(default)]
    pub seo_brief: SeoBrief,
}
