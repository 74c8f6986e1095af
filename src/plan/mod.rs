//! Keyword-plan data model and gate engine.

pub mod gates;
pub mod record;

pub use gates::{KeywordPlanGateReport, PlanGateEngine};
pub use record::{
    HeadingNode, KeywordPlanRecord, MediaKind, MediaSlot, QueryCluster, SearchIntent,
    SectionTermPlan, SeoBrief,
};
