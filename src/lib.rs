//! Contentgate - rubric-driven quality gates for generated catalog content.
//!
//! Two engines share one injected [`rubric::RubricCatalog`]:
//!
//! - [`plan::PlanGateEngine`] validates SEO keyword plans against gates
//!   G1-G7 before generation starts.
//! - [`audit::ContentAuditEngine`] audits persisted page sections against
//!   gates GA1-GA6, prices the remediation backlog, and decides when a
//!   product line can be skipped.
//!
//! Both are pure, synchronous functions of their inputs and the catalog:
//! callers fetch the rows, pass them in, and persist the returned report.
//! Within the engines "failure" is always a business-level
//! [`gate::GateResult`] with `fail` status, never an error.

pub mod audit;
pub mod gate;
pub mod logging;
pub mod plan;
pub mod rubric;
pub mod text;
