//! Gate verdict types shared by the plan and audit engines.
//!
//! Every rubric gate returns exactly one [`GateResult`]. Gates are total over
//! their input domain: malformed or missing optional data degrades to `pass`
//! or `warn` rather than an error, and only a missing required signal
//! produces `fail`.

use serde::{Deserialize, Serialize};

/// Status of a single rubric gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    /// Gate passed
    Pass,
    /// Gate found issues worth surfacing but not blocking
    Warn,
    /// Gate failed
    Fail,
}

impl GateStatus {
    /// Whether this status should block a publish decision.
    ///
    /// Only `fail` blocks; `warn` is informational.
    pub fn is_blocking(&self) -> bool {
        matches!(self, GateStatus::Fail)
    }
}

impl std::fmt::Display for GateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateStatus::Pass => write!(f, "pass"),
            GateStatus::Warn => write!(f, "warn"),
            GateStatus::Fail => write!(f, "fail"),
        }
    }
}

/// The verdict of a single rubric gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResult {
    /// Stable identifier of the gate ("G1".."G7" for plan gates,
    /// "GA1".."GA6" for content-audit gates)
    pub gate: String,
    /// The verdict
    pub status: GateStatus,
    /// Human-readable message describing the result
    pub message: String,
    /// Descriptions of recommended or applied fixes, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied_fixes: Vec<String>,
}

impl GateResult {
    /// Create a passing gate result.
    pub fn pass(gate: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            gate: gate.into(),
            status: GateStatus::Pass,
            message: message.into(),
            applied_fixes: Vec::new(),
        }
    }

    /// Create a warning gate result.
    pub fn warn(gate: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            gate: gate.into(),
            status: GateStatus::Warn,
            message: message.into(),
            applied_fixes: Vec::new(),
        }
    }

    /// Create a failing gate result.
    pub fn fail(gate: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            gate: gate.into(),
            status: GateStatus::Fail,
            message: message.into(),
            applied_fixes: Vec::new(),
        }
    }

    /// Attach fix descriptions to this result.
    pub fn with_fixes(mut self, fixes: Vec<String>) -> Self {
        self.applied_fixes = fixes;
        self
    }

    /// Check if this gate passed.
    pub fn is_pass(&self) -> bool {
        self.status == GateStatus::Pass
    }

    /// Check if this gate failed.
    pub fn is_fail(&self) -> bool {
        self.status == GateStatus::Fail
    }
}
