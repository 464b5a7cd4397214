//! Verdicts and the single-value evaluator

use serde::{Deserialize, Serialize};

use crate::core::tolerance::ToleranceRule;

/// Outcome of judging a statistic against a tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
    /// Statistic not computable or tolerance missing
    Undetermined,
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        *self == Verdict::Pass
    }

    pub fn is_fail(&self) -> bool {
        *self == Verdict::Fail
    }

    /// Label used in printed reports; undetermined cells show a dash
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Pass => "Pass",
            Verdict::Fail => "Fail",
            Verdict::Undetermined => "—",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Pass => write!(f, "pass"),
            Verdict::Fail => write!(f, "fail"),
            Verdict::Undetermined => write!(f, "undetermined"),
        }
    }
}

/// Judge one statistic against one rule.
///
/// The verdict depends only on the arguments: there is no previous result to
/// keep, so the same inputs always give the same answer.
pub fn evaluate(statistic: Option<f64>, rule: &ToleranceRule) -> Verdict {
    match statistic {
        Some(s) if s.is_finite() => {
            if rule.evaluate(s) {
                Verdict::Pass
            } else {
                Verdict::Fail
            }
        }
        _ => Verdict::Undetermined,
    }
}

/// Like [`evaluate`], for callers whose tolerance may not be configured yet
pub fn evaluate_optional(statistic: Option<f64>, rule: Option<&ToleranceRule>) -> Verdict {
    match rule {
        Some(rule) => evaluate(statistic, rule),
        None => Verdict::Undetermined,
    }
}
