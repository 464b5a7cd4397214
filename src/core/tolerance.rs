//! Tolerance rules
//!
//! [`ToleranceSpec`] is the unvalidated form read from report files, config
//! and CSV headers. [`ToleranceRule`] is what the evaluator accepts: it can
//! only be built from a closed operator set with a non-negative threshold,
//! and a `±` rule always knows its centre.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Tolerance for `=` comparisons between floats
pub const EQUALITY_EPSILON: f64 = 1e-6;

/// Errors raised when building a tolerance rule
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToleranceError {
    #[error("Invalid tolerance spec: {reason}")]
    InvalidToleranceSpec { reason: String },

    #[error("Unknown tolerance operator '{0}' (expected one of <=, >=, <, >, =, ±)")]
    UnknownOperator(String),
}

impl ToleranceError {
    fn invalid(reason: impl Into<String>) -> Self {
        ToleranceError::InvalidToleranceSpec {
            reason: reason.into(),
        }
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    LessOrEqual,
    GreaterOrEqual,
    Less,
    Greater,
    Equal,
    PlusMinus,
}

impl Operator {
    pub fn all() -> &'static [Operator] {
        &[
            Operator::LessOrEqual,
            Operator::GreaterOrEqual,
            Operator::Less,
            Operator::Greater,
            Operator::Equal,
            Operator::PlusMinus,
        ]
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::LessOrEqual => "<=",
            Operator::GreaterOrEqual => ">=",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::Equal => "=",
            Operator::PlusMinus => "±",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = ToleranceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<=" | "≤" | "=<" => Ok(Operator::LessOrEqual),
            ">=" | "≥" | "=>" => Ok(Operator::GreaterOrEqual),
            "<" => Ok(Operator::Less),
            ">" => Ok(Operator::Greater),
            "=" | "==" => Ok(Operator::Equal),
            "±" | "+-" | "+/-" => Ok(Operator::PlusMinus),
            other => Err(ToleranceError::UnknownOperator(other.to_string())),
        }
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// How the threshold is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdKind {
    /// Same unit as the statistic
    #[default]
    Absolute,
    /// Percent; for `±` the band is this percentage of the centre
    Percentage,
}

/// Tolerance as written in a report, config file or CSV header
///
/// The compact textual form is `<op> <threshold>[%]`, e.g. `"<= 5%"` or
/// `"± 2"`. A `±` spec in compact form has no centre; callers attach one with
/// [`ToleranceSpec::centered_at`].
#[derive(Debug, Clone, PartialEq)]
pub struct ToleranceSpec {
    pub operator: String,
    pub threshold: f64,
    pub threshold_kind: ThresholdKind,
    pub center: Option<f64>,
}

impl ToleranceSpec {
    pub fn new(operator: impl Into<String>, threshold: f64, threshold_kind: ThresholdKind) -> Self {
        Self {
            operator: operator.into(),
            threshold,
            threshold_kind,
            center: None,
        }
    }

    /// Copy of this spec with the `±` centre set
    pub fn centered_at(&self, center: f64) -> Self {
        Self {
            center: Some(center),
            ..self.clone()
        }
    }

    /// Validate into a rule
    pub fn to_rule(&self) -> Result<ToleranceRule, ToleranceError> {
        ToleranceRule::try_from(self)
    }

    pub fn is_plus_minus(&self) -> bool {
        matches!(self.operator.parse(), Ok(Operator::PlusMinus))
    }
}

impl fmt::Display for ToleranceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self
            .operator
            .parse::<Operator>()
            .map(|o| o.symbol().to_string())
            .unwrap_or_else(|_| self.operator.clone());
        let suffix = match self.threshold_kind {
            ThresholdKind::Absolute => "",
            ThresholdKind::Percentage => "%",
        };
        write!(f, "{} {}{}", op, self.threshold, suffix)
    }
}

impl FromStr for ToleranceSpec {
    type Err = ToleranceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let (text, threshold_kind) = match text.strip_suffix('%') {
            Some(rest) => (rest.trim_end(), ThresholdKind::Percentage),
            None => (text, ThresholdKind::Absolute),
        };

        let number_start = text
            .char_indices()
            .find(|(i, c)| {
                c.is_ascii_digit()
                    || *c == '.'
                    || (*c == '-'
                        && !text[..*i].ends_with(|p: char| p == '+' || p == '/')
                        && text[i + 1..].starts_with(|n: char| n.is_ascii_digit()))
            })
            .map(|(i, _)| i)
            .ok_or_else(|| ToleranceError::invalid(format!("no threshold in '{}'", s)))?;

        let (operator, number) = text.split_at(number_start);
        let threshold: f64 = number
            .trim()
            .parse()
            .map_err(|_| ToleranceError::invalid(format!("threshold '{}' is not a number", number.trim())))?;

        Ok(Self {
            operator: operator.trim().to_string(),
            threshold,
            threshold_kind,
            center: None,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct ToleranceSpecFields {
    operator: String,
    threshold: f64,
    #[serde(default)]
    threshold_kind: ThresholdKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    center: Option<f64>,
}

impl Serialize for ToleranceSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.center.is_none() {
            serializer.collect_str(self)
        } else {
            ToleranceSpecFields {
                operator: self.operator.clone(),
                threshold: self.threshold,
                threshold_kind: self.threshold_kind,
                center: self.center,
            }
            .serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for ToleranceSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Compact(String),
            Fields(ToleranceSpecFields),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Compact(s) => s.parse().map_err(serde::de::Error::custom),
            Repr::Fields(f) => Ok(ToleranceSpec {
                operator: f.operator,
                threshold: f.threshold,
                threshold_kind: f.threshold_kind,
                center: f.center,
            }),
        }
    }
}

/// A validated comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceRule {
    operator: Operator,
    threshold: f64,
    threshold_kind: ThresholdKind,
    center: Option<f64>,
}

impl ToleranceRule {
    pub fn new(
        operator: Operator,
        threshold: f64,
        threshold_kind: ThresholdKind,
        center: Option<f64>,
    ) -> Result<Self, ToleranceError> {
        if !threshold.is_finite() {
            return Err(ToleranceError::invalid(format!(
                "threshold must be a finite number, got {}",
                threshold
            )));
        }
        if threshold < 0.0 {
            return Err(ToleranceError::invalid(format!(
                "threshold must be non-negative, got {}",
                threshold
            )));
        }
        if let Some(c) = center {
            if !c.is_finite() {
                return Err(ToleranceError::invalid(format!(
                    "centre must be a finite number, got {}",
                    c
                )));
            }
        }
        if operator == Operator::PlusMinus && center.is_none() {
            return Err(ToleranceError::invalid(
                "operator ± requires a centre (applied or nominal value)",
            ));
        }

        Ok(Self {
            operator,
            threshold,
            threshold_kind,
            center,
        })
    }

    /// Shorthand for an absolute, uncentred rule
    pub fn absolute(operator: Operator, threshold: f64) -> Result<Self, ToleranceError> {
        Self::new(operator, threshold, ThresholdKind::Absolute, None)
    }

    /// `± band` around `center`
    pub fn plus_minus(center: f64, band: f64) -> Result<Self, ToleranceError> {
        Self::new(Operator::PlusMinus, band, ThresholdKind::Absolute, Some(center))
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn threshold_kind(&self) -> ThresholdKind {
        self.threshold_kind
    }

    pub fn center(&self) -> Option<f64> {
        self.center
    }

    /// Half-width of the `±` band in the statistic's unit
    fn band(&self) -> f64 {
        match (self.threshold_kind, self.center) {
            (ThresholdKind::Percentage, Some(c)) => c.abs() * self.threshold / 100.0,
            _ => self.threshold,
        }
    }

    /// Inclusive acceptance interval for `±` rules
    pub fn allowed_range(&self) -> Option<(f64, f64)> {
        match (self.operator, self.center) {
            (Operator::PlusMinus, Some(c)) => Some((c - self.band(), c + self.band())),
            _ => None,
        }
    }

    /// Does `statistic` satisfy this rule?
    pub fn evaluate(&self, statistic: f64) -> bool {
        match self.operator {
            Operator::LessOrEqual => statistic <= self.threshold,
            Operator::GreaterOrEqual => statistic >= self.threshold,
            Operator::Less => statistic < self.threshold,
            Operator::Greater => statistic > self.threshold,
            Operator::Equal => (statistic - self.threshold).abs() < EQUALITY_EPSILON,
            Operator::PlusMinus => match self.center {
                Some(c) => (statistic - c).abs() <= self.band(),
                None => false,
            },
        }
    }

    /// Same comparison for a statistic expressed as a fraction: `<= 5%`
    /// becomes `<= 0.05`. `±` bands and absolute thresholds are unchanged.
    pub fn as_fraction(self) -> Self {
        match (self.operator, self.threshold_kind) {
            (Operator::PlusMinus, _) | (_, ThresholdKind::Absolute) => self,
            (_, ThresholdKind::Percentage) => Self {
                threshold: self.threshold / 100.0,
                threshold_kind: ThresholdKind::Absolute,
                ..self
            },
        }
    }

    /// Back to the textual form
    pub fn to_spec(&self) -> ToleranceSpec {
        ToleranceSpec {
            operator: self.operator.symbol().to_string(),
            threshold: self.threshold,
            threshold_kind: self.threshold_kind,
            center: self.center,
        }
    }
}

impl TryFrom<&ToleranceSpec> for ToleranceRule {
    type Error = ToleranceError;

    fn try_from(spec: &ToleranceSpec) -> Result<Self, Self::Error> {
        let operator: Operator = spec.operator.parse()?;
        ToleranceRule::new(operator, spec.threshold, spec.threshold_kind, spec.center)
    }
}

impl fmt::Display for ToleranceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.threshold_kind {
            ThresholdKind::Absolute => "",
            ThresholdKind::Percentage => "%",
        };
        match (self.operator, self.center) {
            (Operator::PlusMinus, Some(c)) => write!(f, "{} ± {}{}", c, self.threshold, suffix),
            _ => write!(f, "{} {}{}", self.operator, self.threshold, suffix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parsing() {
        assert_eq!("<=".parse::<Operator>().unwrap(), Operator::LessOrEqual);
        assert_eq!("≥".parse::<Operator>().unwrap(), Operator::GreaterOrEqual);
        assert_eq!(" ± ".parse::<Operator>().unwrap(), Operator::PlusMinus);
        assert_eq!("+/-".parse::<Operator>().unwrap(), Operator::PlusMinus);
        assert_eq!("==".parse::<Operator>().unwrap(), Operator::Equal);
    }

    #[test]
    fn test_unknown_operator_is_an_error() {
        assert_eq!(
            "~".parse::<Operator>(),
            Err(ToleranceError::UnknownOperator("~".to_string()))
        );
        // Blank operators must not fall back to <=
        assert!(matches!(
            "".parse::<Operator>(),
            Err(ToleranceError::UnknownOperator(_))
        ));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let err = ToleranceRule::absolute(Operator::LessOrEqual, -1.0).unwrap_err();
        assert!(matches!(err, ToleranceError::InvalidToleranceSpec { .. }));
    }

    #[test]
    fn test_nan_threshold_rejected() {
        assert!(ToleranceRule::absolute(Operator::LessOrEqual, f64::NAN).is_err());
    }

    #[test]
    fn test_plus_minus_requires_center() {
        let err = ToleranceRule::new(Operator::PlusMinus, 2.0, ThresholdKind::Absolute, None)
            .unwrap_err();
        assert!(matches!(err, ToleranceError::InvalidToleranceSpec { .. }));
    }

    #[test]
    fn test_boundaries_at_threshold() {
        let at = |op| ToleranceRule::absolute(op, 5.0).unwrap().evaluate(5.0);
        assert!(at(Operator::LessOrEqual));
        assert!(at(Operator::GreaterOrEqual));
        assert!(at(Operator::Equal));
        assert!(!at(Operator::Less));
        assert!(!at(Operator::Greater));
    }

    #[test]
    fn test_equality_uses_epsilon() {
        let rule = ToleranceRule::absolute(Operator::Equal, 0.3).unwrap();
        assert!(rule.evaluate(0.1 + 0.2));
        assert!(!rule.evaluate(0.3001));
    }

    #[test]
    fn test_plus_minus_symmetry() {
        let rule = ToleranceRule::plus_minus(100.0, 2.0).unwrap();
        for v in [98.0, 99.0, 100.0, 101.5, 102.0] {
            assert!(rule.evaluate(v), "{} should pass", v);
        }
        for v in [97.99, 102.01, 0.0, 200.0] {
            assert!(!rule.evaluate(v), "{} should fail", v);
        }
        assert_eq!(rule.allowed_range(), Some((98.0, 102.0)));
    }

    #[test]
    fn test_plus_minus_percentage_band() {
        let rule =
            ToleranceRule::new(Operator::PlusMinus, 5.0, ThresholdKind::Percentage, Some(80.0))
                .unwrap();
        assert!(rule.evaluate(84.0));
        assert!(rule.evaluate(76.0));
        assert!(!rule.evaluate(84.1));
    }

    #[test]
    fn test_percentage_as_fraction() {
        let rule = "<= 5%".parse::<ToleranceSpec>().unwrap().to_rule().unwrap();
        let fraction = rule.as_fraction();
        assert_eq!(fraction.threshold(), 0.05);
        assert_eq!(fraction.threshold_kind(), ThresholdKind::Absolute);
        assert!(!fraction.evaluate(0.163));
        assert!(fraction.evaluate(0.04));

        let absolute = ToleranceRule::absolute(Operator::LessOrEqual, 0.05).unwrap();
        assert_eq!(absolute.as_fraction(), absolute);
        let band =
            ToleranceRule::new(Operator::PlusMinus, 5.0, ThresholdKind::Percentage, Some(80.0))
                .unwrap();
        assert_eq!(band.as_fraction(), band);
    }

    #[test]
    fn test_spec_compact_parsing() {
        let spec: ToleranceSpec = "<= 5%".parse().unwrap();
        assert_eq!(spec.operator, "<=");
        assert_eq!(spec.threshold, 5.0);
        assert_eq!(spec.threshold_kind, ThresholdKind::Percentage);

        let spec: ToleranceSpec = "±2".parse().unwrap();
        assert_eq!(spec.operator, "±");
        assert_eq!(spec.threshold, 2.0);
        assert_eq!(spec.threshold_kind, ThresholdKind::Absolute);

        let spec: ToleranceSpec = ">=.5".parse().unwrap();
        assert_eq!(spec.threshold, 0.5);

        let spec: ToleranceSpec = "+-2".parse().unwrap();
        assert_eq!(spec.operator, "+-");
        assert_eq!(spec.threshold, 2.0);
    }

    #[test]
    fn test_spec_without_threshold_fails() {
        assert!("<=".parse::<ToleranceSpec>().is_err());
        assert!("<= abc".parse::<ToleranceSpec>().is_err());
    }

    #[test]
    fn test_spec_negative_threshold_fails_at_rule() {
        let spec: ToleranceSpec = "<= -5".parse().unwrap();
        assert_eq!(spec.threshold, -5.0);
        assert!(matches!(
            spec.to_rule(),
            Err(ToleranceError::InvalidToleranceSpec { .. })
        ));
    }

    #[test]
    fn test_spec_unknown_operator_fails_at_rule() {
        let spec: ToleranceSpec = "~ 5".parse().unwrap();
        assert_eq!(
            spec.to_rule(),
            Err(ToleranceError::UnknownOperator("~".to_string()))
        );
        let spec: ToleranceSpec = "5".parse().unwrap();
        assert!(matches!(
            spec.to_rule(),
            Err(ToleranceError::UnknownOperator(_))
        ));
    }

    #[test]
    fn test_centered_at() {
        let spec: ToleranceSpec = "± 2".parse().unwrap();
        assert!(spec.to_rule().is_err());
        let rule = spec.centered_at(80.0).to_rule().unwrap();
        assert_eq!(rule.center(), Some(80.0));
        assert!(rule.evaluate(80.2));
    }

    #[test]
    fn test_spec_yaml_forms() {
        let compact: ToleranceSpec = serde_yml::from_str("'<= 0.05'").unwrap();
        assert_eq!(compact.threshold, 0.05);

        let full: ToleranceSpec =
            serde_yml::from_str("operator: '±'\nthreshold: 2\ncenter: 80").unwrap();
        assert_eq!(full.center, Some(80.0));
        assert!(full.to_rule().is_ok());

        let yaml = serde_yml::to_string(&compact).unwrap();
        assert!(yaml.contains("<= 0.05"));
    }

    #[test]
    fn test_display() {
        let spec: ToleranceSpec = "<=10%".parse().unwrap();
        assert_eq!(spec.to_string(), "<= 10%");
        let rule = ToleranceRule::plus_minus(80.0, 2.0).unwrap();
        assert_eq!(rule.to_string(), "80 ± 2");
    }
}
