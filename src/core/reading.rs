//! Readings and measurement rows
//!
//! A [`Reading`] keeps the operator's raw text. Its numeric value is derived
//! on demand, so a blank or mistyped cell stays visible as such instead of
//! turning into a zero.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::identity::RowId;

/// Parse state of a raw reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadingState {
    /// Parsed to a finite number
    Valid(f64),
    /// Empty or whitespace only
    Blank,
    /// Text that is not a number
    Unparseable,
}

/// A single value entered by an operator
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reading {
    /// Text as entered
    pub raw: String,

    /// Unit suffix split off the raw text (e.g. "kV" from "80.1 kV")
    pub unit: Option<String>,
}

impl Reading {
    /// Build a reading from raw text, splitting off a trailing unit
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let unit = split_unit(&raw).and_then(|(_, unit)| {
            if unit.is_empty() {
                None
            } else {
                Some(unit.to_string())
            }
        });
        Self { raw, unit }
    }

    /// Reading from an already-numeric value
    pub fn from_value(value: f64) -> Self {
        Self {
            raw: value.to_string(),
            unit: None,
        }
    }

    pub fn blank() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ReadingState {
        let trimmed = self.raw.trim();
        if trimmed.is_empty() {
            return ReadingState::Blank;
        }
        match split_unit(trimmed) {
            Some((number, _)) => match number.parse::<f64>() {
                Ok(v) if v.is_finite() => ReadingState::Valid(v),
                _ => ReadingState::Unparseable,
            },
            None => ReadingState::Unparseable,
        }
    }

    /// Numeric value if the reading parsed
    pub fn value(&self) -> Option<f64> {
        match self.state() {
            ReadingState::Valid(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.state() == ReadingState::Blank
    }
}

/// Split "80.1 kV" into ("80.1", "kV"). Returns None when the tail is not a
/// plain unit (letters, '/', '%').
fn split_unit(raw: &str) -> Option<(&str, &str)> {
    let trimmed = raw.trim();
    let split_at = trimmed
        .char_indices()
        .find(|(i, c)| {
            !(c.is_ascii_digit()
                || *c == '.'
                || ((*c == '-' || *c == '+') && (*i == 0 || is_exponent(trimmed, *i)))
                || ((*c == 'e' || *c == 'E') && *i > 0 && next_is_numeric(trimmed, *i)))
        })
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());

    let (number, tail) = trimmed.split_at(split_at);
    let unit = tail.trim();
    if unit
        .chars()
        .all(|c| c.is_alphabetic() || c == '/' || c == '%' || c == 'µ')
    {
        Some((number, unit))
    } else {
        None
    }
}

fn is_exponent(s: &str, i: usize) -> bool {
    s[..i].ends_with(['e', 'E'])
}

fn next_is_numeric(s: &str, i: usize) -> bool {
    s[i + 1..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+')
}

impl Serialize for Reading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match (self.state(), &self.unit) {
            (ReadingState::Valid(v), None) => serializer.serialize_f64(v),
            _ => serializer.serialize_str(&self.raw),
        }
    }
}

impl<'de> Deserialize<'de> for Reading {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        Ok(match Option::<Repr>::deserialize(deserializer)? {
            Some(Repr::Number(v)) => Reading::from_value(v),
            Some(Repr::Text(s)) => Reading::parse(s),
            None => Reading::blank(),
        })
    }
}

/// Settings applied on the console when the readings were taken
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppliedSetting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kvp: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ma: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_ms: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mas: Option<f64>,

    /// Free-form label (location, phantom insert, material)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// An ordered set of readings taken at one setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRow {
    #[serde(default)]
    pub id: RowId,

    #[serde(default)]
    pub setting: AppliedSetting,

    #[serde(default)]
    pub readings: Vec<Reading>,
}

impl MeasurementRow {
    pub fn new(setting: AppliedSetting) -> Self {
        Self {
            id: RowId::new(),
            setting,
            readings: Vec::new(),
        }
    }

    /// Row with readings parsed from raw strings
    pub fn with_raw_readings<I, S>(setting: AppliedSetting, raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: RowId::new(),
            setting,
            readings: raw.into_iter().map(Reading::parse).collect(),
        }
    }

    /// Numeric values of the readings that parsed, in entry order
    pub fn values(&self) -> Vec<f64> {
        valid_values(&self.readings)
    }
}

/// Collect the numeric values of a reading slice, skipping blank and
/// unparseable entries
pub fn valid_values(readings: &[Reading]) -> Vec<f64> {
    readings.iter().filter_map(Reading::value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_number() {
        assert_eq!(Reading::parse("80.1").state(), ReadingState::Valid(80.1));
    }

    #[test]
    fn test_blank_reading() {
        assert_eq!(Reading::parse("   ").state(), ReadingState::Blank);
        assert!(Reading::blank().is_blank());
    }

    #[test]
    fn test_unparseable_reading() {
        assert_eq!(Reading::parse("abc").state(), ReadingState::Unparseable);
        assert_eq!(Reading::parse("8O.1").state(), ReadingState::Unparseable);
        assert_eq!(Reading::parse("1.2.3").state(), ReadingState::Unparseable);
    }

    #[test]
    fn test_reading_with_unit() {
        let r = Reading::parse("80.1 kV");
        assert_eq!(r.value(), Some(80.1));
        assert_eq!(r.unit.as_deref(), Some("kV"));

        let r = Reading::parse("0.42mGy/h");
        assert_eq!(r.value(), Some(0.42));
        assert_eq!(r.unit.as_deref(), Some("mGy/h"));
    }

    #[test]
    fn test_negative_and_exponent() {
        assert_eq!(Reading::parse("-3.5").value(), Some(-3.5));
        assert_eq!(Reading::parse("1.5e-2").value(), Some(0.015));
    }

    #[test]
    fn test_row_values_skip_invalid() {
        let row = MeasurementRow::with_raw_readings(
            AppliedSetting::default(),
            ["80.1", "", "n/a", "80.3"],
        );
        assert_eq!(row.values(), vec![80.1, 80.3]);
        assert_eq!(row.readings.len(), 4);
    }

    #[test]
    fn test_reading_yaml_forms() {
        let readings: Vec<Reading> = serde_yml::from_str("[80.1, '', '80.2 kV', ~]").unwrap();
        assert_eq!(readings[0].value(), Some(80.1));
        assert!(readings[1].is_blank());
        assert_eq!(readings[2].unit.as_deref(), Some("kV"));
        assert!(readings[3].is_blank());
    }

    #[test]
    fn test_row_id_survives_yaml() {
        let row = MeasurementRow::with_raw_readings(AppliedSetting::default(), ["1"]);
        let yaml = serde_yml::to_string(&row).unwrap();
        let parsed: MeasurementRow = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed.id, row.id);
    }
}
