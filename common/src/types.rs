use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldName {
    Name,
    Upper,
    Lower,
    Interval,
}

impl FieldName {
    pub const ALL: [FieldName; 4] = [Self::Name, Self::Upper, Self::Lower, Self::Interval];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Upper => "upper",
            Self::Lower => "lower",
            Self::Interval => "interval",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Name => 0,
            Self::Upper => 1,
            Self::Lower => 2,
            Self::Interval => 3,
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::Name)
    }

    /// The opposite moisture bound, whose validity depends on this field's value.
    pub fn sibling(self) -> Option<FieldName> {
        match self {
            Self::Upper => Some(Self::Lower),
            Self::Lower => Some(Self::Upper),
            Self::Name | Self::Interval => None,
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldName {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "upper" => Ok(Self::Upper),
            "lower" => Ok(Self::Lower),
            "interval" => Ok(Self::Interval),
            _ => Err(ParseError::UnknownField(value.to_string())),
        }
    }
}

/// A coerced field value. Numeric fields always hold `Number`, even when the
/// raw input was not a valid number (it coerces to NaN and is never valid).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

impl FieldValue {
    /// The zeroed placeholder a field holds before anything was entered.
    pub fn empty_for(field: FieldName) -> Self {
        if field.is_numeric() {
            Self::Number(0.0)
        } else {
            Self::Text(String::new())
        }
    }

    pub fn as_number(&self) -> f64 {
        match self {
            Self::Number(value) => *value,
            Self::Text(_) => f64::NAN,
        }
    }

    pub fn as_text(&self) -> &str {
        match self {
            Self::Text(value) => value,
            Self::Number(_) => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub value: FieldValue,
    pub valid: bool,
}

impl Field {
    pub fn placeholder(field: FieldName) -> Self {
        Self {
            value: FieldValue::empty_for(field),
            valid: false,
        }
    }

    pub fn is_invalid(&self) -> bool {
        !self.valid
    }
}

/// Outcome flags of the last request against the settings source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionState {
    #[serde(rename = "isFetching", default)]
    pub is_fetching: bool,
    #[serde(rename = "isSubmitting", default)]
    pub is_submitting: bool,
    #[serde(rename = "isErroneous", default)]
    pub is_erroneous: bool,
}

/// Pump activity as reported by the device. Encoded on the wire as `0..=3`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PumpPhase {
    #[default]
    Idle,
    Checking,
    Watering,
    SeepingIn,
}

impl PumpPhase {
    pub fn code(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Checking => 1,
            Self::Watering => 2,
            Self::SeepingIn => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Checking => "CHECKING",
            Self::Watering => "WATERING",
            Self::SeepingIn => "SEEPING_IN",
        }
    }

    pub fn is_busy(self) -> bool {
        self != Self::Idle
    }
}

impl TryFrom<u8> for PumpPhase {
    type Error = ParseError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Idle),
            1 => Ok(Self::Checking),
            2 => Ok(Self::Watering),
            3 => Ok(Self::SeepingIn),
            other => Err(ParseError::UnknownPhase(other)),
        }
    }
}

impl From<PumpPhase> for u8 {
    fn from(phase: PumpPhase) -> Self {
        phase.code()
    }
}

impl FromStr for PumpPhase {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let code = value
            .trim()
            .parse::<u8>()
            .map_err(|_| ParseError::InvalidPhasePayload(value.to_string()))?;
        Self::try_from(code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsFieldsView {
    pub name: Field,
    pub upper: Field,
    pub lower: Field,
    pub interval: Field,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsView {
    pub pristine: bool,
    pub submittable: bool,
    pub loading: bool,
    pub fields: SettingsFieldsView,
    #[serde(rename = "saveLabel")]
    pub save_label: &'static str,
    #[serde(rename = "saveEnabled")]
    pub save_enabled: bool,
    #[serde(rename = "backLabel")]
    pub back_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsView {
    pub title: String,
    pub loading: bool,
    #[serde(rename = "lastMeasurement")]
    pub last_measurement: String,
    #[serde(rename = "lastAutomaticWatering")]
    pub last_automatic_watering: String,
    #[serde(rename = "lastManualWatering")]
    pub last_manual_watering: String,
    #[serde(rename = "pumpPhase")]
    pub pump_phase: PumpPhase,
    #[serde(rename = "pumpLabel")]
    pub pump_label: String,
    #[serde(rename = "pumpEnabled")]
    pub pump_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_codes_round_trip_through_wire_format() {
        for phase in [
            PumpPhase::Idle,
            PumpPhase::Checking,
            PumpPhase::Watering,
            PumpPhase::SeepingIn,
        ] {
            let encoded = serde_json::to_string(&phase).unwrap();
            assert_eq!(encoded, phase.code().to_string());
            assert_eq!(serde_json::from_str::<PumpPhase>(&encoded).unwrap(), phase);
        }
    }

    #[test]
    fn unknown_phase_code_is_rejected() {
        assert_eq!(PumpPhase::try_from(4), Err(ParseError::UnknownPhase(4)));
        assert!(serde_json::from_str::<PumpPhase>("7").is_err());
        assert_eq!(
            "watering".parse::<PumpPhase>(),
            Err(ParseError::InvalidPhasePayload("watering".to_string()))
        );
        assert_eq!(" 2 ".parse::<PumpPhase>(), Ok(PumpPhase::Watering));
    }

    #[test]
    fn field_names_parse_case_insensitively() {
        assert_eq!("Upper".parse::<FieldName>(), Ok(FieldName::Upper));
        assert_eq!("interval".parse::<FieldName>(), Ok(FieldName::Interval));
        assert_eq!(
            "moisture".parse::<FieldName>(),
            Err(ParseError::UnknownField("moisture".to_string()))
        );
    }

    #[test]
    fn only_bounds_have_siblings() {
        assert_eq!(FieldName::Upper.sibling(), Some(FieldName::Lower));
        assert_eq!(FieldName::Lower.sibling(), Some(FieldName::Upper));
        assert_eq!(FieldName::Name.sibling(), None);
        assert_eq!(FieldName::Interval.sibling(), None);
    }

    #[test]
    fn submission_flags_use_camel_case_keys() {
        let state: SubmissionState =
            serde_json::from_str(r#"{"isSubmitting":true,"isErroneous":false}"#).unwrap();
        assert!(state.is_submitting);
        assert!(!state.is_fetching);
        assert!(!state.is_erroneous);
    }
}
