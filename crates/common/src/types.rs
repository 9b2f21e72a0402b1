//! Core types for AlignView

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Prefix for dynamic KDMA parameter keys in string form
pub const KDMA_KEY_PREFIX: &str = "kdma:";

/// Identifier of a comparison column. Stable for the column's lifetime,
/// assigned at creation, never reused within a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ColumnId(pub u64);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "col-{}", self.0)
    }
}

/// A linkable parameter key.
///
/// Static keys come first in a fixed priority order; KDMA keys are
/// data-dependent and ordered by metadata discovery. The derived `Ord`
/// follows that priority order, which is also the canonical tuple order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ParameterKey {
    Scenario,
    Scene,
    AdmType,
    LlmBackbone,
    Kdma(String),
}

impl ParameterKey {
    /// Static keys in priority order
    pub fn static_keys() -> [ParameterKey; 4] {
        [
            ParameterKey::Scenario,
            ParameterKey::Scene,
            ParameterKey::AdmType,
            ParameterKey::LlmBackbone,
        ]
    }

    pub fn is_kdma(&self) -> bool {
        matches!(self, ParameterKey::Kdma(_))
    }

    /// Keys whose valid option sets are scoped under this one. Changing a
    /// key invalidates every dependent selection on the same column.
    pub fn invalidates(&self, other: &ParameterKey) -> bool {
        match self {
            ParameterKey::Scenario => !matches!(other, ParameterKey::Scenario),
            ParameterKey::AdmType => {
                matches!(other, ParameterKey::LlmBackbone | ParameterKey::Kdma(_))
            }
            _ => false,
        }
    }

    /// Human-readable row label for the projection
    pub fn label(&self) -> String {
        match self {
            ParameterKey::Scenario => "Scenario".to_string(),
            ParameterKey::Scene => "Scene".to_string(),
            ParameterKey::AdmType => "ADM Type".to_string(),
            ParameterKey::LlmBackbone => "LLM Backbone".to_string(),
            ParameterKey::Kdma(name) => format!("KDMA {}", name),
        }
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterKey::Scenario => write!(f, "scenario"),
            ParameterKey::Scene => write!(f, "scene"),
            ParameterKey::AdmType => write!(f, "adm_type"),
            ParameterKey::LlmBackbone => write!(f, "llm_backbone"),
            ParameterKey::Kdma(name) => write!(f, "{}{}", KDMA_KEY_PREFIX, name),
        }
    }
}

impl FromStr for ParameterKey {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scenario" => Ok(ParameterKey::Scenario),
            "scene" => Ok(ParameterKey::Scene),
            "adm_type" => Ok(ParameterKey::AdmType),
            "llm_backbone" => Ok(ParameterKey::LlmBackbone),
            other => match other.strip_prefix(KDMA_KEY_PREFIX) {
                Some(name) if !name.is_empty() => Ok(ParameterKey::Kdma(name.to_string())),
                _ => Err(crate::Error::UnknownParameter(other.to_string())),
            },
        }
    }
}

impl From<ParameterKey> for String {
    fn from(key: ParameterKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for ParameterKey {
    type Error = crate::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A selected parameter value: categorical choice or a KDMA level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Level(f64),
    Choice(String),
}

impl ParamValue {
    pub fn as_choice(&self) -> Option<&str> {
        match self {
            ParamValue::Choice(s) => Some(s),
            ParamValue::Level(_) => None,
        }
    }

    pub fn as_level(&self) -> Option<f64> {
        match self {
            ParamValue::Level(v) => Some(*v),
            ParamValue::Choice(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Choice(s) => write!(f, "{}", s),
            ParamValue::Level(v) => write!(f, "{}", format_level(*v)),
        }
    }
}

/// Canonical KDMA level formatting used for tuple fingerprints and
/// manifest keys. Two decimals so `0.5` and `0.50` agree.
pub fn format_level(value: f64) -> String {
    format!("{:.2}", value)
}

/// Last-fetched result payload or its sentinel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResultState {
    Pending,
    NoData,
    Error { reason: String },
    Ready { payload: serde_json::Value },
}

impl Default for ResultState {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for ResultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultState::Pending => write!(f, "pending"),
            ResultState::NoData => write!(f, "no data"),
            ResultState::Error { reason } => write!(f, "error: {}", reason),
            ResultState::Ready { .. } => write!(f, "ready"),
        }
    }
}

/// One comparison slot: independent selections plus the last fetch outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    /// Partial mapping; unset keys render as empty cells
    pub selections: BTreeMap<ParameterKey, ParamValue>,
    pub result: ResultState,
    /// Bumped on every selection change; fetch completions carrying an
    /// older version are discarded
    pub result_version: u64,
}

impl Column {
    pub fn new(id: ColumnId) -> Self {
        Self {
            id,
            selections: BTreeMap::new(),
            result: ResultState::Pending,
            result_version: 0,
        }
    }

    pub fn selection(&self, key: &ParameterKey) -> Option<&ParamValue> {
        self.selections.get(key)
    }

    pub fn scenario(&self) -> Option<&str> {
        self.selections
            .get(&ParameterKey::Scenario)
            .and_then(ParamValue::as_choice)
    }

    pub fn adm_type(&self) -> Option<&str> {
        self.selections
            .get(&ParameterKey::AdmType)
            .and_then(ParamValue::as_choice)
    }

    /// Number of active KDMA selections
    pub fn kdma_count(&self) -> usize {
        self.selections.keys().filter(|k| k.is_kdma()).count()
    }

    /// Snapshot of current selections in canonical key order
    pub fn selection_tuple(&self) -> SelectionTuple {
        SelectionTuple {
            entries: self
                .selections
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Ordered combination of a column's set parameter values. The lookup
/// fingerprint for result fetching: equal tuples must fetch equal results.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectionTuple {
    pub entries: Vec<(ParameterKey, ParamValue)>,
}

impl SelectionTuple {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &ParameterKey) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Deterministic fingerprint string, e.g.
    /// `scenario=S1|adm_type=pipeline_baseline|kdma:affiliation=0.50`
    pub fn canonical_key(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl fmt::Display for SelectionTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_key_roundtrip() {
        for s in ["scenario", "scene", "adm_type", "llm_backbone", "kdma:affiliation"] {
            let key: ParameterKey = s.parse().unwrap();
            assert_eq!(key.to_string(), s);
        }
        assert!("kdma:".parse::<ParameterKey>().is_err());
        assert!("bogus".parse::<ParameterKey>().is_err());
    }

    #[test]
    fn test_key_order_matches_priority() {
        let mut keys = vec![
            ParameterKey::Kdma("affiliation".to_string()),
            ParameterKey::AdmType,
            ParameterKey::Scenario,
            ParameterKey::LlmBackbone,
            ParameterKey::Scene,
        ];
        keys.sort();
        assert_eq!(keys[0], ParameterKey::Scenario);
        assert_eq!(keys[1], ParameterKey::Scene);
        assert_eq!(keys[2], ParameterKey::AdmType);
        assert_eq!(keys[3], ParameterKey::LlmBackbone);
        assert!(keys[4].is_kdma());
    }

    #[test]
    fn test_scenario_invalidates_everything_below() {
        let scenario = ParameterKey::Scenario;
        assert!(scenario.invalidates(&ParameterKey::Scene));
        assert!(scenario.invalidates(&ParameterKey::AdmType));
        assert!(scenario.invalidates(&ParameterKey::Kdma("x".to_string())));
        assert!(!scenario.invalidates(&ParameterKey::Scenario));

        let adm = ParameterKey::AdmType;
        assert!(adm.invalidates(&ParameterKey::LlmBackbone));
        assert!(adm.invalidates(&ParameterKey::Kdma("x".to_string())));
        assert!(!adm.invalidates(&ParameterKey::Scene));
    }

    #[test]
    fn test_canonical_key_ordering_and_levels() {
        let mut column = Column::new(ColumnId(1));
        column.selections.insert(
            ParameterKey::Kdma("affiliation".to_string()),
            ParamValue::Level(0.5),
        );
        column.selections.insert(
            ParameterKey::Scenario,
            ParamValue::Choice("S1".to_string()),
        );
        column.selections.insert(
            ParameterKey::AdmType,
            ParamValue::Choice("pipeline_baseline".to_string()),
        );

        assert_eq!(
            column.selection_tuple().canonical_key(),
            "scenario=S1|adm_type=pipeline_baseline|kdma:affiliation=0.50"
        );
    }

    #[test]
    fn test_param_value_untagged_serde() {
        let level: ParamValue = serde_json::from_str("0.3").unwrap();
        assert_eq!(level, ParamValue::Level(0.3));
        let choice: ParamValue = serde_json::from_str("\"S1\"").unwrap();
        assert_eq!(choice, ParamValue::Choice("S1".to_string()));
    }
}
