//! Parameter registry
//!
//! Pure lookups over the metadata index: which parameter keys exist, which
//! values are valid for a column's current scenario/ADM context, and how
//! many KDMA keys a column may carry at once. No state beyond the shared
//! read-only index.

use alignview_common::{
    Column, Error, MetadataIndex, ParamValue, ParameterKey, Result,
};
use std::sync::Arc;

/// The scenario/ADM context a value is validated against
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnContext<'a> {
    pub scenario: Option<&'a str>,
    pub adm: Option<&'a str>,
}

impl<'a> ColumnContext<'a> {
    pub fn of(column: &'a Column) -> Self {
        Self {
            scenario: column.scenario(),
            adm: column.adm_type(),
        }
    }
}

/// Enumerates linkable parameter keys and validates values against the
/// scenario → ADM → KDMA hierarchy
#[derive(Clone)]
pub struct ParameterRegistry {
    metadata: Arc<MetadataIndex>,
}

impl ParameterRegistry {
    pub fn new(metadata: Arc<MetadataIndex>) -> Self {
        Self { metadata }
    }

    pub fn metadata(&self) -> &MetadataIndex {
        &self.metadata
    }

    /// All parameter keys: static keys in priority order, then dynamic
    /// KDMA keys in metadata discovery order.
    pub fn parameter_keys(&self) -> Vec<ParameterKey> {
        let mut keys: Vec<ParameterKey> = ParameterKey::static_keys().to_vec();
        for name in self.metadata.kdma_keys() {
            keys.push(ParameterKey::Kdma(name));
        }
        keys
    }

    /// Validate a value for a key under a column context. Pure lookup.
    pub fn validate(
        &self,
        key: &ParameterKey,
        value: &ParamValue,
        ctx: ColumnContext<'_>,
    ) -> Result<()> {
        match key {
            ParameterKey::Kdma(name) => {
                let level = value.as_level().ok_or_else(|| {
                    self.invalid(key, value, "KDMA values must be numeric")
                })?;
                if !(0.0..=1.0).contains(&level) {
                    return Err(self.invalid(key, value, "level outside [0.0, 1.0]"));
                }
                let (scenario, adm) = match (ctx.scenario, ctx.adm) {
                    (Some(s), Some(a)) => (s, a),
                    _ => {
                        return Err(self.invalid(
                            key,
                            value,
                            "no ADM type selected for this column",
                        ))
                    }
                };
                if !self
                    .metadata
                    .kdma_names(scenario, adm)
                    .iter()
                    .any(|k| k == name)
                {
                    return Err(self.invalid(key, value, "KDMA not available for this ADM"));
                }
                Ok(())
            }
            _ => {
                let choice = value.as_choice().ok_or_else(|| {
                    self.invalid(key, value, "expected a categorical value")
                })?;
                let options = self.choice_options(key, ctx);
                if options.iter().any(|o| o == choice) {
                    Ok(())
                } else {
                    Err(self.invalid(key, value, "not in the current valid set"))
                }
            }
        }
    }

    /// Ordered valid values for a key under a context. Used for the
    /// best-effort fallback when a linked value is rejected, and by the
    /// options API. KDMA keys report a zero level as their only listed
    /// candidate (the slider range is continuous).
    pub fn valid_options(&self, key: &ParameterKey, ctx: ColumnContext<'_>) -> Vec<ParamValue> {
        match key {
            ParameterKey::Kdma(name) => {
                let available = match (ctx.scenario, ctx.adm) {
                    (Some(s), Some(a)) => {
                        self.metadata.kdma_names(s, a).iter().any(|k| k == name)
                    }
                    _ => false,
                };
                if available {
                    vec![ParamValue::Level(0.0)]
                } else {
                    Vec::new()
                }
            }
            _ => self
                .choice_options(key, ctx)
                .into_iter()
                .map(ParamValue::Choice)
                .collect(),
        }
    }

    /// KDMA cap for a column context: the maximum simultaneous KDMA count
    /// observed across loaded metadata for the column's current ADM.
    pub fn kdma_cap(&self, ctx: ColumnContext<'_>) -> usize {
        match (ctx.scenario, ctx.adm) {
            (Some(s), Some(a)) => self.metadata.max_kdmas(s, a),
            _ => 0,
        }
    }

    fn choice_options(&self, key: &ParameterKey, ctx: ColumnContext<'_>) -> Vec<String> {
        let owned = |v: Vec<&str>| v.into_iter().map(str::to_string).collect::<Vec<_>>();
        match key {
            ParameterKey::Scenario => owned(self.metadata.scenario_names()),
            ParameterKey::Scene => ctx
                .scenario
                .map(|s| owned(self.metadata.scenes(s)))
                .unwrap_or_default(),
            ParameterKey::AdmType => ctx
                .scenario
                .map(|s| owned(self.metadata.adm_names(s)))
                .unwrap_or_default(),
            ParameterKey::LlmBackbone => match (ctx.scenario, ctx.adm) {
                (Some(s), Some(a)) => owned(self.metadata.llm_backbones(s, a)),
                _ => Vec::new(),
            },
            ParameterKey::Kdma(_) => Vec::new(),
        }
    }

    fn invalid(&self, key: &ParameterKey, value: &ParamValue, reason: &str) -> Error {
        Error::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
