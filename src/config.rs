use crate::error::{CostingError, Result};
use crate::parsing::DEFAULT_CURRENCY_MARKERS;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// |delta| limits, in currency units, for each reconciliation tier (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationThresholds {
    pub exact: i64,
    pub acceptable: i64,
    pub needs_review: i64,
}

impl Default for ReconciliationThresholds {
    fn default() -> Self {
        Self {
            exact: 50,
            acceptable: 100,
            needs_review: 500,
        }
    }
}

/// What to do with the residual left after each share is rounded on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidualPolicy {
    /// The line with the largest proration basis absorbs the residual.
    AbsorbIntoLargest,
    /// Keep the independently rounded shares and only report the residual.
    #[default]
    Report,
}

/// Whether lines flagged with missing numeric fields take part in the financial pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncompleteLinePolicy {
    /// Missing fields contribute zero.
    #[default]
    Include,
    Exclude,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: ReconciliationThresholds,
    pub residual_policy: ResidualPolicy,
    pub incomplete_lines: IncompleteLinePolicy,
    pub currency_markers: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: ReconciliationThresholds::default(),
            residual_policy: ResidualPolicy::default(),
            incomplete_lines: IncompleteLinePolicy::default(),
            currency_markers: DEFAULT_CURRENCY_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        if t.exact < 0 || t.exact > t.acceptable || t.acceptable > t.needs_review {
            return Err(CostingError::InvalidThresholds {
                exact: t.exact,
                acceptable: t.acceptable,
                needs_review: t.needs_review,
            });
        }

        for marker in &self.currency_markers {
            if marker.trim().is_empty() {
                return Err(CostingError::InvalidConfig(
                    "currency markers must not be blank".to_string(),
                ));
            }
            if marker
                .chars()
                .any(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+' | '(' | ')'))
            {
                return Err(CostingError::InvalidConfig(format!(
                    "currency marker '{}' contains numeric syntax",
                    marker
                )));
            }
        }

        Ok(())
    }
}
