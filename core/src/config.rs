use crate::{
    case::{CaseCategory, PriorityBucket},
    error::{RecoveryError, RecoveryResult},
    types::DayCount,
};
use serde::{Deserialize, Serialize};

// ── Classification rules ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Status,
    SubStatus,
}

/// Keywords are compared against the trimmed, lowercased field value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Matcher {
    /// Field equals one of the keywords.
    OneOf(Vec<String>),
    /// Field contains the keyword as a substring.
    Contains(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationRule {
    pub field: MatchField,
    pub matcher: Matcher,
    pub category: CaseCategory,
}

// ── Priority bins ──────────────────────────────────────────────────

/// Upper edge (inclusive) of one priority bin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriorityBin {
    pub max_days: DayCount,
    pub bucket: PriorityBucket,
}

// ── Alerts ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AlertThresholds {
    /// Overdue: open cases idle at least this many days.
    pub level_1_days: DayCount,
    /// Stagnation: open cases idle at least this many days.
    pub level_2_days: DayCount,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            level_1_days: 30,
            level_2_days: 15,
        }
    }
}

// ── Engine config ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Evaluated top to bottom; the first match wins. Cases matching no
    /// rule are `InProgress`.
    pub classification_rules: Vec<ClassificationRule>,
    /// Strictly ascending by `max_days`.
    pub priority_bins: Vec<PriorityBin>,
    /// Bucket for anything above the last bin.
    pub overflow_bucket: PriorityBucket,
    pub alert_thresholds: AlertThresholds,
    /// Day count standing in for a missing last-activity date.
    pub unknown_activity_days: DayCount,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let rules = vec![
            ClassificationRule {
                field: MatchField::Status,
                matcher: Matcher::OneOf(vec!["closed".into(), "finalized".into(), "paid".into()]),
                category: CaseCategory::Closure,
            },
            ClassificationRule {
                field: MatchField::SubStatus,
                matcher: Matcher::Contains("return".into()),
                category: CaseCategory::Return,
            },
            ClassificationRule {
                field: MatchField::SubStatus,
                matcher: Matcher::Contains("claim".into()),
                category: CaseCategory::Claim,
            },
            ClassificationRule {
                field: MatchField::Status,
                matcher: Matcher::Contains("pending".into()),
                category: CaseCategory::Pending,
            },
        ];

        let bins = vec![
            PriorityBin { max_days: 2,  bucket: PriorityBucket::Low },
            PriorityBin { max_days: 7,  bucket: PriorityBucket::Medium },
            PriorityBin { max_days: 15, bucket: PriorityBucket::High },
        ];

        Self {
            classification_rules: rules,
            priority_bins: bins,
            overflow_bucket: PriorityBucket::Critical,
            alert_thresholds: AlertThresholds::default(),
            unknown_activity_days: 999,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file. Keys absent from the file keep their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Self::from_json(&content).map_err(|e| anyhow::anyhow!("Invalid config {path}: {e}"))
    }

    pub fn from_json(content: &str) -> RecoveryResult<Self> {
        let config: EngineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RecoveryResult<()> {
        let invalid = |reason: String| Err(RecoveryError::InvalidConfig { reason });

        if self.priority_bins.is_empty() {
            return invalid("priority_bins must not be empty".into());
        }
        for pair in self.priority_bins.windows(2) {
            if pair[1].max_days <= pair[0].max_days {
                return invalid(format!(
                    "priority_bins must be strictly ascending: {} then {}",
                    pair[0].max_days, pair[1].max_days
                ));
            }
        }

        let t = &self.alert_thresholds;
        if t.level_1_days < t.level_2_days {
            return invalid(format!(
                "level_1_days ({}) must not be below level_2_days ({})",
                t.level_1_days, t.level_2_days
            ));
        }
        if self.unknown_activity_days < t.level_1_days {
            return invalid(format!(
                "unknown_activity_days ({}) must reach level_1_days ({})",
                self.unknown_activity_days, t.level_1_days
            ));
        }

        for (i, rule) in self.classification_rules.iter().enumerate() {
            let blank = match &rule.matcher {
                Matcher::OneOf(words) => words.is_empty() || words.iter().any(|w| w.trim().is_empty()),
                Matcher::Contains(word) => word.trim().is_empty(),
            };
            if blank {
                return invalid(format!("classification rule {i} has an empty keyword"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "unknown_activity_days": 500 }"#).unwrap();
        assert_eq!(config.unknown_activity_days, 500);
        assert_eq!(config.alert_thresholds, AlertThresholds::default());
        assert_eq!(config.classification_rules.len(), 4);
    }

    #[test]
    fn unordered_bins_are_rejected() {
        let mut config = EngineConfig::default();
        config.priority_bins.swap(0, 1);
        assert!(matches!(config.validate(), Err(RecoveryError::InvalidConfig { .. })));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let mut config = EngineConfig::default();
        config.alert_thresholds = AlertThresholds { level_1_days: 10, level_2_days: 20 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn blank_keyword_is_rejected() {
        let json = r#"{
            "classification_rules": [
                { "field": "status", "matcher": { "kind": "contains", "value": "  " }, "category": "Pending" }
            ]
        }"#;
        assert!(EngineConfig::from_json(json).is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = EngineConfig::load("/nonexistent/engine.json").unwrap_err();
        assert!(err.to_string().contains("Cannot read"));
    }
}
