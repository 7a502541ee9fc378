//! Metric-triggered scale rules.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use skyplan_core::{require, BuildError, BuildResult, IsoDuration};

pub const DEFAULT_TIME_GRAIN: &str = "PT1M";
pub const DEFAULT_TIME_WINDOW: &str = "PT5M";
pub const DEFAULT_COOLDOWN: &str = "PT5M";

/// How samples within one time grain are reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MetricStatistic {
    #[default]
    Average,
    Min,
    Max,
    Sum,
    Count,
}

/// How grain values across the time window are reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeAggregation {
    #[default]
    Average,
    Minimum,
    Maximum,
    Total,
    Count,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ComparisonOperator {
    Equals,
    NotEquals,
    #[default]
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl ComparisonOperator {
    /// Whether `value` triggers a rule with this operator and `threshold`.
    pub fn matches(&self, value: f64, threshold: f64) -> bool {
        match self {
            ComparisonOperator::Equals => value == threshold,
            ComparisonOperator::NotEquals => value != threshold,
            ComparisonOperator::GreaterThan => value > threshold,
            ComparisonOperator::GreaterThanOrEqual => value >= threshold,
            ComparisonOperator::LessThan => value < threshold,
            ComparisonOperator::LessThanOrEqual => value <= threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScaleDirection {
    #[default]
    Increase,
    Decrease,
}

/// How `value` is applied to the current instance count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScaleChangeType {
    #[default]
    ChangeCount,
    PercentChangeCount,
    ExactCount,
}

/// Caller-supplied metric rule.
///
/// `threshold` is kept loosely typed so a string or boolean supplied by a
/// template is reported as `InvalidType` by the builder rather than lost
/// in deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRuleConfig {
    #[serde(default)]
    pub metric_name: String,
    pub metric_resource_uri: Option<String>,
    pub time_grain: Option<String>,
    pub statistic: Option<MetricStatistic>,
    pub time_window: Option<String>,
    pub time_aggregation: Option<TimeAggregation>,
    pub operator: Option<ComparisonOperator>,
    pub threshold: Option<Value>,
    pub direction: Option<ScaleDirection>,
    pub cooldown: Option<String>,
    pub change_type: Option<ScaleChangeType>,
    pub value: Option<u32>,
}

impl MetricRuleConfig {
    pub fn new(
        metric_name: impl Into<String>,
        operator: ComparisonOperator,
        threshold: f64,
        direction: ScaleDirection,
    ) -> Self {
        Self {
            metric_name: metric_name.into(),
            operator: Some(operator),
            threshold: Some(Value::from(threshold)),
            direction: Some(direction),
            ..Default::default()
        }
    }
}

/// A validated metric rule with every default filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricScaleRule {
    pub metric_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_resource_uri: Option<String>,
    pub time_grain: String,
    pub statistic: MetricStatistic,
    pub time_window: String,
    pub time_aggregation: TimeAggregation,
    pub operator: ComparisonOperator,
    pub threshold: f64,
    pub direction: ScaleDirection,
    pub cooldown: String,
    pub change_type: ScaleChangeType,
    pub value: u32,
}

impl MetricScaleRule {
    /// Validate a metric rule.
    ///
    /// Checks, in order: metricName, threshold type, then the three
    /// ISO-8601 durations.
    pub fn build(config: &MetricRuleConfig) -> BuildResult<Self> {
        require(&config.metric_name, "metricName is required for a metric scale rule")?;

        let threshold = match &config.threshold {
            Some(Value::Number(n)) => n.as_f64().ok_or_else(|| {
                BuildError::invalid_type(format!("threshold {n} is not representable as a number"))
            })?,
            Some(other) => {
                return Err(BuildError::invalid_type(format!(
                    "threshold must be a number, got {other}"
                )));
            }
            None => return Err(BuildError::invalid_type("threshold must be a number")),
        };

        let time_grain = duration_or("timeGrain", &config.time_grain, DEFAULT_TIME_GRAIN)?;
        let time_window = duration_or("timeWindow", &config.time_window, DEFAULT_TIME_WINDOW)?;
        let cooldown = duration_or("cooldown", &config.cooldown, DEFAULT_COOLDOWN)?;

        let rule = Self {
            metric_name: config.metric_name.clone(),
            metric_resource_uri: config
                .metric_resource_uri
                .clone()
                .filter(|uri| !uri.trim().is_empty()),
            time_grain,
            statistic: config.statistic.unwrap_or_default(),
            time_window,
            time_aggregation: config.time_aggregation.unwrap_or_default(),
            operator: config.operator.unwrap_or_default(),
            threshold,
            direction: config.direction.unwrap_or_default(),
            cooldown,
            change_type: config.change_type.unwrap_or_default(),
            value: config.value.unwrap_or(1),
        };

        debug!(
            metric = %rule.metric_name,
            operator = ?rule.operator,
            threshold = rule.threshold,
            direction = ?rule.direction,
            "metric scale rule built"
        );
        Ok(rule)
    }

    /// Whether an observed metric value would trigger this rule.
    pub fn triggers_on(&self, value: f64) -> bool {
        self.operator.matches(value, self.threshold)
    }
}

/// Validate an optional duration, keeping the caller's spelling.
fn duration_or(field: &str, value: &Option<String>, default: &str) -> BuildResult<String> {
    match value.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => {
            IsoDuration::parse(field, s)?;
            Ok(s.to_string())
        }
        _ => Ok(default.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyplan_core::ErrorKind;

    fn cpu_rule() -> MetricRuleConfig {
        MetricRuleConfig::new(
            "Percentage CPU",
            ComparisonOperator::GreaterThan,
            75.0,
            ScaleDirection::Increase,
        )
    }

    #[test]
    fn applies_defaults() {
        let rule = MetricScaleRule::build(&cpu_rule()).unwrap();
        assert_eq!(rule.time_grain, "PT1M");
        assert_eq!(rule.time_window, "PT5M");
        assert_eq!(rule.cooldown, "PT5M");
        assert_eq!(rule.statistic, MetricStatistic::Average);
        assert_eq!(rule.time_aggregation, TimeAggregation::Average);
        assert_eq!(rule.change_type, ScaleChangeType::ChangeCount);
        assert_eq!(rule.value, 1);
        assert_eq!(rule.threshold, 75.0);
    }

    #[test]
    fn defaults_operator_and_direction() {
        let cfg = MetricRuleConfig {
            metric_name: "Requests".into(),
            threshold: Some(Value::from(100)),
            ..Default::default()
        };
        let rule = MetricScaleRule::build(&cfg).unwrap();
        assert_eq!(rule.operator, ComparisonOperator::GreaterThan);
        assert_eq!(rule.direction, ScaleDirection::Increase);
    }

    #[test]
    fn missing_metric_name() {
        let mut cfg = cpu_rule();
        cfg.metric_name.clear();
        assert_eq!(
            MetricScaleRule::build(&cfg).unwrap_err().kind(),
            ErrorKind::MissingField
        );
    }

    #[test]
    fn threshold_must_be_numeric() {
        for bad in [
            None,
            Some(Value::from("75")),
            Some(Value::Bool(true)),
            Some(Value::Null),
            Some(serde_json::json!([75])),
        ] {
            let mut cfg = cpu_rule();
            cfg.threshold = bad.clone();
            let err = MetricScaleRule::build(&cfg).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidType, "{bad:?}");
        }
    }

    #[test]
    fn zero_threshold_is_valid() {
        let mut cfg = cpu_rule();
        cfg.threshold = Some(Value::from(0));
        let rule = MetricScaleRule::build(&cfg).unwrap();
        assert_eq!(rule.threshold, 0.0);
    }

    #[test]
    fn threshold_from_json_string_rejected() {
        let json = serde_json::json!({
            "metricName": "Percentage CPU",
            "threshold": "high"
        });
        let cfg: MetricRuleConfig = serde_json::from_value(json).unwrap();
        let err = MetricScaleRule::build(&cfg).unwrap_err();
        assert!(err.message().contains("threshold"));
    }

    #[test]
    fn malformed_duration_rejected() {
        let mut cfg = cpu_rule();
        cfg.cooldown = Some("5 minutes".into());
        let err = MetricScaleRule::build(&cfg).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);
        assert!(err.message().contains("cooldown"));
    }

    #[test]
    fn keeps_supplied_durations() {
        let mut cfg = cpu_rule();
        cfg.time_window = Some("PT10M".into());
        cfg.cooldown = Some("PT1H".into());
        let rule = MetricScaleRule::build(&cfg).unwrap();
        assert_eq!(rule.time_window, "PT10M");
        assert_eq!(rule.cooldown, "PT1H");
    }

    #[test]
    fn triggers_on_operator() {
        let rule = MetricScaleRule::build(&cpu_rule()).unwrap();
        assert!(rule.triggers_on(80.0));
        assert!(!rule.triggers_on(75.0));

        let cfg = MetricRuleConfig::new(
            "Percentage CPU",
            ComparisonOperator::LessThan,
            25.0,
            ScaleDirection::Decrease,
        );
        let rule = MetricScaleRule::build(&cfg).unwrap();
        assert!(rule.triggers_on(10.0));
        assert!(!rule.triggers_on(30.0));
    }

    #[test]
    fn rebuild_from_output_is_identical() {
        let mut cfg = cpu_rule();
        cfg.metric_resource_uri = Some("/subscriptions/x/vmss/web".into());
        cfg.change_type = Some(ScaleChangeType::PercentChangeCount);
        cfg.value = Some(20);
        let first = MetricScaleRule::build(&cfg).unwrap();

        let json = serde_json::to_value(&first).unwrap();
        let again: MetricRuleConfig = serde_json::from_value(json).unwrap();
        assert_eq!(MetricScaleRule::build(&again).unwrap(), first);
    }
}
