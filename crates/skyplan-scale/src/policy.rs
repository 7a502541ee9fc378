//! Autoscale policies — named profile collections bound to one target.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use skyplan_core::{require, BuildError, BuildResult, CapacityConfig, CapacityProfile};

use crate::rule::{
    ComparisonOperator, MetricRuleConfig, MetricScaleRule, ScaleChangeType, ScaleDirection,
    DEFAULT_COOLDOWN, DEFAULT_TIME_WINDOW,
};
use crate::schedule::{
    trigger_of, FixedDate, FixedDateConfig, Recurrence, RecurrenceConfig, ScheduleProfile,
    ScheduleTrigger,
};

/// Name of the single profile produced by the CPU policy composer.
pub const DEFAULT_PROFILE_NAME: &str = "Default Profile";

pub const CPU_METRIC: &str = "Percentage CPU";
pub const DEFAULT_SCALE_OUT_THRESHOLD: f64 = 75.0;
pub const DEFAULT_SCALE_IN_THRESHOLD: f64 = 25.0;

// ── Profiles ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoScaleProfileConfig {
    #[serde(default)]
    pub name: String,
    pub capacity: CapacityConfig,
    #[serde(default)]
    pub rules: Vec<MetricRuleConfig>,
    pub fixed_date: Option<FixedDateConfig>,
    pub recurrence: Option<RecurrenceConfig>,
}

/// A capacity range plus the rules active while the profile applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoScaleProfile {
    pub name: String,
    pub capacity: CapacityProfile,
    pub rules: Vec<MetricScaleRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_date: Option<FixedDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
}

impl AutoScaleProfile {
    pub fn build(config: &AutoScaleProfileConfig) -> BuildResult<Self> {
        require(&config.name, "autoscale profile name is required")?;
        let capacity = CapacityProfile::build(&config.capacity)?;
        let rules = config
            .rules
            .iter()
            .map(MetricScaleRule::build)
            .collect::<BuildResult<Vec<_>>>()?;
        let fixed_date = config.fixed_date.as_ref().map(FixedDate::build).transpose()?;
        let recurrence = config.recurrence.as_ref().map(Recurrence::build).transpose()?;

        if rules.is_empty() && fixed_date.is_none() && recurrence.is_none() {
            warn!(
                profile = %config.name,
                "autoscale profile has no rules and no schedule; capacity stays at its default"
            );
        }

        Ok(Self {
            name: config.name.clone(),
            capacity,
            rules,
            fixed_date,
            recurrence,
        })
    }

    /// Attach already-built rules to a schedule profile.
    pub fn from_schedule(schedule: ScheduleProfile, rules: Vec<MetricScaleRule>) -> Self {
        Self {
            name: schedule.name,
            capacity: schedule.capacity,
            rules,
            fixed_date: schedule.fixed_date,
            recurrence: schedule.recurrence,
        }
    }

    pub fn trigger(&self) -> ScheduleTrigger {
        trigger_of(self.recurrence.is_some(), self.fixed_date.is_some())
    }
}

// ── Notifications ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailNotification {
    #[serde(default)]
    pub send_to_subscription_administrator: bool,
    #[serde(default)]
    pub send_to_subscription_co_administrators: bool,
    #[serde(default)]
    pub custom_emails: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    #[serde(default)]
    pub service_uri: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationConfig {
    pub email: Option<EmailNotification>,
    #[serde(default)]
    pub webhooks: Vec<Webhook>,
}

/// Who is told when the policy scales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoScaleNotification {
    /// Always `"Scale"`.
    pub operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailNotification>,
    pub webhooks: Vec<Webhook>,
}

impl AutoScaleNotification {
    pub fn build(config: &NotificationConfig) -> BuildResult<Self> {
        if config.email.is_none() && config.webhooks.is_empty() {
            return Err(BuildError::cardinality(
                "notification requires an email target or at least one webhook",
            ));
        }
        for hook in &config.webhooks {
            require(&hook.service_uri, "webhook serviceUri is required")?;
        }
        Ok(Self {
            operation: "Scale".to_string(),
            email: config.email.clone(),
            webhooks: config.webhooks.clone(),
        })
    }
}

// ── Policy ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoScalePolicyConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub target_resource_uri: String,
    pub enabled: Option<bool>,
    #[serde(default)]
    pub profiles: Vec<AutoScaleProfileConfig>,
    #[serde(default)]
    pub notifications: Vec<NotificationConfig>,
}

/// A validated autoscale policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoScalePolicy {
    pub name: String,
    pub target_resource_uri: String,
    pub enabled: bool,
    pub profiles: Vec<AutoScaleProfile>,
    pub notifications: Vec<AutoScaleNotification>,
}

impl AutoScalePolicy {
    /// Validate an autoscale policy.
    ///
    /// An empty profile list is rejected before anything else, so it is a
    /// cardinality error whatever the other fields hold. Then: name,
    /// targetResourceUri, each profile, profile name uniqueness,
    /// notifications.
    pub fn build(config: &AutoScalePolicyConfig) -> BuildResult<Self> {
        if config.profiles.is_empty() {
            return Err(BuildError::cardinality(
                "autoscale policy requires at least one profile",
            ));
        }
        require(&config.name, "autoscale policy name is required")?;
        require(
            &config.target_resource_uri,
            "autoscale policy targetResourceUri is required",
        )?;

        let profiles = config
            .profiles
            .iter()
            .map(AutoScaleProfile::build)
            .collect::<BuildResult<Vec<_>>>()?;

        let mut seen = HashSet::new();
        if let Some(dup) = profiles.iter().find(|p| !seen.insert(p.name.as_str())) {
            return Err(BuildError::cardinality(format!(
                "autoscale profile names must be unique, {:?} appears more than once",
                dup.name
            )));
        }

        let notifications = config
            .notifications
            .iter()
            .map(AutoScaleNotification::build)
            .collect::<BuildResult<Vec<_>>>()?;

        let policy = Self {
            name: config.name.clone(),
            target_resource_uri: config.target_resource_uri.clone(),
            enabled: config.enabled.unwrap_or(true),
            profiles,
            notifications,
        };

        debug!(
            policy = %policy.name,
            target = %policy.target_resource_uri,
            profiles = policy.profiles.len(),
            rules = policy.rule_count(),
            "autoscale policy built"
        );
        Ok(policy)
    }

    /// Compose the canonical CPU policy: one profile, scale out above
    /// the high threshold, scale in below the low one.
    pub fn cpu(config: &CpuScalingPolicyConfig) -> BuildResult<Self> {
        let scale_out = config.scale_out_threshold.unwrap_or(DEFAULT_SCALE_OUT_THRESHOLD);
        let scale_in = config.scale_in_threshold.unwrap_or(DEFAULT_SCALE_IN_THRESHOLD);
        if scale_in >= scale_out {
            return Err(BuildError::range(format!(
                "scaleInThreshold ({scale_in}) must be below scaleOutThreshold ({scale_out})"
            )));
        }

        let metric = config
            .metric_name
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| CPU_METRIC.to_string());
        let resource_uri = Some(config.target_resource_uri.clone())
            .filter(|uri| !uri.trim().is_empty());

        let rule = |operator: ComparisonOperator, threshold: f64, direction: ScaleDirection| {
            MetricRuleConfig {
                metric_resource_uri: resource_uri.clone(),
                time_window: Some(DEFAULT_TIME_WINDOW.to_string()),
                cooldown: Some(DEFAULT_COOLDOWN.to_string()),
                change_type: Some(ScaleChangeType::ChangeCount),
                value: Some(1),
                ..MetricRuleConfig::new(metric.clone(), operator, threshold, direction)
            }
        };

        Self::build(&AutoScalePolicyConfig {
            name: config.name.clone(),
            target_resource_uri: config.target_resource_uri.clone(),
            enabled: config.enabled,
            profiles: vec![AutoScaleProfileConfig {
                name: DEFAULT_PROFILE_NAME.to_string(),
                capacity: config.capacity.unwrap_or(CapacityConfig::new(2, 10, 2)),
                rules: vec![
                    rule(ComparisonOperator::GreaterThan, scale_out, ScaleDirection::Increase),
                    rule(ComparisonOperator::LessThan, scale_in, ScaleDirection::Decrease),
                ],
                fixed_date: None,
                recurrence: None,
            }],
            notifications: config.notifications.clone(),
        })
    }

    pub fn profile(&self, name: &str) -> Option<&AutoScaleProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn rule_count(&self) -> usize {
        self.profiles.iter().map(|p| p.rules.len()).sum()
    }
}

/// Inputs to [`AutoScalePolicy::cpu`]. Capacity defaults to `{2, 10, 2}`,
/// thresholds to 75 and 25.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuScalingPolicyConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub target_resource_uri: String,
    pub enabled: Option<bool>,
    pub capacity: Option<CapacityConfig>,
    pub metric_name: Option<String>,
    pub scale_out_threshold: Option<f64>,
    pub scale_in_threshold: Option<f64>,
    #[serde(default)]
    pub notifications: Vec<NotificationConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{BusinessHoursConfig, HourRange};
    use skyplan_core::ErrorKind;

    const TARGET: &str = "/subscriptions/0000/resourceGroups/rg/providers/Microsoft.Compute/virtualMachineScaleSets/web";

    fn cpu_config() -> CpuScalingPolicyConfig {
        CpuScalingPolicyConfig {
            name: "cpu-autoscale".into(),
            target_resource_uri: TARGET.into(),
            ..Default::default()
        }
    }

    fn profile(name: &str) -> AutoScaleProfileConfig {
        AutoScaleProfileConfig {
            name: name.into(),
            capacity: CapacityConfig::new(1, 4, 1),
            rules: vec![],
            fixed_date: None,
            recurrence: None,
        }
    }

    #[test]
    fn cpu_policy_shape() {
        let policy = AutoScalePolicy::cpu(&cpu_config()).unwrap();
        assert!(policy.enabled);
        assert_eq!(policy.profiles.len(), 1);

        let profile = &policy.profiles[0];
        assert_eq!(profile.name, "Default Profile");
        assert_eq!(profile.capacity, CapacityProfile::new(2, 10, 2).unwrap());
        assert_eq!(profile.rules.len(), 2);

        let out = &profile.rules[0];
        assert_eq!(out.direction, ScaleDirection::Increase);
        assert_eq!(out.operator, ComparisonOperator::GreaterThan);
        assert_eq!(out.threshold, 75.0);
        assert_eq!(out.metric_name, "Percentage CPU");
        assert_eq!(out.metric_resource_uri.as_deref(), Some(TARGET));

        let inward = &profile.rules[1];
        assert_eq!(inward.direction, ScaleDirection::Decrease);
        assert_eq!(inward.operator, ComparisonOperator::LessThan);
        assert_eq!(inward.threshold, 25.0);

        for rule in &profile.rules {
            assert_eq!(rule.time_window, "PT5M");
            assert_eq!(rule.cooldown, "PT5M");
            assert_eq!(rule.value, 1);
            assert_eq!(rule.change_type, ScaleChangeType::ChangeCount);
        }
    }

    #[test]
    fn cpu_policy_custom_thresholds() {
        let mut cfg = cpu_config();
        cfg.scale_out_threshold = Some(80.0);
        cfg.scale_in_threshold = Some(30.0);
        let policy = AutoScalePolicy::cpu(&cfg).unwrap();
        let rules = &policy.profiles[0].rules;
        assert_eq!(rules[0].threshold, 80.0);
        assert_eq!(rules[1].threshold, 30.0);
    }

    #[test]
    fn cpu_policy_rejects_crossed_thresholds() {
        let mut cfg = cpu_config();
        cfg.scale_out_threshold = Some(20.0);
        assert_eq!(
            AutoScalePolicy::cpu(&cfg).unwrap_err().kind(),
            ErrorKind::InvalidRange
        );
    }

    #[test]
    fn cpu_policy_requires_name() {
        let mut cfg = cpu_config();
        cfg.name.clear();
        assert_eq!(
            AutoScalePolicy::cpu(&cfg).unwrap_err(),
            BuildError::MissingField("autoscale policy name is required".into())
        );
    }

    #[test]
    fn empty_profiles_is_cardinality_error() {
        let cases = [
            ("", ""),
            ("policy", ""),
            ("", TARGET),
            ("policy", TARGET),
        ];
        for (name, target) in cases {
            let cfg = AutoScalePolicyConfig {
                name: name.into(),
                target_resource_uri: target.into(),
                ..Default::default()
            };
            let err = AutoScalePolicy::build(&cfg).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::CardinalityViolation, "{name:?} {target:?}");
        }
    }

    #[test]
    fn name_checked_before_target() {
        let cfg = AutoScalePolicyConfig {
            profiles: vec![profile("base")],
            ..Default::default()
        };
        let err = AutoScalePolicy::build(&cfg).unwrap_err();
        assert!(err.message().contains("name"));

        let cfg = AutoScalePolicyConfig {
            name: "policy".into(),
            profiles: vec![profile("base")],
            ..Default::default()
        };
        let err = AutoScalePolicy::build(&cfg).unwrap_err();
        assert!(err.message().contains("targetResourceUri"));
    }

    #[test]
    fn duplicate_profile_names_rejected() {
        let cfg = AutoScalePolicyConfig {
            name: "policy".into(),
            target_resource_uri: TARGET.into(),
            profiles: vec![profile("base"), profile("base")],
            ..Default::default()
        };
        assert_eq!(
            AutoScalePolicy::build(&cfg).unwrap_err().kind(),
            ErrorKind::CardinalityViolation
        );
    }

    #[test]
    fn invalid_rule_fails_policy() {
        let mut p = profile("base");
        p.rules.push(MetricRuleConfig {
            metric_name: "Percentage CPU".into(),
            ..Default::default()
        });
        let cfg = AutoScalePolicyConfig {
            name: "policy".into(),
            target_resource_uri: TARGET.into(),
            profiles: vec![p],
            ..Default::default()
        };
        assert_eq!(
            AutoScalePolicy::build(&cfg).unwrap_err().kind(),
            ErrorKind::InvalidType
        );
    }

    #[test]
    fn enabled_can_be_disabled() {
        let mut cfg = cpu_config();
        cfg.enabled = Some(false);
        assert!(!AutoScalePolicy::cpu(&cfg).unwrap().enabled);
    }

    #[test]
    fn notifications() {
        let mut cfg = cpu_config();
        cfg.notifications = vec![NotificationConfig {
            email: Some(EmailNotification {
                send_to_subscription_administrator: true,
                custom_emails: vec!["ops@example.com".into()],
                ..Default::default()
            }),
            webhooks: vec![Webhook {
                service_uri: "https://hooks.example.com/scale".into(),
                properties: BTreeMap::new(),
            }],
        }];
        let policy = AutoScalePolicy::cpu(&cfg).unwrap();
        assert_eq!(policy.notifications.len(), 1);
        assert_eq!(policy.notifications[0].operation, "Scale");

        cfg.notifications = vec![NotificationConfig::default()];
        assert_eq!(
            AutoScalePolicy::cpu(&cfg).unwrap_err().kind(),
            ErrorKind::CardinalityViolation
        );

        cfg.notifications = vec![NotificationConfig {
            email: None,
            webhooks: vec![Webhook::default()],
        }];
        assert_eq!(
            AutoScalePolicy::cpu(&cfg).unwrap_err().kind(),
            ErrorKind::MissingField
        );
    }

    #[test]
    fn schedule_profiles_compose_into_policy() {
        let [business, off] = ScheduleProfile::business_hours(&BusinessHoursConfig {
            business_hours_capacity: CapacityConfig::new(4, 20, 6),
            off_hours_capacity: CapacityConfig::new(1, 4, 1),
            time_zone: None,
            business_days: None,
            business_hours: Some(HourRange { start: 9, end: 17 }),
        })
        .unwrap();

        let cpu = AutoScalePolicy::cpu(&cpu_config()).unwrap();
        let rules = cpu.profiles[0].rules.clone();

        let profiles = [
            AutoScaleProfile::from_schedule(business, rules.clone()),
            AutoScaleProfile::from_schedule(off, rules),
        ];
        assert_eq!(profiles[0].trigger(), ScheduleTrigger::Recurring);

        let json = serde_json::json!({
            "name": "scheduled",
            "targetResourceUri": TARGET,
            "profiles": profiles,
        });
        let cfg: AutoScalePolicyConfig = serde_json::from_value(json).unwrap();
        let policy = AutoScalePolicy::build(&cfg).unwrap();
        assert_eq!(policy.profiles.len(), 2);
        assert_eq!(policy.rule_count(), 4);
        assert!(policy.profile("Off Hours").is_some());
    }

    #[test]
    fn rebuild_from_output_is_identical() {
        let first = AutoScalePolicy::cpu(&cpu_config()).unwrap();
        let json = serde_json::to_value(&first).unwrap();
        let cfg: AutoScalePolicyConfig = serde_json::from_value(json).unwrap();
        assert_eq!(AutoScalePolicy::build(&cfg).unwrap(), first);
    }
}
