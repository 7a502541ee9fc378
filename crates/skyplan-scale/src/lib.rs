//! skyplan-scale — how a single fleet scales.
//!
//! # Components
//!
//! - **`vmss`** — scale set topology (orchestration mode, fault domains, upgrade policy)
//! - **`rule`** — metric-triggered scale rules
//! - **`schedule`** — recurrence and fixed-date schedule profiles, business-hours composer
//! - **`policy`** — autoscale policies bound to one target, CPU policy composer
//!
//! Data flows bottom-up: capacity profiles and rules are composed into
//! profiles, profiles into a policy. Every builder validates its own
//! input and returns a fresh value; nothing here holds state.

pub mod policy;
pub mod rule;
pub mod schedule;
pub mod vmss;

pub use policy::{
    AutoScaleNotification, AutoScalePolicy, AutoScalePolicyConfig, AutoScaleProfile,
    AutoScaleProfileConfig, CpuScalingPolicyConfig, EmailNotification, NotificationConfig,
    Webhook, DEFAULT_PROFILE_NAME,
};
pub use rule::{
    ComparisonOperator, MetricRuleConfig, MetricScaleRule, MetricStatistic, ScaleChangeType,
    ScaleDirection, TimeAggregation,
};
pub use schedule::{
    BusinessHoursConfig, Day, FixedDate, FixedDateConfig, HourRange, Recurrence,
    RecurrenceConfig, RecurrenceFrequency, ScheduleProfile, ScheduleProfileConfig, ScheduleTrigger,
};
pub use vmss::{
    OrchestrationMode, RollingUpgradePolicy, UpgradeMode, UpgradePolicy, VmssConfig,
    VmssTopology,
};
