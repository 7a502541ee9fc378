//! Builder registry — entity kind name to builder.
//!
//! The registry is an ordinary value built once in `main` and handed to
//! the commands that need it. Every builder takes its config as a JSON
//! value and returns the built entity as JSON.

use std::collections::BTreeMap;

use anyhow::{bail, Context};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use skyplan_core::{BuildResult, CapacityProfile};
use skyplan_region::{
    FailoverPlan, FailoverStep, MultiRegionDeploymentPlan, RegionDeployment,
    TrafficManagerEndpoint, TrafficManagerMonitor, TrafficManagerProfile,
};
use skyplan_scale::{
    AutoScaleNotification, AutoScalePolicy, AutoScaleProfile, MetricScaleRule, ScheduleProfile,
    VmssTopology,
};

pub type BuildFn = fn(Value) -> anyhow::Result<Value>;

#[derive(Clone, Copy)]
pub struct RegistryEntry {
    pub summary: &'static str,
    pub build: BuildFn,
}

pub struct BuilderRegistry {
    entries: BTreeMap<&'static str, RegistryEntry>,
}

impl BuilderRegistry {
    pub fn empty() -> Self {
        Self { entries: BTreeMap::new() }
    }

    /// Every entity kind skyplan knows how to build.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register("capacityProfile", "min/max/default instance counts", |v| {
            run(v, CapacityProfile::build)
        });
        registry.register("vmss", "virtual machine scale set topology", |v| {
            run(v, VmssTopology::build)
        });
        registry.register("metricRule", "metric-triggered scale rule", |v| {
            run(v, MetricScaleRule::build)
        });
        registry.register("scheduleProfile", "recurring or fixed-date capacity profile", |v| {
            run(v, ScheduleProfile::build)
        });
        registry.register("businessHours", "business-hours and off-hours profile pair", |v| {
            run(v, ScheduleProfile::business_hours)
        });
        registry.register("autoscaleProfile", "capacity range with its scale rules", |v| {
            run(v, AutoScaleProfile::build)
        });
        registry.register("autoscaleNotification", "email and webhook scale notifications", |v| {
            run(v, AutoScaleNotification::build)
        });
        registry.register("autoscalePolicy", "autoscale policy bound to one resource", |v| {
            run(v, AutoScalePolicy::build)
        });
        registry.register("cpuAutoscalePolicy", "CPU-threshold autoscale policy", |v| {
            run(v, AutoScalePolicy::cpu)
        });
        registry.register("trafficManagerEndpoint", "typed Traffic Manager endpoint", |v| {
            run(v, TrafficManagerEndpoint::build)
        });
        registry.register("trafficManagerMonitor", "endpoint health probe settings", |v| {
            run(v, TrafficManagerMonitor::build)
        });
        registry.register("trafficManagerProfile", "DNS routing profile with endpoints", |v| {
            run(v, TrafficManagerProfile::build)
        });
        registry.register("regionDeployment", "one region's share of a plan", |v| {
            run(v, RegionDeployment::build)
        });
        registry.register("multiRegionPlan", "multi-region deployment plan", |v| {
            run(v, MultiRegionDeploymentPlan::build)
        });
        registry.register("failoverStep", "single failover runbook step", |v| {
            run(v, FailoverStep::build)
        });
        registry.register("failoverPlan", "ordered failover runbook", |v| {
            run(v, FailoverPlan::build)
        });
        registry
    }

    pub fn register(&mut self, kind: &'static str, summary: &'static str, build: BuildFn) {
        self.entries.insert(kind, RegistryEntry { summary, build });
    }

    pub fn get(&self, kind: &str) -> Option<&RegistryEntry> {
        self.entries.get(kind)
    }

    /// Kind names with their summaries, sorted by name.
    pub fn kinds(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.entries.iter().map(|(kind, entry)| (*kind, entry.summary))
    }

    pub fn build(&self, kind: &str, config: Value) -> anyhow::Result<Value> {
        let Some(entry) = self.get(kind) else {
            bail!("unknown entity kind {kind:?}, run `skyplan kinds` for the list");
        };
        (entry.build)(config).with_context(|| format!("building {kind}"))
    }
}

fn run<C, T>(config: Value, build: fn(&C) -> BuildResult<T>) -> anyhow::Result<Value>
where
    C: DeserializeOwned,
    T: Serialize,
{
    let config: C =
        serde_json::from_value(config).context("config does not match the expected shape")?;
    let built = build(&config)?;
    Ok(serde_json::to_value(built)?)
}
