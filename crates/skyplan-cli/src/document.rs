//! Plan documents — the `skyplan.toml` file the CLI validates.
//!
//! Every section is optional; `check` builds the sections present and
//! cross-checks the ones that reference each other.
//!
//! ```text
//! [capacity]            CapacityProfile
//! [[scaleSets]]         VmssTopology, one per entry
//! [autoscale]           AutoScalePolicy
//! [cpuAutoscale]        AutoScalePolicy via the CPU composer
//! [businessHours]       business/off-hours ScheduleProfile pair
//! [trafficManager]      TrafficManagerProfile
//! [deployment]          MultiRegionDeploymentPlan
//! [failover]            FailoverPlan
//! ```
//!
//! Fixed-date schedule bounds must be quoted strings
//! (`start = "2026-11-27T00:00:00"`), not bare TOML datetimes.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use skyplan_core::CapacityConfig;
use skyplan_region::{
    EndpointConfig, FailoverConfig, FailoverStepConfig, MultiRegionConfig, RegionConfig,
    RegionRole, TrafficManagerConfig,
};
use skyplan_scale::{
    AutoScalePolicyConfig, BusinessHoursConfig, CpuScalingPolicyConfig, VmssConfig,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<CapacityConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scale_sets: Vec<VmssConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoscale: Option<AutoScalePolicyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_autoscale: Option<CpuScalingPolicyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_hours: Option<BusinessHoursConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_manager: Option<TrafficManagerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<MultiRegionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failover: Option<FailoverConfig>,
}

impl PlanDocument {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let doc = if is_json(path) {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {} as JSON", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse {} as TOML", path.display()))?
        };
        Ok(doc)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Scaffold a minimal valid plan: one scale set behind CPU autoscale,
    /// two regions in West and North Europe, a priority-routed Traffic
    /// Manager profile and a two-step failover runbook.
    pub fn scaffold(app: &str) -> Self {
        let vmss_name = format!("{app}-weu-vmss");
        let target = format!(
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/{app}-rg/providers/Microsoft.Compute/virtualMachineScaleSets/{vmss_name}"
        );

        let mut weu_endpoint = EndpointConfig::external("weu", format!("{app}-weu.example.com"));
        weu_endpoint.priority = Some(1);
        let mut neu_endpoint = EndpointConfig::external("neu", format!("{app}-neu.example.com"));
        neu_endpoint.priority = Some(2);

        let mut primary = RegionConfig::new("westeurope", RegionRole::Primary);
        primary.vmss_name = Some(vmss_name.clone());
        primary.traffic_manager_endpoint_name = Some("weu".to_string());
        primary.max_capacity = Some(10);
        let mut secondary = RegionConfig::new("northeurope", RegionRole::Secondary);
        secondary.traffic_manager_endpoint_name = Some("neu".to_string());
        secondary.max_capacity = Some(10);

        PlanDocument {
            capacity: Some(CapacityConfig::new(2, 10, 2)),
            scale_sets: vec![VmssConfig::new(
                vmss_name,
                "Standard_D2s_v3",
                CapacityConfig::new(2, 10, 2),
            )],
            autoscale: None,
            cpu_autoscale: Some(CpuScalingPolicyConfig {
                name: format!("{app}-cpu-autoscale"),
                target_resource_uri: target,
                ..Default::default()
            }),
            business_hours: None,
            traffic_manager: Some(TrafficManagerConfig {
                name: format!("{app}-tm"),
                dns_name: app.to_string(),
                endpoints: vec![weu_endpoint, neu_endpoint],
                ..Default::default()
            }),
            deployment: Some(MultiRegionConfig {
                application_name: app.to_string(),
                traffic_manager_profile: format!("{app}-tm"),
                regions: vec![primary, secondary],
                ..Default::default()
            }),
            failover: Some(FailoverConfig {
                name: format!("{app}-failover"),
                primary_region: "westeurope".to_string(),
                secondary_region: "northeurope".to_string(),
                detection_threshold_minutes: None,
                steps: vec![
                    FailoverStepConfig {
                        name: "Disable primary endpoint".to_string(),
                        description: "Disable the weu Traffic Manager endpoint".to_string(),
                        ..Default::default()
                    },
                    FailoverStepConfig {
                        name: "Validate traffic".to_string(),
                        description: "Verify northeurope serves production traffic".to_string(),
                        ..Default::default()
                    },
                ],
            }),
        }
    }
}

/// Read a single entity config as a JSON value, from TOML or JSON.
pub fn read_value(path: &Path) -> anyhow::Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if is_json(path) {
        return serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {} as JSON", path.display()));
    }
    let value: toml::Value = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {} as TOML", path.display()))?;
    Ok(serde_json::to_value(value)?)
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
