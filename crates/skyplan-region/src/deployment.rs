//! Multi-region deployment plans.
//!
//! A plan aggregates per-region deployments and enforces the one
//! plan-level role invariant: exactly one region is Primary. Individual
//! region deployments know nothing about the plan that holds them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use skyplan_core::{require, BuildError, BuildResult, CapacityProfile};
use skyplan_scale::VmssTopology;

use crate::peering::mesh_peering_count;
use crate::traffic::TrafficManagerProfile;

pub const DEFAULT_BASELINE_CAPACITY: u32 = 2;
pub const PRIMARY_FAILOVER_PRIORITY: u32 = 1;
pub const STANDBY_FAILOVER_PRIORITY: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionRole {
    Primary,
    Secondary,
    Tertiary,
}

impl RegionRole {
    pub fn default_failover_priority(&self) -> u32 {
        match self {
            RegionRole::Primary => PRIMARY_FAILOVER_PRIORITY,
            RegionRole::Secondary | RegionRole::Tertiary => STANDBY_FAILOVER_PRIORITY,
        }
    }
}

// ── Region ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionConfig {
    #[serde(default)]
    pub region: String,
    pub role: RegionRole,
    pub vmss_name: Option<String>,
    pub traffic_manager_endpoint_name: Option<String>,
    pub baseline_capacity: Option<u32>,
    pub max_capacity: Option<u32>,
    pub failover_priority: Option<u32>,
}

impl RegionConfig {
    pub fn new(region: impl Into<String>, role: RegionRole) -> Self {
        Self {
            region: region.into(),
            role,
            vmss_name: None,
            traffic_manager_endpoint_name: None,
            baseline_capacity: None,
            max_capacity: None,
            failover_priority: None,
        }
    }
}

/// One region's share of a deployment plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionDeployment {
    pub region: String,
    pub role: RegionRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vmss_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_manager_endpoint_name: Option<String>,
    pub baseline_capacity: u32,
    pub max_capacity: u32,
    pub failover_priority: u32,
}

impl RegionDeployment {
    /// Validate one region and fill its defaults.
    pub fn build(config: &RegionConfig) -> BuildResult<Self> {
        require(&config.region, "region name is required for a region deployment")?;
        let region = config.region.trim().to_string();

        let baseline = config.baseline_capacity.unwrap_or(DEFAULT_BASELINE_CAPACITY);
        let max = config.max_capacity.unwrap_or(baseline);
        if max < baseline {
            return Err(BuildError::range(format!(
                "region {region:?} maxCapacity ({max}) must not be below baselineCapacity ({baseline})"
            )));
        }

        Ok(Self {
            region,
            role: config.role,
            vmss_name: config.vmss_name.clone(),
            traffic_manager_endpoint_name: config.traffic_manager_endpoint_name.clone(),
            baseline_capacity: baseline,
            max_capacity: max,
            failover_priority: config
                .failover_priority
                .unwrap_or(config.role.default_failover_priority()),
        })
    }

    pub fn is_primary(&self) -> bool {
        self.role == RegionRole::Primary
    }

    /// The region's instance range as a capacity profile, defaulting to
    /// the baseline.
    pub fn capacity_profile(&self) -> BuildResult<CapacityProfile> {
        CapacityProfile::new(self.baseline_capacity, self.max_capacity, self.baseline_capacity)
    }
}

// ── Plan ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_vault_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_policy_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_insights_resource_id: Option<String>,
    #[serde(default)]
    pub action_group_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiRegionConfig {
    #[serde(default)]
    pub application_name: String,
    #[serde(default)]
    pub traffic_manager_profile: String,
    #[serde(default)]
    pub regions: Vec<RegionConfig>,
    #[serde(default)]
    pub replication: ReplicationConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// A validated multi-region deployment plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiRegionDeploymentPlan {
    pub application_name: String,
    /// Name of the Traffic Manager profile fronting the plan.
    pub traffic_manager_profile: String,
    pub regions: Vec<RegionDeployment>,
    pub replication: ReplicationConfig,
    pub monitoring: MonitoringConfig,
}

impl MultiRegionDeploymentPlan {
    /// Validate a plan.
    ///
    /// Checks, in order: applicationName, trafficManagerProfile, at least
    /// two regions, exactly one Primary, each region, region uniqueness,
    /// then replication settings.
    pub fn build(config: &MultiRegionConfig) -> BuildResult<Self> {
        require(
            &config.application_name,
            "applicationName is required for a multi-region deployment",
        )?;
        require(
            &config.traffic_manager_profile,
            "trafficManagerProfile is required for a multi-region deployment",
        )?;

        if config.regions.len() < 2 {
            return Err(BuildError::cardinality(format!(
                "multi-region deployment requires at least two regions, got {}",
                config.regions.len()
            )));
        }

        let primaries = config
            .regions
            .iter()
            .filter(|r| r.role == RegionRole::Primary)
            .count();
        if primaries != 1 {
            return Err(BuildError::cardinality(format!(
                "multi-region deployment must have exactly one primary region, got {primaries}"
            )));
        }

        let regions = config
            .regions
            .iter()
            .map(RegionDeployment::build)
            .collect::<BuildResult<Vec<_>>>()?;

        let mut seen = HashSet::new();
        if let Some(dup) = regions
            .iter()
            .find(|r| !seen.insert(r.region.to_ascii_lowercase()))
        {
            return Err(BuildError::cardinality(format!(
                "region {:?} appears more than once in the plan",
                dup.region
            )));
        }

        if config.replication.enabled {
            let vault = config.replication.recovery_vault_name.as_deref().unwrap_or("");
            require(vault, "replication requires a recoveryVaultName when enabled")?;
        }

        let plan = Self {
            application_name: config.application_name.clone(),
            traffic_manager_profile: config.traffic_manager_profile.clone(),
            regions,
            replication: config.replication.clone(),
            monitoring: config.monitoring.clone(),
        };

        debug!(
            application = %plan.application_name,
            regions = plan.regions.len(),
            primary = plan.primary().map(|r| r.region.as_str()).unwrap_or_default(),
            replication = plan.replication.enabled,
            "multi-region deployment plan built"
        );
        Ok(plan)
    }

    pub fn primary(&self) -> Option<&RegionDeployment> {
        self.regions.iter().find(|r| r.is_primary())
    }

    pub fn region(&self, name: &str) -> Option<&RegionDeployment> {
        self.regions
            .iter()
            .find(|r| r.region.eq_ignore_ascii_case(name.trim()))
    }

    /// Regions by ascending failover priority. Ties keep plan order.
    pub fn failover_order(&self) -> Vec<&RegionDeployment> {
        let mut ordered: Vec<_> = self.regions.iter().collect();
        ordered.sort_by_key(|r| r.failover_priority);
        ordered
    }

    /// Summed in `u64`; per-region capacities are unbounded `u32`s.
    pub fn total_baseline_capacity(&self) -> u64 {
        self.regions.iter().map(|r| u64::from(r.baseline_capacity)).sum()
    }

    pub fn total_max_capacity(&self) -> u64 {
        self.regions.iter().map(|r| u64::from(r.max_capacity)).sum()
    }

    /// Peering links a full mesh between this plan's regions would need.
    pub fn mesh_peering_count(&self) -> usize {
        mesh_peering_count(self.regions.len())
    }

    /// Check that the plan is fronted by `profile` and that every region's
    /// endpoint name exists in it.
    pub fn verify_endpoints(&self, profile: &TrafficManagerProfile) -> BuildResult<()> {
        if profile.name != self.traffic_manager_profile {
            return Err(BuildError::missing(format!(
                "plan references Traffic Manager profile {:?}, got {:?}",
                self.traffic_manager_profile, profile.name
            )));
        }
        for region in &self.regions {
            if let Some(endpoint) = &region.traffic_manager_endpoint_name
                && profile.endpoint(endpoint).is_none()
            {
                return Err(BuildError::missing(format!(
                    "region {:?} references endpoint {endpoint:?}, which profile {:?} does not define",
                    region.region, profile.name
                )));
            }
        }
        Ok(())
    }

    /// Check that every referenced scale set exists and can reach the
    /// region's maximum capacity.
    pub fn verify_scale_sets(&self, scale_sets: &[VmssTopology]) -> BuildResult<()> {
        for region in &self.regions {
            let Some(name) = &region.vmss_name else {
                continue;
            };
            let vmss = scale_sets.iter().find(|v| &v.name == name).ok_or_else(|| {
                BuildError::missing(format!(
                    "region {:?} references scale set {name:?}, which is not defined",
                    region.region
                ))
            })?;
            if region.max_capacity > vmss.capacity.maximum() {
                return Err(BuildError::range(format!(
                    "region {:?} maxCapacity ({}) exceeds scale set {name:?} maximum ({})",
                    region.region,
                    region.max_capacity,
                    vmss.capacity.maximum()
                )));
            }
        }
        Ok(())
    }
}
