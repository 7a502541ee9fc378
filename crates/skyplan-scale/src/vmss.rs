//! Scale set topology — orchestration mode, placement and upgrade policy.
//!
//! The orchestration mode picks the validation branch:
//!
//! ```text
//! Uniform:  fault domains in [1, 3], upgradePolicy always attached,
//!           Rolling adds the fixed 20/20/20 rolling sub-policy
//! Flexible: fault domains in [1, 5], no upgradePolicy,
//!           singlePlacementGroup defaults to false
//! ```
//!
//! A topology's mode never changes; switching modes means building a new
//! topology.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use skyplan_core::{require, BuildError, BuildResult, CapacityConfig, CapacityProfile, IsoDuration};

/// Location expression used when the caller leaves `location` unset.
pub const RESOURCE_GROUP_LOCATION: &str = "[resourceGroup().location]";

/// Fault domain count used when the caller leaves it unset.
pub const DEFAULT_FAULT_DOMAIN_COUNT: u32 = 2;

/// Fixed rolling-upgrade percentages. Not configurable.
const ROLLING_BATCH_PERCENT: u32 = 20;

/// How instances of a scale set are placed and managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrchestrationMode {
    /// Identical, platform-managed instances with upgrade policies.
    #[default]
    Uniform,
    /// Independently addressable instances, no platform upgrade orchestration.
    Flexible,
}

impl OrchestrationMode {
    /// Inclusive upper bound on `platformFaultDomainCount`.
    pub fn max_fault_domains(&self) -> u32 {
        match self {
            OrchestrationMode::Uniform => 3,
            OrchestrationMode::Flexible => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpgradeMode {
    #[default]
    Manual,
    Automatic,
    Rolling,
}

/// Rolling-upgrade sub-policy attached to Uniform scale sets in Rolling mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingUpgradePolicy {
    pub max_batch_instance_percent: u32,
    pub max_unhealthy_instance_percent: u32,
    pub max_unhealthy_upgraded_instance_percent: u32,
    /// ISO-8601 pause between batches.
    pub pause_time_between_batches: String,
}

impl Default for RollingUpgradePolicy {
    fn default() -> Self {
        Self {
            max_batch_instance_percent: ROLLING_BATCH_PERCENT,
            max_unhealthy_instance_percent: ROLLING_BATCH_PERCENT,
            max_unhealthy_upgraded_instance_percent: ROLLING_BATCH_PERCENT,
            pause_time_between_batches: IsoDuration::ZERO.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradePolicy {
    pub mode: UpgradeMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolling_upgrade_policy: Option<RollingUpgradePolicy>,
}

/// Caller-supplied scale set definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmssConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub vm_size: String,
    pub location: Option<String>,
    pub capacity: CapacityConfig,
    #[serde(default)]
    pub orchestration_mode: OrchestrationMode,
    #[serde(default)]
    pub upgrade_mode: UpgradeMode,
    pub overprovision: Option<bool>,
    pub single_placement_group: Option<bool>,
    pub platform_fault_domain_count: Option<u32>,
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl VmssConfig {
    pub fn new(name: impl Into<String>, vm_size: impl Into<String>, capacity: CapacityConfig) -> Self {
        Self {
            name: name.into(),
            vm_size: vm_size.into(),
            location: None,
            capacity,
            orchestration_mode: OrchestrationMode::default(),
            upgrade_mode: UpgradeMode::default(),
            overprovision: None,
            single_placement_group: None,
            platform_fault_domain_count: None,
            zones: Vec::new(),
            tags: BTreeMap::new(),
        }
    }
}

/// A validated scale set topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmssTopology {
    pub name: String,
    pub vm_size: String,
    pub location: String,
    pub capacity: CapacityProfile,
    pub orchestration_mode: OrchestrationMode,
    pub upgrade_mode: UpgradeMode,
    /// Present for Uniform scale sets only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade_policy: Option<UpgradePolicy>,
    pub overprovision: bool,
    pub single_placement_group: bool,
    pub platform_fault_domain_count: u32,
    pub zones: Vec<String>,
    pub tags: BTreeMap<String, String>,
}

impl VmssTopology {
    /// Validate a scale set definition.
    ///
    /// Checks, in order: name, vmSize, capacity, then the mode-specific
    /// fault domain bound.
    pub fn build(config: &VmssConfig) -> BuildResult<Self> {
        require(&config.name, "VMSS name is required")?;
        require(&config.vm_size, "VMSS vmSize is required")?;
        let capacity = CapacityProfile::build(&config.capacity)?;

        let mode = config.orchestration_mode;
        let fault_domains = config
            .platform_fault_domain_count
            .unwrap_or(DEFAULT_FAULT_DOMAIN_COUNT);
        if !(1..=mode.max_fault_domains()).contains(&fault_domains) {
            return Err(BuildError::range(format!(
                "platformFaultDomainCount for {mode:?} orchestration must be between 1 and {}, got {fault_domains}",
                mode.max_fault_domains()
            )));
        }

        let (upgrade_policy, default_spg, default_overprovision) = match mode {
            OrchestrationMode::Uniform => {
                let rolling = (config.upgrade_mode == UpgradeMode::Rolling)
                    .then(RollingUpgradePolicy::default);
                let policy = UpgradePolicy {
                    mode: config.upgrade_mode,
                    rolling_upgrade_policy: rolling,
                };
                (Some(policy), true, true)
            }
            OrchestrationMode::Flexible => (None, false, false),
        };

        let topology = Self {
            name: config.name.clone(),
            vm_size: config.vm_size.clone(),
            location: config
                .location
                .clone()
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| RESOURCE_GROUP_LOCATION.to_string()),
            capacity,
            orchestration_mode: mode,
            upgrade_mode: config.upgrade_mode,
            upgrade_policy,
            overprovision: config.overprovision.unwrap_or(default_overprovision),
            single_placement_group: config.single_placement_group.unwrap_or(default_spg),
            platform_fault_domain_count: fault_domains,
            zones: config.zones.clone(),
            tags: config.tags.clone(),
        };

        debug!(
            name = %topology.name,
            mode = ?topology.orchestration_mode,
            fault_domains,
            zones = topology.zones.len(),
            "scale set topology built"
        );
        Ok(topology)
    }

    /// Whether the platform orchestrates upgrades for this scale set.
    pub fn has_upgrade_policy(&self) -> bool {
        self.upgrade_policy.is_some()
    }
}
