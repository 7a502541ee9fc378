//! Failover plans — ordered runbooks that move traffic from the primary
//! region to a secondary one.
//!
//! Step order is execution order. Renderers must keep it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use skyplan_core::{require, BuildError, BuildResult};

use crate::deployment::MultiRegionDeploymentPlan;

pub const DEFAULT_DETECTION_THRESHOLD_MINUTES: u32 = 5;

/// Automation attached to a step: an Automation runbook, a Logic App, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailoverAutomation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runbook_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic_app_resource_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailoverStepConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub automation: Option<FailoverAutomation>,
    pub validation: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailoverStep {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation: Option<FailoverAutomation>,
    /// Checks an operator confirms once the step has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Vec<String>>,
}

impl FailoverStep {
    pub fn build(config: &FailoverStepConfig) -> BuildResult<Self> {
        require(&config.name, "failover step name is required")?;
        Ok(Self {
            name: config.name.clone(),
            description: config.description.clone(),
            automation: config.automation.clone(),
            validation: config.validation.clone(),
        })
    }

    pub fn is_automated(&self) -> bool {
        self.automation
            .as_ref()
            .is_some_and(|a| a.runbook_name.is_some() || a.logic_app_resource_id.is_some())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailoverConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub primary_region: String,
    #[serde(default)]
    pub secondary_region: String,
    pub detection_threshold_minutes: Option<u32>,
    #[serde(default)]
    pub steps: Vec<FailoverStepConfig>,
}

/// A validated failover runbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailoverPlan {
    pub name: String,
    pub primary_region: String,
    pub secondary_region: String,
    pub detection_threshold_minutes: u32,
    pub steps: Vec<FailoverStep>,
}

impl FailoverPlan {
    /// Validate a failover plan.
    ///
    /// Checks, in order: name, primaryRegion, secondaryRegion, at least one
    /// step, distinct regions, detection threshold, then each step.
    pub fn build(config: &FailoverConfig) -> BuildResult<Self> {
        require(&config.name, "failover plan name is required")?;
        require(&config.primary_region, "failover plan primaryRegion is required")?;
        require(&config.secondary_region, "failover plan secondaryRegion is required")?;

        if config.steps.is_empty() {
            return Err(BuildError::cardinality(
                "failover plan requires at least one step",
            ));
        }
        if config
            .primary_region
            .trim()
            .eq_ignore_ascii_case(config.secondary_region.trim())
        {
            return Err(BuildError::cardinality(format!(
                "failover primaryRegion and secondaryRegion must differ, both are {:?}",
                config.primary_region
            )));
        }

        let threshold = config
            .detection_threshold_minutes
            .unwrap_or(DEFAULT_DETECTION_THRESHOLD_MINUTES);
        if threshold == 0 {
            return Err(BuildError::range(
                "detectionThresholdMinutes must be at least 1",
            ));
        }

        let steps = config
            .steps
            .iter()
            .map(FailoverStep::build)
            .collect::<BuildResult<Vec<_>>>()?;

        let plan = Self {
            name: config.name.clone(),
            primary_region: config.primary_region.clone(),
            secondary_region: config.secondary_region.clone(),
            detection_threshold_minutes: threshold,
            steps,
        };

        debug!(
            plan = %plan.name,
            from = %plan.primary_region,
            to = %plan.secondary_region,
            steps = plan.steps.len(),
            automated = plan.steps.iter().filter(|s| s.is_automated()).count(),
            "failover plan built"
        );
        Ok(plan)
    }

    /// Compose the standard five-step runbook: detect, drain the primary
    /// endpoint, scale the secondary, promote replicas, validate.
    pub fn standard(
        name: impl Into<String>,
        primary_region: impl Into<String>,
        secondary_region: impl Into<String>,
    ) -> BuildResult<Self> {
        let primary_region = primary_region.into();
        let secondary_region = secondary_region.into();

        let step = |name: &str, description: String, runbook: Option<&str>, checks: &[&str]| {
            FailoverStepConfig {
                name: name.to_string(),
                description,
                automation: runbook.map(|r| FailoverAutomation {
                    runbook_name: Some(r.to_string()),
                    logic_app_resource_id: None,
                }),
                validation: (!checks.is_empty())
                    .then(|| checks.iter().map(|c| c.to_string()).collect()),
            }
        };

        let steps = vec![
            step(
                "Detect outage",
                format!(
                    "Confirm health probes against {primary_region} have failed for {DEFAULT_DETECTION_THRESHOLD_MINUTES} minutes"
                ),
                None,
                &["Probe failures reported from more than one monitoring location"],
            ),
            step(
                "Disable primary endpoint",
                format!("Disable the Traffic Manager endpoint for {primary_region}"),
                Some("Disable-PrimaryEndpoint"),
                &["Endpoint status reports Disabled"],
            ),
            step(
                "Scale out secondary",
                format!("Raise {secondary_region} capacity to its maximum"),
                Some("Scale-SecondaryRegion"),
                &[],
            ),
            step(
                "Promote replicas",
                format!("Promote data replicas in {secondary_region} to read-write"),
                Some("Promote-SecondaryReplicas"),
                &["Replication lag is zero before promotion"],
            ),
            step(
                "Validate traffic",
                format!("Verify {secondary_region} serves production traffic"),
                None,
                &[
                    "Synthetic transactions succeed",
                    "Error rate is at or below the pre-incident baseline",
                ],
            ),
        ];

        Self::build(&FailoverConfig {
            name: name.into(),
            primary_region,
            secondary_region,
            detection_threshold_minutes: None,
            steps,
        })
    }

    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.name.as_str())
    }

    /// Check that the runbook starts from the plan's primary region and
    /// fails over to a region the plan deploys.
    pub fn verify_against(&self, plan: &MultiRegionDeploymentPlan) -> BuildResult<()> {
        let primary = plan.primary().map(|r| r.region.as_str()).unwrap_or_default();
        if !primary.eq_ignore_ascii_case(self.primary_region.trim()) {
            return Err(BuildError::cardinality(format!(
                "failover primaryRegion {:?} is not the plan's primary region {primary:?}",
                self.primary_region
            )));
        }
        if plan.region(&self.secondary_region).is_none() {
            return Err(BuildError::missing(format!(
                "failover secondaryRegion {:?} is not part of plan {:?}",
                self.secondary_region, plan.application_name
            )));
        }
        Ok(())
    }
}
