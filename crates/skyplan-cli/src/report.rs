//! Whole-document validation.
//!
//! Builders stop at their first failed check. The report does not: it
//! builds every section of a [`PlanDocument`] independently, then runs
//! the cross-section checks whose inputs all built, and records every
//! failure it sees.

use serde::Serialize;
use tracing::{debug, info};

use skyplan_core::{BuildError, BuildResult, CapacityProfile, ErrorKind};
use skyplan_region::{FailoverPlan, MultiRegionDeploymentPlan, TrafficManagerProfile};
use skyplan_scale::{AutoScalePolicy, ScheduleProfile, VmssTopology};

use crate::document::PlanDocument;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionResult {
    pub section: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SectionError>,
}

impl SectionResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&BuildError> for SectionError {
    fn from(err: &BuildError) -> Self {
        Self { kind: err.kind(), message: err.message().to_string() }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub source: String,
    pub sections: Vec<SectionResult>,
}

impl ValidationReport {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into(), sections: Vec::new() }
    }

    /// Record one section's outcome, handing back the built value on success.
    pub fn record<T>(&mut self, section: impl Into<String>, result: BuildResult<T>) -> Option<T> {
        let section = section.into();
        match result {
            Ok(value) => {
                debug!(%section, "section valid");
                self.sections.push(SectionResult { section, error: None });
                Some(value)
            }
            Err(err) => {
                debug!(%section, kind = ?err.kind(), "section invalid");
                self.sections.push(SectionResult { section, error: Some((&err).into()) });
                None
            }
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &SectionResult> {
        self.sections.iter().filter(|s| !s.is_ok())
    }

    pub fn is_valid(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Build every section of `doc`, then cross-check the sections that
/// reference each other.
pub fn validate(doc: &PlanDocument, source: &str) -> ValidationReport {
    let mut report = ValidationReport::new(source);

    if let Some(cfg) = &doc.capacity {
        report.record("capacity", CapacityProfile::build(cfg));
    }

    let scale_sets: Vec<VmssTopology> = doc
        .scale_sets
        .iter()
        .enumerate()
        .filter_map(|(i, cfg)| report.record(format!("scaleSets[{i}]"), VmssTopology::build(cfg)))
        .collect();
    let all_scale_sets_built = scale_sets.len() == doc.scale_sets.len();

    if let Some(cfg) = &doc.autoscale {
        report.record("autoscale", AutoScalePolicy::build(cfg));
    }
    if let Some(cfg) = &doc.cpu_autoscale {
        report.record("cpuAutoscale", AutoScalePolicy::cpu(cfg));
    }
    if let Some(cfg) = &doc.business_hours {
        report.record("businessHours", ScheduleProfile::business_hours(cfg));
    }

    let traffic_manager = doc
        .traffic_manager
        .as_ref()
        .and_then(|cfg| report.record("trafficManager", TrafficManagerProfile::build(cfg)));
    let deployment = doc
        .deployment
        .as_ref()
        .and_then(|cfg| report.record("deployment", MultiRegionDeploymentPlan::build(cfg)));
    let failover = doc
        .failover
        .as_ref()
        .and_then(|cfg| report.record("failover", FailoverPlan::build(cfg)));

    if let Some(plan) = &deployment {
        if let Some(profile) = &traffic_manager {
            report.record("deployment → trafficManager", plan.verify_endpoints(profile));
        }
        if !doc.scale_sets.is_empty() && all_scale_sets_built {
            report.record("deployment → scaleSets", plan.verify_scale_sets(&scale_sets));
        }
        if let Some(runbook) = &failover {
            report.record("failover → deployment", runbook.verify_against(plan));
        }
    }

    info!(
        source = %report.source,
        sections = report.sections.len(),
        failures = report.failures().count(),
        "plan document checked"
    );
    report
}

pub fn format_report(report: &ValidationReport) -> String {
    let mut out = String::new();

    let failures = report.failures().count();
    let verdict = if report.sections.is_empty() {
        "EMPTY"
    } else if failures == 0 {
        "VALID"
    } else {
        "INVALID"
    };

    out.push_str("\n╔══════════════════════════════════════════╗\n");
    out.push_str("║  skyplan Plan Validation                 ║\n");
    out.push_str("╠══════════════════════════════════════════╣\n");
    out.push_str(&format!("║  Source:   {:<30}║\n", truncate(&report.source, 30)));
    out.push_str(&format!("║  Verdict:  {verdict:<30}║\n"));
    out.push_str("╚══════════════════════════════════════════╝\n\n");

    let total = report.sections.len();
    out.push_str(&format!("Sections ({total} checked):\n"));
    out.push_str(&format!("  ✅ {} valid\n", total - failures));
    out.push_str(&format!("  ❌ {failures} failed\n\n"));

    if failures > 0 {
        out.push_str("❌ FAILURES:\n\n");
        for (i, s) in report.failures().enumerate() {
            if let Some(err) = &s.error {
                out.push_str(&format!("  {}. {}\n", i + 1, s.section));
                out.push_str(&format!("     Kind:   {:?}\n", err.kind));
                out.push_str(&format!("     Reason: {}\n", err.message));
                out.push('\n');
            }
        }
    }

    out
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let skip = s.chars().count() - (width - 1);
    let tail: String = s.chars().skip(skip).collect();
    format!("…{tail}")
}
