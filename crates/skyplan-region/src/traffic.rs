//! Traffic Manager — DNS-level global routing across typed endpoints.
//!
//! Endpoint order is preserved exactly as supplied; downstream routing
//! breaks priority ties by that order.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use skyplan_core::{require, BuildError, BuildResult};

/// Suffix Traffic Manager appends to a profile's relative DNS name.
pub const DNS_SUFFIX: &str = "trafficmanager.net";

pub const DEFAULT_TTL: u32 = 30;

/// Probe port when none is given, whatever the protocol.
pub const DEFAULT_MONITOR_PORT: u16 = 443;

/// Traffic Manager service limits on endpoint priority and weight.
const PRIORITY_RANGE: std::ops::RangeInclusive<u32> = 1..=1000;
const WEIGHT_RANGE: std::ops::RangeInclusive<u32> = 1..=1000;

static DNS_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointType {
    /// An Azure resource, addressed by `targetResourceId`.
    AzureEndpoint,
    /// A host outside Azure, addressed by DNS name or IP in `target`.
    ExternalEndpoint,
    /// Another Traffic Manager profile, addressed by `targetResourceId`.
    NestedEndpoints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EndpointStatus {
    #[default]
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProfileStatus {
    #[default]
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoutingMethod {
    #[default]
    Priority,
    Performance,
    Weighted,
    Geographic,
    MultiValue,
    Subnet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MonitorProtocol {
    Http,
    #[default]
    Https,
    Tcp,
}

// ── Endpoints ─────────────────────────────────────────────────────

/// Caller-supplied endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub endpoint_type: EndpointType,
    pub target_resource_id: Option<String>,
    pub target: Option<String>,
    pub endpoint_status: Option<EndpointStatus>,
    pub priority: Option<u32>,
    pub weight: Option<u32>,
    #[serde(rename = "location")]
    pub endpoint_location: Option<String>,
    pub geo_mapping: Option<Vec<String>>,
    pub min_child_endpoints: Option<u32>,
}

impl EndpointConfig {
    pub fn azure(name: impl Into<String>, target_resource_id: impl Into<String>) -> Self {
        Self {
            target_resource_id: Some(target_resource_id.into()),
            ..Self::bare(name, EndpointType::AzureEndpoint)
        }
    }

    pub fn external(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::bare(name, EndpointType::ExternalEndpoint)
        }
    }

    fn bare(name: impl Into<String>, endpoint_type: EndpointType) -> Self {
        Self {
            name: name.into(),
            endpoint_type,
            target_resource_id: None,
            target: None,
            endpoint_status: None,
            priority: None,
            weight: None,
            endpoint_location: None,
            geo_mapping: None,
            min_child_endpoints: None,
        }
    }
}

/// A validated endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficManagerEndpoint {
    pub name: String,
    #[serde(rename = "type")]
    pub endpoint_type: EndpointType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub endpoint_status: EndpointStatus,
    pub priority: u32,
    pub weight: u32,
    #[serde(rename = "location", default, skip_serializing_if = "Option::is_none")]
    pub endpoint_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_mapping: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_child_endpoints: Option<u32>,
}

impl TrafficManagerEndpoint {
    /// Validate an endpoint.
    ///
    /// Checks, in order: name, the type-specific target, priority, weight.
    pub fn build(config: &EndpointConfig) -> BuildResult<Self> {
        require(&config.name, "Traffic Manager endpoint name is required")?;

        let target_resource_id = non_blank(&config.target_resource_id);
        let target = non_blank(&config.target);
        match config.endpoint_type {
            EndpointType::AzureEndpoint if target_resource_id.is_none() => {
                return Err(BuildError::missing(
                    "Azure endpoints require a targetResourceId",
                ));
            }
            EndpointType::NestedEndpoints if target_resource_id.is_none() => {
                return Err(BuildError::missing(
                    "Nested endpoints require the targetResourceId of the child profile",
                ));
            }
            EndpointType::ExternalEndpoint if target.is_none() => {
                return Err(BuildError::missing(
                    "External endpoints require a target (DNS name or IP address)",
                ));
            }
            _ => {}
        }

        let priority = config.priority.unwrap_or(1);
        if !PRIORITY_RANGE.contains(&priority) {
            return Err(BuildError::range(format!(
                "endpoint {:?} priority must be between 1 and 1000, got {priority}",
                config.name
            )));
        }
        let weight = config.weight.unwrap_or(1);
        if !WEIGHT_RANGE.contains(&weight) {
            return Err(BuildError::range(format!(
                "endpoint {:?} weight must be between 1 and 1000, got {weight}",
                config.name
            )));
        }

        if config.min_child_endpoints.is_some()
            && config.endpoint_type != EndpointType::NestedEndpoints
        {
            warn!(
                endpoint = %config.name,
                "minChildEndpoints only applies to nested endpoints"
            );
        }

        Ok(Self {
            name: config.name.clone(),
            endpoint_type: config.endpoint_type,
            target_resource_id,
            target,
            endpoint_status: config.endpoint_status.unwrap_or_default(),
            priority,
            weight,
            endpoint_location: non_blank(&config.endpoint_location),
            geo_mapping: config.geo_mapping.clone(),
            min_child_endpoints: config.min_child_endpoints,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint_status == EndpointStatus::Enabled
    }
}

// ── Monitor ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    pub protocol: Option<MonitorProtocol>,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub interval_in_seconds: Option<u32>,
    pub timeout_in_seconds: Option<u32>,
    pub tolerated_number_of_failures: Option<u32>,
}

/// Endpoint health probing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficManagerMonitor {
    pub protocol: MonitorProtocol,
    pub port: u16,
    /// Absent for TCP probes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub interval_in_seconds: u32,
    pub timeout_in_seconds: u32,
    pub tolerated_number_of_failures: u32,
}

impl TrafficManagerMonitor {
    pub fn build(config: &MonitorConfig) -> BuildResult<Self> {
        let protocol = config.protocol.unwrap_or_default();
        let port = config.port.unwrap_or(DEFAULT_MONITOR_PORT);
        if port == 0 {
            return Err(BuildError::range("monitor port must be between 1 and 65535"));
        }

        let interval = config.interval_in_seconds.unwrap_or(30);
        if interval != 10 && interval != 30 {
            return Err(BuildError::range(format!(
                "monitor intervalInSeconds must be 10 or 30, got {interval}"
            )));
        }
        let timeout = config.timeout_in_seconds.unwrap_or(10u32.min(interval - 1));
        if !(5..=10).contains(&timeout) || timeout >= interval {
            return Err(BuildError::range(format!(
                "monitor timeoutInSeconds must be between 5 and 10 and below the {interval}s interval, got {timeout}"
            )));
        }
        let tolerated = config.tolerated_number_of_failures.unwrap_or(3);
        if tolerated > 9 {
            return Err(BuildError::range(format!(
                "monitor toleratedNumberOfFailures must be between 0 and 9, got {tolerated}"
            )));
        }

        let path = match protocol {
            MonitorProtocol::Tcp => None,
            MonitorProtocol::Http | MonitorProtocol::Https => {
                let path = non_blank(&config.path).unwrap_or_else(|| "/".to_string());
                if !path.starts_with('/') {
                    return Err(BuildError::invalid_type(format!(
                        "monitor path must start with '/', got {path:?}"
                    )));
                }
                Some(path)
            }
        };

        Ok(Self {
            protocol,
            port,
            path,
            interval_in_seconds: interval,
            timeout_in_seconds: timeout,
            tolerated_number_of_failures: tolerated,
        })
    }
}

impl Default for TrafficManagerMonitor {
    fn default() -> Self {
        Self {
            protocol: MonitorProtocol::Https,
            port: DEFAULT_MONITOR_PORT,
            path: Some("/".to_string()),
            interval_in_seconds: 30,
            timeout_in_seconds: 10,
            tolerated_number_of_failures: 3,
        }
    }
}

// ── Profile ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficManagerConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dns_name: String,
    pub routing_method: Option<RoutingMethod>,
    pub ttl: Option<u32>,
    pub monitor: Option<MonitorConfig>,
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
    pub profile_status: Option<ProfileStatus>,
}

/// A validated Traffic Manager profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficManagerProfile {
    pub name: String,
    pub dns_name: String,
    pub routing_method: RoutingMethod,
    pub ttl: u32,
    pub monitor: TrafficManagerMonitor,
    pub endpoints: Vec<TrafficManagerEndpoint>,
    pub profile_status: ProfileStatus,
}

impl TrafficManagerProfile {
    /// Validate a profile.
    ///
    /// Checks, in order: name, dnsName presence and shape, monitor, each
    /// endpoint in input order, endpoint name uniqueness, then geographic
    /// mappings when routing is Geographic.
    pub fn build(config: &TrafficManagerConfig) -> BuildResult<Self> {
        require(&config.name, "Traffic Manager profile name is required")?;
        require(&config.dns_name, "Traffic Manager dnsName is required")?;
        if !DNS_LABEL.is_match(config.dns_name.trim()) {
            return Err(BuildError::invalid_type(format!(
                "dnsName must be a DNS label of letters, digits and hyphens, got {:?}",
                config.dns_name
            )));
        }

        let monitor = TrafficManagerMonitor::build(&config.monitor.clone().unwrap_or_default())?;

        let endpoints = config
            .endpoints
            .iter()
            .map(TrafficManagerEndpoint::build)
            .collect::<BuildResult<Vec<_>>>()?;

        let mut seen = HashSet::new();
        if let Some(dup) = endpoints.iter().find(|e| !seen.insert(e.name.as_str())) {
            return Err(BuildError::cardinality(format!(
                "endpoint names must be unique within a profile, {:?} appears more than once",
                dup.name
            )));
        }

        let routing_method = config.routing_method.unwrap_or_default();
        if routing_method == RoutingMethod::Geographic
            && let Some(unmapped) = endpoints
                .iter()
                .find(|e| e.geo_mapping.as_ref().is_none_or(Vec::is_empty))
        {
            return Err(BuildError::missing(format!(
                "Geographic routing requires geoMapping on every endpoint, {:?} has none",
                unmapped.name
            )));
        }

        if endpoints.is_empty() {
            warn!(profile = %config.name, "Traffic Manager profile has no endpoints");
        }

        let profile = Self {
            name: config.name.clone(),
            dns_name: config.dns_name.trim().to_string(),
            routing_method,
            ttl: config.ttl.unwrap_or(DEFAULT_TTL),
            monitor,
            endpoints,
            profile_status: config.profile_status.unwrap_or_default(),
        };

        debug!(
            profile = %profile.name,
            fqdn = %profile.fqdn(),
            routing = ?profile.routing_method,
            endpoints = profile.endpoints.len(),
            "traffic manager profile built"
        );
        Ok(profile)
    }

    /// Fully qualified DNS name clients resolve.
    pub fn fqdn(&self) -> String {
        format!("{}.{DNS_SUFFIX}", self.dns_name)
    }

    pub fn endpoint(&self, name: &str) -> Option<&TrafficManagerEndpoint> {
        self.endpoints.iter().find(|e| e.name == name)
    }

    pub fn enabled_endpoints(&self) -> impl Iterator<Item = &TrafficManagerEndpoint> {
        self.endpoints.iter().filter(|e| e.is_enabled())
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyplan_core::ErrorKind;

    const WEST_APP: &str = "/subscriptions/0000/resourceGroups/rg/providers/Microsoft.Network/publicIPAddresses/west";

    fn profile_config() -> TrafficManagerConfig {
        TrafficManagerConfig {
            name: "shop-tm".into(),
            dns_name: "shop-global".into(),
            endpoints: vec![
                EndpointConfig::azure("west", WEST_APP),
                EndpointConfig {
                    priority: Some(2),
                    ..EndpointConfig::external("onprem", "203.0.113.10")
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn profile_defaults() {
        let profile = TrafficManagerProfile::build(&profile_config()).unwrap();
        assert_eq!(profile.routing_method, RoutingMethod::Priority);
        assert_eq!(profile.ttl, 30);
        assert_eq!(profile.monitor, TrafficManagerMonitor::default());
        assert_eq!(profile.profile_status, ProfileStatus::Enabled);
        assert_eq!(profile.fqdn(), "shop-global.trafficmanager.net");

        let west = profile.endpoint("west").unwrap();
        assert_eq!(west.priority, 1);
        assert_eq!(west.weight, 1);
        assert!(west.is_enabled());
    }

    #[test]
    fn endpoint_order_preserved() {
        let mut cfg = profile_config();
        cfg.endpoints.insert(0, EndpointConfig::external("zeta", "zeta.example.com"));
        let profile = TrafficManagerProfile::build(&cfg).unwrap();
        let names: Vec<_> = profile.endpoints.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["zeta", "west", "onprem"]);
    }

    #[test]
    fn azure_endpoint_requires_resource_id() {
        let mut cfg = EndpointConfig::azure("west", "");
        let err = TrafficManagerEndpoint::build(&cfg).unwrap_err();
        assert_eq!(
            err,
            BuildError::MissingField("Azure endpoints require a targetResourceId".into())
        );

        cfg.target_resource_id = None;
        cfg.target = Some("west.example.com".into());
        assert!(TrafficManagerEndpoint::build(&cfg).is_err());
    }

    #[test]
    fn external_and_nested_targets() {
        let mut cfg = EndpointConfig::external("edge", "edge.example.com");
        assert!(TrafficManagerEndpoint::build(&cfg).is_ok());
        cfg.target = None;
        assert_eq!(
            TrafficManagerEndpoint::build(&cfg).unwrap_err().kind(),
            ErrorKind::MissingField
        );

        let mut nested = EndpointConfig::bare("child", EndpointType::NestedEndpoints);
        assert_eq!(
            TrafficManagerEndpoint::build(&nested).unwrap_err().kind(),
            ErrorKind::MissingField
        );
        nested.target_resource_id = Some("/subscriptions/0000/trafficManagerProfiles/eu".into());
        nested.min_child_endpoints = Some(2);
        let built = TrafficManagerEndpoint::build(&nested).unwrap();
        assert_eq!(built.min_child_endpoints, Some(2));
    }

    #[test]
    fn endpoint_name_required_first() {
        let cfg = EndpointConfig::azure("", "");
        let err = TrafficManagerEndpoint::build(&cfg).unwrap_err();
        assert!(err.message().contains("name"));
    }

    #[test]
    fn priority_and_weight_bounds() {
        let mut cfg = EndpointConfig::azure("west", WEST_APP);
        cfg.priority = Some(0);
        assert_eq!(
            TrafficManagerEndpoint::build(&cfg).unwrap_err().kind(),
            ErrorKind::InvalidRange
        );
        cfg.priority = Some(1000);
        cfg.weight = Some(1001);
        assert_eq!(
            TrafficManagerEndpoint::build(&cfg).unwrap_err().kind(),
            ErrorKind::InvalidRange
        );
    }

    #[test]
    fn profile_requires_name_and_dns() {
        let mut cfg = profile_config();
        cfg.name.clear();
        assert_eq!(
            TrafficManagerProfile::build(&cfg).unwrap_err().kind(),
            ErrorKind::MissingField
        );

        let mut cfg = profile_config();
        cfg.dns_name.clear();
        let err = TrafficManagerProfile::build(&cfg).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingField);
        assert!(err.message().contains("dnsName"));
    }

    #[test]
    fn dns_name_must_be_label() {
        let mut cfg = profile_config();
        cfg.dns_name = "shop.global".into();
        assert_eq!(
            TrafficManagerProfile::build(&cfg).unwrap_err().kind(),
            ErrorKind::InvalidType
        );
        cfg.dns_name = "-shop".into();
        assert!(TrafficManagerProfile::build(&cfg).is_err());
    }

    #[test]
    fn duplicate_endpoint_names() {
        let mut cfg = profile_config();
        cfg.endpoints.push(EndpointConfig::external("west", "w.example.com"));
        assert_eq!(
            TrafficManagerProfile::build(&cfg).unwrap_err().kind(),
            ErrorKind::CardinalityViolation
        );
    }

    #[test]
    fn geographic_requires_mapping() {
        let mut cfg = profile_config();
        cfg.routing_method = Some(RoutingMethod::Geographic);
        assert_eq!(
            TrafficManagerProfile::build(&cfg).unwrap_err().kind(),
            ErrorKind::MissingField
        );

        cfg.endpoints[0].geo_mapping = Some(vec!["GEO-EU".into()]);
        cfg.endpoints[1].geo_mapping = Some(vec!["WORLD".into()]);
        assert!(TrafficManagerProfile::build(&cfg).is_ok());
    }

    #[test]
    fn monitor_protocols() {
        let http = TrafficManagerMonitor::build(&MonitorConfig {
            protocol: Some(MonitorProtocol::Http),
            path: Some("/healthz".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(http.port, 443);
        assert_eq!(http.path.as_deref(), Some("/healthz"));

        let tcp_default = TrafficManagerMonitor::build(&MonitorConfig {
            protocol: Some(MonitorProtocol::Tcp),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(tcp_default.port, DEFAULT_MONITOR_PORT);

        let tcp = TrafficManagerMonitor::build(&MonitorConfig {
            protocol: Some(MonitorProtocol::Tcp),
            port: Some(5432),
            path: Some("/ignored".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(tcp.path, None);
        assert_eq!(tcp.port, 5432);
    }

    #[test]
    fn monitor_bounds() {
        let fast = TrafficManagerMonitor::build(&MonitorConfig {
            interval_in_seconds: Some(10),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(fast.timeout_in_seconds, 9);

        for bad in [
            MonitorConfig {
                interval_in_seconds: Some(15),
                ..Default::default()
            },
            MonitorConfig {
                timeout_in_seconds: Some(4),
                ..Default::default()
            },
            MonitorConfig {
                interval_in_seconds: Some(10),
                timeout_in_seconds: Some(10),
                ..Default::default()
            },
            MonitorConfig {
                tolerated_number_of_failures: Some(10),
                ..Default::default()
            },
            MonitorConfig {
                port: Some(0),
                ..Default::default()
            },
        ] {
            assert_eq!(
                TrafficManagerMonitor::build(&bad).unwrap_err().kind(),
                ErrorKind::InvalidRange,
                "{bad:?}"
            );
        }

        let err = TrafficManagerMonitor::build(&MonitorConfig {
            path: Some("healthz".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);
    }

    #[test]
    fn serializes_endpoint_type_and_protocol() {
        let profile = TrafficManagerProfile::build(&profile_config()).unwrap();
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["endpoints"][0]["type"], "AzureEndpoint");
        assert_eq!(json["endpoints"][1]["type"], "ExternalEndpoint");
        assert_eq!(json["monitor"]["protocol"], "HTTPS");
        assert_eq!(json["dnsName"], "shop-global");
    }

    #[test]
    fn rebuild_from_output_is_identical() {
        let first = TrafficManagerProfile::build(&profile_config()).unwrap();
        let json = serde_json::to_value(&first).unwrap();
        let cfg: TrafficManagerConfig = serde_json::from_value(json).unwrap();
        assert_eq!(TrafficManagerProfile::build(&cfg).unwrap(), first);
    }
}
