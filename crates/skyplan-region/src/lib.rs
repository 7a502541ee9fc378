//! skyplan-region — traffic routing and failover across regions.
//!
//! # Components
//!
//! - **`traffic`** — Traffic Manager profiles and typed endpoints
//! - **`deployment`** — per-region deployments aggregated into a plan
//!   with exactly one primary region
//! - **`failover`** — ordered runbook moving traffic from primary to secondary
//! - **`peering`** — peering-count arithmetic for mesh and hub-spoke networks
//!
//! Composition is strictly downward: a plan contains its region
//! deployments, and nothing points back at its parent. Cross-entity
//! checks (`verify_*`) take the other entity by reference.

pub mod deployment;
pub mod failover;
pub mod peering;
pub mod traffic;

pub use deployment::{
    MonitoringConfig, MultiRegionConfig, MultiRegionDeploymentPlan, RegionConfig,
    RegionDeployment, RegionRole, ReplicationConfig,
};
pub use failover::{
    FailoverAutomation, FailoverConfig, FailoverPlan, FailoverStep, FailoverStepConfig,
};
pub use peering::{hub_spoke_peering_count, mesh_peering_count};
pub use traffic::{
    EndpointConfig, EndpointStatus, EndpointType, MonitorConfig, MonitorProtocol, ProfileStatus,
    RoutingMethod, TrafficManagerConfig, TrafficManagerEndpoint, TrafficManagerMonitor,
    TrafficManagerProfile,
};
