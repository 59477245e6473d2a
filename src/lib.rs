//! iSCSI block storage provisioning for virtualization hosts
//!
//! Attaches a named cloud block volume to every compute instance of a given
//! shape, waits for each attachment to converge, and registers the resulting
//! iSCSI target on every host of a vSphere management plane.
//!
//! # Components
//!
//! - [`identity`] - compartment and availability-domain resolution
//! - [`inventory`] - instance and volume lookup
//! - [`secrets`] - management-plane credentials from the vault
//! - [`attachment`] - attach request and lifecycle polling
//! - [`fanout`] - per-host target registration with failure isolation
//! - [`workflow`] - sequencing and the structured run report
//! - [`ports`] / [`adapters`] - provider seams and their REST implementations
//! - [`server`] - HTTP trigger endpoint

pub mod adapters;
pub mod attachment;
pub mod config;
pub mod domain;
pub mod errors;
pub mod fanout;
pub mod identity;
pub mod inventory;
pub mod ports;
pub mod secrets;
pub mod server;
pub mod workflow;

// Re-export commonly used types
pub use config::{PollPolicy, ProvisionerConfig, TlsPolicy, WorkflowSettings};
pub use errors::{ConfigError, ProviderError, ProviderResult, ProvisionError, ProvisionResult};
pub use fanout::{FanoutReport, HostOutcome, HostReport};
pub use workflow::{
    ProviderSet, ProvisionRequest, ProvisionResponse, ProvisioningWorkflow, WorkflowOutcome,
    WorkflowReport,
};
