// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provider Ports
//!
//! The workflow talks to three external systems only through these traits:
//!
//! ```text
//!                 ┌──────────────┐
//!   IdentityApi ──┤              │
//!    ComputeApi ──┤  cloud       │  adapters::oci::OciClient
//! BlockStorageApi ┤  control     │
//!    SecretsApi ──┤  plane       │
//!                 └──────────────┘
//!                 ┌──────────────┐
//! VirtualizationApi ─> ManagementSession   adapters::vsphere::VsphereClient
//!                 └──────────────┘
//! ```
//!
//! List operations return every item; pagination is the adapter's concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{
    AttachVolumeRequest, AvailabilityDomain, BlockVolume, Compartment, ComputeInstance,
    CredentialPair, ManagedHost, TransportTarget, VolumeAttachment,
};
use crate::errors::ProviderResult;

/// Compartment and availability-domain lookups
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// List compartments under `root_id`, optionally the whole subtree
    async fn list_compartments(
        &self,
        root_id: &str,
        in_subtree: bool,
    ) -> ProviderResult<Vec<Compartment>>;

    async fn list_availability_domains(
        &self,
        compartment_id: &str,
    ) -> ProviderResult<Vec<AvailabilityDomain>>;
}

/// Instance listing and volume attachment
#[async_trait]
pub trait ComputeApi: Send + Sync {
    async fn list_instances(&self, compartment_id: &str) -> ProviderResult<Vec<ComputeInstance>>;

    /// Create an attachment; the returned record is usually still ATTACHING
    async fn attach_volume(&self, request: &AttachVolumeRequest)
        -> ProviderResult<VolumeAttachment>;

    async fn get_volume_attachment(&self, attachment_id: &str)
        -> ProviderResult<VolumeAttachment>;
}

/// Block volume listing
#[async_trait]
pub trait BlockStorageApi: Send + Sync {
    async fn list_volumes(&self, compartment_id: &str) -> ProviderResult<Vec<BlockVolume>>;
}

/// Secret bundle as stored in the vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretBundle {
    pub secret_id: String,
    /// Base64-encoded secret content
    pub content: String,
}

/// Vault secret retrieval
#[async_trait]
pub trait SecretsApi: Send + Sync {
    async fn get_secret_bundle(&self, secret_id: &str) -> ProviderResult<SecretBundle>;
}

/// Virtualization management plane entry point
#[async_trait]
pub trait VirtualizationApi: Send + Sync {
    /// Authenticate against `endpoint` and open a session
    async fn connect(
        &self,
        endpoint: &str,
        credentials: &CredentialPair,
    ) -> ProviderResult<Box<dyn ManagementSession>>;
}

/// Authenticated management-plane session
///
/// A session lives for one fan-out cycle and must be closed with
/// [`ManagementSession::logout`].
#[async_trait]
pub trait ManagementSession: Send + Sync {
    /// Every managed host reachable from the inventory root
    async fn list_hosts(&self) -> ProviderResult<Vec<ManagedHost>>;

    /// Register `target` as a send target on adapter `device` of `host`
    async fn add_send_target(
        &self,
        host: &ManagedHost,
        device: &str,
        target: &TransportTarget,
    ) -> ProviderResult<()>;

    /// Rescan adapter `device` of `host`
    async fn rescan_adapter(&self, host: &ManagedHost, device: &str) -> ProviderResult<()>;

    async fn logout(&self) -> ProviderResult<()>;
}
