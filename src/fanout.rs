// Copyright (c) 2025 - Cowboy AI, Inc.
//! Host Fan-out Coordinator
//!
//! Registers one iSCSI target on every host of the management plane.
//!
//! # Cycle
//!
//! ```text
//! connect ──> enumerate hosts ──> for each host: ─┬─ no iSCSI adapter ─> Skipped
//!    │                                            ├─ add send target ──X RegistrationFailed
//!    │                                            └─ rescan adapter ───X RescanFailed
//!    │                                                      │
//!    │                                                      └─> Registered
//!    └────────────── release session (always) <────────────────┘
//! ```
//!
//! Only a failed connect escapes the cycle. Each host's outcome is recorded
//! on its own and never stops the hosts after it.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::{CredentialPair, ManagedHost, TransportTarget};
use crate::errors::{ProviderResult, ProvisionError, ProvisionResult};
use crate::ports::{ManagementSession, VirtualizationApi};

/// What happened on one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HostOutcome {
    /// Target added and adapter rescanned
    Registered { adapter: String },
    /// Host has no iSCSI adapter
    Skipped,
    /// Adding the send target failed; no rescan was attempted
    RegistrationFailed { adapter: String, reason: String },
    /// Target added but the rescan failed
    RescanFailed { adapter: String, reason: String },
}

impl HostOutcome {
    pub fn is_registered(&self) -> bool {
        matches!(self, HostOutcome::Registered { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            HostOutcome::RegistrationFailed { .. } | HostOutcome::RescanFailed { .. }
        )
    }
}

/// Outcome for a named host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostReport {
    pub host: String,
    #[serde(flatten)]
    pub outcome: HostOutcome,
}

/// Result of one fan-out cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanoutReport {
    pub endpoint: String,
    pub target: TransportTarget,
    pub hosts: Vec<HostReport>,
    /// Set when host enumeration failed; `hosts` is then empty
    pub enumeration_error: Option<String>,
    pub session_released: bool,
}

impl FanoutReport {
    pub fn registered(&self) -> usize {
        self.hosts.iter().filter(|h| h.outcome.is_registered()).count()
    }

    pub fn skipped(&self) -> usize {
        self.hosts
            .iter()
            .filter(|h| h.outcome == HostOutcome::Skipped)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.hosts.iter().filter(|h| h.outcome.is_failure()).count()
    }
}

/// Fans a target registration out across all managed hosts
#[derive(Clone)]
pub struct HostFanoutCoordinator {
    virtualization: Arc<dyn VirtualizationApi>,
}

impl HostFanoutCoordinator {
    pub fn new(virtualization: Arc<dyn VirtualizationApi>) -> Self {
        Self { virtualization }
    }

    /// Open a management-plane session
    pub async fn connect(
        &self,
        endpoint: &str,
        credentials: &CredentialPair,
    ) -> ProvisionResult<Box<dyn ManagementSession>> {
        info!(user = %credentials.username(), "Connecting to management endpoint {}", endpoint);

        self.virtualization
            .connect(endpoint, credentials)
            .await
            .map_err(|source| ProvisionError::ManagementConnect {
                endpoint: endpoint.to_string(),
                source,
            })
    }

    /// Every managed host visible from the inventory root
    pub async fn enumerate_hosts(
        session: &dyn ManagementSession,
    ) -> ProviderResult<Vec<ManagedHost>> {
        let hosts = session.list_hosts().await?;
        info!("Found {} ESXi hosts in the environment", hosts.len());
        Ok(hosts)
    }

    /// Register `target` on the first iSCSI adapter of `host`
    ///
    /// Never fails: every error becomes a [`HostOutcome`].
    pub async fn register_target_on_host(
        session: &dyn ManagementSession,
        host: &ManagedHost,
        target: &TransportTarget,
    ) -> HostOutcome {
        info!("Attaching iSCSI target to ESXi host: {}", host.name);

        let Some(adapter) = host.iscsi_adapter() else {
            warn!("No iSCSI adapter found on host {}. Skipping", host.name);
            return HostOutcome::Skipped;
        };
        info!(host = %host.name, "Found iSCSI adapter: {}", adapter.device);

        if let Err(e) = session.add_send_target(host, &adapter.device, target).await {
            error!("Failed to attach iSCSI target to {}: {}", host.name, e);
            return HostOutcome::RegistrationFailed {
                adapter: adapter.device.clone(),
                reason: e.to_string(),
            };
        }
        info!(
            "Successfully attached iSCSI target {} to {}",
            target.portal(),
            host.name
        );

        info!("Rescanning iSCSI adapter {} on host {}", adapter.device, host.name);
        match session.rescan_adapter(host, &adapter.device).await {
            Ok(()) => {
                info!(host = %host.name, "iSCSI adapter rescan completed successfully");
                HostOutcome::Registered {
                    adapter: adapter.device.clone(),
                }
            }
            Err(e) => {
                error!("Failed to rescan iSCSI adapter {}: {}", adapter.device, e);
                HostOutcome::RescanFailed {
                    adapter: adapter.device.clone(),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Close the session; returns whether logout succeeded
    pub async fn release_session(session: Box<dyn ManagementSession>) -> bool {
        match session.logout().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to release management session: {}", e);
                false
            }
        }
    }

    /// Connect, register `target` on every host, release
    ///
    /// # Errors
    /// Only [`ProvisionError::ManagementConnect`]. Enumeration and per-host
    /// failures are recorded in the report.
    pub async fn attach_target_to_all_hosts(
        &self,
        endpoint: &str,
        credentials: &CredentialPair,
        target: &TransportTarget,
    ) -> ProvisionResult<FanoutReport> {
        let session = self.connect(endpoint, credentials).await?;

        let mut report = FanoutReport {
            endpoint: endpoint.to_string(),
            target: target.clone(),
            hosts: Vec::new(),
            enumeration_error: None,
            session_released: false,
        };

        match Self::enumerate_hosts(session.as_ref()).await {
            Ok(hosts) => {
                for host in &hosts {
                    let outcome =
                        Self::register_target_on_host(session.as_ref(), host, target).await;
                    report.hosts.push(HostReport {
                        host: host.name.clone(),
                        outcome,
                    });
                }
            }
            Err(e) => {
                error!("An error occurred: {}", e);
                report.enumeration_error = Some(e.to_string());
            }
        }

        report.session_released = Self::release_session(session).await;

        info!(
            registered = report.registered(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Fan-out of {} complete",
            target.portal()
        );
        Ok(report)
    }
}
