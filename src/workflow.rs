// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Workflow
//!
//! Sequences identity resolution, inventory lookup, attachment, secret
//! resolution and host fan-out for every instance of the requested shape.
//!
//! # Flow
//!
//! ```text
//! resolve compartment ──X CompartmentNotFound
//!         │
//! list instances by shape
//!         │
//! find volume ──────────X VolumeNotFound
//!         │
//! resolve availability domain (None is tolerated)
//!         │
//! for each instance, one at a time:
//!     attach + poll ─── DETACHED / timeout ─> instance skipped, next
//!     extract target
//!     resolve credentials ─X secret / format errors truncate the loop
//!     fan out to hosts ────X connect errors truncate the loop
//! ```
//!
//! Nothing here reaches the trigger caller: [`ProvisioningWorkflow::handle`]
//! always answers `{"status": "Success"}`. The [`WorkflowReport`] returned by
//! [`ProvisioningWorkflow::run`] carries the real outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::attachment::VolumeAttachmentOrchestrator;
use crate::config::{PollPolicy, WorkflowSettings};
use crate::domain::{AvailabilityDomain, BlockVolume, ComputeInstance, TransportTarget};
use crate::errors::{ProvisionError, ProvisionResult};
use crate::fanout::{FanoutReport, HostFanoutCoordinator};
use crate::identity::IdentityResolver;
use crate::inventory::InventoryQuery;
use crate::ports::{BlockStorageApi, ComputeApi, IdentityApi, SecretsApi, VirtualizationApi};
use crate::secrets::SecretResolver;

/// Trigger payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    pub shape: String,
    pub block_volume_name: String,
}

impl ProvisionRequest {
    /// Parse a JSON request body; both fields are required
    pub fn from_slice(body: &[u8]) -> ProvisionResult<Self> {
        serde_json::from_slice(body).map_err(|e| ProvisionError::InvalidTrigger(e.to_string()))
    }
}

/// Status value of every trigger response
pub const SUCCESS_STATUS: &str = "Success";

/// Trigger response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<WorkflowReport>,
}

impl ProvisionResponse {
    pub fn success() -> Self {
        Self {
            status: SUCCESS_STATUS.to_string(),
            report: None,
        }
    }

    pub fn with_report(report: WorkflowReport) -> Self {
        Self {
            report: Some(report),
            ..Self::success()
        }
    }
}

/// Result for one matched instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InstanceOutcome {
    /// Attached and fanned out to the management plane
    Provisioned {
        attachment_id: String,
        target: TransportTarget,
        fanout: FanoutReport,
    },
    /// Attachment ended DETACHED
    NotAttached,
    /// Bounded poll policy ran out
    TimedOut { attempts: u32 },
}

/// Outcome for a named instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceReport {
    pub instance_id: String,
    #[serde(flatten)]
    pub outcome: InstanceOutcome,
}

/// Why a run stopped before processing every instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TruncationReason {
    CompartmentNotFound { name: String },
    VolumeNotFound { name: String },
    /// A fatal error; `instance_id` is set when it happened inside the instance loop
    Failed {
        instance_id: Option<String>,
        error: String,
    },
}

/// Overall run outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowOutcome {
    /// Every matched instance was processed (possibly none)
    Completed,
    Truncated(TruncationReason),
}

/// Structured record of one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub invocation_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub request: ProvisionRequest,
    pub compartment_id: Option<String>,
    pub volume_id: Option<String>,
    pub availability_domain: Option<String>,
    pub instances: Vec<InstanceReport>,
    pub outcome: WorkflowOutcome,
}

impl WorkflowReport {
    fn begin(request: &ProvisionRequest) -> Self {
        Self {
            invocation_id: Uuid::now_v7(),
            started_at: Utc::now(),
            finished_at: None,
            request: request.clone(),
            compartment_id: None,
            volume_id: None,
            availability_domain: None,
            instances: Vec::new(),
            outcome: WorkflowOutcome::Completed,
        }
    }

    pub fn is_truncated(&self) -> bool {
        matches!(self.outcome, WorkflowOutcome::Truncated(_))
    }

    /// Instances that reached the fan-out stage
    pub fn provisioned(&self) -> usize {
        self.instances
            .iter()
            .filter(|i| matches!(i.outcome, InstanceOutcome::Provisioned { .. }))
            .count()
    }
}

/// Provider ports, constructed once and shared across invocations
#[derive(Clone)]
pub struct ProviderSet {
    pub identity: Arc<dyn IdentityApi>,
    pub compute: Arc<dyn ComputeApi>,
    pub block_storage: Arc<dyn BlockStorageApi>,
    pub secrets: Arc<dyn SecretsApi>,
    pub virtualization: Arc<dyn VirtualizationApi>,
}

/// Cross-system attachment and convergence workflow
pub struct ProvisioningWorkflow {
    settings: WorkflowSettings,
    include_report: bool,
    identity: IdentityResolver,
    inventory: InventoryQuery,
    secrets: SecretResolver,
    attachments: VolumeAttachmentOrchestrator,
    fanout: HostFanoutCoordinator,
}

impl ProvisioningWorkflow {
    pub fn new(settings: WorkflowSettings, poll: PollPolicy, providers: ProviderSet) -> Self {
        Self {
            settings,
            include_report: false,
            identity: IdentityResolver::new(providers.identity),
            inventory: InventoryQuery::new(providers.compute.clone(), providers.block_storage),
            secrets: SecretResolver::new(providers.secrets),
            attachments: VolumeAttachmentOrchestrator::new(providers.compute, poll),
            fanout: HostFanoutCoordinator::new(providers.virtualization),
        }
    }

    /// Embed the [`WorkflowReport`] in trigger responses
    pub fn with_report_in_response(mut self, include: bool) -> Self {
        self.include_report = include;
        self
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Trigger entry point: parse, run, always answer success
    pub async fn handle(&self, body: &[u8]) -> ProvisionResponse {
        let request = match ProvisionRequest::from_slice(body) {
            Ok(request) => request,
            Err(e) => {
                error!("{}", e);
                return ProvisionResponse::success();
            }
        };

        let report = self.run(&request).await;
        if self.include_report {
            ProvisionResponse::with_report(report)
        } else {
            ProvisionResponse::success()
        }
    }

    /// Run the workflow for one request
    pub async fn run(&self, request: &ProvisionRequest) -> WorkflowReport {
        let mut report = WorkflowReport::begin(request);
        info!(
            invocation = %report.invocation_id,
            shape = %request.shape,
            volume = %request.block_volume_name,
            "Provisioning run started"
        );

        let outcome = self.execute(request, &mut report).await;
        report.outcome = outcome;
        report.finished_at = Some(Utc::now());

        match &report.outcome {
            WorkflowOutcome::Completed => info!(
                invocation = %report.invocation_id,
                instances = report.instances.len(),
                provisioned = report.provisioned(),
                "Provisioning run completed"
            ),
            WorkflowOutcome::Truncated(reason) => warn!(
                invocation = %report.invocation_id,
                instances = report.instances.len(),
                provisioned = report.provisioned(),
                "Provisioning run truncated: {:?}",
                reason
            ),
        }
        report
    }

    async fn execute(
        &self,
        request: &ProvisionRequest,
        report: &mut WorkflowReport,
    ) -> WorkflowOutcome {
        let settings = &self.settings;

        let Some(compartment) = self
            .identity
            .resolve_compartment(&settings.compartment_name, &settings.root_compartment_id)
            .await
        else {
            warn!("Exiting: Compartment with specified name not found");
            return WorkflowOutcome::Truncated(TruncationReason::CompartmentNotFound {
                name: settings.compartment_name.clone(),
            });
        };
        report.compartment_id = Some(compartment.id.clone());

        let instances = match self
            .inventory
            .list_instances_by_shape(&compartment.id, &request.shape)
            .await
        {
            Ok(instances) => instances,
            Err(e) => return failed(None, e.into()),
        };

        let volume = match self
            .inventory
            .find_volume_by_name(&compartment.id, &request.block_volume_name)
            .await
        {
            Ok(Some(volume)) => volume,
            Ok(None) => {
                warn!("Exiting: Block volume with specified name not found");
                return WorkflowOutcome::Truncated(TruncationReason::VolumeNotFound {
                    name: request.block_volume_name.clone(),
                });
            }
            Err(e) => return failed(None, e.into()),
        };
        report.volume_id = Some(volume.id.clone());

        let availability_domain = self
            .identity
            .resolve_availability_domain(&compartment.id, &settings.availability_domain_name)
            .await;
        report.availability_domain = availability_domain.as_ref().map(|ad| ad.name.clone());

        for instance in &instances {
            match self
                .provision_instance(&volume, instance, availability_domain.as_ref())
                .await
            {
                Ok(outcome) => report.instances.push(InstanceReport {
                    instance_id: instance.id.clone(),
                    outcome,
                }),
                Err(e) => return failed(Some(instance.id.clone()), e),
            }
        }

        WorkflowOutcome::Completed
    }

    async fn provision_instance(
        &self,
        volume: &BlockVolume,
        instance: &ComputeInstance,
        availability_domain: Option<&AvailabilityDomain>,
    ) -> ProvisionResult<InstanceOutcome> {
        let attachment = match self
            .attachments
            .attach_volume(&volume.id, &instance.id, availability_domain)
            .await
        {
            Ok(Some(attachment)) => attachment,
            Ok(None) => {
                warn!(instance = %instance.id, "Attachment detached, instance not processed");
                return Ok(InstanceOutcome::NotAttached);
            }
            Err(ProvisionError::AttachmentTimeout { attempts, .. }) => {
                warn!(instance = %instance.id, "Attachment timed out, instance not processed");
                return Ok(InstanceOutcome::TimedOut { attempts });
            }
            Err(e) => return Err(e),
        };

        let target = self
            .attachments
            .extract_transport_info(&attachment.id)
            .await?;
        let credentials = self
            .secrets
            .resolve_credentials(&self.settings.combined_secret_id)
            .await?;

        let fanout = self
            .fanout
            .attach_target_to_all_hosts(&self.settings.management_endpoint, &credentials, &target)
            .await?;

        Ok(InstanceOutcome::Provisioned {
            attachment_id: attachment.id,
            target,
            fanout,
        })
    }
}

fn failed(instance_id: Option<String>, error: ProvisionError) -> WorkflowOutcome {
    error!("{}", error);
    WorkflowOutcome::Truncated(TruncationReason::Failed {
        instance_id,
        error: error.to_string(),
    })
}
