// Copyright (c) 2025 - Cowboy AI, Inc.
//! Volume Attachment Orchestrator
//!
//! Sends an iSCSI attach request and then observes the attachment until the
//! provider reports a terminal lifecycle state.
//!
//! # Poll Loop
//!
//! ```text
//! attach ─> read ─┬─ ATTACHED ─> Some(attachment)
//!             ▲   ├─ DETACHED ─> None
//!             │   └─ other ────> sleep(interval) ─┐
//!             └───────────────────────────────────┘
//! ```
//!
//! The first read happens immediately after the attach call. With the default
//! [`PollPolicy`] the loop is unbounded and the interval is fixed; a bounded
//! policy ends with [`ProvisionError::AttachmentTimeout`].

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::PollPolicy;
use crate::domain::{
    AttachVolumeRequest, AvailabilityDomain, LifecycleState, TransportTarget, VolumeAttachment,
};
use crate::errors::{ProvisionError, ProvisionResult};
use crate::ports::ComputeApi;

/// Attaches volumes and waits for lifecycle convergence
#[derive(Clone)]
pub struct VolumeAttachmentOrchestrator {
    compute: Arc<dyn ComputeApi>,
    policy: PollPolicy,
}

impl VolumeAttachmentOrchestrator {
    pub fn new(compute: Arc<dyn ComputeApi>, policy: PollPolicy) -> Self {
        Self { compute, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Attach `volume_id` to `instance_id` over iSCSI and wait for a terminal state
    ///
    /// Returns `Ok(None)` when the attachment ends DETACHED.
    pub async fn attach_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
        availability_domain: Option<&AvailabilityDomain>,
    ) -> ProvisionResult<Option<VolumeAttachment>> {
        info!(
            "Attaching OCI block volume {} to instance {} in {}",
            volume_id,
            instance_id,
            availability_domain.map_or("<unresolved>", |ad| ad.name.as_str())
        );

        let request = AttachVolumeRequest::iscsi(instance_id, volume_id);
        let created = self.compute.attach_volume(&request).await?;
        debug!(attachment = %created.id, state = %created.lifecycle_state, "Attach request accepted");

        self.await_terminal_state(&created.id).await
    }

    /// Poll `attachment_id` until ATTACHED or DETACHED
    pub async fn await_terminal_state(
        &self,
        attachment_id: &str,
    ) -> ProvisionResult<Option<VolumeAttachment>> {
        let mut delay = self.policy.interval;
        let mut attempts: u32 = 0;

        loop {
            let attachment = self.compute.get_volume_attachment(attachment_id).await?;
            attempts = attempts.saturating_add(1);

            match attachment.lifecycle_state.clone() {
                LifecycleState::Attached => {
                    info!(attachment = %attachment_id, attempts, "Volume successfully attached");
                    return Ok(Some(attachment));
                }
                LifecycleState::Detached => {
                    warn!(attachment = %attachment_id, "Volume is detached");
                    return Ok(None);
                }
                state => {
                    if let Some(max) = self.policy.max_attempts {
                        if attempts >= max {
                            warn!(
                                attachment = %attachment_id,
                                state = %state,
                                "Attachment did not converge after {} polls",
                                attempts
                            );
                            return Err(ProvisionError::AttachmentTimeout {
                                attachment_id: attachment_id.to_string(),
                                attempts,
                            });
                        }
                    }
                    debug!(
                        attachment = %attachment_id,
                        state = %state,
                        "Waiting {:?} for attachment to complete",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = self.policy.next_interval(delay);
                }
            }
        }
    }

    /// Re-read the attachment and extract its iSCSI target
    pub async fn extract_transport_info(
        &self,
        attachment_id: &str,
    ) -> ProvisionResult<TransportTarget> {
        info!("Getting iSCSI target information for attachment {}", attachment_id);

        let attachment = self.compute.get_volume_attachment(attachment_id).await?;
        let target = attachment.transport_target();

        info!(
            "iSCSI target IP: {}, Port: {}, IQN: {}",
            target.address, target.port, target.name
        );
        Ok(target)
    }
}
