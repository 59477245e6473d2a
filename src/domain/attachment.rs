// Copyright (c) 2025 - Cowboy AI, Inc.
//! Volume Attachment Lifecycle
//!
//! The provider owns every transition. The orchestrator only reads the state:
//!
//! ```text
//! ATTACHING ──> ATTACHED      (terminal, proceed)
//!     │
//!     └──────> DETACHED       (terminal, instance skipped)
//! ```
//!
//! Any other reported value, including states this crate does not know,
//! keeps the poll loop running.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol requested for every attachment
pub const ISCSI_ATTACHMENT_TYPE: &str = "iscsi";

/// Display name given to attachments created by this crate
pub const ISCSI_ATTACHMENT_DISPLAY_NAME: &str = "iSCSI-Attachment";

/// Provider-reported lifecycle state of a volume attachment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LifecycleState {
    Attaching,
    Attached,
    Detaching,
    Detached,
    /// Any value the provider adds later
    Unknown(String),
}

impl LifecycleState {
    /// ATTACHED and DETACHED end the poll loop
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Attached | LifecycleState::Detached)
    }

    pub fn as_str(&self) -> &str {
        match self {
            LifecycleState::Attaching => "ATTACHING",
            LifecycleState::Attached => "ATTACHED",
            LifecycleState::Detaching => "DETACHING",
            LifecycleState::Detached => "DETACHED",
            LifecycleState::Unknown(other) => other,
        }
    }
}

impl From<String> for LifecycleState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ATTACHING" => LifecycleState::Attaching,
            "ATTACHED" => LifecycleState::Attached,
            "DETACHING" => LifecycleState::Detaching,
            "DETACHED" => LifecycleState::Detached,
            _ => LifecycleState::Unknown(value),
        }
    }
}

impl From<LifecycleState> for String {
    fn from(state: LifecycleState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Volume attachment record as returned by the compute API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeAttachment {
    pub id: String,
    #[serde(default)]
    pub instance_id: String,
    #[serde(default)]
    pub volume_id: String,
    pub lifecycle_state: LifecycleState,
    /// Target IQN (iSCSI attachments only)
    #[serde(default)]
    pub iqn: Option<String>,
    /// Target portal address
    #[serde(default)]
    pub ipv4: Option<String>,
    /// Target portal port
    #[serde(default)]
    pub port: Option<u16>,
}

impl VolumeAttachment {
    /// Transport identity of the attachment. Missing fields are left empty.
    pub fn transport_target(&self) -> TransportTarget {
        TransportTarget {
            name: self.iqn.clone().unwrap_or_default(),
            address: self.ipv4.clone().unwrap_or_default(),
            port: self.port.unwrap_or_default(),
        }
    }
}

/// Network address/port/name triple of a block-storage endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportTarget {
    /// iSCSI qualified name
    pub name: String,
    pub address: String,
    pub port: u16,
}

impl TransportTarget {
    /// `address:port` form used for send-target discovery
    pub fn portal(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl fmt::Display for TransportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.portal(), self.name)
    }
}

/// Attach-by-protocol request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachVolumeRequest {
    #[serde(rename = "type")]
    pub attachment_type: String,
    pub instance_id: String,
    pub volume_id: String,
    pub display_name: String,
}

impl AttachVolumeRequest {
    /// iSCSI attachment of `volume_id` to `instance_id`
    pub fn iscsi(instance_id: impl Into<String>, volume_id: impl Into<String>) -> Self {
        Self {
            attachment_type: ISCSI_ATTACHMENT_TYPE.to_string(),
            instance_id: instance_id.into(),
            volume_id: volume_id.into(),
            display_name: ISCSI_ATTACHMENT_DISPLAY_NAME.to_string(),
        }
    }
}
