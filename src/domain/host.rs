// Copyright (c) 2025 - Cowboy AI, Inc.
//! Managed Hypervisor Hosts

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage bus adapter taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    /// Software or dependent hardware iSCSI initiator
    InternetScsi,
    FibreChannel,
    ParallelScsi,
    Block,
    Other(String),
}

impl AdapterKind {
    /// Map a vSphere data-object type name onto the taxonomy
    pub fn from_type_name(type_name: &str) -> Self {
        match type_name {
            "HostInternetScsiHba" => AdapterKind::InternetScsi,
            "HostFibreChannelHba" | "HostFibreChannelOverEthernetHba" => {
                AdapterKind::FibreChannel
            }
            "HostParallelScsiHba" => AdapterKind::ParallelScsi,
            "HostBlockHba" => AdapterKind::Block,
            other => AdapterKind::Other(other.to_string()),
        }
    }

    pub fn is_iscsi(&self) -> bool {
        matches!(self, AdapterKind::InternetScsi)
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterKind::InternetScsi => write!(f, "iSCSI"),
            AdapterKind::FibreChannel => write!(f, "Fibre Channel"),
            AdapterKind::ParallelScsi => write!(f, "Parallel SCSI"),
            AdapterKind::Block => write!(f, "Block"),
            AdapterKind::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Host bus adapter, e.g. `vmhba64`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostBusAdapter {
    pub device: String,
    pub kind: AdapterKind,
}

impl HostBusAdapter {
    pub fn new(device: impl Into<String>, kind: AdapterKind) -> Self {
        Self {
            device: device.into(),
            kind,
        }
    }
}

/// Hypervisor host visible from the management plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedHost {
    /// Display name of the host
    pub name: String,
    /// Management-plane reference of the host
    pub reference: String,
    /// Reference of the host's storage subsystem, if the host exposes one
    pub storage_system: Option<String>,
    pub storage_adapters: Vec<HostBusAdapter>,
}

impl ManagedHost {
    /// First iSCSI-capable adapter, in the order the host reports them
    pub fn iscsi_adapter(&self) -> Option<&HostBusAdapter> {
        self.storage_adapters.iter().find(|hba| hba.kind.is_iscsi())
    }
}
