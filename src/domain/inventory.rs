// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cloud Inventory Views
//!
//! Field names follow the control-plane JSON (camelCase) so the REST adapter
//! can deserialize list responses straight into these types.

use serde::{Deserialize, Serialize};

/// Compartment (resource container) in the cloud tenancy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compartment {
    pub id: String,
    pub name: String,
}

/// Availability domain within a region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityDomain {
    #[serde(default)]
    pub id: String,
    pub name: String,
}

/// Compute instance view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeInstance {
    pub id: String,
    pub shape: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub lifecycle_state: Option<String>,
}

impl ComputeInstance {
    /// Exact, case-sensitive shape comparison
    pub fn has_shape(&self, shape: &str) -> bool {
        self.shape == shape
    }
}

/// Block volume view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockVolume {
    pub id: String,
    pub display_name: String,
}
