// Copyright (c) 2025 - Cowboy AI, Inc.
//! Inventory Query
//!
//! Lists instances and volumes in a compartment and filters them by exact
//! attribute match. Provider errors propagate to the workflow.

use std::sync::Arc;
use tracing::info;

use crate::domain::{BlockVolume, ComputeInstance};
use crate::errors::ProviderResult;
use crate::ports::{BlockStorageApi, ComputeApi};

/// Instance and volume lookups
#[derive(Clone)]
pub struct InventoryQuery {
    compute: Arc<dyn ComputeApi>,
    block_storage: Arc<dyn BlockStorageApi>,
}

impl InventoryQuery {
    pub fn new(compute: Arc<dyn ComputeApi>, block_storage: Arc<dyn BlockStorageApi>) -> Self {
        Self {
            compute,
            block_storage,
        }
    }

    /// Instances whose shape equals `shape`. An empty result means nothing to do.
    pub async fn list_instances_by_shape(
        &self,
        compartment_id: &str,
        shape: &str,
    ) -> ProviderResult<Vec<ComputeInstance>> {
        info!("Retrieving instances with shape {}", shape);

        let matching: Vec<_> = self
            .compute
            .list_instances(compartment_id)
            .await?
            .into_iter()
            .filter(|instance| instance.has_shape(shape))
            .collect();

        if matching.is_empty() {
            info!("No instances found with shape {}", shape);
        } else {
            info!("Found {} instances with shape {}", matching.len(), shape);
        }
        Ok(matching)
    }

    /// First volume whose display name equals `name`
    pub async fn find_volume_by_name(
        &self,
        compartment_id: &str,
        name: &str,
    ) -> ProviderResult<Option<BlockVolume>> {
        info!("Retrieving block volume with name {}", name);

        let volume = self
            .block_storage
            .list_volumes(compartment_id)
            .await?
            .into_iter()
            .find(|volume| volume.display_name == name);

        match &volume {
            Some(v) => info!("Found block volume: {} with OCID: {}", v.display_name, v.id),
            None => info!("No block volume found with name {}", name),
        }
        Ok(volume)
    }
}
