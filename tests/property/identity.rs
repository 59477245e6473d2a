// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Name Resolution
//!
//! Compartments and volumes are matched by exact name, and the first match
//! in listing order wins.

use std::sync::Arc;

use iscsi_provisioner::domain::{BlockVolume, Compartment};
use iscsi_provisioner::identity::IdentityResolver;
use iscsi_provisioner::inventory::InventoryQuery;
use proptest::prelude::*;

use crate::fixtures::{FakeCloud, COMPARTMENT_ID, ROOT_COMPARTMENT_ID};

fn names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-c]{1,2}", 0..12)
}

proptest! {
    /// Property: The resolved compartment is the first exact match, or none
    #[test]
    fn prop_first_exact_compartment_match(listed in names(), wanted in "[a-c]{1,2}") {
        let compartments: Vec<Compartment> = listed
            .iter()
            .enumerate()
            .map(|(i, name)| Compartment {
                id: format!("ocid1.compartment.oc1..{}", i),
                name: name.clone(),
            })
            .collect();
        let cloud = FakeCloud::new().with_compartments(compartments);
        let resolver = IdentityResolver::new(Arc::new(cloud));

        let resolved = tokio_test::block_on(resolver.resolve_compartment(&wanted, ROOT_COMPARTMENT_ID));

        let expected = listed
            .iter()
            .position(|name| *name == wanted)
            .map(|i| format!("ocid1.compartment.oc1..{}", i));
        prop_assert_eq!(resolved.map(|c| c.id), expected);
    }

    /// Property: The selected volume is the first display-name match, or none
    #[test]
    fn prop_first_volume_match(listed in names(), wanted in "[a-c]{1,2}") {
        let volumes: Vec<BlockVolume> = listed
            .iter()
            .enumerate()
            .map(|(i, name)| BlockVolume {
                id: format!("ocid1.volume.oc1..{}", i),
                display_name: name.clone(),
            })
            .collect();
        let cloud = Arc::new(FakeCloud::new().with_volumes(volumes));
        let query = InventoryQuery::new(cloud.clone(), cloud);

        let found = tokio_test::block_on(query.find_volume_by_name(COMPARTMENT_ID, &wanted)).unwrap();

        let expected = listed
            .iter()
            .position(|name| *name == wanted)
            .map(|i| format!("ocid1.volume.oc1..{}", i));
        prop_assert_eq!(found.map(|v| v.id), expected);
    }
}
