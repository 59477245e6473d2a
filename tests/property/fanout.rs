// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Host Fan-out
//!
//! For any inventory, every iSCSI-capable host is registered exactly once,
//! every other host is skipped, and the session is released once.

use std::sync::Arc;

use iscsi_provisioner::domain::CredentialPair;
use iscsi_provisioner::fanout::HostFanoutCoordinator;
use iscsi_provisioner::HostOutcome;
use proptest::prelude::*;

use crate::fixtures::{host_without_iscsi, iscsi_host, target, FakeVirtualization, HostCall, VCENTER};

proptest! {
    #[test]
    fn prop_registration_partitions_hosts(capable in prop::collection::vec(any::<bool>(), 0..10)) {
        let hosts = capable
            .iter()
            .enumerate()
            .map(|(i, iscsi)| {
                let name = format!("esxi-{}", i);
                if *iscsi { iscsi_host(&name) } else { host_without_iscsi(&name) }
            })
            .collect();
        let virtualization = FakeVirtualization::new(hosts);
        let coordinator = HostFanoutCoordinator::new(Arc::new(virtualization.clone()));
        let credentials = CredentialPair::new("administrator@vsphere.local", "secret");

        let report = tokio_test::block_on(
            coordinator.attach_target_to_all_hosts(VCENTER, &credentials, &target()),
        )
        .unwrap();

        let expected_registered = capable.iter().filter(|c| **c).count();
        prop_assert_eq!(report.hosts.len(), capable.len());
        prop_assert_eq!(report.registered(), expected_registered);
        prop_assert_eq!(report.skipped(), capable.len() - expected_registered);
        for (host, iscsi) in report.hosts.iter().zip(&capable) {
            prop_assert_eq!(host.outcome.is_registered(), *iscsi);
            prop_assert_eq!(host.outcome == HostOutcome::Skipped, !*iscsi);
        }

        let send_targets = virtualization.count(|c| matches!(c, HostCall::AddSendTarget { .. }));
        let rescans = virtualization.count(|c| matches!(c, HostCall::Rescan { .. }));
        prop_assert_eq!(send_targets, expected_registered);
        prop_assert_eq!(rescans, expected_registered);
        prop_assert_eq!(virtualization.count(|c| *c == HostCall::Logout), 1);
        prop_assert!(report.session_released);
    }
}
