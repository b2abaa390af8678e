// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Integration tests for the Hetzner Cloud machine controller
//!
//! These tests need a Kubernetes cluster with the CRDs from deploy/crds/
//! installed and the controller running. None of them creates a server: the
//! machines used here never get an owner `Machine`, so the controller stops at
//! the ownership check.
//!
//! Run with: cargo test --test simple_integration -- --ignored

mod common;

use capi_hetzner::crd::{HetznerCloudMachine, HetznerCloudMachineSpec};
use capi_hetzner::status_reasons::{CONDITION_TYPE_READY, REASON_WAITING_FOR_OWNER};
use common::{
    cleanup_test_namespace, create_test_namespace, get_kube_client_or_skip, wait_for_machine,
};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, DeleteParams, PostParams};
use std::time::Duration;

const TEST_NAMESPACE: &str = "capi-hetzner-integration";

fn test_machine(name: &str) -> HetznerCloudMachine {
    let mut machine = HetznerCloudMachine::new(
        name,
        HetznerCloudMachineSpec {
            r#type: "cx21".to_string(),
            ssh_key: Some("integration@example.com".to_string()),
            image: None,
            provider_id: None,
        },
    );
    machine.metadata.namespace = Some(TEST_NAMESPACE.to_string());
    machine
}

#[tokio::test]
#[ignore = "requires a Kubernetes cluster"]
async fn test_crds_are_installed() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };
    let crds: Api<CustomResourceDefinition> = Api::all(client);

    for name in [
        "hetznercloudmachines.infrastructure.cluster.x-k8s.io",
        "hetznercloudclusters.infrastructure.cluster.x-k8s.io",
    ] {
        let crd = crds.get_opt(name).await.expect("CRD lookup failed");
        assert!(crd.is_some(), "CRD {name} is not installed");
        println!("✓ CRD {name} is installed");
    }
}

#[tokio::test]
#[ignore = "requires a Kubernetes cluster"]
async fn test_machine_create_read_delete() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };
    create_test_namespace(&client, TEST_NAMESPACE)
        .await
        .expect("namespace");
    let api: Api<HetznerCloudMachine> = Api::namespaced(client.clone(), TEST_NAMESPACE);

    let created = api
        .create(&PostParams::default(), &test_machine("crud-machine"))
        .await
        .expect("create HetznerCloudMachine");
    assert_eq!(created.spec.r#type, "cx21");
    assert!(created.spec.provider_id.is_none());

    let fetched = api.get("crud-machine").await.expect("get");
    assert_eq!(fetched.spec.r#type, created.spec.r#type);
    assert_eq!(fetched.spec.ssh_key, created.spec.ssh_key);

    api.delete("crud-machine", &DeleteParams::default())
        .await
        .expect("delete");
    println!("✓ HetznerCloudMachine create/read/delete works");

    cleanup_test_namespace(&client, TEST_NAMESPACE).await;
}

#[tokio::test]
#[ignore = "requires a Kubernetes cluster and a running controller"]
async fn test_machine_without_owner_waits() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };
    create_test_namespace(&client, TEST_NAMESPACE)
        .await
        .expect("namespace");
    let api: Api<HetznerCloudMachine> = Api::namespaced(client.clone(), TEST_NAMESPACE);

    api.create(&PostParams::default(), &test_machine("orphan-machine"))
        .await
        .expect("create HetznerCloudMachine");

    let machine = wait_for_machine(&api, "orphan-machine", Duration::from_secs(60), |m| {
        m.status.as_ref().is_some_and(|s| {
            s.conditions.iter().any(|c| {
                c.r#type == CONDITION_TYPE_READY
                    && c.reason.as_deref() == Some(REASON_WAITING_FOR_OWNER)
            })
        })
    })
    .await
    .expect("controller never reported WaitingForOwner");

    let status = machine.status.expect("status");
    assert!(!status.ready);
    assert!(status.provider_id.is_none());
    assert!(machine.spec.provider_id.is_none());
    println!("✓ Machine without owner is left waiting");

    api.delete("orphan-machine", &DeleteParams::default())
        .await
        .expect("delete");
    cleanup_test_namespace(&client, TEST_NAMESPACE).await;
}
