// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CRD YAML Generator
//!
//! Generates the infrastructure CRDs this controller owns from the Rust types
//! in src/crd.rs. The Cluster API `Machine` and `Cluster` CRDs are installed
//! by Cluster API itself and are not generated here.
//!
//! Usage:
//!   cargo run --bin crdgen
//!
//! Generated files will be written to deploy/crds/ with proper headers.

use capi_hetzner::crd::{HetznerCloudCluster, HetznerCloudMachine};
use kube::CustomResourceExt;
use serde_json::Value;
use std::fs;
use std::path::Path;

const COPYRIGHT_HEADER: &str = "# Copyright (c) 2025 Erick Bourgeois, firestoned
# SPDX-License-Identifier: MIT
#
# This file is AUTO-GENERATED from src/crd.rs
# DO NOT EDIT MANUALLY - Run `cargo run --bin crdgen` to regenerate
#
";

/// Label Cluster API uses to discover which CRD versions match its contract.
const CAPI_CONTRACT_LABEL: &str = "cluster.x-k8s.io/v1beta1";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = Path::new("deploy/crds");

    fs::create_dir_all(output_dir)?;

    println!("Generating CRD YAML files from src/crd.rs...");

    generate_crd::<HetznerCloudMachine>("hetznercloudmachines.crd.yaml", output_dir)?;
    generate_crd::<HetznerCloudCluster>("hetznercloudclusters.crd.yaml", output_dir)?;

    println!("✓ Successfully generated CRD YAML files in deploy/crds/");
    println!("\nNext steps:");
    println!("  1. Review the generated files");
    println!("  2. Deploy with: kubectl apply -f deploy/crds/");

    Ok(())
}

fn generate_crd<T>(filename: &str, output_dir: &Path) -> Result<(), Box<dyn std::error::Error>>
where
    T: CustomResourceExt,
{
    let crd = T::crd();

    let mut crd_json: Value = serde_json::to_value(&crd)?;

    // Cluster API maps its contract version to the served CRD versions via this label
    let version = crd_json["spec"]["versions"]
        .as_array()
        .and_then(|versions| versions.first())
        .and_then(|v| v["name"].as_str())
        .map(str::to_string);
    if let Some(version) = version {
        crd_json["metadata"]["labels"][CAPI_CONTRACT_LABEL] = Value::String(version);
    }

    let yaml = serde_yaml::to_string(&crd_json)?;

    let content = format!("{COPYRIGHT_HEADER}{yaml}");

    let output_path = output_dir.join(filename);
    fs::write(&output_path, content)?;

    println!("  ✓ Generated {filename}");

    Ok(())
}
