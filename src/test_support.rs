// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory fakes and fixtures shared by the reconciler unit tests.
//!
//! [`FakeAccessor`] behaves like the API server for the handful of calls the
//! reconciler makes: every write bumps `resourceVersion` and is rejected with
//! a conflict if the caller's copy is stale. [`FakeProvider`] keeps a list of
//! servers and records every call so tests can assert what was (not) sent.

use crate::accessor::ResourceAccessor;
use crate::context::{Context, ProvisioningSettings};
use crate::crd::{
    Bootstrap, Cluster, ClusterSpec, ClusterStatus, HetznerCloudCluster,
    HetznerCloudClusterSpec, HetznerCloudClusterStatus, HetznerCloudMachine,
    HetznerCloudMachineSpec, HetznerCloudMachineStatus, InfrastructureRef, Machine, MachineSpec,
};
use crate::hcloud::{CreateServerRequest, ProviderApi, PublicNet, Server, SshKey};
use crate::labels::CLUSTER_NAME_LABEL;
use crate::provider_errors::{AccessorError, HcloudError};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::ByteString;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub const NAMESPACE: &str = "default";
pub const MACHINE_NAME: &str = "worker-0";
pub const MACHINE_UID: &str = "6b1f0c1e-uid-worker-0";
pub const OWNER_NAME: &str = "machine-0";
pub const CLUSTER_NAME: &str = "demo";
pub const INFRA_CLUSTER_NAME: &str = "demo-hcloud";
pub const SECRET_NAME: &str = "machine-0-bootstrap";
pub const SSH_KEY_NAME: &str = "ops@example.com";
pub const SSH_KEY_ID: i64 = 7;
pub const DATACENTER: &str = "nbg1";
pub const FLOATING_IP_ID: i64 = 99;
pub const BOOTSTRAP_PAYLOAD: &str = "#cloud-config\nruncmd: [kubeadm join]\n";

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

// ============================================================================
// Fixtures
// ============================================================================

/// A `HetznerCloudMachine` owned by [`OWNER_NAME`], not yet provisioned.
pub fn hetzner_machine() -> HetznerCloudMachine {
    let mut machine = HetznerCloudMachine::new(
        MACHINE_NAME,
        HetznerCloudMachineSpec {
            r#type: "cx21".to_string(),
            ssh_key: Some(SSH_KEY_NAME.to_string()),
            image: None,
            provider_id: None,
        },
    );
    machine.metadata.namespace = Some(NAMESPACE.to_string());
    machine.metadata.uid = Some(MACHINE_UID.to_string());
    machine.metadata.owner_references = Some(vec![OwnerReference {
        api_version: "cluster.x-k8s.io/v1beta1".to_string(),
        kind: "Machine".to_string(),
        name: OWNER_NAME.to_string(),
        uid: "owner-uid".to_string(),
        controller: Some(true),
        ..Default::default()
    }]);
    machine
}

/// Mark a machine as being deleted.
pub fn with_deletion_timestamp(mut machine: HetznerCloudMachine) -> HetznerCloudMachine {
    machine.metadata.deletion_timestamp =
        Some(serde_json::from_value(serde_json::json!("2025-06-01T12:00:00Z")).unwrap());
    machine
}

/// A provisioned status pointing at `server_id`.
pub fn provisioned_status(server_id: i64) -> HetznerCloudMachineStatus {
    HetznerCloudMachineStatus {
        ready: true,
        provider_id: Some(format!("hcloud://{server_id}")),
        hetzner_server_id: Some(server_id.to_string()),
        conditions: vec![],
    }
}

/// The owning Cluster API `Machine`, with or without bootstrap data.
pub fn owner_machine(data_secret_name: Option<&str>) -> Machine {
    let mut machine = Machine::new(
        OWNER_NAME,
        MachineSpec {
            cluster_name: CLUSTER_NAME.to_string(),
            bootstrap: Bootstrap {
                data_secret_name: data_secret_name.map(str::to_string),
            },
        },
    );
    machine.metadata.namespace = Some(NAMESPACE.to_string());
    machine.metadata.labels = Some(BTreeMap::from([(
        CLUSTER_NAME_LABEL.to_string(),
        CLUSTER_NAME.to_string(),
    )]));
    machine
}

/// A Cluster API `Cluster` referencing [`INFRA_CLUSTER_NAME`].
pub fn cluster(infrastructure_ready: bool) -> Cluster {
    let mut cluster = Cluster::new(
        CLUSTER_NAME,
        ClusterSpec {
            infrastructure_ref: Some(InfrastructureRef {
                api_version: Some("infrastructure.cluster.x-k8s.io/v1alpha3".to_string()),
                kind: Some("HetznerCloudCluster".to_string()),
                name: INFRA_CLUSTER_NAME.to_string(),
                namespace: None,
            }),
        },
    );
    cluster.metadata.namespace = Some(NAMESPACE.to_string());
    cluster.status = Some(ClusterStatus {
        infrastructure_ready,
    });
    cluster
}

/// A `HetznerCloudCluster` in [`DATACENTER`], optionally with a floating IP.
pub fn infra_cluster(floating_ip_id: Option<i64>) -> HetznerCloudCluster {
    let mut infra = HetznerCloudCluster::new(
        INFRA_CLUSTER_NAME,
        HetznerCloudClusterSpec {
            datacenter: DATACENTER.to_string(),
        },
    );
    infra.metadata.namespace = Some(NAMESPACE.to_string());
    infra.status = Some(HetznerCloudClusterStatus {
        ready: true,
        floating_ip_id,
    });
    infra
}

/// A secret holding `data` entries verbatim.
pub fn secret(name: &str, data: &[(&str, &[u8])]) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..Default::default()
        },
        data: Some(
            data.iter()
                .map(|(k, v)| ((*k).to_string(), ByteString(v.to_vec())))
                .collect(),
        ),
        ..Default::default()
    }
}

/// A server as Hetzner would report it.
pub fn server(id: i64, name: &str, labels: &[(&str, &str)]) -> Server {
    Server {
        id,
        name: name.to_string(),
        status: "running".to_string(),
        labels: labels
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
        public_net: PublicNet::default(),
    }
}

// ============================================================================
// FakeAccessor
// ============================================================================

/// Which conditional write a recorded patch was.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchRecord {
    ProviderId(String),
    Status(HetznerCloudMachineStatus),
    Finalizers(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    ProviderId,
    Status,
    Finalizers,
}

impl PatchRecord {
    fn kind(&self) -> PatchKind {
        match self {
            Self::ProviderId(_) => PatchKind::ProviderId,
            Self::Status(_) => PatchKind::Status,
            Self::Finalizers(_) => PatchKind::Finalizers,
        }
    }
}

#[derive(Default)]
struct AccessorState {
    machines: BTreeMap<Key, HetznerCloudMachine>,
    owner_machines: BTreeMap<Key, Machine>,
    clusters: BTreeMap<Key, Cluster>,
    infra_clusters: BTreeMap<Key, HetznerCloudCluster>,
    secrets: BTreeMap<Key, Secret>,
    resource_version: u64,
    injected_conflicts: Vec<PatchKind>,
    patches: Vec<PatchRecord>,
}

impl AccessorState {
    fn next_resource_version(&mut self) -> String {
        self.resource_version += 1;
        self.resource_version.to_string()
    }
}

/// In-memory [`ResourceAccessor`] with `resourceVersion` preconditions.
#[derive(Default)]
pub struct FakeAccessor {
    state: Mutex<AccessorState>,
}

impl FakeAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a machine, assigning it a fresh `resourceVersion`.
    pub fn insert_machine(&self, mut machine: HetznerCloudMachine) -> HetznerCloudMachine {
        let mut state = self.state.lock().unwrap();
        machine.metadata.resource_version = Some(state.next_resource_version());
        state.machines.insert(
            key(&machine.namespace().unwrap_or_default(), &machine.name_any()),
            machine.clone(),
        );
        machine
    }

    pub fn insert_owner_machine(&self, machine: Machine) {
        let k = key(&machine.namespace().unwrap_or_default(), &machine.name_any());
        self.state.lock().unwrap().owner_machines.insert(k, machine);
    }

    pub fn insert_cluster(&self, cluster: Cluster) {
        let k = key(&cluster.namespace().unwrap_or_default(), &cluster.name_any());
        self.state.lock().unwrap().clusters.insert(k, cluster);
    }

    pub fn insert_infra_cluster(&self, infra: HetznerCloudCluster) {
        let k = key(&infra.namespace().unwrap_or_default(), &infra.name_any());
        self.state.lock().unwrap().infra_clusters.insert(k, infra);
    }

    pub fn insert_secret(&self, secret: Secret) {
        let k = key(&secret.namespace().unwrap_or_default(), &secret.name_any());
        self.state.lock().unwrap().secrets.insert(k, secret);
    }

    /// Current stored copy of the machine under test.
    pub fn machine(&self) -> HetznerCloudMachine {
        self.state.lock().unwrap().machines[&key(NAMESPACE, MACHINE_NAME)].clone()
    }

    /// Simulate a concurrent writer touching the machine.
    pub fn touch_machine(&self) {
        let mut state = self.state.lock().unwrap();
        let rv = state.next_resource_version();
        if let Some(m) = state.machines.get_mut(&key(NAMESPACE, MACHINE_NAME)) {
            m.metadata.resource_version = Some(rv);
        }
    }

    /// Reject the next write of `kind` with a conflict.
    pub fn inject_conflict(&self, kind: PatchKind) {
        self.state.lock().unwrap().injected_conflicts.push(kind);
    }

    /// Every successful write, in order.
    pub fn patches(&self) -> Vec<PatchRecord> {
        self.state.lock().unwrap().patches.clone()
    }

    pub fn status_patches(&self) -> Vec<HetznerCloudMachineStatus> {
        self.patches()
            .into_iter()
            .filter_map(|p| match p {
                PatchRecord::Status(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    fn apply_patch(
        &self,
        machine: &HetznerCloudMachine,
        record: PatchRecord,
    ) -> Result<HetznerCloudMachine, AccessorError> {
        let conflict = || AccessorError::Conflict {
            kind: "HetznerCloudMachine".to_string(),
            namespace: machine.namespace().unwrap_or_default(),
            name: machine.name_any(),
        };

        let mut state = self.state.lock().unwrap();
        if let Some(pos) = state
            .injected_conflicts
            .iter()
            .position(|k| *k == record.kind())
        {
            state.injected_conflicts.remove(pos);
            return Err(conflict());
        }

        let k = key(&machine.namespace().unwrap_or_default(), &machine.name_any());
        let stored_rv = state
            .machines
            .get(&k)
            .and_then(|m| m.metadata.resource_version.clone());
        if stored_rv.is_none() || stored_rv != machine.metadata.resource_version {
            return Err(conflict());
        }

        let rv = state.next_resource_version();
        let stored = state.machines.get_mut(&k).ok_or_else(conflict)?;
        match &record {
            PatchRecord::ProviderId(id) => stored.spec.provider_id = Some(id.clone()),
            PatchRecord::Status(status) => stored.status = Some(status.clone()),
            PatchRecord::Finalizers(f) => stored.metadata.finalizers = Some(f.clone()),
        }
        stored.metadata.resource_version = Some(rv);
        let updated = stored.clone();
        state.patches.push(record);
        Ok(updated)
    }
}

#[async_trait]
impl ResourceAccessor for FakeAccessor {
    async fn get_machine(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<HetznerCloudMachine>, AccessorError> {
        Ok(self.state.lock().unwrap().machines.get(&key(namespace, name)).cloned())
    }

    async fn get_owner_machine(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Machine>, AccessorError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .owner_machines
            .get(&key(namespace, name))
            .cloned())
    }

    async fn get_cluster(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Cluster>, AccessorError> {
        Ok(self.state.lock().unwrap().clusters.get(&key(namespace, name)).cloned())
    }

    async fn get_infra_cluster(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<HetznerCloudCluster>, AccessorError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .infra_clusters
            .get(&key(namespace, name))
            .cloned())
    }

    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Secret>, AccessorError> {
        Ok(self.state.lock().unwrap().secrets.get(&key(namespace, name)).cloned())
    }

    async fn patch_provider_id(
        &self,
        machine: &HetznerCloudMachine,
        provider_id: &str,
    ) -> Result<HetznerCloudMachine, AccessorError> {
        self.apply_patch(machine, PatchRecord::ProviderId(provider_id.to_string()))
    }

    async fn patch_status(
        &self,
        machine: &HetznerCloudMachine,
        status: &HetznerCloudMachineStatus,
    ) -> Result<HetznerCloudMachine, AccessorError> {
        self.apply_patch(machine, PatchRecord::Status(status.clone()))
    }

    async fn patch_finalizers(
        &self,
        machine: &HetznerCloudMachine,
        finalizers: &[String],
    ) -> Result<HetznerCloudMachine, AccessorError> {
        self.apply_patch(machine, PatchRecord::Finalizers(finalizers.to_vec()))
    }
}

// ============================================================================
// FakeProvider
// ============================================================================

/// A provider call as seen by the fake.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    GetSshKey(String),
    FindServer(String),
    CreateServer(CreateServerRequest),
    AssignFloatingIp { floating_ip_id: i64, server_id: i64 },
    DeleteServer(i64),
}

struct ProviderState {
    ssh_keys: Vec<SshKey>,
    servers: Vec<Server>,
    next_server_id: i64,
    calls: Vec<ProviderCall>,
    ssh_key_error: Option<HcloudError>,
    create_error: Option<HcloudError>,
    assign_error: Option<HcloudError>,
    delete_error: Option<HcloudError>,
}

/// In-memory [`ProviderApi`] that records every call.
pub struct FakeProvider {
    state: Mutex<ProviderState>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            state: Mutex::new(ProviderState {
                ssh_keys: vec![SshKey {
                    id: SSH_KEY_ID,
                    name: SSH_KEY_NAME.to_string(),
                    fingerprint: "b7:2f:30:a0".to_string(),
                }],
                servers: Vec::new(),
                next_server_id: 1000,
                calls: Vec::new(),
                ssh_key_error: None,
                create_error: None,
                assign_error: None,
                delete_error: None,
            }),
        }
    }
}

pub fn api_error(status: u16, code: &str) -> HcloudError {
    HcloudError::Api {
        status,
        code: code.to_string(),
        message: format!("injected {code}"),
    }
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_ssh_keys(self) -> Self {
        self.state.lock().unwrap().ssh_keys.clear();
        self
    }

    pub fn insert_server(&self, server: Server) {
        self.state.lock().unwrap().servers.push(server);
    }

    pub fn servers(&self) -> Vec<Server> {
        self.state.lock().unwrap().servers.clone()
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn create_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ProviderCall::CreateServer(_)))
            .count()
    }

    pub fn fail_ssh_key_lookup(&self, err: Option<HcloudError>) {
        self.state.lock().unwrap().ssh_key_error = err;
    }

    pub fn fail_create(&self, err: Option<HcloudError>) {
        self.state.lock().unwrap().create_error = err;
    }

    pub fn fail_assign(&self, err: Option<HcloudError>) {
        self.state.lock().unwrap().assign_error = err;
    }

    pub fn fail_delete(&self, err: Option<HcloudError>) {
        self.state.lock().unwrap().delete_error = err;
    }
}

#[async_trait]
impl ProviderApi for FakeProvider {
    async fn get_ssh_key(&self, name: &str) -> Result<Option<SshKey>, HcloudError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ProviderCall::GetSshKey(name.to_string()));
        if let Some(err) = state.ssh_key_error.clone() {
            return Err(err);
        }
        Ok(state.ssh_keys.iter().find(|k| k.name == name).cloned())
    }

    async fn find_server_by_name(&self, name: &str) -> Result<Option<Server>, HcloudError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ProviderCall::FindServer(name.to_string()));
        Ok(state.servers.iter().find(|s| s.name == name).cloned())
    }

    async fn create_server(&self, request: &CreateServerRequest) -> Result<Server, HcloudError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ProviderCall::CreateServer(request.clone()));
        if let Some(err) = state.create_error.clone() {
            return Err(err);
        }
        if state.servers.iter().any(|s| s.name == request.name) {
            return Err(api_error(409, "uniqueness_error"));
        }
        let id = state.next_server_id;
        state.next_server_id += 1;
        let created = Server {
            id,
            name: request.name.clone(),
            status: "initializing".to_string(),
            labels: request.labels.clone(),
            public_net: PublicNet::default(),
        };
        state.servers.push(created.clone());
        Ok(created)
    }

    async fn assign_floating_ip(
        &self,
        floating_ip_id: i64,
        server_id: i64,
    ) -> Result<(), HcloudError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ProviderCall::AssignFloatingIp {
            floating_ip_id,
            server_id,
        });
        if let Some(err) = state.assign_error.clone() {
            return Err(err);
        }
        let server = state
            .servers
            .iter_mut()
            .find(|s| s.id == server_id)
            .ok_or_else(|| api_error(404, "not_found"))?;
        server.public_net.floating_ips.push(floating_ip_id);
        Ok(())
    }

    async fn delete_server(&self, server_id: i64) -> Result<(), HcloudError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ProviderCall::DeleteServer(server_id));
        if let Some(err) = state.delete_error.clone() {
            return Err(err);
        }
        let before = state.servers.len();
        state.servers.retain(|s| s.id != server_id);
        if state.servers.len() == before {
            return Err(api_error(404, "not_found"));
        }
        Ok(())
    }
}

// ============================================================================
// Wiring
// ============================================================================

/// A context over the given fakes, with test-friendly settings.
pub fn context(accessor: &Arc<FakeAccessor>, provider: &Arc<FakeProvider>) -> Context {
    Context::new(
        accessor.clone(),
        provider.clone(),
        ProvisioningSettings::default(),
    )
}

/// Everything needed for the machine to be provisioned.
///
/// Returns the stored machine alongside the fakes.
pub fn ready_world(
    floating_ip_id: Option<i64>,
) -> (Arc<FakeAccessor>, Arc<FakeProvider>, HetznerCloudMachine) {
    let accessor = Arc::new(FakeAccessor::new());
    accessor.insert_owner_machine(owner_machine(Some(SECRET_NAME)));
    accessor.insert_cluster(cluster(true));
    accessor.insert_infra_cluster(infra_cluster(floating_ip_id));
    accessor.insert_secret(secret(
        SECRET_NAME,
        &[("value", BOOTSTRAP_PAYLOAD.as_bytes())],
    ));
    let machine = accessor.insert_machine(hetzner_machine());
    (accessor, Arc::new(FakeProvider::new()), machine)
}
