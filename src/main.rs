// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{http::StatusCode, routing::get, Router};
use capi_hetzner::{
    accessor::KubeResourceAccessor,
    config::{Cli, ControllerConfig},
    constants::{KIND_HETZNER_CLOUD_MACHINE, METRICS_SERVER_PATH, TOKIO_WORKER_THREADS},
    context::Context,
    crd::HetznerCloudMachine,
    hcloud::HcloudClient,
    metrics,
    provider_errors::MachineError,
    reconcilers::{hetznercloudmachine::log_failure, reconcile_hetznercloudmachine, ReconcileOutcome},
};
use clap::Parser;
use futures::StreamExt;
use kube::{
    runtime::{controller::Action, watcher::Config, Controller},
    Api, Client, ResourceExt,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] MachineError);

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("capi-hetzner-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Initialize logging with custom format
    // Format: timestamp file:line LEVEL message
    //
    // Respects RUST_LOG environment variable if set, otherwise defaults to INFO level
    // Example: RUST_LOG=debug cargo run
    //
    // Respects RUST_LOG_FORMAT environment variable for output format
    // Example: RUST_LOG_FORMAT=json cargo run
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting Hetzner Cloud machine controller");
    debug!("Logging initialized with file and line number tracking");

    // A missing token is fatal before anything is reconciled
    let config = ControllerConfig::from_args(Cli::parse(), |key| std::env::var(key).ok())?;
    debug!(config = ?config, "Configuration loaded");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let provider = HcloudClient::new(&config.hcloud_endpoint, config.hcloud_token.clone())?;
    let ctx = Arc::new(Context::new(
        Arc::new(KubeResourceAccessor::new(client.clone())),
        Arc::new(provider),
        config.settings.clone(),
    ));

    info!("Starting controller and metrics server");

    tokio::select! {
        result = run_hetznercloudmachine_controller(client, config.namespace.as_deref(), ctx) => {
            match &result {
                Ok(()) => info!("HetznerCloudMachine controller stopped"),
                Err(e) => error!("CRITICAL: HetznerCloudMachine controller exited: {:?}", e),
            }
            result
        }
        result = run_metrics_server(config.metrics_bind_address) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
    }
}

/// Run the `HetznerCloudMachine` controller until a shutdown signal arrives
async fn run_hetznercloudmachine_controller(
    client: Client,
    namespace: Option<&str>,
    ctx: Arc<Context>,
) -> Result<()> {
    let api = match namespace {
        Some(ns) => {
            info!("Starting HetznerCloudMachine controller in namespace {}", ns);
            Api::<HetznerCloudMachine>::namespaced(client, ns)
        }
        None => {
            info!("Starting HetznerCloudMachine controller with cluster-wide watch");
            Api::<HetznerCloudMachine>::all(client)
        }
    };

    Controller::new(api, Config::default())
        .shutdown_on_signal()
        .run(reconcile_hetznercloudmachine_wrapper, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!("Reconciled {}", object),
                Err(e) => debug!("Reconciliation not completed: {}", e),
            }
        })
        .await;

    Ok(())
}

/// Reconcile wrapper for `HetznerCloudMachine`
async fn reconcile_hetznercloudmachine_wrapper(
    machine: Arc<HetznerCloudMachine>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let namespace = machine.namespace().unwrap_or_default();
    let name = machine.name_any();

    debug!(
        machine = %name,
        namespace = %namespace,
        "Reconcile wrapper called for HetznerCloudMachine"
    );

    match reconcile_hetznercloudmachine(&ctx, &namespace, &name).await {
        Ok(outcome) => {
            ctx.error_backoff.reset(&format!("{namespace}/{name}"));
            metrics::record_reconciliation_success(KIND_HETZNER_CLOUD_MACHINE, start.elapsed());

            match outcome {
                ReconcileOutcome::Done => {
                    debug!("HetznerCloudMachine {}/{} is up to date", namespace, name);
                    Ok(Action::await_change())
                }
                ReconcileOutcome::RequeueAfter(delay) => Ok(Action::requeue(delay)),
            }
        }
        Err(e) => {
            log_failure(&namespace, &name, &e);
            metrics::record_reconciliation_error(KIND_HETZNER_CLOUD_MACHINE, start.elapsed());
            metrics::record_error(KIND_HETZNER_CLOUD_MACHINE, e.category());
            Err(e.into())
        }
    }
}

/// Error policy: per-machine exponential backoff
fn error_policy(
    machine: Arc<HetznerCloudMachine>,
    _err: &ReconcileError,
    ctx: Arc<Context>,
) -> Action {
    let key = format!(
        "{}/{}",
        machine.namespace().unwrap_or_default(),
        machine.name_any()
    );
    let delay = ctx.error_backoff.next_delay(&key);
    debug!("Requeueing {} in {:?} after error", key, delay);
    Action::requeue(delay)
}

/// Serve the Prometheus registry on `/metrics`
async fn run_metrics_server(addr: SocketAddr) -> Result<()> {
    let app = Router::new().route(METRICS_SERVER_PATH, get(serve_metrics));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}{}", addr, METRICS_SERVER_PATH);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn serve_metrics() -> (StatusCode, String) {
    match metrics::gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            warn!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}
