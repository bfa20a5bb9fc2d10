mod args;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{routing::get, Router};
use clap::Parser;

use stratus_common::telemetry::init_tracing;
use stratus_resolver::{DigestBucketer, VersionResolver};
use stratus_store::EtcdImageStore;

use crate::args::Args;
use crate::handlers::{get_version_info, healthz, list_image_versions};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let provider = init_tracing(
        "stratus-registry",
        args.otlp_endpoint.as_deref(),
        args.otlp_token.as_deref(),
    );

    tracing::info!(
        listen_addr = %args.listen_addr,
        etcd_endpoint = %args.etcd_endpoint,
        "stratus-registry starting"
    );

    let store = Arc::new(EtcdImageStore::connect(std::slice::from_ref(&args.etcd_endpoint)).await?);
    tracing::info!("connected to etcd at {}", args.etcd_endpoint);

    let resolver = Arc::new(VersionResolver::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store,
        Arc::new(DigestBucketer),
    ));

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/v1/image-versions", get(list_image_versions))
        .route(
            "/api/v1/image-types/:image_type/versions/:version",
            get(get_version_info),
        )
        .with_state(AppState { resolver });

    let listener = tokio::net::TcpListener::bind(&args.listen_addr).await?;
    axum::serve(listener, app).await?;

    if let Some(provider) = provider {
        let _ = provider.shutdown();
    }
    Ok(())
}
