//! The `POST /v1/bundle` handler (§4.4): parses query overrides and a JSON recipe body, invokes
//! the orchestrator against a fresh temp directory, and streams the result as a ZIP archive.

use crate::component::ComponentConfig;
use crate::error::Error;
use crate::http::{error_response, query, zip_stream};
use crate::orchestrator::{BundleOrchestrator, OrchestratorConfig};
use crate::recipe::Recipe;
use actix_web::{web, HttpRequest, HttpResponse};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Request-scoped deadline bounding the whole bundle operation (§4.4).
const REQUEST_DEADLINE: Duration = Duration::from_secs(60);

pub async fn bundle_handler(req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let params = match query::parse_query(req.query_string()) {
        Ok(p) => p,
        Err(err) => return error_response::error_response(&err),
    };

    let recipe: Recipe = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return error_response::error_response(&Error::invalid_request(format!(
                "malformed JSON body: {e}"
            )))
        }
    };
    if let Err(err) = recipe.validate() {
        return error_response::error_response(&err);
    }

    let component_config = match ComponentConfig::builder()
        .value_overrides(params.overrides)
        .scheduling_policy(params.scheduling)
        .deployer(params.deployer)
        .repo_url(params.repo_url)
        .build()
    {
        Ok(c) => c,
        Err(err) => return error_response::error_response(&err),
    };

    let registry = Arc::new(crate::component::global().new_from_global(&component_config));
    let orchestrator_config = OrchestratorConfig {
        selected_types: Vec::new(),
        fail_fast: false,
        component_config,
        registry,
    };

    let temp_dir = match tempfile::tempdir() {
        Ok(d) => d,
        Err(e) => {
            return error_response::error_response(&Error::internal(format!(
                "creating temp directory: {e}"
            )))
        }
    };
    let output_dir = temp_dir.path().to_path_buf();
    let cancellation = CancellationToken::new();

    let start = Instant::now();
    let orchestrator = BundleOrchestrator::new(orchestrator_config);
    let run = {
        let cancellation = cancellation.clone();
        let output_dir = output_dir.clone();
        tokio::spawn(async move { orchestrator.make(cancellation, &recipe, &output_dir).await })
    };

    let outcome = tokio::select! {
        result = run => result,
        _ = tokio::time::sleep(REQUEST_DEADLINE) => {
            cancellation.cancel();
            warn!("bundle request exceeded the 60s deadline");
            return error_response::error_response(&Error::timeout(
                "bundle operation exceeded the 60 second request deadline",
            ));
        }
    };

    let (output, fail_fast_error) = match outcome {
        Ok(Ok(pair)) => pair,
        Ok(Err(err)) => return error_response::error_response(&err),
        Err(join_err) => {
            return error_response::error_response(&Error::internal(format!(
                "orchestrator task panicked: {join_err}"
            )))
        }
    };

    if let Some(err) = fail_fast_error {
        error!(error = %err, "bundle orchestrator reported a fail-fast error");
        return error_response::error_response(&err);
    }
    if !output.errors.is_empty() {
        warn!(count = output.errors.len(), "bundle producers reported errors");
        return error_response::aggregated_error_response(&output.errors);
    }

    let archive = match zip_stream::build_archive(&output_dir) {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(error = %err, "failed to build response archive");
            return error_response::error_response(&err);
        }
    };

    info!(
        files = output.total_files,
        bytes = output.total_bytes,
        duration_ms = start.elapsed().as_millis(),
        "bundle request completed"
    );

    HttpResponse::Ok()
        .content_type("application/zip")
        .insert_header(("Content-Disposition", "attachment; filename=\"bundles.zip\""))
        .insert_header(("X-Bundle-Files", output.total_files.to_string()))
        .insert_header(("X-Bundle-Size", output.total_bytes.to_string()))
        .insert_header(("X-Bundle-Duration", format!("{}ms", output.total_duration.as_millis())))
        .body(archive)
}

pub async fn method_not_allowed() -> HttpResponse {
    error_response::error_response(&Error::method_not_allowed("only POST is supported on /v1/bundle"))
}
