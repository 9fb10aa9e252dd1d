//! Actix-web wiring for the bundle endpoint (SPEC_FULL.md §4.9 `serve` subcommand).

use crate::http::handler::{bundle_handler, method_not_allowed};
use actix_web::{web, App, HttpServer};
use tracing::info;

/// Starts the HTTP server on `bind_addr` (e.g. `"0.0.0.0:8080"`) and blocks until it stops.
pub async fn run(bind_addr: &str) -> std::io::Result<()> {
    info!(bind_addr, "starting bundle HTTP server");
    HttpServer::new(|| {
        App::new().service(
            web::resource("/v1/bundle")
                .route(web::post().to(bundle_handler))
                .default_service(web::route().to(method_not_allowed)),
        )
    })
    .bind(bind_addr)?
    .run()
    .await
}
