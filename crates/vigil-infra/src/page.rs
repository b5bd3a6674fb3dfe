// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A small HTTP server exposing the current snapshot at `/stats.json`.

use crate::config::PageConfig;
use axum::extract::State;
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use vigil_telemetry::MetricsService;

/// Header carrying the time spent producing the snapshot.
pub const RESPONSE_MILLIS: HeaderName = HeaderName::from_static("response-millis");

/// Builds the stats page routes for `service`.
///
/// `/stats.json` answers every method; any other path is a 404.
pub fn router(service: MetricsService) -> Router {
    Router::new()
        .route("/stats.json", any(stats_json))
        .fallback(not_found)
        .with_state(service)
}

async fn stats_json(State(service): State<MetricsService>) -> Response {
    let started = Instant::now();
    let body = match service.get_stats().await {
        Ok(snapshot) => serde_json::to_string_pretty(&snapshot),
        Err(e) => {
            log::error!("Unable to collect stats: {e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };
    match body {
        Ok(body) => (
            [
                (header::CONTENT_TYPE, "application/json".to_string()),
                (RESPONSE_MILLIS, started.elapsed().as_millis().to_string()),
            ],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain")],
        "404",
    )
}

/// A running stats page server.
#[derive(Debug)]
pub struct StatsPage {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl StatsPage {
    /// Binds the configured address and starts serving in the background.
    pub async fn bind(service: MetricsService, config: &PageConfig) -> anyhow::Result<Self> {
        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown, signal) = oneshot::channel::<()>();

        let app = router(service);
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = signal.await;
            });
            if let Err(e) = server.await {
                log::error!("Stats page server failed: {e}");
            }
        });

        log::info!("Serving stats on http://{local_addr}/stats.json");
        Ok(Self {
            local_addr,
            shutdown: Some(shutdown),
            task,
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections and waits for in-flight requests.
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
            if let Err(e) = (&mut self.task).await {
                log::warn!("Stats page task ended abnormally: {e}");
            }
            log::info!("Stats page on {} stopped", self.local_addr);
        }
    }
}

impl Drop for StatsPage {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}
