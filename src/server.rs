//! HTTP front: every request renders the full dashboard from disk.

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;

use crate::logging::{log, log_request, obj, v_str, Domain, Level};
use crate::render::DashboardRenderer;

#[derive(Clone)]
pub struct DashboardState {
    pub renderer: Arc<DashboardRenderer>,
    pub assets: Arc<Vec<String>>,
}

/// Any path and any method lands on the dashboard.
pub fn build_router(state: DashboardState) -> Router {
    Router::new().fallback(dashboard).with_state(state)
}

pub async fn serve(state: DashboardState, bind_addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    log(
        Level::Info,
        Domain::Http,
        "listening",
        obj(&[("msg", v_str(&format!("running server at http://{}", bind_addr)))]),
    );
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

async fn dashboard(State(state): State<DashboardState>, uri: Uri) -> Response {
    let started = Instant::now();
    let rendered = tokio::task::spawn_blocking(move || state.renderer.render(&state.assets)).await;
    match rendered {
        Ok(page) => {
            log_request(uri.path(), page.charts.len(), started.elapsed().as_secs_f64() * 1000.0);
            Html(page.to_html()).into_response()
        }
        Err(e) => {
            log(
                Level::Error,
                Domain::Http,
                "render_failed",
                obj(&[("path", v_str(uri.path())), ("msg", v_str(&e.to_string()))]),
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "render failed").into_response()
        }
    }
}
