use crate::config::AppConfig;
use crate::controller::{tooltip_anchor, MapController, View};
use crate::data::{self, Mount, SourceRouter, LOADING_MESSAGE};
use crate::render::{render_document, render_svg};
use crate::types::{Pointer, TooltipState};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::info;

pub struct AppState {
    pub mount: Mount,
    pub controller: RwLock<MapController>,
}

impl AppState {
    pub fn new(mount: Mount, controller: MapController) -> Self {
        Self {
            mount,
            controller: RwLock::new(controller),
        }
    }

    /// Brings the controller up to date with the loader before answering.
    async fn view(&self) -> View {
        let load = self.mount.state();
        self.controller.write().await.sync(&load)
    }
}

#[derive(Deserialize)]
pub struct QueryParams {
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
pub struct HoverParams {
    fips: u32,
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
pub struct UnhoverParams {
    fips: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    fips: Option<u32>,
    area_name: Option<String>,
    state: Option<String>,
    bachelors_or_higher: f64,
}

/// Tooltip state plus the overlay position the page should use.
#[derive(Debug, Serialize)]
pub struct TooltipResponse {
    #[serde(flatten)]
    tooltip: TooltipState,
    left: f64,
    top: f64,
}

impl From<&TooltipState> for TooltipResponse {
    fn from(tooltip: &TooltipState) -> Self {
        let (left, top) = tooltip_anchor(tooltip);
        Self {
            tooltip: tooltip.clone(),
            left,
            top,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/map.svg", get(svg_handler))
        .route("/api/query", get(query_handler))
        .route("/api/hover", get(hover_handler))
        .route("/api/unhover", get(unhover_handler))
        .route("/api/tooltip", get(tooltip_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig) -> Result<()> {
    let source = Arc::new(SourceRouter::new(config.input.timeout()));
    let mount = data::mount(source, config.input.locations(), config.input.fetch_mode);
    let controller = MapController::new(config.render.projection.build());
    let state = Arc::new(AppState::new(mount, controller));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    let view = state.view().await;
    let controller = state.controller.read().await;
    Html(render_document(&view, controller.tooltip(), true))
}

async fn svg_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.view().await {
        View::Ready(scene) => ([(header::CONTENT_TYPE, "image/svg+xml")], render_svg(&scene)).into_response(),
        View::Loading => (StatusCode::SERVICE_UNAVAILABLE, LOADING_MESSAGE).into_response(),
        View::Failed(message) => (StatusCode::SERVICE_UNAVAILABLE, message).into_response(),
    }
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<QueryResponse>> {
    state.view().await;
    let controller = state.controller.read().await;
    let Some(county) = controller.county_at(params.x, params.y) else {
        return Json(None);
    };
    let entry = controller
        .scene()
        .and_then(|scene| county.fips.and_then(|f| scene.index.get(f).cloned()));

    Json(Some(QueryResponse {
        fips: county.fips,
        area_name: entry.as_ref().map(|e| e.area_name.clone()),
        state: entry.as_ref().map(|e| e.state.clone()),
        bachelors_or_higher: county.education,
    }))
}

async fn hover_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HoverParams>,
) -> Json<TooltipResponse> {
    let load = state.mount.state();
    let mut controller = state.controller.write().await;
    controller.sync(&load);
    controller.hover_in(params.fips, Pointer { x: params.x, y: params.y });
    Json(TooltipResponse::from(controller.tooltip()))
}

async fn unhover_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UnhoverParams>,
) -> Json<TooltipResponse> {
    let mut controller = state.controller.write().await;
    controller.hover_out(params.fips);
    Json(TooltipResponse::from(controller.tooltip()))
}

async fn tooltip_handler(State(state): State<Arc<AppState>>) -> Json<TooltipResponse> {
    let controller = state.controller.read().await;
    Json(TooltipResponse::from(controller.tooltip()))
}
