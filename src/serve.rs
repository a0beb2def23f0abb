use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::http::{HeaderValue, header};
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower::ServiceExt;
use tower::service_fn;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, info};

use crate::config::{AppConfig, FilterConfig};
use crate::git::{GitError, GitHistory, History};
use crate::interaction::{Action, PointerEvent, ViewState, Viewport};
use crate::model::{CanvasSize, Point, RefLabel};
use crate::render::{DrawCommand, HitRegion, edge_color};
use crate::theme::Theme;
use crate::view::GraphView;

/// Arguments for running the gitlanes web server
#[derive(Debug, Clone, Parser)]
#[command(name = "gitlanes serve", about = "Serve an interactive commit graph over HTTP.")]
pub struct ServeArgs {
    /// Repository to visualise; any path inside the work tree works.
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Address to bind the HTTP server to.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 5252)]
    pub port: u16,

    /// Directory with a static web UI to serve at `/`.
    #[arg(long = "ui-dir")]
    pub ui_dir: Option<PathBuf>,

    /// Colour theme for rendered previews.
    #[arg(long, value_enum)]
    pub theme: Option<Theme>,

    /// Background colour for rendered SVG previews.
    #[arg(long)]
    pub background: Option<String>,

    /// JSON config file; defaults to the per-user config.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

struct ServeState {
    repo_path: PathBuf,
    background: Option<String>,
    filters: RwLock<FilterConfig>,
    view: RwLock<GraphView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphPayload {
    repo_path: String,
    status: String,
    filters: FilterConfig,
    view: ViewState,
    viewport: Viewport,
    canvas: CanvasSize,
    render_size: CanvasSize,
    special_lane: usize,
    lanes: Vec<LanePayload>,
    nodes: Vec<NodePayload>,
    edges: Vec<EdgePayload>,
    commands: Vec<DrawCommand>,
    hits: Vec<HitRegion>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct LanePayload {
    lane: usize,
    label: String,
    color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct NodePayload {
    id: String,
    short_id: String,
    author: String,
    email: String,
    summary: String,
    time: String,
    lane: usize,
    branch: String,
    position: Point,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    refs: Vec<RefLabel>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct EdgePayload {
    child: String,
    parent: String,
    ordinal: usize,
    color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReloadPayload {
    applied: bool,
    status: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ZoomDirection {
    In,
    Out,
    Center,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct ZoomRequest {
    direction: ZoomDirection,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct PanRequest {
    dx: f32,
    dy: f32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct ViewportUpdate {
    width: f32,
    height: f32,
    #[serde(default)]
    view: Option<ViewState>,
}

pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref())?;
    let theme = args.theme.unwrap_or(config.theme);
    let repo_path = args
        .repo
        .canonicalize()
        .with_context(|| format!("failed to resolve repository path '{}'", args.repo.display()))?;

    let state = Arc::new(ServeState {
        repo_path,
        background: args.background.clone().or(config.background.clone()),
        filters: RwLock::new(config.filters.clone()),
        view: RwLock::new(GraphView::new(config.layout, theme)),
    });

    reload(&state, config.filters).await?;

    let mut app = Router::new()
        .route("/api/graph", get(get_graph))
        .route("/api/graph/svg", get(get_svg))
        .route("/api/graph/filters", put(put_filters))
        .route("/api/graph/zoom", post(post_zoom))
        .route("/api/graph/viewport", put(put_viewport))
        .route("/api/graph/pan", post(post_pan))
        .route("/api/graph/pointer", post(post_pointer))
        .route("/api/repo/:list", get(get_repo_list))
        .with_state(state);

    if let Some(root) = args.ui_dir {
        let static_dir = ServeDir::new(root.clone())
            .append_index_html_on_directories(true)
            .fallback(ServeFile::new(root.join("index.html")));

        let static_service = service_fn(move |req| {
            let svc = static_dir.clone();
            async move {
                match svc.oneshot(req).await {
                    Ok(response) => Ok(response.map(axum::body::Body::new)),
                    Err(error) => {
                        let message = format!("Static file error: {error}");
                        Ok((StatusCode::INTERNAL_SERVER_ERROR, message).into_response())
                    }
                }
            }
        });

        app = app.fallback_service(static_service);
    }

    let app = app.layer(CorsLayer::permissive());

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind HTTP server to {addr}"))?;

    println!("gitlanes server listening on http://{addr}");
    println!("Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server error")?;

    Ok(())
}

/// Loads history off the async runtime. Returns `false` when a newer reload
/// started in the meantime and this result was dropped.
async fn reload(state: &Arc<ServeState>, filters: FilterConfig) -> Result<bool> {
    let ticket = state.view.write().await.begin_load();
    let repo = state.repo_path.clone();
    let request = filters.clone();

    let result = tokio::task::spawn_blocking(move || -> Result<History, GitError> {
        GitHistory::open(&repo)?.load_commits(&request)
    })
    .await
    .context("history loader panicked")?;

    let applied = state.view.write().await.finish_load(ticket, result);
    if applied {
        info!(filters = %filters.describe(), "reloaded commit graph");
        *state.filters.write().await = filters;
    }
    Ok(applied)
}

fn graph_payload(view: &mut GraphView, filters: &FilterConfig, repo_path: String) -> GraphPayload {
    let layout = view.layout();
    let theme = view.theme();
    let output = view.paint();

    let lanes = (0..layout.lane_count())
        .map(|lane| LanePayload {
            lane,
            label: layout
                .lanes()
                .label_of_lane(lane)
                .unwrap_or_default()
                .to_string(),
            color: theme.lane_color(lane),
        })
        .collect();

    let nodes = layout
        .nodes()
        .map(|node| {
            let commit = layout.commit(node.index);
            NodePayload {
                id: commit.id.clone(),
                short_id: commit.short_id().to_string(),
                author: commit.author.clone(),
                email: commit.email.clone(),
                summary: commit.summary.clone(),
                time: commit.time.to_rfc3339(),
                lane: node.lane,
                branch: layout.branch_at(node.index).to_string(),
                position: node.position,
                refs: layout.refs_for(&commit.id).to_vec(),
            }
        })
        .collect();

    let edges = layout
        .edges()
        .map(|edge| EdgePayload {
            child: layout.commit(edge.child).id.clone(),
            parent: layout.commit(edge.parent).id.clone(),
            ordinal: edge.ordinal,
            color: edge_color(&layout, &edge, theme),
        })
        .collect();

    GraphPayload {
        repo_path,
        status: view.status().to_string(),
        filters: filters.clone(),
        view: view.view_state(),
        viewport: view.viewport(),
        canvas: output.canvas,
        render_size: output.device_size(),
        special_lane: layout.special_lane(),
        lanes,
        nodes,
        edges,
        hits: output.hits.regions().collect(),
        commands: output.commands,
    }
}

async fn get_graph(
    State(state): State<Arc<ServeState>>,
) -> Result<Json<GraphPayload>, (StatusCode, String)> {
    let filters = state.filters.read().await.clone();
    let mut view = state.view.write().await;
    Ok(Json(graph_payload(
        &mut view,
        &filters,
        state.repo_path.display().to_string(),
    )))
}

async fn get_svg(State(state): State<Arc<ServeState>>) -> Result<Response, (StatusCode, String)> {
    let svg = state
        .view
        .read()
        .await
        .render_svg(state.background.as_deref())
        .map_err(internal_error)?;

    let mut response = Response::new(svg.into());
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("image/svg+xml"),
    );
    Ok(response)
}

async fn put_filters(
    State(state): State<Arc<ServeState>>,
    Json(filters): Json<FilterConfig>,
) -> Result<Json<ReloadPayload>, (StatusCode, String)> {
    let filters = filters.normalized();
    filters.validate().map_err(bad_request)?;

    let applied = reload(&state, filters).await.map_err(internal_error)?;
    let status = state.view.read().await.status().to_string();
    Ok(Json(ReloadPayload { applied, status }))
}

async fn post_zoom(
    State(state): State<Arc<ServeState>>,
    Json(request): Json<ZoomRequest>,
) -> Result<Json<ViewState>, (StatusCode, String)> {
    let mut view = state.view.write().await;
    match request.direction {
        ZoomDirection::In => view.zoom_in(),
        ZoomDirection::Out => view.zoom_out(),
        ZoomDirection::Center => view.center(),
    }
    debug!(scale = view.view_state().scale, "zoom request");
    Ok(Json(view.view_state()))
}

async fn post_pan(
    State(state): State<Arc<ServeState>>,
    Json(request): Json<PanRequest>,
) -> Result<Json<ViewState>, (StatusCode, String)> {
    if !(request.dx.is_finite() && request.dy.is_finite()) {
        return Err(bad_request("pan delta must be finite"));
    }
    let mut view = state.view.write().await;
    view.pan(Point::new(request.dx, request.dy));
    Ok(Json(view.view_state()))
}

async fn put_viewport(
    State(state): State<Arc<ServeState>>,
    Json(update): Json<ViewportUpdate>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if !(update.width >= 0.0 && update.height >= 0.0) {
        return Err(bad_request("viewport size must be non-negative"));
    }
    let mut view = state.view.write().await;
    view.set_viewport(Viewport::new(update.width, update.height));
    if let Some(next) = update.view {
        view.set_view(next);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn post_pointer(
    State(state): State<Arc<ServeState>>,
    Json(event): Json<PointerEvent>,
) -> Result<Json<Action>, (StatusCode, String)> {
    let action = state.view.write().await.handle_pointer_event(event);
    Ok(Json(action))
}

async fn get_repo_list(
    State(state): State<Arc<ServeState>>,
    AxumPath(list): AxumPath<String>,
) -> Result<Json<Vec<String>>, (StatusCode, String)> {
    let repo = state.repo_path.clone();
    let scan_limit = state.filters.read().await.author_scan_limit();

    let names = tokio::task::spawn_blocking(move || -> Result<Option<Vec<String>>> {
        let history = GitHistory::open(&repo)?;
        let names = match list.as_str() {
            "branches" => history.list_branches()?,
            "tags" => history.list_tags()?,
            "authors" => history.list_authors(scan_limit)?,
            _ => return Ok(None),
        };
        Ok(Some(names))
    })
    .await
    .map_err(|err| internal_error(err.into()))?
    .map_err(internal_error)?;

    names
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "unknown list".to_string()))
}

fn internal_error(err: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

fn bad_request(err: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, err.to_string())
}
