use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path as FsPath;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::chart::{CategoryChartType, Figure};
use crate::config::Config;
use crate::graph::{self, GraphOptions};
use crate::loader::Dataset;
use crate::reactive::{ChartId, Dispatcher, FilterField, FilterState};

/// Everything the handlers share: built once at startup, read-only after.
pub struct AppContext {
    dataset: Dataset,
    dispatcher: Dispatcher,
    defaults: FilterState,
}

impl AppContext {
    pub fn new(dataset: Dataset) -> Self {
        Self::with_dispatcher(dataset, Dispatcher::standard())
    }

    pub fn with_dispatcher(dataset: Dataset, dispatcher: Dispatcher) -> Self {
        let defaults = FilterState::defaults(&dataset);
        AppContext {
            dataset,
            dispatcher,
            defaults,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn defaults(&self) -> &FilterState {
        &self.defaults
    }

    /// Figures to repaint after the page moved from `previous` to `state`.
    ///
    /// Without a previous state every chart is rendered (first paint).
    pub fn update(&self, previous: Option<&FilterState>, state: &FilterState) -> UpdateResponse {
        match previous {
            Some(previous) => {
                let changed = state.changed_fields(previous);
                let figures = self.dispatcher.dispatch(&self.dataset, state, &changed);
                UpdateResponse {
                    changed: changed.into_iter().collect(),
                    figures,
                }
            }
            None => UpdateResponse {
                changed: Vec::new(),
                figures: self.dispatcher.render_all(&self.dataset, state),
            },
        }
    }

    pub fn options(&self) -> OptionsResponse {
        let (start, end) = self.dataset.date_span();
        OptionsResponse {
            malls: self.dataset.malls().to_vec(),
            date_span: DateSpan { start, end },
            chart_types: CategoryChartType::ALL
                .into_iter()
                .map(|value| ChartTypeOption {
                    value,
                    label: value.label(),
                })
                .collect(),
            defaults: self.defaults.clone(),
            dependencies: self.dispatcher.dependency_map(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub previous: Option<FilterState>,
    pub state: FilterState,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub changed: Vec<FilterField>,
    pub figures: BTreeMap<ChartId, Figure>,
}

#[derive(Debug, Serialize)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct ChartTypeOption {
    pub value: CategoryChartType,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub malls: Vec<String>,
    pub date_span: DateSpan,
    pub chart_types: Vec<ChartTypeOption>,
    pub defaults: FilterState,
    pub dependencies: BTreeMap<ChartId, Vec<FilterField>>,
}

/// Filter overrides for the single-chart endpoints; absent fields use defaults.
#[derive(Debug, Default, Deserialize)]
struct ChartQuery {
    mall: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    chart_type: Option<CategoryChartType>,
    width: Option<u32>,
    height: Option<u32>,
}

impl ChartQuery {
    fn filter_state(&self, defaults: &FilterState) -> FilterState {
        FilterState {
            mall: self.mall.clone().unwrap_or_else(|| defaults.mall.clone()),
            start_date: self.start_date.unwrap_or(defaults.start_date),
            end_date: self.end_date.unwrap_or(defaults.end_date),
            chart_type: self.chart_type.unwrap_or(defaults.chart_type),
        }
    }

    fn graph_options(&self) -> GraphOptions {
        let defaults = GraphOptions::default();
        GraphOptions {
            width: self.width.unwrap_or(defaults.width).clamp(200, 4000),
            height: self.height.unwrap_or(defaults.height).clamp(200, 4000),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    status: String,
    message: Option<String>,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            status: "error".to_string(),
            message: Some(message),
        }),
    )
        .into_response()
}

/// Builds the HTTP surface around a shared context.
pub fn router(ctx: Arc<AppContext>, static_dir: impl AsRef<FsPath>) -> Router {
    Router::new()
        .route("/", get(serve_dashboard))
        .route("/api/options", get(get_options))
        .route("/api/update", post(post_update))
        .route("/api/charts/:chart", get(get_chart))
        .route("/api/charts/:chart/svg", get(get_chart_svg))
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .with_state(ctx)
}

pub async fn run(config: &Config, ctx: AppContext) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(Arc::new(ctx), &config.static_dir);

    let listener = TcpListener::bind(config.bind_addr()).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_dashboard() -> Html<&'static str> {
    Html(include_str!("./static/dashboard.html"))
}

async fn get_options(State(ctx): State<Arc<AppContext>>) -> Json<OptionsResponse> {
    Json(ctx.options())
}

async fn post_update(
    State(ctx): State<Arc<AppContext>>,
    Json(payload): Json<UpdateRequest>,
) -> Json<UpdateResponse> {
    Json(ctx.update(payload.previous.as_ref(), &payload.state))
}

async fn get_chart(
    Path(chart): Path<String>,
    Query(query): Query<ChartQuery>,
    State(ctx): State<Arc<AppContext>>,
) -> Response {
    let chart: ChartId = match chart.parse() {
        Ok(id) => id,
        Err(message) => return error_response(StatusCode::NOT_FOUND, message),
    };

    let state = query.filter_state(ctx.defaults());
    match ctx.dispatcher.render(chart, &ctx.dataset, &state) {
        Some(figure) => Json(figure).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("chart `{chart}` is not registered")),
    }
}

async fn get_chart_svg(
    Path(chart): Path<String>,
    Query(query): Query<ChartQuery>,
    State(ctx): State<Arc<AppContext>>,
) -> Response {
    let chart: ChartId = match chart.parse() {
        Ok(id) => id,
        Err(message) => return error_response(StatusCode::NOT_FOUND, message),
    };

    let state = query.filter_state(ctx.defaults());
    let Some(figure) = ctx.dispatcher.render(chart, &ctx.dataset, &state) else {
        return error_response(StatusCode::NOT_FOUND, format!("chart `{chart}` is not registered"));
    };

    match graph::render_svg(&figure, &query.graph_options()) {
        Ok(svg) => ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response(),
        Err(e) => {
            log::error!("svg rendering of {} failed: {}", chart, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
