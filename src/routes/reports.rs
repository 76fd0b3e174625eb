use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::reports::{EvolutionSeries, ReportEntryList, ReportQuery},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::report_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(products_report))
        .route("/clients", get(clients_report))
        .route("/evolution", get(evolution_report))
}

#[utoipa::path(
    get,
    path = "/api/reports/products",
    params(
        ("start_date" = String, Query, description = "Window start, YYYY-MM-DD"),
        ("end_date" = String, Query, description = "Window end, YYYY-MM-DD"),
        ("metric" = String, Query, description = "One of numeroEncomendas, totalProdutos, comprasTotais, vendasTotais, numeroProdutosEncomendados"),
        ("category_id" = Option<Uuid>, Query, description = "Restrict to a category subtree"),
        ("radius_km" = Option<f64>, Query, description = "Restrict to orders within this distance of the producer")
    ),
    responses(
        (status = 200, description = "Per-product totals", body = ApiResponse<ReportEntryList>),
        (status = 400, description = "Invalid date range or metric"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn products_report(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ApiResponse<ReportEntryList>>> {
    Ok(Json(
        report_service::products_report(&state, &user, query).await?,
    ))
}

#[utoipa::path(get, path = "/api/reports/clients", security(("bearer_auth" = [])), tag = "Reports")]
pub async fn clients_report(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ApiResponse<ReportEntryList>>> {
    Ok(Json(
        report_service::clients_report(&state, &user, query).await?,
    ))
}

#[utoipa::path(get, path = "/api/reports/evolution", security(("bearer_auth" = [])), tag = "Reports")]
pub async fn evolution_report(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ApiResponse<EvolutionSeries>>> {
    Ok(Json(
        report_service::evolution_report(&state, &user, query).await?,
    ))
}
