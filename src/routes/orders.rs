use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{
        CheckoutRequest, EmitEventRequest, OrderList, OrderWithItems, PayOrderRequest,
        ProducerOrderView,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub fn route() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/checkout", post(checkout))
        .route("/{id}", get(get_order).delete(expire_order))
        .route("/{id}/pay", post(pay_order))
        .route("/{id}/cancel", post(cancel_order))
        .route("/{id}/events", post(emit_event))
        .route("/{id}/producer", get(producer_view))
}

#[utoipa::path(get, path = "/api/orders", security(("bearer_auth" = [])), tag = "Orders")]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    Ok(Json(
        order_service::list_orders(&state, &user, query).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/orders/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order created from the cart", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Empty cart or insufficient stock"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    Ok(Json(order_service::checkout(&state, &user, payload).await?))
}

#[utoipa::path(get, path = "/api/orders/{id}", security(("bearer_auth" = [])), tag = "Orders")]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    Ok(Json(order_service::get_order(&state, &user, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/pay",
    request_body = PayOrderRequest,
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn pay_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PayOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    Ok(Json(
        order_service::pay_order(&state, &user, id, payload).await?,
    ))
}

#[utoipa::path(post, path = "/api/orders/{id}/cancel", security(("bearer_auth" = [])), tag = "Orders")]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    Ok(Json(order_service::cancel_order(&state, &user, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/events",
    request_body = EmitEventRequest,
    responses(
        (status = 200, description = "Event appended to every item", body = ApiResponse<OrderWithItems>),
        (status = 403, description = "Admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn emit_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<EmitEventRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    Ok(Json(
        order_service::emit_order_event(&state, &user, id, payload).await?,
    ))
}

#[utoipa::path(delete, path = "/api/orders/{id}", security(("bearer_auth" = [])), tag = "Orders")]
pub async fn expire_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(order_service::expire_unpaid(&state, &user, id).await?))
}

#[utoipa::path(get, path = "/api/orders/{id}/producer", security(("bearer_auth" = [])), tag = "Orders")]
pub async fn producer_view(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProducerOrderView>>> {
    Ok(Json(
        order_service::get_order_for_producer(&state, &user, id).await?,
    ))
}
