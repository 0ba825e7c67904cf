use crate::{
    auth::{AuthenticatedUser, CallerIdentity},
    errors::ServiceError,
    handlers::common::{created_response, success_response, validate_input},
    services::orders::{OrderInfoInput, OrderLineInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::Response,
    routing::get,
    Router,
};
use serde_json::json;

pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(order_history).post(create_order))
        .route("/order/{id}", get(get_order).post(add_order_info))
}

/// Create an order from the caller's materialized cart lines.
/// Anonymous callers get guest orders without contact prefill.
async fn create_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(lines): Json<Vec<OrderLineInput>>,
) -> Result<Response, ServiceError> {
    for line in &lines {
        validate_input(line)?;
    }

    let order_id = state.services.orders.create(lines, caller.user_id).await?;
    Ok(success_response(json!({ "orderId": order_id })))
}

/// Orders previously paid by the authenticated caller.
async fn order_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Response, ServiceError> {
    let orders = state.services.orders.history(user.user_id).await?;
    Ok(success_response(orders))
}

async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    let order = state.services.orders.get(id).await?;
    Ok(success_response(order))
}

/// Attach delivery/contact/payment metadata to an existing order.
async fn add_order_info(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<OrderInfoInput>,
) -> Result<Response, ServiceError> {
    let order_id = state.services.orders.add_order_info(id, payload).await?;
    Ok(created_response(json!({ "orderId": order_id })))
}
