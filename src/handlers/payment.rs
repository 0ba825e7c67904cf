use crate::{
    auth::AuthenticatedUser, errors::ServiceError, handlers::common::success_response,
    services::checkout::CardDetails, AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::Response,
    routing::post,
    Router,
};
use serde_json::json;

pub fn payment_routes() -> Router<AppState> {
    Router::new().route("/{id}", post(pay_order))
}

/// Commit payment for an order. Requires an identified caller: the
/// transaction drains their cart and writes their purchase history.
async fn pay_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
    Json(card): Json<CardDetails>,
) -> Result<Response, ServiceError> {
    state.services.checkout.pay(id, user.user_id, &card).await?;
    Ok(success_response(json!({ "orderId": id })))
}
