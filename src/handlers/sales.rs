use crate::{errors::ServiceError, handlers::common::success_response, AppState};
use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;

pub fn sales_routes() -> Router<AppState> {
    Router::new().route("/", get(list_sales))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesQuery {
    pub current_page: Option<u64>,
}

/// Currently active sales, paginated.
async fn list_sales(
    State(state): State<AppState>,
    Query(query): Query<SalesQuery>,
) -> Result<Response, ServiceError> {
    let page = state
        .services
        .pricing
        .active_sales(query.current_page.unwrap_or(1))
        .await?;

    Ok(success_response(page))
}
