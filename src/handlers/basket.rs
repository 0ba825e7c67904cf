use crate::{
    auth::CallerIdentity,
    errors::ServiceError,
    handlers::common::{success_response, validate_input},
    services::cart::{CartLineView, CartOwner},
    AppState,
};
use axum::{
    extract::{Json, State},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use validator::Validate;

pub fn basket_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(list_basket).post(add_to_basket).delete(remove_from_basket),
    )
}

/// Cart mutation payload: product id plus quantity.
#[derive(Debug, Deserialize, Validate)]
pub struct BasketMutationRequest {
    pub id: i32,
    #[validate(range(min = 1))]
    pub count: i32,
}

/// Resolve the caller to a cart owner. Identified wins over session;
/// the two cart keyspaces never mix.
fn cart_owner(caller: &CallerIdentity) -> Option<CartOwner> {
    if let Some(user_id) = caller.user_id {
        return Some(CartOwner::Identified(user_id));
    }
    caller
        .session_id
        .clone()
        .map(CartOwner::Anonymous)
}

fn require_cart_owner(caller: &CallerIdentity) -> Result<CartOwner, ServiceError> {
    cart_owner(caller).ok_or_else(|| {
        ServiceError::ValidationError(
            "cart access requires authentication or a session id".to_string(),
        )
    })
}

/// List the caller's cart. A caller with neither identity nor session
/// simply has no cart yet: empty list, nothing persisted.
async fn list_basket(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Response, ServiceError> {
    let Some(owner) = cart_owner(&caller) else {
        return Ok(success_response(Vec::<CartLineView>::new()));
    };

    let lines = state.services.cart.list(&owner).await?;
    Ok(success_response(lines))
}

/// Add a product to the caller's cart; responds with the full line list.
async fn add_to_basket(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(payload): Json<BasketMutationRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&payload)?;
    let owner = require_cart_owner(&caller)?;

    let lines = state
        .services
        .cart
        .add(&owner, payload.id, payload.count)
        .await?;
    Ok(success_response(lines))
}

/// Remove quantity of a product from the caller's cart; responds with
/// the full line list.
async fn remove_from_basket(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(payload): Json<BasketMutationRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&payload)?;
    let owner = require_cart_owner(&caller)?;

    let lines = state
        .services
        .cart
        .remove(&owner, payload.id, payload.count)
        .await?;
    Ok(success_response(lines))
}
