use crate::{
    auth::AuthenticatedUser, errors::ServiceError, handlers::common::success_response,
    services::profiles::ProfileInput, AppState,
};
use axum::{
    extract::{Json, State},
    response::Response,
    routing::get,
    Router,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/", get(get_profile).post(update_profile))
}

async fn get_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Response, ServiceError> {
    let profile = state.services.profiles.get(user.user_id).await?;
    Ok(success_response(profile))
}

async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ProfileInput>,
) -> Result<Response, ServiceError> {
    let profile = state.services.profiles.update(user.user_id, payload).await?;
    Ok(success_response(profile))
}
