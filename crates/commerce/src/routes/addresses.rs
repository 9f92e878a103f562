//! Live shipping address routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};

use crate::db::AddressRepository;
use crate::error::AppError;
use crate::identity::RequestIdentity;
use crate::models::address::{Address, NewAddress};
use crate::state::AppState;

/// Create the address routes router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/addresses", get(list_addresses).post(create_address))
}

async fn list_addresses(
    State(state): State<AppState>,
    identity: RequestIdentity,
) -> Result<Json<Vec<Address>>, AppError> {
    let user_id = identity.require_user()?;
    let addresses = AddressRepository::new(state.pool())
        .list_for_user(user_id)
        .await?;
    Ok(Json(addresses))
}

async fn create_address(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Json(body): Json<NewAddress>,
) -> Result<(StatusCode, Json<Address>), AppError> {
    let user_id = identity.require_user()?;

    if body.full_name.is_empty() || body.street.is_empty() || body.city.is_empty() {
        return Err(AppError::BadRequest(
            "full_name, street, and city are required".to_string(),
        ));
    }

    let address = AddressRepository::new(state.pool())
        .create(user_id, &body)
        .await?;
    Ok((StatusCode::CREATED, Json(address)))
}
