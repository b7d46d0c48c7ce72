//! User services - Elenco utenti per la scelta dei membri

use crate::core::{AppError, AppState};
use crate::dtos::UserDTO;
use axum::extract::{Json, State};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Serialize)]
pub struct UserListDTO {
    pub users: Vec<UserDTO>,
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UserListDTO>, AppError> {
    let users: Vec<UserDTO> = state
        .user
        .list()
        .await?
        .into_iter()
        .map(UserDTO::from)
        .collect();

    debug!(count = users.len(), "Users listed");
    Ok(Json(UserListDTO { users }))
}
