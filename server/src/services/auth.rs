//! Auth services - Gestione autenticazione e registrazione utenti

use crate::core::{AppError, AppState, encode_jwt};
use crate::dtos::{AuthResponseDTO, LoginDTO, RegisterDTO, UserDTO};
use crate::entities::User;
use crate::repositories::CreateUserDTO;
use axum::extract::{Json, State};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

#[instrument(skip(state, body), fields(username = %body.username))]
pub async fn login_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginDTO>,
) -> Result<Json<AuthResponseDTO>, AppError> {
    debug!("Login attempt");
    // 1. Cercare l'utente tramite username
    // 2. Verificare la password con bcrypt
    // 3. Rifiutare gli account disabilitati
    // 4. Generare il token JWT

    let user = match state.user.find_by_username(&body.username).await? {
        Some(user) if user.verify_password(&body.password) => user,
        _ => {
            warn!("Invalid credentials");
            return Err(AppError::unauthorized("Username or password are not correct."));
        }
    };

    if !user.enabled {
        warn!("Login attempt on disabled account");
        return Err(AppError::unauthorized("Account disabled"));
    }

    let token = encode_jwt(&user, &state.jwt_secret, state.token_ttl_hours)?;
    info!(user_id = user.user_id, "User logged in");

    Ok(Json(AuthResponseDTO {
        user: UserDTO::from(user),
        token,
    }))
}

#[instrument(skip(state, body), fields(username = %body.username))]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterDTO>,
) -> Result<Json<AuthResponseDTO>, AppError> {
    debug!("Registering user");
    // 1. Validare il DTO con validator
    // 2. Controllare che lo username non sia già usato
    // 3. Hashare la password e salvare l'utente
    // 4. Restituire utente e token, come il login

    body.validate()?;

    if state.user.find_by_username(&body.username).await?.is_some() {
        warn!("Username already exists");
        return Err(AppError::conflict("Username already exists"));
    }

    let password_hash = User::hash_password(&body.password)
        .map_err(|_| AppError::internal_server_error("Failed to hash password"))?;

    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(body.username.as_str())
        .to_string();

    let created_user = state
        .user
        .create(&CreateUserDTO {
            username: body.username.clone(),
            password_hash,
            name,
        })
        .await?;

    let token = encode_jwt(&created_user, &state.jwt_secret, state.token_ttl_hours)?;
    info!(user_id = created_user.user_id, "User registered");

    Ok(Json(AuthResponseDTO {
        user: UserDTO::from(created_user),
        token,
    }))
}
