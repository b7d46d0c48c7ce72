use crate::core::{AppError, AppState};
use crate::entities::User;
use axum::extract::State;
use axum::{body::Body, extract::Request, http, http::Response, middleware::Next};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

// struct che codifica il contenuto del token jwt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub exp: usize, // Expiry time of the token
    pub iat: usize, // Issued at time of the token
    pub id: i32,
    pub username: String,
    pub name: String,
    pub role: String,
}

/// Identity of an authenticated connection or request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub name: String,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username.clone(),
            name: user.name.clone(),
        }
    }
}

#[instrument(skip(user, secret), fields(username = %user.username, id = %user.user_id))]
pub fn encode_jwt(user: &User, secret: &str, ttl_hours: i64) -> Result<String, AppError> {
    debug!("Encoding JWT token for user");
    let now = Utc::now();
    let exp: usize = (now + Duration::hours(ttl_hours)).timestamp() as usize;
    let iat: usize = now.timestamp() as usize;
    let claim = Claims {
        iat,
        exp,
        id: user.user_id,
        username: user.username.clone(),
        name: user.name.clone(),
        role: user.role.clone(),
    };

    encode(
        &Header::default(),
        &claim,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map(|token| {
        info!("JWT token encoded successfully");
        token
    })
    .map_err(|e| {
        error!("Failed to encode JWT token: {:?}", e);
        AppError::internal_server_error("Error in encoding jwt token")
    })
}

#[instrument(skip(jwt_token, secret))]
pub fn decode_jwt(jwt_token: &str, secret: &str) -> Result<TokenData<Claims>, AppError> {
    debug!("Decoding JWT token");
    decode::<Claims>(
        jwt_token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| {
        debug!("JWT token decoded successfully for user: {}", data.claims.username);
        data
    })
    .map_err(|e| {
        warn!("Failed to decode JWT token: {:?}", e);
        AppError::unauthorized("Unable to decode token")
    })
}

/// Extracts the token from an `Authorization` header value.
///
/// Accepts both `Bearer <token>` and a bare token.
pub fn bearer_token(header: &str) -> Option<&str> {
    let header = header.trim();
    let token = match header.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => return None,
        None if header.eq_ignore_ascii_case("bearer") => return None,
        None => header,
    };
    (!token.is_empty()).then_some(token)
}

/// Verifies a credential token and loads the user behind it.
///
/// Unknown and disabled users are rejected the same way as a bad signature.
#[instrument(skip(state, token))]
pub async fn authenticate_token(state: &AppState, token: &str) -> Result<User, AppError> {
    let token_data = decode_jwt(token, &state.jwt_secret)?;

    match state.user.find_by_id(token_data.claims.id).await? {
        Some(user) if user.enabled => {
            debug!("User authenticated: {}", user.username);
            Ok(user)
        }
        Some(user) => {
            warn!("Disabled user tried to authenticate: {}", user.username);
            Err(AppError::unauthorized("Account disabled"))
        }
        None => {
            warn!("User not found in database: {}", token_data.claims.username);
            Err(AppError::unauthorized("You are not an authorized user"))
        }
    }
}

#[instrument(skip(state, req, next))]
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running authentication middleware");
    let token = match req.headers().get(http::header::AUTHORIZATION) {
        Some(header) => header
            .to_str()
            .ok()
            .and_then(bearer_token)
            .map(str::to_string)
            .ok_or_else(|| {
                warn!("Invalid authorization header format");
                AppError::unauthorized("Malformed authorization header")
            })?,
        None => {
            warn!("Missing authorization header");
            return Err(AppError::unauthorized(
                "Please add the JWT token to the header",
            ));
        }
    };

    let current_user = authenticate_token(&state, &token).await?;
    req.extensions_mut().insert(AuthUser::from(&current_user));
    req.extensions_mut().insert(current_user);
    Ok(next.run(req).await)
}

/// Middleware che verifica che l'utente corrente sia membro della chat specificata
/// Estrae chat_id dal path e lo confronta con la Membership Authority
#[instrument(skip(state, req, next))]
pub async fn chat_membership_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running chat membership middleware");
    let current_user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| {
            warn!("User not found in request extensions");
            AppError::unauthorized("User not authenticated")
        })?
        .clone();

    // primo segmento numerico del path: /api/chats/{chat_id}/...
    let chat_id: i32 = req
        .uri()
        .path()
        .split('/')
        .find_map(|segment| segment.parse::<i32>().ok())
        .ok_or_else(|| {
            warn!("Chat ID not found in path: {}", req.uri().path());
            AppError::bad_request("Chat ID not found in path")
        })?;

    state
        .members
        .require_member(chat_id, current_user.user_id)
        .await?;

    debug!("User {} verified as member of chat {}", current_user.user_id, chat_id);
    Ok(next.run(req).await)
}
