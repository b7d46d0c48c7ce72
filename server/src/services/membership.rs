//! Membership services - Gestione membri nelle chat

use crate::core::{AppError, AppState, AuthUser};
use crate::dtos::{AddMembersDTO, UserDTO};
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

#[derive(Serialize)]
pub struct MemberListDTO {
    pub members: Vec<UserDTO>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedMembersDTO {
    pub added_ids: Vec<i32>,
}

#[instrument(skip(state))]
pub async fn list_chat_members(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i32>,
) -> Result<Json<MemberListDTO>, AppError> {
    let members = state
        .members
        .members_of(chat_id)
        .await?
        .into_iter()
        .map(UserDTO::from)
        .collect();
    Ok(Json(MemberListDTO { members }))
}

#[instrument(skip(state, current_user, body), fields(requester = %current_user.user_id))]
pub async fn add_members(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i32>,
    Extension(current_user): Extension<AuthUser>,
    Json(body): Json<AddMembersDTO>,
) -> Result<Json<AddedMembersDTO>, AppError> {
    body.validate()?;

    let added_ids = state
        .members
        .add_members(chat_id, current_user.user_id, &body.member_ids)
        .await?;

    // i nuovi membri vedono comparire la chat nella lista anche senza join
    if !added_ids.is_empty() {
        if let Some(chat) = state.chat.read(chat_id).await? {
            state.router.notify_chat_created(&chat, &added_ids);
        }
    }

    info!(added = added_ids.len(), "Members added");
    Ok(Json(AddedMembersDTO { added_ids }))
}

#[instrument(skip(state, current_user), fields(requester = %current_user.user_id))]
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    Path((chat_id, user_id)): Path<(i32, i32)>,
    Extension(current_user): Extension<AuthUser>,
) -> Result<StatusCode, AppError> {
    state
        .members
        .remove_member(chat_id, current_user.user_id, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
