//! Chat Membership Authority - chi appartiene a quale chat
//!
//! Ogni operazione che modifica una chat passa da qui e verifica prima che
//! il richiedente sia membro: è l'unico controllo d'accesso sulle chat.

use crate::core::AppError;
use crate::dtos::ChatSummaryDTO;
use crate::entities::{Chat, User};
use crate::repositories::{ChatStore, MemberStore, UserStore};
use crate::ws::chat_lock::{ChatLockGuard, ChatLocks};
use crate::ws::registry::SessionRegistry;
use futures::future::try_join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Clone)]
pub struct MembershipAuthority {
    user: Arc<dyn UserStore>,
    chat: Arc<dyn ChatStore>,
    member: Arc<dyn MemberStore>,
    sessions: SessionRegistry,
    locks: ChatLocks,
}

impl MembershipAuthority {
    pub fn new(
        user: Arc<dyn UserStore>,
        chat: Arc<dyn ChatStore>,
        member: Arc<dyn MemberStore>,
        sessions: SessionRegistry,
    ) -> Self {
        Self {
            user,
            chat,
            member,
            sessions,
            locks: ChatLocks::new(),
        }
    }

    /// Per-chat lock shared with the Message Router.
    ///
    /// Join, send and member removal for one chat never interleave, so a
    /// session cannot end up subscribed to a chat its user was removed from.
    pub async fn lock_chat(&self, chat_id: i32) -> ChatLockGuard {
        self.locks.lock(chat_id).await
    }

    #[cfg(test)]
    pub(crate) fn locked_chats(&self) -> usize {
        self.locks.len()
    }

    pub async fn is_member(&self, chat_id: i32, user_id: i32) -> Result<bool, AppError> {
        Ok(self.member.is_member(chat_id, user_id).await?)
    }

    /// Fails with 403 unless `user_id` belongs to the chat
    #[instrument(skip(self))]
    pub async fn require_member(&self, chat_id: i32, user_id: i32) -> Result<(), AppError> {
        if self.is_member(chat_id, user_id).await? {
            Ok(())
        } else {
            warn!("User {} is not a member of chat {}", user_id, chat_id);
            Err(AppError::forbidden("You are not a member of this chat"))
        }
    }

    /// Creates a chat; the creator is always a member.
    ///
    /// # Returns
    /// The chat and the deduplicated member list, creator first.
    #[instrument(skip(self, name, member_ids), fields(requested = member_ids.len()))]
    pub async fn create_chat(
        &self,
        creator_id: i32,
        name: Option<String>,
        member_ids: &[i32],
    ) -> Result<(Chat, Vec<i32>), AppError> {
        debug!("Creating chat");
        let mut members = vec![creator_id];
        members.extend(self.validate_users(member_ids).await?);
        let members = dedup(members);

        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let chat = self.chat.create(name.as_deref(), &members).await?;
        info!(chat_id = chat.chat_id, members = members.len(), "Chat created");
        Ok((chat, members))
    }

    /// Adds members to a chat.
    ///
    /// # Returns
    /// The ids that were not members before; re-adding a member is a no-op.
    #[instrument(skip(self, member_ids))]
    pub async fn add_members(
        &self,
        chat_id: i32,
        requester_id: i32,
        member_ids: &[i32],
    ) -> Result<Vec<i32>, AppError> {
        self.require_member(chat_id, requester_id).await?;
        let candidates = dedup(self.validate_users(member_ids).await?);

        let mut added = Vec::new();
        for user_id in candidates {
            if self.member.add(chat_id, user_id).await? {
                added.push(user_id);
            }
        }

        info!(added = added.len(), "Members added to chat");
        Ok(added)
    }

    /// Removes `target_id` from the chat and drops the room subscriptions of
    /// its live sessions. Removing the last member keeps the chat.
    #[instrument(skip(self))]
    pub async fn remove_member(
        &self,
        chat_id: i32,
        requester_id: i32,
        target_id: i32,
    ) -> Result<(), AppError> {
        self.require_member(chat_id, requester_id).await?;

        let _chat_lock = self.lock_chat(chat_id).await;
        if !self.member.remove(chat_id, target_id).await? {
            warn!("Target {} is not a member of chat {}", target_id, chat_id);
            return Err(AppError::not_found("User is not a member of this chat"));
        }
        self.sessions.unsubscribe_user(chat_id, target_id);

        info!("Member removed from chat");
        Ok(())
    }

    #[instrument(skip(self, name))]
    pub async fn rename(
        &self,
        chat_id: i32,
        requester_id: i32,
        name: &str,
    ) -> Result<Chat, AppError> {
        self.require_member(chat_id, requester_id).await?;

        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::bad_request("Chat name cannot be empty"));
        }

        let chat = self.chat.rename(chat_id, name).await?;
        info!("Chat renamed");
        Ok(chat)
    }

    pub async fn members_of(&self, chat_id: i32) -> Result<Vec<User>, AppError> {
        Ok(self.member.members_of(chat_id).await?)
    }

    /// Chat listing read model.
    ///
    /// Unnamed chats with exactly two members are shown with the other
    /// member's display name.
    #[instrument(skip(self))]
    pub async fn chats_for(&self, user_id: i32) -> Result<Vec<ChatSummaryDTO>, AppError> {
        let mut chats = self.chat.list_for_user(user_id).await?;

        let unnamed: Vec<i32> = chats
            .iter()
            .filter(|c| c.name.is_none())
            .map(|c| c.id)
            .collect();
        let members = try_join_all(unnamed.iter().map(|&id| self.member.members_of(id))).await?;

        for (chat_id, members) in unnamed.into_iter().zip(members) {
            if members.len() != 2 {
                continue;
            }
            let other = members.into_iter().find(|m| m.user_id != user_id);
            if let (Some(chat), Some(other)) = (chats.iter_mut().find(|c| c.id == chat_id), other) {
                chat.name = Some(other.name);
            }
        }

        debug!(count = chats.len(), "Chats listed");
        Ok(chats)
    }

    /// Checks that every id refers to an existing user
    async fn validate_users(&self, member_ids: &[i32]) -> Result<Vec<i32>, AppError> {
        let users = try_join_all(member_ids.iter().map(|&id| self.user.find_by_id(id))).await?;
        match member_ids.iter().zip(users).find(|(_, user)| user.is_none()) {
            Some((id, _)) => {
                warn!("Unknown user {} in member list", id);
                Err(AppError::bad_request("Unknown user in member list")
                    .with_details(format!("user {} does not exist", id)))
            }
            None => Ok(member_ids.to_vec()),
        }
    }
}

/// Removes duplicates keeping the first occurrence
fn dedup(ids: Vec<i32>) -> Vec<i32> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{CreateUserDTO, MemoryStore};
    use axum::http::StatusCode;

    async fn setup(users: &[&str]) -> (MembershipAuthority, Arc<MemoryStore>, Vec<i32>) {
        let store = Arc::new(MemoryStore::new());
        let mut ids = Vec::new();
        for username in users {
            let user = UserStore::create(
                store.as_ref(),
                &CreateUserDTO {
                    username: username.to_string(),
                    password_hash: String::new(),
                    name: username.to_string(),
                },
            )
            .await
            .unwrap();
            ids.push(user.user_id);
        }
        let authority = MembershipAuthority::new(
            store.clone(),
            store.clone(),
            store.clone(),
            SessionRegistry::new(),
        );
        (authority, store, ids)
    }

    #[tokio::test]
    async fn test_creator_is_always_member() {
        let (authority, _, ids) = setup(&["alice", "bob"]).await;
        let (chat, members) = authority.create_chat(ids[0], None, &[ids[1]]).await.unwrap();

        assert_eq!(members, vec![ids[0], ids[1]]);
        assert!(authority.is_member(chat.chat_id, ids[0]).await.unwrap());
        assert!(authority.is_member(chat.chat_id, ids[1]).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_dedups_and_rejects_unknown_users() {
        let (authority, _, ids) = setup(&["alice", "bob"]).await;
        let (_, members) = authority
            .create_chat(ids[0], Some("  ".to_string()), &[ids[1], ids[0], ids[1]])
            .await
            .unwrap();
        assert_eq!(members, vec![ids[0], ids[1]]);

        let err = authority.create_chat(ids[0], None, &[999]).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_add_members_twice_keeps_one_row() {
        let (authority, store, ids) = setup(&["alice", "bob"]).await;
        let (chat, _) = authority.create_chat(ids[0], None, &[]).await.unwrap();

        let first = authority.add_members(chat.chat_id, ids[0], &[ids[1]]).await.unwrap();
        let second = authority.add_members(chat.chat_id, ids[0], &[ids[1]]).await.unwrap();

        assert_eq!(first, vec![ids[1]]);
        assert!(second.is_empty());
        let rows = store
            .memberships()
            .await
            .into_iter()
            .filter(|m| m.chat_id == chat.chat_id && m.user_id == ids[1])
            .count();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_mutations_require_membership() {
        let (authority, _, ids) = setup(&["alice", "bob", "carol"]).await;
        let (chat, _) = authority.create_chat(ids[0], None, &[ids[1]]).await.unwrap();
        let outsider = ids[2];

        let forbidden = [
            authority.add_members(chat.chat_id, outsider, &[outsider]).await.unwrap_err(),
            authority.remove_member(chat.chat_id, outsider, ids[1]).await.unwrap_err(),
            authority.rename(chat.chat_id, outsider, "mine").await.unwrap_err(),
        ];
        for err in forbidden {
            assert_eq!(err.status(), StatusCode::FORBIDDEN);
        }
        assert!(!authority.is_member(chat.chat_id, outsider).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_last_member_keeps_chat() {
        let (authority, store, ids) = setup(&["alice"]).await;
        let (chat, _) = authority.create_chat(ids[0], Some("solo".to_string()), &[]).await.unwrap();

        authority.remove_member(chat.chat_id, ids[0], ids[0]).await.unwrap();
        assert!(authority.members_of(chat.chat_id).await.unwrap().is_empty());
        assert!(ChatStore::read(store.as_ref(), chat.chat_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_unknown_target_is_not_found() {
        let (authority, _, ids) = setup(&["alice", "bob"]).await;
        let (chat, _) = authority.create_chat(ids[0], None, &[]).await.unwrap();
        let err = authority.remove_member(chat.chat_id, ids[0], ids[1]).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rename_validates_name() {
        let (authority, _, ids) = setup(&["alice"]).await;
        let (chat, _) = authority.create_chat(ids[0], None, &[]).await.unwrap();

        let err = authority.rename(chat.chat_id, ids[0], "   ").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let renamed = authority.rename(chat.chat_id, ids[0], " team ").await.unwrap();
        assert_eq!(renamed.name.as_deref(), Some("team"));
    }

    #[tokio::test]
    async fn test_direct_chat_named_after_other_member() {
        let (authority, _, ids) = setup(&["alice", "bob", "carol"]).await;
        let (direct, _) = authority.create_chat(ids[0], None, &[ids[1]]).await.unwrap();
        let (group, _) = authority.create_chat(ids[0], None, &[ids[1], ids[2]]).await.unwrap();

        let chats = authority.chats_for(ids[0]).await.unwrap();
        let name_of = |id: i32| chats.iter().find(|c| c.id == id).unwrap().name.clone();
        assert_eq!(name_of(direct.chat_id), Some("bob".to_string()));
        assert_eq!(name_of(group.chat_id), None);

        let for_bob = authority.chats_for(ids[1]).await.unwrap();
        let direct_for_bob = for_bob.iter().find(|c| c.id == direct.chat_id).unwrap();
        assert_eq!(direct_for_bob.name.as_deref(), Some("alice"));
    }
}
