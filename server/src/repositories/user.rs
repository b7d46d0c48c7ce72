//! UserRepository - Repository per la gestione degli utenti

use super::{CreateUserDTO, UserStore};
use crate::entities::User;
use async_trait::async_trait;
use sqlx::{Error, MySqlPool};
use tracing::{debug, info, instrument};

const USER_COLUMNS: &str = r#"
    id AS user_id,
    username,
    COALESCE(name, username) AS name,
    password_hash,
    enabled,
    COALESCE((SELECT r.name FROM roles r WHERE r.id = users.role_id), 'user') AS role
"#;

// USER REPO
pub struct UserRepository {
    connection_pool: MySqlPool,
}

impl UserRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    #[instrument(skip(self, data), fields(username = %data.username))]
    async fn create(&self, data: &CreateUserDTO) -> Result<User, Error> {
        debug!("Creating new user");
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, name, role_id)
            VALUES (?, ?, ?, (SELECT r.id FROM roles r WHERE r.name = 'user' LIMIT 1))
            "#,
        )
        .bind(&data.username)
        .bind(&data.password_hash)
        .bind(&data.name)
        .execute(&self.connection_pool)
        .await?;

        let new_id = result.last_insert_id() as i32;
        info!("User created with id {}", new_id);

        self.find_by_id(new_id).await?.ok_or(Error::RowNotFound)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, user_id: i32) -> Result<Option<User>, Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(&self.connection_pool)
            .await
    }

    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.connection_pool)
            .await
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<User>, Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.connection_pool)
            .await
    }
}
