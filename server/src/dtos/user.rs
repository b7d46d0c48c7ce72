//! User DTOs - Data Transfer Objects per utenti

use crate::entities::User;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

lazy_static! {
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_.\-]+$").unwrap();
}

/// Public view of a user, the password hash never leaves the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserDTO {
    pub id: i32,
    pub username: String,
    pub name: String,
}

impl From<User> for UserDTO {
    fn from(value: User) -> Self {
        Self {
            id: value.user_id,
            username: value.username,
            name: value.name,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Validate)]
pub struct RegisterDTO {
    #[validate(
        length(min = 3, max = 64, message = "Username must be between 3 and 64 characters"),
        regex(path = *USERNAME_REGEX, message = "Username may only contain letters, digits, '.', '_' and '-'")
    )]
    pub username: String,

    #[validate(length(min = 6, max = 128, message = "Password must be between 6 and 128 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,
}

/// DTO per il login (solo username e password)
#[derive(Deserialize, Debug, Clone)]
pub struct LoginDTO {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthResponseDTO {
    pub user: UserDTO,
    pub token: String,
}
