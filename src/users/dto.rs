use serde::{de, Deserialize, Deserializer, Serialize};

use super::repo_types::User;

/// Request body for creating or updating a user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    #[serde(deserialize_with = "user_object")]
    pub user: User,
    /// Plaintext password; empty on update means "keep the current one".
    #[serde(default)]
    pub password: String,
}

// serde would also map a positional array onto `User`
fn user_object<'de, D>(deserializer: D) -> Result<User, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Err(de::Error::custom("user must be a JSON object"));
    }
    serde_json::from_value(value).map_err(de::Error::custom)
}

/// Response for listing users.
#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
}
