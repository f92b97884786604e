use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User record in the database. The password hash lives in its own column
/// and is never loaded into this type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    #[serde(default)]
    pub id: i64, // assigned by the store
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub institute: String,
    #[serde(default)]
    pub admin: bool,
}
