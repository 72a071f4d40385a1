use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{NewUser, ProfileUpdate, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("user not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Backing store for user records. Implementations must be interchangeable:
/// the rest of the service only ever holds an `Arc<dyn UserStore>`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Fails with [`StoreError::DuplicateEmail`] if the email is taken.
    async fn create(&self, user: NewUser) -> StoreResult<User>;

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<User>;

    /// Writes `points`, `login_streak` and `last_login_date` from `claimed`,
    /// but only while the stored `last_login_date` still equals
    /// `expected_last_login`. Returns `None` when another claim got there
    /// first.
    async fn record_claim(
        &self,
        claimed: &User,
        expected_last_login: Option<OffsetDateTime>,
    ) -> StoreResult<Option<User>>;
}
