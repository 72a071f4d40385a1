use std::path::{Path, PathBuf};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    repo::{StoreError, StoreResult, UserStore},
    repo_types::{NewUser, ProfileUpdate, User},
};

/// Keeps every user in a single JSON array on disk.
///
/// All access goes through `lock`, so a read-modify-write cycle is never
/// interleaved with another one inside this process. Writes land in a
/// sibling temp file first and are renamed over the original.
pub struct FileUserStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileUserStore {
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        if !tokio::fs::try_exists(&path).await? {
            write_users(&path, &[]).await?;
            info!(path = %path.display(), "created empty user file");
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    async fn read(&self) -> StoreResult<Vec<User>> {
        let raw = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn write(&self, users: &[User]) -> StoreResult<()> {
        write_users(&self.path, users).await
    }
}

async fn write_users(path: &Path, users: &[User]) -> StoreResult<()> {
    let body = serde_json::to_vec_pretty(users)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), count = users.len(), "user file written");
    Ok(())
}

#[async_trait]
impl UserStore for FileUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.into_iter().find(|u| u.email == email))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.into_iter().find(|u| u.id == id))
    }

    async fn create(&self, new_user: NewUser) -> StoreResult<User> {
        let _guard = self.lock.lock().await;
        let mut users = self.read().await?;
        if users.iter().any(|u| u.email == new_user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = new_user.into_user(Uuid::new_v4(), OffsetDateTime::now_utc());
        users.push(user.clone());
        self.write(&users).await?;
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<User> {
        let _guard = self.lock.lock().await;
        let mut users = self.read().await?;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound)?;
        update.apply(user);
        let updated = user.clone();
        self.write(&users).await?;
        Ok(updated)
    }

    async fn record_claim(
        &self,
        claimed: &User,
        expected_last_login: Option<OffsetDateTime>,
    ) -> StoreResult<Option<User>> {
        let _guard = self.lock.lock().await;
        let mut users = self.read().await?;
        let user = users
            .iter_mut()
            .find(|u| u.id == claimed.id)
            .ok_or(StoreError::NotFound)?;
        if user.last_login_date != expected_last_login {
            return Ok(None);
        }
        user.points = claimed.points;
        user.login_streak = claimed.login_streak;
        user.last_login_date = claimed.last_login_date;
        let updated = user.clone();
        self.write(&users).await?;
        Ok(Some(updated))
    }
}
