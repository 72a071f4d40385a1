use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    repo::{StoreError, StoreResult, UserStore},
    repo_types::{NewUser, ProfileUpdate, User},
};

const USER_COLUMNS: &str = "id, name, email, password_hash, points, rank, level, login_streak, \
     last_login_date, tagline, college, avatar, created_at";

// Postgres unique_violation
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;
        tracing::info!("migrations applied");

        Ok(Self { db })
    }
}

fn map_insert_error(e: sqlx::Error) -> StoreError {
    let duplicate = e
        .as_database_error()
        .and_then(|d| d.code())
        .map(|code| code == UNIQUE_VIOLATION)
        .unwrap_or(false);
    if duplicate {
        StoreError::DuplicateEmail
    } else {
        StoreError::Database(e)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> StoreResult<User> {
        let user = new_user.into_user(Uuid::new_v4(), OffsetDateTime::now_utc());
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, points, rank, level,
                               login_streak, last_login_date, tagline, college, avatar, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.points)
        .bind(user.rank)
        .bind(user.level)
        .bind(user.login_streak)
        .bind(user.last_login_date)
        .bind(&user.tagline)
        .bind(&user.college)
        .bind(&user.avatar)
        .bind(user.created_at)
        .fetch_one(&self.db)
        .await
        .map_err(map_insert_error)?;
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET name = COALESCE($2, name),
                   avatar = COALESCE($3, avatar),
                   tagline = COALESCE($4, tagline),
                   college = COALESCE($5, college)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.name)
        .bind(update.avatar)
        .bind(update.tagline)
        .bind(update.college)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn record_claim(
        &self,
        claimed: &User,
        expected_last_login: Option<OffsetDateTime>,
    ) -> StoreResult<Option<User>> {
        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET points = $2,
                   login_streak = $3,
                   last_login_date = $4
             WHERE id = $1
               AND last_login_date IS NOT DISTINCT FROM $5
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(claimed.id)
        .bind(claimed.points)
        .bind(claimed.login_streak)
        .bind(claimed.last_login_date)
        .bind(expected_last_login)
        .fetch_optional(&self.db)
        .await?;

        if updated.is_none() && self.find_by_id(claimed.id).await?.is_none() {
            return Err(StoreError::NotFound);
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    // Needs a live Postgres; run with DATABASE_URL set and `--ignored`.
    async fn connect() -> PgUserStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        PgUserStore::connect(&url).await.unwrap()
    }

    fn new_user() -> NewUser {
        NewUser {
            name: "Grace".into(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password_hash: "$argon2id$fake".into(),
        }
    }

    #[test]
    fn non_database_errors_are_not_duplicates() {
        assert!(matches!(
            map_insert_error(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }

    #[tokio::test]
    #[ignore]
    async fn duplicate_email_maps_to_store_error() {
        let store = connect().await;
        let first = new_user();
        let email = first.email.clone();
        store.create(first).await.unwrap();

        let err = store
            .create(NewUser {
                email,
                ..new_user()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    #[ignore]
    async fn record_claim_is_compare_and_swap() {
        let store = connect().await;
        let user = store.create(new_user()).await.unwrap();

        let mut claimed = user.clone();
        claimed.points = 60;
        claimed.login_streak = 1;
        claimed.last_login_date = Some(datetime!(2026-03-01 08:00 UTC));
        let first = store.record_claim(&claimed, None).await.unwrap();
        assert_eq!(first.map(|u| u.points), Some(60));

        // A second writer that also read `None` must lose.
        let mut racer = user.clone();
        racer.points = 60;
        racer.login_streak = 1;
        racer.last_login_date = Some(datetime!(2026-03-01 08:05 UTC));
        assert!(store.record_claim(&racer, None).await.unwrap().is_none());

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.points, 60);
        assert_eq!(stored.last_login_date, claimed.last_login_date);

        // Next day, expecting the stored timestamp, goes through.
        let mut next = stored.clone();
        next.points = 130;
        next.login_streak = 2;
        next.last_login_date = Some(datetime!(2026-03-02 09:00 UTC));
        let second = store
            .record_claim(&next, stored.last_login_date)
            .await
            .unwrap();
        assert_eq!(second.map(|u| u.login_streak), Some(2));
    }

    #[tokio::test]
    #[ignore]
    async fn record_claim_for_unknown_user_is_not_found() {
        let store = connect().await;
        let ghost = new_user().into_user(Uuid::new_v4(), OffsetDateTime::now_utc());
        let err = store.record_claim(&ghost, None).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
