use time::OffsetDateTime;
use tracing::{info, warn};

use super::engine::{self, Claim, RewardConfig, RewardPreview};
use crate::{
    auth::{services::current_user, Claims},
    error::AppError,
    users::{repo::UserStore, repo_types::User},
};

/// Loads the caller and previews today's reward.
pub async fn daily_status(
    store: &dyn UserStore,
    claims: &Claims,
    now: OffsetDateTime,
    cfg: &RewardConfig,
) -> Result<(User, RewardPreview), AppError> {
    let user = current_user(store, claims).await?;
    let preview = engine::preview_reward(&user, now, cfg);
    Ok((user, preview))
}

/// Claims today's reward and persists it.
///
/// The write is conditional on `last_login_date` being unchanged since the
/// record was read, so two concurrent claims award points at most once.
pub async fn claim_daily(
    store: &dyn UserStore,
    claims: &Claims,
    now: OffsetDateTime,
    cfg: &RewardConfig,
) -> Result<Claim, AppError> {
    let user = current_user(store, claims).await?;
    let claim = engine::claim(&user, now, cfg).map_err(|e| {
        warn!(user_id = %user.id, "daily reward already claimed");
        AppError::from(e)
    })?;

    let Some(saved) = store.record_claim(&claim.user, user.last_login_date).await? else {
        warn!(user_id = %user.id, "lost concurrent daily claim");
        return Err(AppError::AlreadyClaimed);
    };

    info!(
        user_id = %saved.id,
        points_awarded = claim.points_awarded,
        streak = claim.new_streak,
        "daily reward claimed"
    );
    Ok(Claim {
        user: saved,
        ..claim
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::jwt::JwtKeys,
        config::JwtConfig,
        users::{file::FileUserStore, repo_types::NewUser},
    };
    use time::{macros::datetime, Duration};

    async fn setup() -> (tempfile::TempDir, FileUserStore, Claims) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileUserStore::open(dir.path().join("users.json"))
            .await
            .unwrap();
        let user = store
            .create(NewUser {
                name: "Kay".into(),
                email: "kay@example.com".into(),
                password_hash: "$argon2id$fake".into(),
            })
            .await
            .unwrap();
        let keys = JwtKeys::new(&JwtConfig {
            secret: "s".into(),
            issuer: "i".into(),
            audience: "a".into(),
            ttl_minutes: 5,
        });
        let claims = keys.verify(&keys.sign(&user).unwrap()).unwrap();
        (dir, store, claims)
    }

    #[tokio::test]
    async fn claim_persists_and_blocks_same_day_repeat() {
        let (_dir, store, claims) = setup().await;
        let cfg = RewardConfig::default();
        let now = datetime!(2024-06-01 10:00 UTC);

        let first = claim_daily(&store, &claims, now, &cfg).await.unwrap();
        assert_eq!(first.points_awarded, 60);
        assert_eq!(first.new_streak, 1);

        let stored = store.find_by_id(claims.id).await.unwrap().unwrap();
        assert_eq!(stored.points, 60);
        assert_eq!(stored.login_streak, 1);
        assert_eq!(stored.last_login_date, Some(now));

        let err = claim_daily(&store, &claims, now + Duration::hours(3), &cfg)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyClaimed));
        let unchanged = store.find_by_id(claims.id).await.unwrap().unwrap();
        assert_eq!(unchanged, stored);
    }

    #[tokio::test]
    async fn status_preview_then_claim_agree() {
        let (_dir, store, claims) = setup().await;
        let cfg = RewardConfig::default();
        let day1 = datetime!(2024-06-01 10:00 UTC);
        claim_daily(&store, &claims, day1, &cfg).await.unwrap();

        let day2 = day1 + Duration::days(1);
        let (_, preview) = daily_status(&store, &claims, day2, &cfg).await.unwrap();
        let claimed = claim_daily(&store, &claims, day2, &cfg).await.unwrap();
        assert!(preview.claimable);
        assert_eq!(preview.points, claimed.points_awarded);
        assert_eq!(claimed.new_streak, 2);
        assert_eq!(claimed.user.points, 60 + 70);
    }

    #[tokio::test]
    async fn concurrent_claims_award_once() {
        let (_dir, store, claims) = setup().await;
        let cfg = RewardConfig::default();
        let now = datetime!(2024-06-01 10:00 UTC);

        let (a, b) = tokio::join!(
            claim_daily(&store, &claims, now, &cfg),
            claim_daily(&store, &claims, now, &cfg)
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let stored = store.find_by_id(claims.id).await.unwrap().unwrap();
        assert_eq!(stored.points, 60);
    }
}
