use std::{path::PathBuf, str::FromStr};

use anyhow::Context;
use axum::http::HeaderValue;
use serde::Deserialize;
use time::UtcOffset;

use crate::rewards::engine::RewardConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Where user records live.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    Postgres { database_url: String },
    File { path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub jwt: JwtConfig,
    pub rewards: RewardConfig,
    pub cors_origins: Vec<HeaderValue>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = match std::env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "file".into())
            .as_str()
        {
            "postgres" => StoreConfig::Postgres {
                database_url: std::env::var("DATABASE_URL")
                    .context("DATABASE_URL is required when STORE_BACKEND=postgres")?,
            },
            "file" => StoreConfig::File {
                path: std::env::var("USERS_FILE")
                    .unwrap_or_else(|_| "data/users.json".into())
                    .into(),
            },
            other => anyhow::bail!("unknown STORE_BACKEND {other:?} (expected postgres or file)"),
        };

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is required")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "bunklab".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "bunklab-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60 * 24 * 7)?,
        };

        let defaults = RewardConfig::default();
        let rewards = reward_config(
            env_or("REWARD_BASE_POINTS", defaults.base_points)?,
            env_or("REWARD_STREAK_BONUS", defaults.streak_bonus)?,
            env_or("REWARD_MAX_STREAK_BONUS", defaults.max_streak_bonus)?,
            env_or("REWARD_UTC_OFFSET_MINUTES", 0)?,
        )?;

        let cors_origins = match std::env::var("CORS_ORIGINS") {
            Ok(raw) => parse_origins(&raw)?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            store,
            jwt,
            rewards,
            cors_origins,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {v:?}")),
        Err(_) => Ok(default),
    }
}

/// Rewards only ever add points, so every amount must be non-negative.
fn reward_config(
    base_points: i64,
    streak_bonus: i64,
    max_streak_bonus: i64,
    offset_minutes: i32,
) -> anyhow::Result<RewardConfig> {
    for (key, value) in [
        ("REWARD_BASE_POINTS", base_points),
        ("REWARD_STREAK_BONUS", streak_bonus),
        ("REWARD_MAX_STREAK_BONUS", max_streak_bonus),
    ] {
        if value < 0 {
            anyhow::bail!("{key} must not be negative (got {value})");
        }
    }

    let offset_seconds = offset_minutes
        .checked_mul(60)
        .context("REWARD_UTC_OFFSET_MINUTES out of range")?;
    let utc_offset = UtcOffset::from_whole_seconds(offset_seconds)
        .context("REWARD_UTC_OFFSET_MINUTES out of range")?;

    Ok(RewardConfig {
        base_points,
        streak_bonus,
        max_streak_bonus,
        utc_offset,
    })
}

fn parse_origins(raw: &str) -> anyhow::Result<Vec<HeaderValue>> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| {
            HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin {o:?}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_origins_trims_and_skips_blanks() {
        let origins = parse_origins("http://localhost:5173, http://localhost:3000,,").unwrap();
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "http://localhost:5173");
        assert_eq!(origins[1], "http://localhost:3000");
    }

    #[test]
    fn reward_config_accepts_defaults_and_offset() {
        let cfg = reward_config(50, 10, 200, 90).unwrap();
        assert_eq!(cfg.base_points, 50);
        assert_eq!(cfg.utc_offset, UtcOffset::from_hms(1, 30, 0).unwrap());
        assert_eq!(reward_config(0, 0, 0, 0).unwrap().reward_for_streak(5), 0);
    }

    #[test]
    fn reward_config_rejects_negative_amounts() {
        let err = reward_config(-100, 10, 200, 0).unwrap_err();
        assert!(err.to_string().contains("REWARD_BASE_POINTS"));
        let err = reward_config(50, -1, 200, 0).unwrap_err();
        assert!(err.to_string().contains("REWARD_STREAK_BONUS"));
        let err = reward_config(50, 10, -200, 0).unwrap_err();
        assert!(err.to_string().contains("REWARD_MAX_STREAK_BONUS"));
    }

    #[test]
    fn reward_config_rejects_huge_offset_without_overflow() {
        for minutes in [i32::MAX, i32::MIN, 26 * 60] {
            let err = reward_config(50, 10, 200, minutes).unwrap_err();
            assert!(err.to_string().contains("out of range"), "{minutes}");
        }
    }

    #[test]
    fn parse_origins_rejects_control_characters() {
        assert!(parse_origins("http://ok.example,bad\norigin").is_err());
    }
}
