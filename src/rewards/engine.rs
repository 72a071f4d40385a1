//! Daily login reward rules.
//!
//! Everything here is a pure function of the user record, the current
//! instant and a [`RewardConfig`]. Calendar days are taken in the single
//! fixed offset held by the config, for both [`claim`] and
//! [`preview_reward`].

use serde::Serialize;
use thiserror::Error;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::users::repo_types::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardConfig {
    pub base_points: i64,
    /// Bonus per consecutive day, multiplied by the new streak.
    pub streak_bonus: i64,
    pub max_streak_bonus: i64,
    /// Offset in which calendar days are compared.
    pub utc_offset: UtcOffset,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            base_points: 50,
            streak_bonus: 10,
            max_streak_bonus: 200,
            utc_offset: UtcOffset::UTC,
        }
    }
}

impl RewardConfig {
    pub fn reward_for_streak(&self, streak: i32) -> i64 {
        let bonus = self.streak_bonus.saturating_mul(i64::from(streak));
        self.base_points + bonus.min(self.max_streak_bonus)
    }

    fn day_of(&self, at: OffsetDateTime) -> Date {
        at.to_offset(self.utc_offset).date()
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RewardError {
    #[error("daily reward already claimed")]
    AlreadyClaimed,
}

/// Result of a successful claim. `user` is the record to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    pub user: User,
    pub points_awarded: i64,
    pub new_streak: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardPreview {
    pub claimable: bool,
    /// Points a claim made now would award; 0 when not claimable.
    pub points: i64,
    pub current_streak: i32,
    /// Streak after a claim made now; equals `current_streak` when not claimable.
    pub next_streak: i32,
}

fn next_streak(user: &User, now: OffsetDateTime, cfg: &RewardConfig) -> Result<i32, RewardError> {
    let today = cfg.day_of(now);
    let Some(last) = user.last_login_date.map(|at| cfg.day_of(at)) else {
        return Ok(1);
    };
    // A last claim dated after today only happens when the clock went
    // backwards; refuse it so last_login_date never moves back.
    if last >= today {
        return Err(RewardError::AlreadyClaimed);
    }
    if today.previous_day() == Some(last) {
        Ok(user.login_streak.saturating_add(1))
    } else {
        Ok(1)
    }
}

/// Claims today's reward for `user`, returning the updated record.
pub fn claim(user: &User, now: OffsetDateTime, cfg: &RewardConfig) -> Result<Claim, RewardError> {
    let new_streak = next_streak(user, now, cfg)?;
    let points_awarded = cfg.reward_for_streak(new_streak);

    let mut updated = user.clone();
    updated.points = updated.points.saturating_add(points_awarded);
    updated.login_streak = new_streak;
    updated.last_login_date = Some(now);

    Ok(Claim {
        user: updated,
        points_awarded,
        new_streak,
    })
}

/// What [`claim`] would award at `now`, without touching the record.
pub fn preview_reward(user: &User, now: OffsetDateTime, cfg: &RewardConfig) -> RewardPreview {
    match next_streak(user, now, cfg) {
        Ok(next) => RewardPreview {
            claimable: true,
            points: cfg.reward_for_streak(next),
            current_streak: user.login_streak,
            next_streak: next,
        },
        Err(RewardError::AlreadyClaimed) => RewardPreview {
            claimable: false,
            points: 0,
            current_streak: user.login_streak,
            next_streak: user.login_streak,
        },
    }
}
