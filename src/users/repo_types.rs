use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_AVATAR: &str = "👨‍💻";

/// Stored user record. Serialized in full by the file store, so this type
/// must never be returned to a client directly; use [`PublicUser`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub points: i64,
    pub rank: Option<i32>,
    pub level: i32,
    pub login_streak: i32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login_date: Option<OffsetDateTime>,
    pub tagline: String,
    pub college: String,
    pub avatar: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Input for account creation; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn into_user(self, id: Uuid, created_at: OffsetDateTime) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            points: 0,
            rank: None,
            level: 1,
            login_streak: 0,
            last_login_date: None,
            tagline: String::new(),
            college: String::new(),
            avatar: DEFAULT_AVATAR.to_string(),
            created_at,
        }
    }
}

/// Profile fields a user may edit. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub tagline: Option<String>,
    pub college: Option<String>,
}

impl ProfileUpdate {
    pub fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(avatar) = self.avatar {
            user.avatar = avatar;
        }
        if let Some(tagline) = self.tagline {
            user.tagline = tagline;
        }
        if let Some(college) = self.college {
            user.college = college;
        }
    }
}

/// Client-facing view of a user, without the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub points: i64,
    pub rank: Option<i32>,
    pub level: i32,
    pub login_streak: i32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login_date: Option<OffsetDateTime>,
    pub tagline: String,
    pub college: String,
    pub avatar: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            points: u.points,
            rank: u.rank,
            level: u.level,
            login_streak: u.login_streak,
            last_login_date: u.last_login_date,
            tagline: u.tagline,
            college: u.college,
            avatar: u.avatar,
            created_at: u.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        NewUser {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$fake".into(),
        }
        .into_user(Uuid::new_v4(), OffsetDateTime::now_utc())
    }

    #[test]
    fn new_user_defaults() {
        let u = sample();
        assert_eq!(u.points, 0);
        assert_eq!(u.level, 1);
        assert_eq!(u.login_streak, 0);
        assert!(u.last_login_date.is_none());
        assert!(u.rank.is_none());
        assert_eq!(u.avatar, DEFAULT_AVATAR);
    }

    #[test]
    fn public_view_hides_password_hash() {
        let json = serde_json::to_value(PublicUser::from(sample())).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["loginStreak"], 0);
        assert!(json["lastLoginDate"].is_null());
        assert!(json["rank"].is_null());
    }

    #[test]
    fn profile_update_only_touches_present_fields() {
        let mut u = sample();
        ProfileUpdate {
            tagline: Some("shipping daily".into()),
            ..Default::default()
        }
        .apply(&mut u);
        assert_eq!(u.tagline, "shipping daily");
        assert_eq!(u.name, "Ada");
        assert_eq!(u.avatar, DEFAULT_AVATAR);
    }
}
