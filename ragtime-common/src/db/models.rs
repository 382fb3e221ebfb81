//! Database models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Permission bits combined into a role's `permissions` column
pub mod permission {
    pub const FOLLOW: i64 = 0x01;
    pub const COMMENT: i64 = 0x02;
    pub const WRITE: i64 = 0x04;
    pub const MODERATE: i64 = 0x08;
    pub const ADMIN: i64 = 0x10;
}

/// Authorization level assigned to each user
///
/// Three fixed roles are seeded at database initialization:
/// Fan (default), Moderator, Administrator.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub guid: String,
    pub name: String,
    pub permissions: i64,
    pub is_default: bool,
}

impl Role {
    pub fn has_permission(&self, perm: i64) -> bool {
        self.permissions & perm == perm
    }
}

/// A registered person, uniquely identified by email and by username
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub guid: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role_id: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub last_seen: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// Release type of a composition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    Single = 1,
    Ep = 2,
    Album = 3,
}

impl ReleaseType {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(ReleaseType::Single),
            2 => Some(ReleaseType::Ep),
            3 => Some(ReleaseType::Album),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> i64 {
        *self as i64
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReleaseType::Single => "Single",
            ReleaseType::Ep => "EP",
            ReleaseType::Album => "Album",
        }
    }
}

/// A user-authored content item, addressed by its unique slug
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Composition {
    pub guid: String,
    pub release_type: i64,
    pub title: String,
    pub description: Option<String>,
    pub slug: String,
    pub artist_id: String,
    pub created_at: NaiveDateTime,
}

/// User-authored text attached to a composition
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub guid: String,
    pub body: String,
    pub artist_id: String,
    pub composition_id: String,
    pub disabled: bool,
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_bits_compose() {
        let fan = permission::FOLLOW | permission::COMMENT | permission::WRITE;
        let role = Role {
            guid: "r".to_string(),
            name: "Fan".to_string(),
            permissions: fan,
            is_default: true,
        };
        assert!(role.has_permission(permission::FOLLOW));
        assert!(role.has_permission(permission::COMMENT | permission::WRITE));
        assert!(!role.has_permission(permission::MODERATE));
        assert!(!role.has_permission(permission::ADMIN));
    }

    #[test]
    fn test_release_type_round_trip() {
        assert_eq!(ReleaseType::from_i64(1), Some(ReleaseType::Single));
        assert_eq!(ReleaseType::from_i64(2), Some(ReleaseType::Ep));
        assert_eq!(ReleaseType::from_i64(3), Some(ReleaseType::Album));
        assert_eq!(ReleaseType::from_i64(0), None);
        assert_eq!(ReleaseType::Album.as_i64(), 3);
    }
}
