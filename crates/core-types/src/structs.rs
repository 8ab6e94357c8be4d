use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `profiles` table. The id is always the auth user's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a user may change from the settings form. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub onboarding_completed: Option<bool>,
}

/// A row from the `categories` table. `user_id` is `None` for system defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WellnessCategory {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl WellnessCategory {
    pub fn is_default(&self) -> bool {
        self.user_id.is_none()
    }

    /// Whether `user_id` may attach goals and entries to this category.
    pub fn visible_to(&self, user_id: Uuid) -> bool {
        self.user_id.is_none_or(|owner| owner == user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// A row from the `category_goals` table. One per (user, category).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CategoryGoal {
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub target_hours: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `entries` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WellnessEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub duration_minutes: i32,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Payload of the activity-entry form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntry {
    pub category_id: Uuid,
    pub duration_minutes: i32,
    #[serde(default)]
    pub notes: Option<String>,
    /// Defaults to "now" when the form omits it.
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

/// The user as reported by the hosted auth API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    pub fn email_verified(&self) -> bool {
        self.email_confirmed_at.is_some()
    }
}

/// An access/refresh token pair issued by the hosted auth API.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    pub user: AuthUser,
}

// Tokens stay out of logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("user", &self.user)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(user_id: Option<Uuid>) -> WellnessCategory {
        WellnessCategory {
            id: Uuid::new_v4(),
            name: "Reading".to_string(),
            color: "#123456".to_string(),
            user_id,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn default_categories_are_visible_to_everyone() {
        let cat = category(None);
        assert!(cat.is_default());
        assert!(cat.visible_to(Uuid::new_v4()));
    }

    #[test]
    fn owned_categories_are_private() {
        let owner = Uuid::new_v4();
        let cat = category(Some(owner));
        assert!(cat.visible_to(owner));
        assert!(!cat.visible_to(Uuid::new_v4()));
    }

    #[test]
    fn session_debug_hides_tokens() {
        let session = Session {
            access_token: "secret-access".to_string(),
            refresh_token: "secret-refresh".to_string(),
            expires_in: 3600,
            user: AuthUser {
                id: Uuid::new_v4(),
                email: "a@b.co".to_string(),
                email_confirmed_at: None,
            },
        };
        let printed = format!("{:?}", session);
        assert!(!printed.contains("secret-access"));
        assert!(!printed.contains("secret-refresh"));
    }
}
