//! Back-office models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::auth::UserRole;
use super::item::{DealMode, ItemStatus};

/// Paged admin list; the backend names the array after the resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminList<T> {
    #[serde(alias = "users", alias = "items", alias = "bookings", alias = "events")]
    pub entries: Vec<T>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: i64,
    pub email: String,
    pub role: UserRole,
    #[serde(default)]
    pub banned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ban_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ban_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdminUser {
    /// Banned without expiry, or with an expiry still in the future
    pub fn is_banned_at(&self, now: DateTime<Utc>) -> bool {
        match (self.banned_at, self.ban_expires_at) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(expires)) => expires > now,
        }
    }
}

/// Booking as seen by moderators; type/status kept as raw strings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminBooking {
    pub id: i64,
    pub item_id: i64,
    pub requester_id: i64,
    pub owner_id: i64,
    #[serde(rename = "type")]
    pub booking_type: String,
    pub status: String,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub handover_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub handover_confirmed_by_owner_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub handover_confirmed_by_requester_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub return_confirmed_by_owner_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub return_confirmed_by_requester_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminBookingEvent {
    pub id: i64,
    pub booking_id: i64,
    #[serde(default)]
    pub actor_user_id: Option<i64>,
    pub action: String,
    #[serde(default)]
    pub from_status: Option<String>,
    #[serde(default)]
    pub to_status: Option<String>,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminItem {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub status: ItemStatus,
    pub mode: DealMode,
    #[serde(default)]
    pub blocked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Moderation audit event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminEvent {
    pub id: i64,
    pub actor_user_id: i64,
    pub entity_type: String,
    pub entity_id: i64,
    pub action: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdminListUsersParams {
    pub q: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// User patch; `ban_expires_at: Some(None)` sends an explicit `null` (permanent ban)
#[derive(Debug, Clone, Default, Serialize)]
pub struct AdminPatchUserPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ban: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ban_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ban_expires_at: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdminListBookingsParams {
    pub status: Option<String>,
    pub booking_type: Option<String>,
    pub item_id: Option<i64>,
    pub user_id: Option<i64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdminListItemsParams {
    pub q: Option<String>,
    pub status: Option<String>,
    pub mode: Option<String>,
    pub include_deleted: bool,
    pub include_archived: bool,
    pub include_transferred: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AdminPatchItemPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<DealMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
}

/// Reason attached to block/unblock/delete
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModerationPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdminListEventsParams {
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub actor_user_id: Option<i64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_admin_list_accepts_resource_keys() {
        let users: AdminList<AdminEvent> = serde_json::from_str(
            r#"{"events":[{"id":1,"actor_user_id":2,"entity_type":"item","entity_id":9,
                "action":"block","created_at":"2025-02-01T10:00:00Z"}],"limit":50,"offset":0}"#,
        )
        .unwrap();
        assert_eq!(users.entries.len(), 1);
        assert_eq!(users.entries[0].action, "block");
        assert_eq!(users.limit, 50);
    }

    #[test]
    fn test_patch_user_explicit_null_expiry() {
        let payload = AdminPatchUserPayload {
            ban: Some(true),
            ban_reason: Some("spam".to_string()),
            ban_expires_at: Some(None),
            ..Default::default()
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["ban"], true);
        assert!(json["ban_expires_at"].is_null());
        assert!(json.as_object().unwrap().contains_key("ban_expires_at"));
        assert!(!json.as_object().unwrap().contains_key("role"));
    }

    #[test]
    fn test_ban_state() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let mut user: AdminUser = serde_json::from_str(
            r#"{"id":1,"email":"a@b.c","role":"user","created_at":"2025-01-01T00:00:00Z",
                "updated_at":"2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(!user.is_banned_at(now));

        user.banned_at = Some(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
        assert!(user.is_banned_at(now));

        user.ban_expires_at = Some(Utc.with_ymd_and_hms(2025, 2, 15, 0, 0, 0).unwrap());
        assert!(!user.is_banned_at(now));
    }
}
