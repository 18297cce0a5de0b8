//! Booking domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of booking request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingType {
    Rent,
    Buy,
    Give,
}

impl BookingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingType::Rent => "rent",
            BookingType::Buy => "buy",
            BookingType::Give => "give",
        }
    }
}

/// Booking lifecycle status; transitions are enforced by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Requested,
    Approved,
    HandoverPending,
    InUse,
    ReturnPending,
    Completed,
    Declined,
    Cancelled,
    Expired,
    /// Status this client does not know yet
    #[serde(other)]
    Unknown,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Requested => "requested",
            BookingStatus::Approved => "approved",
            BookingStatus::HandoverPending => "handover_pending",
            BookingStatus::InUse => "in_use",
            BookingStatus::ReturnPending => "return_pending",
            BookingStatus::Completed => "completed",
            BookingStatus::Declined => "declined",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Expired => "expired",
            BookingStatus::Unknown => "unknown",
        }
    }

    /// No further transitions possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed
                | BookingStatus::Declined
                | BookingStatus::Cancelled
                | BookingStatus::Expired
        )
    }
}

/// Booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub item_id: i64,
    pub requester_id: i64,
    pub owner_id: i64,
    #[serde(rename = "type")]
    pub booking_type: BookingType,
    pub status: BookingStatus,
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

/// Booking audit trail entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingEvent {
    pub id: i64,
    pub booking_id: i64,
    #[serde(default)]
    pub actor_user_id: Option<i64>,
    pub action: String,
    #[serde(default)]
    pub from_status: Option<BookingStatus>,
    #[serde(default)]
    pub to_status: Option<BookingStatus>,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Paged booking list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingList {
    pub items: Vec<Booking>,
    pub limit: u32,
    pub offset: u32,
}

/// Current and upcoming bookings of an item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingByItem {
    pub item_id: i64,
    pub is_in_use: bool,
    #[serde(default)]
    pub current_booking: Option<Booking>,
    #[serde(default)]
    pub upcoming: Vec<Booking>,
}

/// Create booking request; dates only for rentals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateBookingRequest {
    #[serde(rename = "type")]
    pub booking_type: BookingType,
    /// YYYY-MM-DD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<String>,
    /// YYYY-MM-DD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_at: Option<String>,
}

/// Filters for "my bookings" lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookingListParams {
    pub statuses: Vec<BookingStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Filters for incoming booking requests on my items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookingRequestsParams {
    pub types: Vec<BookingType>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Closed calendar-day interval, both ends YYYY-MM-DD
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRange {
    pub start: String,
    pub end: String,
}

/// Busy intervals of an item within a window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Availability {
    pub item_id: i64,
    pub from: String,
    pub to: String,
    pub timezone: String,
    pub is_in_use_now: bool,
    #[serde(default)]
    pub busy: Vec<DayRange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_decodes_type_and_status() {
        let booking: Booking = serde_json::from_str(
            r#"{"id":1,"item_id":2,"requester_id":3,"owner_id":4,"type":"rent",
                "status":"handover_pending","start":"2025-01-10T00:00:00Z",
                "end":"2025-01-12T00:00:00Z","created_at":"2025-01-01T08:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(booking.booking_type, BookingType::Rent);
        assert_eq!(booking.status, BookingStatus::HandoverPending);
        assert!(booking.start.is_some());
        assert!(booking.handover_deadline.is_none());
    }

    #[test]
    fn test_unknown_status_does_not_fail() {
        let status: BookingStatus = serde_json::from_str("\"disputed\"").unwrap();
        assert_eq!(status, BookingStatus::Unknown);
        assert!(!status.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_create_request_omits_dates_for_buy() {
        let req = CreateBookingRequest {
            booking_type: BookingType::Buy,
            start_at: None,
            end_at: None,
        };
        assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"type":"buy"}"#);
    }
}
