//! 预订日期的本地预校验
//!
//! 只用于减少注定失败的提交，冲突以后端的校验为准。
//! 日期都是定宽 ISO `YYYY-MM-DD` 字符串，字典序与日期顺序一致，可以直接比较。

use chrono::{Duration, NaiveDate};
use thiserror::Error;

use crate::models::booking::{BookingType, CreateBookingRequest, DayRange};
use crate::models::item::DealMode;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// 预订表单拉取可用性的窗口长度（天）
pub const LOOKAHEAD_DAYS: i64 = 31;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("start and end dates are required")]
    Missing,

    #[error("'{0}' is not a YYYY-MM-DD date")]
    InvalidDate(String),

    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: String, end: String },

    #[error("range overlaps busy dates {}..{}", .0.start, .0.end)]
    Overlaps(DayRange),
}

/// 两个闭区间是否相交
pub fn overlaps(a_start: &str, a_end: &str, b_start: &str, b_end: &str) -> bool {
    !(a_end < b_start || b_end < a_start)
}

/// 是否为定宽 ISO 日历日期
pub fn is_iso_date(s: &str) -> bool {
    s.len() == 10 && NaiveDate::parse_from_str(s, DATE_FORMAT).is_ok()
}

/// 校验 `[start, end]` 是否可以提交
pub fn validate_range(start: &str, end: &str, busy: &[DayRange]) -> Result<(), RangeError> {
    if start.is_empty() || end.is_empty() {
        return Err(RangeError::Missing);
    }
    for date in [start, end] {
        if !is_iso_date(date) {
            return Err(RangeError::InvalidDate(date.to_string()));
        }
    }
    if end < start {
        return Err(RangeError::EndBeforeStart {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    if let Some(conflict) = busy.iter().find(|b| overlaps(start, end, &b.start, &b.end)) {
        return Err(RangeError::Overlaps(conflict.clone()));
    }
    Ok(())
}

pub fn is_range_valid(start: &str, end: &str, busy: &[DayRange]) -> bool {
    validate_range(start, end, busy).is_ok()
}

/// 从 `today` 起向后 [`LOOKAHEAD_DAYS`] 天的窗口
pub fn lookahead_window(today: NaiveDate) -> (String, String) {
    let to = today + Duration::days(LOOKAHEAD_DAYS);
    (
        today.format(DATE_FORMAT).to_string(),
        to.format(DATE_FORMAT).to_string(),
    )
}

/// 按物品的交易方式生成预订请求
///
/// 出租类（rent / sale_rent）需要合法日期区间；出售为 buy，赠送为 give，两者不带日期。
pub fn booking_request_for(
    mode: DealMode,
    start: &str,
    end: &str,
    busy: &[DayRange],
) -> Result<CreateBookingRequest, RangeError> {
    match mode {
        DealMode::Rent | DealMode::SaleRent => {
            validate_range(start, end, busy)?;
            Ok(CreateBookingRequest {
                booking_type: BookingType::Rent,
                start_at: Some(start.to_string()),
                end_at: Some(end.to_string()),
            })
        }
        DealMode::Sale => Ok(CreateBookingRequest {
            booking_type: BookingType::Buy,
            start_at: None,
            end_at: None,
        }),
        DealMode::Free => Ok(CreateBookingRequest {
            booking_type: BookingType::Give,
            start_at: None,
            end_at: None,
        }),
    }
}
