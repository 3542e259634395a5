use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::records::{CleanedRecord, RawRecord};

// Month-first before day-first for slashed dates; day-first only wins when
// the month-first reading is impossible.
const DATE_FORMATS: [&str; 12] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Canonical column name: BOM dropped, trimmed, lowercased.
pub fn normalize_header(name: &str) -> String {
    name.trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// Keeps only digits, `.` and `-`. Returns `None` when nothing is left.
pub fn strip_numeric(raw: &str) -> Option<String> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if kept.is_empty() { None } else { Some(kept) }
}

/// Price as a non-negative decimal. Negative prices are treated as unparseable.
pub fn clean_price(raw: &str) -> Option<Decimal> {
    let digits = strip_numeric(raw)?;
    let price = Decimal::from_str(&digits).ok()?;
    if price.is_sign_negative() && !price.is_zero() {
        return None;
    }
    Some(price)
}

/// Quantity as a whole number. "4.0" is accepted, "4.5" is not.
pub fn clean_quantity(raw: &str) -> Option<i64> {
    let digits = strip_numeric(raw)?;
    if let Ok(q) = digits.parse::<i64>() {
        return Some(q);
    }
    let value = Decimal::from_str(&digits).ok()?;
    if !value.fract().is_zero() {
        return None;
    }
    value.to_i64()
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Coerces price, quantity and date, and derives `sales` when both numbers are present.
pub fn clean_record(raw: RawRecord) -> CleanedRecord {
    let price = clean_price(&raw.price);
    let quantity = clean_quantity(&raw.quantity);
    let date = parse_date(&raw.date);
    let sales = match (price, quantity) {
        (Some(p), Some(q)) => p.checked_mul(Decimal::from(q)),
        _ => None,
    };

    CleanedRecord {
        raw,
        price,
        quantity,
        date,
        sales,
    }
}
