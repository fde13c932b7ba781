//! Normalisation of guest-supplied stay dates.
//!
//! Accepts ISO calendar dates and the month-name forms guests and language
//! models tend to produce (`Jan 22`, `22nd of January 2026`). A missing year
//! falls back to the configured default year; anything else is rejected
//! instead of being guessed.

use chrono::NaiveDate;

use crate::errors::EngineError;

const MONTHS: &[(&str, u32)] = &[
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

const FILLER_WORDS: &[&str] = &["of", "the"];

pub fn parse_stay_date(input: &str, default_year: i32) -> Result<NaiveDate, EngineError> {
    let trimmed = input.trim();
    let unparseable = || EngineError::UnparseableDate(trimmed.to_string());

    if trimmed.is_empty() {
        return Err(unparseable());
    }

    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }

    let normalized = trimmed.to_ascii_lowercase().replace([',', '.'], " ");
    let mut month = None;
    let mut day = None;
    let mut year = None;

    for token in normalized.split_whitespace() {
        if FILLER_WORDS.contains(&token) {
            continue;
        }

        if let Some(number) = numeric_token(token) {
            let is_year = token.len() == 4 && token.bytes().all(|byte| byte.is_ascii_digit());
            if is_year && year.is_none() {
                year = Some(number);
            } else if token.len() <= 4 && day.is_none() && (1..=31).contains(&number) {
                day = Some(number);
            } else {
                return Err(unparseable());
            }
            continue;
        }

        match month_token(token) {
            Some(value) if month.is_none() => month = Some(value),
            _ => return Err(unparseable()),
        }
    }

    let (Some(month), Some(day)) = (month, day) else {
        return Err(unparseable());
    };
    let year = match year {
        Some(value) => i32::try_from(value).map_err(|_| unparseable())?,
        None => default_year,
    };
    let day = u32::try_from(day).map_err(|_| unparseable())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(unparseable)
}

/// Parses `22`, `22nd`, `1st`, `2026`; ordinal suffixes only follow a day.
fn numeric_token(token: &str) -> Option<i64> {
    let digits_end = token.find(|ch: char| !ch.is_ascii_digit()).unwrap_or(token.len());
    if digits_end == 0 {
        return None;
    }

    let (digits, suffix) = token.split_at(digits_end);
    if !suffix.is_empty() && !matches!(suffix, "st" | "nd" | "rd" | "th") {
        return None;
    }
    if !suffix.is_empty() && digits.len() > 2 {
        return None;
    }
    digits.parse().ok()
}

fn month_token(token: &str) -> Option<u32> {
    if token.len() < 3 {
        return None;
    }
    MONTHS.iter().find(|(name, _)| name.starts_with(token)).map(|(_, number)| *number)
}
