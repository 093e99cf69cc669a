use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::error::AppError;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex")
});
static KENYAN_PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0[17]\d{8}$").expect("valid phone regex"));
static KRA_PIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[AP]\d{9}[A-Z]$").expect("valid pin regex"));
static CARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{16}$").expect("valid card regex"));
static CVV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3,4}$").expect("valid cvv regex"));
static EXPIRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(0[1-9]|1[0-2])/(\d{2})$").expect("valid expiry regex")
});

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// Normalize `+2547...`/`2547...`/`07...` to the local `07XXXXXXXX` form.
pub fn normalize_kenyan_phone(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    let local = if let Some(rest) = compact.strip_prefix("+254") {
        format!("0{rest}")
    } else if let Some(rest) = compact.strip_prefix("254") {
        format!("0{rest}")
    } else {
        compact
    };
    KENYAN_PHONE_RE.is_match(&local).then_some(local)
}

pub fn is_valid_kra_pin(pin: &str) -> bool {
    KRA_PIN_RE.is_match(pin.trim())
}

/// Strip spaces and dashes and require exactly 16 digits.
pub fn normalize_card_number(raw: &str) -> Option<String> {
    let digits: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    CARD_RE.is_match(&digits).then_some(digits)
}

pub fn card_brand(card_number: &str) -> &'static str {
    match card_number.chars().next() {
        Some('4') => "visa",
        Some('5') => "mastercard",
        Some('3') => "amex",
        _ => "unknown",
    }
}

pub fn is_valid_cvv(cvv: &str) -> bool {
    CVV_RE.is_match(cvv.trim())
}

/// `MM/YY`; a card is valid through the last day of its expiry month.
pub fn is_unexpired_card(expiry: &str, today: NaiveDate) -> bool {
    let Some(caps) = EXPIRY_RE.captures(expiry.trim()) else {
        return false;
    };
    let (Ok(month), Ok(year)) = (caps[1].parse::<u32>(), caps[2].parse::<i32>()) else {
        return false;
    };
    let year = 2000 + year;
    (year, month) >= (today.year(), today.month())
}

pub fn require_non_empty(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::bad_request(format!("{field} is required")));
    }
    Ok(())
}

pub fn require_password(password: &str, field: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "{field} must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
