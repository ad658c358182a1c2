use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LoanError, Result};
use crate::types::BorrowerId;

/// borrower record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Borrower {
    pub id: BorrowerId,
    pub full_name: String,
    /// digits only, with a leading `+` when one was given
    pub phone: String,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// borrower details as entered on the dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BorrowerProfile {
    pub full_name: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BorrowerProfile {
    pub fn new(full_name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            phone: phone.into(),
            address: None,
            notes: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl Borrower {
    pub fn register(profile: BorrowerProfile, created_at: DateTime<Utc>) -> Result<Self> {
        let (full_name, phone) = validate_profile(&profile)?;
        Ok(Self {
            id: Uuid::new_v4(),
            full_name,
            phone,
            address: non_blank(profile.address),
            notes: non_blank(profile.notes),
            created_at,
        })
    }

    /// replace the editable fields, keeping id and creation date
    pub fn update(&mut self, profile: BorrowerProfile) -> Result<()> {
        let (full_name, phone) = validate_profile(&profile)?;
        self.full_name = full_name;
        self.phone = phone;
        self.address = non_blank(profile.address);
        self.notes = non_blank(profile.notes);
        Ok(())
    }

    /// whether `phone` refers to this borrower, ignoring formatting
    pub fn phone_matches(&self, phone: &str) -> bool {
        normalize_phone(phone).is_some_and(|p| p.trim_start_matches('+') == self.phone.trim_start_matches('+'))
    }
}

fn validate_profile(profile: &BorrowerProfile) -> Result<(String, String)> {
    let full_name = profile.full_name.split_whitespace().collect::<Vec<_>>().join(" ");
    if full_name.is_empty() {
        return Err(LoanError::validation("full_name", "must not be empty"));
    }

    let phone = normalize_phone(&profile.phone)
        .ok_or_else(|| LoanError::validation("phone", "must contain 7 to 15 digits"))?;

    Ok((full_name, phone))
}

/// Strip spaces, dashes, dots and parentheses. Returns `None` when anything
/// else is left or the digit count is outside 7..=15.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let (plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let mut digits = String::with_capacity(rest.len() + 1);
    if plus {
        digits.push('+');
    }
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return None,
        }
    }

    let count = digits.trim_start_matches('+').len();
    (7..=15).contains(&count).then_some(digits)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
