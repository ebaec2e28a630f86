use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const MAX_NAME_CHARS: usize = 60;
pub const MAX_MESSAGE_CHARS: usize = 1000;
pub const MIN_HANDLE_DIGITS: usize = 10;
pub const MAX_HANDLE_DIGITS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(String);

impl ProposalId {
    /// Built-in demonstration record; never persisted.
    pub const DEMO: &'static str = "demo";
    /// Assigned to every record decoded from a shared token.
    pub const SHARED: &'static str = "shared";

    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn demo() -> Self {
        Self(Self::DEMO.to_string())
    }

    pub fn shared() -> Self {
        Self(Self::SHARED.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the reserved sentinel ids that never refer to a stored row.
    pub fn is_sentinel(&self) -> bool {
        self.0 == Self::DEMO || self.0 == Self::SHARED
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Romantic,
}

impl Theme {
    pub const ALL: [Theme; 1] = [Theme::Romantic];

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Romantic => "romantic",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown theme '{0}'")]
pub struct UnknownTheme(pub String);

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|theme| theme.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTheme(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("sender name must not be empty")]
    EmptySenderName,
    #[error("recipient name must not be empty")]
    EmptyRecipientName,
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("{field} exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("contact handle must contain 10 to 15 digits including the country code, got {digits}")]
    ContactHandle { digits: usize },
}

/// The five fields carried by a share token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalContent {
    pub sender_name: String,
    pub recipient_name: String,
    pub contact_handle: String,
    pub message: String,
    pub theme: Theme,
}

impl ProposalContent {
    /// Checks already-normalized content, e.g. content decoded from a token.
    pub fn check(&self) -> Result<(), ValidationError> {
        check_text(
            &self.sender_name,
            "sender name",
            MAX_NAME_CHARS,
            ValidationError::EmptySenderName,
        )?;
        check_text(
            &self.recipient_name,
            "recipient name",
            MAX_NAME_CHARS,
            ValidationError::EmptyRecipientName,
        )?;
        check_text(
            &self.message,
            "message",
            MAX_MESSAGE_CHARS,
            ValidationError::EmptyMessage,
        )?;
        let digits = count_digits(&self.contact_handle);
        if !(MIN_HANDLE_DIGITS..=MAX_HANDLE_DIGITS).contains(&digits) {
            return Err(ValidationError::ContactHandle { digits });
        }
        Ok(())
    }
}

/// Author input as submitted by a form or CLI; nothing here is trusted yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProposal {
    pub sender_name: String,
    pub recipient_name: String,
    pub contact_handle: String,
    pub message: String,
    #[serde(default)]
    pub theme: Option<Theme>,
}

impl NewProposal {
    pub fn validate(self) -> Result<ProposalContent, ValidationError> {
        let content = ProposalContent {
            sender_name: self.sender_name.trim().to_string(),
            recipient_name: self.recipient_name.trim().to_string(),
            contact_handle: normalize_contact_handle(&self.contact_handle)?,
            message: self.message.trim().to_string(),
            theme: self.theme.unwrap_or_default(),
        };
        content.check()?;
        Ok(content)
    }
}

/// Strips everything but digits and returns `+<digits>`.
pub fn normalize_contact_handle(raw: &str) -> Result<String, ValidationError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if !(MIN_HANDLE_DIGITS..=MAX_HANDLE_DIGITS).contains(&digits.len()) {
        return Err(ValidationError::ContactHandle {
            digits: digits.len(),
        });
    }
    Ok(format!("+{digits}"))
}

/// Digits of a handle without the `+` or any separators.
pub fn handle_digits(handle: &str) -> String {
    handle.chars().filter(char::is_ascii_digit).collect()
}

fn count_digits(raw: &str) -> usize {
    raw.chars().filter(char::is_ascii_digit).count()
}

fn check_text(
    value: &str,
    field: &'static str,
    max: usize,
    empty: ValidationError,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(empty);
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Immutable once built: fields are private and there are no setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRecord {
    id: ProposalId,
    #[serde(flatten)]
    content: ProposalContent,
    created_at: DateTime<Utc>,
}

impl ProposalRecord {
    pub fn new(id: ProposalId, content: ProposalContent, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            content,
            created_at,
        }
    }

    pub fn id(&self) -> &ProposalId {
        &self.id
    }

    pub fn content(&self) -> &ProposalContent {
        &self.content
    }

    pub fn sender_name(&self) -> &str {
        &self.content.sender_name
    }

    pub fn recipient_name(&self) -> &str {
        &self.content.recipient_name
    }

    pub fn contact_handle(&self) -> &str {
        &self.content.contact_handle
    }

    pub fn message(&self) -> &str {
        &self.content.message
    }

    pub fn theme(&self) -> Theme {
        self.content.theme
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn into_content(self) -> ProposalContent {
        self.content
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
