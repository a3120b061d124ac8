//! Validated name newtypes for achievements and goals
//!
//! These newtypes ensure that lookup keys are valid by construction:
//! - Non-empty
//! - Within length limits
//! - Trimmed of leading/trailing whitespace
//!
//! Titles and goal texts double as secondary lookup keys, so trimming matters:
//! `" Explorer"` and `"Explorer"` must resolve to the same entry.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Hard upper bound for achievement titles
pub const MAX_TITLE_LENGTH: usize = 200;

/// Hard upper bound for goal text
pub const MAX_GOAL_TEXT_LENGTH: usize = 500;

fn validated(
    raw: String,
    what: &'static str,
    max: usize,
) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{} cannot be empty", what)));
    }
    if trimmed.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{} cannot exceed {} characters",
            what, max
        )));
    }
    Ok(trimmed.to_string())
}

// ============================================================================
// AchievementTitle
// ============================================================================

/// A validated achievement title (non-empty, <=200 chars, trimmed)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AchievementTitle(String);

impl AchievementTitle {
    /// Create a new validated achievement title.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if:
    /// - The title is empty after trimming
    /// - The title exceeds 200 characters after trimming
    pub fn new(title: impl Into<String>) -> Result<Self, DomainError> {
        validated(title.into(), "Achievement title", MAX_TITLE_LENGTH).map(Self)
    }

    /// Returns the title as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters, used for settings-based limits.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for AchievementTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for AchievementTitle {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<AchievementTitle> for String {
    fn from(title: AchievementTitle) -> String {
        title.0
    }
}

// ============================================================================
// GoalText
// ============================================================================

/// A validated goal description (non-empty, <=500 chars, trimmed)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GoalText(String);

impl GoalText {
    /// Create a new validated goal text.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the text is empty after trimming
    /// or exceeds 500 characters.
    pub fn new(text: impl Into<String>) -> Result<Self, DomainError> {
        validated(text.into(), "Goal text", MAX_GOAL_TEXT_LENGTH).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for GoalText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for GoalText {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<GoalText> for String {
    fn from(text: GoalText) -> String {
        text.0
    }
}
