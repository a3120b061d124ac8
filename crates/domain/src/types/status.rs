use serde::{Deserialize, Serialize};

/// Completion status of an achievement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AchievementStatus {
    /// At least one direct prerequisite is not completed
    Locked,
    /// Unlocked, but not every attached goal is complete
    InProgress,
    /// Unlocked and every attached goal is complete
    Completed,
}

impl AchievementStatus {
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn is_unlocked(self) -> bool {
        !matches!(self, Self::Locked)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::InProgress => "inProgress",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for AchievementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cached derived pair for one achievement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedState {
    pub status: AchievementStatus,
    pub xp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_camel_case() {
        let json = serde_json::to_string(&AchievementStatus::InProgress).unwrap();
        assert_eq!(json, "\"inProgress\"");
        assert_eq!(AchievementStatus::InProgress.to_string(), "inProgress");
    }

    #[test]
    fn unlocked_covers_in_progress_and_completed() {
        assert!(!AchievementStatus::Locked.is_unlocked());
        assert!(AchievementStatus::InProgress.is_unlocked());
        assert!(AchievementStatus::Completed.is_unlocked());
        assert!(AchievementStatus::Completed.is_completed());
    }
}
