//! Achievement mutation outcomes.

use crate::value_objects::AchievementTitle;
use crate::{AchievementId, GoalId};

/// Outcome of updating achievement fields or edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AchievementUpdate {
    TitleChanged {
        from: AchievementTitle,
        to: AchievementTitle,
    },
    PositionChanged {
        from: Option<u32>,
        to: Option<u32>,
    },
    DetailsChanged,
    PrerequisiteAdded { prerequisite_id: AchievementId },
    PrerequisiteAlreadyPresent { prerequisite_id: AchievementId },
    PrerequisiteRemoved { prerequisite_id: AchievementId },
    PrerequisiteNotPresent { prerequisite_id: AchievementId },
    GoalAttached { goal_id: GoalId },
    GoalAlreadyAttached { goal_id: GoalId },
    GoalDetached { goal_id: GoalId },
    GoalNotAttached { goal_id: GoalId },
}

impl AchievementUpdate {
    /// Whether the update changed anything that feeds derived state.
    pub fn affects_derived_state(&self) -> bool {
        matches!(
            self,
            Self::PrerequisiteAdded { .. }
                | Self::PrerequisiteRemoved { .. }
                | Self::GoalAttached { .. }
                | Self::GoalDetached { .. }
        )
    }
}
