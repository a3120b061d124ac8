//! Domain entities - Core business objects with identity

mod achievement;
mod goal;

pub use achievement::{Achievement, AchievementDetails, AchievementDraft, AchievementView};
pub use goal::{
    AggregateMeasure, AggregateTotals, Goal, GoalDraft, GoalMeta, GoalSignal, ProgressUpdate,
};
