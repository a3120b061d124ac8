//! Value objects - Immutable objects defined by their attributes

mod names;
mod settings;

pub use names::{AchievementTitle, GoalText, MAX_GOAL_TEXT_LENGTH, MAX_TITLE_LENGTH};
pub use settings::EngineSettings;
