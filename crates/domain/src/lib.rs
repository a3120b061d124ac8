//! Questline domain: achievements, goals, and the vocabulary shared with the engine.

extern crate self as questline_domain;

pub mod entities;
pub mod error;
pub mod events;
pub mod ids;
pub mod types;
pub mod value_objects;

pub use entities::{
    Achievement, AchievementDetails, AchievementDraft, AchievementView, AggregateMeasure,
    AggregateTotals, Goal, GoalDraft, GoalMeta, GoalSignal, ProgressUpdate,
};

pub use error::{DomainError, Violation};
pub use events::{AchievementUpdate, GoalUpdate};

pub use ids::{AchievementId, GoalId};

pub use types::{AchievementStatus, DerivedState};

pub use value_objects::{
    AchievementTitle, EngineSettings, GoalText, MAX_GOAL_TEXT_LENGTH, MAX_TITLE_LENGTH,
};
