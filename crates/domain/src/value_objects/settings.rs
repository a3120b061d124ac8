//! Engine settings value object
//!
//! Settings are plain data so an embedding host can load them from whatever
//! source it already uses (environment, JSON, a settings table). Every field
//! has a serde default, so partial documents are accepted.

use serde::{Deserialize, Serialize};

use super::names::{MAX_GOAL_TEXT_LENGTH, MAX_TITLE_LENGTH};

/// Configurable limits enforced by the achievement graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    // ============================================================================
    // Validation Limits
    // ============================================================================

    /// Maximum achievement title length (capped by the title newtype)
    #[serde(default = "default_max_title_length")]
    pub max_title_length: usize,

    /// Maximum goal text length (capped by the goal text newtype)
    #[serde(default = "default_max_goal_text_length")]
    pub max_goal_text_length: usize,

    // ============================================================================
    // Graph Shape
    // ============================================================================

    /// Maximum direct prerequisites per achievement
    #[serde(default = "default_max_prerequisites")]
    pub max_prerequisites_per_achievement: usize,

    /// Maximum goals attached to one achievement
    #[serde(default = "default_max_goals")]
    pub max_goals_per_achievement: usize,
}

fn default_max_title_length() -> usize { MAX_TITLE_LENGTH }
fn default_max_goal_text_length() -> usize { MAX_GOAL_TEXT_LENGTH }
fn default_max_prerequisites() -> usize { 64 }
fn default_max_goals() -> usize { 32 }

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_title_length: default_max_title_length(),
            max_goal_text_length: default_max_goal_text_length(),
            max_prerequisites_per_achievement: default_max_prerequisites(),
            max_goals_per_achievement: default_max_goals(),
        }
    }
}

impl EngineSettings {
    /// Clamp length limits to the hard caps of the newtypes.
    pub fn normalized(mut self) -> Self {
        self.max_title_length = self.max_title_length.min(MAX_TITLE_LENGTH);
        self.max_goal_text_length = self.max_goal_text_length.min(MAX_GOAL_TEXT_LENGTH);
        self
    }
}
