//! Goal mutation outcomes.

use crate::value_objects::GoalText;

/// Outcome of updating a goal.
#[derive(Debug, Clone, PartialEq)]
pub enum GoalUpdate {
    TextChanged { from: GoalText, to: GoalText },
    MetaReplaced {
        from: &'static str,
        to: &'static str,
    },
    ProgressChanged { from: f64, to: f64 },
    ProgressUnchanged,
}

impl GoalUpdate {
    pub(crate) fn progress(from: f64, to: f64) -> Self {
        if from == to {
            Self::ProgressUnchanged
        } else {
            Self::ProgressChanged { from, to }
        }
    }

    /// Whether achievements using this goal need their derived state refreshed.
    pub fn affects_derived_state(&self) -> bool {
        matches!(self, Self::ProgressChanged { .. } | Self::MetaReplaced { .. })
    }
}
