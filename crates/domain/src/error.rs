//! Unified error types for the domain layer
//!
//! Every engine operation reports failure through [`DomainError`]. Structural
//! operations validate first and commit second, so an `Err` always means the
//! state is exactly what it was before the call.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{AchievementId, GoalId};

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Invalid ID format
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Entity not found
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// An id is already registered
    #[error("Duplicate id: {entity_type} {id} already exists")]
    DuplicateId {
        entity_type: &'static str,
        id: String,
    },

    /// A title (or goal text) is already owned by another live entry
    #[error("Duplicate title: {entity_type} titled '{title}' already exists")]
    DuplicateTitle {
        entity_type: &'static str,
        title: String,
    },

    /// An achievement was named as its own prerequisite
    #[error("Achievement {id} cannot be its own prerequisite")]
    SelfReference { id: AchievementId },

    /// Adding the edge would close a dependency cycle
    #[error("Adding prerequisite {prerequisite} to {achievement} would create a cycle")]
    CycleDetected {
        achievement: AchievementId,
        prerequisite: AchievementId,
    },

    /// Position-affecting operation on a non-task achievement
    #[error("Achievement {id} is not a task")]
    NotATask { id: AchievementId },

    /// Operation not supported by the goal's variant
    #[error("Unsupported operation on goal {goal_id}: {reason}")]
    UnsupportedOperation { goal_id: GoalId, reason: String },

    /// Business rule violation
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Bulk load rejected; nothing was applied
    #[error("Invariant violation: {} problem(s) found", .0.len())]
    InvariantViolation(Vec<Violation>),
}

impl DomainError {
    /// Creates a validation error for malformed input values.
    ///
    /// # Example
    /// ```ignore
    /// if text.trim().is_empty() {
    ///     return Err(DomainError::validation("Goal text cannot be empty"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an invalid ID error
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Create a duplicate id error
    pub fn duplicate_id(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::DuplicateId {
            entity_type,
            id: id.into(),
        }
    }

    /// Create a duplicate title error
    pub fn duplicate_title(entity_type: &'static str, title: impl Into<String>) -> Self {
        Self::DuplicateTitle {
            entity_type,
            title: title.into(),
        }
    }

    pub fn self_reference(id: AchievementId) -> Self {
        Self::SelfReference { id }
    }

    pub fn cycle_detected(achievement: AchievementId, prerequisite: AchievementId) -> Self {
        Self::CycleDetected {
            achievement,
            prerequisite,
        }
    }

    pub fn not_a_task(id: AchievementId) -> Self {
        Self::NotATask { id }
    }

    /// Create an unsupported operation error for a goal variant
    pub fn unsupported(goal_id: GoalId, reason: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            goal_id,
            reason: reason.into(),
        }
    }

    /// Create a constraint violation error
    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::Constraint(msg.into())
    }

    /// Returns the violations carried by a rejected bulk load, if any.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::InvariantViolation(violations) => violations,
            _ => &[],
        }
    }
}

/// A single problem found while validating a bulk snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Violation {
    /// Two achievement records share an id
    #[serde(rename_all = "camelCase")]
    DuplicateAchievementId { achievement_id: AchievementId },
    /// Two goal records share an id
    #[serde(rename_all = "camelCase")]
    DuplicateGoalId { goal_id: GoalId },
    /// Two achievements share a title
    #[serde(rename_all = "camelCase")]
    DuplicateTitle {
        title: String,
        achievement_ids: Vec<AchievementId>,
    },
    /// Two goals share a text
    #[serde(rename_all = "camelCase")]
    DuplicateGoalText { text: String, goal_ids: Vec<GoalId> },
    #[serde(rename_all = "camelCase")]
    SelfReference { achievement_id: AchievementId },
    #[serde(rename_all = "camelCase")]
    DanglingPrerequisite {
        achievement_id: AchievementId,
        prerequisite_id: AchievementId,
    },
    #[serde(rename_all = "camelCase")]
    DanglingGoal {
        achievement_id: AchievementId,
        goal_id: GoalId,
    },
    /// Achievements taking part in at least one prerequisite cycle
    #[serde(rename_all = "camelCase")]
    Cycle { achievement_ids: Vec<AchievementId> },
    /// A goal record whose meta is malformed
    #[serde(rename_all = "camelCase")]
    InvalidGoal { goal_id: GoalId, reason: String },
    /// A task without a position, or a non-task carrying one
    #[serde(rename_all = "camelCase")]
    TaskFlagMismatch { achievement_id: AchievementId },
    /// Task positions are not exactly `0..task_count`
    #[serde(rename_all = "camelCase")]
    PositionGap {
        expected: Vec<u32>,
        found: Vec<u32>,
    },
    /// An achievement record fails a configured limit
    #[serde(rename_all = "camelCase")]
    LimitExceeded {
        achievement_id: AchievementId,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = DomainError::validation("title cannot be empty");
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(err.to_string(), "Validation failed: title cannot be empty");
    }

    #[test]
    fn test_not_found_error() {
        let err = DomainError::not_found("Achievement", "123e4567-e89b-12d3-a456-426614174000");
        assert!(matches!(err, DomainError::NotFound { .. }));
        assert!(err.to_string().contains("Achievement"));
        assert!(err.to_string().contains("123e4567"));
    }

    #[test]
    fn test_duplicate_title_error() {
        let err = DomainError::duplicate_title("Achievement", "First Steps");
        assert_eq!(
            err.to_string(),
            "Duplicate title: Achievement titled 'First Steps' already exists"
        );
    }

    #[test]
    fn test_cycle_error_names_both_ends() {
        let a = AchievementId::new();
        let b = AchievementId::new();
        let err = DomainError::cycle_detected(a, b);
        let msg = err.to_string();
        assert!(msg.contains(&a.to_string()));
        assert!(msg.contains(&b.to_string()));
    }

    #[test]
    fn test_invariant_violation_counts_problems() {
        let a = AchievementId::new();
        let err = DomainError::InvariantViolation(vec![
            Violation::SelfReference { achievement_id: a },
            Violation::TaskFlagMismatch { achievement_id: a },
        ]);
        assert_eq!(err.to_string(), "Invariant violation: 2 problem(s) found");
        assert_eq!(err.violations().len(), 2);
        assert!(DomainError::constraint("x").violations().is_empty());
    }

    #[test]
    fn test_violation_serializes_with_kind_tag() {
        let a = AchievementId::new();
        let json = serde_json::to_value(Violation::SelfReference { achievement_id: a }).unwrap();
        assert_eq!(json["kind"], "selfReference");
        assert_eq!(json["achievementId"], a.to_string());
    }
}
