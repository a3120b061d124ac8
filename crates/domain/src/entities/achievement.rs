//! Achievement entity - A completable task or milestone
//!
//! An achievement owns its outgoing prerequisite edges and its goal references.
//! It does not know whether those references are valid or acyclic; the
//! achievement graph in the engine crate is the only place that can check that,
//! and it never hands out `&mut Achievement`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::events::AchievementUpdate;
use crate::value_objects::AchievementTitle;
use crate::{AchievementId, GoalId};

/// Description and cover metadata shown on an achievement card.
///
/// This is a display DTO with no invariants - uses public fields per ADR-008.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementView {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
}

/// Display payload passed through the engine untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDetails {
    #[serde(default)]
    pub xp: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_background: Option<String>,
    #[serde(default)]
    pub view: AchievementView,
}

/// Input for inserting a new achievement
#[derive(Debug, Clone, PartialEq)]
pub struct AchievementDraft {
    pub title: AchievementTitle,
    pub is_task: bool,
    pub details: AchievementDetails,
    pub prerequisite_ids: BTreeSet<AchievementId>,
    pub goal_ids: BTreeSet<GoalId>,
}

impl AchievementDraft {
    pub fn new(title: AchievementTitle) -> Self {
        Self {
            title,
            is_task: false,
            details: AchievementDetails::default(),
            prerequisite_ids: BTreeSet::new(),
            goal_ids: BTreeSet::new(),
        }
    }

    pub fn task(mut self) -> Self {
        self.is_task = true;
        self
    }

    pub fn with_details(mut self, details: AchievementDetails) -> Self {
        self.details = details;
        self
    }

    pub fn with_prerequisites(mut self, ids: impl IntoIterator<Item = AchievementId>) -> Self {
        self.prerequisite_ids.extend(ids);
        self
    }

    pub fn with_goals(mut self, ids: impl IntoIterator<Item = GoalId>) -> Self {
        self.goal_ids.extend(ids);
        self
    }
}

/// A completable task or milestone
///
/// # Invariants (held by the owning graph, not by this type)
///
/// - `is_task` is true exactly when `position` is `Some`
/// - `prerequisite_ids` never contains `id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    id: AchievementId,
    title: AchievementTitle,
    is_task: bool,
    #[serde(default)]
    position: Option<u32>,
    #[serde(default)]
    prerequisite_ids: BTreeSet<AchievementId>,
    #[serde(default)]
    goal_ids: BTreeSet<GoalId>,
    #[serde(flatten)]
    details: AchievementDetails,
}

impl Achievement {
    /// Build an achievement from a draft. `position` must be `Some` for tasks.
    pub fn from_draft(id: AchievementId, draft: AchievementDraft, position: Option<u32>) -> Self {
        Self {
            id,
            title: draft.title,
            is_task: draft.is_task,
            position,
            prerequisite_ids: draft.prerequisite_ids,
            goal_ids: draft.goal_ids,
            details: draft.details,
        }
    }

    // Read accessors
    pub fn id(&self) -> AchievementId {
        self.id
    }

    pub fn title(&self) -> &AchievementTitle {
        &self.title
    }

    pub fn is_task(&self) -> bool {
        self.is_task
    }

    pub fn position(&self) -> Option<u32> {
        self.position
    }

    pub fn prerequisite_ids(&self) -> &BTreeSet<AchievementId> {
        &self.prerequisite_ids
    }

    pub fn goal_ids(&self) -> &BTreeSet<GoalId> {
        &self.goal_ids
    }

    pub fn details(&self) -> &AchievementDetails {
        &self.details
    }

    pub fn xp(&self) -> u32 {
        self.details.xp
    }

    pub fn has_prerequisite(&self, id: &AchievementId) -> bool {
        self.prerequisite_ids.contains(id)
    }

    pub fn has_goal(&self, id: &GoalId) -> bool {
        self.goal_ids.contains(id)
    }

    // Mutations

    pub fn set_title(&mut self, title: AchievementTitle) -> AchievementUpdate {
        let from = std::mem::replace(&mut self.title, title);
        AchievementUpdate::TitleChanged {
            from,
            to: self.title.clone(),
        }
    }

    /// Set task membership and position together so they cannot disagree.
    pub fn set_task_position(&mut self, position: Option<u32>) -> AchievementUpdate {
        let from = self.position;
        self.is_task = position.is_some();
        self.position = position;
        AchievementUpdate::PositionChanged { from, to: position }
    }

    pub fn set_details(&mut self, details: AchievementDetails) -> AchievementUpdate {
        self.details = details;
        AchievementUpdate::DetailsChanged
    }

    pub fn add_prerequisite(&mut self, prerequisite_id: AchievementId) -> AchievementUpdate {
        if self.prerequisite_ids.insert(prerequisite_id) {
            AchievementUpdate::PrerequisiteAdded { prerequisite_id }
        } else {
            AchievementUpdate::PrerequisiteAlreadyPresent { prerequisite_id }
        }
    }

    pub fn remove_prerequisite(&mut self, prerequisite_id: &AchievementId) -> AchievementUpdate {
        if self.prerequisite_ids.remove(prerequisite_id) {
            AchievementUpdate::PrerequisiteRemoved {
                prerequisite_id: *prerequisite_id,
            }
        } else {
            AchievementUpdate::PrerequisiteNotPresent {
                prerequisite_id: *prerequisite_id,
            }
        }
    }

    pub fn attach_goal(&mut self, goal_id: GoalId) -> AchievementUpdate {
        if self.goal_ids.insert(goal_id) {
            AchievementUpdate::GoalAttached { goal_id }
        } else {
            AchievementUpdate::GoalAlreadyAttached { goal_id }
        }
    }

    pub fn detach_goal(&mut self, goal_id: &GoalId) -> AchievementUpdate {
        if self.goal_ids.remove(goal_id) {
            AchievementUpdate::GoalDetached { goal_id: *goal_id }
        } else {
            AchievementUpdate::GoalNotAttached { goal_id: *goal_id }
        }
    }
}
