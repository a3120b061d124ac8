//! Read-only queries over the achievement graph.

use std::collections::BTreeSet;

use questline_domain::{Achievement, AchievementId, DerivedState, DomainError, Goal, GoalId};

use super::AchievementGraph;
use crate::goal_store::GoalStore;

impl AchievementGraph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn task_count(&self) -> usize {
        self.task_order.len()
    }

    pub fn contains(&self, id: &AchievementId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get_achievement(&self, id: &AchievementId) -> Result<&Achievement, DomainError> {
        self.node(id).map(|node| &node.achievement)
    }

    pub fn achievements(&self) -> impl Iterator<Item = &Achievement> {
        self.nodes.values().map(|node| &node.achievement)
    }

    /// Read access to goals. Mutations go through the graph so derived state
    /// stays in sync.
    pub fn goals(&self) -> &GoalStore {
        &self.goals
    }

    pub fn get_goal(&self, id: &GoalId) -> Result<&Goal, DomainError> {
        self.goals.get_goal(id)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn get_id_by_title(&self, title: &str) -> Result<AchievementId, DomainError> {
        self.registry.id_of(title)
    }

    pub fn get_title_by_id(&self, id: &AchievementId) -> Result<&str, DomainError> {
        self.registry.label_of(id)
    }

    pub fn get_goal_id_by_text(&self, text: &str) -> Result<GoalId, DomainError> {
        self.goals.id_by_text(text)
    }

    pub fn get_text_by_goal_id(&self, id: &GoalId) -> Result<&str, DomainError> {
        self.goals.text_by_id(id)
    }

    // =========================================================================
    // Ordering
    // =========================================================================

    /// Task ids sorted by position.
    pub fn list_task_ids_in_order(&self) -> Vec<AchievementId> {
        self.task_order.clone()
    }

    /// Tasks by position, then non-task achievements by title.
    pub fn list_achievements_in_order(&self) -> Vec<&Achievement> {
        let mut milestones: Vec<&Achievement> = self
            .achievements()
            .filter(|a| !a.is_task())
            .collect();
        milestones.sort_by(|a, b| a.title().cmp(b.title()));

        self.task_order
            .iter()
            .filter_map(|id| self.nodes.get(id).map(|node| &node.achievement))
            .chain(milestones)
            .collect()
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Every achievement `id` transitively requires.
    pub fn prerequisite_closure(&self, id: &AchievementId) -> Result<BTreeSet<AchievementId>, DomainError> {
        let start = self.node(id)?;
        let mut closure = BTreeSet::new();
        let mut stack: Vec<AchievementId> = start.achievement.prerequisite_ids().iter().copied().collect();
        while let Some(current) = stack.pop() {
            if !closure.insert(current) {
                continue;
            }
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.achievement.prerequisite_ids().iter().copied());
            }
        }
        Ok(closure)
    }

    /// Every achievement that transitively requires `id`.
    pub fn dependents_of(&self, id: &AchievementId) -> Result<BTreeSet<AchievementId>, DomainError> {
        let start = self.node(id)?;
        let mut found = BTreeSet::new();
        let mut stack: Vec<AchievementId> = start.dependents.iter().copied().collect();
        while let Some(current) = stack.pop() {
            if !found.insert(current) {
                continue;
            }
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.dependents.iter().copied());
            }
        }
        Ok(found)
    }

    /// Achievements that may become a prerequisite of `id` right now.
    ///
    /// Excludes `id` itself, its current prerequisites, and everything that
    /// depends on it (making one of those a prerequisite would close a cycle).
    /// Empty while `id` is at its prerequisite limit.
    pub fn list_available_prerequisite_ids(
        &self,
        id: &AchievementId,
    ) -> Result<BTreeSet<AchievementId>, DomainError> {
        let node = self.node(id)?;
        let current: &BTreeSet<AchievementId> = node.achievement.prerequisite_ids();
        if current.len() >= self.settings.max_prerequisites_per_achievement {
            return Ok(BTreeSet::new());
        }
        let descendants = self.dependents_of(id)?;

        Ok(self
            .nodes
            .keys()
            .filter(|candidate| {
                *candidate != id
                    && !current.contains(*candidate)
                    && !descendants.contains(*candidate)
            })
            .copied()
            .collect())
    }

    // =========================================================================
    // Derived
    // =========================================================================

    pub fn is_unlocked(&mut self, id: &AchievementId) -> Result<bool, DomainError> {
        Ok(self.status_of(id)?.is_unlocked())
    }

    /// Derived state for every achievement, in display order.
    pub fn derived_states(&mut self) -> Result<Vec<(AchievementId, DerivedState)>, DomainError> {
        let order: Vec<AchievementId> = self
            .list_achievements_in_order()
            .into_iter()
            .map(Achievement::id)
            .collect();
        order
            .into_iter()
            .map(|id| self.derived_state(&id).map(|state| (id, state)))
            .collect()
    }

    /// Earned XP across all goals, counting shared goals once.
    pub fn total_earned_xp(&mut self) -> u64 {
        self.refresh_aggregates();
        self.goals.goals().map(|goal| u64::from(goal.earned_xp())).sum()
    }

    /// Achievements with no goals and no edges in either direction.
    pub fn isolated_ids(&self) -> BTreeSet<AchievementId> {
        self.nodes
            .iter()
            .filter(|(_, node)| {
                node.achievement.goal_ids().is_empty()
                    && node.achievement.prerequisite_ids().is_empty()
                    && node.dependents.is_empty()
            })
            .map(|(id, _)| *id)
            .collect()
    }
}
