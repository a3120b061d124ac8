//! Derived state cache.
//!
//! Each achievement's `(status, xp)` pair is cached by registry slot.
//! Invalidation is eager and walks reverse edges so every transitive dependent
//! is cleared; recomputation is lazy and happens on the next read.

use std::collections::{HashMap, HashSet};

use questline_domain::{AchievementId, AchievementStatus, DerivedState, DomainError};

use crate::goal_store::GoalStore;
use crate::graph::Node;
use crate::registry::Registry;

#[derive(Debug, Clone, Default)]
pub(crate) struct DerivationCache {
    entries: Vec<Option<DerivedState>>,
    aggregates_stale: bool,
}

impl DerivationCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn cached(&self, registry: &Registry<AchievementId>, id: &AchievementId) -> Option<DerivedState> {
        let slot = registry.slot_of(id)?;
        self.entries.get(slot.index()).copied().flatten()
    }

    /// Number of achievements with a cached derived pair.
    #[cfg(test)]
    pub(crate) fn cached_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub(crate) fn mark_aggregates_stale(&mut self) {
        self.aggregates_stale = true;
    }

    /// Returns whether aggregate goals need a refresh, clearing the flag.
    pub(crate) fn take_aggregates_stale(&mut self) -> bool {
        std::mem::take(&mut self.aggregates_stale)
    }

    /// Clear `id` and every achievement that transitively depends on it.
    pub(crate) fn invalidate(
        &mut self,
        id: &AchievementId,
        nodes: &HashMap<AchievementId, Node>,
        registry: &Registry<AchievementId>,
    ) {
        let mut stack = vec![*id];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(slot) = registry.slot_of(&current) {
                if let Some(entry) = self.entries.get_mut(slot.index()) {
                    *entry = None;
                }
            }
            if let Some(node) = nodes.get(&current) {
                stack.extend(node.dependents.iter().copied());
            }
        }
    }

    /// Drop every entry and force aggregates to refresh on the next read.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.aggregates_stale = true;
    }

    fn store(&mut self, index: usize, state: DerivedState) {
        if self.entries.len() <= index {
            self.entries.resize(index + 1, None);
        }
        self.entries[index] = Some(state);
    }

    /// Derived pair for `id`, computing any missing prerequisite entries first.
    ///
    /// The prerequisite graph is acyclic, so a post-order walk always finds
    /// every prerequisite cached by the time its dependent is finished.
    pub(crate) fn derive(
        &mut self,
        id: &AchievementId,
        nodes: &HashMap<AchievementId, Node>,
        registry: &Registry<AchievementId>,
        goals: &GoalStore,
    ) -> Result<DerivedState, DomainError> {
        if !nodes.contains_key(id) {
            return Err(DomainError::not_found("Achievement", id.to_string()));
        }
        if let Some(state) = self.cached(registry, id) {
            return Ok(state);
        }

        let mut stack = vec![(*id, false)];
        while let Some((current, expanded)) = stack.pop() {
            if self.cached(registry, &current).is_some() {
                continue;
            }
            let node = nodes
                .get(&current)
                .ok_or_else(|| DomainError::not_found("Achievement", current.to_string()))?;

            if !expanded {
                stack.push((current, true));
                stack.extend(
                    node.achievement
                        .prerequisite_ids()
                        .iter()
                        .filter(|p| self.cached(registry, p).is_none())
                        .map(|p| (*p, false)),
                );
                continue;
            }

            let state = self.compute(node, registry, goals)?;
            let slot = registry
                .slot_of(&current)
                .ok_or_else(|| DomainError::not_found("Achievement", current.to_string()))?;
            self.store(slot.index(), state);
        }

        self.cached(registry, id)
            .ok_or_else(|| DomainError::not_found("Achievement", id.to_string()))
    }

    fn compute(
        &self,
        node: &Node,
        registry: &Registry<AchievementId>,
        goals: &GoalStore,
    ) -> Result<DerivedState, DomainError> {
        let achievement = &node.achievement;

        let mut locked = false;
        for prerequisite in achievement.prerequisite_ids() {
            let state = self.cached(registry, prerequisite).ok_or_else(|| {
                DomainError::not_found("Achievement", prerequisite.to_string())
            })?;
            if !state.status.is_completed() {
                locked = true;
            }
        }

        let mut xp = 0u64;
        let mut all_complete = true;
        for goal_id in achievement.goal_ids() {
            let goal = goals.get_goal(goal_id)?;
            xp += u64::from(goal.earned_xp());
            all_complete &= goal.is_complete();
        }

        let status = if locked {
            AchievementStatus::Locked
        } else if all_complete {
            AchievementStatus::Completed
        } else {
            AchievementStatus::InProgress
        };
        Ok(DerivedState { status, xp })
    }
}
