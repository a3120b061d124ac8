//! Achievement graph.
//!
//! The graph is the aggregate root for one achievement set: it owns the
//! achievement nodes, the identifier registry, the goal store, the task
//! ordering, and the derived-state cache. Every mutation validates first and
//! commits second, so after any call (successful or not) the following hold:
//!
//! 1. The prerequisite graph is acyclic.
//! 2. Every prerequisite and goal reference points at a live entry.
//! 3. Task positions are exactly `0..task_count`.
//! 4. Title and goal-text lookups are exact inverses of the live entries.
//!
//! Callers only ever receive shared references to achievements and goals.

mod queries;
mod snapshot;

#[cfg(test)]
mod tests;

pub use snapshot::Snapshot;

use std::collections::{BTreeSet, HashMap, HashSet};

use questline_domain::{
    Achievement, AchievementDetails, AchievementDraft, AchievementId, AchievementStatus,
    AchievementTitle, AchievementUpdate, DerivedState, DomainError, EngineSettings, GoalDraft, GoalId, GoalMeta,
    GoalSignal, GoalText, GoalUpdate, ProgressUpdate,
};

use crate::derivation::DerivationCache;
use crate::goal_store::GoalStore;
use crate::registry::Registry;

const ENTITY: &str = "Achievement";

/// An achievement plus its reverse edges.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) achievement: Achievement,
    /// Achievements listing this one as a direct prerequisite
    pub(crate) dependents: BTreeSet<AchievementId>,
}

/// One achievement set with its goals and derived state.
#[derive(Debug, Clone)]
pub struct AchievementGraph {
    settings: EngineSettings,
    nodes: HashMap<AchievementId, Node>,
    registry: Registry<AchievementId>,
    /// Task ids indexed by position
    task_order: Vec<AchievementId>,
    goals: GoalStore,
    derived: DerivationCache,
}

impl Default for AchievementGraph {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

impl AchievementGraph {
    pub fn new(settings: EngineSettings) -> Self {
        let settings = settings.normalized();
        Self {
            goals: GoalStore::new(settings.max_goal_text_length),
            settings,
            nodes: HashMap::new(),
            registry: Registry::new(ENTITY),
            task_order: Vec::new(),
            derived: DerivationCache::new(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn node(&self, id: &AchievementId) -> Result<&Node, DomainError> {
        self.nodes
            .get(id)
            .ok_or_else(|| DomainError::not_found(ENTITY, id.to_string()))
    }

    fn node_mut(&mut self, id: &AchievementId) -> Result<&mut Node, DomainError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found(ENTITY, id.to_string()))
    }

    fn require_achievement(&self, id: &AchievementId) -> Result<(), DomainError> {
        self.node(id).map(|_| ())
    }

    fn require_goal(&self, id: &GoalId) -> Result<(), DomainError> {
        self.goals.get_goal(id).map(|_| ())
    }

    fn check_title(&self, title: &AchievementTitle) -> Result<(), DomainError> {
        if title.char_len() > self.settings.max_title_length {
            return Err(DomainError::validation(format!(
                "Achievement title cannot exceed {} characters",
                self.settings.max_title_length
            )));
        }
        Ok(())
    }

    fn check_prerequisite_limit(&self, count: usize) -> Result<(), DomainError> {
        let max = self.settings.max_prerequisites_per_achievement;
        if count > max {
            return Err(DomainError::constraint(format!(
                "an achievement can have at most {} prerequisites",
                max
            )));
        }
        Ok(())
    }

    fn check_goal_limit(&self, count: usize) -> Result<(), DomainError> {
        let max = self.settings.max_goals_per_achievement;
        if count > max {
            return Err(DomainError::constraint(format!(
                "an achievement can have at most {} goals",
                max
            )));
        }
        Ok(())
    }

    /// Depth-first reachability along prerequisite edges.
    fn reaches(&self, from: &AchievementId, target: &AchievementId) -> bool {
        let mut stack = vec![*from];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == *target {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.achievement.prerequisite_ids().iter().copied());
            }
        }
        false
    }

    fn invalidate(&mut self, id: &AchievementId) {
        self.derived.invalidate(id, &self.nodes, &self.registry);
    }

    /// Invalidate every achievement using one of `goal_ids`.
    fn invalidate_goal_referrers<'a>(&mut self, goal_ids: impl IntoIterator<Item = &'a GoalId>) {
        let referrers: BTreeSet<AchievementId> = goal_ids
            .into_iter()
            .flat_map(|g| self.goals.referrers_of(g))
            .collect();
        for id in &referrers {
            self.invalidate(id);
        }
    }

    /// Something aggregate goals observe has changed.
    fn touch_aggregates(&mut self) {
        if self.goals.has_aggregates() {
            self.derived.mark_aggregates_stale();
        }
    }

    /// Rewrite every task's position from `task_order`.
    fn reindex_tasks_from(&mut self, start: usize) {
        for (position, id) in self.task_order.iter().enumerate().skip(start) {
            if let Some(node) = self.nodes.get_mut(id) {
                node.achievement.set_task_position(Some(position as u32));
            }
        }
    }

    // =========================================================================
    // Achievement Mutations
    // =========================================================================

    /// Insert a new achievement and return its fresh id.
    ///
    /// Tasks are appended after the last task position. Supplied prerequisite
    /// and goal ids must already exist; a fresh node has no dependents, so it
    /// cannot close a cycle.
    ///
    /// # Errors
    ///
    /// `DuplicateTitle`, `NotFound` for unknown references, `Validation` or
    /// `Constraint` for configured limits.
    pub fn insert_achievement(&mut self, draft: AchievementDraft) -> Result<AchievementId, DomainError> {
        let id = AchievementId::new();
        self.check_title(&draft.title)?;
        self.registry.check_register(&id, draft.title.as_str())?;
        self.check_prerequisite_limit(draft.prerequisite_ids.len())?;
        self.check_goal_limit(draft.goal_ids.len())?;
        for prerequisite in &draft.prerequisite_ids {
            self.require_achievement(prerequisite)?;
        }
        for goal_id in &draft.goal_ids {
            self.require_goal(goal_id)?;
        }

        self.registry.register(id, draft.title.as_str())?;
        let position = draft.is_task.then(|| self.task_order.len() as u32);
        if draft.is_task {
            self.task_order.push(id);
        }
        for prerequisite in &draft.prerequisite_ids {
            if let Some(node) = self.nodes.get_mut(prerequisite) {
                node.dependents.insert(id);
            }
        }
        for goal_id in &draft.goal_ids {
            self.goals.link(*goal_id, id);
        }
        let achievement = Achievement::from_draft(id, draft, position);
        tracing::debug!(
            achievement_id = %id,
            title = %achievement.title(),
            position = ?position,
            "Inserted achievement"
        );
        self.nodes.insert(
            id,
            Node {
                achievement,
                dependents: BTreeSet::new(),
            },
        );
        // A reused slot may still hold a stale entry
        self.invalidate(&id);
        self.touch_aggregates();
        Ok(id)
    }

    /// Delete an achievement, stripping it from every dependent and compacting
    /// task positions.
    pub fn delete_achievement(&mut self, id: &AchievementId) -> Result<(), DomainError> {
        self.require_achievement(id)?;

        // Clear derived state while the reverse edges still exist
        self.invalidate(id);

        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| DomainError::not_found(ENTITY, id.to_string()))?;

        for prerequisite in node.achievement.prerequisite_ids() {
            if let Some(prereq_node) = self.nodes.get_mut(prerequisite) {
                prereq_node.dependents.remove(id);
            }
        }
        for dependent in &node.dependents {
            if let Some(dependent_node) = self.nodes.get_mut(dependent) {
                dependent_node.achievement.remove_prerequisite(id);
            }
        }
        for goal_id in node.achievement.goal_ids() {
            self.goals.unlink(goal_id, id);
        }
        self.registry.unregister(id)?;

        if let Some(position) = node.achievement.position() {
            let index = position as usize;
            if self.task_order.get(index) == Some(id) {
                self.task_order.remove(index);
                self.reindex_tasks_from(index);
            }
        }

        self.touch_aggregates();
        tracing::debug!(
            achievement_id = %id,
            dependents = node.dependents.len(),
            "Deleted achievement"
        );
        Ok(())
    }

    /// Make `prerequisite_id` a prerequisite of `id`.
    ///
    /// Adding an edge that already exists succeeds without changes.
    ///
    /// # Errors
    ///
    /// - `NotFound` if either achievement is missing
    /// - `SelfReference` if the two ids are equal
    /// - `CycleDetected` if `prerequisite_id` already (transitively) depends on `id`
    /// - `Constraint` if `id` is already at its prerequisite limit
    pub fn add_prerequisite(
        &mut self,
        id: &AchievementId,
        prerequisite_id: &AchievementId,
    ) -> Result<(), DomainError> {
        let node = self.node(id)?;
        self.require_achievement(prerequisite_id)?;
        if id == prerequisite_id {
            tracing::warn!(achievement_id = %id, "Rejected self-referencing prerequisite");
            return Err(DomainError::self_reference(*id));
        }
        if node.achievement.has_prerequisite(prerequisite_id) {
            return Ok(());
        }
        if self.reaches(prerequisite_id, id) {
            tracing::warn!(
                achievement_id = %id,
                prerequisite_id = %prerequisite_id,
                "Rejected prerequisite that would create a cycle"
            );
            return Err(DomainError::cycle_detected(*id, *prerequisite_id));
        }
        self.check_prerequisite_limit(node.achievement.prerequisite_ids().len() + 1)?;

        self.node_mut(id)?.achievement.add_prerequisite(*prerequisite_id);
        self.node_mut(prerequisite_id)?.dependents.insert(*id);
        self.invalidate(id);
        tracing::debug!(
            achievement_id = %id,
            prerequisite_id = %prerequisite_id,
            "Added prerequisite"
        );
        Ok(())
    }

    /// Remove the edge `id -> prerequisite_id`.
    ///
    /// # Errors
    ///
    /// `NotFound` if `id` is missing or the edge does not exist.
    pub fn remove_prerequisite(
        &mut self,
        id: &AchievementId,
        prerequisite_id: &AchievementId,
    ) -> Result<(), DomainError> {
        if !self.node(id)?.achievement.has_prerequisite(prerequisite_id) {
            return Err(DomainError::not_found(
                "Prerequisite",
                format!("{} -> {}", id, prerequisite_id),
            ));
        }

        // Invalidate first: the edge may be the only path to some dependents
        self.invalidate(id);
        self.node_mut(id)?.achievement.remove_prerequisite(prerequisite_id);
        if let Some(prereq_node) = self.nodes.get_mut(prerequisite_id) {
            prereq_node.dependents.remove(id);
        }
        tracing::debug!(
            achievement_id = %id,
            prerequisite_id = %prerequisite_id,
            "Removed prerequisite"
        );
        Ok(())
    }

    /// Attach an existing goal. Attaching twice is a no-op.
    pub fn attach_goal(&mut self, id: &AchievementId, goal_id: &GoalId) -> Result<(), DomainError> {
        let node = self.node(id)?;
        self.require_goal(goal_id)?;
        if node.achievement.has_goal(goal_id) {
            return Ok(());
        }
        self.check_goal_limit(node.achievement.goal_ids().len() + 1)?;

        self.node_mut(id)?.achievement.attach_goal(*goal_id);
        self.goals.link(*goal_id, *id);
        self.invalidate(id);
        self.touch_aggregates();
        Ok(())
    }

    /// Detach a goal.
    ///
    /// # Errors
    ///
    /// `NotFound` if `id` is missing or the goal is not attached.
    pub fn detach_goal(&mut self, id: &AchievementId, goal_id: &GoalId) -> Result<(), DomainError> {
        let update = self.node_mut(id)?.achievement.detach_goal(goal_id);
        if !update.affects_derived_state() {
            return Err(DomainError::not_found(
                "Goal reference",
                format!("{} -> {}", id, goal_id),
            ));
        }
        self.goals.unlink(goal_id, id);
        self.invalidate(id);
        self.touch_aggregates();
        Ok(())
    }

    /// Exchange the positions of two tasks.
    ///
    /// # Errors
    ///
    /// `NotFound` if either is missing, `NotATask` if either is not a task.
    pub fn swap_positions(&mut self, a: &AchievementId, b: &AchievementId) -> Result<(), DomainError> {
        let pos_a = self
            .node(a)?
            .achievement
            .position()
            .ok_or_else(|| DomainError::not_a_task(*a))?;
        let pos_b = self
            .node(b)?
            .achievement
            .position()
            .ok_or_else(|| DomainError::not_a_task(*b))?;
        if pos_a == pos_b {
            return Ok(());
        }

        self.task_order.swap(pos_a as usize, pos_b as usize);
        self.node_mut(a)?.achievement.set_task_position(Some(pos_b));
        self.node_mut(b)?.achievement.set_task_position(Some(pos_a));
        tracing::debug!(a = %a, b = %b, pos_a, pos_b, "Swapped task positions");
        Ok(())
    }

    /// Rename an achievement; title lookups follow immediately.
    pub fn rename_achievement(
        &mut self,
        id: &AchievementId,
        title: AchievementTitle,
    ) -> Result<AchievementUpdate, DomainError> {
        self.require_achievement(id)?;
        self.check_title(&title)?;
        self.registry.rename(id, title.as_str())?;
        Ok(self.node_mut(id)?.achievement.set_title(title))
    }

    /// Move an achievement into or out of the task ordering.
    ///
    /// Promoting appends at the next free position; demoting compacts the
    /// positions after it.
    pub fn set_task(&mut self, id: &AchievementId, is_task: bool) -> Result<AchievementUpdate, DomainError> {
        let current = self.node(id)?.achievement.position();
        let update = match (current, is_task) {
            (None, true) => {
                let position = self.task_order.len() as u32;
                self.task_order.push(*id);
                self.node_mut(id)?.achievement.set_task_position(Some(position))
            }
            (Some(position), false) => {
                let index = position as usize;
                self.task_order.remove(index);
                let update = self.node_mut(id)?.achievement.set_task_position(None);
                self.reindex_tasks_from(index);
                update
            }
            _ => AchievementUpdate::PositionChanged {
                from: current,
                to: current,
            },
        };
        Ok(update)
    }

    /// Replace the display payload (`xp`, card background, view).
    pub fn update_details(
        &mut self,
        id: &AchievementId,
        details: AchievementDetails,
    ) -> Result<AchievementUpdate, DomainError> {
        Ok(self.node_mut(id)?.achievement.set_details(details))
    }

    // =========================================================================
    // Goal Mutations
    // =========================================================================

    pub fn insert_goal(&mut self, draft: GoalDraft) -> Result<GoalId, DomainError> {
        let id = self.goals.insert_goal(draft)?;
        self.touch_aggregates();
        Ok(id)
    }

    /// Delete a goal and strip it from every achievement that used it.
    pub fn delete_goal(&mut self, goal_id: &GoalId) -> Result<BTreeSet<AchievementId>, DomainError> {
        self.require_goal(goal_id)?;
        let affected = self.goals.referrers_of(goal_id);
        for id in &affected {
            self.invalidate(id);
        }
        self.goals.delete_goal(goal_id)?;
        for id in &affected {
            if let Some(node) = self.nodes.get_mut(id) {
                node.achievement.detach_goal(goal_id);
            }
        }
        self.touch_aggregates();
        tracing::debug!(goal_id = %goal_id, affected = affected.len(), "Deleted goal");
        Ok(affected)
    }

    pub fn update_goal_progress(
        &mut self,
        goal_id: &GoalId,
        update: ProgressUpdate,
    ) -> Result<GoalUpdate, DomainError> {
        let outcome = self.goals.update_progress(goal_id, update)?;
        if outcome.affects_derived_state() {
            self.invalidate_goal_referrers([goal_id]);
            self.touch_aggregates();
        }
        Ok(outcome)
    }

    pub fn update_goal_meta(&mut self, goal_id: &GoalId, meta: GoalMeta) -> Result<GoalUpdate, DomainError> {
        let outcome = self.goals.update_meta(goal_id, meta)?;
        self.invalidate_goal_referrers([goal_id]);
        // The goal may have become (or stopped being) an aggregate
        self.derived.mark_aggregates_stale();
        Ok(outcome)
    }

    pub fn update_goal_text(&mut self, goal_id: &GoalId, text: GoalText) -> Result<GoalUpdate, DomainError> {
        self.goals.update_text(goal_id, text)
    }

    /// Route an external signal to the goals keyed by it.
    pub fn apply_goal_signal(&mut self, signal: &GoalSignal) -> BTreeSet<GoalId> {
        let changed = self.goals.apply_signal(signal);
        if !changed.is_empty() {
            self.invalidate_goal_referrers(&changed);
            self.touch_aggregates();
        }
        changed
    }

    // =========================================================================
    // Derived State
    // =========================================================================

    /// Push fresh totals into aggregate goals if anything they observe changed.
    fn refresh_aggregates(&mut self) {
        if !self.derived.take_aggregates_stale() || !self.goals.has_aggregates() {
            return;
        }
        let completed_achievements = self
            .nodes
            .values()
            .filter(|node| self.is_self_complete(&node.achievement))
            .count() as u64;
        let totals = self.goals.base_totals(completed_achievements);
        let changed = self.goals.observe_totals(&totals);
        if !changed.is_empty() {
            tracing::debug!(changed = changed.len(), "Refreshed aggregate goals");
            self.invalidate_goal_referrers(&changed);
        }
    }

    /// Own-goal completion used by aggregates: at least one goal, none of them
    /// aggregates, all complete. Prerequisite gating is ignored.
    fn is_self_complete(&self, achievement: &Achievement) -> bool {
        !achievement.goal_ids().is_empty()
            && achievement.goal_ids().iter().all(|goal_id| {
                self.goals
                    .get_goal(goal_id)
                    .map(|goal| !goal.is_aggregate() && goal.is_complete())
                    .unwrap_or(false)
            })
    }

    /// Status and XP of `id`, recomputed if stale.
    pub fn derived_state(&mut self, id: &AchievementId) -> Result<DerivedState, DomainError> {
        self.require_achievement(id)?;
        self.refresh_aggregates();
        self.derived
            .derive(id, &self.nodes, &self.registry, &self.goals)
    }

    pub fn status_of(&mut self, id: &AchievementId) -> Result<AchievementStatus, DomainError> {
        Ok(self.derived_state(id)?.status)
    }

    pub fn xp_of(&mut self, id: &AchievementId) -> Result<u64, DomainError> {
        Ok(self.derived_state(id)?.xp)
    }

    /// Drop the cached state of `id` and everything depending on it.
    pub fn invalidate_derived(&mut self, id: &AchievementId) -> Result<(), DomainError> {
        self.require_achievement(id)?;
        self.invalidate(id);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn cached_count(&self) -> usize {
        self.derived.cached_count()
    }
}
