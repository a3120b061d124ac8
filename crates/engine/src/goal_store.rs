//! Goal store.
//!
//! Owns goal definitions, their live progress, and the goal-text registry. It
//! also tracks which achievements reference each goal so that deleting a goal
//! can report who was affected. It never edits achievements; the graph does
//! that with the returned ids.

use std::collections::{BTreeSet, HashMap};

use questline_domain::{
    AchievementId, AggregateTotals, DomainError, Goal, GoalDraft, GoalId, GoalMeta, GoalSignal,
    GoalText, GoalUpdate, ProgressUpdate,
};

use crate::registry::Registry;

const ENTITY: &str = "Goal";

#[derive(Debug, Clone)]
pub struct GoalStore {
    goals: HashMap<GoalId, Goal>,
    registry: Registry<GoalId>,
    referrers: HashMap<GoalId, BTreeSet<AchievementId>>,
    max_text_length: usize,
}

impl GoalStore {
    pub fn new(max_text_length: usize) -> Self {
        Self {
            goals: HashMap::new(),
            registry: Registry::new(ENTITY),
            referrers: HashMap::new(),
            max_text_length,
        }
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    pub fn contains(&self, id: &GoalId) -> bool {
        self.goals.contains_key(id)
    }

    fn check_text(&self, text: &GoalText) -> Result<(), DomainError> {
        if text.char_len() > self.max_text_length {
            return Err(DomainError::validation(format!(
                "Goal text cannot exceed {} characters",
                self.max_text_length
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Definitions
    // =========================================================================

    /// Create a goal from its definition and return the fresh id.
    pub fn insert_goal(&mut self, draft: GoalDraft) -> Result<GoalId, DomainError> {
        self.check_text(&draft.text)?;
        let goal = Goal::new(draft)?;
        self.insert_existing(goal)
    }

    /// Insert a goal that already has an id (bulk load path).
    pub(crate) fn insert_existing(&mut self, goal: Goal) -> Result<GoalId, DomainError> {
        let id = goal.id();
        self.registry.register(id, goal.text().as_str())?;
        self.goals.insert(id, goal);
        Ok(id)
    }

    pub fn get_goal(&self, id: &GoalId) -> Result<&Goal, DomainError> {
        self.goals
            .get(id)
            .ok_or_else(|| DomainError::not_found(ENTITY, id.to_string()))
    }

    fn goal_mut(&mut self, id: &GoalId) -> Result<&mut Goal, DomainError> {
        self.goals
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found(ENTITY, id.to_string()))
    }

    /// Replace a goal's meta. The new meta is validated before anything changes.
    pub fn update_meta(&mut self, id: &GoalId, meta: GoalMeta) -> Result<GoalUpdate, DomainError> {
        self.goal_mut(id)?.set_meta(meta)
    }

    pub fn update_text(&mut self, id: &GoalId, text: GoalText) -> Result<GoalUpdate, DomainError> {
        self.check_text(&text)?;
        self.registry.rename(id, text.as_str())?;
        Ok(self.goal_mut(id)?.set_text(text))
    }

    /// Apply a direct progress edit; variant rules live on [`Goal::update_progress`].
    pub fn update_progress(
        &mut self,
        id: &GoalId,
        update: ProgressUpdate,
    ) -> Result<GoalUpdate, DomainError> {
        self.goal_mut(id)?.update_progress(update)
    }

    /// Feed an external signal to every goal keyed by it. Returns the goals
    /// whose progress moved.
    pub fn apply_signal(&mut self, signal: &GoalSignal) -> BTreeSet<GoalId> {
        self.goals
            .values_mut()
            .filter_map(|goal| {
                goal.apply_signal(signal)
                    .affects_derived_state()
                    .then(|| goal.id())
            })
            .collect()
    }

    /// Remove a goal and return the achievements that referenced it.
    pub fn delete_goal(&mut self, id: &GoalId) -> Result<BTreeSet<AchievementId>, DomainError> {
        if !self.goals.contains_key(id) {
            return Err(DomainError::not_found(ENTITY, id.to_string()));
        }
        self.registry.unregister(id)?;
        self.goals.remove(id);
        Ok(self.referrers.remove(id).unwrap_or_default())
    }

    // =========================================================================
    // References
    // =========================================================================

    pub(crate) fn link(&mut self, goal_id: GoalId, achievement_id: AchievementId) {
        self.referrers
            .entry(goal_id)
            .or_default()
            .insert(achievement_id);
    }

    pub(crate) fn unlink(&mut self, goal_id: &GoalId, achievement_id: &AchievementId) {
        if let Some(set) = self.referrers.get_mut(goal_id) {
            set.remove(achievement_id);
            if set.is_empty() {
                self.referrers.remove(goal_id);
            }
        }
    }

    /// Achievements currently referencing `goal_id`.
    pub fn referrers_of(&self, goal_id: &GoalId) -> BTreeSet<AchievementId> {
        self.referrers.get(goal_id).cloned().unwrap_or_default()
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    pub fn has_aggregates(&self) -> bool {
        self.goals.values().any(Goal::is_aggregate)
    }

    /// Totals over non-aggregate goals. `completed_achievements` is supplied
    /// by the caller because only the graph knows achievement membership.
    pub(crate) fn base_totals(&self, completed_achievements: u64) -> AggregateTotals {
        let mut totals = AggregateTotals {
            completed_achievements,
            ..AggregateTotals::default()
        };
        for goal in self.goals.values().filter(|g| !g.is_aggregate()) {
            totals.earned_xp += u64::from(goal.earned_xp());
            if goal.is_complete() {
                totals.completed_goals += 1;
            }
        }
        totals
    }

    /// Push fresh totals into every aggregate goal.
    pub(crate) fn observe_totals(&mut self, totals: &AggregateTotals) -> BTreeSet<GoalId> {
        self.goals
            .values_mut()
            .filter(|g| g.is_aggregate())
            .filter_map(|goal| goal.observe(totals).affects_derived_state().then(|| goal.id()))
            .collect()
    }

    // =========================================================================
    // Lookups and export
    // =========================================================================

    pub fn id_by_text(&self, text: &str) -> Result<GoalId, DomainError> {
        self.registry.id_of(text)
    }

    pub fn text_by_id(&self, id: &GoalId) -> Result<&str, DomainError> {
        self.registry.label_of(id)
    }

    pub fn goals(&self) -> impl Iterator<Item = &Goal> {
        self.goals.values()
    }

    /// All goals sorted by text, for stable export.
    pub fn sorted_goals(&self) -> Vec<Goal> {
        let mut goals: Vec<Goal> = self.goals.values().cloned().collect();
        goals.sort_by(|a, b| a.text().cmp(b.text()));
        goals
    }

    #[cfg(test)]
    pub(crate) fn registry_is_consistent(&self) -> bool {
        self.registry.is_consistent() && self.registry.len() == self.goals.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use questline_domain::MAX_GOAL_TEXT_LENGTH;

    fn store() -> GoalStore {
        GoalStore::new(MAX_GOAL_TEXT_LENGTH)
    }

    fn draft(text: &str, meta: GoalMeta) -> GoalDraft {
        GoalDraft::new(GoalText::new(text).unwrap(), meta)
    }

    mod definitions {
        use super::*;

        #[test]
        fn insert_and_lookup_by_text() {
            let mut goals = store();
            let id = goals.insert_goal(draft("Solve 5 puzzles", GoalMeta::manual(10))).unwrap();

            assert_eq!(goals.id_by_text("Solve 5 puzzles").unwrap(), id);
            assert_eq!(goals.text_by_id(&id).unwrap(), "Solve 5 puzzles");
            assert!(goals.registry_is_consistent());
        }

        #[test]
        fn duplicate_text_is_rejected() {
            let mut goals = store();
            goals.insert_goal(draft("Same", GoalMeta::manual(10))).unwrap();
            let err = goals.insert_goal(draft("Same", GoalMeta::manual(5))).unwrap_err();
            assert!(matches!(err, DomainError::DuplicateTitle { .. }));
            assert_eq!(goals.len(), 1);
        }

        #[test]
        fn text_limit_from_settings_applies() {
            let mut goals = GoalStore::new(4);
            let err = goals.insert_goal(draft("Too long", GoalMeta::manual(1))).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }

        #[test]
        fn update_text_moves_lookup() {
            let mut goals = store();
            let id = goals.insert_goal(draft("Old", GoalMeta::manual(1))).unwrap();
            goals.update_text(&id, GoalText::new("New").unwrap()).unwrap();

            assert!(goals.id_by_text("Old").is_err());
            assert_eq!(goals.id_by_text("New").unwrap(), id);
            assert_eq!(goals.get_goal(&id).unwrap().text().as_str(), "New");
        }

        #[test]
        fn unknown_goal_is_not_found() {
            let mut goals = store();
            let err = goals
                .update_progress(&GoalId::new(), ProgressUpdate::Increment(1))
                .unwrap_err();
            assert!(matches!(err, DomainError::NotFound { .. }));
        }
    }

    mod progress {
        use super::*;

        #[test]
        fn event_count_scenario() {
            let mut goals = store();
            let g = goals
                .insert_goal(draft("Log in five times", GoalMeta::event_count("login", 5, 50)))
                .unwrap();

            goals.update_progress(&g, ProgressUpdate::Increment(3)).unwrap();
            assert_eq!(goals.get_goal(&g).unwrap().earned_xp(), 30);

            goals.update_progress(&g, ProgressUpdate::Increment(3)).unwrap();
            let goal = goals.get_goal(&g).unwrap();
            assert_eq!(goal.earned_xp(), 50);
            assert!(goal.is_complete());
        }

        #[test]
        fn derived_variants_reject_direct_edits() {
            let mut goals = store();
            let g = goals
                .insert_goal(draft("Pass quiz", GoalMeta::assessment("quiz", 10)))
                .unwrap();
            let err = goals.update_progress(&g, ProgressUpdate::Complete(true)).unwrap_err();
            assert!(matches!(err, DomainError::UnsupportedOperation { .. }));
        }

        #[test]
        fn signals_report_changed_goals_only() {
            let mut goals = store();
            let quiz = goals
                .insert_goal(draft("Pass quiz", GoalMeta::assessment("quiz", 10)))
                .unwrap();
            goals
                .insert_goal(draft("Other quiz", GoalMeta::assessment("other", 10)))
                .unwrap();

            let changed = goals.apply_signal(&GoalSignal::AssessmentScored {
                assessment_id: "quiz".into(),
                fraction: 1.0,
            });
            assert_eq!(changed, BTreeSet::from([quiz]));
            assert!(goals.get_goal(&quiz).unwrap().is_complete());
        }
    }

    mod deletion {
        use super::*;

        #[test]
        fn delete_returns_referrers() {
            let mut goals = store();
            let g = goals.insert_goal(draft("G", GoalMeta::manual(1))).unwrap();
            let a = AchievementId::new();
            let b = AchievementId::new();
            goals.link(g, a);
            goals.link(g, b);
            goals.unlink(&g, &b);

            let affected = goals.delete_goal(&g).unwrap();
            assert_eq!(affected, BTreeSet::from([a]));
            assert!(goals.id_by_text("G").is_err());
            assert!(goals.registry_is_consistent());
        }

        #[test]
        fn delete_unknown_goal_fails() {
            let mut goals = store();
            assert!(goals.delete_goal(&GoalId::new()).is_err());
        }
    }

    mod aggregates {
        use super::*;
        use questline_domain::AggregateMeasure;

        #[test]
        fn totals_skip_aggregate_goals() {
            let mut goals = store();
            let a = goals.insert_goal(draft("A", GoalMeta::manual(10))).unwrap();
            goals.insert_goal(draft("B", GoalMeta::manual(30))).unwrap();
            let sum = goals
                .insert_goal(draft("Earn 20 XP", GoalMeta::xp_sum(AggregateMeasure::EarnedXp, 20, 100)))
                .unwrap();
            goals.update_progress(&a, ProgressUpdate::Complete(true)).unwrap();

            let totals = goals.base_totals(0);
            assert_eq!(totals.earned_xp, 10);
            assert_eq!(totals.completed_goals, 1);

            let changed = goals.observe_totals(&totals);
            assert_eq!(changed, BTreeSet::from([sum]));
            assert_eq!(goals.get_goal(&sum).unwrap().earned_xp(), 50);
        }
    }
}
