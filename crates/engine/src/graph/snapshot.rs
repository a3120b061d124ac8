//! Bulk load and export.
//!
//! A snapshot is validated as a whole before anything is built. On success a
//! fresh graph replaces the current one in a single assignment; on failure
//! the current graph is left untouched and every problem found is reported.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use questline_domain::{
    Achievement, AchievementId, DomainError, EngineSettings, Goal, GoalId, Violation,
};

use super::{AchievementGraph, Node};

/// Full persisted form of one achievement set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub achievements: Vec<Achievement>,
    #[serde(default)]
    pub goals: Vec<Goal>,
}

impl Snapshot {
    pub fn new(achievements: Vec<Achievement>, goals: Vec<Goal>) -> Self {
        Self { achievements, goals }
    }

    /// Every problem that would stop this snapshot from loading under
    /// `settings`. An empty list means the snapshot is loadable.
    pub fn validate(&self, settings: &EngineSettings) -> Vec<Violation> {
        let settings = settings.clone().normalized();
        let mut violations = Vec::new();

        let goal_ids = check_goals(&self.goals, &settings, &mut violations);
        let achievement_ids = check_achievement_ids(&self.achievements, &mut violations);
        check_titles(&self.achievements, &mut violations);

        for achievement in &self.achievements {
            check_record(achievement, &achievement_ids, &goal_ids, &settings, &mut violations);
        }
        check_positions(&self.achievements, &mut violations);
        check_cycles(&self.achievements, &achievement_ids, &mut violations);

        violations
    }
}

// =============================================================================
// Validation passes
// =============================================================================

fn check_goals(
    goals: &[Goal],
    settings: &EngineSettings,
    violations: &mut Vec<Violation>,
) -> BTreeSet<GoalId> {
    let mut ids = BTreeSet::new();
    let mut by_text: BTreeMap<&str, Vec<GoalId>> = BTreeMap::new();
    for goal in goals {
        if !ids.insert(goal.id()) {
            violations.push(Violation::DuplicateGoalId { goal_id: goal.id() });
        }
        by_text.entry(goal.text().as_str()).or_default().push(goal.id());
        if let Err(err) = goal.meta().validate() {
            violations.push(Violation::InvalidGoal {
                goal_id: goal.id(),
                reason: err.to_string(),
            });
        }
        if goal.text().char_len() > settings.max_goal_text_length {
            violations.push(Violation::InvalidGoal {
                goal_id: goal.id(),
                reason: format!(
                    "text exceeds {} characters",
                    settings.max_goal_text_length
                ),
            });
        }
    }
    for (text, owners) in by_text {
        if owners.len() > 1 {
            violations.push(Violation::DuplicateGoalText {
                text: text.to_string(),
                goal_ids: owners,
            });
        }
    }
    ids
}

fn check_achievement_ids(
    achievements: &[Achievement],
    violations: &mut Vec<Violation>,
) -> BTreeSet<AchievementId> {
    let mut ids = BTreeSet::new();
    for achievement in achievements {
        if !ids.insert(achievement.id()) {
            violations.push(Violation::DuplicateAchievementId {
                achievement_id: achievement.id(),
            });
        }
    }
    ids
}

fn check_titles(achievements: &[Achievement], violations: &mut Vec<Violation>) {
    let mut by_title: BTreeMap<&str, Vec<AchievementId>> = BTreeMap::new();
    for achievement in achievements {
        by_title
            .entry(achievement.title().as_str())
            .or_default()
            .push(achievement.id());
    }
    for (title, owners) in by_title {
        if owners.len() > 1 {
            violations.push(Violation::DuplicateTitle {
                title: title.to_string(),
                achievement_ids: owners,
            });
        }
    }
}

fn check_record(
    achievement: &Achievement,
    achievement_ids: &BTreeSet<AchievementId>,
    goal_ids: &BTreeSet<GoalId>,
    settings: &EngineSettings,
    violations: &mut Vec<Violation>,
) {
    let id = achievement.id();
    for prerequisite_id in achievement.prerequisite_ids() {
        if *prerequisite_id == id {
            violations.push(Violation::SelfReference { achievement_id: id });
        } else if !achievement_ids.contains(prerequisite_id) {
            violations.push(Violation::DanglingPrerequisite {
                achievement_id: id,
                prerequisite_id: *prerequisite_id,
            });
        }
    }
    for goal_id in achievement.goal_ids() {
        if !goal_ids.contains(goal_id) {
            violations.push(Violation::DanglingGoal {
                achievement_id: id,
                goal_id: *goal_id,
            });
        }
    }
    if achievement.is_task() != achievement.position().is_some() {
        violations.push(Violation::TaskFlagMismatch { achievement_id: id });
    }

    let limits = [
        (
            achievement.title().char_len() > settings.max_title_length,
            format!("title exceeds {} characters", settings.max_title_length),
        ),
        (
            achievement.prerequisite_ids().len() > settings.max_prerequisites_per_achievement,
            format!(
                "more than {} prerequisites",
                settings.max_prerequisites_per_achievement
            ),
        ),
        (
            achievement.goal_ids().len() > settings.max_goals_per_achievement,
            format!("more than {} goals", settings.max_goals_per_achievement),
        ),
    ];
    for (exceeded, reason) in limits {
        if exceeded {
            violations.push(Violation::LimitExceeded {
                achievement_id: id,
                reason,
            });
        }
    }
}

fn check_positions(achievements: &[Achievement], violations: &mut Vec<Violation>) {
    let mut found: Vec<u32> = achievements
        .iter()
        .filter(|a| a.is_task())
        .filter_map(Achievement::position)
        .collect();
    found.sort_unstable();
    let expected: Vec<u32> = (0..found.len() as u32).collect();
    if found != expected {
        violations.push(Violation::PositionGap { expected, found });
    }
}

/// Report every strongly connected component with more than one member.
/// Self edges and dangling edges are reported by [`check_record`].
fn check_cycles(
    achievements: &[Achievement],
    achievement_ids: &BTreeSet<AchievementId>,
    violations: &mut Vec<Violation>,
) {
    let ids: Vec<AchievementId> = achievement_ids.iter().copied().collect();
    let index: HashMap<AchievementId, usize> =
        ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
    for achievement in achievements {
        let Some(&from) = index.get(&achievement.id()) else {
            continue;
        };
        for prerequisite_id in achievement.prerequisite_ids() {
            if let Some(&to) = index.get(prerequisite_id) {
                if to != from && !edges[from].contains(&to) {
                    edges[from].push(to);
                }
            }
        }
    }

    for component in strongly_connected(&edges) {
        let mut members: Vec<AchievementId> = component.into_iter().map(|i| ids[i]).collect();
        members.sort();
        violations.push(Violation::Cycle {
            achievement_ids: members,
        });
    }
}

/// Kosaraju's algorithm with explicit stacks. Returns components of size > 1.
fn strongly_connected(edges: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = edges.len();

    let mut visited = vec![false; n];
    let mut finished = Vec::with_capacity(n);
    for root in 0..n {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        let mut stack = vec![(root, 0usize)];
        while let Some(top) = stack.last_mut() {
            let node = top.0;
            match edges[node].get(top.1) {
                Some(&next) => {
                    top.1 += 1;
                    if !visited[next] {
                        visited[next] = true;
                        stack.push((next, 0));
                    }
                }
                None => {
                    finished.push(node);
                    stack.pop();
                }
            }
        }
    }

    let mut reverse: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (from, targets) in edges.iter().enumerate() {
        for &to in targets {
            reverse[to].push(from);
        }
    }

    let mut assigned = vec![false; n];
    let mut components = Vec::new();
    for &root in finished.iter().rev() {
        if assigned[root] {
            continue;
        }
        assigned[root] = true;
        let mut component = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            component.push(node);
            for &prev in &reverse[node] {
                if !assigned[prev] {
                    assigned[prev] = true;
                    stack.push(prev);
                }
            }
        }
        if component.len() > 1 {
            components.push(component);
        }
    }
    components
}

// =============================================================================
// Graph entry points
// =============================================================================

impl AchievementGraph {
    /// Build a graph from a snapshot.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` listing every problem found.
    pub fn from_snapshot(settings: EngineSettings, snapshot: Snapshot) -> Result<Self, DomainError> {
        let mut graph = Self::new(settings);
        graph.load_snapshot(snapshot)?;
        Ok(graph)
    }

    /// Replace the whole graph with `achievements` and `goals`.
    ///
    /// The input is validated as a unit. On error the current graph is
    /// unchanged.
    pub fn load_all(&mut self, achievements: Vec<Achievement>, goals: Vec<Goal>) -> Result<(), DomainError> {
        self.load_snapshot(Snapshot::new(achievements, goals))
    }

    pub fn load_snapshot(&mut self, snapshot: Snapshot) -> Result<(), DomainError> {
        let violations = snapshot.validate(&self.settings);
        if !violations.is_empty() {
            tracing::warn!(
                problems = violations.len(),
                achievements = snapshot.achievements.len(),
                goals = snapshot.goals.len(),
                "Rejected achievement snapshot"
            );
            return Err(DomainError::InvariantViolation(violations));
        }

        let fresh = Self::build_validated(self.settings.clone(), snapshot)?;
        tracing::info!(
            achievements = fresh.len(),
            tasks = fresh.task_count(),
            goals = fresh.goals.len(),
            "Loaded achievement snapshot"
        );
        *self = fresh;
        Ok(())
    }

    fn build_validated(settings: EngineSettings, snapshot: Snapshot) -> Result<Self, DomainError> {
        let mut graph = Self::new(settings);

        for goal in snapshot.goals {
            graph.goals.insert_existing(goal)?;
        }

        let mut tasks: Vec<(u32, AchievementId)> = Vec::new();
        for achievement in snapshot.achievements {
            let id = achievement.id();
            graph.registry.register(id, achievement.title().as_str())?;
            if let Some(position) = achievement.position() {
                tasks.push((position, id));
            }
            for goal_id in achievement.goal_ids() {
                graph.goals.link(*goal_id, id);
            }
            graph.nodes.insert(
                id,
                Node {
                    achievement,
                    dependents: BTreeSet::new(),
                },
            );
        }

        let edges: Vec<(AchievementId, AchievementId)> = graph
            .nodes
            .values()
            .flat_map(|node| {
                let id = node.achievement.id();
                node.achievement
                    .prerequisite_ids()
                    .iter()
                    .map(move |prerequisite| (*prerequisite, id))
            })
            .collect();
        for (prerequisite, dependent) in edges {
            graph.node_mut(&prerequisite)?.dependents.insert(dependent);
        }

        tasks.sort_unstable();
        graph.task_order = tasks.into_iter().map(|(_, id)| id).collect();
        graph.derived.clear();
        Ok(graph)
    }

    /// Export the current state: tasks by position, then the remaining
    /// achievements by title, then goals by text.
    ///
    /// Aggregate goals are refreshed first so exported progress matches
    /// what `xp_of` reports.
    pub fn snapshot(&mut self) -> Snapshot {
        self.refresh_aggregates();
        Snapshot {
            achievements: self
                .list_achievements_in_order()
                .into_iter()
                .cloned()
                .collect(),
            goals: self.goals.sorted_goals(),
        }
    }
}
