//! Graph behaviour tests, grouped by topic.

use std::collections::BTreeSet;

use questline_domain::{
    AchievementDraft, AchievementId, AchievementTitle, GoalDraft, GoalId, GoalMeta, GoalText,
};

use super::AchievementGraph;

mod snapshot;

fn title(s: &str) -> AchievementTitle {
    AchievementTitle::new(s).unwrap()
}

fn graph() -> AchievementGraph {
    AchievementGraph::default()
}

fn add(graph: &mut AchievementGraph, name: &str) -> AchievementId {
    graph.insert_achievement(AchievementDraft::new(title(name))).unwrap()
}

fn add_task(graph: &mut AchievementGraph, name: &str) -> AchievementId {
    graph
        .insert_achievement(AchievementDraft::new(title(name)).task())
        .unwrap()
}

fn add_goal(graph: &mut AchievementGraph, text: &str, meta: GoalMeta) -> GoalId {
    graph
        .insert_goal(GoalDraft::new(GoalText::new(text).unwrap(), meta))
        .unwrap()
}

fn ids<const N: usize>(items: [AchievementId; N]) -> BTreeSet<AchievementId> {
    BTreeSet::from(items)
}

/// Positions of all tasks, sorted.
fn positions(graph: &AchievementGraph) -> Vec<u32> {
    let mut found: Vec<u32> = graph.achievements().filter_map(|a| a.position()).collect();
    found.sort_unstable();
    found
}
