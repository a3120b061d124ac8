use super::*;
use questline_domain::{
    Achievement, AchievementStatus, AggregateMeasure, DomainError, EngineSettings, Goal,
    ProgressUpdate, Violation,
};

use crate::graph::Snapshot;

fn sample() -> (AchievementGraph, AchievementId, AchievementId, GoalId) {
    let mut g = graph();
    let goal = add_goal(&mut g, "Finish intro", GoalMeta::manual(10));
    let intro = g
        .insert_achievement(AchievementDraft::new(title("Intro")).task().with_goals([goal]))
        .unwrap();
    let next = g
        .insert_achievement(AchievementDraft::new(title("Next")).task().with_prerequisites([intro]))
        .unwrap();
    (g, intro, next, goal)
}

fn record(id: AchievementId, name: &str, position: Option<u32>, prerequisites: &[AchievementId]) -> Achievement {
    let draft = AchievementDraft::new(title(name)).with_prerequisites(prerequisites.iter().copied());
    let draft = if position.is_some() { draft.task() } else { draft };
    Achievement::from_draft(id, draft, position)
}

mod load {
    use super::*;

    #[test]
    fn exported_snapshot_loads_into_equal_graph() {
        let (mut g, intro, next, goal) = sample();
        g.update_goal_progress(&goal, ProgressUpdate::Complete(true)).unwrap();
        let exported = g.snapshot();

        let mut loaded = AchievementGraph::from_snapshot(EngineSettings::default(), exported.clone()).unwrap();
        assert_eq!(loaded.snapshot(), exported);
        assert_eq!(loaded.list_task_ids_in_order(), vec![intro, next]);
        assert_eq!(loaded.dependents_of(&intro).unwrap(), ids([next]));
        assert_eq!(loaded.status_of(&next).unwrap(), AchievementStatus::Completed);
        assert_eq!(loaded.get_goal_id_by_text("Finish intro").unwrap(), goal);
    }

    #[test]
    fn snapshot_survives_json() {
        let (mut g, ..) = sample();
        let json = serde_json::to_string(&g.snapshot()).unwrap();
        assert!(json.contains("\"prerequisiteIds\""));
        let parsed: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, g.snapshot());
    }

    #[test]
    fn export_reflects_current_aggregate_totals() {
        let mut g = graph();
        let base = add_goal(&mut g, "Base", GoalMeta::manual(40));
        let sum = add_goal(&mut g, "Earn 40", GoalMeta::xp_sum(AggregateMeasure::EarnedXp, 40, 10));
        g.update_goal_progress(&base, ProgressUpdate::Complete(true)).unwrap();

        // No derived read in between: export alone must bring the aggregate up to date
        let exported = g.snapshot();
        let exported_sum = exported.goals.iter().find(|goal| goal.id() == sum).unwrap();
        assert!(exported_sum.is_complete());
        assert_eq!(exported_sum.earned_xp(), 10);
        assert_eq!(g.total_earned_xp(), 50);
    }

    #[test]
    fn load_all_replaces_previous_contents() {
        let (mut g, ..) = sample();
        let a = AchievementId::new();
        g.load_all(vec![record(a, "Only", None, &[])], Vec::new()).unwrap();

        assert_eq!(g.len(), 1);
        assert_eq!(g.task_count(), 0);
        assert!(g.get_id_by_title("Intro").is_err());
        assert!(g.goals().is_empty());
        assert_eq!(g.status_of(&a).unwrap(), AchievementStatus::Completed);
    }
}

mod rejection {
    use super::*;

    fn rejected(g: &mut AchievementGraph, achievements: Vec<Achievement>, goals: Vec<Goal>) -> Vec<Violation> {
        let before = g.snapshot();
        let err = g.load_all(achievements, goals).unwrap_err();
        assert_eq!(g.snapshot(), before);
        match err {
            DomainError::InvariantViolation(violations) => violations,
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn cycle_is_reported_with_members() {
        let (mut g, ..) = sample();
        let a = AchievementId::new();
        let b = AchievementId::new();
        let c = AchievementId::new();
        let violations = rejected(
            &mut g,
            vec![
                record(a, "A", None, &[b]),
                record(b, "B", None, &[a]),
                record(c, "C", None, &[a]),
            ],
            Vec::new(),
        );
        let mut members = vec![a, b];
        members.sort();
        assert_eq!(violations, vec![Violation::Cycle { achievement_ids: members }]);
    }

    #[test]
    fn dangling_and_self_references_are_reported() {
        let mut g = graph();
        let a = AchievementId::new();
        let ghost = AchievementId::new();
        let missing_goal = GoalId::new();
        let draft = AchievementDraft::new(title("A"))
            .with_prerequisites([a, ghost])
            .with_goals([missing_goal]);
        let violations = rejected(&mut g, vec![Achievement::from_draft(a, draft, None)], Vec::new());

        assert!(violations.contains(&Violation::SelfReference { achievement_id: a }));
        assert!(violations.contains(&Violation::DanglingPrerequisite {
            achievement_id: a,
            prerequisite_id: ghost,
        }));
        assert!(violations.contains(&Violation::DanglingGoal {
            achievement_id: a,
            goal_id: missing_goal,
        }));
    }

    #[test]
    fn duplicate_titles_and_ids_are_reported() {
        let mut g = graph();
        let a = AchievementId::new();
        let b = AchievementId::new();
        let violations = rejected(
            &mut g,
            vec![record(a, "Same", None, &[]), record(b, "Same", None, &[]), record(a, "Other", None, &[])],
            Vec::new(),
        );
        assert!(violations.contains(&Violation::DuplicateAchievementId { achievement_id: a }));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::DuplicateTitle { title, .. } if title == "Same")));
    }

    #[test]
    fn position_gap_is_reported() {
        let mut g = graph();
        let violations = rejected(
            &mut g,
            vec![
                record(AchievementId::new(), "A", Some(0), &[]),
                record(AchievementId::new(), "B", Some(2), &[]),
            ],
            Vec::new(),
        );
        assert_eq!(
            violations,
            vec![Violation::PositionGap {
                expected: vec![0, 1],
                found: vec![0, 2],
            }]
        );
    }

    #[test]
    fn task_flag_mismatch_is_reported() {
        let mut g = graph();
        let a = AchievementId::new();
        let draft = AchievementDraft::new(title("A")).task();
        let violations = rejected(&mut g, vec![Achievement::from_draft(a, draft, None)], Vec::new());
        assert!(violations.contains(&Violation::TaskFlagMismatch { achievement_id: a }));
    }

    #[test]
    fn malformed_goal_json_is_reported() {
        let mut g = graph();
        let goal: Goal = serde_json::from_value(serde_json::json!({
            "id": GoalId::new(),
            "text": "Broken",
            "meta": { "type": "eventCount", "event": "e", "targetCount": 0, "maxXp": 5 }
        }))
        .unwrap();
        let violations = rejected(&mut g, Vec::new(), vec![goal]);
        assert!(matches!(violations.as_slice(), [Violation::InvalidGoal { .. }]));
    }
}
