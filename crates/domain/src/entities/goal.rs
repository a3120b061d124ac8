//! Goal entity - A measurable unit of progress
//!
//! A goal carries its own live progress inside its [`GoalMeta`] variant. The
//! variant decides how progress may change:
//!
//! | Variant      | Progress source                     | XP                      |
//! |--------------|-------------------------------------|-------------------------|
//! | `Manual`     | direct override by a caller         | linear in progress      |
//! | `Assessment` | assessment score signal             | linear in completion    |
//! | `Binary`     | condition signal                    | all-or-nothing          |
//! | `EventCount` | increments and event signals        | linear, capped          |
//! | `XpSum`      | observed totals of other goals      | linear, capped          |
//!
//! Achievements reference goals by id; the goal itself knows nothing about
//! which achievements use it.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::events::GoalUpdate;
use crate::value_objects::GoalText;
use crate::GoalId;

/// What an `XpSum` goal counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregateMeasure {
    /// Total earned XP of all non-aggregate goals
    EarnedXp,
    /// Number of complete non-aggregate goals
    CompletedGoals,
    /// Number of achievements whose own goals are all complete
    CompletedAchievements,
}

/// Totals observed by aggregate goals. Aggregates never count other aggregates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateTotals {
    pub earned_xp: u64,
    pub completed_goals: u64,
    pub completed_achievements: u64,
}

impl AggregateTotals {
    pub fn value_for(&self, measure: AggregateMeasure) -> u64 {
        match measure {
            AggregateMeasure::EarnedXp => self.earned_xp,
            AggregateMeasure::CompletedGoals => self.completed_goals,
            AggregateMeasure::CompletedAchievements => self.completed_achievements,
        }
    }
}

/// How a goal's progress and XP are computed, with its live progress state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GoalMeta {
    #[serde(rename_all = "camelCase")]
    Manual {
        max_xp: u32,
        #[serde(default)]
        progress: f64,
    },
    #[serde(rename_all = "camelCase")]
    Assessment {
        assessment_id: String,
        max_xp: u32,
        #[serde(default)]
        completion: f64,
    },
    #[serde(rename_all = "camelCase")]
    Binary {
        condition: String,
        max_xp: u32,
        #[serde(default)]
        satisfied: bool,
    },
    #[serde(rename_all = "camelCase")]
    EventCount {
        event: String,
        target_count: u32,
        max_xp: u32,
        #[serde(default)]
        count: u32,
    },
    #[serde(rename_all = "camelCase")]
    XpSum {
        measure: AggregateMeasure,
        target: u64,
        max_xp: u32,
        #[serde(default)]
        observed: u64,
    },
}

impl GoalMeta {
    pub fn manual(max_xp: u32) -> Self {
        Self::Manual {
            max_xp,
            progress: 0.0,
        }
    }

    pub fn assessment(assessment_id: impl Into<String>, max_xp: u32) -> Self {
        Self::Assessment {
            assessment_id: assessment_id.into(),
            max_xp,
            completion: 0.0,
        }
    }

    pub fn binary(condition: impl Into<String>, max_xp: u32) -> Self {
        Self::Binary {
            condition: condition.into(),
            max_xp,
            satisfied: false,
        }
    }

    pub fn event_count(event: impl Into<String>, target_count: u32, max_xp: u32) -> Self {
        Self::EventCount {
            event: event.into(),
            target_count,
            max_xp,
            count: 0,
        }
    }

    pub fn xp_sum(measure: AggregateMeasure, target: u64, max_xp: u32) -> Self {
        Self::XpSum {
            measure,
            target,
            max_xp,
            observed: 0,
        }
    }

    /// Short variant name for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Manual { .. } => "manual",
            Self::Assessment { .. } => "assessment",
            Self::Binary { .. } => "binary",
            Self::EventCount { .. } => "eventCount",
            Self::XpSum { .. } => "xpSum",
        }
    }

    pub fn max_xp(&self) -> u32 {
        match self {
            Self::Manual { max_xp, .. }
            | Self::Assessment { max_xp, .. }
            | Self::Binary { max_xp, .. }
            | Self::EventCount { max_xp, .. }
            | Self::XpSum { max_xp, .. } => *max_xp,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Self::XpSum { .. })
    }

    /// Check structural constraints of the variant.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for non-finite or out-of-range
    /// fractions, zero targets, blank keys, or a count above its target.
    pub fn validate(&self) -> Result<(), DomainError> {
        fn fraction(value: f64, what: &str) -> Result<(), DomainError> {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(DomainError::validation(format!(
                    "{} must be between 0 and 1, got {}",
                    what, value
                )));
            }
            Ok(())
        }

        fn key(value: &str, what: &str) -> Result<(), DomainError> {
            if value.trim().is_empty() {
                return Err(DomainError::validation(format!("{} cannot be empty", what)));
            }
            Ok(())
        }

        match self {
            Self::Manual { progress, .. } => fraction(*progress, "Manual progress"),
            Self::Assessment {
                assessment_id,
                completion,
                ..
            } => {
                key(assessment_id, "Assessment id")?;
                fraction(*completion, "Assessment completion")
            }
            Self::Binary { condition, .. } => key(condition, "Binary condition"),
            Self::EventCount {
                event,
                target_count,
                count,
                ..
            } => {
                key(event, "Event name")?;
                if *target_count == 0 {
                    return Err(DomainError::validation("Event target count must be at least 1"));
                }
                if count > target_count {
                    return Err(DomainError::validation(format!(
                        "Event count {} exceeds target {}",
                        count, target_count
                    )));
                }
                Ok(())
            }
            Self::XpSum { target, .. } => {
                if *target == 0 {
                    return Err(DomainError::validation("Aggregate target must be at least 1"));
                }
                Ok(())
            }
        }
    }

    /// Progress in `[0, 1]`.
    pub fn progress_fraction(&self) -> f64 {
        match self {
            Self::Manual { progress, .. } => progress.clamp(0.0, 1.0),
            Self::Assessment { completion, .. } => completion.clamp(0.0, 1.0),
            Self::Binary { satisfied, .. } => {
                if *satisfied {
                    1.0
                } else {
                    0.0
                }
            }
            Self::EventCount {
                target_count,
                count,
                ..
            } => ratio(u64::from(*count), u64::from(*target_count)),
            Self::XpSum {
                target, observed, ..
            } => ratio(*observed, *target),
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            Self::Manual { progress, .. } => *progress >= 1.0,
            Self::Assessment { completion, .. } => *completion >= 1.0,
            Self::Binary { satisfied, .. } => *satisfied,
            Self::EventCount {
                target_count,
                count,
                ..
            } => count >= target_count,
            Self::XpSum {
                target, observed, ..
            } => observed >= target,
        }
    }

    /// XP earned at the current progress.
    pub fn earned_xp(&self) -> u32 {
        match self {
            Self::Manual { max_xp, .. } | Self::Assessment { max_xp, .. } => {
                (f64::from(*max_xp) * self.progress_fraction()).round() as u32
            }
            Self::Binary { max_xp, satisfied, .. } => {
                if *satisfied {
                    *max_xp
                } else {
                    0
                }
            }
            Self::EventCount {
                target_count,
                max_xp,
                count,
                ..
            } => scaled(*max_xp, u64::from(*count), u64::from(*target_count)),
            Self::XpSum {
                target,
                max_xp,
                observed,
                ..
            } => scaled(*max_xp, *observed, *target),
        }
    }
}

fn ratio(value: u64, target: u64) -> f64 {
    if target == 0 {
        return 0.0;
    }
    (value.min(target) as f64) / (target as f64)
}

fn scaled(max_xp: u32, value: u64, target: u64) -> u32 {
    if target == 0 {
        return 0;
    }
    let value = value.min(target);
    // value <= target, so the result never exceeds max_xp
    (u64::from(max_xp) * value / target) as u32
}

/// A direct progress edit requested by a caller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum ProgressUpdate {
    /// Mark a manual goal done or not done
    Complete(bool),
    /// Set a manual goal's progress fraction
    Fraction(f64),
    /// Add occurrences to an event-count goal
    Increment(u32),
}

/// An external input feeding derived-progress goals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GoalSignal {
    #[serde(rename_all = "camelCase")]
    AssessmentScored { assessment_id: String, fraction: f64 },
    #[serde(rename_all = "camelCase")]
    ConditionChanged { condition: String, satisfied: bool },
    #[serde(rename_all = "camelCase")]
    EventOccurred { event: String, occurrences: u32 },
}

/// Definition of a goal before it has been given an id
#[derive(Debug, Clone, PartialEq)]
pub struct GoalDraft {
    pub text: GoalText,
    pub meta: GoalMeta,
}

impl GoalDraft {
    pub fn new(text: GoalText, meta: GoalMeta) -> Self {
        Self { text, meta }
    }
}

/// A measurable unit of progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    id: GoalId,
    text: GoalText,
    meta: GoalMeta,
}

impl Goal {
    /// Create a goal with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the meta is malformed.
    pub fn new(draft: GoalDraft) -> Result<Self, DomainError> {
        draft.meta.validate()?;
        Ok(Self {
            id: GoalId::new(),
            text: draft.text,
            meta: draft.meta,
        })
    }

    /// Set the goal's ID (used when loading from storage).
    pub fn with_id(mut self, id: GoalId) -> Self {
        self.id = id;
        self
    }

    // Read accessors
    pub fn id(&self) -> GoalId {
        self.id
    }

    pub fn text(&self) -> &GoalText {
        &self.text
    }

    pub fn meta(&self) -> &GoalMeta {
        &self.meta
    }

    pub fn progress_fraction(&self) -> f64 {
        self.meta.progress_fraction()
    }

    pub fn earned_xp(&self) -> u32 {
        self.meta.earned_xp()
    }

    pub fn is_complete(&self) -> bool {
        self.meta.is_complete()
    }

    pub fn is_aggregate(&self) -> bool {
        self.meta.is_aggregate()
    }

    // Mutations

    pub fn set_text(&mut self, text: GoalText) -> GoalUpdate {
        let from = std::mem::replace(&mut self.text, text);
        GoalUpdate::TextChanged {
            from,
            to: self.text.clone(),
        }
    }

    /// Replace the goal's meta wholesale.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the new meta is malformed; the
    /// goal is left unchanged.
    pub fn set_meta(&mut self, meta: GoalMeta) -> Result<GoalUpdate, DomainError> {
        meta.validate()?;
        let from = self.meta.kind();
        self.meta = meta;
        Ok(GoalUpdate::MetaReplaced {
            from,
            to: self.meta.kind(),
        })
    }

    /// Apply a direct progress edit.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnsupportedOperation` when the variant derives its
    /// progress or does not accept this kind of edit, and
    /// `DomainError::Validation` for a non-finite fraction.
    pub fn update_progress(&mut self, update: ProgressUpdate) -> Result<GoalUpdate, DomainError> {
        let before = self.progress_fraction();
        match (&mut self.meta, update) {
            (GoalMeta::Manual { progress, .. }, ProgressUpdate::Complete(done)) => {
                *progress = if done { 1.0 } else { 0.0 };
            }
            (GoalMeta::Manual { progress, .. }, ProgressUpdate::Fraction(value)) => {
                if !value.is_finite() {
                    return Err(DomainError::validation("Progress fraction must be finite"));
                }
                *progress = value.clamp(0.0, 1.0);
            }
            (
                GoalMeta::EventCount {
                    target_count,
                    count,
                    ..
                },
                ProgressUpdate::Increment(by),
            ) => {
                *count = count.saturating_add(by).min(*target_count);
            }
            (meta, update) => {
                let reason = match meta {
                    GoalMeta::Assessment { .. } | GoalMeta::Binary { .. } | GoalMeta::XpSum { .. } => {
                        format!("{} goals derive their progress", meta.kind())
                    }
                    _ => format!("{} goals do not accept {:?}", meta.kind(), update),
                };
                return Err(DomainError::unsupported(self.id, reason));
            }
        }
        Ok(GoalUpdate::progress(before, self.progress_fraction()))
    }

    /// Feed an external signal into the goal. Goals not keyed by the signal
    /// report `ProgressUnchanged`.
    pub fn apply_signal(&mut self, signal: &GoalSignal) -> GoalUpdate {
        let before = self.progress_fraction();
        match (&mut self.meta, signal) {
            (
                GoalMeta::Assessment {
                    assessment_id,
                    completion,
                    ..
                },
                GoalSignal::AssessmentScored {
                    assessment_id: scored,
                    fraction,
                },
            ) if assessment_id == scored && fraction.is_finite() => {
                *completion = fraction.clamp(0.0, 1.0);
            }
            (
                GoalMeta::Binary {
                    condition,
                    satisfied,
                    ..
                },
                GoalSignal::ConditionChanged {
                    condition: changed,
                    satisfied: now,
                },
            ) if condition == changed => {
                *satisfied = *now;
            }
            (
                GoalMeta::EventCount {
                    event,
                    target_count,
                    count,
                    ..
                },
                GoalSignal::EventOccurred {
                    event: occurred,
                    occurrences,
                },
            ) if event == occurred => {
                *count = count.saturating_add(*occurrences).min(*target_count);
            }
            _ => return GoalUpdate::ProgressUnchanged,
        }
        GoalUpdate::progress(before, self.progress_fraction())
    }

    /// Refresh an aggregate goal from the latest totals. Non-aggregates ignore it.
    pub fn observe(&mut self, totals: &AggregateTotals) -> GoalUpdate {
        let before = self.progress_fraction();
        match &mut self.meta {
            GoalMeta::XpSum {
                measure, observed, ..
            } => {
                *observed = totals.value_for(*measure);
                GoalUpdate::progress(before, self.progress_fraction())
            }
            _ => GoalUpdate::ProgressUnchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal(meta: GoalMeta) -> Goal {
        Goal::new(GoalDraft::new(GoalText::new("test goal").unwrap(), meta)).unwrap()
    }

    mod event_count {
        use super::*;

        #[test]
        fn increments_scale_xp_and_clamp_at_target() {
            let mut g = goal(GoalMeta::event_count("puzzle_solved", 5, 50));

            g.update_progress(ProgressUpdate::Increment(3)).unwrap();
            assert_eq!(g.earned_xp(), 30);
            assert!(!g.is_complete());

            g.update_progress(ProgressUpdate::Increment(3)).unwrap();
            assert_eq!(g.earned_xp(), 50);
            assert!(g.is_complete());
            assert_eq!(g.progress_fraction(), 1.0);
            assert!(matches!(
                g.meta(),
                GoalMeta::EventCount { count: 5, .. }
            ));
        }

        #[test]
        fn rejects_manual_style_updates() {
            let mut g = goal(GoalMeta::event_count("e", 2, 10));
            let err = g.update_progress(ProgressUpdate::Complete(true)).unwrap_err();
            assert!(matches!(err, DomainError::UnsupportedOperation { .. }));
        }

        #[test]
        fn signal_only_matches_its_event() {
            let mut g = goal(GoalMeta::event_count("login", 3, 30));
            let other = GoalSignal::EventOccurred {
                event: "logout".into(),
                occurrences: 1,
            };
            assert_eq!(g.apply_signal(&other), GoalUpdate::ProgressUnchanged);

            let hit = GoalSignal::EventOccurred {
                event: "login".into(),
                occurrences: 2,
            };
            assert!(matches!(g.apply_signal(&hit), GoalUpdate::ProgressChanged { .. }));
            assert_eq!(g.earned_xp(), 20);
        }
    }

    mod manual {
        use super::*;

        #[test]
        fn toggle_and_fraction() {
            let mut g = goal(GoalMeta::manual(20));
            g.update_progress(ProgressUpdate::Fraction(0.5)).unwrap();
            assert_eq!(g.earned_xp(), 10);
            assert!(!g.is_complete());

            g.update_progress(ProgressUpdate::Complete(true)).unwrap();
            assert!(g.is_complete());
            assert_eq!(g.earned_xp(), 20);

            g.update_progress(ProgressUpdate::Complete(false)).unwrap();
            assert_eq!(g.earned_xp(), 0);
        }

        #[test]
        fn fraction_is_clamped() {
            let mut g = goal(GoalMeta::manual(10));
            g.update_progress(ProgressUpdate::Fraction(4.0)).unwrap();
            assert_eq!(g.progress_fraction(), 1.0);
        }

        #[test]
        fn nan_fraction_is_rejected() {
            let mut g = goal(GoalMeta::manual(10));
            assert!(g.update_progress(ProgressUpdate::Fraction(f64::NAN)).is_err());
            assert_eq!(g.progress_fraction(), 0.0);
        }

        #[test]
        fn unchanged_progress_is_reported() {
            let mut g = goal(GoalMeta::manual(10));
            let update = g.update_progress(ProgressUpdate::Complete(false)).unwrap();
            assert_eq!(update, GoalUpdate::ProgressUnchanged);
        }
    }

    mod derived {
        use super::*;

        #[test]
        fn assessment_and_binary_reject_direct_edits() {
            for meta in [GoalMeta::assessment("quiz-1", 40), GoalMeta::binary("has_avatar", 5)] {
                let mut g = goal(meta);
                let err = g.update_progress(ProgressUpdate::Fraction(1.0)).unwrap_err();
                assert!(matches!(err, DomainError::UnsupportedOperation { .. }));
                assert!(err.to_string().contains("derive their progress"));
            }
        }

        #[test]
        fn assessment_scales_by_completion() {
            let mut g = goal(GoalMeta::assessment("quiz-1", 40));
            g.apply_signal(&GoalSignal::AssessmentScored {
                assessment_id: "quiz-1".into(),
                fraction: 0.25,
            });
            assert_eq!(g.earned_xp(), 10);
            assert!(!g.is_complete());
        }

        #[test]
        fn binary_awards_only_when_satisfied() {
            let mut g = goal(GoalMeta::binary("has_avatar", 5));
            assert_eq!(g.earned_xp(), 0);
            g.apply_signal(&GoalSignal::ConditionChanged {
                condition: "has_avatar".into(),
                satisfied: true,
            });
            assert_eq!(g.earned_xp(), 5);
            assert!(g.is_complete());
        }

        #[test]
        fn xp_sum_observes_totals() {
            let mut g = goal(GoalMeta::xp_sum(AggregateMeasure::CompletedGoals, 4, 100));
            let totals = AggregateTotals {
                completed_goals: 2,
                ..AggregateTotals::default()
            };
            g.observe(&totals);
            assert_eq!(g.earned_xp(), 50);
            assert_eq!(g.progress_fraction(), 0.5);

            let totals = AggregateTotals {
                completed_goals: 9,
                ..AggregateTotals::default()
            };
            g.observe(&totals);
            assert!(g.is_complete());
            assert_eq!(g.earned_xp(), 100);
        }
    }

    mod validation {
        use super::*;

        #[test]
        fn zero_target_is_rejected() {
            let draft = GoalDraft::new(
                GoalText::new("never").unwrap(),
                GoalMeta::event_count("e", 0, 10),
            );
            assert!(Goal::new(draft).is_err());
        }

        #[test]
        fn set_meta_keeps_old_meta_on_error() {
            let mut g = goal(GoalMeta::manual(10));
            let bad = GoalMeta::Manual {
                max_xp: 10,
                progress: 2.0,
            };
            assert!(g.set_meta(bad).is_err());
            assert_eq!(g.meta(), &GoalMeta::manual(10));
        }
    }

    mod serde {
        use super::*;

        #[test]
        fn meta_is_tagged_by_type() {
            let json = serde_json::to_value(GoalMeta::event_count("login", 5, 50)).unwrap();
            assert_eq!(json["type"], "eventCount");
            assert_eq!(json["targetCount"], 5);
            assert_eq!(json["maxXp"], 50);
        }

        #[test]
        fn progress_fields_default_when_missing() {
            let meta: GoalMeta =
                serde_json::from_str(r#"{"type":"binary","condition":"c","maxXp":3}"#).unwrap();
            assert_eq!(meta, GoalMeta::binary("c", 3));
        }
    }
}
