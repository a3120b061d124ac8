//! Engine configuration loaded from the environment.
//!
//! Every value is optional; unset variables fall back to [`EngineSettings`]
//! defaults. Set variables must parse, so a typo fails loudly instead of
//! silently using a default.

use std::path::PathBuf;

use anyhow::Context;
use questline_domain::EngineSettings;

pub const SNAPSHOT_PATH_VAR: &str = "QUESTLINE_SNAPSHOT_PATH";
pub const LOG_FILTER_VAR: &str = "QUESTLINE_LOG";

const MAX_TITLE_LENGTH_VAR: &str = "QUESTLINE_MAX_TITLE_LENGTH";
const MAX_GOAL_TEXT_LENGTH_VAR: &str = "QUESTLINE_MAX_GOAL_TEXT_LENGTH";
const MAX_PREREQUISITES_VAR: &str = "QUESTLINE_MAX_PREREQUISITES";
const MAX_GOALS_VAR: &str = "QUESTLINE_MAX_GOALS";

/// Process-level configuration for the `questline` binary and embedding hosts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub settings: EngineSettings,
    pub snapshot_path: Option<PathBuf>,
    pub log_filter: Option<String>,
}

impl EngineConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let value = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let limit = |key: &str, default: usize| -> anyhow::Result<usize> {
            match value(key) {
                Some(raw) => raw
                    .parse()
                    .with_context(|| format!("{} must be a non-negative integer, got '{}'", key, raw)),
                None => Ok(default),
            }
        };

        let defaults = EngineSettings::default();
        let settings = EngineSettings {
            max_title_length: limit(MAX_TITLE_LENGTH_VAR, defaults.max_title_length)?,
            max_goal_text_length: limit(MAX_GOAL_TEXT_LENGTH_VAR, defaults.max_goal_text_length)?,
            max_prerequisites_per_achievement: limit(
                MAX_PREREQUISITES_VAR,
                defaults.max_prerequisites_per_achievement,
            )?,
            max_goals_per_achievement: limit(MAX_GOALS_VAR, defaults.max_goals_per_achievement)?,
        }
        .normalized();

        Ok(Self {
            settings,
            snapshot_path: value(SNAPSHOT_PATH_VAR).map(PathBuf::from),
            log_filter: value(LOG_FILTER_VAR),
        })
    }
}
