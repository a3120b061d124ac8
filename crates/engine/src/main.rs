//! Questline - loads an achievement snapshot and prints derived progress.
//!
//! Usage: `questline [SNAPSHOT_JSON]`. Without an argument the path is taken
//! from `QUESTLINE_SNAPSHOT_PATH`.

use std::path::PathBuf;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use questline_engine::{AchievementGraph, EngineConfig, Snapshot};

fn main() -> anyhow::Result<()> {
    // Load environment from repo root so local overrides apply from any cwd.
    load_dotenv_from_repo_root();

    let config = EngineConfig::from_env()?;

    // Initialize logging
    let filter = config
        .log_filter
        .clone()
        .map(tracing_subscriber::EnvFilter::new)
        .or_else(|| tracing_subscriber::EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| "questline_engine=info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.snapshot_path.clone())
        .context("no snapshot given: pass a path or set QUESTLINE_SNAPSHOT_PATH")?;

    tracing::info!(path = %path.display(), "Loading achievement snapshot");
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let mut graph = match AchievementGraph::from_snapshot(config.settings.clone(), snapshot) {
        Ok(graph) => graph,
        Err(err) => {
            for violation in err.violations() {
                tracing::error!(?violation, "Snapshot problem");
            }
            return Err(err).context("snapshot rejected");
        }
    };

    for (id, state) in graph.derived_states()? {
        let achievement = graph.get_achievement(&id)?;
        let slot = match achievement.position() {
            Some(position) => format!("#{}", position),
            None => "-".to_string(),
        };
        println!(
            "{:>4}  {:<11} {:>6} xp  {}",
            slot,
            state.status.as_str(),
            state.xp,
            achievement.title()
        );
    }
    println!("total: {} xp", graph.total_earned_xp());

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
