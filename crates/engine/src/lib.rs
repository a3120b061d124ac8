//! Questline Engine library.
//!
//! In-memory achievement dependency engine: a validated prerequisite graph,
//! a goal store, and lazily derived status and XP per achievement.
//!
//! ## Structure
//!
//! - `registry` - Id / slot / label bookkeeping shared by achievements and goals
//! - `goal_store` - Goal definitions, progress, and reverse references
//! - `graph` - The achievement graph aggregate, queries, and bulk load/export
//! - `derivation` - Derived-state cache (internal)
//! - `config` - Environment-driven configuration

pub mod config;
mod derivation;
pub mod goal_store;
pub mod graph;
pub mod registry;

pub use config::EngineConfig;
pub use goal_store::GoalStore;
pub use graph::{AchievementGraph, Snapshot};
pub use registry::{Registry, Slot};

pub use questline_domain;
