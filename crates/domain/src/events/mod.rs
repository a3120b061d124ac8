//! Mutation outcomes
//!
//! Entity mutations return these enums so callers can tell what actually
//! changed (and skip invalidation when nothing did).

pub mod achievement_events;
pub mod goal_events;

pub use achievement_events::*;
pub use goal_events::*;
