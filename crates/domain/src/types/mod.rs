//! # Questline Domain Types
//!
//! Shared vocabulary types describing derived achievement state.
//!
//! ## Design Principles
//!
//! 1. **Pure data types** - No I/O, no side effects
//! 2. **Serializable** - All types derive Serialize/Deserialize

mod status;
pub use status::{AchievementStatus, DerivedState};
