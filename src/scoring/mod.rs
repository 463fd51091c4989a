//! Scoring: the pure rule table, the recompute engine, and the leaderboard
//! projection built on top of it.

pub mod engine;
pub mod leaderboard;
pub mod rules;

pub use engine::{BonusKind, ScoringEngine};
pub use leaderboard::{build_leaderboard, LeaderboardEntry};
