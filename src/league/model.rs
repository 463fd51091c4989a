// Domain model: seasons, users, contestants, episodes, picks, and scores.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One season of the show.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Season {
    pub id: String,
    pub name: String,
    pub year: i32,
    /// Whether this is the season new picks are being taken for.
    pub is_active: bool,
}

/// A registered player (or administrator). Administrators may record results
/// and trigger recalculations but their picks are never scored or ranked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

/// A contestant in a season.
///
/// `is_eliminated` is a materialized view over completed episode outcomes.
/// The scoring engine reconciles it on every mutation and the elimination
/// ledger (`league::ledger`) can repair it standalone; it is never set by
/// hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contestant {
    pub id: String,
    pub season_id: String,
    pub name: String,
    pub bio: Option<String>,
    pub is_eliminated: bool,
}

/// One episode of a season. Outcome fields are `None` until the episode is
/// completed; they may be re-asserted by an admin fix, after which all scores
/// are recomputed from scratch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    pub season_id: String,
    pub episode_number: u32,
    pub title: String,
    pub air_date: NaiveDate,
    /// Open for picks.
    pub is_active: bool,
    /// Outcome recorded.
    pub is_completed: bool,
    pub star_baker_id: Option<String>,
    pub eliminated_id: Option<String>,
    pub technical_winner_id: Option<String>,
}

/// The kinds of pick a user can make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PickType {
    /// Season-long prediction of the three finalists.
    Finalist,
    /// Weekly Star Baker prediction.
    StarBaker,
    /// Weekly elimination prediction.
    Elimination,
}

impl PickType {
    /// Database/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PickType::Finalist => "FINALIST",
            PickType::StarBaker => "STAR_BAKER",
            PickType::Elimination => "ELIMINATION",
        }
    }

    /// Parse the database/wire representation.
    pub fn from_str_type(s: &str) -> Option<Self> {
        match s {
            "FINALIST" => Some(PickType::Finalist),
            "STAR_BAKER" => Some(PickType::StarBaker),
            "ELIMINATION" => Some(PickType::Elimination),
            _ => None,
        }
    }

    /// Whether this pick type is tied to a specific episode.
    pub fn is_weekly(&self) -> bool {
        matches!(self, PickType::StarBaker | PickType::Elimination)
    }
}

impl fmt::Display for PickType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single stored pick. `is_correct` and `points` are derived by the scoring
/// engine; they are meaningless until the target episode completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pick {
    pub id: String,
    pub user_id: String,
    pub season_id: String,
    /// `None` for finalist picks.
    pub episode_id: Option<String>,
    pub pick_type: PickType,
    pub contestant_id: String,
    pub is_correct: bool,
    pub points: i32,
    /// ISO-8601 creation timestamp, used for submission-history ordering.
    pub created_at: String,
}

/// Per-user, per-season aggregate, recomputed wholesale by the scoring engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserScore {
    pub user_id: String,
    pub season_id: String,
    pub total_score: i32,
    pub weekly_score: i32,
    pub finalist_score: i32,
    pub correct_star_baker: u32,
    pub correct_elimination: u32,
    pub wrong_star_baker: u32,
    pub wrong_elimination: u32,
    pub technical_challenge_wins: u32,
    pub handshakes: u32,
    pub soggy_bottoms: u32,
    /// Completed episodes in the season as of the recompute.
    pub total_episodes: u32,
    /// Completed episodes in which this user submitted both weekly picks.
    /// Denominator (doubled) of the leaderboard accuracy figure.
    pub total_episodes_with_picks: u32,
}

/// The admin-asserted ground truth for one completed episode, with bonus
/// multisets flattened to one entry per award.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeOutcome {
    pub episode_id: String,
    pub episode_number: u32,
    pub star_baker_id: String,
    pub eliminated_id: String,
    pub technical_winner_id: Option<String>,
    /// One entry per handshake awarded (a contestant may appear repeatedly).
    pub handshakes: Vec<String>,
    /// One entry per soggy-bottom comment.
    pub soggy_bottoms: Vec<String>,
}

impl EpisodeOutcome {
    /// Number of handshakes awarded to `contestant_id` in this episode.
    pub fn handshake_count(&self, contestant_id: &str) -> u32 {
        self.handshakes.iter().filter(|c| *c == contestant_id).count() as u32
    }

    /// Number of soggy-bottom comments for `contestant_id` in this episode.
    pub fn soggy_bottom_count(&self, contestant_id: &str) -> u32 {
        self.soggy_bottoms.iter().filter(|c| *c == contestant_id).count() as u32
    }
}

/// Everything the scoring engine needs to recompute a season, loaded in one
/// read so the recompute is a pure function of this snapshot.
#[derive(Debug, Clone)]
pub struct SeasonSnapshot {
    pub season: Season,
    pub contestants: Vec<Contestant>,
    /// All episodes, ordered by episode number.
    pub episodes: Vec<Episode>,
    /// Outcomes of completed episodes, ordered by episode number.
    pub outcomes: Vec<EpisodeOutcome>,
    /// All picks in the season by non-admin users.
    pub picks: Vec<Pick>,
    /// Non-admin users who have at least one pick in the season.
    pub users: Vec<User>,
    /// The true finalist set, empty until season end.
    pub finalists: Vec<String>,
}

impl SeasonSnapshot {
    /// Look up a contestant by id.
    pub fn contestant(&self, id: &str) -> Option<&Contestant> {
        self.contestants.iter().find(|c| c.id == id)
    }

}
