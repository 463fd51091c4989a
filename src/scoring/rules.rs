//! Pure scoring rules: how a single pick scores against a recorded outcome.
//!
//! Everything here is a total function of its inputs, so the engine can
//! replay any season from picks and outcomes alone.

use crate::config::ScoringRules;
use crate::league::model::EpisodeOutcome;

/// Counter deltas produced by scoring one pick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub correct_star_baker: u32,
    pub correct_elimination: u32,
    pub wrong_star_baker: u32,
    pub wrong_elimination: u32,
    pub technical_challenge_wins: u32,
    pub handshakes: u32,
    pub soggy_bottoms: u32,
}

/// Result of scoring one pick: points, the correctness verdict stored on the
/// pick row, and the counter deltas folded into the user's aggregates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PickScore {
    pub points: i32,
    pub is_correct: bool,
    pub counters: Counters,
}

/// Score a Star Baker pick. A correct pick also collects the episode's
/// bonuses for that contestant: technical challenge win, handshakes, and
/// soggy bottoms. A pick of the eliminated contestant takes the inversion
/// penalty; any other contestant is neutral.
pub fn score_star_baker_pick(
    rules: &ScoringRules,
    picked: &str,
    outcome: &EpisodeOutcome,
) -> PickScore {
    if picked == outcome.star_baker_id {
        let technical_wins = u32::from(outcome.technical_winner_id.as_deref() == Some(picked));
        let handshakes = outcome.handshake_count(picked);
        let soggy_bottoms = outcome.soggy_bottom_count(picked);
        let points = rules.star_baker_correct
            + rules.technical_challenge_win * technical_wins as i32
            + rules.handshake * handshakes as i32
            + rules.soggy_bottom * soggy_bottoms as i32;
        PickScore {
            points,
            is_correct: true,
            counters: Counters {
                correct_star_baker: 1,
                technical_challenge_wins: technical_wins,
                handshakes,
                soggy_bottoms,
                ..Default::default()
            },
        }
    } else if picked == outcome.eliminated_id {
        PickScore {
            points: rules.star_baker_eliminated,
            is_correct: false,
            counters: Counters {
                wrong_star_baker: 1,
                ..Default::default()
            },
        }
    } else {
        PickScore::default()
    }
}

/// Score an Elimination pick. Picking the Star Baker takes the inversion
/// penalty; any contestant other than the eliminated one is neutral.
pub fn score_elimination_pick(
    rules: &ScoringRules,
    picked: &str,
    outcome: &EpisodeOutcome,
) -> PickScore {
    if picked == outcome.eliminated_id {
        PickScore {
            points: rules.elimination_correct,
            is_correct: true,
            counters: Counters {
                correct_elimination: 1,
                ..Default::default()
            },
        }
    } else if picked == outcome.star_baker_id {
        PickScore {
            points: rules.elimination_star_baker,
            is_correct: false,
            counters: Counters {
                wrong_elimination: 1,
                ..Default::default()
            },
        }
    } else {
        PickScore::default()
    }
}

/// Score a Finalist pick against the recorded finalists. Wrong finalist
/// picks are neutral; the upside-only rule keeps season-long picks from
/// dominating the weekly game.
pub fn score_finalist_pick(rules: &ScoringRules, picked: &str, finalists: &[String]) -> PickScore {
    if finalists.iter().any(|f| f == picked) {
        PickScore {
            points: rules.finalist_correct,
            is_correct: true,
            counters: Counters::default(),
        }
    } else {
        PickScore::default()
    }
}

impl Counters {
    pub fn add(&mut self, other: &Counters) {
        self.correct_star_baker += other.correct_star_baker;
        self.correct_elimination += other.correct_elimination;
        self.wrong_star_baker += other.wrong_star_baker;
        self.wrong_elimination += other.wrong_elimination;
        self.technical_challenge_wins += other.technical_challenge_wins;
        self.handshakes += other.handshakes;
        self.soggy_bottoms += other.soggy_bottoms;
    }
}
