//! The scoring engine: records episode outcomes and recomputes season scores.
//!
//! There is no incremental bookkeeping. Every mutation (outcome recorded,
//! bonus changed, finalists scored) runs the same full recompute from the
//! season snapshot inside the mutating transaction, so repeated recording of
//! the same outcome converges instead of double-counting.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::info;

use crate::config::{Config, LeagueRules, ScoringRules};
use crate::db::{self, LeagueDb};
use crate::error::LeagueError;
use crate::league::ledger;
use crate::league::model::{EpisodeOutcome, PickType, SeasonSnapshot, UserScore};
use crate::live::{LiveEvent, Publisher};
use crate::scoring::rules::{self, Counters, PickScore};

/// Which bonus multiset a bonus operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BonusKind {
    Handshake,
    SoggyBottom,
}

impl BonusKind {
    fn table(self) -> &'static str {
        match self {
            BonusKind::Handshake => "episode_handshakes",
            BonusKind::SoggyBottom => "episode_soggy_bottoms",
        }
    }
}

/// Per-pick verdict produced by a recompute, written back to the pick row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickResult {
    pub pick_id: String,
    pub is_correct: bool,
    pub points: i32,
}

/// Everything a recompute produces: one score row per participating user and
/// one result per pick.
#[derive(Debug, Clone, Default)]
pub struct RecomputeOutput {
    pub scores: Vec<UserScore>,
    pub pick_results: Vec<PickResult>,
}

/// One user's contribution from a single episode: weekly points, counter
/// deltas, and whether the episode counts toward their accuracy denominator.
pub fn episode_delta(
    scoring: &ScoringRules,
    outcome: &EpisodeOutcome,
    star_pick: Option<&str>,
    elim_pick: Option<&str>,
) -> (i32, Counters, bool) {
    let mut points = 0;
    let mut counters = Counters::default();
    if let Some(picked) = star_pick {
        let score = rules::score_star_baker_pick(scoring, picked, outcome);
        points += score.points;
        counters.add(&score.counters);
    }
    if let Some(picked) = elim_pick {
        let score = rules::score_elimination_pick(scoring, picked, outcome);
        points += score.points;
        counters.add(&score.counters);
    }
    (points, counters, star_pick.is_some() && elim_pick.is_some())
}

/// Recompute every user's season score from scratch. Pure function of the
/// snapshot: replaying it against the same snapshot always yields the same
/// output.
pub fn recompute_season(scoring: &ScoringRules, snapshot: &SeasonSnapshot) -> RecomputeOutput {
    let outcomes: HashMap<&str, &EpisodeOutcome> = snapshot
        .outcomes
        .iter()
        .map(|o| (o.episode_id.as_str(), o))
        .collect();

    let mut scores: HashMap<String, UserScore> = snapshot
        .users
        .iter()
        .map(|u| {
            (
                u.id.clone(),
                UserScore {
                    user_id: u.id.clone(),
                    season_id: snapshot.season.id.clone(),
                    ..Default::default()
                },
            )
        })
        .collect();

    // Per-user, per-episode weekly pick presence for the accuracy denominator.
    let mut weekly_presence: HashMap<(String, String), (bool, bool)> = HashMap::new();

    let mut pick_results = Vec::with_capacity(snapshot.picks.len());
    let mut totals: HashMap<String, Counters> = HashMap::new();

    for pick in &snapshot.picks {
        let verdict: PickScore = match pick.pick_type {
            PickType::StarBaker | PickType::Elimination => {
                match pick.episode_id.as_deref().and_then(|e| outcomes.get(e)) {
                    // Episode not completed yet: the pick stays unscored.
                    None => PickScore::default(),
                    Some(outcome) => {
                        if let Some(episode_id) = pick.episode_id.as_deref() {
                            let entry = weekly_presence
                                .entry((pick.user_id.clone(), episode_id.to_string()))
                                .or_default();
                            match pick.pick_type {
                                PickType::StarBaker => entry.0 = true,
                                _ => entry.1 = true,
                            }
                        }
                        match pick.pick_type {
                            PickType::StarBaker => {
                                rules::score_star_baker_pick(scoring, &pick.contestant_id, outcome)
                            }
                            _ => rules::score_elimination_pick(
                                scoring,
                                &pick.contestant_id,
                                outcome,
                            ),
                        }
                    }
                }
            }
            PickType::Finalist => {
                rules::score_finalist_pick(scoring, &pick.contestant_id, &snapshot.finalists)
            }
        };

        if let Some(score) = scores.get_mut(&pick.user_id) {
            match pick.pick_type {
                PickType::Finalist => score.finalist_score += verdict.points,
                _ => score.weekly_score += verdict.points,
            }
            totals
                .entry(pick.user_id.clone())
                .or_default()
                .add(&verdict.counters);
        }

        pick_results.push(PickResult {
            pick_id: pick.id.clone(),
            is_correct: verdict.is_correct,
            points: verdict.points,
        });
    }

    for ((user_id, _), (has_star, has_elim)) in &weekly_presence {
        if *has_star && *has_elim {
            if let Some(score) = scores.get_mut(user_id) {
                score.total_episodes_with_picks += 1;
            }
        }
    }

    let completed_episodes = snapshot.outcomes.len() as u32;
    let mut scores: Vec<UserScore> = scores
        .into_iter()
        .map(|(user_id, mut score)| {
            score.total_episodes = completed_episodes;
            if let Some(counters) = totals.get(&user_id) {
                score.correct_star_baker = counters.correct_star_baker;
                score.correct_elimination = counters.correct_elimination;
                score.wrong_star_baker = counters.wrong_star_baker;
                score.wrong_elimination = counters.wrong_elimination;
                score.technical_challenge_wins = counters.technical_challenge_wins;
                score.handshakes = counters.handshakes;
                score.soggy_bottoms = counters.soggy_bottoms;
            }
            score.total_score = score.weekly_score + score.finalist_score;
            score
        })
        .collect();
    scores.sort_by(|a, b| a.user_id.cmp(&b.user_id));

    RecomputeOutput {
        scores,
        pick_results,
    }
}

/// Records admin ground truth and keeps scores, pick verdicts, and
/// elimination flags consistent with it.
pub struct ScoringEngine {
    db: Arc<LeagueDb>,
    publisher: Arc<dyn Publisher>,
    league: LeagueRules,
    scoring: ScoringRules,
}

impl ScoringEngine {
    pub fn new(db: Arc<LeagueDb>, publisher: Arc<dyn Publisher>, config: &Config) -> Self {
        Self {
            db,
            publisher,
            league: config.league.clone(),
            scoring: config.scoring,
        }
    }

    /// Record (or re-assert) an episode's outcome: Star Baker, eliminated
    /// contestant, closed for picks, scores recomputed. One transaction.
    pub fn record_episode_result(
        &self,
        episode_id: &str,
        star_baker_id: &str,
        eliminated_id: &str,
    ) -> Result<(), LeagueError> {
        if star_baker_id == eliminated_id {
            return Err(LeagueError::validation(
                "eliminated_id",
                "a contestant cannot be both Star Baker and eliminated",
            ));
        }

        let season_id = self.db.transaction(|tx| {
            let Some(episode) = db::get_episode(tx, episode_id)? else {
                return Err(LeagueError::not_found("episode", episode_id));
            };
            let snapshot = require_snapshot(tx, &episode.season_id)?;

            for contestant_id in [star_baker_id, eliminated_id] {
                if snapshot.contestant(contestant_id).is_none() {
                    return Err(LeagueError::not_found("contestant", contestant_id));
                }
            }

            // A contestant eliminated by some OTHER completed episode cannot
            // appear in this outcome. The episode's own previous outcome is
            // ignored so an admin can re-assert or correct it.
            let eliminated_elsewhere: HashSet<&str> = snapshot
                .outcomes
                .iter()
                .filter(|o| o.episode_id != episode_id)
                .map(|o| o.eliminated_id.as_str())
                .collect();
            for contestant_id in [star_baker_id, eliminated_id] {
                if eliminated_elsewhere.contains(contestant_id) {
                    return Err(LeagueError::EliminatedContestant {
                        contestant_id: contestant_id.to_string(),
                    });
                }
            }

            db::write_episode_outcome(tx, episode_id, star_baker_id, eliminated_id)?;
            recompute_and_persist(tx, &self.scoring, &episode.season_id)?;
            Ok(episode.season_id)
        })?;

        info!(episode_id, star_baker_id, eliminated_id, "recorded episode result");
        self.publisher.publish(LiveEvent::EpisodeCompleted {
            season_id: season_id.clone(),
            episode_id: episode_id.to_string(),
        });
        self.publisher
            .publish(LiveEvent::ScoresUpdated { season_id });
        Ok(())
    }

    /// Full recompute of a season on demand. Returns the number of users
    /// scored.
    pub fn recalculate_season_scores(&self, season_id: &str) -> Result<usize, LeagueError> {
        let scored = self
            .db
            .transaction(|tx| recompute_and_persist(tx, &self.scoring, season_id))?;
        info!(season_id, scored, "recalculated season scores");
        self.publisher.publish(LiveEvent::ScoresUpdated {
            season_id: season_id.to_string(),
        });
        Ok(scored)
    }

    /// Record the season's finalists and score every Finalist pick against
    /// them. Re-recording with a different set converges to the new truth.
    pub fn score_finalists(
        &self,
        season_id: &str,
        finalist_ids: &[String],
    ) -> Result<(), LeagueError> {
        let expected = self.league.finalist_count;
        if finalist_ids.len() as u32 != expected {
            return Err(LeagueError::FinalistCount {
                expected,
                got: finalist_ids.len() as u32,
            });
        }
        let distinct: HashSet<&String> = finalist_ids.iter().collect();
        if distinct.len() != finalist_ids.len() {
            return Err(LeagueError::validation(
                "finalist_ids",
                "finalists must be distinct contestants",
            ));
        }

        self.db.transaction(|tx| {
            let snapshot = require_snapshot(tx, season_id)?;
            for contestant_id in finalist_ids {
                if snapshot.contestant(contestant_id).is_none() {
                    return Err(LeagueError::not_found("contestant", contestant_id));
                }
            }
            db::replace_season_finalists(tx, season_id, finalist_ids)?;
            recompute_and_persist(tx, &self.scoring, season_id)?;
            Ok(())
        })?;

        info!(season_id, ?finalist_ids, "scored finalist picks");
        self.publisher.publish(LiveEvent::ScoresUpdated {
            season_id: season_id.to_string(),
        });
        Ok(())
    }

    /// Set or clear an episode's Technical Challenge winner. One winner per
    /// episode; setting overwrites.
    pub fn set_technical_winner(
        &self,
        episode_id: &str,
        contestant_id: Option<&str>,
    ) -> Result<(), LeagueError> {
        let season_id = self.db.transaction(|tx| {
            let Some(episode) = db::get_episode(tx, episode_id)? else {
                return Err(LeagueError::not_found("episode", episode_id));
            };
            if let Some(contestant_id) = contestant_id {
                require_season_contestant(tx, &episode.season_id, contestant_id)?;
            }
            db::set_technical_winner(tx, episode_id, contestant_id)?;
            recompute_and_persist(tx, &self.scoring, &episode.season_id)?;
            Ok(episode.season_id)
        })?;
        self.publisher
            .publish(LiveEvent::ScoresUpdated { season_id });
        Ok(())
    }

    /// Append one bonus entry (a contestant can hold several per episode).
    pub fn add_bonus(
        &self,
        episode_id: &str,
        contestant_id: &str,
        kind: BonusKind,
    ) -> Result<(), LeagueError> {
        self.mutate_bonus(episode_id, contestant_id, |tx| {
            db::add_bonus_entry(tx, kind.table(), episode_id, contestant_id)?;
            Ok(())
        })
    }

    /// Set the exact number of entries a contestant holds in an episode by
    /// clearing and re-adding.
    pub fn set_bonus_count(
        &self,
        episode_id: &str,
        contestant_id: &str,
        kind: BonusKind,
        count: u32,
    ) -> Result<(), LeagueError> {
        self.mutate_bonus(episode_id, contestant_id, |tx| {
            db::delete_bonus_entries(tx, kind.table(), episode_id, contestant_id)?;
            for _ in 0..count {
                db::add_bonus_entry(tx, kind.table(), episode_id, contestant_id)?;
            }
            Ok(())
        })
    }

    /// Remove every entry of the given kind for a contestant in an episode.
    pub fn remove_bonus(
        &self,
        episode_id: &str,
        contestant_id: &str,
        kind: BonusKind,
    ) -> Result<(), LeagueError> {
        self.mutate_bonus(episode_id, contestant_id, |tx| {
            db::delete_bonus_entries(tx, kind.table(), episode_id, contestant_id)?;
            Ok(())
        })
    }

    fn mutate_bonus(
        &self,
        episode_id: &str,
        contestant_id: &str,
        apply: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<(), LeagueError>,
    ) -> Result<(), LeagueError> {
        let season_id = self.db.transaction(|tx| {
            let Some(episode) = db::get_episode(tx, episode_id)? else {
                return Err(LeagueError::not_found("episode", episode_id));
            };
            require_season_contestant(tx, &episode.season_id, contestant_id)?;
            apply(tx)?;
            recompute_and_persist(tx, &self.scoring, &episode.season_id)?;
            Ok(episode.season_id)
        })?;
        self.publisher
            .publish(LiveEvent::ScoresUpdated { season_id });
        Ok(())
    }
}

fn require_snapshot(
    tx: &rusqlite::Transaction<'_>,
    season_id: &str,
) -> Result<SeasonSnapshot, LeagueError> {
    db::load_season_snapshot(tx, season_id)?
        .ok_or_else(|| LeagueError::not_found("season", season_id))
}

fn require_season_contestant(
    tx: &rusqlite::Transaction<'_>,
    season_id: &str,
    contestant_id: &str,
) -> Result<(), LeagueError> {
    match db::get_contestant(tx, contestant_id)? {
        Some(c) if c.season_id == season_id => Ok(()),
        _ => Err(LeagueError::not_found("contestant", contestant_id)),
    }
}

/// Recompute a season from its snapshot and persist scores, pick verdicts,
/// and elimination flags, all within the caller's transaction. Returns the
/// number of users scored.
fn recompute_and_persist(
    tx: &rusqlite::Transaction<'_>,
    scoring: &ScoringRules,
    season_id: &str,
) -> Result<usize, LeagueError> {
    let snapshot = require_snapshot(tx, season_id)?;
    let output = recompute_season(scoring, &snapshot);

    db::delete_season_scores(tx, season_id)?;
    for score in &output.scores {
        db::upsert_user_score(tx, score)?;
    }
    for result in &output.pick_results {
        db::write_pick_result(tx, &result.pick_id, result.is_correct, result.points)?;
    }

    let eliminated = ledger::eliminated_ids(&snapshot.outcomes);
    for contestant in &snapshot.contestants {
        let should_be = eliminated.contains(&contestant.id);
        if contestant.is_eliminated != should_be {
            db::set_contestant_eliminated(tx, &contestant.id, should_be)?;
        }
    }

    Ok(output.scores.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::model::{Pick, Season, User};

    fn scoring() -> ScoringRules {
        ScoringRules::default()
    }

    fn outcome(episode: &str, number: u32, star: &str, gone: &str) -> EpisodeOutcome {
        EpisodeOutcome {
            episode_id: episode.into(),
            episode_number: number,
            star_baker_id: star.into(),
            eliminated_id: gone.into(),
            technical_winner_id: None,
            handshakes: Vec::new(),
            soggy_bottoms: Vec::new(),
        }
    }

    fn pick(id: &str, user: &str, episode: Option<&str>, ty: PickType, contestant: &str) -> Pick {
        Pick {
            id: id.into(),
            user_id: user.into(),
            season_id: "s".into(),
            episode_id: episode.map(String::from),
            pick_type: ty,
            contestant_id: contestant.into(),
            is_correct: false,
            points: 0,
            created_at: String::new(),
        }
    }

    fn user(id: &str) -> User {
        User {
            id: id.into(),
            name: id.to_uppercase(),
            email: format!("{id}@example.com"),
            is_admin: false,
        }
    }

    fn snapshot(
        outcomes: Vec<EpisodeOutcome>,
        picks: Vec<Pick>,
        users: Vec<User>,
        finalists: Vec<String>,
    ) -> SeasonSnapshot {
        SeasonSnapshot {
            season: Season {
                id: "s".into(),
                name: "Series 16".into(),
                year: 2026,
                is_active: true,
            },
            contestants: Vec::new(),
            episodes: Vec::new(),
            outcomes,
            picks,
            users,
            finalists,
        }
    }

    fn score_for<'a>(output: &'a RecomputeOutput, user_id: &str) -> &'a UserScore {
        output
            .scores
            .iter()
            .find(|s| s.user_id == user_id)
            .expect("user should have a score row")
    }

    // ------------------------------------------------------------------
    // recompute_season
    // ------------------------------------------------------------------

    #[test]
    fn recompute_scores_correct_weekly_picks() {
        let snap = snapshot(
            vec![outcome("e1", 1, "a", "c")],
            vec![
                pick("p1", "u1", Some("e1"), PickType::StarBaker, "a"),
                pick("p2", "u1", Some("e1"), PickType::Elimination, "c"),
            ],
            vec![user("u1")],
            Vec::new(),
        );

        let output = recompute_season(&scoring(), &snap);
        let score = score_for(&output, "u1");
        assert_eq!(score.weekly_score, 5);
        assert_eq!(score.total_score, 5);
        assert_eq!(score.correct_star_baker, 1);
        assert_eq!(score.correct_elimination, 1);
        assert_eq!(score.total_episodes, 1);
        assert_eq!(score.total_episodes_with_picks, 1);

        assert_eq!(
            output.pick_results,
            vec![
                PickResult { pick_id: "p1".into(), is_correct: true, points: 3 },
                PickResult { pick_id: "p2".into(), is_correct: true, points: 2 },
            ]
        );
    }

    #[test]
    fn correct_star_baker_with_bonuses_stacks_onto_the_week() {
        let mut out = outcome("e1", 1, "a", "c");
        out.technical_winner_id = Some("a".into());
        out.handshakes = vec!["a".into()];
        let snap = snapshot(
            vec![out],
            vec![
                pick("p1", "u1", Some("e1"), PickType::StarBaker, "a"),
                pick("p2", "u1", Some("e1"), PickType::Elimination, "c"),
            ],
            vec![user("u1")],
            Vec::new(),
        );

        let output = recompute_season(&scoring(), &snap);
        let score = score_for(&output, "u1");
        // 3 + 1 technical + 1 handshake for the Star Baker pick, 2 for the
        // elimination pick.
        assert_eq!(score.weekly_score, 7);
        assert_eq!(score.total_score, 7);
        assert_eq!(score.correct_star_baker, 1);
        assert_eq!(score.correct_elimination, 1);
        assert_eq!(score.technical_challenge_wins, 1);
        assert_eq!(score.handshakes, 1);
    }

    #[test]
    fn recompute_applies_inversion_penalties() {
        let snap = snapshot(
            vec![outcome("e1", 1, "a", "c")],
            vec![
                pick("p1", "u1", Some("e1"), PickType::StarBaker, "c"),
                pick("p2", "u1", Some("e1"), PickType::Elimination, "a"),
            ],
            vec![user("u1")],
            Vec::new(),
        );

        let output = recompute_season(&scoring(), &snap);
        let score = score_for(&output, "u1");
        assert_eq!(score.weekly_score, -6);
        assert_eq!(score.wrong_star_baker, 1);
        assert_eq!(score.wrong_elimination, 1);
        assert_eq!(score.correct_star_baker, 0);
        // Both picks present, so the episode still counts toward accuracy.
        assert_eq!(score.total_episodes_with_picks, 1);
    }

    #[test]
    fn neutral_picks_leave_no_trace_but_count_the_episode() {
        let snap = snapshot(
            vec![outcome("e1", 1, "a", "c")],
            vec![
                pick("p1", "u1", Some("e1"), PickType::StarBaker, "b"),
                pick("p2", "u1", Some("e1"), PickType::Elimination, "b"),
            ],
            vec![user("u1")],
            Vec::new(),
        );

        let output = recompute_season(&scoring(), &snap);
        let score = score_for(&output, "u1");
        assert_eq!(score.weekly_score, 0);
        assert_eq!(score.correct_star_baker + score.wrong_star_baker, 0);
        assert_eq!(score.correct_elimination + score.wrong_elimination, 0);
        assert_eq!(score.total_episodes_with_picks, 1);

        assert!(output.pick_results.iter().all(|r| !r.is_correct && r.points == 0));
    }

    #[test]
    fn incomplete_episode_picks_stay_unscored() {
        let snap = snapshot(
            Vec::new(),
            vec![pick("p1", "u1", Some("e1"), PickType::StarBaker, "a")],
            vec![user("u1")],
            Vec::new(),
        );

        let output = recompute_season(&scoring(), &snap);
        let score = score_for(&output, "u1");
        assert_eq!(score.total_score, 0);
        assert_eq!(score.total_episodes, 0);
        assert_eq!(score.total_episodes_with_picks, 0);
        assert_eq!(output.pick_results[0].points, 0);
    }

    #[test]
    fn single_weekly_pick_does_not_count_episode() {
        let snap = snapshot(
            vec![outcome("e1", 1, "a", "c")],
            vec![pick("p1", "u1", Some("e1"), PickType::StarBaker, "a")],
            vec![user("u1")],
            Vec::new(),
        );

        let output = recompute_season(&scoring(), &snap);
        let score = score_for(&output, "u1");
        assert_eq!(score.weekly_score, 3);
        assert_eq!(score.total_episodes, 1);
        assert_eq!(score.total_episodes_with_picks, 0);
    }

    #[test]
    fn finalist_picks_score_against_recorded_finalists() {
        let snap = snapshot(
            Vec::new(),
            vec![
                pick("p1", "u1", None, PickType::Finalist, "a"),
                pick("p2", "u1", None, PickType::Finalist, "b"),
                pick("p3", "u1", None, PickType::Finalist, "x"),
            ],
            vec![user("u1")],
            vec!["a".into(), "b".into(), "c".into()],
        );

        let output = recompute_season(&scoring(), &snap);
        let score = score_for(&output, "u1");
        assert_eq!(score.finalist_score, 6);
        assert_eq!(score.weekly_score, 0);
        assert_eq!(score.total_score, 6);
    }

    #[test]
    fn finalist_picks_unscored_until_finalists_recorded() {
        let snap = snapshot(
            Vec::new(),
            vec![pick("p1", "u1", None, PickType::Finalist, "a")],
            vec![user("u1")],
            Vec::new(),
        );

        let output = recompute_season(&scoring(), &snap);
        assert_eq!(score_for(&output, "u1").finalist_score, 0);
    }

    #[test]
    fn recompute_is_deterministic() {
        let snap = snapshot(
            vec![outcome("e1", 1, "a", "c"), outcome("e2", 2, "b", "d")],
            vec![
                pick("p1", "u1", Some("e1"), PickType::StarBaker, "a"),
                pick("p2", "u1", Some("e1"), PickType::Elimination, "d"),
                pick("p3", "u2", Some("e2"), PickType::StarBaker, "b"),
            ],
            vec![user("u1"), user("u2")],
            Vec::new(),
        );

        let first = recompute_season(&scoring(), &snap);
        let second = recompute_season(&scoring(), &snap);
        assert_eq!(first.scores, second.scores);
        assert_eq!(first.pick_results, second.pick_results);
    }

    #[test]
    fn recompute_matches_sum_of_episode_deltas() {
        // Exhaustive check over all weekly pick combinations for a two
        // episode season with three relevant contestants.
        let contestants = ["a", "c", "x"];
        let outcomes = vec![outcome("e1", 1, "a", "c"), outcome("e2", 2, "x", "a")];

        for sb1 in contestants {
            for el1 in contestants {
                for sb2 in contestants {
                    let picks = vec![
                        pick("p1", "u1", Some("e1"), PickType::StarBaker, sb1),
                        pick("p2", "u1", Some("e1"), PickType::Elimination, el1),
                        pick("p3", "u1", Some("e2"), PickType::StarBaker, sb2),
                    ];
                    let snap = snapshot(outcomes.clone(), picks, vec![user("u1")], Vec::new());
                    let output = recompute_season(&scoring(), &snap);
                    let score = score_for(&output, "u1");

                    let (pts1, mut counters, counted1) =
                        episode_delta(&scoring(), &outcomes[0], Some(sb1), Some(el1));
                    let (pts2, c2, counted2) =
                        episode_delta(&scoring(), &outcomes[1], Some(sb2), None);
                    counters.add(&c2);

                    assert_eq!(score.weekly_score, pts1 + pts2);
                    assert_eq!(score.correct_star_baker, counters.correct_star_baker);
                    assert_eq!(score.wrong_star_baker, counters.wrong_star_baker);
                    assert_eq!(score.correct_elimination, counters.correct_elimination);
                    assert_eq!(score.wrong_elimination, counters.wrong_elimination);
                    assert_eq!(
                        score.total_episodes_with_picks,
                        u32::from(counted1) + u32::from(counted2)
                    );
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // ScoringEngine against a real database
    // ------------------------------------------------------------------

    struct Fixture {
        engine: ScoringEngine,
        db: Arc<LeagueDb>,
        season: String,
    }

    fn fixture() -> Fixture {
        use crate::league::model::{Contestant, Episode};

        let db = Arc::new(LeagueDb::open(":memory:").unwrap());
        let config = Config::default();
        let engine = ScoringEngine::new(
            Arc::clone(&db),
            Arc::new(crate::live::NoopPublisher),
            &config,
        );

        db.transaction(|tx| {
            db::insert_season(
                tx,
                &Season {
                    id: "s".into(),
                    name: "Series 16".into(),
                    year: 2026,
                    is_active: true,
                },
            )?;
            db::insert_user(tx, &user("u1"))?;
            db::insert_user(tx, &user("u2"))?;
            for id in ["a", "b", "c", "d"] {
                db::insert_contestant(
                    tx,
                    &Contestant {
                        id: id.into(),
                        season_id: "s".into(),
                        name: id.to_uppercase(),
                        bio: None,
                        is_eliminated: false,
                    },
                )?;
            }
            for (eid, number) in [("e1", 1), ("e2", 2)] {
                db::insert_episode(
                    tx,
                    &Episode {
                        id: eid.into(),
                        season_id: "s".into(),
                        episode_number: number,
                        title: format!("Episode {number}"),
                        air_date: chrono::NaiveDate::from_ymd_opt(2026, 9, number).unwrap(),
                        is_active: true,
                        is_completed: false,
                        star_baker_id: None,
                        eliminated_id: None,
                        technical_winner_id: None,
                    },
                )?;
            }
            Ok(())
        })
        .unwrap();

        Fixture {
            engine,
            db,
            season: "s".into(),
        }
    }

    fn submit(f: &Fixture, id: &str, u: &str, episode: Option<&str>, ty: PickType, c: &str) {
        f.db.transaction(|tx| Ok(db::insert_pick(tx, &pick(id, u, episode, ty, c))?))
            .unwrap();
    }

    #[test]
    fn record_result_scores_picks_and_flags_elimination() {
        let f = fixture();
        submit(&f, "p1", "u1", Some("e1"), PickType::StarBaker, "a");
        submit(&f, "p2", "u1", Some("e1"), PickType::Elimination, "c");

        f.engine.record_episode_result("e1", "a", "c").unwrap();

        let episode = f.db.episode("e1").unwrap().unwrap();
        assert!(episode.is_completed);
        assert!(!episode.is_active);

        let score = f.db.user_score("u1", &f.season).unwrap().unwrap();
        assert_eq!(score.total_score, 5);

        let picks = f.db.user_picks("u1", &f.season).unwrap();
        assert!(picks.iter().all(|p| p.is_correct));

        assert!(f.db.contestant("c").unwrap().unwrap().is_eliminated);
        assert!(!f.db.contestant("a").unwrap().unwrap().is_eliminated);
    }

    #[test]
    fn reasserting_the_same_result_does_not_double_count() {
        let f = fixture();
        submit(&f, "p1", "u1", Some("e1"), PickType::StarBaker, "a");

        f.engine.record_episode_result("e1", "a", "c").unwrap();
        f.engine.record_episode_result("e1", "a", "c").unwrap();

        let score = f.db.user_score("u1", &f.season).unwrap().unwrap();
        assert_eq!(score.weekly_score, 3);
        assert_eq!(score.correct_star_baker, 1);
    }

    #[test]
    fn correcting_a_result_converges_to_the_new_truth() {
        let f = fixture();
        submit(&f, "p1", "u1", Some("e1"), PickType::StarBaker, "a");
        submit(&f, "p2", "u1", Some("e1"), PickType::Elimination, "c");

        f.engine.record_episode_result("e1", "a", "c").unwrap();
        // Admin fixes a data-entry mistake: b was eliminated, not c.
        f.engine.record_episode_result("e1", "a", "b").unwrap();

        let score = f.db.user_score("u1", &f.season).unwrap().unwrap();
        assert_eq!(score.weekly_score, 3);
        assert_eq!(score.correct_elimination, 0);

        assert!(f.db.contestant("b").unwrap().unwrap().is_eliminated);
        assert!(!f.db.contestant("c").unwrap().unwrap().is_eliminated);
    }

    #[test]
    fn record_result_rejects_bad_outcomes() {
        let f = fixture();

        let err = f.engine.record_episode_result("e1", "a", "a").unwrap_err();
        assert!(matches!(err, LeagueError::Validation { .. }));

        let err = f.engine.record_episode_result("e1", "a", "ghost").unwrap_err();
        assert!(matches!(err, LeagueError::NotFound { kind: "contestant", .. }));

        let err = f.engine.record_episode_result("nope", "a", "b").unwrap_err();
        assert!(matches!(err, LeagueError::NotFound { kind: "episode", .. }));
    }

    #[test]
    fn record_result_rejects_contestants_eliminated_elsewhere() {
        let f = fixture();
        f.engine.record_episode_result("e1", "a", "c").unwrap();

        let err = f.engine.record_episode_result("e2", "c", "d").unwrap_err();
        assert!(matches!(
            err,
            LeagueError::EliminatedContestant { contestant_id } if contestant_id == "c"
        ));

        // Correcting e1 itself may still reference c.
        f.engine.record_episode_result("e1", "b", "c").unwrap();
    }

    #[test]
    fn bonuses_flow_into_scores_via_recompute() {
        let f = fixture();
        submit(&f, "p1", "u1", Some("e1"), PickType::StarBaker, "a");
        f.engine.record_episode_result("e1", "a", "c").unwrap();

        f.engine.add_bonus("e1", "a", BonusKind::Handshake).unwrap();
        f.engine.add_bonus("e1", "a", BonusKind::Handshake).unwrap();
        f.engine.set_technical_winner("e1", Some("a")).unwrap();
        f.engine.add_bonus("e1", "a", BonusKind::SoggyBottom).unwrap();

        let score = f.db.user_score("u1", &f.season).unwrap().unwrap();
        // 3 base + 2 handshakes + 1 technical - 1 soggy bottom
        assert_eq!(score.weekly_score, 5);
        assert_eq!(score.handshakes, 2);
        assert_eq!(score.technical_challenge_wins, 1);
        assert_eq!(score.soggy_bottoms, 1);

        f.engine.remove_bonus("e1", "a", BonusKind::Handshake).unwrap();
        let score = f.db.user_score("u1", &f.season).unwrap().unwrap();
        assert_eq!(score.weekly_score, 3);
        assert_eq!(score.handshakes, 0);

        f.engine
            .set_bonus_count("e1", "a", BonusKind::Handshake, 3)
            .unwrap();
        let score = f.db.user_score("u1", &f.season).unwrap().unwrap();
        assert_eq!(score.handshakes, 3);
    }

    #[test]
    fn bonus_for_unpicked_contestant_changes_nothing() {
        let f = fixture();
        submit(&f, "p1", "u1", Some("e1"), PickType::StarBaker, "a");
        f.engine.record_episode_result("e1", "a", "c").unwrap();

        f.engine.add_bonus("e1", "b", BonusKind::Handshake).unwrap();
        let score = f.db.user_score("u1", &f.season).unwrap().unwrap();
        assert_eq!(score.weekly_score, 3);
        assert_eq!(score.handshakes, 0);
    }

    #[test]
    fn score_finalists_validates_and_scores() {
        let f = fixture();
        submit(&f, "p1", "u1", None, PickType::Finalist, "a");
        submit(&f, "p2", "u1", None, PickType::Finalist, "b");
        submit(&f, "p3", "u1", None, PickType::Finalist, "d");

        let err = f
            .engine
            .score_finalists(&f.season, &["a".into(), "b".into()])
            .unwrap_err();
        assert!(matches!(err, LeagueError::FinalistCount { expected: 3, got: 2 }));

        let err = f
            .engine
            .score_finalists(&f.season, &["a".into(), "a".into(), "b".into()])
            .unwrap_err();
        assert!(matches!(err, LeagueError::Validation { .. }));

        f.engine
            .score_finalists(&f.season, &["a".into(), "b".into(), "c".into()])
            .unwrap();
        let score = f.db.user_score("u1", &f.season).unwrap().unwrap();
        assert_eq!(score.finalist_score, 6);

        // Re-recording a different set converges.
        f.engine
            .score_finalists(&f.season, &["b".into(), "c".into(), "d".into()])
            .unwrap();
        let score = f.db.user_score("u1", &f.season).unwrap().unwrap();
        assert_eq!(score.finalist_score, 6);
    }

    #[test]
    fn recalculate_unknown_season_is_not_found() {
        let f = fixture();
        let err = f.engine.recalculate_season_scores("nope").unwrap_err();
        assert!(matches!(err, LeagueError::NotFound { kind: "season", .. }));
    }
}
