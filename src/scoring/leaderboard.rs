//! Leaderboard projection: rank stored score rows for display.

use serde::Serialize;

use crate::db::LeagueDb;
use crate::error::LeagueError;
use crate::league::model::{User, UserScore};

/// One ranked row. Pure projection of a score row; building the leaderboard
/// never mutates anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: String,
    pub user_name: String,
    pub total_score: i32,
    pub weekly_score: i32,
    pub finalist_score: i32,
    pub correct_star_baker: u32,
    pub correct_elimination: u32,
    pub technical_challenge_wins: u32,
    pub handshakes: u32,
    pub soggy_bottoms: u32,
    /// Completed episodes in the season.
    pub total_episodes: u32,
    /// Completed episodes where this user made both weekly picks.
    pub total_episodes_with_picks: u32,
    /// Percentage of weekly picks that were correct, over completed episodes
    /// where the user made both picks. Zero until such an episode exists.
    pub accuracy: u32,
}

fn accuracy(score: &UserScore) -> u32 {
    if score.total_episodes_with_picks == 0 {
        return 0;
    }
    let hits = score.correct_star_baker + score.correct_elimination;
    let share = f64::from(hits) * 100.0 / f64::from(2 * score.total_episodes_with_picks);
    share.round() as u32
}

/// Rank score rows: total score descending, ties broken by user name
/// ascending so the ordering is stable across refreshes.
pub fn project(mut rows: Vec<(UserScore, User)>) -> Vec<LeaderboardEntry> {
    rows.sort_by(|(a, ua), (b, ub)| {
        b.total_score
            .cmp(&a.total_score)
            .then_with(|| ua.name.cmp(&ub.name))
            .then_with(|| ua.id.cmp(&ub.id))
    });
    rows.into_iter()
        .enumerate()
        .map(|(i, (score, user))| LeaderboardEntry {
            rank: i as u32 + 1,
            user_id: user.id,
            user_name: user.name,
            total_score: score.total_score,
            weekly_score: score.weekly_score,
            finalist_score: score.finalist_score,
            correct_star_baker: score.correct_star_baker,
            correct_elimination: score.correct_elimination,
            technical_challenge_wins: score.technical_challenge_wins,
            handshakes: score.handshakes,
            soggy_bottoms: score.soggy_bottoms,
            total_episodes: score.total_episodes,
            total_episodes_with_picks: score.total_episodes_with_picks,
            accuracy: accuracy(&score),
        })
        .collect()
}

/// Load and rank the season's leaderboard. Admin users never appear.
pub fn build_leaderboard(
    db: &LeagueDb,
    season_id: &str,
) -> Result<Vec<LeaderboardEntry>, LeagueError> {
    if db.season(season_id)?.is_none() {
        return Err(LeagueError::not_found("season", season_id));
    }
    Ok(project(db.season_user_scores(season_id)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(user_id: &str, name: &str, total: i32) -> (UserScore, User) {
        (
            UserScore {
                user_id: user_id.into(),
                season_id: "s".into(),
                total_score: total,
                weekly_score: total,
                ..Default::default()
            },
            User {
                id: user_id.into(),
                name: name.into(),
                email: format!("{user_id}@example.com"),
                is_admin: false,
            },
        )
    }

    #[test]
    fn ranks_by_total_score_descending() {
        let entries = project(vec![
            row("u1", "Ana", 3),
            row("u2", "Ben", 9),
            row("u3", "Cyd", 5),
        ]);
        let order: Vec<&str> = entries.iter().map(|e| e.user_name.as_str()).collect();
        assert_eq!(order, vec!["Ben", "Cyd", "Ana"]);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[2].rank, 3);
    }

    #[test]
    fn ties_break_by_name_ascending() {
        let entries = project(vec![
            row("u2", "Zara", 5),
            row("u1", "Ana", 5),
        ]);
        assert_eq!(entries[0].user_name, "Ana");
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[1].user_name, "Zara");
        assert_eq!(entries[1].rank, 2);
    }

    #[test]
    fn accuracy_rounds_to_nearest_percent() {
        let mut score = UserScore {
            correct_star_baker: 1,
            correct_elimination: 1,
            total_episodes_with_picks: 3,
            ..Default::default()
        };
        // 2 of 6 = 33.33 rounds to 33.
        assert_eq!(accuracy(&score), 33);

        score.correct_elimination = 2;
        // 3 of 6 = 50.
        assert_eq!(accuracy(&score), 50);

        score.correct_star_baker = 2;
        // 4 of 6 = 66.67 rounds to 67.
        assert_eq!(accuracy(&score), 67);
    }

    #[test]
    fn accuracy_is_zero_without_counted_episodes() {
        // Completed episodes without both picks do not feed the denominator.
        let score = UserScore {
            correct_star_baker: 2,
            total_episodes: 4,
            ..Default::default()
        };
        assert_eq!(accuracy(&score), 0);
    }

    #[test]
    fn empty_input_projects_to_empty_board() {
        assert!(project(Vec::new()).is_empty());
    }
}
