//! Pick submission and the read-only pick surfaces.
//!
//! A submission always replaces: within one transaction the user's previous
//! picks of the submitted types are deleted and the new ones inserted, so a
//! user never holds two Star Baker picks for the same episode.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::config::{Config, LeagueRules};
use crate::db::{self, LeagueDb};
use crate::error::LeagueError;
use crate::league::model::{Contestant, Episode, Pick, PickType, User};
use crate::live::{LiveEvent, Publisher};

/// What a user submits: one episode's weekly picks, or the season's finalist
/// slate. Omitted weekly slots leave the existing pick untouched.
#[derive(Debug, Clone)]
pub enum PickSubmission {
    Weekly {
        episode_id: String,
        star_baker: Option<String>,
        elimination: Option<String>,
    },
    Finalists {
        contestant_ids: Vec<String>,
    },
}

/// Per-user pick presence for one episode, suitable for a "who has picked"
/// board. Contestant choices stay hidden until the episode completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodePickStatus {
    pub user_id: String,
    pub user_name: String,
    pub has_star_baker: bool,
    pub has_elimination: bool,
}

impl EpisodePickStatus {
    /// Both weekly picks are in.
    pub fn is_complete(&self) -> bool {
        self.has_star_baker && self.has_elimination
    }
}

/// Submission roll-up for one episode across every player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodePicksSummary {
    pub episode_id: String,
    pub users: Vec<EpisodePickStatus>,
    /// Players with both weekly picks in.
    pub submitted_count: u32,
    pub total_users: u32,
    pub all_users_submitted: bool,
}

/// How often one contestant has been a user's Star Baker pick, and how many
/// uses the cap leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StarBakerUsage {
    pub contestant_id: String,
    pub episodes_used: u32,
    pub remaining: u32,
}

/// Validates and stores picks.
pub struct PickStore {
    db: Arc<LeagueDb>,
    publisher: Arc<dyn Publisher>,
    league: LeagueRules,
}

impl PickStore {
    pub fn new(db: Arc<LeagueDb>, publisher: Arc<dyn Publisher>, config: &Config) -> Self {
        Self {
            db,
            publisher,
            league: config.league.clone(),
        }
    }

    /// Submit picks, replacing any previous picks of the same types. Returns
    /// the picks as stored.
    pub fn submit(
        &self,
        user_id: &str,
        season_id: &str,
        submission: PickSubmission,
    ) -> Result<Vec<Pick>, LeagueError> {
        let picks = self.db.transaction(|tx| {
            let user = require_player(tx, user_id)?;
            if db::get_season(tx, season_id)?.is_none() {
                return Err(LeagueError::not_found("season", season_id));
            }
            match &submission {
                PickSubmission::Weekly {
                    episode_id,
                    star_baker,
                    elimination,
                } => self.submit_weekly(
                    tx,
                    &user,
                    season_id,
                    episode_id,
                    star_baker.as_deref(),
                    elimination.as_deref(),
                ),
                PickSubmission::Finalists { contestant_ids } => {
                    self.submit_finalists(tx, &user, season_id, contestant_ids)
                }
            }
        })?;

        info!(user_id, season_id, count = picks.len(), "stored picks");
        self.publisher.publish(LiveEvent::PicksUpdated {
            season_id: season_id.to_string(),
            user_id: user_id.to_string(),
        });
        Ok(picks)
    }

    fn submit_weekly(
        &self,
        tx: &rusqlite::Transaction<'_>,
        user: &User,
        season_id: &str,
        episode_id: &str,
        star_baker: Option<&str>,
        elimination: Option<&str>,
    ) -> Result<Vec<Pick>, LeagueError> {
        if star_baker.is_none() && elimination.is_none() {
            return Err(LeagueError::validation(
                "picks",
                "a weekly submission needs a Star Baker or Elimination pick",
            ));
        }
        let episode = require_open_episode(tx, season_id, episode_id)?;

        // A submission may touch one slot only, so the rule is checked
        // against whichever stored pick of the other type survives the
        // replacement.
        let final_star = match star_baker {
            Some(star) => Some(star.to_string()),
            None => db::user_episode_pick(tx, &user.id, &episode.id, PickType::StarBaker)?
                .map(|p| p.contestant_id),
        };
        let final_elim = match elimination {
            Some(elim) => Some(elim.to_string()),
            None => db::user_episode_pick(tx, &user.id, &episode.id, PickType::Elimination)?
                .map(|p| p.contestant_id),
        };
        if final_star.is_some() && final_star == final_elim {
            return Err(LeagueError::validation(
                "picks",
                "Star Baker and Elimination picks must differ",
            ));
        }

        for contestant_id in [star_baker, elimination].into_iter().flatten() {
            require_available_contestant(tx, season_id, contestant_id)?;
        }

        if let Some(star) = star_baker {
            let used = db::star_baker_episode_count(tx, &user.id, season_id, star, Some(episode_id))?;
            if used >= self.league.star_baker_pick_cap {
                return Err(LeagueError::StarBakerCapExceeded {
                    contestant_id: star.to_string(),
                    cap: self.league.star_baker_pick_cap,
                });
            }
        }

        let mut stored = Vec::new();
        for (contestant, pick_type) in [
            (star_baker, PickType::StarBaker),
            (elimination, PickType::Elimination),
        ] {
            let Some(contestant_id) = contestant else {
                continue;
            };
            db::delete_picks(tx, &user.id, season_id, Some(&episode.id), &[pick_type])?;
            let pick = Pick {
                id: db::new_id("pick"),
                user_id: user.id.clone(),
                season_id: season_id.to_string(),
                episode_id: Some(episode.id.clone()),
                pick_type,
                contestant_id: contestant_id.to_string(),
                is_correct: false,
                points: 0,
                created_at: String::new(),
            };
            db::insert_pick(tx, &pick)?;
            stored.push(pick);
        }
        Ok(stored)
    }

    fn submit_finalists(
        &self,
        tx: &rusqlite::Transaction<'_>,
        user: &User,
        season_id: &str,
        contestant_ids: &[String],
    ) -> Result<Vec<Pick>, LeagueError> {
        let expected = self.league.finalist_count;
        if contestant_ids.len() as u32 != expected {
            return Err(LeagueError::FinalistCount {
                expected,
                got: contestant_ids.len() as u32,
            });
        }
        let distinct: HashSet<&String> = contestant_ids.iter().collect();
        if distinct.len() != contestant_ids.len() {
            return Err(LeagueError::validation(
                "contestant_ids",
                "finalist picks must be distinct contestants",
            ));
        }
        for contestant_id in contestant_ids {
            require_available_contestant(tx, season_id, contestant_id)?;
        }

        db::delete_picks(tx, &user.id, season_id, None, &[PickType::Finalist])?;
        let mut stored = Vec::new();
        for contestant_id in contestant_ids {
            let pick = Pick {
                id: db::new_id("pick"),
                user_id: user.id.clone(),
                season_id: season_id.to_string(),
                episode_id: None,
                pick_type: PickType::Finalist,
                contestant_id: contestant_id.clone(),
                is_correct: false,
                points: 0,
                created_at: String::new(),
            };
            db::insert_pick(tx, &pick)?;
            stored.push(pick);
        }
        Ok(stored)
    }

    /// A user's full pick history for a season, scored picks included,
    /// ordered by submission time.
    pub fn pick_history(&self, user_id: &str, season_id: &str) -> Result<Vec<Pick>, LeagueError> {
        Ok(self.db.user_picks(user_id, season_id)?)
    }

    /// How many distinct episodes each contestant has been this user's Star
    /// Baker pick in, with the uses the cap still allows. Feeds the cap
    /// indicator in pick forms.
    pub fn star_baker_counts(
        &self,
        user_id: &str,
        season_id: &str,
    ) -> Result<Vec<StarBakerUsage>, LeagueError> {
        let picks = self.db.user_picks(user_id, season_id)?;
        let mut episodes_by_contestant: HashMap<String, HashSet<String>> = HashMap::new();
        for pick in picks
            .iter()
            .filter(|p| p.pick_type == PickType::StarBaker)
        {
            if let Some(episode_id) = &pick.episode_id {
                episodes_by_contestant
                    .entry(pick.contestant_id.clone())
                    .or_default()
                    .insert(episode_id.clone());
            }
        }
        let cap = self.league.star_baker_pick_cap;
        let mut usage: Vec<StarBakerUsage> = episodes_by_contestant
            .into_iter()
            .map(|(contestant_id, episodes)| {
                let episodes_used = episodes.len() as u32;
                StarBakerUsage {
                    contestant_id,
                    episodes_used,
                    remaining: cap.saturating_sub(episodes_used),
                }
            })
            .collect();
        usage.sort_by(|a, b| a.contestant_id.cmp(&b.contestant_id));
        Ok(usage)
    }

    /// Every pick made for an episode. Intended for admin review and the
    /// post-episode reveal.
    pub fn picks_for_episode(&self, episode_id: &str) -> Result<Vec<Pick>, LeagueError> {
        if self.db.episode(episode_id)?.is_none() {
            return Err(LeagueError::not_found("episode", episode_id));
        }
        Ok(self.db.episode_picks(episode_id)?)
    }

    /// Which players have weekly picks in for an episode, without revealing
    /// the picks themselves.
    pub fn episode_picks_status(
        &self,
        episode_id: &str,
    ) -> Result<EpisodePicksSummary, LeagueError> {
        if self.db.episode(episode_id)?.is_none() {
            return Err(LeagueError::not_found("episode", episode_id));
        }
        let picks = self.db.episode_picks(episode_id)?;
        let users = {
            let conn = self.db.conn();
            db::non_admin_users(&conn)?
        };

        let mut status: Vec<EpisodePickStatus> = users
            .into_iter()
            .map(|user| EpisodePickStatus {
                user_id: user.id,
                user_name: user.name,
                has_star_baker: false,
                has_elimination: false,
            })
            .collect();
        for pick in &picks {
            if let Some(entry) = status.iter_mut().find(|s| s.user_id == pick.user_id) {
                match pick.pick_type {
                    PickType::StarBaker => entry.has_star_baker = true,
                    PickType::Elimination => entry.has_elimination = true,
                    PickType::Finalist => {}
                }
            }
        }

        let total_users = status.len() as u32;
        let submitted_count = status.iter().filter(|s| s.is_complete()).count() as u32;
        Ok(EpisodePicksSummary {
            episode_id: episode_id.to_string(),
            users: status,
            submitted_count,
            total_users,
            all_users_submitted: total_users > 0 && submitted_count == total_users,
        })
    }
}

fn require_player(tx: &rusqlite::Transaction<'_>, user_id: &str) -> Result<User, LeagueError> {
    let Some(user) = db::get_user(tx, user_id)? else {
        return Err(LeagueError::not_found("user", user_id));
    };
    if user.is_admin {
        return Err(LeagueError::validation(
            "user_id",
            "admin accounts do not make picks",
        ));
    }
    Ok(user)
}

fn require_open_episode(
    tx: &rusqlite::Transaction<'_>,
    season_id: &str,
    episode_id: &str,
) -> Result<Episode, LeagueError> {
    let Some(episode) = db::get_episode(tx, episode_id)? else {
        return Err(LeagueError::not_found("episode", episode_id));
    };
    if episode.season_id != season_id {
        return Err(LeagueError::validation(
            "episode_id",
            "episode belongs to a different season",
        ));
    }
    if episode.is_completed || !episode.is_active {
        return Err(LeagueError::EpisodeNotActive {
            episode_id: episode_id.to_string(),
        });
    }
    Ok(episode)
}

fn require_available_contestant(
    tx: &rusqlite::Transaction<'_>,
    season_id: &str,
    contestant_id: &str,
) -> Result<Contestant, LeagueError> {
    let Some(contestant) = db::get_contestant(tx, contestant_id)? else {
        return Err(LeagueError::not_found("contestant", contestant_id));
    };
    if contestant.season_id != season_id {
        return Err(LeagueError::not_found("contestant", contestant_id));
    }
    if contestant.is_eliminated {
        return Err(LeagueError::EliminatedContestant {
            contestant_id: contestant_id.to_string(),
        });
    }
    Ok(contestant)
}
