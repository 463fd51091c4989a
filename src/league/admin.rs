//! Admin operations: seasons, users, contestants, and the episode schedule.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::db::{self, LeagueDb};
use crate::error::LeagueError;
use crate::league::model::{Contestant, Episode, Season, User};
use crate::roster::RosterEntry;

/// League setup and schedule management. Everything here is admin-only by
/// construction; callers gate access before reaching this type.
pub struct LeagueAdmin {
    db: Arc<LeagueDb>,
}

impl LeagueAdmin {
    pub fn new(db: Arc<LeagueDb>) -> Self {
        Self { db }
    }

    pub fn create_season(
        &self,
        name: &str,
        year: i32,
        is_active: bool,
    ) -> Result<Season, LeagueError> {
        if name.trim().is_empty() {
            return Err(LeagueError::validation("name", "season name is required"));
        }
        let season = Season {
            id: db::new_id("season"),
            name: name.trim().to_string(),
            year,
            is_active,
        };
        self.db
            .transaction(|tx| Ok(db::insert_season(tx, &season)?))?;
        info!(season_id = %season.id, name = %season.name, "created season");
        Ok(season)
    }

    /// Delete a season and everything attached to it: contestants, episodes,
    /// outcomes, bonuses, picks, finalists, and score rows. Users survive.
    pub fn delete_season(&self, season_id: &str) -> Result<(), LeagueError> {
        let removed = self.db.transaction(|tx| Ok(db::delete_season(tx, season_id)?))?;
        if removed == 0 {
            return Err(LeagueError::not_found("season", season_id));
        }
        info!(season_id, "deleted season");
        Ok(())
    }

    pub fn create_user(
        &self,
        name: &str,
        email: &str,
        is_admin: bool,
    ) -> Result<User, LeagueError> {
        if name.trim().is_empty() {
            return Err(LeagueError::validation("name", "user name is required"));
        }
        if !email.contains('@') {
            return Err(LeagueError::validation("email", "email address is invalid"));
        }
        let user = User {
            id: db::new_id("user"),
            name: name.trim().to_string(),
            email: email.trim().to_lowercase(),
            is_admin,
        };
        self.db.transaction(|tx| Ok(db::insert_user(tx, &user)?))?;
        Ok(user)
    }

    pub fn create_contestant(
        &self,
        season_id: &str,
        name: &str,
        bio: Option<&str>,
    ) -> Result<Contestant, LeagueError> {
        if name.trim().is_empty() {
            return Err(LeagueError::validation("name", "contestant name is required"));
        }
        let contestant = Contestant {
            id: db::new_id("cont"),
            season_id: season_id.to_string(),
            name: name.trim().to_string(),
            bio: bio.map(|b| b.to_string()),
            is_eliminated: false,
        };
        self.db.transaction(|tx| {
            if db::get_season(tx, season_id)?.is_none() {
                return Err(LeagueError::not_found("season", season_id));
            }
            db::insert_contestant(tx, &contestant)?;
            Ok(())
        })?;
        Ok(contestant)
    }

    /// Import a parsed roster into a season in one transaction: either every
    /// contestant lands or none do.
    pub fn import_roster(
        &self,
        season_id: &str,
        roster: &[RosterEntry],
    ) -> Result<Vec<Contestant>, LeagueError> {
        if roster.is_empty() {
            return Err(LeagueError::validation("roster", "roster is empty"));
        }
        let contestants: Vec<Contestant> = roster
            .iter()
            .map(|entry| Contestant {
                id: db::new_id("cont"),
                season_id: season_id.to_string(),
                name: entry.name.clone(),
                bio: entry.bio.clone(),
                is_eliminated: false,
            })
            .collect();

        self.db.transaction(|tx| {
            if db::get_season(tx, season_id)?.is_none() {
                return Err(LeagueError::not_found("season", season_id));
            }
            for contestant in &contestants {
                db::insert_contestant(tx, contestant)?;
            }
            Ok(())
        })?;

        info!(season_id, count = contestants.len(), "imported contestant roster");
        Ok(contestants)
    }

    pub fn create_episode(
        &self,
        season_id: &str,
        episode_number: u32,
        title: &str,
        air_date: NaiveDate,
        is_active: bool,
    ) -> Result<Episode, LeagueError> {
        if episode_number == 0 {
            return Err(LeagueError::validation(
                "episode_number",
                "episode numbers start at 1",
            ));
        }
        let episode = Episode {
            id: db::new_id("ep"),
            season_id: season_id.to_string(),
            episode_number,
            title: title.trim().to_string(),
            air_date,
            is_active,
            is_completed: false,
            star_baker_id: None,
            eliminated_id: None,
            technical_winner_id: None,
        };
        self.db.transaction(|tx| {
            if db::get_season(tx, season_id)?.is_none() {
                return Err(LeagueError::not_found("season", season_id));
            }
            let taken: bool = db::season_episodes(tx, season_id)?
                .iter()
                .any(|e| e.episode_number == episode_number);
            if taken {
                return Err(LeagueError::validation(
                    "episode_number",
                    format!("episode {episode_number} already exists in this season"),
                ));
            }
            db::insert_episode(tx, &episode)?;
            Ok(())
        })?;
        Ok(episode)
    }

    pub fn update_episode(
        &self,
        episode_id: &str,
        title: &str,
        episode_number: u32,
        air_date: NaiveDate,
        is_active: bool,
    ) -> Result<Episode, LeagueError> {
        self.db.transaction(|tx| {
            let Some(existing) = db::get_episode(tx, episode_id)? else {
                return Err(LeagueError::not_found("episode", episode_id));
            };
            let taken = db::season_episodes(tx, &existing.season_id)?
                .iter()
                .any(|e| e.episode_number == episode_number && e.id != episode_id);
            if taken {
                return Err(LeagueError::validation(
                    "episode_number",
                    format!("episode {episode_number} already exists in this season"),
                ));
            }
            db::update_episode_details(tx, episode_id, title.trim(), episode_number, air_date, is_active)?;
            Ok(())
        })?;
        self.db
            .episode(episode_id)?
            .ok_or_else(|| LeagueError::not_found("episode", episode_id))
    }

    /// Open or close an episode for picks. Completed episodes stay closed.
    pub fn set_episode_active(
        &self,
        episode_id: &str,
        is_active: bool,
    ) -> Result<(), LeagueError> {
        self.db.transaction(|tx| {
            let Some(episode) = db::get_episode(tx, episode_id)? else {
                return Err(LeagueError::not_found("episode", episode_id));
            };
            if is_active && episode.is_completed {
                return Err(LeagueError::validation(
                    "is_active",
                    "a completed episode cannot be reopened for picks",
                ));
            }
            db::set_episode_active(tx, episode_id, is_active)?;
            Ok(())
        })
    }
}
