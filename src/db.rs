// SQLite persistence layer for league state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Transaction};

use crate::error::LeagueError;
use crate::league::model::{
    Contestant, Episode, EpisodeOutcome, Pick, PickType, Season, SeasonSnapshot, User, UserScore,
};

/// SQLite-backed persistence for seasons, users, contestants, episodes,
/// picks, bonuses, and aggregate scores.
pub struct LeagueDb {
    conn: Mutex<Connection>,
}

/// Monotonic suffix so ids generated within the same millisecond stay unique.
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a prefixed, time-ordered id (e.g. `pick_20260829_141503_021_7`).
pub fn new_id(prefix: &str) -> String {
    let now = chrono::Utc::now();
    let n = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{}_{n}", now.format("%Y%m%d_%H%M%S_%3f"))
}

impl LeagueDb {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS seasons (
                id        TEXT PRIMARY KEY,
                name      TEXT NOT NULL,
                year      INTEGER NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS users (
                id       TEXT PRIMARY KEY,
                name     TEXT NOT NULL,
                email    TEXT NOT NULL UNIQUE,
                is_admin INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS contestants (
                id            TEXT PRIMARY KEY,
                season_id     TEXT NOT NULL REFERENCES seasons(id) ON DELETE CASCADE,
                name          TEXT NOT NULL,
                bio           TEXT,
                is_eliminated INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS episodes (
                id                  TEXT PRIMARY KEY,
                season_id           TEXT NOT NULL REFERENCES seasons(id) ON DELETE CASCADE,
                episode_number      INTEGER NOT NULL,
                title               TEXT NOT NULL,
                air_date            TEXT NOT NULL,
                is_active           INTEGER NOT NULL DEFAULT 0,
                is_completed        INTEGER NOT NULL DEFAULT 0,
                star_baker_id       TEXT REFERENCES contestants(id),
                eliminated_id       TEXT REFERENCES contestants(id),
                technical_winner_id TEXT REFERENCES contestants(id),
                UNIQUE(season_id, episode_number)
            );

            CREATE TABLE IF NOT EXISTS episode_handshakes (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                episode_id    TEXT NOT NULL REFERENCES episodes(id) ON DELETE CASCADE,
                contestant_id TEXT NOT NULL REFERENCES contestants(id)
            );

            CREATE TABLE IF NOT EXISTS episode_soggy_bottoms (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                episode_id    TEXT NOT NULL REFERENCES episodes(id) ON DELETE CASCADE,
                contestant_id TEXT NOT NULL REFERENCES contestants(id)
            );

            CREATE TABLE IF NOT EXISTS picks (
                id            TEXT PRIMARY KEY,
                user_id       TEXT NOT NULL REFERENCES users(id),
                season_id     TEXT NOT NULL REFERENCES seasons(id) ON DELETE CASCADE,
                episode_id    TEXT REFERENCES episodes(id) ON DELETE CASCADE,
                pick_type     TEXT NOT NULL,
                contestant_id TEXT NOT NULL REFERENCES contestants(id),
                is_correct    INTEGER NOT NULL DEFAULT 0,
                points        INTEGER NOT NULL DEFAULT 0,
                created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS season_finalists (
                season_id     TEXT NOT NULL REFERENCES seasons(id) ON DELETE CASCADE,
                contestant_id TEXT NOT NULL REFERENCES contestants(id),
                PRIMARY KEY (season_id, contestant_id)
            );

            CREATE TABLE IF NOT EXISTS user_scores (
                user_id                  TEXT NOT NULL REFERENCES users(id),
                season_id                TEXT NOT NULL REFERENCES seasons(id) ON DELETE CASCADE,
                total_score              INTEGER NOT NULL DEFAULT 0,
                weekly_score             INTEGER NOT NULL DEFAULT 0,
                finalist_score           INTEGER NOT NULL DEFAULT 0,
                correct_star_baker       INTEGER NOT NULL DEFAULT 0,
                correct_elimination      INTEGER NOT NULL DEFAULT 0,
                wrong_star_baker         INTEGER NOT NULL DEFAULT 0,
                wrong_elimination        INTEGER NOT NULL DEFAULT 0,
                technical_challenge_wins INTEGER NOT NULL DEFAULT 0,
                handshakes               INTEGER NOT NULL DEFAULT 0,
                soggy_bottoms            INTEGER NOT NULL DEFAULT 0,
                total_episodes           INTEGER NOT NULL DEFAULT 0,
                total_episodes_with_picks INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, season_id)
            );

            CREATE INDEX IF NOT EXISTS idx_picks_user_season ON picks(user_id, season_id);
            CREATE INDEX IF NOT EXISTS idx_picks_episode ON picks(episode_id);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Run `f` inside a single transaction. The transaction commits when `f`
    /// returns `Ok` and rolls back on error, so callers never observe a
    /// partially applied operation.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, LeagueError>,
    ) -> Result<T, LeagueError> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .context("failed to begin transaction")
            .map_err(LeagueError::Storage)?;
        let out = f(&tx)?;
        tx.commit()
            .context("failed to commit transaction")
            .map_err(LeagueError::Storage)?;
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Read conveniences (single-statement, no transaction needed)
    // ------------------------------------------------------------------

    pub fn season(&self, season_id: &str) -> Result<Option<Season>> {
        get_season(&self.conn(), season_id)
    }

    pub fn episode(&self, episode_id: &str) -> Result<Option<Episode>> {
        get_episode(&self.conn(), episode_id)
    }

    pub fn user(&self, user_id: &str) -> Result<Option<User>> {
        get_user(&self.conn(), user_id)
    }

    pub fn contestant(&self, contestant_id: &str) -> Result<Option<Contestant>> {
        get_contestant(&self.conn(), contestant_id)
    }

    pub fn season_contestants(&self, season_id: &str) -> Result<Vec<Contestant>> {
        season_contestants(&self.conn(), season_id)
    }

    pub fn season_episodes(&self, season_id: &str) -> Result<Vec<Episode>> {
        season_episodes(&self.conn(), season_id)
    }

    /// All picks for one user in one season, ordered by creation time.
    pub fn user_picks(&self, user_id: &str, season_id: &str) -> Result<Vec<Pick>> {
        query_picks(
            &self.conn(),
            "SELECT id, user_id, season_id, episode_id, pick_type, contestant_id,
                    is_correct, points, created_at
             FROM picks WHERE user_id = ?1 AND season_id = ?2
             ORDER BY created_at, id",
            params![user_id, season_id],
        )
    }

    /// All picks referencing one episode, ordered by creation time. Used by
    /// the read-only messaging/export surface.
    pub fn episode_picks(&self, episode_id: &str) -> Result<Vec<Pick>> {
        query_picks(
            &self.conn(),
            "SELECT id, user_id, season_id, episode_id, pick_type, contestant_id,
                    is_correct, points, created_at
             FROM picks WHERE episode_id = ?1
             ORDER BY created_at, id",
            params![episode_id],
        )
    }

    /// Aggregate score row for one user in one season.
    pub fn user_score(&self, user_id: &str, season_id: &str) -> Result<Option<UserScore>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT user_id, season_id, total_score, weekly_score, finalist_score,
                        correct_star_baker, correct_elimination, wrong_star_baker,
                        wrong_elimination, technical_challenge_wins, handshakes,
                        soggy_bottoms, total_episodes, total_episodes_with_picks
                 FROM user_scores WHERE user_id = ?1 AND season_id = ?2",
            )
            .context("failed to prepare user_score query")?;
        let mut rows = stmt
            .query_map(params![user_id, season_id], map_user_score)
            .context("failed to query user score")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("failed to read user score row")?)),
            None => Ok(None),
        }
    }

    /// Score rows for every non-admin user in a season, paired with the user.
    pub fn season_user_scores(&self, season_id: &str) -> Result<Vec<(UserScore, User)>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT s.user_id, s.season_id, s.total_score, s.weekly_score,
                        s.finalist_score, s.correct_star_baker, s.correct_elimination,
                        s.wrong_star_baker, s.wrong_elimination,
                        s.technical_challenge_wins, s.handshakes, s.soggy_bottoms,
                        s.total_episodes, s.total_episodes_with_picks,
                        u.id, u.name, u.email, u.is_admin
                 FROM user_scores s JOIN users u ON u.id = s.user_id
                 WHERE s.season_id = ?1 AND u.is_admin = 0",
            )
            .context("failed to prepare season_user_scores query")?;
        let rows = stmt
            .query_map(params![season_id], |row| {
                let score = map_user_score(row)?;
                let user = User {
                    id: row.get(14)?,
                    name: row.get(15)?,
                    email: row.get(16)?,
                    is_admin: row.get(17)?,
                };
                Ok((score, user))
            })
            .context("failed to query season user scores")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map season user score rows")?;
        Ok(rows)
    }

    /// Full season snapshot for the scoring engine.
    pub fn season_snapshot(&self, season_id: &str) -> Result<Option<SeasonSnapshot>, LeagueError> {
        load_season_snapshot(&self.conn(), season_id)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn parse_date(idx: usize, text: String) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_pick_type(idx: usize, text: String) -> rusqlite::Result<PickType> {
    PickType::from_str_type(&text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown pick type: {text}").into(),
        )
    })
}

fn map_episode(row: &rusqlite::Row<'_>) -> rusqlite::Result<Episode> {
    let air_date: String = row.get(4)?;
    Ok(Episode {
        id: row.get(0)?,
        season_id: row.get(1)?,
        episode_number: row.get(2)?,
        title: row.get(3)?,
        air_date: parse_date(4, air_date)?,
        is_active: row.get(5)?,
        is_completed: row.get(6)?,
        star_baker_id: row.get(7)?,
        eliminated_id: row.get(8)?,
        technical_winner_id: row.get(9)?,
    })
}

fn map_pick(row: &rusqlite::Row<'_>) -> rusqlite::Result<Pick> {
    let pick_type: String = row.get(4)?;
    Ok(Pick {
        id: row.get(0)?,
        user_id: row.get(1)?,
        season_id: row.get(2)?,
        episode_id: row.get(3)?,
        pick_type: parse_pick_type(4, pick_type)?,
        contestant_id: row.get(5)?,
        is_correct: row.get(6)?,
        points: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn map_user_score(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserScore> {
    Ok(UserScore {
        user_id: row.get(0)?,
        season_id: row.get(1)?,
        total_score: row.get(2)?,
        weekly_score: row.get(3)?,
        finalist_score: row.get(4)?,
        correct_star_baker: row.get(5)?,
        correct_elimination: row.get(6)?,
        wrong_star_baker: row.get(7)?,
        wrong_elimination: row.get(8)?,
        technical_challenge_wins: row.get(9)?,
        handshakes: row.get(10)?,
        soggy_bottoms: row.get(11)?,
        total_episodes: row.get(12)?,
        total_episodes_with_picks: row.get(13)?,
    })
}

fn query_picks(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Pick>> {
    let mut stmt = conn.prepare(sql).context("failed to prepare pick query")?;
    let picks = stmt
        .query_map(params, map_pick)
        .context("failed to query picks")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map pick rows")?;
    Ok(picks)
}

// ---------------------------------------------------------------------------
// Reads usable both standalone and inside transactions
// ---------------------------------------------------------------------------

pub(crate) fn get_season(conn: &Connection, season_id: &str) -> Result<Option<Season>> {
    let mut stmt = conn
        .prepare("SELECT id, name, year, is_active FROM seasons WHERE id = ?1")
        .context("failed to prepare season query")?;
    let mut rows = stmt
        .query_map(params![season_id], |row| {
            Ok(Season {
                id: row.get(0)?,
                name: row.get(1)?,
                year: row.get(2)?,
                is_active: row.get(3)?,
            })
        })
        .context("failed to query season")?;
    match rows.next() {
        Some(row) => Ok(Some(row.context("failed to read season row")?)),
        None => Ok(None),
    }
}

pub(crate) fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    let mut stmt = conn
        .prepare("SELECT id, name, email, is_admin FROM users WHERE id = ?1")
        .context("failed to prepare user query")?;
    let mut rows = stmt
        .query_map(params![user_id], |row| {
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                is_admin: row.get(3)?,
            })
        })
        .context("failed to query user")?;
    match rows.next() {
        Some(row) => Ok(Some(row.context("failed to read user row")?)),
        None => Ok(None),
    }
}

pub(crate) fn get_contestant(conn: &Connection, contestant_id: &str) -> Result<Option<Contestant>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, season_id, name, bio, is_eliminated
             FROM contestants WHERE id = ?1",
        )
        .context("failed to prepare contestant query")?;
    let mut rows = stmt
        .query_map(params![contestant_id], map_contestant)
        .context("failed to query contestant")?;
    match rows.next() {
        Some(row) => Ok(Some(row.context("failed to read contestant row")?)),
        None => Ok(None),
    }
}

fn map_contestant(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contestant> {
    Ok(Contestant {
        id: row.get(0)?,
        season_id: row.get(1)?,
        name: row.get(2)?,
        bio: row.get(3)?,
        is_eliminated: row.get(4)?,
    })
}

pub(crate) fn non_admin_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn
        .prepare("SELECT id, name, email, is_admin FROM users WHERE is_admin = 0 ORDER BY name, id")
        .context("failed to prepare users query")?;
    let users = stmt
        .query_map([], |row| {
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                is_admin: row.get(3)?,
            })
        })
        .context("failed to query users")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map user rows")?;
    Ok(users)
}

pub(crate) fn season_contestants(conn: &Connection, season_id: &str) -> Result<Vec<Contestant>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, season_id, name, bio, is_eliminated
             FROM contestants WHERE season_id = ?1 ORDER BY name, id",
        )
        .context("failed to prepare season contestants query")?;
    let contestants = stmt
        .query_map(params![season_id], map_contestant)
        .context("failed to query season contestants")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map contestant rows")?;
    Ok(contestants)
}

pub(crate) fn get_episode(conn: &Connection, episode_id: &str) -> Result<Option<Episode>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, season_id, episode_number, title, air_date, is_active,
                    is_completed, star_baker_id, eliminated_id, technical_winner_id
             FROM episodes WHERE id = ?1",
        )
        .context("failed to prepare episode query")?;
    let mut rows = stmt
        .query_map(params![episode_id], map_episode)
        .context("failed to query episode")?;
    match rows.next() {
        Some(row) => Ok(Some(row.context("failed to read episode row")?)),
        None => Ok(None),
    }
}

pub(crate) fn season_episodes(conn: &Connection, season_id: &str) -> Result<Vec<Episode>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, season_id, episode_number, title, air_date, is_active,
                    is_completed, star_baker_id, eliminated_id, technical_winner_id
             FROM episodes WHERE season_id = ?1 ORDER BY episode_number",
        )
        .context("failed to prepare season episodes query")?;
    let episodes = stmt
        .query_map(params![season_id], map_episode)
        .context("failed to query season episodes")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map episode rows")?;
    Ok(episodes)
}

/// Bonus entries (one row per award) for an episode.
fn bonus_recipients(conn: &Connection, table: &str, episode_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT contestant_id FROM {table} WHERE episode_id = ?1 ORDER BY id"
        ))
        .context("failed to prepare bonus query")?;
    let recipients = stmt
        .query_map(params![episode_id], |row| row.get(0))
        .context("failed to query bonus entries")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map bonus rows")?;
    Ok(recipients)
}

/// A user's stored pick of one weekly type for one episode, if any.
pub(crate) fn user_episode_pick(
    conn: &Connection,
    user_id: &str,
    episode_id: &str,
    pick_type: PickType,
) -> Result<Option<Pick>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, user_id, season_id, episode_id, pick_type, contestant_id,
                    is_correct, points, created_at
             FROM picks WHERE user_id = ?1 AND episode_id = ?2 AND pick_type = ?3",
        )
        .context("failed to prepare episode pick query")?;
    let mut rows = stmt
        .query_map(params![user_id, episode_id, pick_type.as_str()], map_pick)
        .context("failed to query episode pick")?;
    match rows.next() {
        Some(row) => Ok(Some(row.context("failed to read episode pick row")?)),
        None => Ok(None),
    }
}

/// Number of distinct episodes (other than `exclude_episode`, when given) in
/// which the user has already picked `contestant_id` as Star Baker.
pub(crate) fn star_baker_episode_count(
    conn: &Connection,
    user_id: &str,
    season_id: &str,
    contestant_id: &str,
    exclude_episode: Option<&str>,
) -> Result<u32> {
    let count: u32 = conn
        .query_row(
            "SELECT COUNT(DISTINCT episode_id) FROM picks
             WHERE user_id = ?1 AND season_id = ?2 AND contestant_id = ?3
               AND pick_type = 'STAR_BAKER'
               AND (?4 IS NULL OR episode_id != ?4)",
            params![user_id, season_id, contestant_id, exclude_episode],
            |row| row.get(0),
        )
        .context("failed to count star baker picks")?;
    Ok(count)
}

/// Load everything the scoring engine needs for one season. Returns `None`
/// when the season does not exist. A completed episode missing its outcome
/// fields is reported as `InconsistentState`; the recording path can never
/// produce one.
pub(crate) fn load_season_snapshot(
    conn: &Connection,
    season_id: &str,
) -> Result<Option<SeasonSnapshot>, LeagueError> {
    let Some(season) = get_season(conn, season_id)? else {
        return Ok(None);
    };

    let contestants = season_contestants(conn, season_id)?;
    let episodes = season_episodes(conn, season_id)?;

    let mut outcomes = Vec::new();
    for episode in episodes.iter().filter(|e| e.is_completed) {
        let (Some(star_baker_id), Some(eliminated_id)) =
            (episode.star_baker_id.clone(), episode.eliminated_id.clone())
        else {
            return Err(LeagueError::InconsistentState {
                message: format!(
                    "episode {} is marked completed but has no recorded outcome",
                    episode.id
                ),
            });
        };
        outcomes.push(EpisodeOutcome {
            episode_id: episode.id.clone(),
            episode_number: episode.episode_number,
            star_baker_id,
            eliminated_id,
            technical_winner_id: episode.technical_winner_id.clone(),
            handshakes: bonus_recipients(conn, "episode_handshakes", &episode.id)?,
            soggy_bottoms: bonus_recipients(conn, "episode_soggy_bottoms", &episode.id)?,
        });
    }

    let picks = {
        let mut stmt = conn
            .prepare(
                "SELECT p.id, p.user_id, p.season_id, p.episode_id, p.pick_type,
                        p.contestant_id, p.is_correct, p.points, p.created_at
                 FROM picks p JOIN users u ON u.id = p.user_id
                 WHERE p.season_id = ?1 AND u.is_admin = 0
                 ORDER BY p.created_at, p.id",
            )
            .context("failed to prepare snapshot picks query")?;
        let picks = stmt
            .query_map(params![season_id], map_pick)
            .context("failed to query snapshot picks")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map snapshot pick rows")?;
        picks
    };

    let users = {
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT u.id, u.name, u.email, u.is_admin
                 FROM users u JOIN picks p ON p.user_id = u.id
                 WHERE p.season_id = ?1 AND u.is_admin = 0
                 ORDER BY u.name, u.id",
            )
            .context("failed to prepare snapshot users query")?;
        let users = stmt
            .query_map(params![season_id], |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    is_admin: row.get(3)?,
                })
            })
            .context("failed to query snapshot users")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map snapshot user rows")?;
        users
    };

    let finalists = {
        let mut stmt = conn
            .prepare(
                "SELECT contestant_id FROM season_finalists
                 WHERE season_id = ?1 ORDER BY contestant_id",
            )
            .context("failed to prepare finalists query")?;
        let finalists = stmt
            .query_map(params![season_id], |row| row.get(0))
            .context("failed to query finalists")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map finalist rows")?;
        finalists
    };

    Ok(Some(SeasonSnapshot {
        season,
        contestants,
        episodes,
        outcomes,
        picks,
        users,
        finalists,
    }))
}

// ---------------------------------------------------------------------------
// Writes (callers wrap these in LeagueDb::transaction where atomicity spans
// more than one statement)
// ---------------------------------------------------------------------------

pub(crate) fn insert_season(conn: &Connection, season: &Season) -> Result<()> {
    conn.execute(
        "INSERT INTO seasons (id, name, year, is_active) VALUES (?1, ?2, ?3, ?4)",
        params![season.id, season.name, season.year, season.is_active],
    )
    .context("failed to insert season")?;
    Ok(())
}

/// Remove a season and every row that hangs off it. Children are deleted
/// leaf-first so foreign keys never see a dangling reference mid-delete.
pub(crate) fn delete_season(conn: &Connection, season_id: &str) -> Result<usize> {
    conn.execute(
        "DELETE FROM episode_handshakes WHERE episode_id IN
            (SELECT id FROM episodes WHERE season_id = ?1)",
        params![season_id],
    )
    .context("failed to delete season handshakes")?;
    conn.execute(
        "DELETE FROM episode_soggy_bottoms WHERE episode_id IN
            (SELECT id FROM episodes WHERE season_id = ?1)",
        params![season_id],
    )
    .context("failed to delete season soggy bottoms")?;
    conn.execute("DELETE FROM picks WHERE season_id = ?1", params![season_id])
        .context("failed to delete season picks")?;
    conn.execute(
        "DELETE FROM season_finalists WHERE season_id = ?1",
        params![season_id],
    )
    .context("failed to delete season finalists")?;
    conn.execute(
        "DELETE FROM user_scores WHERE season_id = ?1",
        params![season_id],
    )
    .context("failed to delete season scores")?;
    conn.execute(
        "DELETE FROM episodes WHERE season_id = ?1",
        params![season_id],
    )
    .context("failed to delete season episodes")?;
    conn.execute(
        "DELETE FROM contestants WHERE season_id = ?1",
        params![season_id],
    )
    .context("failed to delete season contestants")?;
    let n = conn
        .execute("DELETE FROM seasons WHERE id = ?1", params![season_id])
        .context("failed to delete season")?;
    Ok(n)
}

pub(crate) fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, email, is_admin) VALUES (?1, ?2, ?3, ?4)",
        params![user.id, user.name, user.email, user.is_admin],
    )
    .context("failed to insert user")?;
    Ok(())
}

pub(crate) fn insert_contestant(conn: &Connection, contestant: &Contestant) -> Result<()> {
    conn.execute(
        "INSERT INTO contestants (id, season_id, name, bio, is_eliminated)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            contestant.id,
            contestant.season_id,
            contestant.name,
            contestant.bio,
            contestant.is_eliminated
        ],
    )
    .context("failed to insert contestant")?;
    Ok(())
}

pub(crate) fn insert_episode(conn: &Connection, episode: &Episode) -> Result<()> {
    conn.execute(
        "INSERT INTO episodes
            (id, season_id, episode_number, title, air_date, is_active, is_completed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
        params![
            episode.id,
            episode.season_id,
            episode.episode_number,
            episode.title,
            episode.air_date.to_string(),
            episode.is_active
        ],
    )
    .context("failed to insert episode")?;
    Ok(())
}

pub(crate) fn update_episode_details(
    conn: &Connection,
    episode_id: &str,
    title: &str,
    episode_number: u32,
    air_date: NaiveDate,
    is_active: bool,
) -> Result<usize> {
    let n = conn
        .execute(
            "UPDATE episodes SET title = ?2, episode_number = ?3, air_date = ?4, is_active = ?5
             WHERE id = ?1",
            params![episode_id, title, episode_number, air_date.to_string(), is_active],
        )
        .context("failed to update episode")?;
    Ok(n)
}

pub(crate) fn set_episode_active(
    conn: &Connection,
    episode_id: &str,
    is_active: bool,
) -> Result<usize> {
    let n = conn
        .execute(
            "UPDATE episodes SET is_active = ?2 WHERE id = ?1",
            params![episode_id, is_active],
        )
        .context("failed to set episode active flag")?;
    Ok(n)
}

/// Write an episode's outcome and mark it completed. Re-assertion over a
/// previous outcome is legal; scores converge because scoring is
/// recompute-based.
pub(crate) fn write_episode_outcome(
    conn: &Connection,
    episode_id: &str,
    star_baker_id: &str,
    eliminated_id: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE episodes
         SET star_baker_id = ?2, eliminated_id = ?3, is_completed = 1, is_active = 0
         WHERE id = ?1",
        params![episode_id, star_baker_id, eliminated_id],
    )
    .context("failed to write episode outcome")?;
    Ok(())
}

pub(crate) fn set_technical_winner(
    conn: &Connection,
    episode_id: &str,
    contestant_id: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE episodes SET technical_winner_id = ?2 WHERE id = ?1",
        params![episode_id, contestant_id],
    )
    .context("failed to set technical challenge winner")?;
    Ok(())
}

pub(crate) fn add_bonus_entry(
    conn: &Connection,
    table: &str,
    episode_id: &str,
    contestant_id: &str,
) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO {table} (episode_id, contestant_id) VALUES (?1, ?2)"),
        params![episode_id, contestant_id],
    )
    .context("failed to add bonus entry")?;
    Ok(())
}

/// Delete every entry for one contestant in one episode (the "set exact
/// count" workflow deletes all then re-adds N).
pub(crate) fn delete_bonus_entries(
    conn: &Connection,
    table: &str,
    episode_id: &str,
    contestant_id: &str,
) -> Result<usize> {
    let n = conn
        .execute(
            &format!("DELETE FROM {table} WHERE episode_id = ?1 AND contestant_id = ?2"),
            params![episode_id, contestant_id],
        )
        .context("failed to delete bonus entries")?;
    Ok(n)
}

pub(crate) fn insert_pick(conn: &Connection, pick: &Pick) -> Result<()> {
    conn.execute(
        "INSERT INTO picks (id, user_id, season_id, episode_id, pick_type, contestant_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            pick.id,
            pick.user_id,
            pick.season_id,
            pick.episode_id,
            pick.pick_type.as_str(),
            pick.contestant_id
        ],
    )
    .context("failed to insert pick")?;
    Ok(())
}

/// Delete a user's picks of the given types, optionally scoped to an episode.
/// Returns the number of rows removed.
pub(crate) fn delete_picks(
    conn: &Connection,
    user_id: &str,
    season_id: &str,
    episode_id: Option<&str>,
    pick_types: &[PickType],
) -> Result<usize> {
    let mut total = 0;
    for ty in pick_types {
        let n = conn
            .execute(
                "DELETE FROM picks
                 WHERE user_id = ?1 AND season_id = ?2 AND pick_type = ?3
                   AND (?4 IS NULL OR episode_id = ?4)",
                params![user_id, season_id, ty.as_str(), episode_id],
            )
            .context("failed to delete picks")?;
        total += n;
    }
    Ok(total)
}

pub(crate) fn write_pick_result(
    conn: &Connection,
    pick_id: &str,
    is_correct: bool,
    points: i32,
) -> Result<()> {
    conn.execute(
        "UPDATE picks SET is_correct = ?2, points = ?3 WHERE id = ?1",
        params![pick_id, is_correct, points],
    )
    .context("failed to write pick result")?;
    Ok(())
}

pub(crate) fn set_contestant_eliminated(
    conn: &Connection,
    contestant_id: &str,
    is_eliminated: bool,
) -> Result<()> {
    conn.execute(
        "UPDATE contestants SET is_eliminated = ?2 WHERE id = ?1",
        params![contestant_id, is_eliminated],
    )
    .context("failed to update contestant elimination flag")?;
    Ok(())
}

/// Clear all score rows for a season ahead of a recompute, so users who no
/// longer have any picks do not keep a stale row.
pub(crate) fn delete_season_scores(conn: &Connection, season_id: &str) -> Result<usize> {
    let n = conn
        .execute(
            "DELETE FROM user_scores WHERE season_id = ?1",
            params![season_id],
        )
        .context("failed to clear season scores")?;
    Ok(n)
}

pub(crate) fn upsert_user_score(conn: &Connection, score: &UserScore) -> Result<()> {
    conn.execute(
        "INSERT INTO user_scores
            (user_id, season_id, total_score, weekly_score, finalist_score,
             correct_star_baker, correct_elimination, wrong_star_baker,
             wrong_elimination, technical_challenge_wins, handshakes,
             soggy_bottoms, total_episodes, total_episodes_with_picks)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(user_id, season_id) DO UPDATE SET
            total_score              = excluded.total_score,
            weekly_score             = excluded.weekly_score,
            finalist_score           = excluded.finalist_score,
            correct_star_baker       = excluded.correct_star_baker,
            correct_elimination      = excluded.correct_elimination,
            wrong_star_baker         = excluded.wrong_star_baker,
            wrong_elimination        = excluded.wrong_elimination,
            technical_challenge_wins = excluded.technical_challenge_wins,
            handshakes               = excluded.handshakes,
            soggy_bottoms            = excluded.soggy_bottoms,
            total_episodes           = excluded.total_episodes,
            total_episodes_with_picks = excluded.total_episodes_with_picks",
        params![
            score.user_id,
            score.season_id,
            score.total_score,
            score.weekly_score,
            score.finalist_score,
            score.correct_star_baker,
            score.correct_elimination,
            score.wrong_star_baker,
            score.wrong_elimination,
            score.technical_challenge_wins,
            score.handshakes,
            score.soggy_bottoms,
            score.total_episodes,
            score.total_episodes_with_picks
        ],
    )
    .context("failed to upsert user score")?;
    Ok(())
}

pub(crate) fn replace_season_finalists(
    conn: &Connection,
    season_id: &str,
    finalist_ids: &[String],
) -> Result<()> {
    conn.execute(
        "DELETE FROM season_finalists WHERE season_id = ?1",
        params![season_id],
    )
    .context("failed to clear season finalists")?;
    for contestant_id in finalist_ids {
        conn.execute(
            "INSERT INTO season_finalists (season_id, contestant_id) VALUES (?1, ?2)",
            params![season_id, contestant_id],
        )
        .context("failed to insert season finalist")?;
    }
    Ok(())
}
