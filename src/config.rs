// Configuration loading and parsing (league.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueRules,
    pub scoring: ScoringRules,
    pub ws_port: u16,
    pub db_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            league: LeagueRules::default(),
            scoring: ScoringRules::default(),
            ws_port: 9001,
            db_path: "bakeoff-league.db".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire league.toml file.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueRules,
    scoring: ScoringRules,
    websocket: WebsocketSection,
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
struct WebsocketSection {
    port: u16,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

/// League-wide pick rules.
#[derive(Debug, Clone, Deserialize)]
pub struct LeagueRules {
    pub name: String,
    /// Maximum number of distinct episodes in which a user may pick the same
    /// contestant as Star Baker.
    pub star_baker_pick_cap: u32,
    /// Number of contestants in a finalist submission.
    pub finalist_count: u32,
}

impl Default for LeagueRules {
    fn default() -> Self {
        LeagueRules {
            name: "Fantasy Bake-Off League".to_string(),
            star_baker_pick_cap: 2,
            finalist_count: 3,
        }
    }
}

/// The single scoring rule table. Every point value in the engine comes from
/// here; there is deliberately no second set of constants anywhere else.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScoringRules {
    /// Correct Star Baker pick.
    pub star_baker_correct: i32,
    /// Correct Elimination pick.
    pub elimination_correct: i32,
    /// Star Baker pick turned out to be the eliminated contestant.
    pub star_baker_eliminated: i32,
    /// Elimination pick turned out to win Star Baker.
    pub elimination_star_baker: i32,
    /// Bonus when a correct Star Baker pick also won the Technical Challenge.
    pub technical_challenge_win: i32,
    /// Bonus per handshake received by a correct Star Baker pick.
    pub handshake: i32,
    /// Penalty per soggy-bottom comment received by a correct Star Baker pick.
    pub soggy_bottom: i32,
    /// Points per correct finalist pick, scored once at season end.
    pub finalist_correct: i32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        ScoringRules {
            star_baker_correct: 3,
            elimination_correct: 2,
            star_baker_eliminated: -3,
            elimination_star_baker: -3,
            technical_challenge_win: 1,
            handshake: 1,
            soggy_bottom: -1,
            finalist_correct: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` relative to the
/// given `base_dir`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let league_path = base_dir.join("config").join("league.toml");
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;

    let config = Config {
        league: league_file.league,
        scoring: league_file.scoring,
        ws_port: league_file.websocket.port,
        db_path: league_file.database.path,
    };

    validate(&config)?;

    Ok(config)
}

/// Convenience wrapper: loads config relative to the current working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.star_baker_pick_cap == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.star_baker_pick_cap".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.league.finalist_count == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.finalist_count".into(),
            message: "must be greater than 0".into(),
        });
    }

    // Correct picks must be worth something; penalties and the soggy-bottom
    // deduction must not be rewards.
    let s = &config.scoring;
    let positive_fields: &[(&str, i32)] = &[
        ("scoring.star_baker_correct", s.star_baker_correct),
        ("scoring.elimination_correct", s.elimination_correct),
        ("scoring.finalist_correct", s.finalist_correct),
    ];
    for (name, val) in positive_fields {
        if *val <= 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be > 0, got {val}"),
            });
        }
    }

    let non_positive_fields: &[(&str, i32)] = &[
        ("scoring.star_baker_eliminated", s.star_baker_eliminated),
        ("scoring.elimination_star_baker", s.elimination_star_baker),
        ("scoring.soggy_bottom", s.soggy_bottom),
    ];
    for (name, val) in non_positive_fields {
        if *val > 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be <= 0, got {val}"),
            });
        }
    }

    if s.technical_challenge_win < 0 || s.handshake < 0 {
        return Err(ConfigError::ValidationError {
            field: "scoring.bonuses".into(),
            message: "technical_challenge_win and handshake must be >= 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const VALID_LEAGUE_TOML: &str = r#"
[league]
name = "Test Bake-Off League"
star_baker_pick_cap = 2
finalist_count = 3

[scoring]
star_baker_correct = 3
elimination_correct = 2
star_baker_eliminated = -3
elimination_star_baker = -3
technical_challenge_win = 1
handshake = 1
soggy_bottom = -1
finalist_correct = 3

[websocket]
port = 9001

[database]
path = "bakeoff-league.db"
"#;

    /// Helper: write `league.toml` content into a fresh temp config dir and
    /// return the base dir.
    fn write_config(tag: &str, content: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(format!("bakeoff_config_test_{tag}"));
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("league.toml"), content).unwrap();
        tmp
    }

    #[test]
    fn load_valid_config() {
        let base = write_config("valid", VALID_LEAGUE_TOML);
        let config = load_config_from(&base).expect("should load valid config");

        assert_eq!(config.league.name, "Test Bake-Off League");
        assert_eq!(config.league.star_baker_pick_cap, 2);
        assert_eq!(config.league.finalist_count, 3);
        assert_eq!(config.scoring.star_baker_correct, 3);
        assert_eq!(config.scoring.elimination_correct, 2);
        assert_eq!(config.scoring.star_baker_eliminated, -3);
        assert_eq!(config.scoring.soggy_bottom, -1);
        assert_eq!(config.ws_port, 9001);
        assert_eq!(config.db_path, "bakeoff-league.db");

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn default_config_matches_rule_table() {
        let config = Config::default();
        assert_eq!(config.scoring.star_baker_correct, 3);
        assert_eq!(config.scoring.elimination_correct, 2);
        assert_eq!(config.scoring.star_baker_eliminated, -3);
        assert_eq!(config.scoring.elimination_star_baker, -3);
        assert_eq!(config.scoring.technical_challenge_win, 1);
        assert_eq!(config.scoring.handshake, 1);
        assert_eq!(config.scoring.soggy_bottom, -1);
        assert_eq!(config.scoring.finalist_correct, 3);
        assert_eq!(config.league.star_baker_pick_cap, 2);
        assert_eq!(config.league.finalist_count, 3);
    }

    #[test]
    fn rejects_zero_pick_cap() {
        let content = VALID_LEAGUE_TOML.replace("star_baker_pick_cap = 2", "star_baker_pick_cap = 0");
        let base = write_config("zero_cap", &content);

        let err = load_config_from(&base).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "league.star_baker_pick_cap");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn rejects_non_positive_correct_points() {
        let content = VALID_LEAGUE_TOML.replace("star_baker_correct = 3", "star_baker_correct = 0");
        let base = write_config("zero_correct", &content);

        let err = load_config_from(&base).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "scoring.star_baker_correct");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn rejects_positive_penalty() {
        let content =
            VALID_LEAGUE_TOML.replace("star_baker_eliminated = -3", "star_baker_eliminated = 3");
        let base = write_config("positive_penalty", &content);

        let err = load_config_from(&base).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "scoring.star_baker_eliminated");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn file_not_found_for_missing_league_toml() {
        let tmp = std::env::temp_dir().join("bakeoff_config_test_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => {
                assert!(path.ends_with("league.toml"));
            }
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let base = write_config("invalid_toml", "this is not valid [[[ toml");

        let err = load_config_from(&base).unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => {
                assert!(path.ends_with("league.toml"));
            }
            other => panic!("expected ParseError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&base);
    }
}
