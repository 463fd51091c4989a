// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod config;
pub mod db;
pub mod error;
pub mod league;
pub mod live;
pub mod live_server;
pub mod picks;
pub mod roster;
pub mod scoring;

pub use config::Config;
pub use db::LeagueDb;
pub use error::LeagueError;
