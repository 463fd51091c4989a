//! League domain: entities, admin operations, and the elimination ledger.

pub mod admin;
pub mod ledger;
pub mod model;

pub use admin::LeagueAdmin;
pub use model::{
    Contestant, Episode, EpisodeOutcome, Pick, PickType, Season, SeasonSnapshot, User, UserScore,
};
