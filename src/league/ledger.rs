//! Elimination ledger: derives who is out of the competition from recorded
//! episode outcomes, and reconciles the stored contestant flags with that
//! derived truth.

use std::collections::HashSet;

use tracing::info;

use crate::db::{self, LeagueDb};
use crate::error::LeagueError;
use crate::league::model::EpisodeOutcome;

/// The set of contestant ids eliminated by the given outcomes. Completed
/// episodes are the only source of truth; the stored `is_eliminated` flags
/// are a cache of this set.
pub fn eliminated_ids(outcomes: &[EpisodeOutcome]) -> HashSet<String> {
    outcomes.iter().map(|o| o.eliminated_id.clone()).collect()
}

/// Recompute every contestant's elimination flag for a season from its
/// completed episodes and write back only the flags that changed. Returns
/// the number of contestants updated; an unknown season is a no-op.
///
/// The whole reconciliation happens in one transaction, so readers never
/// observe a half-updated season.
pub fn recalculate_elimination_status(
    db: &LeagueDb,
    season_id: &str,
) -> Result<usize, LeagueError> {
    let updated = db.transaction(|tx| {
        let Some(snapshot) = db::load_season_snapshot(tx, season_id)? else {
            return Ok(0);
        };

        let eliminated = eliminated_ids(&snapshot.outcomes);
        let mut updated = 0;
        for contestant in &snapshot.contestants {
            let should_be = eliminated.contains(&contestant.id);
            if contestant.is_eliminated != should_be {
                db::set_contestant_eliminated(tx, &contestant.id, should_be)?;
                updated += 1;
            }
        }
        Ok(updated)
    })?;

    if updated > 0 {
        info!(season_id, updated, "reconciled elimination status");
    }
    Ok(updated)
}
