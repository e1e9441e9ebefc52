//! Background search runtime — one job slot for the "search matcher" kind.
//!
//! Query edits restart the matcher through the forced-cancellation protocol;
//! the worker evaluates a catalog snapshot and the finished verdicts are
//! merged onto the live match flags here, on the update thread.

use std::time::Duration;

use crate::core::catalog::{Catalog, SearchVerdicts, SetVerdict};
use crate::core::job::{CancelToken, JobRunner, JobSlot, Priority};
use crate::core::query::{self, MatchMode, SearchToken};

pub struct SearchRuntime {
    slot: JobSlot<SearchVerdicts>,
}

impl SearchRuntime {
    pub fn new(teardown: Duration) -> Self {
        Self {
            slot: JobSlot::new("search matcher", teardown),
        }
    }

    /// True while a match pass is queued or computing.
    pub fn is_running(&self) -> bool {
        self.slot.is_scheduled() && !self.slot.is_ready()
    }

    /// Restart the matcher for an edited query.  Any in-flight pass goes
    /// through kill + bounded wait first (abandoned on timeout).  An empty
    /// token list never reaches the engine: search is inactive and every
    /// flag is forced true synchronously.
    pub fn restart(
        &mut self,
        runner: &JobRunner,
        catalog: &mut Catalog,
        tokens: Vec<SearchToken>,
        mode: MatchMode,
    ) {
        self.slot.shutdown();

        if tokens.is_empty() {
            // Retire rather than leave the slot merely killed: a late
            // completion from an abandoned pass must not resurface once the
            // flags have been forced.
            self.slot.retire();
            catalog.set_all_matched(true);
            return;
        }

        self.slot.revive();
        let snapshot = catalog.snapshot();
        self.slot
            .submit(runner, Priority::Interactive, move |token| {
                run_match(&snapshot, &tokens, mode, token)
            });
    }

    /// Merge a finished pass onto the catalog.  Returns `true` when the
    /// match flags changed.
    pub fn poll(&mut self, catalog: &mut Catalog) -> bool {
        if !self.slot.is_ready() {
            return false;
        }
        let verdicts = self.slot.take_result();
        self.slot.kill();
        match verdicts {
            Some(v) => catalog.apply_verdicts(&v),
            None => false,
        }
    }
}

/// Worker-side body: evaluate every set of the snapshot.  Polls the token
/// once per set and returns `None` (partial results discarded) on
/// cancellation.
fn run_match(
    snapshot: &Catalog,
    tokens: &[SearchToken],
    mode: MatchMode,
    token: &CancelToken,
) -> Option<SearchVerdicts> {
    let mut sets = Vec::with_capacity(snapshot.len());
    for set in &snapshot.sets {
        if token.is_cancelled() {
            return None;
        }
        let charts = set
            .charts
            .iter()
            .map(|chart| query::chart_matches(set, chart, tokens))
            .collect();
        sets.push(SetVerdict {
            matched: query::evaluate(set, tokens, mode),
            charts,
        });
    }
    Some(SearchVerdicts {
        generation: snapshot.generation,
        sets,
    })
}

// ───────────────────────────────────────── tests ─────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{Chart, ChartSet};
    use crate::core::query::tokenize;

    fn demo_catalog() -> Catalog {
        Catalog::new(vec![
            ChartSet::new(
                1,
                "Neon Skyline",
                "Aki Sound",
                "Winter Pack 3",
                "stream",
                vec![
                    Chart::new(10, "Standard", 150.0, 120.0, 600, 60, 90).with_stars(3.5),
                    Chart::new(11, "Expert", 150.0, 120.0, 900, 90, 200).with_stars(6.5),
                ],
            ),
            ChartSet::new(
                2,
                "Paper Garden",
                "Velda",
                "Starter Bundle",
                "chill",
                vec![Chart::new(20, "Standard", 128.0, 100.0, 400, 80, 40).with_stars(2.75)],
            ),
        ])
    }

    fn runtime() -> SearchRuntime {
        SearchRuntime::new(Duration::from_millis(50))
    }

    #[test]
    fn test_empty_query_forces_flags_without_engine() {
        let runner = JobRunner::manual();
        let mut catalog = demo_catalog();
        catalog.set_all_matched(false);
        let mut search = runtime();

        search.restart(&runner, &mut catalog, Vec::new(), MatchMode::Independent);
        assert_eq!(runner.pending(), 0, "no job submitted for an empty query");
        assert!(catalog.sets.iter().all(|s| s.matched));
        assert!(catalog
            .sets
            .iter()
            .flat_map(|s| &s.charts)
            .all(|c| c.matched));
    }

    #[test]
    fn test_restart_then_poll_applies_individual_verdicts() {
        let runner = JobRunner::manual();
        let mut catalog = demo_catalog();
        let mut search = runtime();

        search.restart(
            &runner,
            &mut catalog,
            tokenize("stars>=5"),
            MatchMode::Independent,
        );
        assert_eq!(runner.pending(), 1);
        assert!(!search.poll(&mut catalog), "nothing to merge before the job runs");

        runner.run_pending();
        assert!(search.poll(&mut catalog));

        // The set matches through its Expert chart, but each chart carries
        // its own verdict, not the set's aggregate.
        assert!(catalog.sets[0].matched);
        assert!(!catalog.sets[0].charts[0].matched);
        assert!(catalog.sets[0].charts[1].matched);
        assert!(!catalog.sets[1].matched);
        assert!(!catalog.sets[1].charts[0].matched);
    }

    #[test]
    fn test_verdicts_from_before_a_rebuild_are_dropped() {
        let runner = JobRunner::manual();
        let mut catalog = demo_catalog();
        let mut search = runtime();

        search.restart(
            &runner,
            &mut catalog,
            tokenize("velda"),
            MatchMode::Independent,
        );

        // Library replaced while the pass is still queued.
        let replacement = demo_catalog().sets;
        catalog.rebuild(replacement);

        runner.run_pending();
        assert!(!search.poll(&mut catalog), "stale-generation verdicts must not land");
        assert!(catalog.sets.iter().all(|s| s.matched));
    }

    #[test]
    fn test_keystroke_restart_discards_earlier_pass() {
        let runner = JobRunner::manual();
        let mut catalog = demo_catalog();
        let mut search = runtime();

        search.restart(&runner, &mut catalog, tokenize("paper"), MatchMode::Independent);
        // Second keystroke before the first pass ran: teardown times out on
        // the queued body and the run is abandoned.
        search.restart(&runner, &mut catalog, tokenize("neon"), MatchMode::Independent);

        runner.run_pending();
        assert!(search.poll(&mut catalog));
        assert!(catalog.sets[0].matched, "flags reflect the latest query");
        assert!(!catalog.sets[1].matched);
    }
}
