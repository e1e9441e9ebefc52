//! Incremental background rating fill.
//!
//! [`RatingScanner::tick`] runs once per update tick and never does more
//! than a bounded sliver of work on the update thread: commit at most one
//! finished rating, then start at most one new computation.  The cursor
//! walks the catalog by whole sets and wraps forever; a set with nothing
//! left to rate costs one tick, which deliberately leaves a gap between
//! consecutive set visits so other job kinds sharing the worker are not
//! starved.

use std::time::Duration;

use crate::core::catalog::Catalog;
use crate::core::job::{JobRunner, JobSlot, Priority};
use crate::core::rating;

pub struct RatingScanner {
    slot: JobSlot<f64>,
    /// Set index the scan currently sits on; wraps at the end.
    cursor: usize,
    /// Chart the in-flight computation belongs to, as (set, chart) indices.
    target: Option<(usize, usize)>,
    /// How many sets the cursor advances past per idle tick.
    sets_per_tick: usize,
}

impl RatingScanner {
    pub fn new(teardown: Duration, sets_per_tick: usize) -> Self {
        Self {
            slot: JobSlot::new("rating filler", teardown),
            cursor: 0,
            target: None,
            sets_per_tick: sets_per_tick.max(1),
        }
    }

    /// True while a rating computation is queued or running.
    pub fn is_scanning(&self) -> bool {
        self.slot.is_scheduled() || self.target.is_some()
    }

    /// One tick of the maintenance loop.  Call exactly once per update.
    pub fn tick(&mut self, catalog: &mut Catalog, runner: &JobRunner) {
        // Commit a finished rating before anything else, then release the
        // slot so a new computation can start this same tick.
        if self.slot.is_ready() {
            let value = self.slot.take_result();
            self.slot.kill();
            if let Some((set_idx, chart_idx)) = self.target.take() {
                if let Some(stars) = value {
                    catalog.commit_rating(set_idx, chart_idx, stars);
                }
            }
        }

        if catalog.is_empty() {
            return;
        }
        if self.cursor >= catalog.len() {
            self.cursor = 0;
        }

        let set_idx = self.cursor;
        let Some(chart_idx) = catalog.first_unrated(set_idx) else {
            // Nothing to rate here: move on by whole sets and stop for this
            // tick.
            self.cursor = (self.cursor + self.sets_per_tick) % catalog.len();
            return;
        };

        if !self.slot.is_dead() {
            // Previous computation still winding down — hold position and
            // retry the same spot next tick.
            return;
        }

        let Some(input) = catalog.rating_input(set_idx, chart_idx) else {
            return;
        };
        self.slot.revive();
        self.target = Some((set_idx, chart_idx));
        self.slot.submit(runner, Priority::Background, move |token| {
            rating::compute(&input, token)
        });
    }

    /// Restart for a rebuilt catalog: tear down any in-flight computation
    /// (bounded wait, abandonment on timeout) and rewind the cursor.
    pub fn reset(&mut self) {
        self.slot.shutdown();
        self.slot.retire();
        self.cursor = 0;
        self.target = None;
    }
}

// ───────────────────────────────────────── tests ─────────────
