//! In-memory chart catalog — sets of charts plus their match flags.
//!
//! The catalog owns every [`ChartSet`] and [`Chart`] for the life of one
//! library load.  Background jobs never touch it directly: the search
//! matcher works on a cloned snapshot and hands back [`SearchVerdicts`],
//! the rating scanner hands back a single number, and both are merged here
//! on the update thread.

use std::cmp::Ordering;

use crate::core::rating::RatingInput;

// ───────────────────────────────────────── chart ─────────────

/// A single playable chart (one difficulty of a set).
#[derive(Debug, Clone)]
pub struct Chart {
    pub id: u64,
    /// Difficulty name, e.g. `"Another"`, `"Expert"`.
    pub name: String,
    pub name_lower: String,
    /// Computed difficulty rating.  `<= 0` means not yet rated.
    pub stars: f64,
    pub bpm: f64,
    pub length_secs: f64,
    pub notes: u32,
    pub holds: u32,
    pub jumps: u32,
    /// Whether this chart individually satisfies the active query.
    /// Written by the search merge on the update thread, read by the UI.
    pub matched: bool,
}

impl Chart {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        bpm: f64,
        length_secs: f64,
        notes: u32,
        holds: u32,
        jumps: u32,
    ) -> Self {
        let name = name.into();
        Self {
            name_lower: name.to_lowercase(),
            name,
            id,
            stars: 0.0,
            bpm,
            length_secs,
            notes,
            holds,
            jumps,
            matched: true,
        }
    }

    /// Builder used for demo data that ships pre-rated.
    pub fn with_stars(mut self, stars: f64) -> Self {
        self.stars = stars;
        self
    }

    pub fn is_rated(&self) -> bool {
        self.stars > 0.0
    }

    /// Average note density in notes per second.
    pub fn nps(&self) -> f64 {
        if self.length_secs <= 0.0 {
            0.0
        } else {
            f64::from(self.notes) / self.length_secs
        }
    }

    pub fn rating_input(&self) -> RatingInput {
        RatingInput {
            notes: self.notes,
            holds: self.holds,
            jumps: self.jumps,
            bpm: self.bpm,
            length_secs: self.length_secs,
        }
    }
}

// ───────────────────────────────────────── chart set ─────────

/// A set groups the charts of one song.
#[derive(Debug, Clone)]
pub struct ChartSet {
    pub id: u64,
    pub title: String,
    pub title_lower: String,
    pub artist: String,
    pub artist_lower: String,
    /// Provenance — which pack the set shipped in.
    pub pack: String,
    pub pack_lower: String,
    pub tags: String,
    pub tags_lower: String,
    pub charts: Vec<Chart>,
    /// Set-level verdict for the active query; decides whether the set is
    /// shown at all.
    pub matched: bool,
    /// Whether the set's chart rows are unfolded in the UI.
    pub expanded: bool,
    /// Highest rated-chart stars — the set's ordering/tie key.
    pub peak_stars: f64,
}

impl ChartSet {
    pub fn new(
        id: u64,
        title: impl Into<String>,
        artist: impl Into<String>,
        pack: impl Into<String>,
        tags: impl Into<String>,
        charts: Vec<Chart>,
    ) -> Self {
        let title = title.into();
        let artist = artist.into();
        let pack = pack.into();
        let tags = tags.into();
        let peak_stars = charts
            .iter()
            .filter(|c| c.is_rated())
            .map(|c| c.stars)
            .fold(0.0, f64::max);
        Self {
            title_lower: title.to_lowercase(),
            artist_lower: artist.to_lowercase(),
            pack_lower: pack.to_lowercase(),
            tags_lower: tags.to_lowercase(),
            title,
            artist,
            pack,
            tags,
            id,
            charts,
            matched: true,
            expanded: false,
            peak_stars,
        }
    }

    fn refresh_peak_stars(&mut self) {
        self.peak_stars = self
            .charts
            .iter()
            .filter(|c| c.is_rated())
            .map(|c| c.stars)
            .fold(0.0, f64::max);
    }
}

// ───────────────────────────────────────── verdicts ──────────

/// Per-set output of one search-matcher run.
#[derive(Debug, Clone)]
pub struct SetVerdict {
    /// Set-level aggregate verdict (decides visibility).
    pub matched: bool,
    /// Individual verdict per chart, in chart order.
    pub charts: Vec<bool>,
}

/// Private working buffer of a search-matcher run, merged onto the catalog
/// only on the update thread.
#[derive(Debug, Clone)]
pub struct SearchVerdicts {
    /// Catalog generation the snapshot was taken from.
    pub generation: u64,
    pub sets: Vec<SetVerdict>,
}

// ───────────────────────────────────────── catalog ───────────

#[derive(Debug, Clone)]
pub struct Catalog {
    pub sets: Vec<ChartSet>,
    /// Bumped on every rebuild; background results stamped with an older
    /// generation are dropped on merge.
    pub generation: u64,
}

impl Catalog {
    pub fn new(sets: Vec<ChartSet>) -> Self {
        Self { sets, generation: 0 }
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Replace the whole library.  Any in-flight job results from the old
    /// library die at the generation check.
    pub fn rebuild(&mut self, sets: Vec<ChartSet>) {
        self.sets = sets;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Snapshot for a worker-side search pass.  Flags in the clone are
    /// meaningless; only text and metrics are read from it.
    pub fn snapshot(&self) -> Catalog {
        self.clone()
    }

    /// Index of the first unrated chart in `set_idx`, if any.
    pub fn first_unrated(&self, set_idx: usize) -> Option<usize> {
        self.sets
            .get(set_idx)?
            .charts
            .iter()
            .position(|c| !c.is_rated())
    }

    pub fn rating_input(&self, set_idx: usize, chart_idx: usize) -> Option<RatingInput> {
        Some(self.sets.get(set_idx)?.charts.get(chart_idx)?.rating_input())
    }

    /// Write a freshly computed rating onto a chart and refresh the owning
    /// set's ordering key.  Ratings are rounded to 2 decimal places so that
    /// exact `=` comparisons in queries are meaningful.
    pub fn commit_rating(&mut self, set_idx: usize, chart_idx: usize, stars: f64) {
        let Some(set) = self.sets.get_mut(set_idx) else {
            return;
        };
        let Some(chart) = set.charts.get_mut(chart_idx) else {
            return;
        };
        chart.stars = ((stars * 100.0).round() / 100.0).max(0.01);
        set.refresh_peak_stars();
    }

    /// Force every match flag — used when the query is empty and search is
    /// considered inactive (the query engine is not consulted).
    pub fn set_all_matched(&mut self, matched: bool) {
        for set in &mut self.sets {
            set.matched = matched;
            for chart in &mut set.charts {
                chart.matched = matched;
            }
        }
    }

    /// Merge a finished search run onto the match flags.  Returns `false`
    /// (and changes nothing) when the verdicts are from an older generation
    /// or the shapes no longer line up.
    pub fn apply_verdicts(&mut self, verdicts: &SearchVerdicts) -> bool {
        if verdicts.generation != self.generation || verdicts.sets.len() != self.sets.len() {
            tracing::debug!(
                got = verdicts.generation,
                current = self.generation,
                "dropping stale search verdicts"
            );
            return false;
        }
        for (set, verdict) in self.sets.iter_mut().zip(&verdicts.sets) {
            set.matched = verdict.matched;
            for (chart, &m) in set.charts.iter_mut().zip(&verdict.charts) {
                chart.matched = m;
            }
        }
        true
    }

    /// Indices of sets passing the active query, in `mode` order.
    pub fn visible_sets(&self, mode: SortMode) -> Vec<usize> {
        let mut out: Vec<usize> = (0..self.sets.len())
            .filter(|&i| self.sets[i].matched)
            .collect();
        let cmp = comparator(mode);
        out.sort_by(|&a, &b| cmp(&self.sets[a], &self.sets[b]));
        out
    }

    pub fn rated_charts(&self) -> (usize, usize) {
        let mut rated = 0;
        let mut total = 0;
        for set in &self.sets {
            total += set.charts.len();
            rated += set.charts.iter().filter(|c| c.is_rated()).count();
        }
        (rated, total)
    }
}

// ───────────────────────────────────────── set ordering ──────

/// How the visible set list is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Title,
    Artist,
    PeakStars,
    Pack,
}

impl SortMode {
    pub fn next(self) -> Self {
        match self {
            SortMode::Title => SortMode::Artist,
            SortMode::Artist => SortMode::PeakStars,
            SortMode::PeakStars => SortMode::Pack,
            SortMode::Pack => SortMode::Title,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortMode::Title => "title",
            SortMode::Artist => "artist",
            SortMode::PeakStars => "stars",
            SortMode::Pack => "pack",
        }
    }
}

pub type SetComparator = fn(&ChartSet, &ChartSet) -> Ordering;

/// Comparator registry — dispatch only; every comparator falls back to the
/// set's peak-stars tie key, then the stable id.
pub fn comparator(mode: SortMode) -> SetComparator {
    match mode {
        SortMode::Title => |a, b| a.title_lower.cmp(&b.title_lower).then_with(|| tie(a, b)),
        SortMode::Artist => |a, b| a.artist_lower.cmp(&b.artist_lower).then_with(|| tie(a, b)),
        SortMode::PeakStars => {
            |a, b| b.peak_stars.total_cmp(&a.peak_stars).then_with(|| tie(a, b))
        }
        SortMode::Pack => |a, b| a.pack_lower.cmp(&b.pack_lower).then_with(|| tie(a, b)),
    }
}

fn tie(a: &ChartSet, b: &ChartSet) -> Ordering {
    b.peak_stars
        .total_cmp(&a.peak_stars)
        .then_with(|| a.id.cmp(&b.id))
}

// ───────────────────────────────────────── tests ─────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn set(id: u64, title: &str, charts: Vec<Chart>) -> ChartSet {
        ChartSet::new(id, title, "artist", "pack", "", charts)
    }

    #[test]
    fn test_commit_rating_rounds_and_updates_peak() {
        let mut catalog = Catalog::new(vec![set(
            1,
            "alpha",
            vec![
                Chart::new(10, "easy", 120.0, 90.0, 200, 20, 10),
                Chart::new(11, "hard", 120.0, 90.0, 500, 50, 80),
            ],
        )]);

        catalog.commit_rating(0, 1, 7.2345);
        assert_eq!(catalog.sets[0].charts[1].stars, 7.23);
        assert_eq!(catalog.sets[0].peak_stars, 7.23);

        catalog.commit_rating(0, 0, 3.999);
        assert_eq!(catalog.sets[0].charts[0].stars, 4.0);
        assert_eq!(catalog.sets[0].peak_stars, 7.23);
    }

    #[test]
    fn test_commit_rating_out_of_bounds_is_ignored() {
        let mut catalog = Catalog::new(vec![set(
            1,
            "alpha",
            vec![Chart::new(10, "easy", 120.0, 90.0, 200, 20, 10)],
        )]);
        catalog.commit_rating(3, 0, 5.0);
        catalog.commit_rating(0, 9, 5.0);
        assert!(!catalog.sets[0].charts[0].is_rated());
    }

    #[test]
    fn test_apply_verdicts_writes_individual_and_set_flags() {
        let mut catalog = Catalog::new(vec![set(
            1,
            "alpha",
            vec![
                Chart::new(10, "easy", 120.0, 90.0, 200, 20, 10),
                Chart::new(11, "hard", 120.0, 90.0, 500, 50, 80),
            ],
        )]);

        let verdicts = SearchVerdicts {
            generation: 0,
            sets: vec![SetVerdict {
                matched: true,
                charts: vec![false, true],
            }],
        };
        assert!(catalog.apply_verdicts(&verdicts));
        assert!(catalog.sets[0].matched);
        assert!(!catalog.sets[0].charts[0].matched);
        assert!(catalog.sets[0].charts[1].matched);
    }

    #[test]
    fn test_stale_generation_verdicts_are_dropped() {
        let mut catalog = Catalog::new(vec![set(
            1,
            "alpha",
            vec![Chart::new(10, "easy", 120.0, 90.0, 200, 20, 10)],
        )]);
        catalog.rebuild(vec![set(
            2,
            "beta",
            vec![Chart::new(20, "easy", 130.0, 95.0, 220, 25, 12)],
        )]);

        let stale = SearchVerdicts {
            generation: 0,
            sets: vec![SetVerdict {
                matched: false,
                charts: vec![false],
            }],
        };
        assert!(!catalog.apply_verdicts(&stale));
        assert!(catalog.sets[0].matched, "flags untouched by stale verdicts");
    }

    #[test]
    fn test_set_all_matched_forces_every_flag() {
        let mut catalog = Catalog::new(vec![set(
            1,
            "alpha",
            vec![Chart::new(10, "easy", 120.0, 90.0, 200, 20, 10)],
        )]);
        catalog.set_all_matched(false);
        assert!(!catalog.sets[0].matched);
        assert!(!catalog.sets[0].charts[0].matched);
        catalog.set_all_matched(true);
        assert!(catalog.sets[0].matched);
        assert!(catalog.sets[0].charts[0].matched);
    }

    #[test]
    fn test_visible_sets_filters_and_sorts() {
        let mut catalog = Catalog::new(vec![
            set(1, "zebra", vec![Chart::new(10, "x", 120.0, 90.0, 1, 0, 0)]),
            set(2, "apple", vec![Chart::new(11, "x", 120.0, 90.0, 1, 0, 0)]),
            set(3, "mango", vec![Chart::new(12, "x", 120.0, 90.0, 1, 0, 0)]),
        ]);
        catalog.sets[2].matched = false;

        let visible = catalog.visible_sets(SortMode::Title);
        assert_eq!(visible, vec![1, 0]);
    }

    #[test]
    fn test_peak_stars_comparator_sorts_descending() {
        let mut a = set(1, "a", vec![Chart::new(10, "x", 120.0, 90.0, 1, 0, 0)]);
        let mut b = set(2, "b", vec![Chart::new(11, "x", 120.0, 90.0, 1, 0, 0)]);
        a.charts[0].stars = 3.0;
        a.refresh_peak_stars();
        b.charts[0].stars = 8.5;
        b.refresh_peak_stars();

        let cmp = comparator(SortMode::PeakStars);
        assert_eq!(cmp(&b, &a), Ordering::Less);
    }
}
