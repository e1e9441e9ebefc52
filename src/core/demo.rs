//! Built-in demo library.
//!
//! Catalog persistence is an external concern, so the binary ships a
//! deterministic generated library instead: enough sets, packs and metric
//! spread to exercise search and the rating scanner end to end.

use std::str::FromStr;

use thiserror::Error;

use crate::core::catalog::{Catalog, Chart, ChartSet};

/// How big a demo library to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryProfile {
    Small,
    Standard,
    Large,
}

#[derive(Debug, Error)]
#[error("unknown library profile `{0}` (expected small, standard or large)")]
pub struct ProfileError(String);

impl FromStr for LibraryProfile {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "small" => Ok(LibraryProfile::Small),
            "standard" => Ok(LibraryProfile::Standard),
            "large" => Ok(LibraryProfile::Large),
            other => Err(ProfileError(other.to_string())),
        }
    }
}

impl LibraryProfile {
    fn set_count(self) -> usize {
        match self {
            LibraryProfile::Small => 12,
            LibraryProfile::Standard => 64,
            LibraryProfile::Large => 320,
        }
    }
}

const TITLE_HEADS: &[&str] = &[
    "Neon", "Crimson", "Paper", "Static", "Velvet", "Hollow", "Glass", "Amber", "Silent", "Wired",
    "Lunar", "Feral",
];
const TITLE_TAILS: &[&str] = &[
    "Skyline", "Cascade", "Horizon", "Machine", "Garden", "Signal", "Parade", "Mirage", "Anthem",
    "Circuit", "Harbor",
];
const ARTISTS: &[&str] = &[
    "Aki Sound", "Mille Feuille", "DJ Totteri", "Nachtfalter", "Polar Unit", "Sawgrass",
    "Kites Over Io", "Brine & Co", "Velda", "Counterweight",
];
const PACKS: &[&str] = &[
    "Winter Pack 3", "Community Picks", "Arcade Revival", "Midnight Sessions", "Starter Bundle",
];
const TAG_POOL: &[&str] = &[
    "stream", "jumpy", "tech", "stamina", "chill", "speed", "classic", "marathon",
];
const CHART_NAMES: &[&str] = &["Beginner", "Standard", "Another", "Expert"];

/// Generate a deterministic catalog for the given profile.  A slice of the
/// library ships pre-rated so sorting by stars works before the background
/// scanner catches up.
pub fn build(profile: LibraryProfile) -> Catalog {
    let mut sets = Vec::with_capacity(profile.set_count());
    let mut chart_id = 1_000u64;

    for i in 0..profile.set_count() {
        let title = format!(
            "{} {}",
            TITLE_HEADS[i % TITLE_HEADS.len()],
            TITLE_TAILS[(i / TITLE_HEADS.len() + i) % TITLE_TAILS.len()],
        );
        let artist = ARTISTS[(i * 3 + 1) % ARTISTS.len()];
        let pack = PACKS[(i / 7) % PACKS.len()];
        let tags = format!(
            "{} {}",
            TAG_POOL[i % TAG_POOL.len()],
            TAG_POOL[(i * 5 + 2) % TAG_POOL.len()],
        );

        let chart_count = 1 + (i * 7 + 3) % CHART_NAMES.len();
        let mut charts = Vec::with_capacity(chart_count);
        for d in 0..chart_count {
            let bpm = 120.0 + ((i * 13 + d * 29) % 140) as f64;
            let length = 75.0 + ((i * 31 + d * 11) % 150) as f64;
            let notes = 250 + ((i * 97 + d * 451) % 1500) as u32;
            let holds = notes / (6 + (d as u32 % 5));
            let jumps = notes / (4 + (i as u32 % 6));
            let mut chart = Chart::new(
                chart_id,
                CHART_NAMES[d % CHART_NAMES.len()],
                bpm,
                length,
                notes,
                holds,
                jumps,
            );
            // Every fifth set ships pre-rated from a previous session.
            if i % 5 == 0 {
                let stars = 1.5 + ((i + d * 3) % 9) as f64 * 0.85;
                chart = chart.with_stars((stars * 100.0).round() / 100.0);
            }
            charts.push(chart);
            chart_id += 1;
        }

        sets.push(ChartSet::new(
            i as u64 + 1,
            title,
            artist,
            pack,
            tags,
            charts,
        ));
    }

    Catalog::new(sets)
}
