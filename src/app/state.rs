//! Central application state.
//!
//! All mutable state lives here so that the rest of the app can be pure
//! functions over `&AppState` (rendering) or `&mut AppState` (event handling).

use crate::config::AppConfig;
use crate::core::catalog::{Catalog, SortMode};
use crate::core::query::{MatchMode, SearchToken};
use crate::ui::browser::ShelfState;

/// Top-level application state.
pub struct AppState {
    /// The chart library being browsed.
    pub catalog: Catalog,
    /// Raw query text as typed.
    pub query: String,
    /// Tokens of the query the match flags currently reflect (or are about
    /// to, once the pending search lands).
    pub tokens: Vec<SearchToken>,
    /// Flag set by event handlers to restart the search job after the next
    /// draw.
    pub search_pending: bool,
    /// Flag set by event handlers to regenerate the library.
    pub rebuild_pending: bool,
    /// Whether a search job is still computing the current flags.
    pub search_running: bool,
    /// Selection index into the *visible* set list.
    pub selected: usize,
    /// Widget-level state (scroll position).
    pub shelf_state: ShelfState,
    /// Active ordering of the visible set list.
    pub sort_mode: SortMode,
    /// Controls the main event loop.
    pub should_quit: bool,
    /// An optional status message shown in the bottom bar.
    pub status_message: Option<String>,
    /// User configuration (timeouts, scan rate, match strictness).
    pub config: AppConfig,
    /// Monotonic UI tick counter (drives the spinner).
    pub tick: u64,
}

impl AppState {
    pub fn new(catalog: Catalog, config: AppConfig) -> Self {
        Self {
            catalog,
            query: String::new(),
            tokens: Vec::new(),
            search_pending: true,
            rebuild_pending: false,
            search_running: false,
            selected: 0,
            shelf_state: ShelfState::default(),
            sort_mode: SortMode::default(),
            should_quit: false,
            status_message: None,
            config,
            tick: 0,
        }
    }

    /// The matcher aggregation the configuration asks for.
    pub fn match_mode(&self) -> MatchMode {
        if self.config.strict_match {
            MatchMode::SingleChart
        } else {
            MatchMode::Independent
        }
    }

    /// Keep the selection inside the visible list after flags changed.
    pub fn clamp_selection(&mut self) {
        let visible = self.catalog.visible_sets(self.sort_mode).len();
        if visible == 0 {
            self.selected = 0;
            self.shelf_state.scroll = 0;
        } else if self.selected >= visible {
            self.selected = visible - 1;
        }
    }
}
