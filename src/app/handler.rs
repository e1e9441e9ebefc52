//! Input handling — maps key events to state mutations.
//!
//! The query line owns every printable key, song-select style: there is no
//! separate "search focus" to toggle.  Navigation and folding live on the
//! non-printable keys.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::state::AppState;

/// Process a key event.
pub fn handle_key(state: &mut AppState, key: KeyEvent) {
    if key.kind == KeyEventKind::Release {
        return;
    }

    // Ctrl shortcuts first — printable keys otherwise belong to the query.
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') => state.should_quit = true,
            KeyCode::Char('r') => {
                state.rebuild_pending = true;
                state.status_message = Some("reloading library…".into());
            }
            KeyCode::Char('u') => {
                if !state.query.is_empty() {
                    state.query.clear();
                    state.search_pending = true;
                }
            }
            KeyCode::Char('s') => {
                state.config.strict_match = !state.config.strict_match;
                state.search_pending = true;
                state.status_message = Some(if state.config.strict_match {
                    "strict matching: one chart must satisfy the whole query".into()
                } else {
                    "loose matching: expression and text passes are independent".into()
                });
                if state.config.save().is_err() {
                    state.status_message = Some("could not save config".into());
                }
            }
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char(c) => {
            state.query.push(c);
            state.search_pending = true;
        }
        KeyCode::Backspace => {
            if state.query.pop().is_some() {
                state.search_pending = true;
            }
        }
        KeyCode::Esc => {
            if state.query.is_empty() {
                state.should_quit = true;
            } else {
                state.query.clear();
                state.search_pending = true;
            }
        }
        KeyCode::Up => move_selection(state, -1),
        KeyCode::Down => move_selection(state, 1),
        KeyCode::PageUp => move_selection(state, -10),
        KeyCode::PageDown => move_selection(state, 10),
        KeyCode::Right | KeyCode::Enter => set_expanded(state, true),
        KeyCode::Left => set_expanded(state, false),
        KeyCode::Tab => {
            state.sort_mode = state.sort_mode.next();
            state.status_message = Some(format!("sorted by {}", state.sort_mode.label()));
        }
        _ => {}
    }
}

fn move_selection(state: &mut AppState, delta: i64) {
    let visible = state.catalog.visible_sets(state.sort_mode).len();
    if visible == 0 {
        return;
    }
    let current = state.selected as i64;
    state.selected = (current + delta).clamp(0, visible as i64 - 1) as usize;
}

fn set_expanded(state: &mut AppState, expanded: bool) {
    let visible = state.catalog.visible_sets(state.sort_mode);
    let Some(&set_idx) = visible.get(state.selected) else {
        return;
    };
    if let Some(set) = state.catalog.sets.get_mut(set_idx) {
        set.expanded = expanded;
    }
}

// ───────────────────────────────────────── tests ─────────────
