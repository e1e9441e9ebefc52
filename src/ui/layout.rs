//! Layout helpers — split the terminal area into regions.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Primary screen layout: query line, shelf pane, bottom status bar.
pub struct AppLayout {
    pub query_area: Rect,
    pub shelf_area: Rect,
    pub status_area: Rect,
}

impl AppLayout {
    /// Compute the layout from the full terminal area.
    pub fn from_area(area: Rect) -> Self {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // query input line
                Constraint::Min(3),    // shelf pane (takes all remaining space)
                Constraint::Length(1), // status bar
            ])
            .split(area);

        Self {
            query_area: chunks[0],
            shelf_area: chunks[1],
            status_area: chunks[2],
        }
    }
}
