//! Shelf widget — the scrolling list of matched sets and their charts.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, StatefulWidget, Widget},
};

use crate::core::catalog::Catalog;
use crate::ui::theme::Theme;

/// Widget-level state that survives between frames.
#[derive(Debug, Default)]
pub struct ShelfState {
    /// First row currently on screen.
    pub scroll: usize,
}

/// One renderable row of the flattened shelf.
#[derive(Clone, Copy)]
enum Row {
    /// (visible-list position, set index)
    Set(usize, usize),
    /// (set index, chart index)
    Chart(usize, usize),
}

pub struct ShelfWidget<'a> {
    pub block: Block<'a>,
    pub catalog: &'a Catalog,
    /// Catalog indices of sets passing the query, in display order.
    pub visible: &'a [usize],
    /// Selection position within `visible`.
    pub selected: usize,
}

impl<'a> ShelfWidget<'a> {
    fn rows(&self) -> Vec<Row> {
        let mut rows = Vec::new();
        for (pos, &set_idx) in self.visible.iter().enumerate() {
            rows.push(Row::Set(pos, set_idx));
            if self.catalog.sets[set_idx].expanded {
                for chart_idx in 0..self.catalog.sets[set_idx].charts.len() {
                    rows.push(Row::Chart(set_idx, chart_idx));
                }
            }
        }
        rows
    }
}

impl<'a> StatefulWidget for ShelfWidget<'a> {
    type State = ShelfState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut ShelfState) {
        let rows = self.rows();
        let inner = self.block.inner(area);
        self.block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let height = inner.height as usize;

        if rows.is_empty() {
            let empty = Line::from(Span::styled("No matches.", Theme::dim_style()));
            buf.set_line(inner.x, inner.y, &empty, inner.width);
            return;
        }

        // Keep the selected set row on screen.
        let selected_row = rows
            .iter()
            .position(|r| matches!(r, Row::Set(pos, _) if *pos == self.selected))
            .unwrap_or(0);
        if selected_row < state.scroll {
            state.scroll = selected_row;
        } else if selected_row >= state.scroll + height {
            state.scroll = selected_row + 1 - height;
        }
        if state.scroll >= rows.len() {
            state.scroll = rows.len().saturating_sub(1);
        }

        for (line_idx, row) in rows.iter().skip(state.scroll).take(height).enumerate() {
            let y = inner.y + line_idx as u16;
            let line = match *row {
                Row::Set(pos, set_idx) => {
                    let set = &self.catalog.sets[set_idx];
                    let marker = if set.expanded { "▾ " } else { "▸ " };
                    let base = if pos == self.selected {
                        Theme::selected_style()
                    } else {
                        Theme::set_style()
                    };
                    let stars = if set.peak_stars > 0.0 {
                        Span::styled(format!("  ★{:.2}", set.peak_stars), Theme::stars_style())
                    } else {
                        Span::styled("  unrated".to_string(), Theme::unrated_style())
                    };
                    Line::from(vec![
                        Span::styled(
                            format!("{marker}{} — {}", set.title, set.artist),
                            base,
                        ),
                        stars,
                        Span::styled(
                            format!("  [{}] ({})", set.pack, set.charts.len()),
                            Theme::dim_style(),
                        ),
                    ])
                }
                Row::Chart(set_idx, chart_idx) => {
                    let chart = &self.catalog.sets[set_idx].charts[chart_idx];
                    let style = if chart.matched {
                        Theme::chart_style()
                    } else {
                        Theme::unmatched_chart_style()
                    };
                    let stars = if chart.is_rated() {
                        Span::styled(format!("  ★{:.2}", chart.stars), Theme::stars_style())
                    } else {
                        Span::styled("  …".to_string(), Theme::unrated_style())
                    };
                    Line::from(vec![
                        Span::styled(
                            format!(
                                "    {}  {:.0}bpm {}n",
                                chart.name, chart.bpm, chart.notes
                            ),
                            style,
                        ),
                        stars,
                    ])
                }
            };
            buf.set_line(inner.x, y, &line, inner.width);
        }
    }
}
