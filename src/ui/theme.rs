//! Colour palette and text styles used across the UI.

use ratatui::style::{Color, Modifier, Style};

/// Central theme — change colours here and they propagate everywhere.
pub struct Theme;

impl Theme {
    // ── shelf list ─────────────────────────────────────────────
    pub fn set_style() -> Style {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    }

    pub fn chart_style() -> Style {
        Style::default().fg(Color::White)
    }

    /// Chart rows whose individual verdict failed while their set matched.
    pub fn unmatched_chart_style() -> Style {
        Style::default().fg(Color::DarkGray)
    }

    pub fn stars_style() -> Style {
        Style::default().fg(Color::Yellow)
    }

    pub fn unrated_style() -> Style {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC)
    }

    pub fn selected_style() -> Style {
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    }

    // ── chrome ─────────────────────────────────────────────────
    pub fn border_style() -> Style {
        Style::default().fg(Color::Gray)
    }

    pub fn title_style() -> Style {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    }

    pub fn status_bar_style() -> Style {
        Style::default().bg(Color::DarkGray).fg(Color::White)
    }

    pub fn query_style() -> Style {
        Style::default().fg(Color::Yellow)
    }

    pub fn dim_style() -> Style {
        Style::default().fg(Color::Gray)
    }
}
