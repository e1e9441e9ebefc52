//! A search-driven TUI browser for rhythm-chart libraries.
//!
//! Run the binary to launch the shelf view over a built-in demo library.
//! Type to filter (`stars>=5 bpm<180 foo`), navigate with the arrow keys.

mod app;
mod config;
mod core;
mod ui;

use std::io::{self, stderr};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    widgets::{Block, Borders, Paragraph},
    text::{Line, Span},
    Terminal,
};

use crate::app::{
    event::{spawn_event_reader, AppEvent},
    handler,
    search_runtime::SearchRuntime,
    state::AppState,
};
use crate::core::demo::{self, LibraryProfile};
use crate::core::job::JobRunner;
use crate::core::scanner::RatingScanner;
use crate::core::query;
use crate::ui::{
    browser::ShelfWidget, layout::AppLayout, spinner::RatingIndicator, theme::Theme,
};

// ───────────────────────────────────────── CLI ───────────────

#[derive(Parser, Debug)]
#[command(name = env!("CARGO_PKG_NAME"), about = "Search-driven chart library browser")]
struct Cli {
    /// Demo library size: small, standard or large.
    #[arg(long, default_value = "standard")]
    library: LibraryProfile,

    /// Start with this query already active.
    #[arg(long)]
    query: Option<String>,

    /// Update-tick interval in milliseconds.
    #[arg(long = "tick-ms", default_value_t = 100)]
    tick_ms: u64,
}

// ───────────────────────────────────────── main ─────────────

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing (only in debug builds / when RUST_LOG is set).
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr) // never pollute stdout
        .init();

    let cli = Cli::parse();

    // ── build initial state ───────────────────────────────────
    let user_config = config::AppConfig::load();
    let catalog = demo::build(cli.library);
    let mut state = AppState::new(catalog, user_config);
    if let Some(q) = cli.query {
        state.query = q;
    }

    let runner = JobRunner::new();
    let mut scanner = RatingScanner::new(
        state.config.rating_teardown(),
        state.config.sets_per_tick,
    );
    let mut search = SearchRuntime::new(state.config.search_teardown());

    // ── terminal setup ────────────────────────────────────────
    enable_raw_mode()?;
    let mut stderr_handle = stderr();
    execute!(stderr_handle, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stderr());
    let mut terminal = Terminal::new(backend)?;

    // ── async channels ────────────────────────────────────────
    let mut events = spawn_event_reader(Duration::from_millis(cli.tick_ms.max(16)));

    // ── event loop ────────────────────────────────────────────
    loop {
        // ── draw first ─────────────────────────────────────────
        // Always render before doing any expensive work so the UI stays
        // responsive.  Match flags and ratings fill in asynchronously.
        let visible = state.catalog.visible_sets(state.sort_mode);
        let (rated, total) = state.catalog.rated_charts();
        let scanning = rated < total || scanner.is_scanning();

        terminal.draw(|frame| {
            let layout = AppLayout::from_area(frame.area());

            let mut query_spans = vec![
                Span::styled("Search: ", Theme::title_style()),
                Span::styled(state.query.as_str(), Theme::query_style()),
                Span::styled("▏", Theme::query_style()),
            ];
            if !state.tokens.is_empty() {
                query_spans.push(Span::styled(
                    format!("  {} term(s)", state.tokens.len()),
                    Theme::dim_style(),
                ));
            }
            if state.search_running {
                query_spans.push(Span::styled("  matching…", Theme::dim_style()));
            }
            frame.render_widget(Paragraph::new(Line::from(query_spans)), layout.query_area);

            let shelf_block = Block::default()
                .title(format!(
                    " chart-shelf — {}/{} sets · sort: {} ",
                    visible.len(),
                    state.catalog.len(),
                    state.sort_mode.label(),
                ))
                .title_style(Theme::title_style())
                .borders(Borders::ALL)
                .border_style(Theme::border_style());

            let shelf = ShelfWidget {
                block: shelf_block,
                catalog: &state.catalog,
                visible: &visible,
                selected: state.selected,
            };
            frame.render_stateful_widget(shelf, layout.shelf_area, &mut state.shelf_state);

            frame.render_widget(
                RatingIndicator {
                    visible: scanning,
                    tick: state.tick,
                    rated,
                    total,
                },
                layout.shelf_area,
            );

            let hint = "type to filter · ↑↓ navigate · ←→ fold · Tab sort · Ctrl+R reload · Esc clear/quit";
            let status_text = state.status_message.as_deref().unwrap_or(hint);
            let status = Paragraph::new(status_text).style(Theme::status_bar_style());
            frame.render_widget(status, layout.status_area);
        })?;

        // ── restart the search AFTER draw ─────────────────────────
        // The frame above already showed the edited query; the bounded
        // cancellation stall (if any) lands between frames, not before
        // the keystroke becomes visible.
        if state.rebuild_pending {
            state.rebuild_pending = false;
            scanner.reset();
            state.catalog.rebuild(demo::build(cli.library).sets);
            state.search_pending = true;
            state.status_message = Some("library reloaded".into());
        }
        if state.search_pending {
            state.search_pending = false;
            state.tokens = query::tokenize(&state.query);
            let match_mode = state.match_mode();
            search.restart(
                &runner,
                &mut state.catalog,
                state.tokens.clone(),
                match_mode,
            );
            state.clamp_selection();
        }

        tokio::select! {
            biased;

            Some(event) = events.recv() => {
                match event {
                    AppEvent::Key(k) => handler::handle_key(&mut state, k),
                    AppEvent::Resize(_, _) => {}
                    AppEvent::Tick => {
                        state.tick = state.tick.wrapping_add(1);
                    }
                }
            }

            else => break,
        }

        // ── per-tick maintenance ──────────────────────────────────
        // One scanner tick per loop turn, plus a non-blocking poll for a
        // finished search pass.
        if search.poll(&mut state.catalog) {
            state.clamp_selection();
        }
        state.search_running = search.is_running();
        scanner.tick(&mut state.catalog, &runner);

        if state.should_quit {
            break;
        }
    }

    // ── teardown ──────────────────────────────────────────────
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}
