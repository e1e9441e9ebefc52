//! UI / rendering layer — everything that touches Ratatui widgets.
//!
//! This layer takes the *core* data structures and turns them into pixels on
//! the terminal.  No job scheduling or catalog mutation happens here.

pub mod browser;
pub mod layout;
pub mod spinner;
pub mod theme;
