//! Terminal dashboard
//!
//! Provides the interactive client:
//! - Sidebar with the sections the signed-in user may open
//! - Header greeting the user, status/help bar at the bottom
//! - One screen per route, with forms edited in place

mod app;
mod view;

use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::api::Backend;
use crate::config::Config;

use app::App;

/// Log file used while the dashboard owns the terminal.
pub fn log_path() -> Result<PathBuf> {
    let dirs = Config::project_dirs()?;
    let dir = dirs.cache_dir();
    std::fs::create_dir_all(dir)?;
    Ok(dir.join("fruit.log"))
}

/// Restore the stored session, then run the dashboard until the user quits.
pub async fn run(backend: Arc<Backend>, config: &Config) -> Result<()> {
    let session = backend.session().clone();
    if session.init() {
        session.revalidate(&backend.core).await;
    }

    let mut terminal = enter()?;
    let mut app = App::new(backend, config.ui.page_size);
    let result = app.run(&mut terminal).await;
    leave(&mut terminal)?;
    result
}

fn enter() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn leave(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
