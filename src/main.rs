//! feedboard: a terminal dashboard for an RSS backend.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌────────────┐  Outcome   ┌──────────┐  draw()  ┌──────────┐
//! │ actions.rs │ ─────────► │  app.rs  │ ───────► │  ui.rs   │
//! │  (tasks)   │ (channel)  │ (state)  │          │ (render) │
//! └────────────┘            └──────────┘          └──────────┘
//!                  Access        ▲   ▲
//! ┌────────────┐ ───────────────┘   │ handle_key_event()
//! │auth/gate.rs│              ┌──────────┐
//! └────────────┘              │ input.rs │
//!                             └──────────┘
//! ```
//!
//! * **`api/`**: the `FeedApi` trait, its HTTP client and the article
//!   normalizer.
//! * **`auth/`**: the identity provider, the session gate and the backend
//!   registration run after each sign-in.
//! * **`actions`**: every network operation, spawned on its own task.
//! * **`store`** and **`detail`**: client-side state the outcomes are
//!   applied to.
//! * **`views`**: derived dashboard figures and date labels.
//! * **`app`**: owns all application state; **`ui`** draws it and
//!   **`input`** maps keys onto it.
//! * **`main`**: wires everything together: parse config, set up logging and
//!   the terminal, and run the event loop.

mod actions;
mod api;
mod app;
mod auth;
mod config;
mod detail;
mod error;
mod input;
mod logging;
mod notice;
mod store;
mod ui;
mod views;

#[cfg(test)]
mod testing;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event as TermEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tracing::info;

use actions::Services;
use api::HttpApi;
use app::App;
use auth::gate::SessionGate;
use auth::{FirebaseAuth, IdentityProvider};
use config::{Cli, Config};

// ---------------------------------------------------------------------------
// RAII terminal guard
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Restore the terminal before the panic message is printed.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // -- configuration (before the terminal is taken over) -------------------
    let _ = dotenvy::dotenv();
    let config = Config::from_cli(Cli::parse())?;
    logging::init(&config.log_level, &config.log_file)?;
    info!(backend = %config.backend_url, "starting feedboard");

    install_panic_hook();

    // -- collaborators -------------------------------------------------------
    let auth = Arc::new(FirebaseAuth::new(
        config.api_key.clone(),
        config.identity_url.clone(),
        config.token_url.clone(),
    ));
    let services = Services {
        api: Arc::new(HttpApi::new(config.backend_url.clone())),
        auth: auth.clone(),
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _gate = SessionGate::spawn(auth.subscribe(), tx.clone());

    // -- terminal setup (Drop restores on exit or panic) ---------------------
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new(services, tx);

    // -- main event loop -----------------------------------------------------
    // ~10 fps. Each iteration:
    //   1. Drain finished actions and auth changes.
    //   2. Render the UI.
    //   3. Poll for keyboard input (up to tick_rate).
    let tick_rate = Duration::from_millis(100);

    loop {
        while let Ok(event) = rx.try_recv() {
            app.handle_event(event);
        }

        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        // Blocking poll; the runtime's worker threads keep the tasks going.
        if tokio::task::block_in_place(|| event::poll(tick_rate))? {
            if let TermEvent::Key(key) = event::read()? {
                input::handle_key_event(&mut app, key);
            }
        }

        if app.quit {
            break;
        }
    }

    info!("shutting down");
    Ok(())
}
