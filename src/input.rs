//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] actions. While a text field is being
//! edited every printable key goes into the field; otherwise keys are
//! screen-specific commands. Adding a new keybinding is a single match arm
//! in the matching `*_key` function.
//!
//! ## For contributors
//!
//! To add a new keybinding:
//!
//! 1. Add a method on [`App`] for the action (if one doesn't exist).
//! 2. Add a `KeyCode` match arm for the screen it belongs to.
//! 3. Update the hint text in [`crate::ui`]'s status bar.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{App, Field, Screen};

/// Process a single key event, updating app state accordingly.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit = true;
        return;
    }

    if app.editing.is_some() {
        text_key(app, key.code);
        return;
    }

    match app.screen {
        Screen::SignIn => sign_in_key(app, key.code),
        Screen::Dashboard => dashboard_key(app, key.code),
        Screen::Detail(_) => detail_key(app, key.code),
        Screen::Settings => settings_key(app, key.code),
    }
}

fn text_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => app.back(),
        KeyCode::Enter => app.submit_field(),
        KeyCode::Tab | KeyCode::BackTab => app.next_field(),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Char(c) => app.type_char(c),
        _ => {}
    }
}

fn sign_in_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Enter | KeyCode::Tab | KeyCode::Char('i') => app.editing = Some(Field::Email),
        _ => {}
    }
}

fn dashboard_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') => app.quit = true,
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Char('/') => app.editing = Some(Field::Search),
        KeyCode::Char('n') => app.open_form(),
        KeyCode::Char('s') => app.scrape_selected(),
        KeyCode::Char('f') => app.toggle_follow_selected(),
        KeyCode::Char('d') => app.delete_selected(),
        KeyCode::Char('o') => app.open_settings(),
        KeyCode::Enter => app.open_detail(),
        KeyCode::Esc => app.back(),
        _ => {}
    }
}

fn detail_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') => app.quit = true,
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Char('s') => app.scrape_detail(),
        KeyCode::Esc | KeyCode::Backspace => app.back(),
        _ => {}
    }
}

fn settings_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') => app.quit = true,
        KeyCode::Char('x') => app.sign_out(),
        KeyCode::Esc | KeyCode::Backspace => app.back(),
        _ => {}
    }
}
