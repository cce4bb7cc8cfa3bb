//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).
//!
//! ## For contributors
//!
//! * Every screen shares a two-row split: the screen body on top and a
//!   one-line status bar at the bottom.
//! * Colours are defined inline. Notice colours follow [`Level`].
//! * Timestamps are rendered relative to one `Local::now()` taken per frame.

use chrono::{DateTime, Local};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Field, Screen};
use crate::detail::{DetailState, DetailView};
use crate::notice::Level;
use crate::views::{display_host, feed_age, full_date, relative_date, short_relative};

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let [main_area, status_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());
    let now = Local::now();

    match app.screen {
        Screen::SignIn => draw_sign_in(app, frame, main_area),
        Screen::Dashboard if app.store.is_loading() => draw_skeleton(frame, main_area),
        Screen::Dashboard => draw_dashboard(app, frame, main_area, now),
        Screen::Detail(_) => draw_detail(app, frame, main_area, now),
        Screen::Settings => draw_settings(app, frame, main_area),
    }
    draw_status_bar(app, frame, status_area);
}

fn input_line<'a>(label: &'a str, value: String, focused: bool) -> Line<'a> {
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let cursor = if focused { "▏" } else { "" };
    Line::from(vec![
        Span::styled(format!("{label:<10}"), Style::default().fg(Color::DarkGray)),
        Span::styled(value, style),
        Span::styled(cursor, style),
    ])
}

// ---------------------------------------------------------------------------
// Sign-in
// ---------------------------------------------------------------------------

fn draw_sign_in(app: &App, frame: &mut Frame, area: Rect) {
    let [_, body, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(7),
        Constraint::Fill(1),
    ])
    .areas(area);

    let masked = "•".repeat(app.sign_in.password.chars().count());
    let state = if app.sign_in.pending {
        Span::styled("Signing in…", Style::default().fg(Color::Cyan))
    } else {
        Span::styled("Enter: sign in  Tab: next field", Style::default().fg(Color::DarkGray))
    };
    let lines = vec![
        Line::from(""),
        input_line("Email", app.sign_in.email.clone(), app.editing == Some(Field::Email)),
        input_line("Password", masked, app.editing == Some(Field::Password)),
        Line::from(""),
        Line::from(state),
    ];

    let form = Paragraph::new(lines).block(
        Block::default()
            .title(" Sign in to Feedboard ")
            .borders(Borders::ALL),
    );
    frame.render_widget(form, body);
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

fn draw_skeleton(frame: &mut Frame, area: Rect) {
    let [stats, recent, feeds] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(7),
        Constraint::Min(1),
    ])
    .areas(area);

    let placeholder = |rows: usize| {
        let lines: Vec<Line> = (0..rows)
            .map(|_| Line::styled("░░░░░░░░░░░░░░░░░░░░░░░░", Style::default().fg(Color::DarkGray)))
            .collect();
        Paragraph::new(lines)
    };
    frame.render_widget(placeholder(1).block(Block::default().borders(Borders::ALL)), stats);
    frame.render_widget(
        placeholder(5).block(Block::default().title(" Latest articles ").borders(Borders::ALL)),
        recent,
    );
    frame.render_widget(
        placeholder(3).block(Block::default().title(" Loading feeds… ").borders(Borders::ALL)),
        feeds,
    );
}

fn draw_dashboard(app: &mut App, frame: &mut Frame, area: Rect, now: DateTime<Local>) {
    let view = app.view().clone();
    let form_height = if app.store.form.open { 4 } else { 0 };
    let [stats_area, recent_area, search_area, feeds_area, form_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(7),
        Constraint::Length(3),
        Constraint::Min(1),
        Constraint::Length(form_height),
    ])
    .areas(area);

    // -- stats ---------------------------------------------------------------
    let stats = Paragraph::new(Line::from(vec![
        Span::styled(format!(" {} feeds", view.total_feeds), Style::default().fg(Color::Cyan)),
        Span::raw("   "),
        Span::styled(
            format!("{} articles", view.total_articles),
            Style::default().fg(Color::Green),
        ),
        Span::raw("   "),
        Span::styled(format!("{} today", view.today), Style::default().fg(Color::Magenta)),
        Span::raw("   "),
        Span::styled(
            format!("{} following", app.store.followed.len()),
            Style::default().fg(Color::Yellow),
        ),
    ]))
    .block(Block::default().title(" Overview ").borders(Borders::ALL));
    frame.render_widget(stats, stats_area);

    // -- latest articles -----------------------------------------------------
    let recent: Vec<ListItem> = if view.recent.is_empty() {
        vec![ListItem::new(Span::styled(
            "No articles yet. Scrape a feed to fetch some.",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        view.recent
            .iter()
            .map(|article| {
                let source = app
                    .store
                    .feeds
                    .iter()
                    .find(|feed| feed.id == article.feed_id)
                    .map(|feed| feed.name.as_str())
                    .unwrap_or("Unknown feed");
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<12}", relative_date(&article.pub_date, now)),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(article.title.clone(), Style::default().fg(Color::White)),
                    Span::raw("  "),
                    Span::styled(format!("[{source}]"), Style::default().fg(Color::Cyan)),
                ]))
            })
            .collect()
    };
    frame.render_widget(
        List::new(recent).block(Block::default().title(" Latest articles ").borders(Borders::ALL)),
        recent_area,
    );

    // -- search --------------------------------------------------------------
    let searching = app.editing == Some(Field::Search);
    let search = Paragraph::new(input_line("Search", app.search.clone(), searching))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(search, search_area);

    // -- feeds ---------------------------------------------------------------
    let feeds: Vec<ListItem> = view
        .filtered
        .iter()
        .filter_map(|&i| app.store.feeds.get(i))
        .map(|feed| {
            let count = app.store.articles(&feed.id).len();
            let mut spans = vec![
                Span::styled(feed.name.clone(), Style::default().fg(Color::White)),
                Span::raw("  "),
                Span::styled(display_host(&feed.url), Style::default().fg(Color::DarkGray)),
                Span::raw("  "),
                Span::styled(format!("{count} items"), Style::default().fg(Color::Green)),
                Span::raw("  "),
                Span::styled(
                    format!("added {}", feed_age(&feed.created_at, now).to_lowercase()),
                    Style::default().fg(Color::DarkGray),
                ),
            ];
            let badges = [
                (app.store.followed.contains(&feed.id), " ★ following", Color::Yellow),
                (app.store.scraping.contains(&feed.id), " ⟳ scraping…", Color::Cyan),
                (app.store.following.contains(&feed.id), " … updating", Color::Cyan),
                (app.store.deleting.contains(&feed.id), " ✗ deleting…", Color::Red),
            ];
            for (on, text, color) in badges {
                if on {
                    spans.push(Span::styled(text, Style::default().fg(color)));
                }
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = if app.search.is_empty() {
        " Your feeds ".to_string()
    } else {
        format!(" Your feeds ({} matching) ", view.filtered.len())
    };
    let list = List::new(feeds)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, feeds_area, &mut app.list_state);

    // -- create form ---------------------------------------------------------
    if app.store.form.open {
        let title = if app.store.creating {
            " New feed (creating…) "
        } else {
            " New feed "
        };
        let form = Paragraph::new(vec![
            input_line("Name", app.store.form.name.clone(), app.editing == Some(Field::FeedName)),
            input_line("URL", app.store.form.url.clone(), app.editing == Some(Field::FeedUrl)),
        ])
        .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(form, form_area);
    }
}

// ---------------------------------------------------------------------------
// Detail
// ---------------------------------------------------------------------------

fn draw_detail(app: &mut App, frame: &mut Frame, area: Rect, now: DateTime<Local>) {
    let Screen::Detail(view) = &mut app.screen else {
        return;
    };
    if view.state == DetailState::Ready {
        draw_detail_ready(view, frame, area, now);
        return;
    }
    let (text, color) = match &view.state {
        DetailState::Ready | DetailState::Loading => ("Loading feed…".to_string(), Color::White),
        DetailState::NotFound => ("Feed not found. Press Esc to go back.".to_string(), Color::White),
        DetailState::Failed(message) => (format!("Could not load this feed: {message}"), Color::Red),
    };
    let body = Paragraph::new(text)
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: true })
        .block(Block::default().title(" Feed ").borders(Borders::ALL));
    frame.render_widget(body, area);
}

fn draw_detail_ready(view: &mut DetailView, frame: &mut Frame, area: Rect, now: DateTime<Local>) {
    let [header_area, list_area, preview_area] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Min(1),
        Constraint::Length(6),
    ])
    .areas(area);

    let (name, url, created) = view
        .feed
        .as_ref()
        .map(|feed| (feed.name.clone(), feed.url.clone(), feed.created_at.clone()))
        .unwrap_or_default();
    let scraping = if view.scraping {
        Span::styled("  ⟳ scraping…", Style::default().fg(Color::Cyan))
    } else {
        Span::raw("")
    };
    let header = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(url, Style::default().fg(Color::Blue)),
            scraping,
        ]),
        Line::from(Span::styled(
            format!(
                "{} articles  ·  added {}",
                view.items.len(),
                feed_age(&created, now).to_lowercase()
            ),
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(Block::default().title(format!(" {name} ")).borders(Borders::ALL));
    frame.render_widget(header, header_area);

    let items: Vec<ListItem> = if view.items.is_empty() {
        vec![ListItem::new(Span::styled(
            "No articles yet. Press s to scrape this feed.",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        view.items
            .iter()
            .map(|article| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<10}", short_relative(&article.pub_date, now)),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(article.title.clone(), Style::default().fg(Color::White)),
                ]))
            })
            .collect()
    };
    let list = List::new(items)
        .block(Block::default().title(" Articles ").borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, list_area, &mut view.list_state);

    let preview = match view.list_state.selected().and_then(|i| view.items.get(i)) {
        Some(article) => {
            let link = if article.has_link() {
                article.link.clone()
            } else {
                "No link".into()
            };
            Paragraph::new(vec![
                Line::from(Span::styled(full_date(&article.pub_date), Style::default().fg(Color::DarkGray))),
                Line::from(Span::styled(link, Style::default().fg(Color::Blue))),
                Line::from(article.description.clone()),
            ])
        }
        None => Paragraph::new(Span::styled(
            "Select an article to preview it.",
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(
        preview
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL)),
        preview_area,
    );
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

fn draw_settings(app: &App, frame: &mut Frame, area: Rect) {
    let lines = match &app.principal {
        Some(principal) => vec![
            Line::from(vec![
                Span::styled(format!("{:<10}", "Name"), Style::default().fg(Color::DarkGray)),
                Span::raw(principal.label()),
            ]),
            Line::from(vec![
                Span::styled(format!("{:<10}", "Email"), Style::default().fg(Color::DarkGray)),
                Span::raw(principal.email.clone().unwrap_or_else(|| "none".into())),
            ]),
            Line::from(vec![
                Span::styled(format!("{:<10}", "User ID"), Style::default().fg(Color::DarkGray)),
                Span::raw(principal.uid.clone()),
            ]),
            Line::from(""),
            Line::from(Span::styled("x: sign out", Style::default().fg(Color::Red))),
        ],
        None => vec![Line::from("Not signed in.")],
    };
    let settings = Paragraph::new(lines).block(Block::default().title(" Account ").borders(Borders::ALL));
    frame.render_widget(settings, area);
}

// ---------------------------------------------------------------------------
// Status bar
// ---------------------------------------------------------------------------

fn hints(app: &App) -> &'static str {
    if app.editing.is_some() {
        return "Enter: confirm  Tab: next  Esc: cancel";
    }
    match app.screen {
        Screen::SignIn => "Enter: edit  q: quit",
        Screen::Dashboard => "j/k: move  /: search  n: new  s: scrape  f: follow  d: delete  Enter: open  o: account  q: quit",
        Screen::Detail(_) => "j/k: move  s: scrape  Esc: back  q: quit",
        Screen::Settings => "x: sign out  Esc: back  q: quit",
    }
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    if let Some(notice) = &app.notice {
        let color = match notice.level {
            Level::Info => Color::Yellow,
            Level::Success => Color::Green,
            Level::Error => Color::Red,
        };
        spans.push(Span::styled(notice.text.clone(), Style::default().fg(color)));
        spans.push(Span::raw("  "));
    }
    if let Some(principal) = &app.principal {
        spans.push(Span::styled(principal.label(), Style::default().fg(Color::Cyan)));
        spans.push(Span::raw("  "));
    }
    spans.push(Span::styled(hints(app), Style::default().fg(Color::DarkGray)));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{Event, LoadedFeeds, Outcome, Services};
    use crate::auth::gate::Access;
    use crate::notice::Notice;
    use crate::testing::{feed, principal, services, FakeApi, FakeIdentity};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn app() -> App {
        let api = Arc::new(FakeApi::default());
        let identity = Arc::new(FakeIdentity::signed_in());
        let services: Services = services(&api, &identity);
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(services, tx)
    }

    fn render(app: &mut App) -> String {
        let backend = TestBackend::new(120, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(app, f)).unwrap();
        let buf = terminal.backend().buffer().clone();
        buf.content()
            .iter()
            .map(|c| c.symbol().chars().next().unwrap_or(' '))
            .collect()
    }

    /// Put the app on a loaded dashboard without going through the network.
    async fn dashboard() -> App {
        let mut app = app();
        app.handle_event(Event::Access(Access::Granted(principal())));
        let session = app.session();
        app.handle_event(Event::Outcome {
            session,
            outcome: Outcome::FollowsLoaded(Ok(Default::default())),
        });
        app.handle_event(Event::Outcome {
            session,
            outcome: Outcome::FeedsLoaded(Ok(LoadedFeeds {
                feeds: vec![
                    feed("f1", "TechCrunch", "https://www.techcrunch.com/feed"),
                    feed("f2", "BBC News", "https://feeds.bbci.co.uk/news/rss.xml"),
                ],
                ..Default::default()
            })),
        });
        app
    }

    #[test]
    fn sign_in_masks_password() {
        let mut app = app();
        app.sign_in.email = "ada@example.com".into();
        app.sign_in.password = "secret".into();

        let text = render(&mut app);
        assert!(text.contains("ada@example.com"));
        assert!(!text.contains("secret"));
    }

    #[tokio::test]
    async fn loading_shows_skeleton() {
        let mut app = app();
        app.handle_event(Event::Access(Access::Granted(principal())));

        let text = render(&mut app);
        assert!(text.contains("Loading feeds"));
    }

    #[tokio::test]
    async fn dashboard_lists_feeds_and_counts() {
        let mut app = dashboard().await;

        let text = render(&mut app);
        assert!(text.contains("2 feeds"));
        assert!(text.contains("TechCrunch"));
        assert!(text.contains("techcrunch.com"));
        assert!(text.contains("No articles yet"));
    }

    #[tokio::test]
    async fn reload_after_create_keeps_dashboard() {
        let mut app = dashboard().await;
        let session = app.session();
        app.handle_event(Event::Outcome {
            session,
            outcome: Outcome::Created(Ok(feed("f3", "Lobsters", "https://lobste.rs/rss"))),
        });

        let text = render(&mut app);
        assert!(!text.contains("Loading feeds"));
        assert!(text.contains("Lobsters"));
        assert!(text.contains("Feed created successfully!"));
    }

    #[tokio::test]
    async fn dashboard_shows_following_badge() {
        let mut app = dashboard().await;
        app.store.followed.insert("f2".into());

        let text = render(&mut app);
        assert!(text.contains("following"));
        assert!(text.contains("1 following"));
    }

    #[test]
    fn status_bar_shows_notice() {
        let mut app = app();
        app.notice = Some(Notice::error("Failed to load feeds"));

        let text = render(&mut app);
        assert!(text.contains("Failed to load feeds"));
    }

    #[tokio::test]
    async fn detail_and_settings_do_not_panic() {
        let mut app = dashboard().await;
        app.select_first();
        app.open_detail();
        render(&mut app);

        app.back();
        app.open_settings();
        let text = render(&mut app);
        assert!(text.contains("ada@example.com"));
    }
}
