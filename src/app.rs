use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::actions::{self, Event, Outcome, Services};
use crate::api::Feed;
use crate::auth::gate::Access;
use crate::auth::Principal;
use crate::detail::DetailView;
use crate::notice::Notice;
use crate::store::FeedStore;
use crate::views::{DashboardView, ViewCache};

#[derive(Debug)]
pub enum Screen {
    SignIn,
    Dashboard,
    Detail(DetailView),
    Settings,
}

/// Text field currently receiving keystrokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Search,
    FeedName,
    FeedUrl,
    Email,
    Password,
}

#[derive(Debug, Default)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
    /// A sign-in (and the backend registration after it) is running.
    pub pending: bool,
}

pub struct App {
    pub screen: Screen,
    pub principal: Option<Principal>,
    pub store: FeedStore,
    views: ViewCache,
    pub search: String,
    pub sign_in: SignInForm,
    /// Selection in the dashboard's filtered feed list.
    pub list_state: ListState,
    pub editing: Option<Field>,
    /// Last notice, shown in the status bar until replaced.
    pub notice: Option<Notice>,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Bumped on every sign-in and sign-out; outcomes spawned under an
    /// older value are dropped.
    session: u64,
    services: Services,
    events: UnboundedSender<Event>,
}

impl App {
    pub fn new(services: Services, events: UnboundedSender<Event>) -> Self {
        Self {
            screen: Screen::SignIn,
            principal: None,
            store: FeedStore::new(),
            views: ViewCache::default(),
            search: String::new(),
            sign_in: SignInForm::default(),
            list_state: ListState::default(),
            editing: Some(Field::Email),
            notice: None,
            quit: false,
            session: 0,
            services,
            events,
        }
    }

    pub fn view(&mut self) -> &DashboardView {
        self.views.get(&self.store, &self.search)
    }

    fn spawn<F>(&self, action: F)
    where
        F: std::future::Future<Output = Outcome> + Send + 'static,
    {
        actions::spawn(&self.events, self.session, action);
    }

    #[cfg(test)]
    pub fn session(&self) -> u64 {
        self.session
    }

    // -- events --------------------------------------------------------------

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Access(access) => self.on_access(access),
            Event::Outcome { session, outcome } => self.on_outcome(session, outcome),
        }
    }

    fn on_access(&mut self, access: Access) {
        match access {
            Access::Granted(principal) => {
                self.principal = Some(principal);
                // The sign-in outcome decides, once backend registration is done.
                if !self.sign_in.pending && matches!(self.screen, Screen::SignIn) {
                    self.enter_dashboard();
                }
            }
            Access::Denied => {
                self.session += 1;
                self.principal = None;
                self.screen = Screen::SignIn;
                self.store = FeedStore::new();
                self.search.clear();
                self.list_state = ListState::default();
                self.sign_in.password.clear();
                self.editing = Some(Field::Email);
            }
        }
    }

    fn on_outcome(&mut self, session: u64, outcome: Outcome) {
        // A sign-in runs while signed out and starts the next session itself.
        if session != self.session && !matches!(outcome, Outcome::SignedIn(_)) {
            debug!(session, current = self.session, "dropping outcome from an earlier session");
            return;
        }
        match outcome {
            Outcome::SignedIn(result) => {
                self.sign_in.pending = false;
                self.sign_in.password.clear();
                match result {
                    Ok(principal) => {
                        self.principal = Some(principal);
                        self.notice = Some(Notice::success("Logged in with Email!"));
                        self.enter_dashboard();
                    }
                    Err(e) => {
                        self.notice = Some(Notice::error(format!("Login failed: {e}")));
                        // Signed in with the provider but the backend refused us.
                        if self.services.auth.current_user().is_some() {
                            self.services.auth.sign_out();
                        }
                    }
                }
            }
            Outcome::DetailLoaded { feed_id, result } => match &mut self.screen {
                Screen::Detail(view) if view.feed_id == feed_id => {
                    if let Some(notice) = view.apply_loaded(result) {
                        self.notice = Some(notice);
                    }
                }
                _ => debug!(%feed_id, "dropping detail load for a closed screen"),
            },
            Outcome::DetailScraped { feed_id, result } => match &mut self.screen {
                Screen::Detail(view) if view.feed_id == feed_id => {
                    if let Some(notice) = view.apply_scraped(result) {
                        self.notice = Some(notice);
                    }
                }
                _ => debug!(%feed_id, "dropping detail scrape for a closed screen"),
            },
            outcome => {
                if self.principal.is_none() {
                    debug!("dropping outcome after sign-out");
                    return;
                }
                let effect = self.store.apply(outcome);
                if let Some(notice) = effect.notice {
                    self.notice = Some(notice);
                }
                if effect.reload {
                    self.reload();
                }
                self.clamp_selection();
            }
        }
    }

    fn enter_dashboard(&mut self) {
        self.session += 1;
        self.screen = Screen::Dashboard;
        self.editing = None;
        self.store = FeedStore::new();
        self.list_state = ListState::default();

        self.store.begin_load();
        self.store.begin_load();
        self.spawn(self.services.clone().load_feeds());
        self.spawn(self.services.clone().load_follows());
    }

    /// Refresh the feed list in the background, keeping the dashboard on
    /// screen.
    fn reload(&mut self) {
        self.spawn(self.services.clone().reload_feeds());
    }

    fn require_principal(&mut self) -> Option<Principal> {
        if self.principal.is_none() {
            self.notice = Some(Notice::error("Please sign in to continue"));
        }
        self.principal.clone()
    }

    // -- sign-in -------------------------------------------------------------

    pub fn submit_sign_in(&mut self) {
        if self.sign_in.pending {
            return;
        }
        let email = self.sign_in.email.trim().to_string();
        if email.is_empty() || self.sign_in.password.is_empty() {
            self.notice = Some(Notice::error("Please enter email and password"));
            return;
        }
        self.sign_in.pending = true;
        self.notice = Some(Notice::info("Signing in…"));
        let password = self.sign_in.password.clone();
        self.spawn(self.services.clone().sign_in(email, password));
    }

    pub fn sign_out(&mut self) {
        self.services.auth.sign_out();
        self.notice = Some(Notice::info("Signed out"));
    }

    // -- dashboard actions ---------------------------------------------------

    /// The feed under the cursor in the filtered list.
    pub fn selected_feed(&mut self) -> Option<Feed> {
        let selected = self.list_state.selected()?;
        let index = *self.views.get(&self.store, &self.search).filtered.get(selected)?;
        self.store.feeds.get(index).cloned()
    }

    pub fn scrape_selected(&mut self) {
        let Some(feed) = self.selected_feed() else {
            return;
        };
        if self.require_principal().is_none() || !self.store.begin_scrape(&feed.id) {
            return;
        }
        self.spawn(self.services.clone().scrape_feed(feed.id));
    }

    pub fn toggle_follow_selected(&mut self) {
        let Some(feed) = self.selected_feed() else {
            return;
        };
        let Some(principal) = self.require_principal() else {
            return;
        };
        if !self.store.begin_follow(&feed.id) {
            return;
        }
        let services = self.services.clone();
        if self.store.followed.contains(&feed.id) {
            self.spawn(services.unfollow_feed(feed.id));
        } else {
            self.spawn(services.follow_feed(feed.id, principal.uid));
        }
    }

    pub fn delete_selected(&mut self) {
        let Some(feed) = self.selected_feed() else {
            return;
        };
        if self.require_principal().is_none() || !self.store.begin_delete(&feed.id) {
            return;
        }
        self.spawn(self.services.clone().delete_feed(feed.id));
    }

    pub fn open_form(&mut self) {
        self.store.form.open = true;
        self.editing = Some(Field::FeedName);
    }

    pub fn close_form(&mut self) {
        self.store.form.open = false;
        self.editing = None;
    }

    pub fn submit_form(&mut self) {
        let Some(principal) = self.require_principal() else {
            return;
        };
        match self.store.begin_create(&principal.uid) {
            Err(notice) => self.notice = Some(notice),
            Ok(None) => {}
            Ok(Some(draft)) => {
                self.editing = None;
                self.spawn(self.services.clone().create_feed(draft));
            }
        }
    }

    // -- screens -------------------------------------------------------------

    pub fn open_detail(&mut self) {
        let Some(feed) = self.selected_feed() else {
            return;
        };
        self.spawn(self.services.clone().load_detail(feed.id.clone()));
        self.screen = Screen::Detail(DetailView::new(feed.id));
    }

    pub fn scrape_detail(&mut self) {
        let Screen::Detail(view) = &mut self.screen else {
            return;
        };
        if view.begin_scrape() {
            let feed_id = view.feed_id.clone();
            self.spawn(self.services.clone().scrape_detail(feed_id));
        }
    }

    pub fn open_settings(&mut self) {
        self.editing = None;
        self.screen = Screen::Settings;
    }

    /// Leave the current sub-screen (or text field).
    pub fn back(&mut self) {
        match self.screen {
            Screen::Detail(_) | Screen::Settings => self.screen = Screen::Dashboard,
            Screen::Dashboard if self.store.form.open => self.close_form(),
            Screen::Dashboard | Screen::SignIn => self.editing = None,
        }
    }

    // -- text input ----------------------------------------------------------

    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Search => &mut self.search,
            Field::FeedName => &mut self.store.form.name,
            Field::FeedUrl => &mut self.store.form.url,
            Field::Email => &mut self.sign_in.email,
            Field::Password => &mut self.sign_in.password,
        }
    }

    pub fn type_char(&mut self, c: char) {
        if let Some(field) = self.editing {
            self.field_mut(field).push(c);
            if field == Field::Search {
                self.reset_selection();
            }
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.editing {
            self.field_mut(field).pop();
            if field == Field::Search {
                self.reset_selection();
            }
        }
    }

    /// Move between the two fields of the active form.
    pub fn next_field(&mut self) {
        self.editing = match self.editing {
            Some(Field::FeedName) => Some(Field::FeedUrl),
            Some(Field::FeedUrl) => Some(Field::FeedName),
            Some(Field::Email) => Some(Field::Password),
            Some(Field::Password) => Some(Field::Email),
            other => other,
        };
    }

    pub fn submit_field(&mut self) {
        match self.editing {
            Some(Field::Search) => self.editing = None,
            Some(Field::FeedName) | Some(Field::Email) => self.next_field(),
            Some(Field::FeedUrl) => self.submit_form(),
            Some(Field::Password) => self.submit_sign_in(),
            None => {}
        }
    }

    // -- navigation ----------------------------------------------------------

    fn cursor(&mut self) -> (&mut ListState, usize) {
        match &mut self.screen {
            Screen::Detail(view) => (&mut view.list_state, view.items.len()),
            _ => {
                let len = self.views.get(&self.store, &self.search).filtered.len();
                (&mut self.list_state, len)
            }
        }
    }

    pub fn select_next(&mut self) {
        let (state, len) = self.cursor();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        let (state, len) = self.cursor();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        let (state, len) = self.cursor();
        if len > 0 {
            state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        let (state, len) = self.cursor();
        if len > 0 {
            state.select(Some(len - 1));
        }
    }

    fn reset_selection(&mut self) {
        let len = self.views.get(&self.store, &self.search).filtered.len();
        self.list_state.select(if len == 0 { None } else { Some(0) });
    }

    /// Keep the dashboard cursor inside the list after it shrinks.
    fn clamp_selection(&mut self) {
        let len = self.views.get(&self.store, &self.search).filtered.len();
        match self.list_state.selected() {
            Some(_) if len == 0 => self.list_state.select(None),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            _ => {}
        }
    }
}
