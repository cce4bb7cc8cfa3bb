//! The feed collection store.
//!
//! Holds the signed-in user's feeds, the article snapshot per feed, the set
//! of followed feed ids, and the in-flight markers the UI uses to disable
//! duplicate submissions.
//!
//! Each operation comes in two halves around a background action from
//! [`crate::actions`]:
//!
//! * a `begin_*` method, called by the UI loop before spawning, which
//!   validates and sets the in-flight marker;
//! * [`FeedStore::apply`], called when the action's [`Outcome`] arrives,
//!   which clears the marker (success or failure) and applies the result.
//!
//! Every mutation of feeds, articles or the followed set bumps
//! [`FeedStore::revision`], which the derived views key their cache on.

use std::collections::{HashMap, HashSet};

use crate::actions::{LoadedFeeds, Outcome};
use crate::api::{Article, Feed, NewFeed};
use crate::notice::Notice;

/// The create-feed form.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FeedForm {
    pub open: bool,
    pub name: String,
    pub url: String,
}

impl FeedForm {
    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// What the UI loop should do after applying an outcome.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Effect {
    pub notice: Option<Notice>,
    /// Reload the whole feed list (after a create).
    pub reload: bool,
}

impl Effect {
    fn notice(notice: Notice) -> Self {
        Self {
            notice: Some(notice),
            reload: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct FeedStore {
    pub feeds: Vec<Feed>,
    /// Last successfully fetched articles, keyed by feed id.
    pub items: HashMap<String, Vec<Article>>,
    pub followed: HashSet<String>,

    pub scraping: HashSet<String>,
    pub deleting: HashSet<String>,
    pub following: HashSet<String>,
    pub creating: bool,
    /// Number of initial loads (feeds, followed set) still running.
    pending_loads: usize,

    pub form: FeedForm,
    revision: u64,
}

impl FeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_loading(&self) -> bool {
        self.pending_loads > 0
    }

    pub fn articles(&self, feed_id: &str) -> &[Article] {
        self.items.get(feed_id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    // -- begin ---------------------------------------------------------------

    /// Mark a feeds or followed-set load as running.
    pub fn begin_load(&mut self) {
        self.pending_loads += 1;
    }

    /// Validate the form and mark a create as running.
    ///
    /// Returns the request body to send, `Ok(None)` when a create is already
    /// in flight, or the validation notice when name or URL is blank.
    pub fn begin_create(&mut self, user_id: &str) -> Result<Option<NewFeed>, Notice> {
        let name = self.form.name.trim();
        let url = self.form.url.trim();
        if name.is_empty() || url.is_empty() {
            return Err(Notice::error("Please fill in both name and URL"));
        }
        if self.creating {
            return Ok(None);
        }
        self.creating = true;
        Ok(Some(NewFeed {
            name: name.to_string(),
            url: url.to_string(),
            user_id: user_id.to_string(),
        }))
    }

    /// Returns `false` if this feed is already being scraped.
    pub fn begin_scrape(&mut self, feed_id: &str) -> bool {
        self.scraping.insert(feed_id.to_string())
    }

    /// Returns `false` if a follow/unfollow of this feed is already running.
    pub fn begin_follow(&mut self, feed_id: &str) -> bool {
        self.following.insert(feed_id.to_string())
    }

    /// Returns `false` if this feed is already being deleted.
    pub fn begin_delete(&mut self, feed_id: &str) -> bool {
        self.deleting.insert(feed_id.to_string())
    }

    // -- apply ---------------------------------------------------------------

    /// Apply a finished action. Outcomes that do not concern the store
    /// (sign-in, detail screen) are ignored.
    pub fn apply(&mut self, outcome: Outcome) -> Effect {
        match outcome {
            Outcome::FeedsLoaded(result) => {
                self.finish_load();
                self.apply_feeds(result)
            }
            Outcome::FeedsReloaded(result) => self.apply_feeds(result),
            Outcome::FollowsLoaded(result) => self.apply_follows(result),
            Outcome::Created(result) => self.apply_created(result),
            Outcome::Scraped { feed_id, result } => self.apply_scraped(&feed_id, result),
            Outcome::FollowChanged {
                feed_id,
                follow,
                result,
            } => self.apply_follow(&feed_id, follow, result),
            Outcome::Deleted { feed_id, result } => self.apply_deleted(&feed_id, result),
            Outcome::SignedIn(_) | Outcome::DetailLoaded { .. } | Outcome::DetailScraped { .. } => {
                Effect::default()
            }
        }
    }

    fn finish_load(&mut self) {
        self.pending_loads = self.pending_loads.saturating_sub(1);
    }

    fn apply_feeds<E>(&mut self, result: Result<LoadedFeeds, E>) -> Effect {
        match result {
            Ok(loaded) => {
                // Feed list and article map change together.
                self.feeds = loaded.feeds;
                self.items = loaded.items;
                self.touch();
                Effect::default()
            }
            Err(_) => Effect::notice(Notice::error("Failed to load feeds")),
        }
    }

    fn apply_follows<E>(&mut self, result: Result<HashSet<String>, E>) -> Effect {
        self.finish_load();
        match result {
            Ok(followed) => {
                self.followed = followed;
                self.touch();
                Effect::default()
            }
            Err(_) => Effect::notice(Notice::error("Failed to load followed feeds")),
        }
    }

    fn apply_created<E>(&mut self, result: Result<Feed, E>) -> Effect {
        self.creating = false;
        match result {
            Ok(feed) => {
                self.feeds.push(feed);
                self.form.clear();
                self.touch();
                Effect {
                    notice: Some(Notice::success("Feed created successfully!")),
                    reload: true,
                }
            }
            Err(_) => Effect::notice(Notice::error("Failed to create feed")),
        }
    }

    fn apply_scraped<E>(&mut self, feed_id: &str, result: Result<Vec<Article>, E>) -> Effect {
        self.scraping.remove(feed_id);
        match result {
            Ok(articles) => {
                let count = articles.len();
                self.items.insert(feed_id.to_string(), articles);
                self.touch();
                Effect::notice(Notice::success(format!(
                    "Feed refreshed! Found {count} items."
                )))
            }
            Err(_) => Effect::notice(Notice::error("Failed to refresh feed")),
        }
    }

    fn apply_follow<E>(&mut self, feed_id: &str, follow: bool, result: Result<(), E>) -> Effect {
        self.following.remove(feed_id);
        match (result, follow) {
            (Ok(()), true) => {
                self.followed.insert(feed_id.to_string());
                self.touch();
                Effect::notice(Notice::success("Feed followed!"))
            }
            (Ok(()), false) => {
                self.followed.remove(feed_id);
                self.touch();
                Effect::notice(Notice::success("Feed unfollowed"))
            }
            (Err(_), true) => Effect::notice(Notice::error("Failed to follow feed")),
            (Err(_), false) => Effect::notice(Notice::error("Failed to unfollow feed")),
        }
    }

    fn apply_deleted<E>(&mut self, feed_id: &str, result: Result<(), E>) -> Effect {
        self.deleting.remove(feed_id);
        match result {
            Ok(()) => {
                // One update: no frame shows the feed gone but its articles
                // or follow marker still present.
                self.feeds.retain(|feed| feed.id != feed_id);
                self.items.remove(feed_id);
                self.followed.remove(feed_id);
                self.touch();
                Effect::notice(Notice::success("Feed deleted"))
            }
            Err(_) => Effect::notice(Notice::error("Failed to delete feed")),
        }
    }
}
