//! Feed detail screen: one feed and all of its articles.
//!
//! Independent of the [`crate::store::FeedStore`]: the detail screen loads
//! its own copy and a scrape here only refreshes the local article list.
//! The backend has no single-feed endpoint, so the feed is looked up in the
//! full list client-side.

use ratatui::widgets::ListState;
use tracing::warn;

use crate::actions::{Outcome, Services};
use crate::api::{normalize, Article, Feed};
use crate::error::ActionError;
use crate::notice::Notice;

#[derive(Debug, thiserror::Error)]
pub enum DetailError {
    /// No feed in the user's list has the requested id.
    #[error("Feed not found")]
    NotFound,

    #[error(transparent)]
    Action(#[from] ActionError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailState {
    Loading,
    Ready,
    NotFound,
    Failed(String),
}

#[derive(Debug)]
pub struct DetailView {
    pub feed_id: String,
    pub feed: Option<Feed>,
    pub items: Vec<Article>,
    pub state: DetailState,
    pub scraping: bool,
    pub list_state: ListState,
}

impl DetailView {
    pub fn new(feed_id: impl Into<String>) -> Self {
        Self {
            feed_id: feed_id.into(),
            feed: None,
            items: Vec::new(),
            state: DetailState::Loading,
            scraping: false,
            list_state: ListState::default(),
        }
    }

    pub fn apply_loaded(&mut self, result: Result<(Feed, Vec<Article>), DetailError>) -> Option<Notice> {
        match result {
            Ok((feed, items)) => {
                self.feed = Some(feed);
                self.items = items;
                self.state = DetailState::Ready;
                None
            }
            Err(DetailError::NotFound) => {
                self.state = DetailState::NotFound;
                Some(Notice::error("Error loading feed: Feed not found"))
            }
            Err(e) => {
                let message = e.to_string();
                self.state = DetailState::Failed(message.clone());
                Some(Notice::error(format!("Error loading feed: {message}")))
            }
        }
    }

    /// Returns `false` if a scrape is already running or there is nothing
    /// loaded to scrape.
    pub fn begin_scrape(&mut self) -> bool {
        if self.scraping || self.state != DetailState::Ready {
            return false;
        }
        self.scraping = true;
        true
    }

    pub fn apply_scraped(&mut self, result: Result<Option<Vec<Article>>, ActionError>) -> Option<Notice> {
        self.scraping = false;
        match result {
            Ok(Some(items)) => {
                let count = items.len();
                self.items = items;
                self.list_state.select(None);
                Some(Notice::success(format!("Feed updated! Found {count} items.")))
            }
            // Scrape went through but the refresh did not; keep what we have.
            Ok(None) => None,
            Err(e) => Some(Notice::error(format!("Error scraping feed: {e}"))),
        }
    }
}

/// Fetch the feed list and the feed's items concurrently and pick out the
/// requested feed.
pub async fn load(services: &Services, feed_id: &str) -> Result<(Feed, Vec<Article>), DetailError> {
    let token = services.auth.id_token().await.map_err(ActionError::from)?;
    let (feeds, payload) = tokio::try_join!(
        services.api.list_feeds(&token),
        services.api.feed_items(&token, feed_id),
    )
    .map_err(ActionError::from)?;

    let feed = feeds
        .into_iter()
        .find(|feed| feed.id == feed_id)
        .ok_or(DetailError::NotFound)?;
    Ok((feed, normalize(&payload)))
}

/// Scrape the feed, then re-fetch its items. A failed re-fetch is logged and
/// reported as `Ok(None)`.
pub async fn scrape(services: &Services, feed_id: &str) -> Result<Option<Vec<Article>>, ActionError> {
    let token = services.auth.id_token().await?;
    services.api.scrape_feed(&token, feed_id).await?;

    match services.api.feed_items(&token, feed_id).await {
        Ok(payload) => Ok(Some(normalize(&payload))),
        Err(e) => {
            warn!(%feed_id, error = %e, "scrape succeeded but refreshing items failed");
            Ok(None)
        }
    }
}

impl Services {
    pub async fn load_detail(self, feed_id: String) -> Outcome {
        let result = load(&self, &feed_id).await;
        if let Err(e) = &result {
            warn!(%feed_id, error = %e, "loading feed detail failed");
        }
        Outcome::DetailLoaded { feed_id, result }
    }

    pub async fn scrape_detail(self, feed_id: String) -> Outcome {
        let result = scrape(&self, &feed_id).await;
        if let Err(e) = &result {
            warn!(%feed_id, error = %e, "scraping feed failed");
        }
        Outcome::DetailScraped { feed_id, result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{feed, raw_items, services, FakeApi, FakeIdentity};
    use std::sync::Arc;

    fn setup() -> (Arc<FakeApi>, Services) {
        let api = Arc::new(FakeApi::with_feeds(vec![
            feed("f1", "TechCrunch", "https://techcrunch.com/feed"),
            feed("f2", "BBC News", "https://feeds.bbci.co.uk/news/rss.xml"),
        ]));
        api.set_items("f2", raw_items("f2", 4));
        let identity = Arc::new(FakeIdentity::signed_in());
        let services = services(&api, &identity);
        (api, services)
    }

    #[tokio::test]
    async fn load_finds_feed_and_items() {
        let (_api, services) = setup();

        let (feed, items) = load(&services, "f2").await.unwrap();

        assert_eq!(feed.name, "BBC News");
        assert_eq!(items.len(), 4);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let (_api, services) = setup();

        let mut view = DetailView::new("nope");
        let outcome = services.load_detail("nope".into()).await;
        let Outcome::DetailLoaded { result, .. } = outcome else {
            panic!("expected DetailLoaded");
        };
        assert!(matches!(result, Err(DetailError::NotFound)));

        view.apply_loaded(result);
        assert_eq!(view.state, DetailState::NotFound);
    }

    #[tokio::test]
    async fn backend_failure_is_a_generic_error() {
        let (api, services) = setup();
        api.fail("list_feeds");

        let mut view = DetailView::new("f1");
        let notice = view.apply_loaded(load(&services, "f1").await);

        assert!(matches!(view.state, DetailState::Failed(_)));
        assert!(notice.unwrap().text.starts_with("Error loading feed"));
    }

    #[tokio::test]
    async fn scrape_refreshes_local_items() {
        let (api, services) = setup();
        api.scraped_items
            .lock()
            .unwrap()
            .insert("f1".into(), raw_items("f1", 2));

        let mut view = DetailView::new("f1");
        view.apply_loaded(load(&services, "f1").await);
        assert!(view.items.is_empty());

        assert!(view.begin_scrape());
        assert!(!view.begin_scrape(), "already scraping");
        let notice = view.apply_scraped(scrape(&services, "f1").await);

        assert_eq!(view.items.len(), 2);
        assert!(!view.scraping);
        assert_eq!(notice, Some(Notice::success("Feed updated! Found 2 items.")));
    }

    #[tokio::test]
    async fn failed_refresh_after_scrape_keeps_items() {
        let (api, services) = setup();
        let mut view = DetailView::new("f2");
        view.apply_loaded(load(&services, "f2").await);

        api.fail_items("f2");
        view.begin_scrape();
        let notice = view.apply_scraped(scrape(&services, "f2").await);

        assert_eq!(view.items.len(), 4);
        assert!(notice.is_none());
        assert!(!view.scraping);
    }

    #[test]
    fn cannot_scrape_before_loaded() {
        let mut view = DetailView::new("f1");
        assert!(!view.begin_scrape());
    }
}
