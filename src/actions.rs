//! Background backend actions.
//!
//! Every network operation runs on its own tokio task and reports back to the
//! UI loop over an unbounded [`mpsc`] channel as an [`Event::Outcome`]. Tasks
//! never touch UI state: the loop applies each [`Outcome`] to the store when
//! it drains the channel, so a response that arrives after its screen was
//! left is simply ignored there. Each outcome carries the session it was
//! spawned in, and outcomes from an earlier session are dropped.
//!
//! There is no cancellation and no retry. A failure is logged here and turned
//! into one notice when the outcome is applied.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::{normalize, Article, Feed, FeedApi, NewFeed, NewFollow};
use crate::auth::{bridge, gate::Access, IdentityProvider, Principal};
use crate::detail::DetailError;
use crate::error::ActionError;

/// Messages delivered to the UI loop.
#[derive(Debug)]
pub enum Event {
    /// The session gate re-evaluated the auth state.
    Access(Access),
    /// A background action finished. `session` is the app's session
    /// generation when the action was spawned.
    Outcome { session: u64, outcome: Outcome },
}

impl From<Access> for Event {
    fn from(access: Access) -> Self {
        Event::Access(access)
    }
}

/// Feed list plus the article snapshot of every feed that has an id.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LoadedFeeds {
    pub feeds: Vec<Feed>,
    pub items: HashMap<String, Vec<Article>>,
}

/// Result of one background action.
#[derive(Debug)]
pub enum Outcome {
    SignedIn(Result<Principal, ActionError>),
    FeedsLoaded(Result<LoadedFeeds, ActionError>),
    /// Background refresh of an already loaded dashboard.
    FeedsReloaded(Result<LoadedFeeds, ActionError>),
    FollowsLoaded(Result<HashSet<String>, ActionError>),
    Created(Result<Feed, ActionError>),
    Scraped {
        feed_id: String,
        result: Result<Vec<Article>, ActionError>,
    },
    FollowChanged {
        feed_id: String,
        follow: bool,
        result: Result<(), ActionError>,
    },
    Deleted {
        feed_id: String,
        result: Result<(), ActionError>,
    },
    DetailLoaded {
        feed_id: String,
        result: Result<(Feed, Vec<Article>), DetailError>,
    },
    /// `Ok(None)` means the scrape went through but the refreshed item list
    /// could not be fetched.
    DetailScraped {
        feed_id: String,
        result: Result<Option<Vec<Article>>, ActionError>,
    },
}

/// Handles to the two external collaborators, shared by every task.
#[derive(Clone)]
pub struct Services {
    pub api: Arc<dyn FeedApi>,
    pub auth: Arc<dyn IdentityProvider>,
}

/// Run `action` on a new task and deliver its outcome to `events`, tagged
/// with `session`.
pub fn spawn<F>(events: &mpsc::UnboundedSender<Event>, session: u64, action: F)
where
    F: Future<Output = Outcome> + Send + 'static,
{
    let events = events.clone();
    tokio::spawn(async move {
        let outcome = action.await;
        // If the receiver is gone the UI has exited; drop the result.
        let _ = events.send(Event::Outcome { session, outcome });
    });
}

/// Log a failed action and pass the result through unchanged.
fn logged<T>(what: &str, result: Result<T, ActionError>) -> Result<T, ActionError> {
    if let Err(e) = &result {
        warn!(error = %e, "{what} failed");
    }
    result
}

impl Services {
    async fn token(&self) -> Result<String, ActionError> {
        Ok(self.auth.id_token().await?)
    }

    /// Sign in with email/password, then register with the backend.
    pub async fn sign_in(self, email: String, password: String) -> Outcome {
        let result = async {
            let principal = self.auth.sign_in_with_password(&email, &password).await?;
            let token = self.token().await?;
            bridge::register(self.api.as_ref(), &token, &principal).await?;
            Ok::<_, ActionError>(principal)
        }
        .await;
        Outcome::SignedIn(logged("sign-in", result))
    }

    /// Fetch the feed list and, concurrently, every feed's items.
    ///
    /// Item fetches are all-settled: a failed feed gets an empty list and
    /// does not affect its siblings. Feeds without an id are listed but get
    /// no entry in the item map.
    pub async fn fetch_feeds(&self) -> Result<LoadedFeeds, ActionError> {
        let token = self.token().await?;
        let feeds = self.api.list_feeds(&token).await?;

        let fetches = feeds
            .iter()
            .filter(|feed| !feed.id.is_empty())
            .map(|feed| {
                let token = token.as_str();
                async move {
                    let items = match self.api.feed_items(token, &feed.id).await {
                        Ok(payload) => normalize(&payload),
                        Err(e) => {
                            warn!(feed_id = %feed.id, error = %e, "failed to fetch items");
                            Vec::new()
                        }
                    };
                    (feed.id.clone(), items)
                }
            });
        let items = join_all(fetches).await.into_iter().collect();

        info!(feeds = feeds.len(), "loaded feeds");
        Ok(LoadedFeeds { feeds, items })
    }

    pub async fn load_feeds(self) -> Outcome {
        Outcome::FeedsLoaded(logged("loading feeds", self.fetch_feeds().await))
    }

    /// Same fetch as [`Services::load_feeds`], applied without the loading
    /// skeleton.
    pub async fn reload_feeds(self) -> Outcome {
        Outcome::FeedsReloaded(logged("reloading feeds", self.fetch_feeds().await))
    }

    /// Fetch the follow relations and reduce them to feed ids.
    pub async fn load_follows(self) -> Outcome {
        let result = async {
            let token = self.token().await?;
            let follows = self.api.list_follows(&token).await?;
            Ok::<_, ActionError>(follows.into_iter().map(|f| f.feed_id).collect())
        }
        .await;
        Outcome::FollowsLoaded(logged("loading followed feeds", result))
    }

    pub async fn create_feed(self, draft: NewFeed) -> Outcome {
        let result = async {
            let token = self.token().await?;
            Ok::<_, ActionError>(self.api.create_feed(&token, &draft).await?)
        }
        .await;
        Outcome::Created(logged("creating feed", result))
    }

    /// Trigger a scrape, then re-fetch that one feed's items.
    pub async fn scrape_feed(self, feed_id: String) -> Outcome {
        let result = async {
            let token = self.token().await?;
            self.api.scrape_feed(&token, &feed_id).await?;
            let payload = self.api.feed_items(&token, &feed_id).await?;
            Ok::<_, ActionError>(normalize(&payload))
        }
        .await;
        Outcome::Scraped {
            result: logged("scraping feed", result),
            feed_id,
        }
    }

    pub async fn follow_feed(self, feed_id: String, user_id: String) -> Outcome {
        let result = async {
            let token = self.token().await?;
            let body = NewFollow {
                feed_id: feed_id.clone(),
                user_id,
            };
            Ok::<_, ActionError>(self.api.follow_feed(&token, &body).await?)
        }
        .await;
        Outcome::FollowChanged {
            result: logged("following feed", result),
            feed_id,
            follow: true,
        }
    }

    pub async fn unfollow_feed(self, feed_id: String) -> Outcome {
        let result = async {
            let token = self.token().await?;
            Ok::<_, ActionError>(self.api.unfollow_feed(&token, &feed_id).await?)
        }
        .await;
        Outcome::FollowChanged {
            result: logged("unfollowing feed", result),
            feed_id,
            follow: false,
        }
    }

    pub async fn delete_feed(self, feed_id: String) -> Outcome {
        let result = async {
            let token = self.token().await?;
            Ok::<_, ActionError>(self.api.delete_feed(&token, &feed_id).await?)
        }
        .await;
        Outcome::Deleted {
            result: logged("deleting feed", result),
            feed_id,
        }
    }
}
