use std::collections::HashMap;

use tracing::info;

use shared::types::{ApiError, Comment, News};

use crate::api::ApiClient;
use crate::session::SessionStore;

// ---------------------------------------------------------------------------
// List-consistency coordinator
// ---------------------------------------------------------------------------

/// Key of one client-side collection cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKey {
    News,
    Comments(i64),
}

/// Cache of the last successful fetch per collection.
///
/// Consistency model: after any successful create, update, or delete the
/// owning collection is refetched in full and the cached value replaced
/// wholesale — never patched in place.  The cost is one extra round trip per
/// mutation on a low-traffic path.  A failed mutation or failed refetch
/// leaves the cache exactly as it was.
#[derive(Debug, Default)]
pub struct Collections {
    news: Option<Vec<News>>,
    comments: HashMap<i64, Vec<Comment>>,
}

impl Collections {
    /// News list, if it has ever been fetched.
    pub fn news(&self) -> Option<&[News]> {
        self.news.as_deref()
    }

    /// Comment thread for one news item, if it has ever been fetched.
    pub fn comments(&self, news_id: i64) -> Option<&[Comment]> {
        self.comments.get(&news_id).map(|c| c.as_slice())
    }

    /// Refetch one collection and replace the cached copy.
    ///
    /// The bearer credential rides along when a session is present — the
    /// list endpoints are public, but the service may tailor responses to
    /// the caller.
    pub async fn refetch(
        &mut self,
        api: &ApiClient,
        session: &SessionStore,
        key: CollectionKey,
    ) -> Result<(), ApiError> {
        match key {
            CollectionKey::News => {
                let fresh = api.list_news(session.bearer()).await?;
                info!("Refetched news list ({} items)", fresh.len());
                self.news = Some(fresh);
            }
            CollectionKey::Comments(news_id) => {
                let fresh = api.list_comments(news_id, session.bearer()).await?;
                info!("Refetched {} comments for news {}", fresh.len(), news_id);
                self.comments.insert(news_id, fresh);
            }
        }
        Ok(())
    }

    /// Replace the news list with the result of a background fetch.
    pub fn replace_news(&mut self, items: Vec<News>) {
        self.news = Some(items);
    }

    /// Replace one comment thread with the result of a background fetch.
    pub fn replace_comments(&mut self, news_id: i64, items: Vec<Comment>) {
        self.comments.insert(news_id, items);
    }

    /// Drop the cached thread of a deleted news item.
    pub fn forget_comments(&mut self, news_id: i64) {
        self.comments.remove(&news_id);
    }
}
