use crate::cache::FeedCache;
use crate::store::{Result, Store};
use pinnwand_common::feed::{FeedPage, FeedScope, PageWindow};
use std::sync::Arc;
use time::UtcDateTime;

/// Turns a feed scope and a requested page number into one composed,
/// newest-first page.
pub struct FeedComposer {
    store: Arc<dyn Store>,
    cache: FeedCache,
}

impl FeedComposer {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, cache: FeedCache) -> Self {
        Self { store, cache }
    }

    pub async fn compose(&self, scope: FeedScope, page: Option<u64>) -> Result<FeedPage> {
        self.compose_at(scope, page, UtcDateTime::now()).await
    }

    /// Composes one page, reading the clock as `now` for cache decisions.
    ///
    /// Only the root scope's first page goes through [`FeedCache`]; every
    /// other scope and page is computed fresh. The page number is clamped,
    /// never rejected.
    pub async fn compose_at(
        &self,
        scope: FeedScope,
        page: Option<u64>,
        now: UtcDateTime,
    ) -> Result<FeedPage> {
        let cacheable = scope == FeedScope::All && page.unwrap_or(1) == 1;

        if cacheable && let Some(cached) = self.cache.get_at(now) {
            return Ok(cached);
        }

        let total_count = self.store.count_posts(scope).await?;
        let window = PageWindow::resolve(page, total_count);
        let items = self
            .store
            .list_posts(scope, window.limit, window.offset)
            .await?;
        let composed = FeedPage::new(items, window, total_count);

        if cacheable {
            self.cache.fill_at(&composed, now);
        }

        Ok(composed)
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::FeedCache;
    use crate::feed::FeedComposer;
    use crate::mem::InMemoryStore;
    use crate::store::Store;
    use pinnwand_common::feed::FeedScope;
    use pinnwand_common::model::follow::Follow;
    use pinnwand_common::model::post::{CreatePost, PostMarker, PostText};
    use pinnwand_common::model::user::{CreateUser, User, UserHandle};
    use pinnwand_common::model::Id;
    use pinnwand_common::util::PositiveDuration;
    use std::sync::Arc;
    use time::{Duration, UtcDateTime};

    fn composer(store: &Arc<InMemoryStore>) -> FeedComposer {
        let window = PositiveDuration::new(Duration::seconds(20)).unwrap();
        FeedComposer::new(Arc::clone(store) as Arc<dyn Store>, FeedCache::new(window))
    }

    async fn signup(store: &InMemoryStore, handle: &str) -> User {
        store
            .create_user(&CreateUser {
                handle: UserHandle::new(handle.into()).unwrap(),
            })
            .await
            .unwrap()
    }

    async fn write_post(store: &InMemoryStore, author: &User, text: &str) -> Id<PostMarker> {
        store
            .create_post(&CreatePost {
                author: author.id,
                text: PostText::new(text.into()).unwrap(),
                group: None,
                image: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn twelve_posts_paginate_into_ten_and_two() {
        let store = Arc::new(InMemoryStore::new());
        let composer = composer(&store);
        let anna = signup(&store, "anna").await;
        for n in 0..12 {
            write_post(&store, &anna, &format!("post {n}")).await;
        }

        let first = composer.compose(FeedScope::All, Some(1)).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total_count, 12);
        assert_eq!(first.total_pages, 2);

        let second = composer.compose(FeedScope::All, Some(2)).await.unwrap();
        assert_eq!(second.items.len(), 2);
        assert_eq!(second.page, 2);

        let clamped = composer.compose(FeedScope::All, Some(99)).await.unwrap();
        assert_eq!(clamped.page, 2);
        assert_eq!(clamped.items, second.items);
    }

    #[tokio::test]
    async fn a_new_post_leads_the_feed() {
        let store = Arc::new(InMemoryStore::new());
        let composer = composer(&store);
        let anna = signup(&store, "anna").await;
        write_post(&store, &anna, "older").await;

        let before = composer
            .compose(FeedScope::Author(anna.id), None)
            .await
            .unwrap();
        let newest = write_post(&store, &anna, "newer").await;
        let after = composer
            .compose(FeedScope::Author(anna.id), None)
            .await
            .unwrap();

        assert_eq!(after.total_count, before.total_count + 1);
        assert_eq!(after.items.first().map(|post| post.id), Some(newest));
    }

    #[tokio::test]
    async fn follow_feed_contains_exactly_the_followed_authors() {
        let store = Arc::new(InMemoryStore::new());
        let composer = composer(&store);
        let anna = signup(&store, "anna").await;
        let boris = signup(&store, "boris").await;
        let clara = signup(&store, "clara").await;
        let from_boris = write_post(&store, &boris, "from boris").await;
        write_post(&store, &clara, "from clara").await;

        let empty = composer
            .compose(FeedScope::Following(anna.id), None)
            .await
            .unwrap();
        assert!(empty.items.is_empty());

        store
            .create_follow(Follow::new(anna.id, boris.id))
            .await
            .unwrap();
        let followed = composer
            .compose(FeedScope::Following(anna.id), None)
            .await
            .unwrap();

        assert_eq!(followed.items.len(), 1);
        assert_eq!(followed.items[0].id, from_boris);
    }

    #[tokio::test]
    async fn a_deletion_stays_invisible_until_the_window_expires() {
        let store = Arc::new(InMemoryStore::new());
        let composer = composer(&store);
        let anna = signup(&store, "anna").await;
        write_post(&store, &anna, "first").await;
        let doomed = write_post(&store, &anna, "second").await;

        let t0 = UtcDateTime::now();
        let cold = composer
            .compose_at(FeedScope::All, Some(1), t0)
            .await
            .unwrap();
        assert_eq!(cold.items.first().map(|post| post.id), Some(doomed));

        assert!(store.delete_post(doomed).await.unwrap());

        // within the window the deleted post is still served
        let stale = composer
            .compose_at(FeedScope::All, None, t0 + Duration::seconds(10))
            .await
            .unwrap();
        assert_eq!(stale.items.first().map(|post| post.id), Some(doomed));
        assert_eq!(stale.total_count, 2);

        // a non-root scope sees the deletion immediately
        let fresh_scope = composer
            .compose_at(FeedScope::Author(anna.id), None, t0 + Duration::seconds(10))
            .await
            .unwrap();
        assert_eq!(fresh_scope.total_count, 1);

        // once the window has elapsed the root feed recomputes
        let refreshed = composer
            .compose_at(FeedScope::All, Some(1), t0 + Duration::seconds(20))
            .await
            .unwrap();
        assert_eq!(refreshed.total_count, 1);
        assert!(refreshed.items.iter().all(|post| post.id != doomed));
    }

    #[tokio::test]
    async fn deeper_pages_of_the_root_feed_skip_the_cache() {
        let store = Arc::new(InMemoryStore::new());
        let composer = composer(&store);
        let anna = signup(&store, "anna").await;
        for n in 0..11 {
            write_post(&store, &anna, &format!("post {n}")).await;
        }

        let t0 = UtcDateTime::now();
        composer
            .compose_at(FeedScope::All, Some(1), t0)
            .await
            .unwrap();

        let second = composer
            .compose_at(FeedScope::All, Some(2), t0)
            .await
            .unwrap();
        let doomed = second.items[0].id;
        assert!(store.delete_post(doomed).await.unwrap());

        // page two is never cached, so the deletion is visible at once
        let second_again = composer
            .compose_at(FeedScope::All, Some(2), t0)
            .await
            .unwrap();
        assert_eq!(second_again.total_count, 10);
        assert_eq!(second_again.page, 1);
    }
}
