//! Listing browsing, search and submission on top of the REST client.

use crate::app::session_guard::SessionGuard;
use crate::domain::listing::{Listing, ListingDraft, ListingFilters, ListingQuery, Page};
use crate::domain::search::{SearchIndex, SearchKey, SearchOptions};
use crate::error::{ApiError, ApiResult};
use crate::infra::http::ApiClient;
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const DEFAULT_FILTER_DEBOUNCE: Duration = Duration::from_millis(400);

/// Keys and weights used for listing search, both client-side and by the mock API.
pub fn listing_search_options() -> SearchOptions {
    SearchOptions::with_keys(vec![
        SearchKey::new("title", 0.4),
        SearchKey::new("description", 0.1),
        SearchKey::new("subcategory", 0.1),
        SearchKey::new("location.city", 0.15),
        SearchKey::new("location.district", 0.05),
        SearchKey::new("details.make", 0.1),
        SearchKey::new("details.model", 0.1),
        SearchKey::new("details.features", 0.05),
        SearchKey::new("images.caption", 0.05),
    ])
}

pub fn listing_index(listings: Vec<Listing>) -> Result<SearchIndex<Listing>, serde_json::Error> {
    SearchIndex::new(listings, listing_search_options())
}

#[derive(Serialize)]
struct SearchParams<'a> {
    q: &'a str,
}

pub struct ListingsService {
    client: Arc<ApiClient>,
    session: SessionGuard,
}

impl ListingsService {
    pub fn new(client: Arc<ApiClient>, session: SessionGuard) -> Self {
        Self { client, session }
    }

    pub async fn list(&self, filters: &ListingFilters, page: u32, per_page: u32) -> ApiResult<Page<Listing>> {
        let query = ListingQuery::new(filters, page, per_page);
        self.client.get_json_with_query("/listings", &query).await
    }

    pub async fn get(&self, id: &str) -> ApiResult<Listing> {
        self.client.get_json(&format!("/listings/{}", id)).await
    }

    /// Server-side fuzzy search.
    pub async fn search(&self, query: &str) -> ApiResult<Vec<Listing>> {
        self.client
            .get_json_with_query("/listings/search", &SearchParams { q: query })
            .await
    }

    pub async fn create(&self, draft: &ListingDraft) -> ApiResult<Listing> {
        draft.validate().map_err(ApiError::Validation)?;
        let client = &self.client;
        self.session
            .require_auth(move || client.post_json("/listings", draft))
            .await
    }

    pub async fn update(&self, id: &str, draft: &ListingDraft) -> ApiResult<Listing> {
        draft.validate().map_err(ApiError::Validation)?;
        let client = &self.client;
        let path = format!("/listings/{}", id);
        let path_ref = path.as_str();
        self.session
            .require_auth(move || client.put_json(path_ref, draft))
            .await
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        let client = &self.client;
        let path = format!("/listings/{}", id);
        let path_ref = path.as_str();
        self.session.require_auth(move || client.delete(path_ref)).await
    }

    /// Fetches the feed's next page and appends it. Returns how many new listings arrived.
    pub async fn load_more(&self, feed: &mut ListingFeed) -> ApiResult<usize> {
        let Some(query) = feed.next_query() else {
            return Ok(0);
        };
        let page: Page<Listing> = self.client.get_json_with_query("/listings", &query).await?;
        Ok(feed.append(page))
    }
}

/// Fetch-and-append pagination state for one set of filters.
#[derive(Debug, Clone)]
pub struct ListingFeed {
    filters: ListingFilters,
    per_page: u32,
    items: Vec<Listing>,
    seen: HashSet<String>,
    next_page: u32,
    has_more: bool,
    total: u64,
}

impl ListingFeed {
    pub fn new(filters: ListingFilters, per_page: u32) -> Self {
        Self {
            filters,
            per_page: per_page.max(1),
            items: Vec::new(),
            seen: HashSet::new(),
            next_page: 1,
            has_more: true,
            total: 0,
        }
    }

    pub fn filters(&self) -> &ListingFilters {
        &self.filters
    }

    pub fn items(&self) -> &[Listing] {
        &self.items
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Starts over with new filters.
    pub fn reset(&mut self, filters: ListingFilters) {
        *self = Self::new(filters, self.per_page);
    }

    pub fn next_query(&self) -> Option<ListingQuery> {
        self.has_more
            .then(|| ListingQuery::new(&self.filters, self.next_page, self.per_page))
    }

    /// Appends a page, skipping listings already in the feed.
    pub fn append(&mut self, page: Page<Listing>) -> usize {
        let has_more = page.has_more() && !page.items.is_empty();
        let before = self.items.len();
        for listing in page.items {
            if self.seen.insert(listing.id.clone()) {
                self.items.push(listing);
            }
        }
        self.next_page = page.page + 1;
        self.has_more = has_more;
        self.total = page.total;
        self.items.len() - before
    }
}

/// Runs the most recently scheduled task after a quiet period. Scheduling again before
/// the delay elapses, or while the previous task is still running, aborts the previous one.
pub struct FilterDebouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl FilterDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn schedule<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for FilterDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A feed whose first page is re-fetched (debounced) whenever the filters change.
pub struct LiveFeed {
    service: Arc<ListingsService>,
    feed: Arc<Mutex<ListingFeed>>,
    debouncer: FilterDebouncer,
}

impl LiveFeed {
    pub fn new(service: Arc<ListingsService>, filters: ListingFilters, per_page: u32, delay: Duration) -> Self {
        Self {
            service,
            feed: Arc::new(Mutex::new(ListingFeed::new(filters, per_page))),
            debouncer: FilterDebouncer::new(delay),
        }
    }

    pub fn set_filters(&mut self, filters: ListingFilters) {
        let service = self.service.clone();
        let feed = self.feed.clone();
        self.debouncer.schedule(async move {
            let mut feed = feed.lock().await;
            feed.reset(filters);
            if let Err(e) = service.load_more(&mut feed).await {
                tracing::warn!(error = %e, "listing fetch after filter change failed");
            }
        });
    }

    pub async fn load_more(&self) -> ApiResult<usize> {
        let mut feed = self.feed.lock().await;
        self.service.load_more(&mut feed).await
    }

    pub async fn snapshot(&self) -> Vec<Listing> {
        self.feed.lock().await.items().to_vec()
    }

    pub async fn filters(&self) -> ListingFilters {
        self.feed.lock().await.filters().clone()
    }

    pub fn is_refreshing(&self) -> bool {
        self.debouncer.is_pending()
    }
}
