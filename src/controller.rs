use crate::{
    api::{ApiGateway, LinkList},
    error::{ApiError, ApiResult},
    models::ShortLink,
};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::{RwLock, RwLockReadGuard};

const UNEXPECTED_FORMAT: &str = "Received an unexpected data format from the server.";
const OWN_FETCH_FAILED: &str = "Failed to fetch URLs. Please make sure you are logged in.";
const ALL_FETCH_FAILED: &str = "Failed to fetch URLs. Ensure you are logged in as an admin.";
const NO_DETAILS: &str = "No Deatiles founded or data format is incorrect.";
const CREATE_FAILED: &str = "Failed to shorten URL.";
const DELETE_FAILED: &str = "Failed to delete URL.";
const EMPTY_URL: &str = "URL must not be empty.";

/// Delay before re-fetching after a user opens one of their own links, so the
/// backend has recorded the visit by the time we ask.
const VISIT_REFRESH_DELAY: Duration = Duration::from_millis(500);

/// Which link set the controller lists when unfiltered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkScope {
    /// The signed-in user's own links.
    Own,
    /// Every link in the system (admin dashboard).
    All,
}

// ── View state ─────────────────────────────────────────────────────────────

/// Client-side snapshot of the link list and everything shown around it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListView {
    pub links: Vec<ShortLink>,
    pub loading: bool,
    pub searching: bool,
    pub submitting: bool,
    pub error: Option<String>,
    /// Owner filter the current `links` were fetched with, if any.
    pub active_query: Option<String>,
    pub search_input: String,
    pub url_input: String,
    pub last_created: Option<ShortLink>,
}

/// What the list area shows right now. Exactly one applies at a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayState<'a> {
    Loading,
    Errored(&'a str),
    Populated(&'a [ShortLink]),
}

impl ListView {
    pub fn display_state(&self) -> DisplayState<'_> {
        if self.loading {
            DisplayState::Loading
        } else if let Some(err) = self.error.as_deref() {
            DisplayState::Errored(err)
        } else {
            DisplayState::Populated(&self.links)
        }
    }
}

#[derive(Debug, Clone)]
enum Listing {
    Own,
    All,
    Owner(String),
}

// ── Controller ─────────────────────────────────────────────────────────────

/// Owns the link list for one mounted view and keeps it in step with the
/// backend. Every mutation is followed by exactly one refetch; every fetch is
/// ticketed and only the most recently issued one may write the list.
pub struct LinkController {
    gateway: Arc<dyn ApiGateway>,
    scope: LinkScope,
    copy_base_url: String,
    view: RwLock<ListView>,
    latest_fetch: AtomicU64,
}

impl LinkController {
    pub fn new(gateway: Arc<dyn ApiGateway>, scope: LinkScope, copy_base_url: &str) -> Self {
        Self {
            gateway,
            scope,
            copy_base_url: copy_base_url.trim_end_matches('/').to_owned(),
            view: RwLock::new(ListView {
                loading: true,
                ..ListView::default()
            }),
            latest_fetch: AtomicU64::new(0),
        }
    }

    pub fn scope(&self) -> LinkScope {
        self.scope
    }

    /// Read access to the current snapshot.
    pub async fn view(&self) -> RwLockReadGuard<'_, ListView> {
        self.view.read().await
    }

    /// Owned copy of the current snapshot.
    pub async fn snapshot(&self) -> ListView {
        self.view.read().await.clone()
    }

    /// Public link for a short id: `<copy base>/<shortId>`.
    pub fn public_url(&self, short_id: &str) -> String {
        format!("{}/{}", self.copy_base_url, short_id)
    }

    pub async fn set_search_input(&self, text: &str) {
        self.view.write().await.search_input = text.to_owned();
    }

    pub async fn set_url_input(&self, text: &str) {
        self.view.write().await.url_input = text.to_owned();
    }

    // ── Listing ────────────────────────────────────────────────────────────

    /// Unfiltered fetch for this controller's scope.
    pub async fn refresh(&self) {
        match self.scope {
            LinkScope::Own => self.list_own().await,
            LinkScope::All => self.list_all().await,
        }
    }

    pub async fn list_own(&self) {
        self.fetch(Listing::Own).await;
    }

    pub async fn list_all(&self) {
        self.fetch(Listing::All).await;
    }

    /// Links owned by `query` (an email). Blank queries are ignored.
    pub async fn search_by_owner(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        self.fetch(Listing::Owner(query.to_owned())).await;
    }

    /// Search with whatever is in the search input.
    pub async fn submit_search(&self) {
        let query = self.view.read().await.search_input.clone();
        self.search_by_owner(&query).await;
    }

    async fn fetch(&self, listing: Listing) {
        let ticket = self.latest_fetch.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut view = self.view.write().await;
            match listing {
                Listing::Owner(_) => view.searching = true,
                Listing::Own | Listing::All => view.loading = true,
            }
            view.error = None;
        }

        let result: ApiResult<LinkList> = match &listing {
            Listing::Own => self.gateway.list_own_links().await,
            Listing::All => self.gateway.list_all_links().await,
            Listing::Owner(query) => self.gateway.links_by_owner(query).await,
        };

        let mut view = self.view.write().await;
        if self.latest_fetch.load(Ordering::SeqCst) != ticket {
            tracing::debug!(ticket, ?listing, "Discarding superseded fetch result");
            return;
        }
        view.loading = false;
        view.searching = false;

        let fallback = match listing {
            Listing::Own => OWN_FETCH_FAILED,
            _ => ALL_FETCH_FAILED,
        };
        match listing {
            Listing::Own | Listing::All => match result {
                Ok(list) => {
                    tracing::debug!("Fetched {} link(s)", list.urls.len());
                    view.links = list.urls;
                    view.error = None;
                    view.active_query = None;
                }
                Err(e @ ApiError::ShapeMismatch { .. }) => {
                    view.error = Some(e.user_message(UNEXPECTED_FORMAT));
                }
                Err(e) => {
                    tracing::warn!("Link fetch failed: {}", e);
                    view.error = Some(e.user_message(fallback));
                }
            },
            // The list is emptied on any failure, so only a hit leaves a
            // query behind for a later delete to re-run.
            Listing::Owner(query) => {
                let error = match result {
                    Ok(list) if !list.urls.is_empty() => {
                        tracing::debug!("Found {} link(s) for {}", list.urls.len(), query);
                        view.links = list.urls;
                        view.error = None;
                        view.search_input.clear();
                        view.active_query = Some(query);
                        return;
                    }
                    Ok(_) => NO_DETAILS.to_owned(),
                    Err(e @ ApiError::ShapeMismatch { .. }) => e.user_message(NO_DETAILS),
                    Err(e) => {
                        tracing::warn!("Owner search for {} failed: {}", query, e);
                        e.user_message(&format!("Failed to fetch URLs for {query}."))
                    }
                };
                view.error = Some(error);
                view.links.clear();
                view.active_query = None;
            }
        }
    }

    // ── Mutations ──────────────────────────────────────────────────────────

    /// Shorten `long_url`. On success the new link is kept as "last created"
    /// and the list is re-fetched from the server; it is never spliced in.
    pub async fn create_link(&self, long_url: &str) -> Option<ShortLink> {
        let url = long_url.trim();
        {
            let mut view = self.view.write().await;
            view.last_created = None;
            if url.is_empty() {
                view.error = Some(EMPTY_URL.to_owned());
                return None;
            }
            view.submitting = true;
            view.error = None;
        }

        let created = match self.gateway.create_link(url).await {
            Ok(single) => {
                let mut view = self.view.write().await;
                tracing::info!("Created short link {}", single.url.short_id);
                view.last_created = Some(single.url.clone());
                view.url_input.clear();
                view.submitting = false;
                single.url
            }
            Err(e) => {
                tracing::warn!("Create link failed: {}", e);
                let mut view = self.view.write().await;
                view.error = Some(e.user_message(CREATE_FAILED));
                view.submitting = false;
                return None;
            }
        };

        self.refresh().await;
        Some(created)
    }

    /// Shorten whatever is in the URL input.
    pub async fn submit_create(&self) -> Option<ShortLink> {
        let url = self.view.read().await.url_input.clone();
        self.create_link(&url).await
    }

    /// Delete a link, then re-run the listing that was showing when the delete
    /// was issued. Only reachable through [`crate::feedback::DeleteConfirmation`].
    pub(crate) async fn delete_link(&self, short_id: &str) -> bool {
        let active_query = self.view.read().await.active_query.clone();

        if let Err(e) = self.gateway.delete_link(short_id).await {
            tracing::warn!("Delete of {} failed: {}", short_id, e);
            self.view.write().await.error = Some(e.user_message(DELETE_FAILED));
            return false;
        }

        tracing::info!("Deleted short link {}", short_id);
        match active_query {
            Some(query) => self.search_by_owner(&query).await,
            None => self.refresh().await,
        }
        true
    }

    /// Open a link through `open`. For a user's own links the list is re-fetched
    /// shortly afterwards so the click count includes this visit.
    pub async fn visit_link(&self, short_id: &str, open: impl FnOnce(&str)) {
        let url = self.public_url(short_id);
        open(&url);
        if self.scope == LinkScope::Own {
            tokio::time::sleep(VISIT_REFRESH_DELAY).await;
            self.refresh().await;
        }
    }
}
