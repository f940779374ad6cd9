//! Drives an infinite-scroll, searchable picker over any entity listing.
//!
//! The selector owns its accumulation state; fetch tickets carry the search
//! generation so that a page landing after a newer search is dropped instead of
//! appended. Time is passed in explicitly, the host event loop supplies `now`.

use std::time::{Duration, Instant};

use crate::domain::{
    entity::{Entity, EntityKind},
    page::{Page, PageQuery},
    selector_state::{CommitOutcome, FetchTicket, Selection, SelectorState},
};

use super::{
    contracts::{PrincipalLookup, RawPageFetcher},
    resolve_page::PageResolver,
};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 1_000;
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS);

const SELECTOR_FETCH_FAILED: &str = "SELECTOR_FETCH_FAILED";
const SELECTOR_STALE_RESPONSE_DROPPED: &str = "SELECTOR_STALE_RESPONSE_DROPPED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorSettings {
    pub page_size: usize,
    pub search_debounce: Duration,
}

impl Default for SelectorSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
        }
    }
}

/// Holds back a value until nothing newer has been scheduled for `window`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Replaces whatever was pending and restarts the quiescence window.
    pub fn schedule(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.window));
    }

    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, due)) if *due <= now => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

pub struct IncrementalSelector<F, L> {
    kind: EntityKind,
    container_id: Option<String>,
    resolver: PageResolver<F, L>,
    settings: SelectorSettings,
    state: SelectorState,
    search: Debouncer<String>,
}

impl<F, L> IncrementalSelector<F, L>
where
    F: RawPageFetcher,
    L: PrincipalLookup,
{
    /// `excluded_id` is typically the caller's own id, hidden from the list.
    pub fn new(
        kind: EntityKind,
        resolver: PageResolver<F, L>,
        settings: SelectorSettings,
        excluded_id: Option<String>,
        container_id: Option<String>,
    ) -> Self {
        Self {
            kind,
            container_id,
            resolver,
            settings,
            state: SelectorState::new(excluded_id),
            search: Debouncer::new(settings.search_debounce),
        }
    }

    /// Seeds the list from a first page the caller fetched up front.
    pub fn with_init_page(mut self, page: Page<Entity>) -> Self {
        if let Some(error) = &page.error {
            tracing::warn!(
                code = SELECTOR_FETCH_FAILED,
                kind = self.kind.as_label(),
                error = %error,
                "selector initial page carries an error"
            );
        }
        self.state.seed(page);
        self
    }

    pub fn state(&self) -> &SelectorState {
        &self.state
    }

    /// Loads the next page when the list end becomes visible. Returns `None`
    /// when a fetch is in flight, the list is exhausted or in error.
    pub async fn on_scroll_into_view(&mut self) -> Option<CommitOutcome> {
        let ticket = self.state.begin_scroll()?;
        Some(self.run(ticket).await)
    }

    pub fn on_search_change(&mut self, term: impl Into<String>, now: Instant) {
        self.search.schedule(term.into(), now);
    }

    /// Fires the pending search once its quiescence window has passed.
    pub async fn poll_search(&mut self, now: Instant) -> Option<CommitOutcome> {
        let term = self.search.take_due(now)?;
        let ticket = self.state.begin_search(term);
        Some(self.run(ticket).await)
    }

    /// Drops the selection and the search term, then reloads the unfiltered list.
    pub async fn on_clear_selection(&mut self) -> CommitOutcome {
        self.state.clear_selection();
        self.search.cancel();
        let ticket = self.state.begin_search(String::new());
        self.run(ticket).await
    }

    pub fn select(&mut self, id: &str) -> Option<Selection> {
        self.state.select(id)
    }

    pub fn query_for(&self, ticket: &FetchTicket) -> PageQuery {
        PageQuery::new(ticket.offset, self.settings.page_size)
            .with_search(self.kind.search_field(), &ticket.search_term)
    }

    /// Fetches the page a ticket asks for without touching selector state, for
    /// hosts that run fetches concurrently and commit later.
    pub async fn fetch(&self, ticket: &FetchTicket) -> Page<Entity> {
        self.resolver
            .resolve(self.kind, self.query_for(ticket), self.container_id.as_deref())
            .await
    }

    /// Begins a scroll fetch without running it; pair with [`Self::fetch`] and
    /// [`Self::commit`].
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn begin_scroll(&mut self) -> Option<FetchTicket> {
        self.state.begin_scroll()
    }

    pub fn commit(&mut self, ticket: &FetchTicket, page: Page<Entity>) -> CommitOutcome {
        let error = page.error.clone();
        let outcome = self.state.commit(ticket, page);

        match outcome {
            CommitOutcome::Stale => tracing::debug!(
                code = SELECTOR_STALE_RESPONSE_DROPPED,
                kind = self.kind.as_label(),
                ticket_generation = ticket.generation,
                current_generation = self.state.generation(),
                "dropping selector page from superseded generation"
            ),
            CommitOutcome::Failed => tracing::warn!(
                code = SELECTOR_FETCH_FAILED,
                kind = self.kind.as_label(),
                error = error.as_deref().unwrap_or_default(),
                "selector page fetch failed"
            ),
            CommitOutcome::Applied => tracing::debug!(
                kind = self.kind.as_label(),
                accumulated = self.state.accumulated().len(),
                total = self.state.total(),
                "selector page applied"
            ),
        }

        outcome
    }

    async fn run(&mut self, ticket: FetchTicket) -> CommitOutcome {
        let page = self.fetch(&ticket).await;
        self.commit(&ticket, page)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        domain::{
            entity::{Channel, Role},
            page::RawPage,
            principal::Principal,
            selector_state::SelectorUiState,
        },
        test_support::principal,
        usecases::contracts::{FetchError, PageRequest},
    };

    /// Serves users, roles and channels named `<kind><index>` from memory and
    /// records every request.
    struct StubFetcher {
        size: usize,
        fail: bool,
        requests: Mutex<Vec<PageRequest>>,
    }

    impl StubFetcher {
        fn with_size(size: usize) -> Self {
            Self {
                size,
                fail: false,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::with_size(0)
            }
        }

        fn requests(&self) -> Vec<PageRequest> {
            self.requests.lock().expect("requests lock").clone()
        }
    }

    #[async_trait]
    impl RawPageFetcher for StubFetcher {
        async fn fetch_page(&self, request: PageRequest) -> Result<RawPage, FetchError> {
            self.requests
                .lock()
                .expect("requests lock")
                .push(request.clone());
            if self.fail {
                return Err(FetchError::Unavailable("directory offline".to_owned()));
            }

            let query = &request.query;
            let names: Vec<String> = (0..self.size)
                .map(|index| format!("{}{index}", request.kind.as_label()))
                .filter(|name| {
                    query
                        .search_term(request.kind.search_field())
                        .map_or(true, |term| name.contains(term))
                })
                .collect();
            let page = Page::from_collection(names, query.offset, query.limit);

            Ok(match request.kind {
                EntityKind::Role => {
                    RawPage::Roles(page.map_items(|name| Role::new(format!("id-{name}"), name)))
                }
                EntityKind::Channel => RawPage::Channels(page.map_items(|name| Channel {
                    id: format!("id-{name}"),
                    name,
                })),
                _ => RawPage::Users(page.map_items(|name| principal(&format!("id-{name}"), &name))),
            })
        }
    }

    struct NoLookup;

    #[async_trait]
    impl PrincipalLookup for NoLookup {
        async fn lookup(&self, principal_id: &str) -> Result<Principal, FetchError> {
            Err(FetchError::NotFound(principal_id.to_owned()))
        }
    }

    fn selector(
        kind: EntityKind,
        fetcher: &Arc<StubFetcher>,
        excluded_id: Option<&str>,
    ) -> IncrementalSelector<Arc<StubFetcher>, NoLookup> {
        IncrementalSelector::new(
            kind,
            PageResolver::new(Arc::clone(fetcher), NoLookup),
            SelectorSettings::default(),
            excluded_id.map(ToOwned::to_owned),
            None,
        )
    }

    fn user_page(total: usize, ids: &[&str]) -> Page<Entity> {
        Page::new(
            total,
            20,
            0,
            ids.iter()
                .map(|id| Entity::User(principal(id, &format!("name-{id}"))))
                .collect(),
        )
    }

    #[tokio::test]
    async fn reaches_exhausted_after_exactly_three_scroll_fetches() {
        let fetcher = Arc::new(StubFetcher::with_size(45));
        let mut selector = selector(EntityKind::User, &fetcher, None);

        let mut fetches = 0;
        while selector.on_scroll_into_view().await.is_some() {
            fetches += 1;
        }

        assert_eq!(fetches, 3);
        assert_eq!(selector.state().accumulated().len(), 45);
        assert_eq!(selector.state().ui_state(), SelectorUiState::Exhausted);
        let offsets: Vec<_> = fetcher.requests().iter().map(|r| r.query.offset).collect();
        assert_eq!(offsets, [0, 20, 40]);
    }

    #[tokio::test]
    async fn init_page_excludes_own_id() {
        let fetcher = Arc::new(StubFetcher::with_size(0));
        let selector = selector(EntityKind::Member, &fetcher, Some("me"))
            .with_init_page(user_page(12, &["a", "me", "b", "c"]));

        assert_eq!(selector.state().accumulated().len(), 3);
        assert_eq!(selector.state().total(), 11);
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn search_changes_within_window_collapse_into_one_fetch() {
        let fetcher = Arc::new(StubFetcher::with_size(45));
        let mut selector = selector(EntityKind::User, &fetcher, None);
        let t0 = Instant::now();

        selector.on_search_change("x", t0);
        selector.on_search_change("", t0 + Duration::from_millis(500));

        assert!(selector
            .poll_search(t0 + Duration::from_millis(1_000))
            .await
            .is_none());
        assert_eq!(
            selector.poll_search(t0 + Duration::from_millis(1_500)).await,
            Some(CommitOutcome::Applied)
        );
        assert!(selector
            .poll_search(t0 + Duration::from_millis(5_000))
            .await
            .is_none());

        let requests = fetcher.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].query.username, None);
        assert_eq!(requests[0].query.offset, 0);
    }

    #[tokio::test]
    async fn search_resets_accumulated_items() {
        let fetcher = Arc::new(StubFetcher::with_size(45));
        let mut selector = selector(EntityKind::User, &fetcher, None);
        selector.on_scroll_into_view().await;
        selector.on_scroll_into_view().await;
        let t0 = Instant::now();

        selector.on_search_change("user4", t0);
        selector.poll_search(t0 + DEFAULT_SEARCH_DEBOUNCE).await;

        // user4 and user40..user44
        assert_eq!(selector.state().accumulated().len(), 6);
        assert_eq!(selector.state().total(), 6);
        assert_eq!(selector.state().search_term(), "user4");
    }

    #[tokio::test]
    async fn search_term_goes_into_kind_specific_field() {
        let t0 = Instant::now();
        let due = t0 + DEFAULT_SEARCH_DEBOUNCE;

        let roles = Arc::new(StubFetcher::with_size(5));
        let mut role_selector = selector(EntityKind::Role, &roles, None);
        role_selector.on_search_change("adm", t0);
        role_selector.poll_search(due).await;

        let channels = Arc::new(StubFetcher::with_size(5));
        let mut channel_selector = selector(EntityKind::Channel, &channels, None);
        channel_selector.on_search_change("gen", t0);
        channel_selector.poll_search(due).await;

        let role_query = &roles.requests()[0].query;
        assert_eq!(role_query.role_name.as_deref(), Some("adm"));
        assert_eq!(role_query.name, None);
        let channel_query = &channels.requests()[0].query;
        assert_eq!(channel_query.name.as_deref(), Some("gen"));
        assert_eq!(channel_query.username, None);
    }

    #[tokio::test]
    async fn clear_selection_drops_pending_search_and_reloads_unfiltered() {
        let fetcher = Arc::new(StubFetcher::with_size(45));
        let mut selector = selector(EntityKind::User, &fetcher, None);
        let t0 = Instant::now();
        selector.on_search_change("user4", t0);
        selector.poll_search(t0 + DEFAULT_SEARCH_DEBOUNCE).await;
        selector.select("id-user4").expect("user4 is listed");
        selector.on_search_change("user1", t0);

        let outcome = selector.on_clear_selection().await;

        assert_eq!(outcome, CommitOutcome::Applied);
        assert!(selector.state().selection().is_none());
        assert_eq!(selector.state().search_term(), "");
        assert_eq!(selector.state().accumulated().len(), 20);
        assert_eq!(fetcher.requests().last().map(|r| r.query.username.clone()), Some(None));
        assert!(selector
            .poll_search(t0 + Duration::from_secs(60))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn selection_reports_username_for_people_and_name_otherwise() {
        let users = Arc::new(StubFetcher::with_size(3));
        let mut user_selector = selector(EntityKind::User, &users, None);
        user_selector.on_scroll_into_view().await;

        let roles = Arc::new(StubFetcher::with_size(3));
        let mut role_selector = selector(EntityKind::Role, &roles, None);
        role_selector.on_scroll_into_view().await;

        assert_eq!(
            user_selector.select("id-user1").map(|s| s.label),
            Some("user1".to_owned())
        );
        assert_eq!(
            role_selector.select("id-role2").map(|s| s.label),
            Some("role2".to_owned())
        );
    }

    #[tokio::test]
    async fn fetch_failure_puts_selector_in_error_and_stops_scrolling() {
        let fetcher = Arc::new(StubFetcher::failing());
        let mut selector = selector(EntityKind::User, &fetcher, None);

        let outcome = selector.on_scroll_into_view().await;

        assert_eq!(outcome, Some(CommitOutcome::Failed));
        assert_eq!(selector.state().ui_state(), SelectorUiState::Error);
        assert_eq!(
            selector.state().error(),
            Some("service unavailable: directory offline")
        );
        assert!(selector.on_scroll_into_view().await.is_none());
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn late_scroll_page_is_dropped_after_search() {
        let fetcher = Arc::new(StubFetcher::with_size(45));
        let mut selector = selector(EntityKind::User, &fetcher, None);
        selector.on_scroll_into_view().await;

        let scroll = selector.begin_scroll().expect("scroll should start");
        let late_page = selector.fetch(&scroll).await;
        let t0 = Instant::now();
        selector.on_search_change("user1", t0);
        selector.poll_search(t0 + DEFAULT_SEARCH_DEBOUNCE).await;

        assert_eq!(selector.commit(&scroll, late_page), CommitOutcome::Stale);
        // user1 and user10..user19
        assert_eq!(selector.state().accumulated().len(), 11);
    }

    #[test]
    fn debouncer_restarts_window_on_schedule() {
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        let t0 = Instant::now();

        debouncer.schedule(1, t0);
        debouncer.schedule(2, t0 + Duration::from_millis(80));

        assert_eq!(debouncer.take_due(t0 + Duration::from_millis(100)), None);
        assert_eq!(debouncer.take_due(t0 + Duration::from_millis(180)), Some(2));
        assert_eq!(debouncer.take_due(t0 + Duration::from_secs(10)), None);
    }
}
