use super::{entity::Entity, page::Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorUiState {
    Idle,
    Loading,
    Exhausted,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrigin {
    Scroll,
    Search,
}

/// Handed out when a fetch starts. Only a ticket from the current generation
/// may commit its page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub origin: FetchOrigin,
    pub offset: usize,
    pub search_term: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    Failed,
    /// The selector moved on (new search) while the fetch was in flight.
    Stale,
}

/// What a committed pick reports back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub id: String,
    pub label: String,
}

/// Accumulation state of one infinite-scroll picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorState {
    accumulated: Vec<Entity>,
    /// `None` until the first page lands.
    total: Option<usize>,
    search_term: String,
    loading: bool,
    error: Option<String>,
    excluded_id: Option<String>,
    /// The excluded item was dropped from a page of the current generation.
    excluded_skipped: bool,
    generation: u64,
    selection: Option<Selection>,
}

impl SelectorState {
    pub fn new(excluded_id: Option<String>) -> Self {
        Self {
            accumulated: Vec::new(),
            total: None,
            search_term: String::new(),
            loading: false,
            error: None,
            excluded_id,
            excluded_skipped: false,
            generation: 0,
            selection: None,
        }
    }

    pub fn accumulated(&self) -> &[Entity] {
        &self.accumulated
    }

    pub fn total(&self) -> usize {
        self.total.unwrap_or(0)
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.total
            .is_some_and(|total| self.accumulated.len() >= total)
    }

    pub fn ui_state(&self) -> SelectorUiState {
        if self.loading {
            SelectorUiState::Loading
        } else if self.error.is_some() {
            SelectorUiState::Error
        } else if self.is_exhausted() {
            SelectorUiState::Exhausted
        } else {
            SelectorUiState::Idle
        }
    }

    /// Server offset of the next page. The skipped excluded row still occupies
    /// a slot on the server side.
    pub fn next_offset(&self) -> usize {
        self.accumulated.len() + usize::from(self.excluded_skipped)
    }

    /// Seeds the picker from a page the caller already fetched.
    pub fn seed(&mut self, page: Page<Entity>) {
        if let Some(error) = page.error {
            self.error = Some(error);
            return;
        }

        let items = self.exclude(page.items);
        self.accumulated = items;
        self.total = Some(self.adjusted_total(page.total));
    }

    pub fn begin_scroll(&mut self) -> Option<FetchTicket> {
        if self.loading || self.error.is_some() || self.is_exhausted() {
            return None;
        }

        self.loading = true;
        Some(FetchTicket {
            generation: self.generation,
            origin: FetchOrigin::Scroll,
            offset: self.next_offset(),
            search_term: self.search_term.clone(),
        })
    }

    /// Starts a fresh listing for `term`, discarding everything accumulated so far.
    pub fn begin_search(&mut self, term: impl Into<String>) -> FetchTicket {
        self.generation += 1;
        self.search_term = term.into();
        self.accumulated.clear();
        self.total = None;
        self.excluded_skipped = false;
        self.loading = true;

        FetchTicket {
            generation: self.generation,
            origin: FetchOrigin::Search,
            offset: 0,
            search_term: self.search_term.clone(),
        }
    }

    pub fn commit(&mut self, ticket: &FetchTicket, page: Page<Entity>) -> CommitOutcome {
        if ticket.generation != self.generation {
            return CommitOutcome::Stale;
        }

        self.loading = false;

        if let Some(error) = page.error {
            self.error = Some(error);
            return CommitOutcome::Failed;
        }

        let items = self.exclude(page.items);
        let received = items.len();
        match ticket.origin {
            FetchOrigin::Scroll => self.accumulated.extend(items),
            FetchOrigin::Search => {
                self.accumulated = items;
                self.error = None;
            }
        }

        let mut total = self.adjusted_total(page.total);
        if received == 0 && self.accumulated.len() < total {
            // Server ran dry before its own total; stop asking.
            total = self.accumulated.len();
        }
        self.total = Some(total);

        CommitOutcome::Applied
    }

    pub fn select(&mut self, id: &str) -> Option<Selection> {
        let entity = self.accumulated.iter().find(|entity| entity.id() == id)?;
        let selection = Selection {
            id: entity.id().to_owned(),
            label: entity.display_label().to_owned(),
        };
        self.selection = Some(selection.clone());

        Some(selection)
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn exclude(&mut self, items: Vec<Entity>) -> Vec<Entity> {
        let Some(excluded) = self.excluded_id.as_deref() else {
            return items;
        };

        let before = items.len();
        let kept: Vec<Entity> = items
            .into_iter()
            .filter(|entity| entity.id() != excluded)
            .collect();
        if kept.len() < before {
            self.excluded_skipped = true;
        }

        kept
    }

    fn adjusted_total(&self, reported: usize) -> usize {
        reported.saturating_sub(usize::from(self.excluded_skipped))
    }
}
