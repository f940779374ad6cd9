//! Turns raw listings into hydrated entity pages.
//!
//! Membership listings only carry principal ids, so every id is looked up
//! concurrently and the page is filtered client-side afterwards. A single failed
//! lookup fails the whole page.
//!
//! Role listings name their creator and last editor by id. Those are looked up
//! too, but a failed lookup only leaves that actor as a bare id.

use futures::{stream, StreamExt, TryStreamExt};

use crate::domain::{
    entity::{Actor, Entity, EntityKind, Role},
    page::{Page, PageQuery, RawPage},
    principal::{EnrichedMember, Principal},
};

use super::contracts::{FetchError, PageRequest, PrincipalLookup, RawPageFetcher};

pub const DEFAULT_LOOKUP_CONCURRENCY: usize = 8;

const RESOLVE_PAGE_FAILED: &str = "RESOLVE_PAGE_FAILED";
const RESOLVE_ACTOR_UNRESOLVED: &str = "RESOLVE_ACTOR_UNRESOLVED";

/// Fetcher, lookup and fan-out bound bundled for repeated use.
#[derive(Debug, Clone)]
pub struct PageResolver<F, L> {
    fetcher: F,
    lookup: L,
    lookup_concurrency: usize,
}

impl<F, L> PageResolver<F, L>
where
    F: RawPageFetcher,
    L: PrincipalLookup,
{
    pub fn new(fetcher: F, lookup: L) -> Self {
        Self {
            fetcher,
            lookup,
            lookup_concurrency: DEFAULT_LOOKUP_CONCURRENCY,
        }
    }

    pub fn with_lookup_concurrency(mut self, limit: usize) -> Self {
        self.lookup_concurrency = limit.max(1);
        self
    }

    pub async fn resolve(
        &self,
        kind: EntityKind,
        query: PageQuery,
        container_id: Option<&str>,
    ) -> Page<Entity> {
        resolve_page(
            kind,
            query,
            &self.fetcher,
            &self.lookup,
            container_id,
            self.lookup_concurrency,
        )
        .await
    }
}

/// Fetches and hydrates one page. Failures come back as an empty page with
/// `total == 0` and the error message set.
pub async fn resolve_page(
    kind: EntityKind,
    query: PageQuery,
    fetcher: &dyn RawPageFetcher,
    lookup: &dyn PrincipalLookup,
    container_id: Option<&str>,
    lookup_concurrency: usize,
) -> Page<Entity> {
    let offset = query.offset;

    match try_resolve_page(kind, query, fetcher, lookup, container_id, lookup_concurrency).await {
        Ok(page) => page,
        Err(error) => {
            tracing::warn!(
                code = RESOLVE_PAGE_FAILED,
                kind = kind.as_label(),
                container_id = container_id.unwrap_or_default(),
                error = %error,
                "entity page resolution failed"
            );
            Page::failed(offset, error)
        }
    }
}

async fn try_resolve_page(
    kind: EntityKind,
    query: PageQuery,
    fetcher: &dyn RawPageFetcher,
    lookup: &dyn PrincipalLookup,
    container_id: Option<&str>,
    lookup_concurrency: usize,
) -> Result<Page<Entity>, FetchError> {
    let request = PageRequest {
        kind,
        container_id: container_id.map(ToOwned::to_owned),
        query: query.clone(),
    };
    let raw = fetcher.fetch_page(request).await?;

    if !raw.fits(kind) {
        return Err(FetchError::InvalidData(format!(
            "expected a {} listing, received {}",
            kind.as_label(),
            raw.shape()
        )));
    }

    match raw {
        RawPage::Channels(page) => passthrough(page, Entity::Channel),
        RawPage::Users(page) => passthrough(page, Entity::User),
        RawPage::Domains(page) => passthrough(page, Entity::Domain),
        RawPage::Roles(page) => {
            ensure_ok(&page)?;
            let Page {
                total,
                limit,
                offset,
                items,
                ..
            } = page;
            let roles: Vec<Entity> = stream::iter(items)
                .map(|role| hydrate_role(lookup, role))
                .buffered(lookup_concurrency.max(1))
                .map(Entity::Role)
                .collect()
                .await;

            Ok(Page::new(total, limit, offset, roles))
        }
        RawPage::Memberships(page) => {
            ensure_ok(&page)?;
            let ids = page.items.iter().map(|m| m.member_id.clone()).collect();
            let principals = lookup_all(lookup, ids, lookup_concurrency).await?;
            let members = page
                .items
                .into_iter()
                .zip(principals)
                .map(|(membership, principal)| {
                    Entity::Member(EnrichedMember::new(principal, membership.roles))
                })
                .collect();

            Ok(filter_page(page.total, page.limit, page.offset, members, &query))
        }
        RawPage::RoleMembers(page) => {
            ensure_ok(&page)?;
            let principals = lookup_all(lookup, page.items, lookup_concurrency).await?;
            let holders = principals.into_iter().map(Entity::RoleMember).collect();

            Ok(filter_page(page.total, page.limit, page.offset, holders, &query))
        }
    }
}

fn passthrough<T>(page: Page<T>, wrap: fn(T) -> Entity) -> Result<Page<Entity>, FetchError> {
    ensure_ok(&page)?;
    Ok(page.map_items(wrap))
}

fn ensure_ok<T>(page: &Page<T>) -> Result<(), FetchError> {
    match &page.error {
        Some(error) => Err(FetchError::Unavailable(error.clone())),
        None => Ok(()),
    }
}

/// Looks every id up with at most `concurrency` requests in flight. Results
/// keep the order of `ids`; the first failure aborts the batch.
async fn lookup_all(
    lookup: &dyn PrincipalLookup,
    ids: Vec<String>,
    concurrency: usize,
) -> Result<Vec<Principal>, FetchError> {
    if let Some(index) = ids.iter().position(String::is_empty) {
        return Err(FetchError::InvalidData(format!(
            "member at position {index} has no id"
        )));
    }

    stream::iter(ids)
        .map(move |id| async move { lookup.lookup(&id).await })
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

async fn hydrate_role(lookup: &dyn PrincipalLookup, mut role: Role) -> Role {
    role.created_by = hydrate_actor(lookup, role.created_by.take()).await;
    role.updated_by = hydrate_actor(lookup, role.updated_by.take()).await;
    role
}

/// Blank ids become `None`; ids that cannot be looked up stay as they are.
async fn hydrate_actor(lookup: &dyn PrincipalLookup, actor: Option<Actor>) -> Option<Actor> {
    match actor? {
        Actor::Id(id) if id.is_empty() => None,
        Actor::Id(id) => match lookup.lookup(&id).await {
            Ok(principal) => Some(Actor::Principal(principal)),
            Err(error) => {
                tracing::debug!(
                    code = RESOLVE_ACTOR_UNRESOLVED,
                    actor_id = %id,
                    error = %error,
                    "keeping bare actor id"
                );
                Some(Actor::Id(id))
            }
        },
        resolved @ Actor::Principal(_) => Some(resolved),
    }
}

/// Applies the query predicate to resolved principals. When anything is dropped
/// the total shrinks to this page's survivors, not the remote filtered count.
fn filter_page(
    reported_total: usize,
    limit: usize,
    offset: usize,
    resolved: Vec<Entity>,
    query: &PageQuery,
) -> Page<Entity> {
    let before = resolved.len();
    let survivors: Vec<Entity> = resolved
        .into_iter()
        .filter(|entity| {
            entity
                .principal()
                .is_some_and(|principal| matches_query(query, principal))
        })
        .collect();

    let total = if survivors.len() < before {
        survivors.len()
    } else {
        reported_total
    };

    Page::new(total, limit, offset, survivors)
}

fn matches_query(query: &PageQuery, principal: &Principal) -> bool {
    query.status.matches(principal.status)
        && contains_ignore_case(Some(principal.username.as_str()), query.username.as_deref())
        && contains_ignore_case(principal.first_name.as_deref(), query.first_name.as_deref())
        && contains_ignore_case(principal.last_name.as_deref(), query.last_name.as_deref())
        && contains_ignore_case(principal.email.as_deref(), query.email.as_deref())
        && contains_ignore_case(Some(principal.id.as_str()), query.id.as_deref())
}

/// A blank needle matches anything; a missing field never matches a needle.
fn contains_ignore_case(field: Option<&str>, needle: Option<&str>) -> bool {
    match needle {
        None | Some("") => true,
        Some(needle) => field
            .is_some_and(|value| value.to_lowercase().contains(&needle.to_lowercase())),
    }
}
